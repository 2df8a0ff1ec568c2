use std::path::PathBuf;

use aws_smithy_types::checksum_config::RequestChecksumCalculation;

use crate::path_rewrite::PathRewriteRules;
use crate::types::{ClientConfigLocation, S3Credentials};

pub mod args;

#[derive(Debug, Clone)]
pub struct Config {
    pub project: String,
    pub manifest: PathBuf,
    pub target_bucket: String,
    pub meta_outfile: PathBuf,
    pub delete_source: bool,
    pub path_rewrite_rules: PathRewriteRules,
    pub client_config: ClientConfig,
    pub tracing_config: Option<TracingConfig>,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_config_location: ClientConfigLocation,
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
    pub cli_timeout_config: CLITimeoutConfig,
    pub disable_stalled_stream_protection: bool,
    pub request_checksum_calculation: RequestChecksumCalculation,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

#[derive(Debug, Clone)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}

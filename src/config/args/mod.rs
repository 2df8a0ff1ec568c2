use crate::Config;
use crate::config::args::value_parser::{file_exist, path_rewrite, url};
use crate::config::{CLITimeoutConfig, ClientConfig, RetryConfig, TracingConfig};
use crate::path_rewrite::{PathRewriteRules, PathTransform};
use crate::types::{AccessKeys, ClientConfigLocation, S3Credentials};
use aws_smithy_types::checksum_config::RequestChecksumCalculation;
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
#[cfg(feature = "version")]
use shadow_rs::shadow;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

mod value_parser;

const DEFAULT_DELETE_SOURCE: bool = false;
const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;
const DEFAULT_FORCE_PATH_STYLE: bool = false;
const DEFAULT_DISABLE_STALLED_STREAM_PROTECTION: bool = false;

const META_OUTFILE_IS_DIRECTORY: &str = "--meta-outfile must not be a directory\n";
const META_OUTFILE_IS_MANIFEST: &str = "--meta-outfile must not be the same file as --json-input\n";
const DUPLICATED_PATH_REWRITE_RULE: &str =
    "--strip-path-segments is specified more than once for bucket: ";
const REQUIRED_ARGUMENT_MISSING: &str =
    "--project, --json-input, --target-bucket and --meta-outfile are required\n";

#[cfg(feature = "version")]
shadow!(build);

#[derive(Parser, Clone, Debug)]
#[cfg_attr(feature = "version", command(version=format!("{} ({} {}), {}", build::PKG_VERSION, build::SHORT_COMMIT, build::BUILD_TARGET, build::RUST_VERSION)))]
pub struct CLIArgs {
    /// AWS account ID that owns the source and target buckets
    #[arg(short = 'p', long, env, value_parser = NonEmptyStringValueParser::new(), required_unless_present = "auto_complete_shell", help_heading = "General")]
    project: Option<String>,

    /// JSON file with a list of objects to transfer. e.g. [{"id": 1, "node": {"bucket": "b", "path": "p"}}]
    #[arg(short = 'j', long, env, value_name = "FILE", value_parser = file_exist::is_file_exist, required_unless_present = "auto_complete_shell", help_heading = "General")]
    json_input: Option<String>,

    /// bucket where the objects will be copied
    #[arg(short = 'b', long, env, value_parser = NonEmptyStringValueParser::new(), required_unless_present = "auto_complete_shell", help_heading = "General")]
    target_bucket: Option<String>,

    /// file that the metadata of the copied objects will be appended to (one JSON object per line)
    #[arg(short = 'm', long, env, value_name = "FILE", value_parser = NonEmptyStringValueParser::new(), required_unless_present = "auto_complete_shell", help_heading = "General")]
    meta_outfile: Option<String>,

    /// strip leading path segments of objects in the given source bucket. e.g. --strip-path-segments "legacy-bucket=2".
    /// can be specified multiple times.
    #[arg(long, env, value_name = "BUCKET=N", value_delimiter = ',', value_parser = path_rewrite::check_strip_path_segments, help_heading = "Path Rewrite")]
    strip_path_segments: Vec<String>,

    /// location of the file that the AWS CLI uses to store configuration profiles
    #[arg(long, env, value_name = "FILE", help_heading = "AWS Configuration")]
    aws_config_file: Option<PathBuf>,

    /// location of the file that the AWS CLI uses to store access keys
    #[arg(long, env, value_name = "FILE", help_heading = "AWS Configuration")]
    aws_shared_credentials_file: Option<PathBuf>,

    /// AWS CLI profile
    #[arg(long, env, conflicts_with_all = ["access_key", "secret_access_key", "session_token"], help_heading = "AWS Configuration")]
    profile: Option<String>,

    /// access key
    #[arg(long, env, conflicts_with_all = ["profile"], requires = "secret_access_key", help_heading = "AWS Configuration")]
    access_key: Option<String>,

    /// secret access key
    #[arg(long, env, conflicts_with_all = ["profile"], requires = "access_key", help_heading = "AWS Configuration")]
    secret_access_key: Option<String>,

    /// session token
    #[arg(long, env, conflicts_with_all = ["profile"], requires = "access_key", help_heading = "AWS Configuration")]
    session_token: Option<String>,

    /// region of the buckets
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Client Options")]
    region: Option<String>,

    /// endpoint url
    #[arg(long, env, value_parser = url::check_scheme, help_heading = "Client Options")]
    endpoint_url: Option<String>,

    /// force path-style addressing
    #[arg(long, env, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "Client Options")]
    force_path_style: bool,

    /// trace verbosity(-q: show warn, -qq: show error, -qqq: no output, -v: show debug, -vv show trace)
    #[clap(flatten)]
    verbosity: Verbosity<InfoLevel>,

    /// show trace as json format
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Tracing/Logging")]
    json_tracing: bool,

    /// enable aws sdk tracing
    #[arg(long, env, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Tracing/Logging")]
    aws_sdk_tracing: bool,

    /// show span event tracing
    #[arg(long, env, default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Tracing/Logging")]
    span_events_tracing: bool,

    /// disable ANSI terminal colors
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Tracing/Logging")]
    disable_color_tracing: bool,

    /// maximum retry attempts of the AWS SDK retry handler
    #[arg(long, env, default_value_t = DEFAULT_AWS_MAX_ATTEMPTS, value_name = "max_attempts", help_heading = "Retry Options")]
    aws_max_attempts: u32,

    /// a multiplier value used when calculating backoff times as part of an exponential backoff with jitter strategy.
    #[arg(long, env, default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS, value_name = "initial_backoff", help_heading = "Retry Options")]
    initial_backoff_milliseconds: u64,

    /// operation timeout (milliseconds). For details, see the AWS SDK for Rust TimeoutConfig documentation.
    /// The default has no timeout.
    #[arg(
        long,
        env,
        value_name = "operation_timeout",
        help_heading = "Timeout Options"
    )]
    operation_timeout_milliseconds: Option<u64>,

    /// operation attempt timeout (milliseconds). For details, see the AWS SDK for Rust TimeoutConfig documentation.
    /// The default has no timeout.
    #[arg(
        long,
        env,
        value_name = "operation_attempt_timeout",
        help_heading = "Timeout Options"
    )]
    operation_attempt_timeout_milliseconds: Option<u64>,

    /// connect timeout (milliseconds).
    /// The default has AWS SDK default timeout (Currently 3100 milliseconds).
    #[arg(
        long,
        env,
        value_name = "connect_timeout",
        help_heading = "Timeout Options"
    )]
    connect_timeout_milliseconds: Option<u64>,

    /// read timeout (milliseconds).
    /// The default has no timeout.
    #[arg(
        long,
        env,
        value_name = "read_timeout",
        help_heading = "Timeout Options"
    )]
    read_timeout_milliseconds: Option<u64>,

    /// generate a auto completions script. Valid values: bash, fish, zsh, powershell, elvish.
    #[arg(long, env, value_name = "SHELL", value_parser = clap_complete::shells::Shell::from_str, help_heading = "Advanced")]
    auto_complete_shell: Option<clap_complete::shells::Shell>,

    /// disable stalled stream protection
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_STALLED_STREAM_PROTECTION, help_heading = "Advanced")]
    disable_stalled_stream_protection: bool,

    /// delete the source object after it has been copied and verified.
    /// [Warning] the source object cannot be restored once deleted
    #[arg(short = 'd', long, env, default_value_t = DEFAULT_DELETE_SOURCE, help_heading = "Dangerous")]
    delete_source: bool,
}

pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    crate::Config::try_from(config_args)
}

impl CLIArgs {
    fn validate_config(&self) -> Result<(), String> {
        self.check_meta_outfile()?;
        self.check_meta_outfile_is_not_manifest()?;
        self.check_duplicated_path_rewrite_rules()?;

        Ok(())
    }

    fn check_meta_outfile(&self) -> Result<(), String> {
        if let Some(meta_outfile) = &self.meta_outfile {
            if PathBuf::from(meta_outfile).is_dir() {
                return Err(META_OUTFILE_IS_DIRECTORY.to_string());
            }
        }

        Ok(())
    }

    fn check_meta_outfile_is_not_manifest(&self) -> Result<(), String> {
        let (Some(meta_outfile), Some(json_input)) = (&self.meta_outfile, &self.json_input) else {
            return Ok(());
        };

        let meta_outfile = PathBuf::from(meta_outfile);
        let json_input = PathBuf::from(json_input);
        let same_file = match (meta_outfile.canonicalize(), json_input.canonicalize()) {
            (Ok(meta_outfile), Ok(json_input)) => meta_outfile == json_input,
            _ => meta_outfile == json_input,
        };

        if same_file {
            return Err(META_OUTFILE_IS_MANIFEST.to_string());
        }

        Ok(())
    }

    fn check_duplicated_path_rewrite_rules(&self) -> Result<(), String> {
        let mut buckets = HashSet::new();
        for rule in &self.strip_path_segments {
            let (bucket, _) = path_rewrite::parse_strip_path_segments(rule)?;
            if !buckets.insert(bucket.clone()) {
                return Err(format!("{DUPLICATED_PATH_REWRITE_RULE}{bucket}\n"));
            }
        }

        Ok(())
    }

    fn build_path_rewrite_rules(&self) -> Result<PathRewriteRules, String> {
        let mut rules = PathRewriteRules::new();
        for rule in &self.strip_path_segments {
            let (bucket, count) = path_rewrite::parse_strip_path_segments(rule)?;
            rules.add_rule(&bucket, PathTransform::StripLeadingSegments(count));
        }

        Ok(rules)
    }

    fn build_client_config(&self) -> ClientConfig {
        let credential = if let Some(profile) = self.profile.clone() {
            S3Credentials::Profile(profile)
        } else if let (Some(access_key), Some(secret_access_key)) =
            (self.access_key.clone(), self.secret_access_key.clone())
        {
            S3Credentials::Credentials {
                access_keys: AccessKeys {
                    access_key,
                    secret_access_key,
                    session_token: self.session_token.clone(),
                },
            }
        } else {
            S3Credentials::FromEnvironment
        };

        ClientConfig {
            client_config_location: ClientConfigLocation {
                aws_config_file: self.aws_config_file.clone(),
                aws_shared_credentials_file: self.aws_shared_credentials_file.clone(),
            },
            credential,
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
            retry_config: RetryConfig {
                aws_max_attempts: self.aws_max_attempts,
                initial_backoff_milliseconds: self.initial_backoff_milliseconds,
            },
            cli_timeout_config: CLITimeoutConfig {
                operation_timeout_milliseconds: self.operation_timeout_milliseconds,
                operation_attempt_timeout_milliseconds: self.operation_attempt_timeout_milliseconds,
                connect_timeout_milliseconds: self.connect_timeout_milliseconds,
                read_timeout_milliseconds: self.read_timeout_milliseconds,
            },
            disable_stalled_stream_protection: self.disable_stalled_stream_protection,
            // server-side copies carry no payload to checksum
            request_checksum_calculation: RequestChecksumCalculation::WhenRequired,
        }
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(value: CLIArgs) -> Result<Self, Self::Error> {
        value.validate_config()?;

        let tracing_config = value.verbosity.log_level().map(|log_level| TracingConfig {
            tracing_level: log_level,
            json_tracing: value.json_tracing,
            aws_sdk_tracing: value.aws_sdk_tracing,
            span_events_tracing: value.span_events_tracing,
            disable_color_tracing: value.disable_color_tracing,
        });

        let path_rewrite_rules = value.build_path_rewrite_rules()?;
        let client_config = value.build_client_config();

        let (project, json_input, target_bucket, meta_outfile) = match (
            value.project,
            value.json_input,
            value.target_bucket,
            value.meta_outfile,
        ) {
            (Some(project), Some(json_input), Some(target_bucket), Some(meta_outfile)) => {
                (project, json_input, target_bucket, meta_outfile)
            }
            // only a completion script is generated without them
            (project, json_input, target_bucket, meta_outfile)
                if value.auto_complete_shell.is_some() =>
            (
                project.unwrap_or_default(),
                json_input.unwrap_or_default(),
                target_bucket.unwrap_or_default(),
                meta_outfile.unwrap_or_default(),
            ),
            _ => return Err(REQUIRED_ARGUMENT_MISSING.to_string()),
        };

        Ok(Config {
            project,
            manifest: PathBuf::from(json_input),
            target_bucket,
            meta_outfile: PathBuf::from(meta_outfile),
            delete_source: value.delete_source,
            path_rewrite_rules,
            client_config,
            tracing_config,
            auto_complete_shell: value.auto_complete_shell,
        })
    }
}

use std::collections::HashMap;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;

/// One unit of work read from the manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferEntry {
    pub id: serde_json::Value,
    pub node: SourceNode,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceNode {
    pub bucket: String,
    pub path: String,
}

impl TransferEntry {
    pub fn source_bucket(&self) -> &str {
        &self.node.bucket
    }

    pub fn source_path(&self) -> &str {
        &self.node.path
    }
}

/// Additional checksum reported by the storage for a whole object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectChecksum {
    pub algorithm: String,
    pub checksum_type: Option<String>,
    pub value: String,
}

/// Everything the storage returned about one stored object.
///
/// Metadata records are derived from this without further requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectHandle {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
    pub size: i64,
    pub e_tag: Option<String>,
    pub checksum: Option<ObjectChecksum>,
    pub parts_count: Option<i32>,
    pub storage_class: Option<String>,
    pub last_modified: DateTime<Utc>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_disposition: Option<String>,
    pub content_language: Option<String>,
    pub cache_control: Option<String>,
    pub user_metadata: Option<HashMap<String, String>>,
    pub server_side_encryption: Option<String>,
    pub sse_customer_algorithm: Option<String>,
    pub public_url: String,
}

impl ObjectHandle {
    pub fn self_link(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    pub fn is_same_object(&self, bucket: &str, key: &str) -> bool {
        self.bucket == bucket && self.key == key
    }
}

/// Opaque continuation token of a resumable copy.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteToken(String);

impl RewriteToken {
    pub fn new(token: impl Into<String>) -> Self {
        RewriteToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for RewriteToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // tokens carry upload ids, which are long and useless in logs
        write!(f, "RewriteToken({} bytes)", self.0.len())
    }
}

/// Result of one call to the copy-progress primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteProgress {
    pub token: Option<RewriteToken>,
    pub bytes_written: u64,
    pub total_bytes: u64,
}

impl RewriteProgress {
    pub fn is_done(&self) -> bool {
        self.token
            .as_ref()
            .is_none_or(|token| token.as_str().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Fetched,
    Copying,
    Copied,
    Verified,
    Logged,
}

#[derive(Debug, Clone)]
pub struct ClientConfigLocation {
    pub aws_config_file: Option<PathBuf>,
    pub aws_shared_credentials_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum S3Credentials {
    Profile(String),
    Credentials { access_keys: AccessKeys },
    FromEnvironment,
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        let session_token = self
            .session_token
            .as_ref()
            .map_or("None", |_| "** redacted **");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &session_token);
        keys.finish()
    }
}

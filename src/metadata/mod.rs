use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::types::ObjectHandle;

pub mod diff;

pub use diff::{MetadataChange, check_integrity, diff};

/// Snapshot of a stored object's descriptive attributes, as written to the output log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ObjectMetadata {
    pub bucket: String,
    pub path: String,
    pub dirname: String,
    pub basename: String,
    pub name: String,
    pub extension: String,
    pub object_id: String,
    pub version_id: Option<String>,
    pub size: i64,
    pub e_tag: Option<String>,
    pub checksum_algorithm: Option<String>,
    pub checksum_type: Option<String>,
    pub checksum: Option<String>,
    pub storage_class: Option<String>,
    pub time_created_epoch: f64,
    pub time_created_iso: String,
    pub time_updated_epoch: f64,
    pub time_updated_iso: String,
    pub self_link: String,
    pub public_url: String,
    pub content_type: Option<String>,
}

impl ObjectMetadata {
    pub fn from_handle(handle: &ObjectHandle) -> Self {
        let (dirname, basename) = split_path(&handle.key);
        let (name, extension) = split_basename(basename);

        // S3 keeps no creation time apart from Last-Modified.
        let time_epoch = to_epoch_seconds(&handle.last_modified);
        let time_iso = handle.last_modified.to_rfc3339();

        ObjectMetadata {
            bucket: handle.bucket.clone(),
            path: handle.key.clone(),
            dirname: dirname.to_string(),
            basename: basename.to_string(),
            name: name.to_string(),
            extension: extension.to_string(),
            object_id: format!(
                "{}/{}/{}",
                handle.bucket,
                handle.key,
                handle.version_id.as_deref().unwrap_or("null")
            ),
            version_id: handle.version_id.clone(),
            size: handle.size,
            e_tag: handle.e_tag.clone(),
            checksum_algorithm: handle
                .checksum
                .as_ref()
                .map(|checksum| checksum.algorithm.clone()),
            checksum_type: handle
                .checksum
                .as_ref()
                .and_then(|checksum| checksum.checksum_type.clone()),
            checksum: handle
                .checksum
                .as_ref()
                .map(|checksum| checksum.value.clone()),
            storage_class: handle.storage_class.clone(),
            time_created_epoch: time_epoch,
            time_created_iso: time_iso.clone(),
            time_updated_epoch: time_epoch,
            time_updated_iso: time_iso,
            self_link: handle.self_link(),
            public_url: handle.public_url.clone(),
            content_type: handle.content_type.clone(),
        }
    }

    pub(crate) fn to_json_map(&self) -> Result<serde_json::Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(anyhow!("metadata serialized to a non-object: {other}")),
        }
    }
}

/// Splits `path` into directory and base name at the last `/`.
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(index) => (&path[..index], &path[index + 1..]),
        None => ("", path),
    }
}

/// Splits a base name at its first period. Everything after it is the extension,
/// so `a.tar.gz` has the extension `tar.gz`.
pub fn split_basename(basename: &str) -> (&str, &str) {
    basename.split_once('.').unwrap_or((basename, ""))
}

pub fn to_epoch_seconds(date_time: &DateTime<Utc>) -> f64 {
    date_time.timestamp() as f64 + f64::from(date_time.timestamp_subsec_nanos()) / 1_000_000_000.0
}

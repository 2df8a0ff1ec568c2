use anyhow::Result;
use serde_json::Value;

use crate::metadata::ObjectMetadata;
use crate::types::error::TransferError;

const E_TAG_FIELD: &str = "e-tag";
const CHECKSUM_FIELD: &str = "checksum";
const CONTENT_TYPE_FIELD: &str = "content-type";

/// One field whose value differs between the source and the target record.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataChange {
    pub field: String,
    pub source: Value,
    pub target: Value,
}

impl MetadataChange {
    /// Whether the change shows that the content itself differs.
    ///
    /// A checksum that only appears on the target is not a content change: S3 may
    /// attach a default checksum to a copy whose source had none. An ETag change
    /// counts only when both ETags are content hashes.
    pub fn is_integrity_violation(&self, e_tag_verifiable: bool) -> bool {
        match self.field.as_str() {
            E_TAG_FIELD => e_tag_verifiable,
            CONTENT_TYPE_FIELD => true,
            CHECKSUM_FIELD => !self.source.is_null(),
            _ => false,
        }
    }
}

/// Field-level diff of two metadata records, in record field order.
pub fn diff(source: &ObjectMetadata, target: &ObjectMetadata) -> Result<Vec<MetadataChange>> {
    let source_map = source.to_json_map()?;
    let target_map = target.to_json_map()?;

    let changes = source_map
        .iter()
        .filter_map(|(field, source_value)| {
            let target_value = target_map.get(field).unwrap_or(&Value::Null);
            if source_value == target_value {
                return None;
            }

            Some(MetadataChange {
                field: field.clone(),
                source: source_value.clone(),
                target: target_value.clone(),
            })
        })
        .collect();

    Ok(changes)
}

/// Fails when `changes` show the copy differs from `source`.
///
/// Without verifiable ETags the source's additional checksum is the only content
/// hash left, so a source without one cannot be verified at all.
pub fn check_integrity(
    key: &str,
    source: &ObjectMetadata,
    changes: &[MetadataChange],
    e_tag_verifiable: bool,
) -> Result<(), TransferError> {
    if !e_tag_verifiable && source.checksum.is_none() {
        return Err(TransferError::Integrity {
            key: key.to_string(),
            fields: vec![E_TAG_FIELD.to_string(), CHECKSUM_FIELD.to_string()],
        });
    }

    let fields: Vec<String> = changes
        .iter()
        .filter(|change| change.is_integrity_violation(e_tag_verifiable))
        .map(|change| change.field.clone())
        .collect();

    if fields.is_empty() {
        return Ok(());
    }

    Err(TransferError::Integrity {
        key: key.to_string(),
        fields,
    })
}

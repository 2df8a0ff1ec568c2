use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::types::TransferEntry;
use crate::types::error::TransferError;

/// Reads the manifest, a JSON array of `{id, node: {bucket, path}}` objects.
pub async fn load_manifest(path: &Path) -> Result<Vec<TransferEntry>> {
    info!(manifest = %path.display(), "loading objects to transfer.");

    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        TransferError::Configuration(format!(
            "manifest {} cannot be read: {e}",
            path.display()
        ))
    })?;

    let entries = parse_manifest(&content).map_err(|e| match e {
        TransferError::Configuration(message) => {
            TransferError::Configuration(format!("manifest {}: {message}", path.display()))
        }
        other => other,
    })?;

    info!(
        manifest = %path.display(),
        entries = entries.len(),
        "found objects to transfer."
    );

    Ok(entries)
}

pub fn parse_manifest(content: &str) -> Result<Vec<TransferEntry>, TransferError> {
    let entries: Vec<TransferEntry> = serde_json::from_str(content)
        .map_err(|e| TransferError::Configuration(format!("malformed manifest: {e}")))?;

    for (index, entry) in entries.iter().enumerate() {
        validate_entry(index, entry)?;
        debug!(
            index = index,
            id = %entry.id,
            bucket = entry.source_bucket(),
            path = entry.source_path(),
            "manifest entry."
        );
    }

    Ok(entries)
}

fn validate_entry(index: usize, entry: &TransferEntry) -> Result<(), TransferError> {
    if !(entry.id.is_string() || entry.id.is_number()) {
        return Err(TransferError::Configuration(format!(
            "entry {index}: id must be a string or a number, got {}",
            entry.id
        )));
    }
    if entry.source_bucket().is_empty() {
        return Err(TransferError::Configuration(format!(
            "entry {index}: node.bucket must not be empty"
        )));
    }
    if entry.source_path().is_empty() {
        return Err(TransferError::Configuration(format!(
            "entry {index}: node.path must not be empty"
        )));
    }

    Ok(())
}

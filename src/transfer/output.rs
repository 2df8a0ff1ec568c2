use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::metadata::ObjectMetadata;
use crate::types::error::TransferError;

#[derive(Debug, Serialize)]
struct OutputRecord<'a> {
    id: &'a Value,
    node: &'a ObjectMetadata,
}

/// Append-only JSON lines file of `{id, node}` records.
#[derive(Debug, Clone)]
pub struct OutputLog {
    path: PathBuf,
}

impl OutputLog {
    pub fn new(path: &Path) -> Self {
        OutputLog {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens, appends one line and closes the file, so every finished entry is on disk.
    pub async fn append(&self, id: &Value, node: &ObjectMetadata) -> Result<()> {
        let mut line = serde_json::to_string(&OutputRecord { id, node })
            .context("serde_json::to_string() failed.")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                TransferError::Configuration(format!(
                    "meta outfile {} cannot be opened: {e}",
                    self.path.display()
                ))
            })?;

        file.write_all(line.as_bytes())
            .await
            .context("tokio::io::AsyncWriteExt::write_all() failed.")?;
        file.flush()
            .await
            .context("tokio::io::AsyncWriteExt::flush() failed.")?;

        Ok(())
    }
}

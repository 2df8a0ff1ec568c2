use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tokio::time::Instant;
use tracing::{Instrument, Span, debug, info, info_span};

use crate::Config;
use crate::metadata::{ObjectMetadata, check_integrity, diff};
use crate::path_rewrite::PathRewriteRules;
use crate::storage::Storage;
use crate::storage::e_tag::is_e_tag_verifiable;
use crate::types::error::TransferError;
use crate::types::{ObjectHandle, RewriteProgress, TransferEntry, TransferState};
use output::OutputLog;

pub mod output;

#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub target_bucket: String,
    pub path_rewrite_rules: PathRewriteRules,
    pub meta_outfile: PathBuf,
    pub delete_source: bool,
}

impl From<&Config> for TransferOptions {
    fn from(config: &Config) -> Self {
        TransferOptions {
            target_bucket: config.target_bucket.clone(),
            path_rewrite_rules: config.path_rewrite_rules.clone(),
            meta_outfile: config.meta_outfile.clone(),
            delete_source: config.delete_source,
        }
    }
}

/// Copies manifest entries one at a time: fetch, copy, verify, record, optionally delete.
///
/// The first failing entry stops the run. Entries already transferred are not rolled back.
pub struct Transferer {
    storage: Storage,
    target_bucket: String,
    path_rewrite_rules: PathRewriteRules,
    output_log: OutputLog,
    delete_source: bool,
    span: Span,
}

impl Transferer {
    /// Every event of the run is recorded within `span`.
    pub fn new(storage: Storage, options: TransferOptions, span: Span) -> Self {
        Transferer {
            storage,
            target_bucket: options.target_bucket,
            path_rewrite_rules: options.path_rewrite_rules,
            output_log: OutputLog::new(&options.meta_outfile),
            delete_source: options.delete_source,
            span,
        }
    }

    pub async fn run(&self, entries: &[TransferEntry]) -> Result<()> {
        self.run_entries(entries)
            .instrument(self.span.clone())
            .await
    }

    async fn run_entries(&self, entries: &[TransferEntry]) -> Result<()> {
        let start_time = Instant::now();
        info!(
            entries = entries.len(),
            target_bucket = self.target_bucket,
            delete_source = self.delete_source,
            meta_outfile = %self.output_log.path().display(),
            "transfer started."
        );

        self.storage.get_bucket(&self.target_bucket).await?;

        for (index, entry) in entries.iter().enumerate() {
            let entry_span = info_span!("entry", index = index, id = %entry.id);
            self.transfer_entry(entry)
                .instrument(entry_span)
                .await
                .with_context(|| {
                    format!(
                        "transfer of s3://{}/{} (id: {}) failed.",
                        entry.source_bucket(),
                        entry.source_path(),
                        entry.id
                    )
                })?;
        }

        let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
        info!(
            entries = entries.len(),
            duration_sec = duration_sec,
            "transfer completed."
        );

        Ok(())
    }

    async fn transfer_entry(&self, entry: &TransferEntry) -> Result<()> {
        let source_bucket = entry.source_bucket();
        let source_path = entry.source_path();

        let source = self.storage.get_object(source_bucket, source_path).await?;
        log_state(TransferState::Fetched, source_path);

        let target_key = self.target_key(&source)?;
        let source_metadata = ObjectMetadata::from_handle(&source);
        debug!(
            key = source_path,
            metadata = %serde_json::Value::Object(source_metadata.to_json_map()?),
            "source metadata."
        );

        log_state(TransferState::Copying, source_path);
        let progress = self.copy_object(&source, &target_key).await?;
        log_state(TransferState::Copied, source_path);

        let target = self
            .storage
            .get_object(&self.target_bucket, &target_key)
            .await?;
        let target_metadata = ObjectMetadata::from_handle(&target);

        let changes = diff(&source_metadata, &target_metadata)?;
        for change in &changes {
            debug!(
                field = change.field,
                source = %change.source,
                target = %change.target,
                "metadata changed."
            );
        }
        check_integrity(
            &target_key,
            &source_metadata,
            &changes,
            is_e_tag_verifiable(&source, &target),
        )?;
        log_state(TransferState::Verified, source_path);

        self.output_log
            .append(&entry.id, &target_metadata)
            .await?;
        log_state(TransferState::Logged, source_path);

        info!(
            source = source.self_link(),
            target = target.self_link(),
            size = progress.total_bytes,
            "transferred."
        );

        if self.delete_source {
            self.storage
                .delete_object(source_bucket, source_path)
                .await?;
        }

        Ok(())
    }

    fn target_key(&self, source: &ObjectHandle) -> Result<String> {
        let target_key = self
            .path_rewrite_rules
            .target_path(&source.bucket, &source.key);

        if target_key.is_empty() {
            return Err(anyhow!(TransferError::Configuration(format!(
                "path rewrite of {} produced an empty target path",
                source.self_link()
            ))));
        }

        // Deleting the source would remove the only copy.
        if self.delete_source && source.is_same_object(&self.target_bucket, &target_key) {
            return Err(anyhow!(TransferError::Configuration(format!(
                "refusing to delete {} because it is also the target",
                source.self_link()
            ))));
        }

        Ok(target_key)
    }

    /// Drives the storage copy until it hands back no continuation token.
    async fn copy_object(&self, source: &ObjectHandle, target_key: &str) -> Result<RewriteProgress> {
        let mut token = None;
        loop {
            let progress = self
                .storage
                .rewrite_object(source, &self.target_bucket, target_key, token)
                .await?;

            info!(
                key = target_key,
                bytes_written = progress.bytes_written,
                total_bytes = progress.total_bytes,
                "copy in progress."
            );

            if progress.is_done() {
                return Ok(progress);
            }
            token = progress.token.clone();
        }
    }
}

fn log_state(state: TransferState, key: &str) {
    debug!(key = key, state = ?state, "state changed.");
}

use anyhow::{Context, Result, anyhow};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, CopyPartResult};
use base64::Engine;
use base64::engine::general_purpose;
use serde::{Deserialize, Serialize};

use crate::storage::e_tag::is_multipart_upload_e_tag;
use crate::types::error::TransferError;
use crate::types::{ObjectHandle, RewriteToken};

/// What one call of the copy primitive does next.
#[derive(Debug, PartialEq)]
pub(super) enum CopyStep {
    SinglePart,
    StartMultipart { parts_count: i32 },
    NextPart(RewriteState),
}

impl CopyStep {
    /// Multipart sources are copied part by part so the target keeps the source ETag.
    pub fn plan(source: &ObjectHandle, token: Option<RewriteToken>) -> Result<Self> {
        if let Some(token) = token.filter(|token| !token.as_str().is_empty()) {
            return Ok(CopyStep::NextPart(RewriteState::from_token(&token)?));
        }

        let parts_count = source.parts_count.unwrap_or_default();
        if !is_multipart_upload_e_tag(&source.e_tag) || parts_count < 1 {
            return Ok(CopyStep::SinglePart);
        }

        Ok(CopyStep::StartMultipart { parts_count })
    }
}

#[derive(Debug)]
pub(super) enum PartOutcome {
    Continue(RewriteToken),
    Complete(CompletedMultipartUpload),
}

/// Progress of a multipart server-side copy, carried between calls inside a [`RewriteToken`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(super) struct RewriteState {
    pub upload_id: String,
    pub parts_count: i32,
    pub next_part_number: i32,
    pub offset: i64,
    pub copied_parts: Vec<CopiedPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(super) struct CopiedPart {
    pub part_number: i32,
    pub e_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_crc32: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_crc32_c: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_crc64_nvme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_sha256: Option<String>,
}

impl RewriteState {
    pub fn new(upload_id: &str, parts_count: i32) -> Self {
        RewriteState {
            upload_id: upload_id.to_string(),
            parts_count,
            next_part_number: 1,
            offset: 0,
            copied_parts: vec![],
        }
    }

    pub fn is_complete(&self) -> bool {
        self.parts_count < self.next_part_number
    }

    pub fn record_part(&mut self, part_size: i64, part: CopiedPart) {
        self.copied_parts.push(part);
        self.offset += part_size;
        self.next_part_number += 1;
    }

    /// The upload is completed only once every part has been copied.
    pub fn after_part(&self) -> Result<PartOutcome> {
        if !self.is_complete() {
            return Ok(PartOutcome::Continue(self.to_token()?));
        }

        Ok(PartOutcome::Complete(
            CompletedMultipartUpload::builder()
                .set_parts(Some(self.completed_parts()))
                .build(),
        ))
    }

    pub fn completed_parts(&self) -> Vec<CompletedPart> {
        self.copied_parts
            .iter()
            .map(CopiedPart::to_completed_part)
            .collect()
    }

    pub fn to_token(&self) -> Result<RewriteToken> {
        let json = serde_json::to_vec(self).context("serde_json::to_vec() failed.")?;
        Ok(RewriteToken::new(general_purpose::URL_SAFE_NO_PAD.encode(json)))
    }

    pub fn from_token(token: &RewriteToken) -> Result<Self> {
        let json = general_purpose::URL_SAFE_NO_PAD
            .decode(token.as_str())
            .map_err(|e| malformed_token(&e.to_string()))?;
        let state: RewriteState =
            serde_json::from_slice(&json).map_err(|e| malformed_token(&e.to_string()))?;

        if state.upload_id.is_empty()
            || state.parts_count < 1
            || state.next_part_number < 1
            || state.copied_parts.len() as i32 != state.next_part_number - 1
        {
            return Err(malformed_token("inconsistent copy state"));
        }

        Ok(state)
    }
}

impl CopiedPart {
    pub fn from_copy_part_result(part_number: i32, result: &CopyPartResult) -> Result<Self> {
        let e_tag = result
            .e_tag()
            .ok_or_else(|| {
                anyhow!(TransferError::Transport(format!(
                    "upload_part_copy() returned no ETag for part {part_number}."
                )))
            })?
            .to_string();

        Ok(CopiedPart {
            part_number,
            e_tag,
            checksum_crc32: result.checksum_crc32().map(str::to_string),
            checksum_crc32_c: result.checksum_crc32_c().map(str::to_string),
            checksum_crc64_nvme: result.checksum_crc64_nvme().map(str::to_string),
            checksum_sha1: result.checksum_sha1().map(str::to_string),
            checksum_sha256: result.checksum_sha256().map(str::to_string),
        })
    }

    fn to_completed_part(&self) -> CompletedPart {
        CompletedPart::builder()
            .part_number(self.part_number)
            .e_tag(&self.e_tag)
            .set_checksum_crc32(self.checksum_crc32.clone())
            .set_checksum_crc32_c(self.checksum_crc32_c.clone())
            .set_checksum_crc64_nvme(self.checksum_crc64_nvme.clone())
            .set_checksum_sha1(self.checksum_sha1.clone())
            .set_checksum_sha256(self.checksum_sha256.clone())
            .build()
    }
}

/// Runs `abort` when `result` is an error and hands `result` back unchanged.
pub(super) async fn abort_on_error<T, F, Fut>(result: Result<T>, abort: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    if result.is_err() {
        abort().await;
    }

    result
}

fn malformed_token(reason: &str) -> anyhow::Error {
    anyhow!(TransferError::Configuration(format!(
        "malformed rewrite token: {reason}"
    )))
}

/// `x-amz-copy-source` value: bucket and url-encoded key, pinned to a version when known.
pub(super) fn copy_source(bucket: &str, key: &str, version_id: Option<&str>) -> String {
    let copy_source = format!("{bucket}/{}", urlencoding::encode(key));
    match version_id {
        Some(version_id) => format!("{copy_source}?versionId={version_id}"),
        None => copy_source,
    }
}

pub(super) fn copy_source_range(offset: i64, part_size: i64) -> String {
    format!("bytes={}-{}", offset, offset + part_size - 1)
}

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::types::{ChecksumAlgorithm, ChecksumMode, ChecksumType, StorageClass};
use aws_smithy_types_convert::date_time::DateTimeExt;
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::storage::e_tag::parts_count_from_e_tag;
use crate::storage::{ObjectStorage, Storage};
use crate::types::error::TransferError;
use crate::types::{ObjectChecksum, ObjectHandle, RewriteProgress, RewriteToken};
use rewrite::{
    CopiedPart, CopyStep, PartOutcome, RewriteState, abort_on_error, copy_source,
    copy_source_range,
};

mod client_builder;
mod rewrite;

const DEFAULT_REGION: &str = "us-east-1";

pub struct S3StorageFactory {}

impl S3StorageFactory {
    /// `expected_owner` is the account ID every bucket must belong to.
    pub async fn create(client_config: &ClientConfig, expected_owner: &str) -> Storage {
        let client = client_config.create_client().await;
        let region = client
            .config()
            .region()
            .map(|region| region.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Box::new(S3Storage {
            client: Arc::new(client),
            expected_owner: expected_owner.to_string(),
            public_url_base: PublicUrlBase::new(
                client_config.endpoint_url.as_deref(),
                &region,
                client_config.force_path_style,
            ),
        })
    }
}

#[derive(Clone)]
struct S3Storage {
    client: Arc<Client>,
    expected_owner: String,
    public_url_base: PublicUrlBase,
}

#[derive(Debug, Clone, PartialEq)]
enum PublicUrlBase {
    VirtualHosted { region: String },
    PathStyle { endpoint: String },
}

impl PublicUrlBase {
    fn new(endpoint_url: Option<&str>, region: &str, force_path_style: bool) -> Self {
        match endpoint_url {
            Some(endpoint_url) => PublicUrlBase::PathStyle {
                endpoint: endpoint_url.trim_end_matches('/').to_string(),
            },
            None if force_path_style => PublicUrlBase::PathStyle {
                endpoint: format!("https://s3.{region}.amazonaws.com"),
            },
            None => PublicUrlBase::VirtualHosted {
                region: region.to_string(),
            },
        }
    }

    fn url(&self, bucket: &str, key: &str) -> String {
        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<String>>()
            .join("/");

        match self {
            PublicUrlBase::VirtualHosted { region } => {
                format!("https://{bucket}.s3.{region}.amazonaws.com/{encoded_key}")
            }
            PublicUrlBase::PathStyle { endpoint } => format!("{endpoint}/{bucket}/{encoded_key}"),
        }
    }
}

impl S3Storage {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<HeadObjectOutput> {
        let result = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .expected_bucket_owner(&self.expected_owner)
            .checksum_mode(ChecksumMode::Enabled)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output),
            Err(e) if e.as_service_error().is_some_and(|e| e.is_not_found()) => Err(anyhow!(
                TransferError::NotFound(format!("object s3://{bucket}/{key}"))
            )),
            Err(e) => Err(anyhow::Error::new(e).context(TransferError::Transport(
                "aws_sdk_s3::client::head_object() failed.".to_string(),
            ))),
        }
    }

    async fn head_object_part_size(&self, source: &ObjectHandle, part_number: i32) -> Result<i64> {
        let output = self
            .client
            .head_object()
            .bucket(&source.bucket)
            .key(&source.key)
            .set_version_id(source.version_id.clone())
            .expected_bucket_owner(&self.expected_owner)
            .part_number(part_number)
            .send()
            .await
            .context(TransferError::Transport(
                "aws_sdk_s3::client::head_object() failed.".to_string(),
            ))?;

        output
            .content_length()
            .filter(|size| 0 < *size)
            .ok_or_else(|| {
                anyhow!(TransferError::Transport(format!(
                    "head_object() returned no size for part {part_number} of s3://{}/{}.",
                    source.bucket, source.key
                )))
            })
    }

    fn build_object_handle(&self, bucket: &str, key: &str, output: &HeadObjectOutput) -> ObjectHandle {
        let e_tag = output.e_tag().map(str::to_string);
        let parts_count = output.parts_count().or_else(|| parts_count_from_e_tag(&e_tag));

        ObjectHandle {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version_id: output.version_id().map(str::to_string),
            size: output.content_length().unwrap_or_default(),
            checksum: get_additional_checksum(output),
            e_tag,
            parts_count,
            storage_class: output
                .storage_class()
                .map(|storage_class| storage_class.as_str().to_string()),
            last_modified: output
                .last_modified()
                .and_then(|last_modified| last_modified.to_chrono_utc().ok())
                .unwrap_or_default(),
            content_type: output.content_type().map(str::to_string),
            content_encoding: output.content_encoding().map(str::to_string),
            content_disposition: output.content_disposition().map(str::to_string),
            content_language: output.content_language().map(str::to_string),
            cache_control: output.cache_control().map(str::to_string),
            user_metadata: output.metadata().cloned(),
            server_side_encryption: output
                .server_side_encryption()
                .map(|sse| sse.as_str().to_string()),
            sse_customer_algorithm: output.sse_customer_algorithm().map(str::to_string),
            public_url: self.public_url_base.url(bucket, key),
        }
    }

    async fn copy_single_part(
        &self,
        source: &ObjectHandle,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<RewriteProgress> {
        let output = self
            .client
            .copy_object()
            .copy_source(copy_source(
                &source.bucket,
                &source.key,
                source.version_id.as_deref(),
            ))
            .bucket(target_bucket)
            .key(target_key)
            .expected_bucket_owner(&self.expected_owner)
            .expected_source_bucket_owner(&self.expected_owner)
            .set_storage_class(source.storage_class.as_deref().map(StorageClass::from))
            .set_checksum_algorithm(source_checksum_algorithm(source))
            .send()
            .await
            .context(TransferError::Transport(
                "aws_sdk_s3::client::copy_object() failed.".to_string(),
            ))?;

        trace!(key = target_key, "{output:?}");

        let size = source.size.max(0) as u64;
        Ok(RewriteProgress {
            token: None,
            bytes_written: size,
            total_bytes: size,
        })
    }

    async fn create_multipart_copy(
        &self,
        source: &ObjectHandle,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(target_bucket)
            .key(target_key)
            .expected_bucket_owner(&self.expected_owner)
            .set_storage_class(source.storage_class.as_deref().map(StorageClass::from))
            .set_metadata(source.user_metadata.clone())
            .set_content_type(source.content_type.clone())
            .set_content_encoding(source.content_encoding.clone())
            .set_content_disposition(source.content_disposition.clone())
            .set_content_language(source.content_language.clone())
            .set_cache_control(source.cache_control.clone())
            .set_checksum_algorithm(source_checksum_algorithm(source))
            .set_checksum_type(source_checksum_type(source))
            .send()
            .await
            .context(TransferError::Transport(
                "aws_sdk_s3::client::create_multipart_upload() failed.".to_string(),
            ))?;

        let upload_id = output.upload_id().ok_or_else(|| {
            anyhow!(TransferError::Transport(
                "create_multipart_upload() returned no upload id.".to_string()
            ))
        })?;

        debug!(
            key = target_key,
            upload_id = upload_id,
            "multipart copy started."
        );

        Ok(upload_id.to_string())
    }

    /// Copies the next part and, after the last one, completes the upload.
    async fn copy_next_part(
        &self,
        source: &ObjectHandle,
        target_bucket: &str,
        target_key: &str,
        mut state: RewriteState,
    ) -> Result<RewriteProgress> {
        let part_number = state.next_part_number;
        let part_size = self.head_object_part_size(source, part_number).await?;

        let output = self
            .client
            .upload_part_copy()
            .copy_source(copy_source(
                &source.bucket,
                &source.key,
                source.version_id.as_deref(),
            ))
            .copy_source_range(copy_source_range(state.offset, part_size))
            .bucket(target_bucket)
            .key(target_key)
            .upload_id(&state.upload_id)
            .part_number(part_number)
            .expected_bucket_owner(&self.expected_owner)
            .expected_source_bucket_owner(&self.expected_owner)
            .send()
            .await
            .context(TransferError::Transport(
                "aws_sdk_s3::client::upload_part_copy() failed.".to_string(),
            ))?;

        let copy_part_result = output.copy_part_result().ok_or_else(|| {
            anyhow!(TransferError::Transport(
                "upload_part_copy() returned no result.".to_string()
            ))
        })?;
        state.record_part(
            part_size,
            CopiedPart::from_copy_part_result(part_number, copy_part_result)?,
        );

        trace!(
            key = target_key,
            part_number = part_number,
            parts_count = state.parts_count,
            "part copied."
        );

        let total_bytes = source.size.max(0) as u64;
        let bytes_written = state.offset as u64;
        let completed_multipart_upload = match state.after_part()? {
            PartOutcome::Continue(token) => {
                return Ok(RewriteProgress {
                    token: Some(token),
                    bytes_written,
                    total_bytes,
                });
            }
            PartOutcome::Complete(completed_multipart_upload) => completed_multipart_upload,
        };

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(target_bucket)
            .key(target_key)
            .upload_id(&state.upload_id)
            .multipart_upload(completed_multipart_upload)
            .expected_bucket_owner(&self.expected_owner)
            .send()
            .await
            .context(TransferError::Transport(
                "aws_sdk_s3::client::complete_multipart_upload() failed.".to_string(),
            ))?;

        trace!(key = target_key, "{output:?}");

        Ok(RewriteProgress {
            token: None,
            bytes_written,
            total_bytes,
        })
    }

    async fn abort_multipart_copy(&self, target_bucket: &str, target_key: &str, upload_id: &str) {
        let result = self
            .client
            .abort_multipart_upload()
            .bucket(target_bucket)
            .key(target_key)
            .upload_id(upload_id)
            .expected_bucket_owner(&self.expected_owner)
            .send()
            .await;

        // The copy error is what the caller needs to see.
        if let Err(e) = result {
            warn!(
                key = target_key,
                upload_id = upload_id,
                error = e.to_string(),
                "aws_sdk_s3::client::abort_multipart_upload() failed."
            );
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn get_bucket(&self, bucket: &str) -> Result<()> {
        let result = self
            .client
            .head_bucket()
            .bucket(bucket)
            .expected_bucket_owner(&self.expected_owner)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.as_service_error().is_some_and(|e| e.is_not_found()) => Err(anyhow!(
                TransferError::NotFound(format!("bucket {bucket}"))
            )),
            Err(e) => Err(anyhow::Error::new(e).context(TransferError::Transport(
                "aws_sdk_s3::client::head_bucket() failed.".to_string(),
            ))),
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectHandle> {
        let output = self.head_object(bucket, key).await?;
        trace!(bucket = bucket, key = key, "{output:?}");

        Ok(self.build_object_handle(bucket, key, &output))
    }

    async fn rewrite_object(
        &self,
        source: &ObjectHandle,
        target_bucket: &str,
        target_key: &str,
        token: Option<RewriteToken>,
    ) -> Result<RewriteProgress> {
        let state = match CopyStep::plan(source, token)? {
            CopyStep::SinglePart => {
                return self
                    .copy_single_part(source, target_bucket, target_key)
                    .await;
            }
            CopyStep::StartMultipart { parts_count } => {
                let upload_id = self
                    .create_multipart_copy(source, target_bucket, target_key)
                    .await?;
                RewriteState::new(&upload_id, parts_count)
            }
            CopyStep::NextPart(state) => state,
        };

        let upload_id = state.upload_id.clone();
        let result = self
            .copy_next_part(source, target_bucket, target_key, state)
            .await;

        abort_on_error(result, || {
            self.abort_multipart_copy(target_bucket, target_key, &upload_id)
        })
        .await
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let result = self
            .client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .expected_bucket_owner(&self.expected_owner)
            .send()
            .await
            .context(TransferError::Transport(
                "aws_sdk_s3::client::delete_object() failed.".to_string(),
            ))?;

        trace!(key = key, "{result:?}");
        info!(
            bucket = bucket,
            key = key,
            delete_marker = result.delete_marker().unwrap_or_default(),
            "source deleted."
        );

        Ok(())
    }
}

/// The whole-object checksum HeadObject returned, if any.
fn get_additional_checksum(output: &HeadObjectOutput) -> Option<ObjectChecksum> {
    let (algorithm, value) = if let Some(value) = output.checksum_crc64_nvme() {
        (ChecksumAlgorithm::Crc64Nvme, value)
    } else if let Some(value) = output.checksum_crc32() {
        (ChecksumAlgorithm::Crc32, value)
    } else if let Some(value) = output.checksum_crc32_c() {
        (ChecksumAlgorithm::Crc32C, value)
    } else if let Some(value) = output.checksum_sha1() {
        (ChecksumAlgorithm::Sha1, value)
    } else if let Some(value) = output.checksum_sha256() {
        (ChecksumAlgorithm::Sha256, value)
    } else {
        return None;
    };

    Some(ObjectChecksum {
        algorithm: algorithm.as_str().to_string(),
        checksum_type: output
            .checksum_type()
            .map(|checksum_type| checksum_type.as_str().to_string()),
        value: value.to_string(),
    })
}

fn source_checksum_algorithm(source: &ObjectHandle) -> Option<ChecksumAlgorithm> {
    source
        .checksum
        .as_ref()
        .map(|checksum| ChecksumAlgorithm::from(checksum.algorithm.as_str()))
}

fn source_checksum_type(source: &ObjectHandle) -> Option<ChecksumType> {
    source
        .checksum
        .as_ref()
        .and_then(|checksum| checksum.checksum_type.as_deref())
        .map(ChecksumType::from)
}

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use tokio::sync::Semaphore;
use uuid::Uuid;

use bucket_transfer::storage::ObjectStorage;
use bucket_transfer::types::error::TransferError;
use bucket_transfer::types::{ObjectHandle, RewriteProgress, RewriteToken};

pub const REGION: &str = "ap-northeast-1";

pub static BUCKET1: Lazy<String> = Lazy::new(|| format!("bucket1-{}", Uuid::new_v4()));
pub static BUCKET2: Lazy<String> = Lazy::new(|| format!("bucket2-{}", Uuid::new_v4()));

pub static SEMAPHORE: Lazy<Arc<Semaphore>> = Lazy::new(|| Arc::new(Semaphore::new(1)));

pub const PROFILE_NAME: &str = "bucket-transfer-e2e-test";

const TOKEN_PREFIX: &str = "copied-parts-";

pub fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

/// S3 style ETag: md5 of the data, or md5 of the part md5s with a part count suffix.
pub fn e_tag(data: &[u8], part_size: Option<usize>) -> String {
    match part_size {
        None => format!("\"{}\"", hex::encode(md5::compute(data).0)),
        Some(part_size) => {
            let digests: Vec<u8> = data
                .chunks(part_size)
                .flat_map(|chunk| md5::compute(chunk).0)
                .collect();
            format!(
                "\"{}-{}\"",
                hex::encode(md5::compute(&digests).0),
                data.chunks(part_size).count()
            )
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
    pub part_size: Option<usize>,
    pub last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn parts_count(&self) -> Option<i32> {
        self.part_size
            .map(|part_size| self.data.chunks(part_size).count() as i32)
    }
}

#[derive(Default)]
struct State {
    buckets: HashSet<String>,
    objects: HashMap<(String, String), StoredObject>,
    rewrite_calls: usize,
    deleted: Vec<(String, String)>,
}

/// In-memory buckets that copy the way S3 does, one part per call for multipart objects.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<State>>,
    content_type_on_copy: Option<String>,
}

impl MemoryStorage {
    pub fn new(buckets: &[&str]) -> Self {
        let storage = MemoryStorage::default();
        for bucket in buckets {
            storage
                .state
                .lock()
                .unwrap()
                .buckets
                .insert(bucket.to_string());
        }
        storage
    }

    /// Every copy gets this content type instead of the source one.
    pub fn with_content_type_on_copy(mut self, content_type: &str) -> Self {
        self.content_type_on_copy = Some(content_type.to_string());
        self
    }

    pub fn put_object(&self, bucket: &str, key: &str, data: &[u8], content_type: &str) {
        self.insert(bucket, key, data, content_type, None);
    }

    pub fn put_multipart_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
        part_size: usize,
    ) {
        self.insert(bucket, key, data, content_type, Some(part_size));
    }

    fn insert(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
        part_size: Option<usize>,
    ) {
        self.state.lock().unwrap().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data: data.to_vec(),
                content_type: Some(content_type.to_string()),
                part_size,
                last_modified: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn rewrite_calls(&self) -> usize {
        self.state.lock().unwrap().rewrite_calls
    }

    pub fn deleted(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().deleted.clone()
    }

    fn handle(bucket: &str, key: &str, object: &StoredObject) -> ObjectHandle {
        ObjectHandle {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version_id: None,
            size: object.data.len() as i64,
            e_tag: Some(e_tag(&object.data, object.part_size)),
            checksum: None,
            parts_count: object.parts_count(),
            storage_class: None,
            last_modified: object.last_modified,
            content_type: object.content_type.clone(),
            content_encoding: None,
            content_disposition: None,
            content_language: None,
            cache_control: None,
            user_metadata: None,
            server_side_encryption: None,
            sse_customer_algorithm: None,
            public_url: format!("https://{bucket}.s3.{REGION}.amazonaws.com/{key}"),
        }
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn get_bucket(&self, bucket: &str) -> Result<()> {
        if self.state.lock().unwrap().buckets.contains(bucket) {
            return Ok(());
        }
        Err(anyhow!(TransferError::NotFound(format!("bucket {bucket}"))))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectHandle> {
        self.object(bucket, key)
            .map(|object| MemoryStorage::handle(bucket, key, &object))
            .ok_or_else(|| {
                anyhow!(TransferError::NotFound(format!(
                    "object s3://{bucket}/{key}"
                )))
            })
    }

    async fn rewrite_object(
        &self,
        source: &ObjectHandle,
        target_bucket: &str,
        target_key: &str,
        token: Option<RewriteToken>,
    ) -> Result<RewriteProgress> {
        let mut state = self.state.lock().unwrap();
        state.rewrite_calls += 1;

        if !state.buckets.contains(target_bucket) {
            return Err(anyhow!(TransferError::NotFound(format!(
                "bucket {target_bucket}"
            ))));
        }
        let object = state
            .objects
            .get(&(source.bucket.clone(), source.key.clone()))
            .cloned()
            .ok_or_else(|| anyhow!(TransferError::NotFound(source.self_link())))?;
        let total_bytes = object.data.len() as u64;

        let copied_parts = match token {
            Some(token) => token
                .as_str()
                .strip_prefix(TOKEN_PREFIX)
                .and_then(|parts| parts.parse::<usize>().ok())
                .ok_or_else(|| anyhow!("unexpected token {token:?}"))?,
            None => 0,
        };

        if let (Some(part_size), Some(parts_count)) = (object.part_size, object.parts_count()) {
            let copied_parts = copied_parts + 1;
            if copied_parts < parts_count as usize {
                return Ok(RewriteProgress {
                    token: Some(RewriteToken::new(format!("{TOKEN_PREFIX}{copied_parts}"))),
                    bytes_written: (copied_parts * part_size) as u64,
                    total_bytes,
                });
            }
        }

        let mut copy = object;
        copy.last_modified = Utc::now();
        if let Some(content_type) = &self.content_type_on_copy {
            copy.content_type = Some(content_type.clone());
        }
        state
            .objects
            .insert((target_bucket.to_string(), target_key.to_string()), copy);

        Ok(RewriteProgress {
            token: None,
            bytes_written: total_bytes,
            total_bytes,
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .objects
            .remove(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| anyhow!(TransferError::NotFound(format!("object s3://{bucket}/{key}"))))?;
        state.deleted.push((bucket.to_string(), key.to_string()));

        Ok(())
    }
}

#[cfg(feature = "e2e_test")]
pub use e2e::TestHelper;

#[cfg(feature = "e2e_test")]
mod e2e {
    use std::time;

    use aws_config::meta::region::{ProvideRegion, RegionProviderChain};
    use aws_config::{BehaviorVersion, ConfigLoader};
    use aws_sdk_s3::Client;
    use aws_sdk_s3::config::Builder;
    use aws_sdk_s3::operation::head_object::HeadObjectOutput;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::types::{
        BucketLocationConstraint, BucketVersioningStatus, CompletedMultipartUpload,
        CompletedPart, CreateBucketConfiguration, VersioningConfiguration,
    };
    use aws_types::SdkConfig;

    use super::PROFILE_NAME;

    pub const SLEEP_SECS_AFTER_DELETE_BUCKET: u64 = 10;

    pub struct TestHelper {
        client: Client,
    }

    impl TestHelper {
        pub async fn new() -> Self {
            Self {
                client: Self::create_client().await,
            }
        }

        pub async fn create_client() -> Client {
            Client::from_conf(Builder::from(&Self::load_sdk_config().await).build())
        }

        async fn load_sdk_config() -> SdkConfig {
            let config_loader =
                Self::load_config_credential(aws_config::defaults(BehaviorVersion::latest()))
                    .region(Self::build_provider_region());

            config_loader.load().await
        }

        fn load_config_credential(config_loader: ConfigLoader) -> ConfigLoader {
            let builder = aws_config::profile::ProfileFileCredentialsProvider::builder();

            config_loader.credentials_provider(builder.profile_name(PROFILE_NAME).build())
        }

        fn build_provider_region() -> Box<dyn ProvideRegion> {
            let builder = aws_config::profile::ProfileFileRegionProvider::builder()
                .profile_name(PROFILE_NAME);

            Box::new(RegionProviderChain::first_try(builder.build()))
        }

        pub async fn create_bucket(&self, bucket: &str, region: &str) {
            let constraint = BucketLocationConstraint::from(region);
            let cfg = CreateBucketConfiguration::builder()
                .location_constraint(constraint)
                .build();

            self.client
                .create_bucket()
                .create_bucket_configuration(cfg)
                .bucket(bucket)
                .send()
                .await
                .unwrap();
        }

        pub async fn is_bucket_exist(&self, bucket: &str) -> bool {
            let head_bucket_result = self.client.head_bucket().bucket(bucket).send().await;

            if head_bucket_result.is_ok() {
                return true;
            }

            !head_bucket_result
                .err()
                .unwrap()
                .into_service_error()
                .is_not_found()
        }

        pub async fn delete_bucket_with_cascade(&self, bucket: &str) {
            if !self.is_bucket_exist(bucket).await {
                return;
            }

            self.abort_all_multipart_uploads(bucket).await;

            let list_object_versions_output = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .send()
                .await
                .unwrap();
            let versions = list_object_versions_output
                .versions()
                .iter()
                .map(|version| (version.key(), version.version_id()));
            let delete_markers = list_object_versions_output
                .delete_markers()
                .iter()
                .map(|marker| (marker.key(), marker.version_id()));
            for (key, version_id) in versions.chain(delete_markers) {
                self.client
                    .delete_object()
                    .bucket(bucket)
                    .key(key.unwrap())
                    .set_version_id(version_id.map(str::to_string))
                    .send()
                    .await
                    .unwrap();
            }

            self.client
                .delete_bucket()
                .bucket(bucket)
                .send()
                .await
                .unwrap();

            tokio::time::sleep(time::Duration::from_secs(SLEEP_SECS_AFTER_DELETE_BUCKET)).await;
        }

        pub async fn enable_bucket_versioning(&self, bucket: &str) {
            self.client
                .put_bucket_versioning()
                .bucket(bucket)
                .versioning_configuration(
                    VersioningConfiguration::builder()
                        .status(BucketVersioningStatus::Enabled)
                        .build(),
                )
                .send()
                .await
                .unwrap();
        }

        /// Returns (version count, delete marker count) of `key`.
        pub async fn count_object_versions(&self, bucket: &str, key: &str) -> (usize, usize) {
            let output = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .prefix(key)
                .send()
                .await
                .unwrap();

            (output.versions().len(), output.delete_markers().len())
        }

        pub async fn list_multipart_upload_ids(&self, bucket: &str) -> Vec<String> {
            self.client
                .list_multipart_uploads()
                .bucket(bucket)
                .send()
                .await
                .unwrap()
                .uploads()
                .iter()
                .filter_map(|upload| upload.upload_id().map(str::to_string))
                .collect()
        }

        pub async fn abort_all_multipart_uploads(&self, bucket: &str) {
            let output = self
                .client
                .list_multipart_uploads()
                .bucket(bucket)
                .send()
                .await
                .unwrap();
            for upload in output.uploads() {
                self.client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(upload.key().unwrap())
                    .upload_id(upload.upload_id().unwrap())
                    .send()
                    .await
                    .unwrap();
            }
        }

        pub async fn delete_object(&self, bucket: &str, key: &str) {
            self.client
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .unwrap();
        }

        pub async fn head_object(&self, bucket: &str, key: &str) -> Option<HeadObjectOutput> {
            self.client
                .head_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .ok()
        }

        pub async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>, content_type: &str) {
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(data))
                .send()
                .await
                .unwrap();
        }

        pub async fn put_multipart_object(
            &self,
            bucket: &str,
            key: &str,
            data: Vec<u8>,
            content_type: &str,
            part_size: usize,
        ) {
            let upload_id = self
                .client
                .create_multipart_upload()
                .bucket(bucket)
                .key(key)
                .content_type(content_type)
                .send()
                .await
                .unwrap()
                .upload_id()
                .unwrap()
                .to_string();

            let mut parts = vec![];
            for (index, chunk) in data.chunks(part_size).enumerate() {
                let part_number = index as i32 + 1;
                let output = self
                    .client
                    .upload_part()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .part_number(part_number)
                    .body(ByteStream::from(chunk.to_vec()))
                    .send()
                    .await
                    .unwrap();
                parts.push(
                    CompletedPart::builder()
                        .part_number(part_number)
                        .e_tag(output.e_tag().unwrap())
                        .build(),
                );
            }

            self.client
                .complete_multipart_upload()
                .bucket(bucket)
                .key(key)
                .upload_id(&upload_id)
                .multipart_upload(
                    CompletedMultipartUpload::builder()
                        .set_parts(Some(parts))
                        .build(),
                )
                .send()
                .await
                .unwrap();
        }
    }
}

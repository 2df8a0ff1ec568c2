use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ObjectHandle, RewriteProgress, RewriteToken};

pub mod e_tag;
pub mod s3;

pub type Storage = Box<dyn ObjectStorage + Send + Sync>;

/// Object storage operations needed to move one object between buckets.
///
/// Implementations return [`crate::types::error::TransferError::NotFound`] (wrapped in
/// `anyhow::Error`) for a missing bucket or object, and
/// [`crate::types::error::TransferError::Transport`] for provider failures.
#[async_trait]
pub trait ObjectStorage {
    /// Fails if the bucket does not exist or is not accessible.
    async fn get_bucket(&self, bucket: &str) -> Result<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectHandle>;

    /// Advances a server-side copy of `source` to `target_bucket/target_key` by one step.
    ///
    /// Start with `token: None` and pass the returned token back until
    /// [`RewriteProgress::is_done`] reports completion.
    async fn rewrite_object(
        &self,
        source: &ObjectHandle,
        target_bucket: &str,
        target_key: &str,
        token: Option<RewriteToken>,
    ) -> Result<RewriteProgress>;

    /// Deletes the current object. In a versioned bucket earlier versions are kept.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}

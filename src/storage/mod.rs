//! Object storage seam.

pub mod s3;

use std::path::Path;

use async_trait::async_trait;

use crate::error::UploadError;

/// Pushes one local file to object storage under a caller-chosen key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `local` as `key` and return its publicly resolvable URL.
    ///
    /// The key is never derived from the local path, so the same local
    /// filename can be organized under any remote prefix.
    async fn put(&self, local: &Path, key: &str) -> Result<String, UploadError>;
}

pub use s3::S3Store;

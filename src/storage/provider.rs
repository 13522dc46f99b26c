use async_trait::async_trait;
use bytes::Bytes;
use std::pin::Pin;
use tokio::io::AsyncRead;

use crate::config::CollisionPolicy;
use crate::error::Result;
use crate::storage::SanitizedName;

/// Where a blob ended up and how many bytes were written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub location: String,
    pub size: u64,
}

/// An opened blob, ready to stream
pub struct BlobReader {
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
    pub len: u64,
}

/// Blob storage backend
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `data` under a location derived from `name`
    async fn store(&self, name: &SanitizedName, data: Bytes) -> Result<StoredBlob>;

    /// Open a previously stored blob
    async fn open(&self, location: &str) -> Result<BlobReader>;

    /// Remove a stored blob; missing blobs are not an error
    async fn remove(&self, location: &str) -> Result<()>;

    /// How name collisions are resolved by `store`
    fn collision_policy(&self) -> CollisionPolicy;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::{CollisionPolicy, StorageConfig};
use crate::error::{AppError, Result};
use crate::storage::{BlobReader, BlobStore, SanitizedName, StoredBlob};

// Sanitized names never contain '-', so these cannot clash with stored blobs
const STAGING_PREFIX: &str = ".upload-";
const STAGING_SUFFIX: &str = ".part";

fn is_staging_name(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
}

/// In-progress write. The file is removed on drop unless committed, which
/// covers both I/O errors and a request future dropped mid-write.
struct StagingFile {
    path: PathBuf,
    committed: bool,
}

impl StagingFile {
    fn new(root: &Path) -> Self {
        let name = format!("{}{}{}", STAGING_PREFIX, Uuid::new_v4().simple(), STAGING_SUFFIX);
        Self {
            path: root.join(name),
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove staging file {:?}: {}", self.path, e);
            }
        }
    }
}

/// Local file system blob store
pub struct LocalBlobStore {
    root: PathBuf,
    policy: CollisionPolicy,
}

impl LocalBlobStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            policy: config.collision_policy,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Delete staging files left behind by a crash. Returns how many were removed.
    pub async fn sweep_staging(&self) -> Result<usize> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if is_staging_name(&entry.file_name().to_string_lossy()) {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn file_name_for(&self, name: &SanitizedName) -> String {
        match self.policy {
            CollisionPolicy::Unique => format!("{}_{}", Uuid::new_v4().simple(), name),
            CollisionPolicy::Overwrite => name.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(&self, name: &SanitizedName, data: Bytes) -> Result<StoredBlob> {
        fs::create_dir_all(&self.root).await?;

        let full_path = self.root.join(self.file_name_for(name));
        // Staged next to the target so the rename stays on one filesystem
        let staging = StagingFile::new(&self.root);

        let write = async {
            let mut file = fs::File::create(&staging.path).await?;
            file.write_all(&data).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&staging.path, &full_path).await
        };
        if let Err(e) = write.await {
            return Err(AppError::Storage(format!(
                "Failed to write {:?}: {}",
                full_path, e
            )));
        }
        staging.commit();

        tracing::debug!("Saved {} bytes to {:?}", data.len(), full_path);
        Ok(StoredBlob {
            location: full_path.to_string_lossy().into_owned(),
            size: data.len() as u64,
        })
    }

    async fn open(&self, location: &str) -> Result<BlobReader> {
        let file = fs::File::open(location).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound("File content not found".to_string())
            } else {
                AppError::Storage(format!("Failed to open {}: {}", location, e))
            }
        })?;
        let len = file.metadata().await?.len();

        Ok(BlobReader {
            reader: Box::pin(file),
            len,
        })
    }

    async fn remove(&self, location: &str) -> Result<()> {
        match fs::remove_file(location).await {
            Ok(()) => {
                tracing::debug!("Deleted blob {}", location);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn collision_policy(&self) -> CollisionPolicy {
        self.policy
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}

//! Upload pipeline.
//!
//! A request moves through
//! `Unauthenticated -> Authenticated -> FormParsed -> BlobWritten -> MetadataPersisted -> Responded`.
//! The session check happens in the auth middleware, [`UploadService::authenticate`]
//! resolves the owner, the handler parses the whole form into an [`UploadForm`],
//! and [`UploadService::commit`] performs the two writes, blob first.
//!
//! If the metadata insert fails after the blob was written, the blob is removed
//! when the store uses [`CollisionPolicy::Unique`]. Under
//! [`CollisionPolicy::Overwrite`] the blob may back an older row and is left alone.

use bytes::Bytes;
use std::sync::Arc;

use crate::config::CollisionPolicy;
use crate::error::{AppError, Result};
use crate::models::{file_type_of, CurrentUser, NewFileObject, User};
use crate::services::{FileRepository, UserRepository};
use crate::storage::{BlobStore, SanitizedName};

/// A fully parsed upload form
#[derive(Debug, Clone)]
pub struct UploadForm {
    pub file_name: String,
    pub tag: String,
    pub data: Bytes,
}

/// What was recorded for a successful upload
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub file_id: i64,
    pub name: String,
    pub size_bytes: i64,
}

#[derive(Clone)]
pub struct UploadService {
    users: UserRepository,
    files: FileRepository,
    blobs: Arc<dyn BlobStore>,
}

impl UploadService {
    pub fn new(users: UserRepository, files: FileRepository, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            users,
            files,
            blobs,
        }
    }

    /// Resolve the session user to a stored identity
    pub async fn authenticate(&self, current_user: &CurrentUser) -> Result<User> {
        self.users
            .find_by_username(&current_user.username)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Sanitize, write the blob, then record its metadata
    pub async fn commit(&self, owner: &User, form: UploadForm) -> Result<UploadReceipt> {
        let name = SanitizedName::parse(&form.file_name)?;
        let tag = form.tag.trim();
        if tag.is_empty() {
            return Err(AppError::BadRequest("Missing tag".to_string()));
        }

        let blob = self.blobs.store(&name, form.data).await?;

        let record = NewFileObject {
            name: name.to_string(),
            file_type: file_type_of(name.as_str()).to_string(),
            location: blob.location.clone(),
            owner_id: owner.id,
            size_bytes: blob.size as i64,
            tag: tag.to_string(),
        };

        let file_id = match self.files.insert(&record).await {
            Ok(id) => id,
            Err(e) => {
                self.discard_blob(&blob.location).await;
                return Err(e);
            }
        };

        tracing::info!(
            username = %owner.username,
            filename = %record.name,
            size_bytes = record.size_bytes,
            "File uploaded successfully"
        );

        Ok(UploadReceipt {
            file_id,
            name: record.name,
            size_bytes: record.size_bytes,
        })
    }

    async fn discard_blob(&self, location: &str) {
        match self.blobs.collision_policy() {
            CollisionPolicy::Unique => {
                if let Err(e) = self.blobs.remove(location).await {
                    tracing::warn!("Failed to remove orphaned blob {}: {}", location, e);
                }
            }
            CollisionPolicy::Overwrite => {
                tracing::warn!("Metadata insert failed; leaving blob {} in place", location);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::db::test_support::temp_database;
    use crate::storage::LocalBlobStore;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    struct Fixture {
        _tmp: TempDir,
        uploads: UploadService,
        files: FileRepository,
        blobs: Arc<LocalBlobStore>,
        alice: User,
    }

    async fn fixture(policy: CollisionPolicy) -> Fixture {
        let (tmp, db) = temp_database().await;
        let users = UserRepository::new(db.clone());
        let alice = users.create("alice", "hash").await.unwrap();
        let files = FileRepository::new(db);
        let blobs = Arc::new(LocalBlobStore::new(&StorageConfig {
            root: tmp.path().join("images").to_string_lossy().into_owned(),
            max_upload_bytes: 1024,
            collision_policy: policy,
        }));
        let uploads = UploadService::new(users, files.clone(), blobs.clone());
        Fixture {
            _tmp: tmp,
            uploads,
            files,
            blobs,
            alice,
        }
    }

    fn form(name: &str, tag: &str, data: &'static [u8]) -> UploadForm {
        UploadForm {
            file_name: name.to_string(),
            tag: tag.to_string(),
            data: Bytes::from_static(data),
        }
    }

    fn blob_count(blobs: &LocalBlobStore) -> usize {
        match std::fs::read_dir(blobs.root()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    async fn read_blob(blobs: &LocalBlobStore, location: &str) -> Vec<u8> {
        let mut reader = blobs.open(location).await.unwrap().reader;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn test_authenticate() {
        let fx = fixture(CollisionPolicy::Unique).await;
        let user = fx
            .uploads
            .authenticate(&CurrentUser {
                username: "alice".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(user.id, fx.alice.id);

        let ghost = fx
            .uploads
            .authenticate(&CurrentUser {
                username: "ghost".to_string(),
            })
            .await;
        assert!(matches!(ghost, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_commit_records_sanitized_file() {
        let fx = fixture(CollisionPolicy::Unique).await;
        let receipt = fx
            .uploads
            .commit(&fx.alice, form("my photo!!.PNG", " vacation ", b"0123456789"))
            .await
            .unwrap();
        assert_eq!(receipt.name, "myphoto.PNG");
        assert_eq!(receipt.size_bytes, 10);

        let file = fx.files.get_by_id(receipt.file_id).await.unwrap();
        assert_eq!(file.name, "myphoto.PNG");
        assert_eq!(file.file_type, ".PNG");
        assert_eq!(file.tag, "vacation");
        assert_eq!(file.owner_id, fx.alice.id);
        assert_eq!(file.size_bytes, 10);
        assert_eq!(read_blob(&fx.blobs, &file.location).await, b"0123456789");
    }

    #[tokio::test]
    async fn test_commit_rejects_before_writing() {
        let fx = fixture(CollisionPolicy::Unique).await;
        for bad in [form("!!!", "t", b"x"), form("..", "t", b"x"), form("a.png", "  ", b"x")] {
            let result = fx.uploads.commit(&fx.alice, bad).await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
        assert_eq!(blob_count(&fx.blobs), 0);
        assert!(fx.files.list_by_owner(fx.alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_failure_removes_unique_blob() {
        let fx = fixture(CollisionPolicy::Unique).await;
        let stranger = User {
            id: 9999,
            username: "stranger".to_string(),
            password_hash: String::new(),
        };
        let result = fx
            .uploads
            .commit(&stranger, form("a.png", "t", b"abc"))
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(blob_count(&fx.blobs), 0);
    }

    #[tokio::test]
    async fn test_metadata_failure_keeps_overwrite_blob() {
        let fx = fixture(CollisionPolicy::Overwrite).await;
        let stranger = User {
            id: 9999,
            username: "stranger".to_string(),
            password_hash: String::new(),
        };
        let result = fx
            .uploads
            .commit(&stranger, form("a.png", "t", b"abc"))
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));
        // orphaned blob is the documented outcome for this policy
        assert_eq!(blob_count(&fx.blobs), 1);
    }

    #[tokio::test]
    async fn test_same_name_under_overwrite_shares_location() {
        // Known non-atomic dual write: both rows survive, the bytes are the last writer's.
        let fx = fixture(CollisionPolicy::Overwrite).await;
        let first = fx
            .uploads
            .commit(&fx.alice, form("dup.png", "t", b"first"))
            .await
            .unwrap();
        let second = fx
            .uploads
            .commit(&fx.alice, form("dup.png", "t", b"second!"))
            .await
            .unwrap();

        let a = fx.files.get_by_id(first.file_id).await.unwrap();
        let b = fx.files.get_by_id(second.file_id).await.unwrap();
        assert_eq!(a.location, b.location);
        assert_eq!(a.size_bytes, 5);
        assert_eq!(read_blob(&fx.blobs, &a.location).await, b"second!");
    }

    #[tokio::test]
    async fn test_same_name_under_unique_keeps_both() {
        let fx = fixture(CollisionPolicy::Unique).await;
        let first = fx
            .uploads
            .commit(&fx.alice, form("dup.png", "t", b"first"))
            .await
            .unwrap();
        let second = fx
            .uploads
            .commit(&fx.alice, form("dup.png", "t", b"second"))
            .await
            .unwrap();

        let a = fx.files.get_by_id(first.file_id).await.unwrap();
        let b = fx.files.get_by_id(second.file_id).await.unwrap();
        assert_ne!(a.location, b.location);
        assert_eq!(a.name, b.name);
        assert_eq!(read_blob(&fx.blobs, &a.location).await, b"first");
        assert_eq!(read_blob(&fx.blobs, &b.location).await, b"second");
    }
}

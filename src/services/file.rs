use chrono::{SecondsFormat, Utc};

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{FileObject, NewFileObject};

/// File metadata repository
#[derive(Clone)]
pub struct FileRepository {
    db: Database,
}

impl FileRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a stored blob. Assigns the id and creation time.
    pub async fn insert(&self, file: &NewFileObject) -> Result<i64> {
        // Fixed-width timestamps keep text ordering equal to time ordering
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let result = sqlx::query(
            r#"
            INSERT INTO files (name, file_type, location, owner_id, file_size, tag, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.name)
        .bind(&file.file_type)
        .bind(&file.location)
        .bind(file.owner_id)
        .bind(file.size_bytes)
        .bind(&file.tag)
        .bind(&now)
        .execute(self.db.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a file by ID
    pub async fn get_by_id(&self, id: i64) -> Result<FileObject> {
        let file: FileObject = sqlx::query_as("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        Ok(file)
    }

    /// One page of files carrying `tag`, newest first, plus the total match count
    pub async fn list_by_tag(
        &self,
        tag: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FileObject>, i64)> {
        let files: Vec<FileObject> = sqlx::query_as(
            "SELECT * FROM files WHERE tag = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(tag)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files WHERE tag = ?")
            .bind(tag)
            .fetch_one(self.db.pool())
            .await?;

        Ok((files, total.0))
    }

    /// Every file owned by `owner_id`, newest first
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileObject>> {
        let files: Vec<FileObject> = sqlx::query_as(
            "SELECT * FROM files WHERE owner_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;
    use crate::services::UserRepository;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, FileRepository, i64, i64) {
        let (tmp, db) = temp_database().await;
        let users = UserRepository::new(db.clone());
        let alice = users.create("alice", "hash").await.unwrap();
        let bob = users.create("bob", "hash").await.unwrap();
        (tmp, FileRepository::new(db), alice.id, bob.id)
    }

    fn new_file(name: &str, tag: &str, owner_id: i64, size_bytes: i64) -> NewFileObject {
        NewFileObject {
            name: name.to_string(),
            file_type: crate::models::file_type_of(name).to_string(),
            location: format!("data/images/{}", name),
            owner_id,
            size_bytes,
            tag: tag.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let (_tmp, repo, alice, _) = setup().await;
        let new = new_file("myphoto.PNG", "vacation", alice, 10);

        let id = repo.insert(&new).await.unwrap();
        let file = repo.get_by_id(id).await.unwrap();

        assert_eq!(file.id, id);
        assert_eq!(file.name, new.name);
        assert_eq!(file.file_type, ".PNG");
        assert_eq!(file.location, new.location);
        assert_eq!(file.owner_id, alice);
        assert_eq!(file.size_bytes, 10);
        assert_eq!(file.tag, "vacation");
        assert!(chrono::DateTime::parse_from_rfc3339(&file.created_at).is_ok());
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        let (_tmp, repo, _, _) = setup().await;
        assert!(matches!(repo.get_by_id(404).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_requires_existing_owner() {
        let (_tmp, repo, _, _) = setup().await;
        let result = repo.insert(&new_file("orphan.png", "t", 9999, 1)).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_list_by_tag_newest_first_with_total() {
        let (_tmp, repo, alice, bob) = setup().await;
        let mut ids = Vec::new();
        for i in 0..5 {
            let owner = if i % 2 == 0 { alice } else { bob };
            let id = repo
                .insert(&new_file(&format!("v{}.jpg", i), "vacation", owner, i))
                .await
                .unwrap();
            ids.push(id);
        }
        repo.insert(&new_file("w.jpg", "work", alice, 1)).await.unwrap();

        let (page, total) = repo.list_by_tag("vacation", 2, 0).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.iter().map(|f| f.id).collect::<Vec<_>>(), vec![ids[4], ids[3]]);

        let (page, total) = repo.list_by_tag("vacation", 2, 4).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.iter().map(|f| f.id).collect::<Vec<_>>(), vec![ids[0]]);

        let (page, total) = repo.list_by_tag("vacation", 10, 10).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 5);

        let (page, total) = repo.list_by_tag("missing", 10, 0).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let (_tmp, repo, alice, bob) = setup().await;
        let first = repo.insert(&new_file("a.png", "x", alice, 1)).await.unwrap();
        repo.insert(&new_file("b.png", "y", bob, 1)).await.unwrap();
        let third = repo.insert(&new_file("c.png", "z", alice, 1)).await.unwrap();

        let files = repo.list_by_owner(alice).await.unwrap();
        assert_eq!(files.iter().map(|f| f.id).collect::<Vec<_>>(), vec![third, first]);
        assert!(files.iter().all(|f| f.owner_id == alice));
    }
}

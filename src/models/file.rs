use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored file metadata
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct FileObject {
    pub id: i64,
    pub name: String,
    pub file_type: String,
    pub location: String,
    pub owner_id: i64,
    #[sqlx(rename = "file_size")]
    pub size_bytes: i64,
    pub tag: String,
    pub created_at: String,
}

impl FileObject {
    pub fn download_url(&self) -> String {
        format!("/api/images/{}/download", self.id)
    }

    /// Content type derived from the file extension
    pub fn content_type(&self) -> &'static str {
        let ext = file_type_of(&self.name).to_lowercase();
        match ext.as_str() {
            ".pdf" => "application/pdf",
            ".png" => "image/png",
            ".jpg" | ".jpeg" => "image/jpeg",
            _ => "application/octet-stream",
        }
    }
}

/// Metadata for a blob that has been written but not yet recorded
#[derive(Debug, Clone)]
pub struct NewFileObject {
    pub name: String,
    pub file_type: String,
    pub location: String,
    pub owner_id: i64,
    pub size_bytes: i64,
    pub tag: String,
}

/// Extension of a file name including the leading dot, or "" when there is none.
pub fn file_type_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[idx..],
        None => "",
    }
}

/// Public view of a stored file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub file_type: String,
    pub size_bytes: i64,
    pub created_at: String,
}

impl From<FileObject> for PhotoResponse {
    fn from(file: FileObject) -> Self {
        let created_at = DateTime::parse_from_rfc3339(&file.created_at)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|_| file.created_at.clone());
        Self {
            url: file.download_url(),
            id: file.id,
            name: file.name,
            file_type: file.file_type,
            size_bytes: file.size_bytes,
            created_at,
        }
    }
}

/// Paged listing response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPhotosResponse {
    pub photos: Vec<PhotoResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_page: Option<String>,
}

/// Listing query parameters, kept as text so bad values get our own 400
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub tag: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str) -> FileObject {
        FileObject {
            id: 7,
            name: name.to_string(),
            file_type: file_type_of(name).to_string(),
            location: format!("data/images/{}", name),
            owner_id: 1,
            size_bytes: 10,
            tag: "vacation".to_string(),
            created_at: "2026-10-18T09:30:00.123456Z".to_string(),
        }
    }

    #[test]
    fn test_file_type_of() {
        assert_eq!(file_type_of("myphoto.PNG"), ".PNG");
        assert_eq!(file_type_of("archive.tar.gz"), ".gz");
        assert_eq!(file_type_of("README"), "");
        assert_eq!(file_type_of(".hidden"), ".hidden");
    }

    #[test]
    fn test_content_type() {
        assert_eq!(sample("a.pdf").content_type(), "application/pdf");
        assert_eq!(sample("a.PNG").content_type(), "image/png");
        assert_eq!(sample("a.jpg").content_type(), "image/jpeg");
        assert_eq!(sample("a.JPEG").content_type(), "image/jpeg");
        assert_eq!(sample("a.gif").content_type(), "application/octet-stream");
        assert_eq!(sample("noext").content_type(), "application/octet-stream");
    }

    #[test]
    fn test_photo_response() {
        let photo = PhotoResponse::from(sample("myphoto.PNG"));
        assert_eq!(photo.url, "/api/images/7/download");
        assert_eq!(photo.file_type, ".PNG");
        assert_eq!(photo.created_at, "2026-10-18T09:30:00Z");
    }
}

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use tokio_util::io::ReaderStream;

use crate::error::{ApiResponse, AppError, Result};
use crate::models::{CurrentUser, ListPhotosResponse, ListQuery, PhotoResponse};
use crate::services::{listing::parse_page_params, PageCursor, UploadForm};
use crate::AppState;

const TOO_BIG: &str = "File too big or bad request";

fn page_link(tag: &str, cursor: PageCursor) -> String {
    format!(
        "/api/images?tag={}&limit={}&offset={}",
        urlencoding::encode(tag),
        cursor.limit,
        cursor.offset
    )
}

/// List files by tag, one page at a time
/// GET /api/images?tag=xxx&limit=10&offset=0
pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListPhotosResponse>> {
    let (tag, limit, offset) = parse_page_params(
        query.tag.as_deref(),
        query.limit.as_deref(),
        query.offset.as_deref(),
    )?;

    let page = state.listing.list(&tag, limit, offset).await?;

    Ok(Json(ListPhotosResponse {
        photos: page.items.into_iter().map(PhotoResponse::from).collect(),
        total: page.total,
        limit: page.limit,
        offset: page.offset,
        next_page: page.next.map(|c| page_link(&tag, c)),
        previous_page: page.previous.map(|c| page_link(&tag, c)),
    }))
}

/// List the caller's own files, newest first
/// GET /api/images/mine
pub async fn list_my_images(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Vec<PhotoResponse>>> {
    let files = state.listing.list_owned(&current_user.username).await?;
    Ok(Json(files.into_iter().map(PhotoResponse::from).collect()))
}

/// Upload a file
/// POST /api/images (multipart: file, tag)
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let owner = state.uploads.authenticate(&current_user).await?;

    check_content_length(&headers, state.config.storage.max_upload_bytes)?;
    let multipart = multipart.map_err(|e| {
        tracing::warn!("Rejected multipart request: {}", e);
        AppError::BadRequest(TOO_BIG.to_string())
    })?;
    let form = read_upload_form(multipart).await?;

    let receipt = state.uploads.commit(&owner, form).await?;
    tracing::debug!(
        file_id = receipt.file_id,
        name = %receipt.name,
        size_bytes = receipt.size_bytes,
        "Upload recorded"
    );

    Ok((
        [("HX-Trigger", "refresh-file-list")],
        Json(ApiResponse::<()>::success_message("File uploaded successfully")),
    ))
}

/// Reject bodies that announce more than the limit before reading any of them
fn check_content_length(headers: &HeaderMap, max_bytes: usize) -> Result<()> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match declared {
        Some(len) if len > max_bytes as u64 => {
            tracing::warn!("Upload of {} bytes exceeds limit of {}", len, max_bytes);
            Err(AppError::BadRequest(TOO_BIG.to_string()))
        }
        _ => Ok(()),
    }
}

/// Read every form field before anything is written
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut file: Option<(String, Bytes)> = None;
    let mut tag: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Error parsing multipart form: {}", e);
        AppError::BadRequest(TOO_BIG.to_string())
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await.map_err(|e| {
                    tracing::warn!("Error reading file field: {}", e);
                    AppError::BadRequest(TOO_BIG.to_string())
                })?;
                file = Some((file_name, data));
            }
            "tag" => {
                let text = field.text().await.map_err(|e| {
                    tracing::warn!("Error reading tag field: {}", e);
                    AppError::BadRequest(TOO_BIG.to_string())
                })?;
                tag = Some(text);
            }
            _ => {}
        }
    }

    let (file_name, data) =
        file.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let tag = tag.ok_or_else(|| AppError::BadRequest("Missing tag".to_string()))?;

    Ok(UploadForm {
        file_name,
        tag,
        data,
    })
}

/// Download a file
/// GET /api/images/:id/download
pub async fn download_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid file ID".to_string()))?;

    let file = state.files.get_by_id(id).await?;
    let blob = state.blobs.open(&file.location).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type())
        .header(header::CONTENT_LENGTH, blob.len)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", file.name),
        )
        .body(Body::from_stream(ReaderStream::new(blob.reader)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

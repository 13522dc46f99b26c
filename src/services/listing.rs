use crate::error::{AppError, Result};
use crate::models::FileObject;
use crate::services::{FileRepository, UserRepository};

/// Position of an adjacent page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub limit: i64,
    pub offset: i64,
}

/// A bounded slice of a tag listing
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<FileObject>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub next: Option<PageCursor>,
    pub previous: Option<PageCursor>,
}

/// Cursors for the pages around `offset`. Expects `limit > 0` and `offset >= 0`.
pub fn adjacent_pages(
    limit: i64,
    offset: i64,
    total: i64,
) -> (Option<PageCursor>, Option<PageCursor>) {
    let next_offset = offset.saturating_add(limit);
    let next = (next_offset < total).then_some(PageCursor {
        limit,
        offset: next_offset,
    });
    let previous = (offset > 0).then(|| PageCursor {
        limit,
        offset: (offset - limit).max(0),
    });
    (next, previous)
}

/// Parse and check raw listing parameters. The tag comes back trimmed,
/// matching how uploads store it.
pub fn parse_page_params(
    tag: Option<&str>,
    limit: Option<&str>,
    offset: Option<&str>,
) -> Result<(String, i64, i64)> {
    let (tag, limit, offset) = match (tag, limit, offset) {
        (Some(t), Some(l), Some(o)) if !t.trim().is_empty() && !l.is_empty() && !o.is_empty() => {
            (t, l, o)
        }
        _ => return Err(AppError::BadRequest("Missing query parameters".to_string())),
    };

    let limit: i64 = limit
        .trim()
        .parse()
        .ok()
        .filter(|l| *l > 0)
        .ok_or_else(|| AppError::BadRequest("Invalid limit".to_string()))?;
    let offset: i64 = offset
        .trim()
        .parse()
        .ok()
        .filter(|o| *o >= 0)
        .ok_or_else(|| AppError::BadRequest("Invalid offset".to_string()))?;

    Ok((tag.trim().to_string(), limit, offset))
}

/// Read side: paged tag listings and per-owner listings
#[derive(Clone)]
pub struct ListingService {
    files: FileRepository,
    users: UserRepository,
}

impl ListingService {
    pub fn new(files: FileRepository, users: UserRepository) -> Self {
        Self { files, users }
    }

    /// One page of files tagged `tag`
    pub async fn list(&self, tag: &str, limit: i64, offset: i64) -> Result<Page> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(AppError::BadRequest("Missing tag".to_string()));
        }
        if limit <= 0 {
            return Err(AppError::BadRequest("Invalid limit".to_string()));
        }
        if offset < 0 {
            return Err(AppError::BadRequest("Invalid offset".to_string()));
        }

        let (items, total) = self.files.list_by_tag(tag, limit, offset).await?;
        let (next, previous) = adjacent_pages(limit, offset, total);

        Ok(Page {
            items,
            total,
            limit,
            offset,
            next,
            previous,
        })
    }

    /// Every file owned by `username`, newest first. Not paginated.
    pub async fn list_owned(&self, username: &str) -> Result<Vec<FileObject>> {
        let user = self.users.get_by_username(username).await?;
        self.files.list_by_owner(user.id).await
    }
}

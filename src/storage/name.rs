use std::fmt;

use crate::error::{AppError, Result};

/// Strip whitespace and every character outside `[A-Za-z0-9.]`.
pub fn sanitize_file_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .collect()
}

/// A client-supplied file name that is safe to join onto the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName(String);

impl SanitizedName {
    /// Sanitize `raw`, rejecting results that would not name a regular file.
    pub fn parse(raw: &str) -> Result<Self> {
        let name = sanitize_file_name(raw);
        if name.is_empty() || name == "." || name == ".." {
            return Err(AppError::BadRequest("Invalid file name".to_string()));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SanitizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

use std::path::PathBuf;
use tower_http::services::{ServeDir, ServeFile};

/// Serve the web client for any path the API does not handle.
/// Unknown paths fall back to `index.html` when the directory has one.
pub fn web_service(dir: &str) -> ServeDir<ServeFile> {
    let root = PathBuf::from(dir);
    let index = root.join("index.html");
    tracing::info!("Serving web client from {}", root.display());
    ServeDir::new(root).fallback(ServeFile::new(index))
}

//! Durable storage for the markup and upload endpoints.

use crate::errors::GatewayError;
use crate::paths::{resolve_within_root, safe_filename};
use base64::Engine as _;
use std::path::Path;

/// Overwrite a page file with its cleaned markup. A trailing slash (or an
/// existing directory) resolves to the directory's index document, matching
/// the static GET surface.
pub fn write_markup(root: &Path, page_path: &str, html: &str) -> Result<(), GatewayError> {
    let mut full = resolve_within_root(root, page_path)?;
    if page_path.ends_with('/') || full.is_dir() {
        full = full.join("index.html");
    }
    std::fs::write(&full, html)?;
    tracing::info!(file = %full.display(), bytes = html.len(), "wrote markup");
    Ok(())
}

/// Store an uploaded image artifact, creating the target directory if
/// absent. Returns the stored root-relative path (leading slash).
pub fn write_image(
    root: &Path,
    dir: &str,
    filename: &str,
    base64_bytes: &str,
) -> Result<String, GatewayError> {
    let dir_full = resolve_within_root(root, dir)?;
    let filename = safe_filename(filename)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(base64_bytes)
        .map_err(|e| GatewayError::MalformedRequest(format!("base64: {}", e)))?;

    std::fs::create_dir_all(&dir_full)?;
    let full = dir_full.join(filename);
    std::fs::write(&full, &bytes)?;
    tracing::info!(file = %full.display(), bytes = bytes.len(), "stored image");

    let relative = full
        .strip_prefix(root)
        .map_err(|_| GatewayError::PathTraversal(dir.to_string()))?;
    Ok(format!("/{}", relative.display()))
}

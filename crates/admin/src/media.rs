//! Upload validation and content-type detection.

use std::path::Path;

use clinicsite_registry::constants::MAX_UPLOAD_BYTES;

use crate::error::AdminError;

/// Maps a file extension to an image content type.
///
/// Returns `None` for extensions that are not accepted as site images.
pub fn content_type_for_ext(ext: &str) -> Option<&'static str> {
    let ct = match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(ct)
}

/// Content type for a file on disk, from its extension.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(content_type_for_ext)
}

/// Checks an upload before it is sent to the object store.
pub fn validate_upload(data: &[u8], content_type: &str) -> Result<(), AdminError> {
    if data.is_empty() {
        return Err(AdminError::InvalidUpload("the file is empty".into()));
    }
    if !content_type.starts_with("image/") {
        return Err(AdminError::InvalidUpload(format!(
            "{content_type} is not an image type"
        )));
    }
    check_size(data.len() as u64)
}

/// Rejects uploads larger than [`MAX_UPLOAD_BYTES`].
pub fn check_size(len: u64) -> Result<(), AdminError> {
    if len > MAX_UPLOAD_BYTES as u64 {
        return Err(AdminError::InvalidUpload(format!(
            "the file is {len} bytes, the limit is {MAX_UPLOAD_BYTES}"
        )));
    }
    Ok(())
}

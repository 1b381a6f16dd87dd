//! Upload intake: content-type check and size-capped reads.

use crate::rejection::RejectionError;
use std::io::Read;
use std::path::Path;

/// Reject anything whose declared content type is not `image/*`.
pub fn check_content_type(content_type: Option<&str>) -> Result<(), RejectionError> {
    match content_type {
        Some(ct) if ct.trim().to_ascii_lowercase().starts_with("image/") => Ok(()),
        _ => Err(RejectionError::invalid(
            "file must be an image (JPEG, PNG, WebP)",
        )),
    }
}

/// Content type implied by a file's extension, if it names an image format.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    image::ImageFormat::from_path(path)
        .ok()
        .map(|format| format.to_mime_type())
}

/// Read `reader` to the end in `chunk_size` pieces, aborting as soon as the
/// running total exceeds `max_bytes`.
pub fn read_capped(
    mut reader: impl Read,
    max_bytes: usize,
    chunk_size: usize,
) -> Result<Vec<u8>, RejectionError> {
    let mut content = Vec::new();
    let mut chunk = vec![0u8; chunk_size.max(1)];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RejectionError::failed(format!("read failed: {e}"))),
        };
        if content.len() + n > max_bytes {
            return Err(RejectionError::invalid(format!(
                "file too large (maximum {max_bytes} bytes)"
            )));
        }
        content.extend_from_slice(&chunk[..n]);
    }
    Ok(content)
}

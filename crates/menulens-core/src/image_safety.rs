//! Uploaded-image encoding validation.
//!
//! The vision and OCR collaborators only accept common raster formats, and
//! a wrong encoding is the one failure mode the product reports verbatim to
//! the user instead of degrading silently. Detection uses magic bytes, not
//! the client-claimed content type.

use crate::{Error, Result};

/// MIME types the extraction pipeline accepts.
pub const SUPPORTED_IMAGE_MIMES: &[&str] =
    &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Detect the actual image MIME type from magic bytes.
///
/// Returns an [`Error::UnsupportedImage`] naming what was detected (or
/// "unknown") when the bytes are not a supported raster format.
pub fn detect_image_mime(data: &[u8]) -> Result<&'static str> {
    let kind = infer::get(data)
        .ok_or_else(|| Error::UnsupportedImage("unknown".to_string()))?;
    let mime = kind.mime_type();
    match mime {
        "image/png" => Ok("image/png"),
        "image/jpeg" => Ok("image/jpeg"),
        "image/gif" => Ok("image/gif"),
        "image/webp" => Ok("image/webp"),
        other => Err(Error::UnsupportedImage(other.to_string())),
    }
}

/// True when the bytes are a supported raster image.
pub fn is_supported_image(data: &[u8]) -> bool {
    detect_image_mime(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_png() -> Vec<u8> {
        let mut data = vec![0u8; 24];
        data[0..8].copy_from_slice(b"\x89PNG\r\n\x1a\n");
        data
    }

    fn minimal_gif() -> Vec<u8> {
        b"GIF89a\x01\x00\x01\x00".to_vec()
    }

    #[test]
    fn test_detect_png() {
        assert_eq!(detect_image_mime(&minimal_png()).unwrap(), "image/png");
    }

    #[test]
    fn test_detect_gif() {
        assert_eq!(detect_image_mime(&minimal_gif()).unwrap(), "image/gif");
    }

    #[test]
    fn test_reject_unknown_bytes() {
        let err = detect_image_mime(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::UnsupportedImage(_)));
    }

    #[test]
    fn test_reject_pdf() {
        let err = detect_image_mime(b"%PDF-1.4 fake document body").unwrap_err();
        match err {
            Error::UnsupportedImage(detected) => assert_eq!(detected, "application/pdf"),
            other => panic!("Expected UnsupportedImage, got {other:?}"),
        }
    }

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(&minimal_png()));
        assert!(!is_supported_image(b"plain text"));
    }
}

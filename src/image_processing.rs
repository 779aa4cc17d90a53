//! Validation and decoding of user-picked image files. Camera frames arrive
//! pre-encoded from the shell and bypass this path; file picks are untrusted
//! bytes and get the full treatment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MAX_IMAGE_BYTES, MAX_IMAGE_DIMENSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Jpeg,
    Png,
    WebP,
}

impl ImageKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::WebP => "image/webp",
        }
    }

    /// Sniff the format from magic bytes. Content-type claims from the shell
    /// are not trusted.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageKind::Jpeg);
        }
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageKind::Png);
        }
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(ImageKind::WebP);
        }
        None
    }

    fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageKind::Jpeg => image::ImageFormat::Jpeg,
            ImageKind::Png => image::ImageFormat::Png,
            ImageKind::WebP => image::ImageFormat::WebP,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageError {
    #[error("image data is empty")]
    EmptyInput,

    #[error("image too large: {size} bytes exceeds maximum of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("unsupported image format, expected JPEG, PNG or WebP")]
    UnsupportedFormat,

    #[error("image dimensions {width}x{height} exceed maximum of {max} pixels per side")]
    DimensionsTooLarge { width: u32, height: u32, max: u32 },

    #[error("failed to decode image: {0}")]
    DecodeFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedImage {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

/// Validate a picked file: size cap, magic-byte sniff, then a real decode so
/// truncated or malicious payloads are rejected before they are staged.
pub fn decode_picked_file(data: &[u8]) -> Result<DecodedImage, ImageError> {
    if data.is_empty() {
        return Err(ImageError::EmptyInput);
    }
    if data.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge {
            size: data.len(),
            max: MAX_IMAGE_BYTES,
        });
    }

    let kind = ImageKind::from_magic_bytes(data).ok_or(ImageError::UnsupportedFormat)?;

    let decoded = image::load_from_memory_with_format(data, kind.to_image_format())
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let width = decoded.width();
    let height = decoded.height();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(ImageError::DimensionsTooLarge {
            width,
            height,
            max: MAX_IMAGE_DIMENSION,
        });
    }

    Ok(DecodedImage { kind, width, height })
}

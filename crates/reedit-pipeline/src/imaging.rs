//! Image re-encoding for the edit endpoint, which only accepts PNG.

use std::io::Cursor;

use image::{GenericImageView, ImageFormat};

use reedit_core::{Error, Result};

/// A PNG re-encoding of a source image.
#[derive(Debug, Clone)]
pub struct PngImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode any supported image format and re-encode it as PNG.
pub fn normalize_png(bytes: &[u8]) -> Result<PngImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| Error::Image(format!("failed to decode image: {}", e)))?;
    let (width, height) = decoded.dimensions();

    let mut out = Cursor::new(Vec::new());
    decoded
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| Error::Image(format!("failed to encode PNG: {}", e)))?;

    Ok(PngImage {
        bytes: out.into_inner(),
        width,
        height,
    })
}

//! Image decoding and PNG encoding.
//!
//! These are the only two byte-level entry points of the crate: raw
//! file bytes (PNG, JPEG, BMP, WebP) in, [`PixelBuffer`] out, and a
//! [`PixelBuffer`] back out as PNG bytes for export. Nothing here
//! touches the filesystem.

use crate::buffer::PixelBuffer;
use crate::types::ColorbookError;

/// Decode raw image bytes into straight-alpha RGBA.
///
/// # Errors
///
/// Returns [`ColorbookError::EmptyInput`] if `bytes` is empty.
/// Returns [`ColorbookError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, ColorbookError> {
    if bytes.is_empty() {
        return Err(ColorbookError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(PixelBuffer::from(img.to_rgba8()))
}

/// Encode `buffer` as an 8-bit RGBA PNG.
///
/// # Errors
///
/// Returns [`ColorbookError::Encode`] if the PNG encoder fails.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, ColorbookError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        buffer.samples(),
        buffer.width(),
        buffer.height(),
        image::ExtendedColorType::Rgba8,
    )
    .map_err(|e| ColorbookError::Encode(e.to_string()))?;
    Ok(buf)
}

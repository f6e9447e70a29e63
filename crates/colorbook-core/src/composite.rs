//! Layer compositing.
//!
//! The stack is fixed: an opaque background, the paint layer over it,
//! and the line layer on top, so outlines always cover fill colors no
//! matter how far a fill grew toward them. All layers hold straight
//! (non-premultiplied) alpha.

use crate::buffer::PixelBuffer;
use crate::types::{ColorbookError, Rgba};

/// What sits beneath the paint layer.
#[derive(Debug, Clone, Copy)]
pub enum Background<'a> {
    /// Plain white page (the export look).
    White,
    /// An image, flattened onto white if it has any transparency.
    Image(&'a PixelBuffer),
}

/// Porter-Duff source-over for straight alpha, rounded to nearest.
#[must_use]
pub fn blend_over(src: Rgba, dst: Rgba) -> Rgba {
    let sa = u32::from(src.a());
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = u32::from(dst.a());
    // Output alpha scaled by 255.
    let out = sa * 255 + da * (255 - sa);
    if out == 0 {
        return Rgba::TRANSPARENT;
    }
    let channel = |s: u8, d: u8| {
        let num = u32::from(s) * sa * 255 + u32::from(d) * da * (255 - sa);
        #[allow(clippy::cast_possible_truncation)]
        let v = ((num + out / 2) / out).min(255) as u8;
        v
    };
    #[allow(clippy::cast_possible_truncation)]
    let alpha = ((out + 127) / 255) as u8;
    Rgba([
        channel(src.r(), dst.r()),
        channel(src.g(), dst.g()),
        channel(src.b(), dst.b()),
        alpha,
    ])
}

/// Flatten `background`, `paint` and `line` into one opaque buffer.
///
/// # Errors
///
/// Returns [`ColorbookError::DimensionMismatch`] unless every layer has
/// the paint layer's size.
pub fn compose(
    background: Background<'_>,
    paint: &PixelBuffer,
    line: &PixelBuffer,
) -> Result<PixelBuffer, ColorbookError> {
    let dims = paint.dimensions();
    line.ensure_same_size(dims)?;
    if let Background::Image(image) = background {
        image.ensure_same_size(dims)?;
    }

    let mut out = match background {
        Background::White => PixelBuffer::filled(dims.width, dims.height, Rgba::WHITE),
        Background::Image(image) => image.clone(),
    };
    for i in 0..dims.pixel_count() {
        let mut px = out.at(i);
        if px.a() != 255 {
            px = blend_over(px, Rgba::WHITE);
        }
        px = blend_over(paint.at(i), px);
        px = blend_over(line.at(i), px);
        out.put(i, px);
    }
    Ok(out)
}

//! Luminance conversion.
//!
//! Every component that needs brightness (mask thresholds, adaptive
//! threshold, Sobel input, line-color selection) goes through
//! [`luminance`], so there is exactly one weighting in the crate:
//! Rec. 709, `Y = 0.2126 R + 0.7152 G + 0.0722 B`.

use image::GrayImage;

use crate::buffer::PixelBuffer;
use crate::types::Rgba;

/// Rec. 709 luma weights for R, G and B.
pub const REC709: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Rec. 709 luminance of a color in `0.0..=255.0`. Alpha is ignored.
#[must_use]
pub fn luminance(color: Rgba) -> f32 {
    REC709[2].mul_add(
        f32::from(color.b()),
        REC709[0].mul_add(f32::from(color.r()), REC709[1] * f32::from(color.g())),
    )
}

/// Luminance plane of a buffer, one `f32` per pixel, row-major.
#[must_use]
pub fn luminance_plane(buffer: &PixelBuffer) -> Vec<f32> {
    buffer.pixels().map(luminance).collect()
}

/// Luminance of a buffer as an 8-bit grayscale image, rounded.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_gray_image(buffer: &PixelBuffer) -> GrayImage {
    let raw = buffer
        .pixels()
        .map(|p| luminance(p).round().clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage::from_raw(buffer.width(), buffer.height(), raw)
        .unwrap_or_else(|| GrayImage::new(buffer.width(), buffer.height()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let sum: f32 = REC709.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "sum was {sum}");
    }

    #[test]
    fn extremes() {
        assert!(luminance(Rgba::BLACK).abs() < 1e-3);
        assert!((luminance(Rgba::WHITE) - 255.0).abs() < 1e-2);
    }

    #[test]
    fn green_is_brightest_primary() {
        let r = luminance(Rgba::rgb(255, 0, 0));
        let g = luminance(Rgba::rgb(0, 255, 0));
        let b = luminance(Rgba::rgb(0, 0, 255));
        assert!(g > r && r > b, "R={r} G={g} B={b}");
    }

    #[test]
    fn alpha_is_ignored() {
        let c = Rgba::rgb(10, 100, 200);
        assert!((luminance(c) - luminance(c.with_alpha(0))).abs() < f32::EPSILON);
    }

    #[test]
    fn gray_image_matches_plane() {
        let buf = PixelBuffer::from_fn(4, 2, |x, _| if x < 2 { Rgba::BLACK } else { Rgba::WHITE });
        let gray = to_gray_image(&buf);
        assert_eq!(gray.dimensions(), (4, 2));
        assert_eq!(gray.get_pixel(0, 1).0[0], 0);
        assert_eq!(gray.get_pixel(3, 0).0[0], 255);
        assert_eq!(luminance_plane(&buf).len(), 8);
    }
}

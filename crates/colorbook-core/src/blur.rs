//! Resampling and blur of stroke coverage for the anti-aliased line
//! overlay.
//!
//! The overlay renderer turns the protection mask into a black-on-white
//! stroke plane, upscales it with [`upscale_nearest`], softens the
//! hard stroke edges with [`gaussian_blur`] at the supersampled scale
//! and brings it back with [`downscale_smooth`]. The helpers return the
//! input untouched for degenerate arguments instead of reaching the
//! panicking paths of [`imageproc::filter::gaussian_blur_f32`] and
//! [`image::imageops::resize`].

use image::GrayImage;
use image::imageops::FilterType;

/// Soften a stroke plane with a Gaussian of `sigma` pixels.
///
/// `sigma <= 0` (a crisp overlay) and empty planes come back as-is.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(plane: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 || plane.width() == 0 || plane.height() == 0 {
        return plane.clone();
    }
    imageproc::filter::gaussian_blur_f32(plane, sigma)
}

/// Upscale by an integer `factor` with nearest-neighbour sampling, so
/// every source pixel becomes a crisp `factor x factor` block.
#[must_use = "returns the upscaled image"]
pub fn upscale_nearest(image: &GrayImage, factor: u32) -> GrayImage {
    if factor <= 1 {
        return image.clone();
    }
    image::imageops::resize(
        image,
        image.width() * factor,
        image.height() * factor,
        FilterType::Nearest,
    )
}

/// Downscale to `width x height` with a smoothing (bilinear tent) filter.
///
/// The tent has no negative lobes, so a blurred edge never overshoots
/// back toward pure white.
#[must_use = "returns the downscaled image"]
pub fn downscale_smooth(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    if width == 0 || height == 0 || (image.width(), image.height()) == (width, height) {
        return image.clone();
    }
    image::imageops::resize(image, width, height, FilterType::Triangle)
}

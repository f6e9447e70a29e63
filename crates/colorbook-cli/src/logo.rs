//! Logo watermark stamped onto exported pages.

use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Logo height on the export, in pixels.
pub const LOGO_HEIGHT: u32 = 30;

/// Gap between the logo and the bottom-right corner, in pixels.
pub const LOGO_MARGIN: u32 = 10;

/// Scale `logo` to [`LOGO_HEIGHT`] (keeping its aspect ratio) and
/// alpha-blend it [`LOGO_MARGIN`] pixels in from the bottom-right
/// corner of `page`. Parts that fall off a small page are clipped.
pub fn stamp(page: &mut RgbaImage, logo: &RgbaImage) {
    if logo.width() == 0 || logo.height() == 0 {
        return;
    }
    let width = scaled_width(logo.width(), logo.height());
    let scaled = imageops::resize(logo, width, LOGO_HEIGHT, FilterType::Triangle);
    let x = i64::from(page.width()) - i64::from(width) - i64::from(LOGO_MARGIN);
    let y = i64::from(page.height()) - i64::from(LOGO_HEIGHT) - i64::from(LOGO_MARGIN);
    imageops::overlay(page, &scaled, x, y);
}

fn scaled_width(width: u32, height: u32) -> u32 {
    let w = u64::from(width) * u64::from(LOGO_HEIGHT);
    let h = u64::from(height);
    u32::try_from((w + h / 2) / h).unwrap_or(u32::MAX).max(1)
}

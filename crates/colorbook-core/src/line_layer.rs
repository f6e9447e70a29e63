//! Line layer rendering: turn the protection mask into the overlay that
//! is composited above the paint.
//!
//! Two styles are available:
//!
//! - [`LineStyle::Stencil`]: masked pixels copy the page color at full
//!   opacity, everything else is transparent. Exact, but jagged.
//! - [`LineStyle::AntiAliased`]: the mask is rasterised black-on-white,
//!   upscaled without smoothing, blurred, downscaled with smoothing, and
//!   the resulting gray level is remapped to alpha. Line colors come
//!   from the nearest inked mask pixel so colored outlines stay
//!   coherent where the mask was grown past the original stroke.
//!
//! Rendering is a pure function of its inputs; call it again whenever
//! the mask changes.

use serde::{Deserialize, Serialize};

use crate::blur;
use crate::buffer::PixelBuffer;
use crate::luminance::luminance;
use crate::mask::Mask;
use crate::types::{ColorbookError, Rgba};

/// How the line overlay is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineStyle {
    /// Hard binary stencil of the source colors.
    Stencil,
    /// Supersampled, blurred, alpha-remapped overlay.
    AntiAliased {
        /// Integer supersampling factor (1..=4).
        scale: u32,
        /// Blur sigma in source pixels; scaled by `scale` internally.
        blur_sigma: f32,
        /// Exponent applied to coverage; `< 1` boosts faint edges.
        gamma: f32,
        /// Coverage at or above which alpha snaps to 255.
        harden: f32,
        /// Gray level at or above which a pixel is pure background.
        white_cutoff: u8,
        /// Lowest alpha an edge pixel may have.
        min_alpha: u8,
        /// How far (Chebyshev) to look for an inked mask pixel to take
        /// the line color from.
        color_search_radius: u32,
    },
}

impl LineStyle {
    pub const DEFAULT_SCALE: u32 = 3;
    pub const DEFAULT_BLUR_SIGMA: f32 = 0.5;
    pub const DEFAULT_GAMMA: f32 = 0.5;
    pub const DEFAULT_HARDEN: f32 = 0.7;
    pub const DEFAULT_WHITE_CUTOFF: u8 = 250;
    pub const DEFAULT_MIN_ALPHA: u8 = 96;
    pub const DEFAULT_COLOR_SEARCH_RADIUS: u32 = 3;

    /// [`AntiAliased`](Self::AntiAliased) with default values.
    #[must_use]
    pub const fn anti_aliased() -> Self {
        Self::AntiAliased {
            scale: Self::DEFAULT_SCALE,
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            gamma: Self::DEFAULT_GAMMA,
            harden: Self::DEFAULT_HARDEN,
            white_cutoff: Self::DEFAULT_WHITE_CUTOFF,
            min_alpha: Self::DEFAULT_MIN_ALPHA,
            color_search_radius: Self::DEFAULT_COLOR_SEARCH_RADIUS,
        }
    }

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::InvalidConfig`] for the first bad field.
    pub fn validate(&self) -> Result<(), ColorbookError> {
        let Self::AntiAliased {
            scale,
            blur_sigma,
            gamma,
            harden,
            color_search_radius,
            ..
        } = *self
        else {
            return Ok(());
        };
        let invalid = |msg: String| Err(ColorbookError::InvalidConfig(msg));
        if !(1..=4).contains(&scale) {
            return invalid(format!("line scale must be within 1..=4, got {scale}"));
        }
        if !blur_sigma.is_finite() || blur_sigma < 0.0 {
            return invalid(format!("line blur sigma must be >= 0, got {blur_sigma}"));
        }
        if !gamma.is_finite() || gamma <= 0.0 {
            return invalid(format!("line gamma must be > 0, got {gamma}"));
        }
        if !harden.is_finite() || harden <= 0.0 || harden > 1.0 {
            return invalid(format!("line harden must be within (0, 1], got {harden}"));
        }
        if color_search_radius > 8 {
            return invalid(format!(
                "color search radius must be at most 8, got {color_search_radius}"
            ));
        }
        Ok(())
    }
}

impl Default for LineStyle {
    fn default() -> Self {
        Self::anti_aliased()
    }
}

/// Render the line overlay for `source` under `mask`.
///
/// The result has the same size as `source`, alpha 0 on background.
///
/// # Errors
///
/// Returns [`ColorbookError::DimensionMismatch`] if `mask` and `source`
/// differ in size, or [`ColorbookError::InvalidConfig`] for a bad style.
pub fn render(
    source: &PixelBuffer,
    mask: &Mask,
    style: &LineStyle,
) -> Result<PixelBuffer, ColorbookError> {
    source.ensure_same_size(mask.dimensions())?;
    style.validate()?;
    let layer = match *style {
        LineStyle::Stencil => render_stencil(source, mask),
        LineStyle::AntiAliased {
            scale,
            blur_sigma,
            gamma,
            harden,
            white_cutoff,
            min_alpha,
            color_search_radius,
        } => {
            let alpha = AlphaRemap {
                gamma,
                harden,
                white_cutoff,
                min_alpha,
            };
            render_anti_aliased(source, mask, scale, blur_sigma, alpha, color_search_radius)
        }
    };
    log::debug!(
        "line layer {}: {} visible px",
        layer.dimensions(),
        layer.opaque_count()
    );
    Ok(layer)
}

fn render_stencil(source: &PixelBuffer, mask: &Mask) -> PixelBuffer {
    let mut out = PixelBuffer::transparent(source.width(), source.height());
    for i in 0..mask.bits().len() {
        if mask.is_set(i) {
            out.put(i, source.at(i).with_alpha(255));
        }
    }
    out
}

/// Gray-level to alpha mapping of the anti-aliased style.
#[derive(Debug, Clone, Copy)]
struct AlphaRemap {
    gamma: f32,
    harden: f32,
    white_cutoff: u8,
    min_alpha: u8,
}

impl AlphaRemap {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn alpha(self, gray: u8) -> u8 {
        if gray >= self.white_cutoff {
            return 0;
        }
        let coverage = 1.0 - f32::from(gray) / 255.0;
        if coverage >= self.harden {
            return 255;
        }
        let a = (255.0 * coverage.powf(self.gamma)).round().clamp(0.0, 255.0) as u8;
        a.max(self.min_alpha)
    }
}

fn render_anti_aliased(
    source: &PixelBuffer,
    mask: &Mask,
    scale: u32,
    blur_sigma: f32,
    remap: AlphaRemap,
    color_search_radius: u32,
) -> PixelBuffer {
    let (w, h) = (source.width(), source.height());
    let up = blur::upscale_nearest(&mask.to_gray_image(), scale);
    #[allow(clippy::cast_precision_loss)]
    let sigma = blur_sigma * scale as f32;
    let blurred = blur::gaussian_blur(&up, sigma);
    let coverage = blur::downscale_smooth(&blurred, w, h);

    let ink_cutoff = f32::from(remap.white_cutoff);
    let mut out = PixelBuffer::transparent(w, h);
    let mut i = 0usize;
    for y in 0..h {
        for x in 0..w {
            let alpha = remap.alpha(coverage.get_pixel(x, y).0[0]);
            if alpha > 0 {
                let color = nearest_ink(
                    source,
                    mask,
                    i64::from(x),
                    i64::from(y),
                    color_search_radius,
                    ink_cutoff,
                )
                .unwrap_or(Rgba::BLACK);
                out.put(i, color.with_alpha(alpha));
            }
            i += 1;
        }
    }
    out
}

/// Color of the closest masked pixel whose source color looks like ink.
///
/// Searches square rings of growing Chebyshev radius; within the first
/// ring that has candidates the darkest one wins, so a grown mask
/// border picks up the stroke color rather than the paper under it.
fn nearest_ink(
    source: &PixelBuffer,
    mask: &Mask,
    x: i64,
    y: i64,
    radius: u32,
    ink_cutoff: f32,
) -> Option<Rgba> {
    for r in 0..=i64::from(radius) {
        let mut best: Option<(f32, Rgba)> = None;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx.abs() != r && dy.abs() != r {
                    continue;
                }
                let (nx, ny) = (x + dx, y + dy);
                if !mask.get(nx, ny) {
                    continue;
                }
                let Some(c) = source.get(nx, ny) else {
                    continue;
                };
                let l = luminance(c);
                if l < ink_cutoff && best.is_none_or(|(bl, _)| l < bl) {
                    best = Some((l, c));
                }
            }
        }
        if let Some((_, c)) = best {
            return Some(c);
        }
    }
    None
}

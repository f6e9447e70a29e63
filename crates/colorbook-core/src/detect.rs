//! Line-art detection: derive the protection [`Mask`] from a page.
//!
//! This module defines the [`LineDetector`] trait for pluggable
//! detection strategies and the [`MaskStrategy`] enum that selects one
//! at runtime, plus [`build_mask`] which runs the chosen strategy
//! followed by the shared morphology post-processing.
//!
//! # Strategies
//!
//! - [`MaskStrategy::FixedThreshold`]: near-black or dark-luminance
//!   pixels are lines, with an optional hysteresis pass that promotes
//!   mid-tone pixels touching a hard-black pixel (recovers
//!   anti-aliased and JPEG-softened edges).
//! - [`MaskStrategy::AdaptiveSobel`]: a pixel is a line when it is
//!   darker than its local mean (integral image) by `offset`, or
//!   when its Sobel gradient magnitude exceeds `sobel_threshold`.
//!   Works for coloured and light-toned outlines.
//!
//! # Post-processing
//!
//! Both are followed by a closing of `close_radius` (bridges hairline
//! breaks in strokes), merged back with the raw detection so outlines
//! on the image border survive, and a dilation of `grow` (safety
//! margin against fill bleed).

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, sum_image_pixels};
use serde::{Deserialize, Serialize};

use crate::buffer::{ImageSource, PixelBuffer};
use crate::luminance::{luminance, luminance_plane, to_gray_image};
use crate::mask::Mask;
use crate::morphology::{self, NEIGHBOURS_8};
use crate::types::{ColorbookError, Dimensions};

/// Largest accepted `close_radius` / `grow`.
pub const MAX_MORPHOLOGY_RADIUS: u32 = 3;

/// Smallest and largest accepted adaptive window sizes.
pub const ADAPTIVE_WINDOW_RANGE: std::ops::RangeInclusive<u32> = 3..=63;

/// Selects which line detection algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskStrategy {
    /// Global thresholds on channel values and luminance.
    FixedThreshold {
        /// A pixel whose R, G and B are all below this is a line.
        black_threshold: u8,
        /// A pixel whose luminance is below this is a line.
        luminance_threshold: u8,
        /// When set, pixels darker than this ceiling that touch a line
        /// pixel (8-connected) are promoted to line.
        hysteresis_ceiling: Option<u8>,
    },
    /// Local-mean threshold combined with Sobel edge magnitude.
    AdaptiveSobel {
        /// Side of the square averaging window, odd.
        window: u32,
        /// How far below the local mean a pixel must be to count.
        offset: f32,
        /// Minimum `|Gx| + |Gy|` (unnormalised 3x3 Sobel) for an edge.
        sobel_threshold: f32,
        /// Absolute luminance below which a pixel is always a line, so
        /// solid ink interiors (flat, hence edge-free) stay protected.
        luminance_threshold: u8,
    },
}

impl MaskStrategy {
    pub const DEFAULT_BLACK_THRESHOLD: u8 = 40;
    pub const DEFAULT_LUMINANCE_THRESHOLD: u8 = 65;
    pub const DEFAULT_HYSTERESIS_CEILING: u8 = 200;
    pub const DEFAULT_WINDOW: u32 = 21;
    pub const DEFAULT_OFFSET: f32 = 10.0;
    pub const DEFAULT_SOBEL_THRESHOLD: f32 = 50.0;

    /// [`FixedThreshold`](Self::FixedThreshold) with default values.
    #[must_use]
    pub const fn fixed_threshold() -> Self {
        Self::FixedThreshold {
            black_threshold: Self::DEFAULT_BLACK_THRESHOLD,
            luminance_threshold: Self::DEFAULT_LUMINANCE_THRESHOLD,
            hysteresis_ceiling: Some(Self::DEFAULT_HYSTERESIS_CEILING),
        }
    }

    /// [`AdaptiveSobel`](Self::AdaptiveSobel) with default values.
    #[must_use]
    pub const fn adaptive_sobel() -> Self {
        Self::AdaptiveSobel {
            window: Self::DEFAULT_WINDOW,
            offset: Self::DEFAULT_OFFSET,
            sobel_threshold: Self::DEFAULT_SOBEL_THRESHOLD,
            luminance_threshold: Self::DEFAULT_LUMINANCE_THRESHOLD,
        }
    }

    fn validate(&self) -> Result<(), ColorbookError> {
        match *self {
            Self::FixedThreshold { .. } => Ok(()),
            Self::AdaptiveSobel {
                window,
                offset,
                sobel_threshold,
                ..
            } => {
                if window % 2 == 0 || !ADAPTIVE_WINDOW_RANGE.contains(&window) {
                    return Err(ColorbookError::InvalidConfig(format!(
                        "adaptive window must be odd and within {ADAPTIVE_WINDOW_RANGE:?}, got {window}"
                    )));
                }
                if !offset.is_finite() || offset < 0.0 {
                    return Err(ColorbookError::InvalidConfig(format!(
                        "adaptive offset must be finite and non-negative, got {offset}"
                    )));
                }
                if !sobel_threshold.is_finite() || sobel_threshold < 0.0 {
                    return Err(ColorbookError::InvalidConfig(format!(
                        "sobel threshold must be finite and non-negative, got {sobel_threshold}"
                    )));
                }
                Ok(())
            }
        }
    }
}

impl Default for MaskStrategy {
    fn default() -> Self {
        Self::adaptive_sobel()
    }
}

/// Trait for line detection strategies.
///
/// Input: the page as RGBA. Output: the raw line mask, before any
/// morphology.
pub trait LineDetector {
    /// Mark line pixels in `source`.
    fn detect(&self, source: &PixelBuffer) -> Mask;
}

impl LineDetector for MaskStrategy {
    fn detect(&self, source: &PixelBuffer) -> Mask {
        match *self {
            Self::FixedThreshold {
                black_threshold,
                luminance_threshold,
                hysteresis_ceiling,
            } => fixed_threshold(
                source,
                black_threshold,
                luminance_threshold,
                hysteresis_ceiling,
            ),
            Self::AdaptiveSobel {
                window,
                offset,
                sobel_threshold,
                luminance_threshold,
            } => adaptive_sobel(
                source,
                window,
                offset,
                sobel_threshold,
                luminance_threshold,
            ),
        }
    }
}

/// Configuration for building the protection mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Which detector marks the raw line pixels.
    pub strategy: MaskStrategy,
    /// Radius of the closing applied to the raw mask. `0` disables it.
    pub close_radius: u32,
    /// Extra dilation after closing. `0` disables it.
    pub grow: u32,
}

impl MaskConfig {
    pub const DEFAULT_CLOSE_RADIUS: u32 = 1;
    pub const DEFAULT_GROW: u32 = 1;

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), ColorbookError> {
        self.strategy.validate()?;
        if self.close_radius > MAX_MORPHOLOGY_RADIUS {
            return Err(ColorbookError::InvalidConfig(format!(
                "close_radius must be at most {MAX_MORPHOLOGY_RADIUS}, got {}",
                self.close_radius
            )));
        }
        if self.grow > MAX_MORPHOLOGY_RADIUS {
            return Err(ColorbookError::InvalidConfig(format!(
                "grow must be at most {MAX_MORPHOLOGY_RADIUS}, got {}",
                self.grow
            )));
        }
        Ok(())
    }
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            strategy: MaskStrategy::default(),
            close_radius: Self::DEFAULT_CLOSE_RADIUS,
            grow: Self::DEFAULT_GROW,
        }
    }
}

/// Read `source` and build its protection mask.
///
/// # Errors
///
/// Returns [`ColorbookError::PixelAccessDenied`] if the source refuses
/// pixel reads, and [`ColorbookError::InvalidConfig`] for an
/// out-of-range `config`. No partial mask is ever returned.
pub fn build_mask<S: ImageSource + ?Sized>(
    source: &S,
    config: &MaskConfig,
) -> Result<Mask, ColorbookError> {
    config.validate()?;
    let pixels = source.read_pixels().inspect_err(|e| {
        log::warn!("mask build aborted: {e}");
    })?;
    Ok(build_mask_from_pixels(&pixels, config))
}

/// Build the protection mask from pixels already in memory.
///
/// `config` is assumed valid (see [`MaskConfig::validate`]).
#[must_use = "returns the protection mask"]
pub fn build_mask_from_pixels(pixels: &PixelBuffer, config: &MaskConfig) -> Mask {
    let raw = config.strategy.detect(pixels);
    // Erosion peels strokes lying on the image border; keep every
    // detected pixel so closing only ever adds protection.
    let mut closed = morphology::close(&raw, config.close_radius);
    closed.union_with(&raw);
    let grown = morphology::dilate(&closed, config.grow);
    log::debug!(
        "mask {}: raw {} px, closed {} px, grown {} px",
        pixels.dimensions(),
        raw.count_set(),
        closed.count_set(),
        grown.count_set(),
    );
    grown
}

fn fixed_threshold(
    source: &PixelBuffer,
    black_threshold: u8,
    luminance_threshold: u8,
    hysteresis_ceiling: Option<u8>,
) -> Mask {
    let lum_thr = f32::from(luminance_threshold);
    let hard: Vec<u8> = source
        .pixels()
        .map(|p| {
            let near_black =
                p.r() < black_threshold && p.g() < black_threshold && p.b() < black_threshold;
            u8::from(near_black || luminance(p) < lum_thr)
        })
        .collect();
    let hard = Mask::from_bits_unchecked(source.dimensions(), hard);

    let Some(ceiling) = hysteresis_ceiling else {
        return hard;
    };

    let ceiling = f32::from(ceiling);
    let (w, h) = (i64::from(source.width()), i64::from(source.height()));
    let mut bits = hard.bits().to_vec();
    let mut promoted = 0usize;
    let mut i = 0usize;
    for y in 0..h {
        for x in 0..w {
            if !hard.is_set(i)
                && luminance(source.at(i)) < ceiling
                && NEIGHBOURS_8
                    .iter()
                    .any(|&(dx, dy)| hard.get(x + dx, y + dy))
            {
                bits[i] = 1;
                promoted += 1;
            }
            i += 1;
        }
    }
    log::debug!("hysteresis promoted {promoted} px");
    Mask::from_bits_unchecked(source.dimensions(), bits)
}

fn adaptive_sobel(
    source: &PixelBuffer,
    window: u32,
    offset: f32,
    sobel_threshold: f32,
    luminance_threshold: u8,
) -> Mask {
    let dims = source.dimensions();
    let lum = luminance_plane(source);
    let gray = to_gray_image(source);
    let integral: Integral = integral_image::<_, u64>(&gray);
    let magnitude = sobel_magnitude(&gray);

    let half = i64::from(window / 2);
    let abs_thr = f32::from(luminance_threshold);
    let (w, h) = (i64::from(dims.width), i64::from(dims.height));
    let mut bits = Vec::with_capacity(dims.pixel_count());
    let mut i = 0usize;
    for y in 0..h {
        for x in 0..w {
            let mean = window_mean(&integral, dims, (x, y), half);
            let y_px = lum[i];
            let is_line = y_px < abs_thr
                || f64::from(y_px) < mean - f64::from(offset)
                || magnitude[i] > sobel_threshold;
            bits.push(u8::from(is_line));
            i += 1;
        }
    }
    Mask::from_bits_unchecked(dims, bits)
}

/// `|Gx| + |Gy|` of the 3x3 Sobel operator, row-major.
///
/// Wraps [`imageproc::gradients`], which replicates edge pixels at the
/// border, so a flat image has zero gradient everywhere including its
/// frame.
fn sobel_magnitude(gray: &GrayImage) -> Vec<f32> {
    let gx = imageproc::gradients::horizontal_sobel(gray);
    let gy = imageproc::gradients::vertical_sobel(gray);
    gx.pixels()
        .zip(gy.pixels())
        .map(|(a, b)| f32::from(a.0[0].unsigned_abs()) + f32::from(b.0[0].unsigned_abs()))
        .collect()
}

/// Integral image of the rounded luminance, as built by
/// [`imageproc::integral_image::integral_image`].
type Integral = ImageBuffer<Luma<u64>, Vec<u64>>;

/// Mean luminance over the `2 * half + 1` square centred on `(x, y)`,
/// clipped to the image.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn window_mean(integral: &Integral, dims: Dimensions, (x, y): (i64, i64), half: i64) -> f64 {
    let left = (x - half).max(0);
    let top = (y - half).max(0);
    let right = (x + half).min(i64::from(dims.width) - 1);
    let bottom = (y + half).min(i64::from(dims.height) - 1);
    let [sum] = sum_image_pixels(integral, left as u32, top as u32, right as u32, bottom as u32);
    let count = (right - left + 1) * (bottom - top + 1);
    sum as f64 / count as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Rgba;

    /// White page with a 1px black square outline from (2,2) to (12,12).
    fn square_outline() -> PixelBuffer {
        PixelBuffer::from_fn(15, 15, |x, y| {
            let on_x = (x == 2 || x == 12) && (2..=12).contains(&y);
            let on_y = (y == 2 || y == 12) && (2..=12).contains(&x);
            if on_x || on_y { Rgba::BLACK } else { Rgba::WHITE }
        })
    }

    fn raw(strategy: MaskStrategy) -> MaskConfig {
        MaskConfig {
            strategy,
            close_radius: 0,
            grow: 0,
        }
    }

    struct Tainted;

    impl ImageSource for Tainted {
        fn dimensions(&self) -> Dimensions {
            Dimensions::new(4, 4)
        }

        fn read_pixels(&self) -> Result<PixelBuffer, ColorbookError> {
            Err(ColorbookError::PixelAccessDenied(
                "cross-origin canvas".to_string(),
            ))
        }
    }

    #[test]
    fn default_strategy_is_adaptive_sobel() {
        assert_eq!(MaskStrategy::default(), MaskStrategy::adaptive_sobel());
        let config = MaskConfig::default();
        assert_eq!(config.close_radius, 1);
        assert_eq!(config.grow, 1);
    }

    #[test]
    fn fixed_threshold_marks_exactly_the_outline() {
        let page = square_outline();
        let mask = build_mask(&page, &raw(MaskStrategy::fixed_threshold())).unwrap();
        assert_eq!(mask.count_set(), 40);
        assert!(mask.get(2, 7));
        assert!(!mask.get(7, 7));
    }

    #[test]
    fn all_white_gives_empty_mask_for_every_strategy() {
        let page = PixelBuffer::filled(20, 20, Rgba::WHITE);
        for strategy in [MaskStrategy::fixed_threshold(), MaskStrategy::adaptive_sobel()] {
            let mask = build_mask(&page, &MaskConfig {
                strategy,
                ..MaskConfig::default()
            })
            .unwrap();
            assert_eq!(mask.count_set(), 0, "{strategy:?}");
        }
    }

    #[test]
    fn all_black_gives_full_mask_for_every_strategy() {
        let page = PixelBuffer::filled(20, 20, Rgba::BLACK);
        for strategy in [MaskStrategy::fixed_threshold(), MaskStrategy::adaptive_sobel()] {
            let mask = build_mask(&page, &MaskConfig {
                strategy,
                ..MaskConfig::default()
            })
            .unwrap();
            assert_eq!(mask.count_set(), 400, "{strategy:?}");
        }
    }

    #[test]
    fn hysteresis_promotes_gray_neighbours_only() {
        // Black column at x = 3, mid-gray halo at x = 4, light gray at x = 6.
        let page = PixelBuffer::from_fn(10, 5, |x, _| match x {
            3 => Rgba::BLACK,
            4 | 6 => Rgba::rgb(150, 150, 150),
            _ => Rgba::WHITE,
        });
        let without = build_mask(
            &page,
            &raw(MaskStrategy::FixedThreshold {
                black_threshold: 40,
                luminance_threshold: 65,
                hysteresis_ceiling: None,
            }),
        )
        .unwrap();
        assert!(!without.get(4, 2));

        let with = build_mask(&page, &raw(MaskStrategy::fixed_threshold())).unwrap();
        assert!(with.get(4, 2), "halo next to ink should be promoted");
        assert!(!with.get(6, 2), "gray away from ink must stay clear");
        assert!(!with.get(2, 2), "white neighbour must stay clear");
    }

    #[test]
    fn adaptive_catches_light_coloured_outline() {
        // A light blue line that fixed thresholds miss entirely.
        let ink = Rgba::rgb(120, 170, 230);
        let page = PixelBuffer::from_fn(30, 30, |x, _| if x == 15 { ink } else { Rgba::WHITE });
        let fixed = build_mask(&page, &raw(MaskStrategy::fixed_threshold())).unwrap();
        assert_eq!(fixed.count_set(), 0);

        let adaptive = build_mask(&page, &raw(MaskStrategy::adaptive_sobel())).unwrap();
        for y in 0..30 {
            assert!(adaptive.get(15, y), "line pixel at y={y} missed");
        }
        assert!(!adaptive.get(5, 10), "flat background must stay clear");
    }

    #[test]
    fn closing_and_grow_are_applied_in_order() {
        let page = square_outline();
        let closed = build_mask(
            &page,
            &MaskConfig {
                strategy: MaskStrategy::fixed_threshold(),
                close_radius: 1,
                grow: 0,
            },
        )
        .unwrap();
        assert_eq!(closed.count_set(), 40);
        let grown = build_mask(
            &page,
            &MaskConfig {
                strategy: MaskStrategy::fixed_threshold(),
                close_radius: 1,
                grow: 1,
            },
        )
        .unwrap();
        assert!(closed.is_subset_of(&grown));
        assert!(grown.get(3, 7) && grown.get(1, 7));
    }

    #[test]
    fn tainted_source_is_rejected() {
        let result = build_mask(&Tainted, &MaskConfig::default());
        assert!(matches!(result, Err(ColorbookError::PixelAccessDenied(_))));
    }

    #[test]
    fn even_window_is_invalid() {
        let config = MaskConfig {
            strategy: MaskStrategy::AdaptiveSobel {
                window: 20,
                offset: 10.0,
                sobel_threshold: 50.0,
                luminance_threshold: 65,
            },
            ..MaskConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ColorbookError::InvalidConfig(_))
        ));
    }

    #[test]
    fn oversized_grow_is_invalid() {
        let config = MaskConfig {
            grow: 9,
            ..MaskConfig::default()
        };
        assert!(matches!(
            build_mask(&PixelBuffer::transparent(2, 2), &config),
            Err(ColorbookError::InvalidConfig(_))
        ));
    }

    #[test]
    fn window_mean_matches_brute_force() {
        let page = PixelBuffer::from_fn(6, 5, |x, y| {
            let v = u8::try_from(x * 7 + y * 40).unwrap();
            Rgba::rgb(v, v, v)
        });
        let gray = to_gray_image(&page);
        let integral: Integral = integral_image::<_, u64>(&gray);
        let dims = page.dimensions();
        let brute = |x0: u32, y0: u32, x1: u32, y1: u32| {
            let (mut sum, mut n) = (0.0, 0.0);
            for y in y0..=y1 {
                for x in x0..=x1 {
                    sum += f64::from(gray.get_pixel(x, y).0[0]);
                    n += 1.0;
                }
            }
            sum / n
        };
        assert!((window_mean(&integral, dims, (2, 2), 1) - brute(1, 1, 3, 3)).abs() < 1e-9);
        // Clipped at the corner and to the whole image.
        assert!((window_mean(&integral, dims, (0, 0), 2) - brute(0, 0, 2, 2)).abs() < 1e-9);
        assert!((window_mean(&integral, dims, (5, 4), 50) - brute(0, 0, 5, 4)).abs() < 1e-9);
    }

    #[test]
    fn outline_on_image_border_survives_closing() {
        // 1px frame along the edge of a 40x40 page, default close and grow.
        let page = PixelBuffer::from_fn(40, 40, |x, y| {
            if x == 0 || y == 0 || x == 39 || y == 39 { Rgba::BLACK } else { Rgba::WHITE }
        });
        let config = MaskConfig {
            strategy: MaskStrategy::fixed_threshold(),
            ..MaskConfig::default()
        };
        let mask = build_mask(&page, &config).unwrap();
        let on_frame = (0..40i64)
            .flat_map(|y| (0..40i64).map(move |x| (x, y)))
            .filter(|&(x, y)| x == 0 || y == 0 || x == 39 || y == 39)
            .filter(|&(x, y)| mask.get(x, y))
            .count();
        assert_eq!(on_frame, 156);
        assert!(mask.get(1, 20), "grow still applies inside the frame");
        assert!(!mask.get(20, 20));
    }

    #[test]
    fn config_serde_round_trip() {
        let config = MaskConfig {
            strategy: MaskStrategy::fixed_threshold(),
            close_radius: 2,
            grow: 0,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("fixed_threshold"));
        let back: MaskConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}

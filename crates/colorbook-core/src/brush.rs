//! Freehand brush and eraser.
//!
//! A stroke is a polyline of pointer samples. Each segment is walked in
//! steps of half the brush radius (at least one pixel) and a filled
//! circle is stamped at every step. A pixel belongs to the circle when
//! its center lies within `radius` of the stamp point. Protected mask
//! pixels are skipped, so scribbling over an outline never hides it.

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::composite::blend_over;
use crate::mask::Mask;
use crate::types::{ColorbookError, Rgba};

/// What a stamp does to the pixels it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushMode {
    /// Blend the color over the paint layer.
    Paint(Rgba),
    /// Overwrite with full transparency (no blending).
    Erase,
}

/// Brush geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    /// Circle radius in pixels.
    pub radius: f32,
}

impl BrushConfig {
    pub const DEFAULT_RADIUS: f32 = 7.5;
    pub const MIN_RADIUS: f32 = 0.5;
    pub const MAX_RADIUS: f32 = 256.0;

    /// Distance between consecutive stamps along a segment.
    #[must_use]
    pub fn step(&self) -> f32 {
        (self.radius / 2.0).max(1.0)
    }

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::InvalidConfig`] if `radius` is not a
    /// finite value in `MIN_RADIUS..=MAX_RADIUS`.
    pub fn validate(&self) -> Result<(), ColorbookError> {
        if !(Self::MIN_RADIUS..=Self::MAX_RADIUS).contains(&self.radius) {
            return Err(ColorbookError::InvalidConfig(format!(
                "brush radius must be within {}..={}, got {}",
                Self::MIN_RADIUS,
                Self::MAX_RADIUS,
                self.radius
            )));
        }
        Ok(())
    }
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            radius: Self::DEFAULT_RADIUS,
        }
    }
}

/// Stamp one circle centred on `(cx, cy)`.
///
/// Pixels off the canvas are skipped, so a circle may partially
/// overlap the edge. Returns the number of pixels whose value changed.
pub fn stamp_circle(
    paint: &mut PixelBuffer,
    mask: &Mask,
    (cx, cy): (f32, f32),
    radius: f32,
    mode: BrushMode,
) -> usize {
    if !(cx.is_finite() && cy.is_finite()) || radius <= 0.0 {
        return 0;
    }
    let r2 = radius * radius;
    #[allow(clippy::cast_possible_truncation)]
    let (x0, x1, y0, y1) = (
        (cx - radius).floor() as i64,
        (cx + radius).ceil() as i64,
        (cy - radius).floor() as i64,
        (cy + radius).ceil() as i64,
    );

    let mut changed = 0usize;
    for y in y0..=y1 {
        for x in x0..=x1 {
            #[allow(clippy::cast_precision_loss)]
            let (dx, dy) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
            if dx.mul_add(dx, dy * dy) > r2 {
                continue;
            }
            let Some(i) = paint.index_of(x, y) else {
                continue;
            };
            if mask.is_set(i) {
                continue;
            }
            let before = paint.at(i);
            let after = match mode {
                BrushMode::Paint(color) => blend_over(color, before),
                BrushMode::Erase => Rgba::TRANSPARENT,
            };
            if after != before {
                paint.put(i, after);
                changed += 1;
            }
        }
    }
    changed
}

/// Stamp circles along the segment `from -> to`, excluding `from`
/// (already stamped by the previous segment or the stroke's first dot).
///
/// Returns the number of pixel writes that changed a value.
pub fn stroke_segment(
    paint: &mut PixelBuffer,
    mask: &Mask,
    from: (f32, f32),
    to: (f32, f32),
    brush: &BrushConfig,
    mode: BrushMode,
) -> usize {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let distance = dx.hypot(dy);
    if !distance.is_finite() {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = ((distance / brush.step()).ceil() as u32).max(1);
    let mut changed = 0usize;
    for k in 1..=steps {
        #[allow(clippy::cast_precision_loss)]
        let t = k as f32 / steps as f32;
        let point = (dx.mul_add(t, from.0), dy.mul_add(t, from.1));
        changed += stamp_circle(paint, mask, point, brush.radius, mode);
    }
    changed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GREEN: Rgba = Rgba::rgb(0, 160, 0);

    fn blank(size: u32) -> (PixelBuffer, Mask) {
        (PixelBuffer::transparent(size, size), Mask::empty(size, size))
    }

    #[test]
    fn stamp_covers_disc_by_pixel_centers() {
        let (mut paint, mask) = blank(20);
        let n = stamp_circle(&mut paint, &mask, (10.0, 10.0), 2.0, BrushMode::Paint(GREEN));
        // Centers at +-0.5 and +-1.5 around (10, 10), excluding the four
        // corners (1.5^2 * 2 > 4).
        assert_eq!(n, 12);
        assert_eq!(paint.opaque_count(), 12);
        assert_eq!(paint.get(9, 9), Some(GREEN));
        assert_eq!(paint.get(8, 8), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn stamp_skips_protected_pixels() {
        let mut paint = PixelBuffer::transparent(20, 20);
        let mask = Mask::from_fn(20, 20, |x, _| x == 10);
        stamp_circle(&mut paint, &mask, (10.0, 10.0), 4.0, BrushMode::Paint(GREEN));
        for y in 0..20 {
            assert_eq!(paint.get(10, y), Some(Rgba::TRANSPARENT), "painted outline at y={y}");
        }
        assert_eq!(paint.get(9, 10), Some(GREEN));
    }

    #[test]
    fn stamp_clips_at_canvas_edge() {
        let (mut paint, mask) = blank(10);
        let n = stamp_circle(&mut paint, &mask, (0.0, 0.0), 3.0, BrushMode::Paint(GREEN));
        assert!(n > 0 && n < 9 * 4, "expected a clipped quarter disc, got {n}");
        let n = stamp_circle(&mut paint, &mask, (-50.0, -50.0), 3.0, BrushMode::Paint(GREEN));
        assert_eq!(n, 0);
    }

    #[test]
    fn eraser_overwrites_instead_of_blending() {
        let mut paint = PixelBuffer::filled(10, 10, GREEN);
        let mask = Mask::from_fn(10, 10, |x, y| x == 5 && y == 5);
        stamp_circle(&mut paint, &mask, (5.0, 5.0), 2.0, BrushMode::Erase);
        assert_eq!(paint.get(4, 4), Some(Rgba::TRANSPARENT));
        assert_eq!(paint.get(5, 5), Some(GREEN), "protected pixel must survive the eraser");
    }

    #[test]
    fn translucent_paint_blends() {
        let mut paint = PixelBuffer::filled(4, 4, Rgba::WHITE);
        let mask = Mask::empty(4, 4);
        stamp_circle(&mut paint, &mask, (2.0, 2.0), 1.0, BrushMode::Paint(Rgba([0, 0, 0, 128])));
        let p = paint.get(1, 1).unwrap();
        assert_eq!(p.a(), 255);
        assert!((120..=135).contains(&p.r()), "expected mid gray, got {p:?}");
    }

    #[test]
    fn segment_leaves_no_gaps() {
        let (mut paint, mask) = blank(64);
        let brush = BrushConfig { radius: 2.0 };
        stroke_segment(&mut paint, &mask, (4.0, 32.0), (60.0, 32.0), &brush, BrushMode::Paint(GREEN));
        for x in 4..60 {
            assert_eq!(paint.get(x, 32), Some(GREEN), "gap at x={x}");
        }
        assert_eq!(paint.get(2, 32), Some(Rgba::TRANSPARENT), "start point itself is not stamped");
    }

    #[test]
    fn zero_length_segment_stamps_once() {
        let (mut paint, mask) = blank(16);
        let brush = BrushConfig { radius: 2.0 };
        let n = stroke_segment(&mut paint, &mask, (8.0, 8.0), (8.0, 8.0), &brush, BrushMode::Paint(GREEN));
        assert_eq!(n, 12);
    }

    #[test]
    fn step_is_half_radius_but_at_least_one() {
        assert!((BrushConfig::default().step() - 3.75).abs() < f32::EPSILON);
        assert!((BrushConfig { radius: 1.0 }.step() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn radius_is_validated() {
        assert!(BrushConfig::default().validate().is_ok());
        for radius in [0.0, -1.0, f32::NAN, 1000.0] {
            assert!(
                BrushConfig { radius }.validate().is_err(),
                "radius {radius} should be rejected",
            );
        }
    }
}

//! Line-protected bucket fill.
//!
//! The fill compares colors as the user currently sees them: a pixel's
//! *composite* color is the paint layer's color where paint is present
//! (alpha > 0) and the base page's color elsewhere. Starting from the
//! seed it absorbs 4-connected, unprotected pixels whose composite
//! color is within `tolerance` of the seed's on every R/G/B channel,
//! writing the fill color at full opacity into the paint layer.
//!
//! Anti-aliased outlines leave a gradient the tolerance test rejects,
//! which would show as a thin light seam along every edge. After the
//! traversal the filled region is therefore grown `edge_grow` times:
//! each round paints every unprotected pixel 8-adjacent to the region
//! as it stood after the previous round. Protected pixels are never
//! painted, in either phase.
//!
//! The traversal uses an explicit stack, so region size is bounded by
//! heap, not call depth.

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::mask::Mask;
use crate::morphology::NEIGHBOURS_8;
use crate::types::{ColorbookError, Dimensions, Rgba};

/// Tunables for [`flood_fill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Per-channel tolerance used when a fill request does not carry one.
    pub tolerance: u8,
    /// Rounds of post-fill growth into anti-aliasing halos.
    pub edge_grow: u32,
    /// A seed whose composite color is this close to the fill color is
    /// treated as already filled.
    pub same_color_epsilon: u8,
}

impl FillConfig {
    pub const DEFAULT_TOLERANCE: u8 = 80;
    pub const DEFAULT_EDGE_GROW: u32 = 2;
    pub const DEFAULT_SAME_COLOR_EPSILON: u8 = 5;
    /// Largest accepted `edge_grow`.
    pub const MAX_EDGE_GROW: u32 = 3;

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::InvalidConfig`] if `edge_grow` exceeds
    /// [`Self::MAX_EDGE_GROW`].
    pub fn validate(&self) -> Result<(), ColorbookError> {
        if self.edge_grow > Self::MAX_EDGE_GROW {
            return Err(ColorbookError::InvalidConfig(format!(
                "edge_grow must be at most {}, got {}",
                Self::MAX_EDGE_GROW,
                self.edge_grow
            )));
        }
        Ok(())
    }
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            tolerance: Self::DEFAULT_TOLERANCE,
            edge_grow: Self::DEFAULT_EDGE_GROW,
            same_color_epsilon: Self::DEFAULT_SAME_COLOR_EPSILON,
        }
    }
}

/// One bucket-fill click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillRequest {
    pub seed_x: i64,
    pub seed_y: i64,
    /// Color to paint; written with alpha forced to 255.
    pub color: Rgba,
    /// Per-channel (Chebyshev) tolerance against the seed color.
    pub tolerance: u8,
}

/// What a fill did.
///
/// Only [`Filled`](Self::Filled) touched the paint layer; the other
/// variants are deliberate no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// Pixels were painted.
    Filled {
        /// Pixels absorbed by the tolerance traversal.
        flooded: usize,
        /// Pixels added by post-fill edge growth.
        grown: usize,
    },
    /// The seed is a protected line pixel.
    SeedOnLine,
    /// The seed already shows the fill color.
    AlreadyTargetColor,
    /// The seed is off the canvas.
    SeedOutOfBounds,
}

impl FillOutcome {
    /// Whether the paint layer was modified.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Filled { .. })
    }
}

/// Color a viewer sees at `index`: paint where painted, page elsewhere.
#[must_use]
pub fn composite_color(paint: &PixelBuffer, base: &PixelBuffer, index: usize) -> Rgba {
    let p = paint.at(index);
    if p.a() > 0 { p } else { base.at(index) }
}

/// Fill the region around `request`'s seed into `paint`.
///
/// `paint`, `base` and `mask` must share dimensions. The paint layer is
/// only written once all checks have passed, so an error leaves it
/// untouched.
///
/// # Errors
///
/// Returns [`ColorbookError::DimensionMismatch`] when the rasters
/// disagree in size and [`ColorbookError::InvalidConfig`] for a bad
/// `config`.
pub fn flood_fill(
    paint: &mut PixelBuffer,
    base: &PixelBuffer,
    mask: &Mask,
    request: &FillRequest,
    config: &FillConfig,
) -> Result<FillOutcome, ColorbookError> {
    config.validate()?;
    paint.ensure_same_size(base.dimensions())?;
    paint.ensure_same_size(mask.dimensions())?;

    let Some(seed) = paint.index_of(request.seed_x, request.seed_y) else {
        return Ok(FillOutcome::SeedOutOfBounds);
    };
    if mask.is_set(seed) {
        log::debug!(
            "fill at ({}, {}) ignored: seed is on a line",
            request.seed_x,
            request.seed_y
        );
        return Ok(FillOutcome::SeedOnLine);
    }
    let fill = request.color.with_alpha(255);
    let seed_color = composite_color(paint, base, seed);
    if seed_color.rgb_distance(fill) <= config.same_color_epsilon {
        return Ok(FillOutcome::AlreadyTargetColor);
    }

    let dims = paint.dimensions();
    let mut filled = vec![false; dims.pixel_count()];
    let flooded = traverse(
        paint,
        base,
        mask,
        seed,
        seed_color,
        request.tolerance,
        &mut filled,
    );
    let grown = grow_edges(dims, mask, &mut filled, config.edge_grow);

    for (i, _) in filled.iter().enumerate().filter(|&(_, &f)| f) {
        paint.put(i, fill);
    }

    log::debug!(
        "fill at ({}, {}) with {fill}: {flooded} flooded + {grown} grown px",
        request.seed_x,
        request.seed_y
    );
    Ok(FillOutcome::Filled { flooded, grown })
}

/// Depth-first 4-connected traversal from `seed`, marking `filled`.
///
/// Reads composite colors from the unmodified layers; nothing is
/// painted until the traversal and growth are both complete.
fn traverse(
    paint: &PixelBuffer,
    base: &PixelBuffer,
    mask: &Mask,
    seed: usize,
    seed_color: Rgba,
    tolerance: u8,
    filled: &mut [bool],
) -> usize {
    let width = paint.width() as usize;
    let height = paint.height() as usize;
    let mut visited = vec![false; filled.len()];
    let mut stack = vec![seed];
    let mut count = 0usize;

    while let Some(i) = stack.pop() {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        if mask.is_set(i) || composite_color(paint, base, i).rgb_distance(seed_color) > tolerance {
            continue;
        }
        filled[i] = true;
        count += 1;

        let (x, y) = (i % width, i / width);
        if x > 0 {
            stack.push(i - 1);
        }
        if x + 1 < width {
            stack.push(i + 1);
        }
        if y > 0 {
            stack.push(i - width);
        }
        if y + 1 < height {
            stack.push(i + width);
        }
    }
    count
}

/// Grow `filled` by `rounds` rings of unprotected 8-neighbours.
///
/// Each round decides its new pixels from the previous round's set
/// only, so growth advances exactly one pixel per round. A diagonal
/// step is taken only when one of the two pixels it cuts past is
/// unprotected, so a 1px diagonal line stops growth just as it stops
/// the 4-connected traversal.
fn grow_edges(dims: Dimensions, mask: &Mask, filled: &mut [bool], rounds: u32) -> usize {
    let (w, h) = (i64::from(dims.width), i64::from(dims.height));
    let width = dims.width as usize;
    let mut total = 0usize;
    for _ in 0..rounds {
        let mut ring = Vec::new();
        let mut i = 0usize;
        for y in 0..h {
            for x in 0..w {
                if !filled[i]
                    && !mask.is_set(i)
                    && NEIGHBOURS_8.iter().any(|&(dx, dy)| {
                        let (nx, ny) = (x + dx, y + dy);
                        dims.contains(nx, ny)
                            && !cuts_corner(mask, (x, y), (dx, dy))
                            && {
                                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                                let n = ny as usize * width + nx as usize;
                                filled[n]
                            }
                    })
                {
                    ring.push(i);
                }
                i += 1;
            }
        }
        if ring.is_empty() {
            break;
        }
        total += ring.len();
        for i in ring {
            filled[i] = true;
        }
    }
    total
}

/// Whether a diagonal step from `(x, y)` squeezes between two
/// protected pixels.
fn cuts_corner(mask: &Mask, (x, y): (i64, i64), (dx, dy): (i64, i64)) -> bool {
    dx != 0 && dy != 0 && mask.get(x + dx, y) && mask.get(x, y + dy)
}

//! Binary morphology on [`Mask`]s: dilation, erosion and closing.
//!
//! All operators use the 8-connected (Moore) neighbourhood and apply
//! one 3x3 pass per unit of radius. Each pass writes a fresh output
//! array computed only from the previous pass, so results never depend
//! on scan order. The input mask is never modified.
//!
//! Out-of-bounds neighbours count as "off": dilation simply ignores
//! them, erosion treats them as background, so erosion eats inward
//! from the image border.

use crate::mask::Mask;

/// Grow the set pixels by `radius` pixels.
///
/// A pixel becomes set if it was set, or any of its in-bounds 8
/// neighbours was set. `radius == 0` returns an unchanged copy.
#[must_use = "returns the dilated mask"]
pub fn dilate(mask: &Mask, radius: u32) -> Mask {
    iterate(mask, radius, dilate_once)
}

/// Shrink the set pixels by `radius` pixels.
///
/// A pixel stays set only if it was set and all 8 neighbours were set,
/// with off-canvas neighbours counting as unset. `radius == 0` returns
/// an unchanged copy.
#[must_use = "returns the eroded mask"]
pub fn erode(mask: &Mask, radius: u32) -> Mask {
    iterate(mask, radius, erode_once)
}

/// Morphological closing: `erode(dilate(mask, radius), radius)`.
///
/// Bridges gaps up to roughly `2 * radius` pixels wide without a net
/// growth of solid shapes.
#[must_use = "returns the closed mask"]
pub fn close(mask: &Mask, radius: u32) -> Mask {
    if radius == 0 {
        return mask.clone();
    }
    erode(&dilate(mask, radius), radius)
}

fn iterate(mask: &Mask, radius: u32, pass: fn(&Mask) -> Mask) -> Mask {
    let mut out = mask.clone();
    for _ in 0..radius {
        out = pass(&out);
    }
    out
}

/// Offsets of the Moore neighbourhood (excluding the centre).
pub(crate) const NEIGHBOURS_8: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

fn dilate_once(mask: &Mask) -> Mask {
    let (w, h) = (i64::from(mask.width()), i64::from(mask.height()));
    let src = mask.bits();
    let mut out = vec![0u8; src.len()];
    let mut i = 0usize;
    for y in 0..h {
        for x in 0..w {
            out[i] = u8::from(
                src[i] != 0
                    || NEIGHBOURS_8
                        .iter()
                        .any(|&(dx, dy)| mask.get(x + dx, y + dy)),
            );
            i += 1;
        }
    }
    Mask::from_bits_unchecked(mask.dimensions(), out)
}

fn erode_once(mask: &Mask) -> Mask {
    let (w, h) = (i64::from(mask.width()), i64::from(mask.height()));
    let src = mask.bits();
    let mut out = vec![0u8; src.len()];
    let mut i = 0usize;
    for y in 0..h {
        for x in 0..w {
            out[i] = u8::from(
                src[i] != 0
                    && NEIGHBOURS_8
                        .iter()
                        .all(|&(dx, dy)| mask.get(x + dx, y + dy)),
            );
            i += 1;
        }
    }
    Mask::from_bits_unchecked(mask.dimensions(), out)
}

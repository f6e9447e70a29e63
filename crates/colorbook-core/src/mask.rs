//! Binary protection mask.
//!
//! One byte per pixel, restricted to `{0, 1}`: `1` marks a line-art
//! pixel that no paint operation may overwrite. Masks are produced by
//! [`crate::detect`], reshaped by [`crate::morphology`] (which always
//! returns a new mask) and then shared read-only by the fill engine,
//! the brush and the line-layer renderer.

use image::GrayImage;

use crate::types::{ColorbookError, Dimensions};

/// A per-pixel protected/unprotected flag grid.
#[derive(Clone, PartialEq, Eq)]
pub struct Mask {
    dimensions: Dimensions,
    bits: Vec<u8>,
}

impl std::fmt::Debug for Mask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mask")
            .field("dimensions", &self.dimensions)
            .field("set", &self.count_set())
            .finish()
    }
}

impl Mask {
    /// An all-zero mask: nothing is protected.
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        let dimensions = Dimensions::new(width, height);
        Self {
            dimensions,
            bits: vec![0; dimensions.pixel_count()],
        }
    }

    /// An all-one mask: everything is protected.
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        let dimensions = Dimensions::new(width, height);
        Self {
            dimensions,
            bits: vec![1; dimensions.pixel_count()],
        }
    }

    /// Build a mask by evaluating `f` at every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let dimensions = Dimensions::new(width, height);
        let mut bits = Vec::with_capacity(dimensions.pixel_count());
        for y in 0..height {
            for x in 0..width {
                bits.push(u8::from(f(x, y)));
            }
        }
        Self { dimensions, bits }
    }

    /// Wrap raw row-major bits. Any non-zero byte is normalised to `1`.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::BufferSize`] unless
    /// `bits.len() == width * height`.
    pub fn from_raw(width: u32, height: u32, mut bits: Vec<u8>) -> Result<Self, ColorbookError> {
        let dimensions = Dimensions::new(width, height);
        if bits.len() != dimensions.pixel_count() {
            return Err(ColorbookError::BufferSize {
                expected: dimensions.pixel_count(),
                actual: bits.len(),
            });
        }
        for b in &mut bits {
            *b = u8::from(*b != 0);
        }
        Ok(Self { dimensions, bits })
    }

    pub(crate) const fn from_bits_unchecked(dimensions: Dimensions, bits: Vec<u8>) -> Self {
        Self { dimensions, bits }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// The raw row-major bits (each `0` or `1`).
    #[must_use]
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Whether the pixel at `index` is protected.
    #[must_use]
    pub fn is_set(&self, index: usize) -> bool {
        self.bits[index] != 0
    }

    /// Whether `(x, y)` is protected. Off-canvas coordinates are not.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn get(&self, x: i64, y: i64) -> bool {
        self.dimensions.contains(x, y)
            && self.bits[y as usize * self.dimensions.width as usize + x as usize] != 0
    }

    /// Number of protected pixels.
    #[must_use]
    pub fn count_set(&self) -> usize {
        self.bits.iter().filter(|&&b| b != 0).count()
    }

    /// Whether every pixel set in `self` is also set in `other`.
    ///
    /// Masks of different sizes are never subsets of each other.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.dimensions == other.dimensions
            && self
                .bits
                .iter()
                .zip(&other.bits)
                .all(|(&a, &b)| a == 0 || b != 0)
    }

    /// Also protect every pixel protected in `other`.
    ///
    /// Masks of different sizes are left unchanged.
    pub fn union_with(&mut self, other: &Self) {
        if self.dimensions != other.dimensions {
            return;
        }
        for (a, &b) in self.bits.iter_mut().zip(&other.bits) {
            *a |= b;
        }
    }

    /// Render as a grayscale image: protected pixels black (0),
    /// background white (255).
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        let raw = self
            .bits
            .iter()
            .map(|&b| if b == 0 { 255 } else { 0 })
            .collect();
        GrayImage::from_raw(self.dimensions.width, self.dimensions.height, raw)
            .unwrap_or_else(|| GrayImage::new(self.dimensions.width, self.dimensions.height))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_normalises_to_zero_one() {
        let mask = Mask::from_raw(2, 2, vec![0, 7, 255, 1]).unwrap();
        assert_eq!(mask.bits(), &[0, 1, 1, 1]);
        assert_eq!(mask.count_set(), 3);
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        assert!(matches!(
            Mask::from_raw(3, 3, vec![0; 8]),
            Err(ColorbookError::BufferSize {
                expected: 9,
                actual: 8
            })
        ));
    }

    #[test]
    fn off_canvas_is_unprotected() {
        let mask = Mask::full(3, 3);
        assert!(mask.get(0, 0));
        assert!(!mask.get(-1, 0));
        assert!(!mask.get(3, 1));
    }

    #[test]
    fn subset_relation() {
        let small = Mask::from_fn(4, 4, |x, y| x == 1 && y == 1);
        let big = Mask::from_fn(4, 4, |x, _| x <= 2);
        assert!(small.is_subset_of(&big));
        assert!(!big.is_subset_of(&small));
        assert!(Mask::empty(4, 4).is_subset_of(&small));
        assert!(!small.is_subset_of(&Mask::full(5, 4)));
    }

    #[test]
    fn union_adds_pixels_of_same_sized_mask() {
        let mut a = Mask::from_fn(4, 3, |x, _| x == 0);
        let b = Mask::from_fn(4, 3, |_, y| y == 2);
        a.union_with(&b);
        assert_eq!(a.count_set(), 3 + 4 - 1);
        assert!(b.is_subset_of(&a));

        let before = a.clone();
        a.union_with(&Mask::full(2, 2));
        assert_eq!(a, before);
    }

    #[test]
    fn gray_image_is_black_on_white() {
        let mask = Mask::from_fn(2, 1, |x, _| x == 0);
        let gray = mask.to_gray_image();
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
        assert_eq!(gray.get_pixel(1, 0).0[0], 255);
    }
}

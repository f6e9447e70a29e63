//! RGBA pixel buffers and the image-source boundary.
//!
//! [`PixelBuffer`] is the raster every layer is stored in: `width *
//! height` straight-alpha RGBA samples in row-major order. Accessors
//! come in two flavours: `get`/`set` silently ignore off-canvas
//! coordinates (what drawing code wants when a brush overhangs the
//! edge), while `try_get`/`try_set` reject them with
//! [`ColorbookError::OutOfBounds`].
//!
//! [`ImageSource`] is how decoded images enter the core. A host whose
//! pixels may be unreadable (a tainted browser canvas) reports that as
//! [`ColorbookError::PixelAccessDenied`] from
//! [`ImageSource::read_pixels`], which is the first and only pixel read
//! the core performs on a source.

use image::RgbaImage;

use crate::types::{ColorbookError, Dimensions, Rgba};

/// A width x height grid of RGBA samples.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    dimensions: Dimensions,
    samples: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("dimensions", &self.dimensions)
            .field("samples", &format_args!("[{} bytes]", self.samples.len()))
            .finish()
    }
}

impl PixelBuffer {
    /// A buffer filled with a single color.
    #[must_use]
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let dimensions = Dimensions::new(width, height);
        let samples = color.0.repeat(dimensions.pixel_count());
        Self {
            dimensions,
            samples,
        }
    }

    /// A fully transparent buffer.
    #[must_use]
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba::TRANSPARENT)
    }

    /// Build a buffer by evaluating `f` at every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgba) -> Self {
        let dimensions = Dimensions::new(width, height);
        let mut samples = Vec::with_capacity(dimensions.pixel_count() * 4);
        for y in 0..height {
            for x in 0..width {
                samples.extend_from_slice(&f(x, y).0);
            }
        }
        Self {
            dimensions,
            samples,
        }
    }

    /// Wrap raw row-major RGBA samples.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::BufferSize`] unless
    /// `samples.len() == width * height * 4`.
    pub fn from_raw(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, ColorbookError> {
        let dimensions = Dimensions::new(width, height);
        let expected = dimensions.pixel_count() * 4;
        if samples.len() != expected {
            return Err(ColorbookError::BufferSize {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            dimensions,
            samples,
        })
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

    /// The raw row-major RGBA samples.
    #[must_use]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Consume the buffer and return its samples.
    #[must_use]
    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    /// Pixel index (not byte offset) of `(x, y)`, or `None` when off-canvas.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn index_of(&self, x: i64, y: i64) -> Option<usize> {
        if self.dimensions.contains(x, y) {
            Some(y as usize * self.dimensions.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Color at a pixel index. Callers obtain indices from
    /// [`index_of`](Self::index_of) or iterate `0..pixel_count`.
    #[must_use]
    pub fn at(&self, index: usize) -> Rgba {
        let o = index * 4;
        Rgba([
            self.samples[o],
            self.samples[o + 1],
            self.samples[o + 2],
            self.samples[o + 3],
        ])
    }

    /// Overwrite the color at a pixel index.
    pub fn put(&mut self, index: usize, color: Rgba) {
        let o = index * 4;
        self.samples[o..o + 4].copy_from_slice(&color.0);
    }

    /// Color at `(x, y)`, or `None` when off-canvas.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> Option<Rgba> {
        self.index_of(x, y).map(|i| self.at(i))
    }

    /// Overwrite `(x, y)`; off-canvas writes are skipped.
    ///
    /// Returns whether the pixel was written.
    pub fn set(&mut self, x: i64, y: i64, color: Rgba) -> bool {
        self.index_of(x, y).is_some_and(|i| {
            self.put(i, color);
            true
        })
    }

    /// Color at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::OutOfBounds`] when off-canvas.
    pub fn try_get(&self, x: i64, y: i64) -> Result<Rgba, ColorbookError> {
        self.get(x, y).ok_or_else(|| self.out_of_bounds(x, y))
    }

    /// Overwrite `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::OutOfBounds`] when off-canvas.
    pub fn try_set(&mut self, x: i64, y: i64, color: Rgba) -> Result<(), ColorbookError> {
        if self.set(x, y, color) {
            Ok(())
        } else {
            Err(self.out_of_bounds(x, y))
        }
    }

    /// Fail with [`ColorbookError::DimensionMismatch`] unless `other`
    /// has the same size as `self`.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn ensure_same_size(&self, other: Dimensions) -> Result<(), ColorbookError> {
        if self.dimensions == other {
            Ok(())
        } else {
            Err(ColorbookError::DimensionMismatch {
                expected: self.dimensions,
                actual: other,
            })
        }
    }

    /// Iterate over all pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = Rgba> + '_ {
        self.samples
            .chunks_exact(4)
            .map(|c| Rgba([c[0], c[1], c[2], c[3]]))
    }

    /// Number of pixels whose alpha is non-zero.
    #[must_use]
    pub fn opaque_count(&self) -> usize {
        self.samples.chunks_exact(4).filter(|c| c[3] != 0).count()
    }

    /// Convert into an `image` crate buffer (no copy).
    #[must_use]
    pub fn into_rgba_image(self) -> RgbaImage {
        let Dimensions { width, height } = self.dimensions;
        // Length was validated on construction, so `from_raw` cannot fail;
        // fall back to an empty image rather than panicking.
        RgbaImage::from_raw(width, height, self.samples).unwrap_or_else(|| RgbaImage::new(0, 0))
    }

    fn out_of_bounds(&self, x: i64, y: i64) -> ColorbookError {
        ColorbookError::OutOfBounds {
            x,
            y,
            width: self.dimensions.width,
            height: self.dimensions.height,
        }
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let dimensions = Dimensions::new(image.width(), image.height());
        Self {
            dimensions,
            samples: image.into_raw(),
        }
    }
}

/// A decoded raster the core can import pixels from.
///
/// Implementations that cannot expose their pixels (for example a
/// browser canvas tainted by a cross-origin image) must return
/// [`ColorbookError::PixelAccessDenied`] rather than an empty buffer.
pub trait ImageSource {
    /// Size of the image.
    fn dimensions(&self) -> Dimensions;

    /// Copy the full image out as straight-alpha RGBA.
    ///
    /// # Errors
    ///
    /// [`ColorbookError::PixelAccessDenied`] when reads are blocked.
    fn read_pixels(&self) -> Result<PixelBuffer, ColorbookError>;
}

impl ImageSource for PixelBuffer {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn read_pixels(&self) -> Result<PixelBuffer, ColorbookError> {
        Ok(self.clone())
    }
}

impl ImageSource for RgbaImage {
    fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    fn read_pixels(&self) -> Result<PixelBuffer, ColorbookError> {
        Ok(PixelBuffer::from(self.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn filled_has_expected_length_and_color() {
        let buf = PixelBuffer::filled(3, 2, Rgba::rgb(1, 2, 3));
        assert_eq!(buf.samples().len(), 3 * 2 * 4);
        assert!(buf.pixels().all(|p| p == Rgba::rgb(1, 2, 3)));
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        let result = PixelBuffer::from_raw(2, 2, vec![0; 15]);
        assert!(matches!(
            result,
            Err(ColorbookError::BufferSize {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn from_fn_is_row_major() {
        let buf = PixelBuffer::from_fn(3, 2, |x, y| Rgba::rgb(x as u8, y as u8, 0));
        assert_eq!(buf.get(2, 1), Some(Rgba::rgb(2, 1, 0)));
        assert_eq!(buf.at(4), Rgba::rgb(1, 1, 0));
    }

    #[test]
    fn off_canvas_reads_are_none_and_writes_skipped() {
        let mut buf = PixelBuffer::transparent(2, 2);
        assert_eq!(buf.get(-1, 0), None);
        assert_eq!(buf.get(0, 2), None);
        assert!(!buf.set(2, 0, Rgba::BLACK));
        assert_eq!(buf.opaque_count(), 0);
        assert!(buf.set(1, 1, Rgba::BLACK));
        assert_eq!(buf.opaque_count(), 1);
    }

    #[test]
    fn strict_accessors_report_out_of_bounds() {
        let mut buf = PixelBuffer::transparent(2, 2);
        assert!(matches!(
            buf.try_get(5, 0),
            Err(ColorbookError::OutOfBounds { x: 5, y: 0, .. })
        ));
        assert!(matches!(
            buf.try_set(0, -3, Rgba::WHITE),
            Err(ColorbookError::OutOfBounds { .. })
        ));
        buf.try_set(1, 0, Rgba::WHITE).unwrap();
        assert_eq!(buf.try_get(1, 0).unwrap(), Rgba::WHITE);
    }

    #[test]
    fn ensure_same_size_detects_mismatch() {
        let buf = PixelBuffer::transparent(4, 4);
        assert!(buf.ensure_same_size(Dimensions::new(4, 4)).is_ok());
        assert!(matches!(
            buf.ensure_same_size(Dimensions::new(4, 5)),
            Err(ColorbookError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rgba_image_conversion_preserves_pixels() {
        let img = RgbaImage::from_fn(3, 3, |x, y| image::Rgba([10, 20, 30, if x == y { 255 } else { 0 }]));
        let buf = PixelBuffer::from(img.clone());
        assert_eq!(buf.opaque_count(), 3);
        assert_eq!(buf.into_rgba_image(), img);
    }

    #[test]
    fn rgba_image_is_an_image_source() {
        let img = RgbaImage::from_pixel(5, 4, image::Rgba([1, 2, 3, 255]));
        assert_eq!(ImageSource::dimensions(&img), Dimensions::new(5, 4));
        let buf = img.read_pixels().unwrap();
        assert_eq!(buf.get(4, 3), Some(Rgba::rgb(1, 2, 3)));
    }
}

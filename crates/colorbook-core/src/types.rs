//! Shared types for the colorbook core: colors, dimensions, errors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether `(x, y)` lies inside `[0, width) x [0, height)`.
    #[must_use]
    pub const fn contains(self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    /// Fully transparent black, the "empty" paint pixel.
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);
    /// Opaque white.
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    /// Opaque black.
    pub const BLACK: Self = Self([0, 0, 0, 255]);

    /// Opaque color from red, green and blue.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    #[must_use]
    pub const fn r(self) -> u8 {
        self.0[0]
    }

    #[must_use]
    pub const fn g(self) -> u8 {
        self.0[1]
    }

    #[must_use]
    pub const fn b(self) -> u8 {
        self.0[2]
    }

    #[must_use]
    pub const fn a(self) -> u8 {
        self.0[3]
    }

    /// The same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self([self.0[0], self.0[1], self.0[2], a])
    }

    /// Largest per-channel difference over R, G and B (Chebyshev distance).
    ///
    /// Alpha does not participate.
    #[must_use]
    pub const fn rgb_distance(self, other: Self) -> u8 {
        let dr = self.0[0].abs_diff(other.0[0]);
        let dg = self.0[1].abs_diff(other.0[1]);
        let db = self.0[2].abs_diff(other.0[2]);
        let m = if dr > dg { dr } else { dg };
        if m > db { m } else { db }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::InvalidColor`] for any other shape or
    /// non-hex digits.
    pub fn from_hex(s: &str) -> Result<Self, ColorbookError> {
        let digits = s.trim().trim_start_matches('#');
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return Err(ColorbookError::InvalidColor(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| ColorbookError::InvalidColor(s.to_string()))
        };
        let alpha = if digits.len() == 8 { channel(6)? } else { 255 };
        Ok(Self([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }

    /// Format as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    #[must_use]
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Rgba {
    type Error = ColorbookError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Rgba> for String {
    fn from(value: Rgba) -> Self {
        value.to_hex()
    }
}

impl From<image::Rgba<u8>> for Rgba {
    fn from(value: image::Rgba<u8>) -> Self {
        Self(value.0)
    }
}

impl From<Rgba> for image::Rgba<u8> {
    fn from(value: Rgba) -> Self {
        Self(value.0)
    }
}

/// The swatches offered by the coloring page, in display order.
pub const PALETTE: [Rgba; 20] = [
    Rgba::rgb(0xCD, 0x00, 0x00),
    Rgba::rgb(0xFF, 0x66, 0x33),
    Rgba::rgb(0xFF, 0x99, 0x33),
    Rgba::rgb(0xFF, 0x00, 0xFF),
    Rgba::rgb(0xFF, 0xD7, 0x00),
    Rgba::rgb(0xFF, 0xFF, 0x00),
    Rgba::rgb(0x00, 0x00, 0x00),
    Rgba::rgb(0x80, 0x80, 0x80),
    Rgba::rgb(0xC0, 0xC0, 0xC0),
    Rgba::rgb(0xFF, 0xFF, 0xFF),
    Rgba::rgb(0x00, 0x00, 0xFF),
    Rgba::rgb(0x66, 0x00, 0xCC),
    Rgba::rgb(0x00, 0x99, 0xFF),
    Rgba::rgb(0x00, 0xFF, 0xFF),
    Rgba::rgb(0x00, 0x62, 0x41),
    Rgba::rgb(0x00, 0x80, 0x00),
    Rgba::rgb(0x00, 0xFF, 0x00),
    Rgba::rgb(0xCC, 0xFF, 0xCC),
    Rgba::rgb(0x80, 0x00, 0x80),
    Rgba::rgb(0x8B, 0x5F, 0x65),
];

/// Errors surfaced by the colorbook core.
///
/// Requests that are merely pointless (a fill seeded on a line, undo
/// with nothing to undo) are not errors; they are reported through the
/// outcome enums of the respective operations.
#[derive(Debug, thiserror::Error)]
pub enum ColorbookError {
    /// The image source refused to hand out its pixels (for example a
    /// cross-origin canvas in a browser host).
    #[error(
        "pixel data cannot be read ({0}); use a same-origin image or enable CORS on its server"
    )]
    PixelAccessDenied(String),

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to encode the export image.
    #[error("failed to encode image: {0}")]
    Encode(String),

    /// A raw sample vector does not match its declared dimensions.
    #[error("buffer holds {actual} bytes, expected {expected}")]
    BufferSize {
        /// Required length in bytes.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// Two rasters that must line up have different sizes.
    #[error("raster is {actual}, expected {expected}")]
    DimensionMismatch {
        /// Size of the reference raster.
        expected: Dimensions,
        /// Size of the offending raster.
        actual: Dimensions,
    },

    /// A strict accessor was called with a coordinate off the canvas.
    #[error("coordinate ({x}, {y}) is outside the {width}x{height} canvas")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    /// An editing command arrived before any image was loaded.
    #[error("no image is loaded")]
    NoImage,

    /// A color string could not be parsed.
    #[error("invalid color {0:?}, expected #RRGGBB or #RRGGBBAA")]
    InvalidColor(String),

    /// A configuration value is outside its documented range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

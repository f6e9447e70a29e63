//! colorbook-core: line-protected coloring of line-art pages (sans-IO).
//!
//! A loaded page goes through:
//! decode -> line mask (threshold or adaptive + Sobel) -> closing ->
//! grow -> line overlay (stencil or anti-aliased), after which an
//! [`EditSession`] applies bucket fills, brush and eraser strokes and
//! undo/redo to a separate paint layer. Protected mask pixels are never
//! painted by any tool.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and pixel buffers. File handling lives in
//! `colorbook-cli`.

pub mod blur;
pub mod brush;
pub mod buffer;
pub mod codec;
pub mod composite;
pub mod detect;
pub mod fill;
pub mod history;
pub mod line_layer;
pub mod luminance;
pub mod mask;
pub mod morphology;
pub mod session;
pub mod types;

pub use buffer::{ImageSource, PixelBuffer};
pub use detect::{LineDetector, MaskConfig, MaskStrategy};
pub use fill::{FillConfig, FillOutcome, FillRequest};
pub use history::{HistoryConfig, HistoryOutcome};
pub use line_layer::LineStyle;
pub use mask::Mask;
pub use session::{Command, CommandOutcome, EditSession, SessionConfig, StrokeMode, ToolMode};
pub use types::{ColorbookError, Dimensions, PALETTE, Rgba};

/// Decode `image_bytes` and open an edit session on it.
///
/// # Errors
///
/// Returns [`ColorbookError::EmptyInput`] if `image_bytes` is empty,
/// [`ColorbookError::ImageDecode`] if the format is unrecognized and
/// [`ColorbookError::InvalidConfig`] if `config` does not validate.
pub fn open(image_bytes: &[u8], config: SessionConfig) -> Result<EditSession, ColorbookError> {
    let page = codec::decode(image_bytes)?;
    let mut session = EditSession::new(config)?;
    session.load_image(&page)?;
    Ok(session)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn open_decodes_and_loads() {
        let page = PixelBuffer::from_fn(32, 24, |x, y| {
            if x == 16 || y == 12 { Rgba::BLACK } else { Rgba::WHITE }
        });
        let bytes = codec::encode_png(&page).unwrap();
        let session = open(&bytes, SessionConfig::default()).unwrap();
        assert_eq!(session.dimensions(), Some(Dimensions::new(32, 24)));
        assert!(session.mask().unwrap().get(16, 5));
        assert!(!session.mask().unwrap().get(4, 4));
    }

    #[test]
    fn open_rejects_empty_bytes() {
        assert!(matches!(
            open(&[], SessionConfig::default()),
            Err(ColorbookError::EmptyInput)
        ));
    }
}

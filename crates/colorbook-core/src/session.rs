//! The edit session: one loaded page and everything done to it.
//!
//! [`EditSession`] owns the four rasters (base page, paint, line
//! overlay, cached composite), the protection mask, the undo history
//! and the tool state. It is driven by [`Command`]s and refreshes the
//! composite after every mutation, so [`EditSession::composite`] is
//! always current.
//!
//! Every method takes `&mut self`, which serialises paint mutations by
//! construction. The session is `Send`; a host that shares one across
//! threads wraps it in a `Mutex`.

use serde::{Deserialize, Serialize};

use crate::brush::{self, BrushConfig, BrushMode};
use crate::buffer::{ImageSource, PixelBuffer};
use crate::composite::{self, Background};
use crate::detect::{self, MaskConfig};
use crate::fill::{self, FillConfig, FillOutcome, FillRequest};
use crate::history::{History, HistoryConfig, HistoryOutcome};
use crate::line_layer::{self, LineStyle};
use crate::mask::Mask;
use crate::types::{ColorbookError, Dimensions, PALETTE, Rgba};

/// Every tunable of a session, loadable from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub mask: MaskConfig,
    pub line: LineStyle,
    pub fill: FillConfig,
    pub brush: BrushConfig,
    pub history: HistoryConfig,
}

impl SessionConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::InvalidConfig`] for the first bad field.
    pub fn validate(&self) -> Result<(), ColorbookError> {
        self.mask.validate()?;
        self.line.validate()?;
        self.fill.validate()?;
        self.brush.validate()?;
        self.history.validate()
    }
}

/// The active tool, as picked in the host's toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    #[default]
    Fill,
    Brush,
    Eraser,
}

/// Tools that draw strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeMode {
    Brush,
    Eraser,
}

/// One input event.
///
/// Coordinates are canvas pixels. Stroke points may be fractional;
/// fill seeds are whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    SetTool {
        tool: ToolMode,
    },
    SetColor {
        color: Rgba,
    },
    SetBrushRadius {
        radius: f32,
    },
    /// Pointer down with the current tool: fills in
    /// [`ToolMode::Fill`], begins a stroke otherwise.
    Press {
        x: f32,
        y: f32,
    },
    BeginStroke {
        x: f32,
        y: f32,
        mode: StrokeMode,
    },
    ContinueStroke {
        x: f32,
        y: f32,
    },
    EndStroke,
    /// Fill at a seed. `color` defaults to the current color and
    /// `tolerance` to the configured one.
    Fill {
        x: i64,
        y: i64,
        #[serde(default)]
        color: Option<Rgba>,
        #[serde(default)]
        tolerance: Option<u8>,
    },
    Undo,
    Redo,
}

/// What a [`Command`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Tool state changed; no pixels touched.
    Updated,
    Fill(FillOutcome),
    /// Stroke pixels written by this command.
    Stroke { changed: usize },
    History(HistoryOutcome),
    /// Nothing to do (stroke command without an active stroke, or a
    /// stroke begun off the canvas).
    Ignored,
}

#[derive(Debug, Clone)]
struct Layers {
    base: PixelBuffer,
    mask: Mask,
    line: PixelBuffer,
    paint: PixelBuffer,
    composite: PixelBuffer,
}

impl Layers {
    fn refresh(&mut self) -> Result<(), ColorbookError> {
        self.composite = composite::compose(Background::White, &self.paint, &self.line)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Stroke {
    mode: BrushMode,
    last: (f32, f32),
    /// Paint before the stroke, until its first changed pixel pushes
    /// it onto the history.
    pending: Option<PixelBuffer>,
}

/// A coloring page being edited.
#[derive(Debug, Clone)]
pub struct EditSession {
    config: SessionConfig,
    layers: Option<Layers>,
    history: History,
    tool: ToolMode,
    color: Rgba,
    stroke: Option<Stroke>,
}

impl EditSession {
    /// Create an empty session.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::InvalidConfig`] if `config` does not
    /// validate.
    pub fn new(config: SessionConfig) -> Result<Self, ColorbookError> {
        config.validate()?;
        Ok(Self {
            config,
            layers: None,
            history: History::new(config.history),
            tool: ToolMode::default(),
            color: PALETTE[0],
            stroke: None,
        })
    }

    /// Load a new page, replacing any previous one.
    ///
    /// Builds the mask and line overlay, resets paint to transparent and
    /// clears undo and redo. On error the previous page stays loaded.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::PixelAccessDenied`] if the source
    /// refuses pixel reads and [`ColorbookError::EmptyInput`] for a
    /// zero-sized image.
    pub fn load_image<S: ImageSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<Dimensions, ColorbookError> {
        let base = source.read_pixels().inspect_err(|e| {
            log::warn!("image load aborted: {e}");
        })?;
        let dims = base.dimensions();
        if dims.pixel_count() == 0 {
            return Err(ColorbookError::EmptyInput);
        }

        let mask = detect::build_mask_from_pixels(&base, &self.config.mask);
        let line = line_layer::render(&base, &mask, &self.config.line)?;
        let paint = PixelBuffer::transparent(dims.width, dims.height);
        let mut layers = Layers {
            base,
            mask,
            line,
            paint,
            composite: PixelBuffer::transparent(0, 0),
        };
        layers.refresh()?;

        self.layers = Some(layers);
        self.history.clear();
        self.stroke = None;
        log::info!("loaded {dims} page");
        Ok(dims)
    }

    /// Replace the configuration.
    ///
    /// If a page is loaded and the mask or line settings changed, the
    /// mask and overlay are rebuilt. Paint and history are kept, except
    /// that a smaller history capacity drops the oldest snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::InvalidConfig`] if `config` does not
    /// validate; the session is then unchanged.
    pub fn set_config(&mut self, config: SessionConfig) -> Result<(), ColorbookError> {
        config.validate()?;
        let rebuild = config.mask != self.config.mask || config.line != self.config.line;
        if rebuild && let Some(layers) = self.layers.as_mut() {
            let mask = detect::build_mask_from_pixels(&layers.base, &config.mask);
            let line = line_layer::render(&layers.base, &mask, &config.line)?;
            let composite = composite::compose(Background::White, &layers.paint, &line)?;
            layers.mask = mask;
            layers.line = line;
            layers.composite = composite;
        }
        self.history.set_capacity(config.history.capacity);
        self.config = config;
        Ok(())
    }

    /// Apply one input event.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::NoImage`] for pixel commands before a
    /// page is loaded and [`ColorbookError::InvalidConfig`] for an
    /// out-of-range brush radius. A failed command changes nothing.
    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome, ColorbookError> {
        match command {
            Command::SetTool { tool } => {
                self.end_stroke();
                self.tool = tool;
                Ok(CommandOutcome::Updated)
            }
            Command::SetColor { color } => {
                self.color = color;
                Ok(CommandOutcome::Updated)
            }
            Command::SetBrushRadius { radius } => {
                let brush = BrushConfig { radius };
                brush.validate()?;
                self.config.brush = brush;
                Ok(CommandOutcome::Updated)
            }
            Command::Press { x, y } => match self.tool {
                ToolMode::Fill if !(x.is_finite() && y.is_finite()) => {
                    self.loaded()?;
                    Ok(CommandOutcome::Ignored)
                }
                ToolMode::Fill => {
                    #[allow(clippy::cast_possible_truncation)]
                    let (sx, sy) = (x.floor() as i64, y.floor() as i64);
                    self.fill(sx, sy, None, None)
                }
                ToolMode::Brush => self.begin_stroke(x, y, StrokeMode::Brush),
                ToolMode::Eraser => self.begin_stroke(x, y, StrokeMode::Eraser),
            },
            Command::BeginStroke { x, y, mode } => self.begin_stroke(x, y, mode),
            Command::ContinueStroke { x, y } => self.continue_stroke(x, y),
            Command::EndStroke => Ok(if self.end_stroke() {
                CommandOutcome::Updated
            } else {
                CommandOutcome::Ignored
            }),
            Command::Fill {
                x,
                y,
                color,
                tolerance,
            } => self.fill(x, y, color, tolerance),
            Command::Undo => self.step_history(true),
            Command::Redo => self.step_history(false),
        }
    }

    fn fill(
        &mut self,
        x: i64,
        y: i64,
        color: Option<Rgba>,
        tolerance: Option<u8>,
    ) -> Result<CommandOutcome, ColorbookError> {
        self.end_stroke();
        let layers = self.layers.as_mut().ok_or(ColorbookError::NoImage)?;
        let request = FillRequest {
            seed_x: x,
            seed_y: y,
            color: color.unwrap_or(self.color),
            tolerance: tolerance.unwrap_or(self.config.fill.tolerance),
        };
        let before = layers.paint.clone();
        let outcome = fill::flood_fill(
            &mut layers.paint,
            &layers.base,
            &layers.mask,
            &request,
            &self.config.fill,
        )?;
        if outcome.changed() {
            self.history.push(before);
            layers.refresh()?;
        }
        Ok(CommandOutcome::Fill(outcome))
    }

    fn begin_stroke(
        &mut self,
        x: f32,
        y: f32,
        mode: StrokeMode,
    ) -> Result<CommandOutcome, ColorbookError> {
        self.end_stroke();
        let layers = self.layers.as_mut().ok_or(ColorbookError::NoImage)?;
        #[allow(clippy::cast_possible_truncation)]
        let on_canvas = x.is_finite()
            && y.is_finite()
            && layers
                .paint
                .dimensions()
                .contains(x.floor() as i64, y.floor() as i64);
        if !on_canvas {
            return Ok(CommandOutcome::Ignored);
        }

        let brush_mode = match mode {
            StrokeMode::Brush => BrushMode::Paint(self.color),
            StrokeMode::Eraser => BrushMode::Erase,
        };
        let before = layers.paint.clone();
        let changed = brush::stamp_circle(
            &mut layers.paint,
            &layers.mask,
            (x, y),
            self.config.brush.radius,
            brush_mode,
        );
        let pending = if changed > 0 {
            self.history.push(before);
            layers.refresh()?;
            None
        } else {
            Some(before)
        };
        self.stroke = Some(Stroke {
            mode: brush_mode,
            last: (x, y),
            pending,
        });
        Ok(CommandOutcome::Stroke { changed })
    }

    fn continue_stroke(&mut self, x: f32, y: f32) -> Result<CommandOutcome, ColorbookError> {
        let layers = self.layers.as_mut().ok_or(ColorbookError::NoImage)?;
        let Some(stroke) = self.stroke.as_mut() else {
            return Ok(CommandOutcome::Ignored);
        };
        let changed = brush::stroke_segment(
            &mut layers.paint,
            &layers.mask,
            stroke.last,
            (x, y),
            &self.config.brush,
            stroke.mode,
        );
        stroke.last = (x, y);
        if changed > 0 {
            if let Some(before) = stroke.pending.take() {
                self.history.push(before);
            }
            layers.refresh()?;
        }
        Ok(CommandOutcome::Stroke { changed })
    }

    /// Returns whether a stroke was active.
    fn end_stroke(&mut self) -> bool {
        self.stroke.take().is_some()
    }

    fn step_history(&mut self, undo: bool) -> Result<CommandOutcome, ColorbookError> {
        self.end_stroke();
        let layers = self.layers.as_mut().ok_or(ColorbookError::NoImage)?;
        let outcome = if undo {
            self.history.undo(&mut layers.paint)
        } else {
            self.history.redo(&mut layers.paint)
        };
        if outcome == HistoryOutcome::Restored {
            layers.refresh()?;
        }
        Ok(CommandOutcome::History(outcome))
    }

    /// The current composite: white page, paint, line overlay.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::NoImage`] before a page is loaded.
    pub fn composite(&self) -> Result<&PixelBuffer, ColorbookError> {
        Ok(&self.loaded()?.composite)
    }

    /// Paint and line layers over the original page instead of white.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::NoImage`] before a page is loaded.
    pub fn composite_over_page(&self) -> Result<PixelBuffer, ColorbookError> {
        let layers = self.loaded()?;
        composite::compose(Background::Image(&layers.base), &layers.paint, &layers.line)
    }

    /// # Errors
    ///
    /// Returns [`ColorbookError::NoImage`] before a page is loaded.
    pub fn base(&self) -> Result<&PixelBuffer, ColorbookError> {
        Ok(&self.loaded()?.base)
    }

    /// # Errors
    ///
    /// Returns [`ColorbookError::NoImage`] before a page is loaded.
    pub fn paint(&self) -> Result<&PixelBuffer, ColorbookError> {
        Ok(&self.loaded()?.paint)
    }

    /// # Errors
    ///
    /// Returns [`ColorbookError::NoImage`] before a page is loaded.
    pub fn line(&self) -> Result<&PixelBuffer, ColorbookError> {
        Ok(&self.loaded()?.line)
    }

    /// # Errors
    ///
    /// Returns [`ColorbookError::NoImage`] before a page is loaded.
    pub fn mask(&self) -> Result<&Mask, ColorbookError> {
        Ok(&self.loaded()?.mask)
    }

    #[must_use]
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.layers.as_ref().map(|l| l.base.dimensions())
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub const fn tool(&self) -> ToolMode {
        self.tool
    }

    #[must_use]
    pub const fn color(&self) -> Rgba {
        self.color
    }

    #[must_use]
    pub const fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    fn loaded(&self) -> Result<&Layers, ColorbookError> {
        self.layers.as_ref().ok_or(ColorbookError::NoImage)
    }
}

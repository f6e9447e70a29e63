//! colorbook: command-line host for the colorbook core.
//!
//! Loads a coloring page, replays an edit script (fills, brush and
//! eraser strokes, undo/redo) against an edit session and writes the
//! white-background export, optionally with a logo watermark. The
//! `mask` subcommand writes the protection mask and line overlay so
//! detection settings can be tuned.
//!
//! # Usage
//!
//! ```text
//! colorbook paint page.png --script edits.json --logo logo.png
//! colorbook mask page.png --mask-out mask.png --line-out line.png
//! colorbook config > config.json
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod logo;
mod script;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colorbook_core::{CommandOutcome, EditSession, FillOutcome, PixelBuffer, SessionConfig, codec};
use tracing::Level;

use crate::script::Script;

/// Line-protected coloring of line-art pages.
#[derive(Parser)]
#[command(name = "colorbook", version)]
struct Cli {
    #[command(subcommand)]
    command: Action,

    /// More log output (repeat for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Action {
    /// Apply an edit script to a page and export the result as PNG.
    Paint(PaintArgs),
    /// Write the protection mask and line overlay of a page.
    Mask(MaskArgs),
    /// Print the default session config as JSON.
    Config,
}

#[derive(Args)]
struct SessionArgs {
    /// Path to the input page (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Full session config as a JSON string.
    ///
    /// Overrides any config embedded in the script.
    #[arg(long)]
    config_json: Option<String>,
}

#[derive(Args)]
struct PaintArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// JSON edit script (array of commands, or `{config, commands}`).
    #[arg(long)]
    script: Option<PathBuf>,

    /// Output PNG path.
    #[arg(short, long, default_value = "to_mau.png")]
    output: PathBuf,

    /// Logo image stamped in the bottom-right corner.
    #[arg(long)]
    logo: Option<PathBuf>,

    /// What the paint sits on in the export.
    #[arg(long, value_enum, default_value_t = Backdrop::White)]
    background: Backdrop,
}

#[derive(Args)]
struct MaskArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Where to write the mask (black = protected).
    #[arg(long, default_value = "mask.png")]
    mask_out: PathBuf,

    /// Where to write the line overlay (transparent background).
    #[arg(long)]
    line_out: Option<PathBuf>,
}

/// Export background selection.
#[derive(Clone, Copy, ValueEnum)]
enum Backdrop {
    /// Plain white page.
    White,
    /// The original page image.
    Page,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("error reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("error writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("error parsing {what}: {source}")]
    Json {
        what: String,
        source: serde_json::Error,
    },
    #[error("command {index} ({command}) failed: {source}")]
    Command {
        index: usize,
        command: String,
        source: colorbook_core::ColorbookError,
    },
    #[error(transparent)]
    Core(#[from] colorbook_core::ColorbookError),
    #[error("error decoding logo {}: {source}", path.display())]
    Logo {
        path: PathBuf,
        source: image::ImageError,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_subscriber(log_level(cli.verbose, cli.quiet));

    let result = match &cli.command {
        Action::Paint(args) => paint(args),
        Action::Mask(args) => mask(args),
        Action::Config => print_default_config(),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

const fn log_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install a stderr subscriber that also receives `log` records from
/// the core crate.
fn init_subscriber(max_level: Level) {
    let result = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(e) = result {
        eprintln!("Warning: logging unavailable: {e}");
    }
}

fn read(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, bytes).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode the page and open a session on it.
fn open_session(
    args: &SessionArgs,
    script_config: Option<SessionConfig>,
) -> Result<EditSession, CliError> {
    let config = match &args.config_json {
        Some(json) => serde_json::from_str(json).map_err(|source| CliError::Json {
            what: "--config-json".to_string(),
            source,
        })?,
        None => script_config.unwrap_or_default(),
    };

    let bytes = read(&args.image_path)?;
    eprintln!("Image: {} ({} bytes)", args.image_path.display(), bytes.len());
    tracing::debug!(?config, "session config");

    let start = Instant::now();
    let page = codec::decode(&bytes)?;
    let mut session = EditSession::new(config)?;
    let dims = session.load_image(&page)?;
    let mask = session.mask()?;
    eprintln!(
        "Page: {dims}, {} protected px, prepared in {:.1}ms",
        mask.count_set(),
        start.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(session)
}

fn paint(args: &PaintArgs) -> Result<(), CliError> {
    let script = match &args.script {
        Some(path) => {
            let text = read(path)?;
            Script::from_json(&String::from_utf8_lossy(&text)).map_err(|source| CliError::Json {
                what: path.display().to_string(),
                source,
            })?
        }
        None => Script::default(),
    };
    let mut session = open_session(&args.session, script.config)?;

    let start = Instant::now();
    let mut tally = Tally::default();
    for (index, command) in script.commands.iter().enumerate() {
        let outcome = session
            .apply(*command)
            .map_err(|source| CliError::Command {
                index,
                command: format!("{command:?}"),
                source,
            })?;
        tracing::info!(index, ?command, ?outcome, "applied");
        tally.record(outcome);
    }
    if !script.commands.is_empty() {
        eprintln!(
            "Applied {} commands in {:.1}ms: {tally}",
            script.commands.len(),
            start.elapsed().as_secs_f64() * 1000.0,
        );
    }

    let export = match args.background {
        Backdrop::White => session.composite()?.clone(),
        Backdrop::Page => session.composite_over_page()?,
    };
    let mut export = export.into_rgba_image();
    if let Some(path) = &args.logo {
        let logo = image::load_from_memory(&read(path)?)
            .map_err(|source| CliError::Logo {
                path: path.clone(),
                source,
            })?
            .to_rgba8();
        logo::stamp(&mut export, &logo);
    }

    let png = codec::encode_png(&PixelBuffer::from(export))?;
    write(&args.output, &png)?;
    eprintln!("PNG written to {} ({} bytes)", args.output.display(), png.len());
    Ok(())
}

fn mask(args: &MaskArgs) -> Result<(), CliError> {
    let session = open_session(&args.session, None)?;

    let gray = session.mask()?.to_gray_image();
    let mut mask_png = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut mask_png);
    image::ImageEncoder::write_image(
        encoder,
        gray.as_raw(),
        gray.width(),
        gray.height(),
        image::ExtendedColorType::L8,
    )
    .map_err(|e| colorbook_core::ColorbookError::Encode(e.to_string()))?;
    write(&args.mask_out, &mask_png)?;
    eprintln!("Mask written to {}", args.mask_out.display());

    if let Some(path) = &args.line_out {
        write(path, &codec::encode_png(session.line()?)?)?;
        eprintln!("Line overlay written to {}", path.display());
    }
    Ok(())
}

fn print_default_config() -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(&SessionConfig::default()).map_err(|source| {
        CliError::Json {
            what: "default config".to_string(),
            source,
        }
    })?;
    println!("{json}");
    Ok(())
}

/// Per-kind command counts for the progress summary.
#[derive(Default)]
struct Tally {
    fills: usize,
    skipped_fills: usize,
    stroke_px: usize,
    history: usize,
    other: usize,
}

impl Tally {
    const fn record(&mut self, outcome: CommandOutcome) {
        match outcome {
            CommandOutcome::Fill(FillOutcome::Filled { .. }) => self.fills += 1,
            CommandOutcome::Fill(_) => self.skipped_fills += 1,
            CommandOutcome::Stroke { changed } => self.stroke_px += changed,
            CommandOutcome::History(_) => self.history += 1,
            CommandOutcome::Updated | CommandOutcome::Ignored => self.other += 1,
        }
    }
}

impl std::fmt::Display for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} fills ({} no-op), {} stroke px, {} undo/redo, {} other",
            self.fills, self.skipped_fills, self.stroke_px, self.history, self.other
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(log_level(0, false), Level::WARN);
        assert_eq!(log_level(2, false), Level::DEBUG);
        assert_eq!(log_level(9, false), Level::TRACE);
        assert_eq!(log_level(3, true), Level::ERROR);
    }

    #[test]
    fn cli_parses_paint_defaults() {
        let cli = Cli::try_parse_from(["colorbook", "paint", "page.png"]);
        assert!(cli.is_ok());
        if let Ok(Cli {
            command: Action::Paint(args),
            ..
        }) = cli
        {
            assert_eq!(args.output, PathBuf::from("to_mau.png"));
            assert!(args.script.is_none());
            assert!(matches!(args.background, Backdrop::White));
        }
    }

    #[test]
    fn tally_counts_outcomes() {
        let mut tally = Tally::default();
        tally.record(CommandOutcome::Fill(FillOutcome::Filled {
            flooded: 3,
            grown: 1,
        }));
        tally.record(CommandOutcome::Fill(FillOutcome::SeedOnLine));
        tally.record(CommandOutcome::Stroke { changed: 7 });
        tally.record(CommandOutcome::Stroke { changed: 5 });
        assert_eq!(
            tally.to_string(),
            "1 fills (1 no-op), 12 stroke px, 0 undo/redo, 0 other"
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

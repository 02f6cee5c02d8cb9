//! Command-line QR code encoder.
//!
//! Encodes a string argument (or the raw bytes of a file) and writes the symbol to the
//! console, an SVG document or a PNG image.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qrcore::{encode_qr, helper, EcLevel, EncodeOptions, Mask, Mode, Payload, Version};

// =============================================================================
// CLI Arguments
// =============================================================================

/// qrcore - QR code symbol encoder
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Text to encode
    data: Option<String>,

    /// Read the data as raw bytes from this file instead
    #[arg(long, conflicts_with = "data")]
    input: Option<PathBuf>,

    /// Error correction level (L, M, Q, H)
    #[arg(long, env = "QRCORE_ECL")]
    ecl: Option<EcLevel>,

    /// Encode everything in one mode (numeric, alphanumeric, byte, kanji)
    #[arg(long)]
    mode: Option<Mode>,

    /// Fixed version 1-40, 0 for automatic
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=40))]
    type_number: Option<u8>,

    /// Fixed mask pattern 0-7
    #[arg(long)]
    mask: Option<Mask>,

    /// Raise the error correction level when it costs no extra version
    #[arg(long)]
    boost_ecl: bool,

    /// Prepend an ECI designator with this assignment value
    #[arg(long)]
    eci: Option<u32>,

    /// JSON file with encoding options; flags override it
    #[arg(long, env = "QRCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
    format: OutputFormat,

    /// Output file (stdout when omitted, except for PNG)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Quiet zone width in modules
    #[arg(long, default_value_t = helper::DEFAULT_BORDER)]
    border: u32,

    /// Pixels per module for PNG output
    #[arg(long, default_value_t = 8)]
    scale: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log in JSON format
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Console,
    Svg,
    Png,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let options = build_options(&args)?;
    let bytes;
    let payload = match (&args.data, &args.input) {
        (Some(text), _) => Payload::Text(text),
        (None, Some(path)) => {
            bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Payload::Bytes(&bytes)
        }
        (None, None) => bail!("nothing to encode: pass the data or --input <FILE>"),
    };

    let qr = encode_qr(payload, &options).context("encoding failed")?;
    info!(
        version = qr.version().value(),
        ecl = %qr.error_correction_level(),
        mask = qr.mask().value(),
        size = qr.size(),
        "Encoded"
    );

    match args.format {
        OutputFormat::Console => write_text(&args, &helper::to_console_string(&qr, args.border))?,
        OutputFormat::Svg => write_text(&args, &helper::to_svg_string(&qr, args.border))?,
        OutputFormat::Png => {
            let path = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from("qrcode.png"));
            helper::save_png(&qr, &path, args.border, args.scale)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Wrote PNG");
        }
    }
    Ok(())
}

/// Starts from the configuration file, if any, and applies the flags on top.
fn build_options(args: &Args) -> Result<EncodeOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => EncodeOptions::default(),
    };

    if let Some(ecl) = args.ecl {
        options.ec_level = ecl;
    }
    if let Some(mode) = args.mode {
        options.mode = Some(mode);
    }
    match args.type_number {
        Some(0) => options.version = None,
        Some(ver) => options.version = Some(Version::try_from(ver)?),
        None => {}
    }
    if let Some(mask) = args.mask {
        options.mask = Some(mask);
    }
    if args.boost_ecl {
        options.boost_ecl = true;
    }
    if let Some(eci) = args.eci {
        options.eci = Some(eci);
    }
    Ok(options)
}

fn write_text(args: &Args, text: &str) -> Result<()> {
    match &args.output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Wrote output");
        }
        None => print!("{}", text),
    }
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr so stdout carries only the symbol
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

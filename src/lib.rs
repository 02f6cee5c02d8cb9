//! # qrcore
//!
//! A QR code symbol encoder for QR Code Model 2, versions 1 to 40.
//!
//! `qrcore` turns text or binary data into the square matrix of dark and light modules
//! of a QR code: it segments the input into numeric, alphanumeric, byte or kanji runs,
//! picks the smallest version that fits, appends Reed-Solomon error correction, places
//! the codewords and chooses the mask with the lowest penalty. Rendering to the console,
//! SVG and PNG lives in [`helper`].
//!
//! ## Features
//!
//! - Encode data in numeric, alphanumeric, byte, kanji or ECI modes.
//! - Support four error correction levels: L, M, Q, H.
//! - Fixed version, fixed mask and error correction boosting through [`EncodeOptions`].
//! - Render QR codes as text, PNG images, SVGs, or in-memory image buffers.
//! - Safe Rust implementation with no unsafe code.
//! - Optional `parallel` feature scoring mask candidates with `rayon`.
//!
//! ## Example
//!
//! ```rust
//! use qrcore::{encode_qr, helper, EcLevel, EncodeOptions};
//!
//! let options = EncodeOptions {
//!     ec_level: EcLevel::Q,
//!     ..EncodeOptions::default()
//! };
//! let qr = encode_qr("https://example.com", &options).unwrap();
//! assert_eq!(qr.error_correction_level(), EcLevel::Q);
//!
//! let svg = helper::to_svg_string(&qr, 4);
//! assert!(svg.contains("<svg"));
//! ```
//!
//! ## Modules
//!
//! - [`segment`]: Splitting input into mode segments.
//! - [`version`]: Versions, levels and capacity tables.
//! - [`bitstream`]: Building the padded data codewords.
//! - [`ecc`]: Reed-Solomon error correction and interleaving.
//! - [`matrix`]: Function patterns and codeword placement.
//! - [`mask`]: Mask patterns and penalty scoring.
//! - [`qrcode`]: The encoding pipeline and the [`QrCode`] result.
//! - [`helper`]: Utilities for rendering QR codes in various formats.

#![forbid(unsafe_code)]

pub mod bitstream;
pub mod ecc;
pub mod error;
pub mod helper;
pub mod mask;
pub mod matrix;
pub mod qrcode;
pub mod segment;
pub mod version;

pub use error::{QrError, Result};
pub use mask::Mask;
pub use qrcode::{encode_qr, EncodeOptions, QrCode};
pub use segment::{Mode, Payload, Segment};
pub use version::{EcLevel, Version};

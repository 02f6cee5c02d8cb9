//! Error types for the QR encoder.

use thiserror::Error;

use crate::segment::Mode;

/// Result type alias using [`QrError`].
pub type Result<T> = std::result::Result<T, QrError>;

/// Errors returned by the encoder and its rendering helpers.
///
/// Ways to handle a [`QrError::DataTooLarge`]:
///
/// - Decrease the error correction level if it was greater than `EcLevel::L`.
/// - Drop the forced version, or force a larger one.
/// - Change the text to fit the character set of a denser mode (e.g. alphanumeric).
/// - Shorten the data.
#[derive(Error, Debug)]
pub enum QrError {
    /// The input contains a character the selected mode cannot represent.
    #[error("character {ch:?} at position {position} cannot be encoded in {mode} mode")]
    UnsupportedCharacter { ch: char, position: usize, mode: Mode },

    /// The encoded data does not fit the forced version, or version 40.
    #[error("data length = {required_bits} bits, max capacity = {capacity_bits} bits")]
    DataTooLarge {
        required_bits: usize,
        capacity_bits: usize,
    },

    /// Zero-length input is rejected rather than encoded as an empty segment.
    #[error("no data to encode")]
    EmptyData,

    /// A structural invariant of the symbol layout was violated.
    #[error("internal layout error: {0}")]
    InternalLayout(String),

    #[error("version number {0} out of range 1..=40")]
    InvalidVersion(u8),

    #[error("invalid mask pattern {0:?}, expected 0..=7")]
    InvalidMask(String),

    #[error("ECI assignment value {0} out of range")]
    InvalidEci(u32),

    #[error("invalid segment mode: {0}")]
    InvalidMode(String),

    #[error("invalid error correction level: {0}")]
    InvalidEcLevel(String),

    /// Image encoding error from the rendering helper
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

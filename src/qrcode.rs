//! QR code encoding.
//!
//! [`encode_qr`] drives the whole pipeline: segmentation, version selection, bit
//! stream construction, error correction, module placement and mask selection.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::bitstream;
use crate::ecc;
use crate::error::{QrError, Result};
use crate::mask::{self, Mask};
use crate::matrix;
use crate::segment::{self, Mode, Payload, Segment};
use crate::version::{self, EcLevel, Version};

/// Options for [`encode_qr`]. Every field has a default, so a configuration
/// document only needs the keys it changes.
///
/// ```rust
/// use qrcore::{EcLevel, EncodeOptions};
///
/// let options: EncodeOptions = serde_json::from_str(r#"{ "ec_level": "H", "version": 0 }"#).unwrap();
/// assert_eq!(options.ec_level, EcLevel::H);
/// assert_eq!(options.version, None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Requested error correction level.
    pub ec_level: EcLevel,
    /// Encode the whole input in one mode instead of segmenting it.
    pub mode: Option<Mode>,
    /// Fixed version. The encoder fails rather than pick a larger one. `0` means automatic.
    #[serde(deserialize_with = "version_or_auto")]
    pub version: Option<Version>,
    /// Fixed mask pattern instead of the lowest-penalty one.
    pub mask: Option<Mask>,
    /// Raise the level while the data still fits the selected version.
    pub boost_ecl: bool,
    /// Prepend an ECI designator with this assignment value.
    pub eci: Option<u32>,
}

fn version_or_auto<'de, D>(deserializer: D) -> core::result::Result<Option<Version>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<u8>::deserialize(deserializer)? {
        None | Some(0) => Ok(None),
        Some(ver) => Version::try_from(ver).map(Some).map_err(serde::de::Error::custom),
    }
}

/// A QR Code symbol, representing a square grid of dark and light modules.
///
/// Instances are immutable after creation and own their modules.
///
/// # Example
///
/// ```rust
/// use qrcore::{EcLevel, QrCode};
///
/// let qr = QrCode::encode_text("Hello, World!", EcLevel::L).unwrap();
/// println!("Version: {}", qr.version().value());
/// assert_eq!(qr.size(), i32::from(qr.version().value()) * 4 + 17);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct QrCode {
    version: Version,
    ec_level: EcLevel,
    mask: Mask,
    size: usize,
    /// Row-major, `true` for dark.
    modules: Vec<bool>,
}

impl QrCode {
    /// Encodes a text string at the given level with automatic version and mask.
    pub fn encode_text(text: &str, ecl: EcLevel) -> Result<Self> {
        encode_qr(text, &EncodeOptions {
            ec_level: ecl,
            ..EncodeOptions::default()
        })
    }

    /// Encodes raw bytes at the given level with automatic version and mask.
    pub fn encode_binary(data: &[u8], ecl: EcLevel) -> Result<Self> {
        encode_qr(data, &EncodeOptions {
            ec_level: ecl,
            ..EncodeOptions::default()
        })
    }

    /// Returns this QR Code's version, in the range [1, 40].
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns this QR Code's size, in the range [21, 177].
    pub fn size(&self) -> i32 {
        self.size as i32
    }

    /// Returns the error correction level written into the format information.
    pub fn error_correction_level(&self) -> EcLevel {
        self.ec_level
    }

    /// Returns this QR Code's mask, in the range [0, 7].
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Returns the color of the module at the given coordinates.
    ///
    /// Returns `true` for dark modules and `false` for light modules. Coordinates outside the QR
    /// code's bounds return `false`.
    ///
    /// # Arguments
    ///
    /// * `x` - X-coordinate (0 is left).
    /// * `y` - Y-coordinate (0 is top).
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        let range = 0..self.size();
        range.contains(&x)
            && range.contains(&y)
            && self.modules[y as usize * self.size + x as usize]
    }

    /// The rows of the symbol, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> + '_ {
        self.modules.chunks(self.size)
    }

    /// Copies the symbol into a row-major grid.
    pub fn to_grid(&self) -> Vec<Vec<bool>> {
        self.rows().map(<[bool]>::to_vec).collect()
    }
}

/// Encodes `data` into a QR code symbol.
///
/// Text is segmented greedily into numeric, alphanumeric and byte runs unless
/// `options.mode` forces a single mode. The smallest version that fits is chosen
/// unless `options.version` fixes one.
///
/// # Errors
///
/// - [`QrError::EmptyData`] for zero-length input.
/// - [`QrError::UnsupportedCharacter`] when a forced mode cannot represent the input.
/// - [`QrError::DataTooLarge`] when the data exceeds the forced version or version 40.
/// - [`QrError::InvalidEci`] for an ECI assignment value of 1 000 000 or more.
///
/// # Example
///
/// ```rust
/// use qrcore::{encode_qr, EcLevel, EncodeOptions, Mode};
///
/// let options = EncodeOptions {
///     ec_level: EcLevel::Q,
///     mode: Some(Mode::Alphanumeric),
///     ..EncodeOptions::default()
/// };
/// let qr = encode_qr("HELLO WORLD", &options).unwrap();
/// assert_eq!(qr.version().value(), 1);
/// assert_eq!(qr.size(), 21);
/// ```
pub fn encode_qr<'a>(data: impl Into<Payload<'a>>, options: &EncodeOptions) -> Result<QrCode> {
    let payload: Payload<'a> = data.into();
    if payload.is_empty() {
        return Err(QrError::EmptyData);
    }

    let mut segs: Vec<Segment> = Vec::new();
    if let Some(assignval) = options.eci {
        segs.push(Segment::eci(assignval)?);
    }
    segs.extend(segment::segment(payload, options.mode)?);

    let version = version::select_version(&segs, options.ec_level, options.version)?;
    let ecl = if options.boost_ecl {
        boost_level(&segs, version, options.ec_level)
    } else {
        options.ec_level
    };

    let datacodewords = bitstream::build(&segs, version, ecl)?;
    let codewords = ecc::encode(&datacodewords, version, ecl)?;
    let unmasked = matrix::place(&codewords, version)?;

    let (finished, mask) = match options.mask {
        Some(mask) => {
            let mut matrix = unmasked;
            mask.apply(&mut matrix);
            matrix.draw_format_bits(ecl, mask);
            (matrix, mask)
        }
        None => mask::select_mask(&unmasked, ecl),
    };
    debug!(
        version = version.value(),
        ecl = %ecl,
        mask = mask.value(),
        "Encoded QR code"
    );

    Ok(QrCode {
        version,
        ec_level: ecl,
        mask,
        size: finished.size(),
        modules: finished.to_bools(),
    })
}

/// The highest level at or above `ecl` whose capacity still holds the data in `version`.
fn boost_level(segs: &[Segment], version: Version, ecl: EcLevel) -> EcLevel {
    let mut result = ecl;
    let Some(datausedbits) = Segment::total_bits(segs, version) else {
        return result;
    };
    for newecl in [EcLevel::M, EcLevel::Q, EcLevel::H] {
        if newecl > result && datausedbits <= version.data_codewords(newecl) * 8 {
            result = newecl;
        }
    }
    result
}

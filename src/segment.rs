//! Splitting input into encoding-mode segments.
//!
//! A segment is a run of input encoded under a single mode. The automatic segmenter
//! makes one greedy left-to-right pass: each character takes the narrowest mode
//! that can hold it (numeric, then alphanumeric, then byte) and neighbours of the
//! same mode are merged. Kanji is only used when asked for.

use core::fmt;
use core::str::FromStr;

use encoding_rs::SHIFT_JIS;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bitstream::BitBuffer;
use crate::error::{QrError, Result};
use crate::version::Version;

static ALPHANUMERIC_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Input to the encoder: UTF-8 text or raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Payload<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
}

impl<'a> Payload<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Bytes(bytes) => bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Builds the error for the byte at `offset`, reporting the character it starts.
    fn unsupported_at(&self, offset: usize, mode: Mode) -> QrError {
        let (ch, position) = match *self {
            Payload::Text(text) => {
                let ch = text[offset..].chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                (ch, text[..offset].chars().count())
            }
            Payload::Bytes(bytes) => (char::from(bytes[offset]), offset),
        };
        QrError::UnsupportedCharacter { ch, position, mode }
    }
}

impl<'a> From<&'a str> for Payload<'a> {
    fn from(text: &'a str) -> Self {
        Payload::Text(text)
    }
}

impl<'a> From<&'a String> for Payload<'a> {
    fn from(text: &'a String) -> Self {
        Payload::Text(text.as_str())
    }
}

impl<'a> From<&'a [u8]> for Payload<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Payload::Bytes(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Payload<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Payload::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Payload<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Payload::Bytes(bytes.as_slice())
    }
}

/// Encoding mode of a segment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Mode {
    Numeric,
    Alphanumeric,
    Byte,
    Kanji,
    /// Extended Channel Interpretation designator. Carries no characters.
    Eci,
}

impl Mode {
    /// The 4-bit mode indicator.
    pub(crate) fn mode_bits(self) -> u32 {
        match self {
            Mode::Numeric => 0x1,
            Mode::Alphanumeric => 0x2,
            Mode::Byte => 0x4,
            Mode::Kanji => 0x8,
            Mode::Eci => 0x7,
        }
    }

    /// Width of the character count indicator for the given version.
    pub fn num_char_count_bits(self, ver: Version) -> u8 {
        (match self {
            Mode::Numeric => [10, 12, 14],
            Mode::Alphanumeric => [9, 11, 13],
            Mode::Byte => [8, 16, 16],
            Mode::Kanji => [8, 10, 12],
            Mode::Eci => [0, 0, 0],
        })[ver.width_class()]
    }

    /// Narrowest automatic mode for a single input byte.
    fn classify(b: u8) -> Mode {
        if b.is_ascii_digit() {
            Mode::Numeric
        } else if is_alphanumeric_byte(b) {
            Mode::Alphanumeric
        } else {
            Mode::Byte
        }
    }
}

impl FromStr for Mode {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" => Ok(Mode::Numeric),
            "alphanumeric" => Ok(Mode::Alphanumeric),
            "byte" => Ok(Mode::Byte),
            "kanji" => Ok(Mode::Kanji),
            _ => Err(QrError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A segment of data in a QR code.
///
/// `data` holds the raw characters: ASCII digits or alphanumeric characters, the
/// bytes themselves, Shift JIS byte pairs for Kanji, or the ECI designator bytes.
/// Segments are immutable once built.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Segment {
    mode: Mode,
    data: Vec<u8>,
    numchars: usize,
}

impl Segment {
    /// Creates a segment for binary data in byte mode.
    pub fn bytes(data: &[u8]) -> Self {
        Segment {
            mode: Mode::Byte,
            data: data.to_vec(),
            numchars: data.len(),
        }
    }

    /// Creates a numeric segment. Only `0`–`9` are accepted.
    pub fn numeric(text: &str) -> Result<Self> {
        Self::checked(Payload::Text(text), Mode::Numeric)
    }

    /// Creates an alphanumeric segment.
    ///
    /// Allowed characters: 0–9, A–Z (uppercase), space, `$`, `%`, `*`, `+`, `-`, `.`, `/`, `:`.
    pub fn alphanumeric(text: &str) -> Result<Self> {
        Self::checked(Payload::Text(text), Mode::Alphanumeric)
    }

    /// Creates a Kanji segment, converting the text to Shift JIS.
    pub fn kanji(text: &str) -> Result<Self> {
        let mut data = Vec::with_capacity(text.len());
        let mut buf = [0u8; 4];
        for (position, ch) in text.chars().enumerate() {
            let (sjis, _, had_errors) = SHIFT_JIS.encode(ch.encode_utf8(&mut buf));
            match *sjis {
                [hi, lo] if !had_errors && is_kanji_pair(hi, lo) => data.extend_from_slice(&[hi, lo]),
                _ => {
                    return Err(QrError::UnsupportedCharacter {
                        ch,
                        position,
                        mode: Mode::Kanji,
                    })
                }
            }
        }
        let numchars = data.len() / 2;
        Ok(Segment {
            mode: Mode::Kanji,
            data,
            numchars,
        })
    }

    /// Creates a Kanji segment from bytes that are already Shift JIS encoded.
    pub fn kanji_sjis(bytes: &[u8]) -> Result<Self> {
        for (i, pair) in bytes.chunks(2).enumerate() {
            let ok = matches!(*pair, [hi, lo] if is_kanji_pair(hi, lo));
            if !ok {
                return Err(QrError::UnsupportedCharacter {
                    ch: char::from(pair[0]),
                    position: i * 2,
                    mode: Mode::Kanji,
                });
            }
        }
        Ok(Segment {
            mode: Mode::Kanji,
            data: bytes.to_vec(),
            numchars: bytes.len() / 2,
        })
    }

    /// Creates a segment representing an Extended Channel Interpretation
    /// (ECI) designator with the given assignment value.
    pub fn eci(assignval: u32) -> Result<Self> {
        let mut bb = BitBuffer::new();
        if assignval < 1 << 7 {
            bb.append_bits(assignval, 8);
        } else if assignval < 1 << 14 {
            bb.append_bits(0b10, 2);
            bb.append_bits(assignval, 14);
        } else if assignval < 1_000_000 {
            bb.append_bits(0b110, 3);
            bb.append_bits(assignval, 21);
        } else {
            return Err(QrError::InvalidEci(assignval));
        }
        Ok(Segment {
            mode: Mode::Eci,
            data: bb.into_bytes(),
            numchars: 0,
        })
    }

    /// Validates the whole payload against one mode and wraps it in a single segment.
    fn checked(payload: Payload<'_>, mode: Mode) -> Result<Self> {
        let bytes = payload.as_bytes();
        let accepts: fn(u8) -> bool = match mode {
            Mode::Numeric => |b: u8| b.is_ascii_digit(),
            Mode::Alphanumeric => is_alphanumeric_byte,
            _ => |_: u8| true,
        };
        if let Some(offset) = bytes.iter().position(|&b| !accepts(b)) {
            return Err(payload.unsupported_at(offset, mode));
        }
        Ok(Segment {
            mode,
            data: bytes.to_vec(),
            numchars: bytes.len(),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn num_chars(&self) -> usize {
        self.numchars
    }

    /// Number of data bits this segment packs into, excluding its header.
    pub fn bit_length(&self) -> usize {
        let n = self.numchars;
        match self.mode {
            Mode::Numeric => n / 3 * 10 + [0, 4, 7][n % 3],
            Mode::Alphanumeric => n / 2 * 11 + n % 2 * 6,
            Mode::Byte => n * 8,
            Mode::Kanji => n * 13,
            Mode::Eci => self.data.len() * 8,
        }
    }

    /// Appends the packed data bits (no mode indicator or count) to `bb`.
    pub(crate) fn write_data(&self, bb: &mut BitBuffer) {
        match self.mode {
            Mode::Numeric => {
                for group in self.data.chunks(3) {
                    let value = group.iter().fold(0u32, |acc, &d| acc * 10 + u32::from(d - b'0'));
                    bb.append_bits(value, group.len() as u8 * 3 + 1);
                }
            }
            Mode::Alphanumeric => {
                for pair in self.data.chunks(2) {
                    match *pair {
                        [a, b] => bb.append_bits(alphanumeric_index(a) * 45 + alphanumeric_index(b), 11),
                        [a] => bb.append_bits(alphanumeric_index(a), 6),
                        _ => unreachable!(),
                    }
                }
            }
            Mode::Byte | Mode::Eci => {
                for &b in &self.data {
                    bb.append_bits(u32::from(b), 8);
                }
            }
            Mode::Kanji => {
                for pair in self.data.chunks_exact(2) {
                    let code = u32::from(pair[0]) << 8 | u32::from(pair[1]);
                    let offset = if code <= 0x9FFC { code - 0x8140 } else { code - 0xC140 };
                    bb.append_bits((offset >> 8) * 0xC0 + (offset & 0xFF), 13);
                }
            }
        }
    }

    /// Header and data bits for `segs` at `version`, counted even when a character
    /// count is too large for its count indicator. Saturates instead of overflowing.
    pub(crate) fn encoded_bits(segs: &[Self], version: Version) -> usize {
        segs.iter().fold(0usize, |acc, seg| {
            let header = 4 + usize::from(seg.mode.num_char_count_bits(version));
            acc.saturating_add(header).saturating_add(seg.bit_length())
        })
    }

    /// Total header and data bits for `segs` at `version`, or `None` if a character
    /// count does not fit its count indicator.
    pub(crate) fn total_bits(segs: &[Self], version: Version) -> Option<usize> {
        let overflows = segs.iter().any(|seg| {
            let ccbits = u32::from(seg.mode.num_char_count_bits(version));
            seg.mode != Mode::Eci
                && 1usize
                    .checked_shl(ccbits)
                    .is_some_and(|limit| seg.numchars >= limit)
        });
        if overflows {
            None
        } else {
            Some(Self::encoded_bits(segs, version))
        }
    }

    pub fn is_numeric(text: &str) -> bool {
        text.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn is_alphanumeric(text: &str) -> bool {
        text.bytes().all(is_alphanumeric_byte)
    }
}

/// Splits `payload` into segments.
///
/// With `forced` set, the whole payload becomes one segment of that mode and any
/// character the mode cannot represent is an error. Otherwise the greedy
/// classifier decides.
pub fn segment(payload: Payload<'_>, forced: Option<Mode>) -> Result<Vec<Segment>> {
    let segs = match forced {
        Some(Mode::Eci) => return Err(QrError::InvalidMode("Eci".to_string())),
        Some(Mode::Kanji) => vec![match payload {
            Payload::Text(text) => Segment::kanji(text)?,
            Payload::Bytes(bytes) => Segment::kanji_sjis(bytes)?,
        }],
        Some(mode) => vec![Segment::checked(payload, mode)?],
        None => split_greedy(payload.as_bytes()),
    };
    debug!(
        segments = segs.len(),
        modes = ?segs.iter().map(Segment::mode).collect::<Vec<_>>(),
        "segmented input"
    );
    Ok(segs)
}

fn split_greedy(bytes: &[u8]) -> Vec<Segment> {
    let mut segs: Vec<Segment> = Vec::new();
    for &b in bytes {
        let mode = Mode::classify(b);
        match segs.last_mut() {
            Some(last) if last.mode == mode => {
                last.data.push(b);
                last.numchars += 1;
            }
            _ => segs.push(Segment {
                mode,
                data: vec![b],
                numchars: 1,
            }),
        }
    }
    segs
}

fn is_alphanumeric_byte(b: u8) -> bool {
    ALPHANUMERIC_CHARSET.as_bytes().contains(&b)
}

fn alphanumeric_index(b: u8) -> u32 {
    ALPHANUMERIC_CHARSET.bytes().position(|c| c == b).unwrap_or(0) as u32
}

fn is_kanji_pair(hi: u8, lo: u8) -> bool {
    let code = u16::from(hi) << 8 | u16::from(lo);
    let in_range = (0x8140..=0x9FFC).contains(&code) || (0xE040..=0xEBBF).contains(&code);
    in_range && lo >= 0x40 && lo != 0x7F && lo <= 0xFC
}

//! Serialising segments into the data codeword stream.

use core::fmt;

use crate::error::{QrError, Result};
use crate::segment::Segment;
use crate::version::{EcLevel, Version};

/// Pad codewords appended alternately after the terminator.
const PAD_BYTES: [u32; 2] = [0xEC, 0x11];

/// An appendable sequence of bits, packed big-endian into bytes.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct BitBuffer {
    data: Vec<u8>,
    length: usize,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            data: Vec::with_capacity((bits + 7) / 8),
            length: 0,
        }
    }

    /// Number of bits written so far.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Appends the low `len` bits of `val`, most significant first.
    pub fn append_bits(&mut self, val: u32, len: u8) {
        assert!(len <= 31 && (val >> len) == 0, "Value out of range");
        for i in (0..len).rev() {
            let shift = 7 - (self.length & 7);
            if shift == 7 {
                self.data.push(0);
            }
            let bit = ((val >> i) & 1) as u8;
            if let Some(last) = self.data.last_mut() {
                *last |= bit << shift;
            }
            self.length += 1;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer. A partial last byte is zero-filled on the right.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Display for BitBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.length {
            let bit = (self.data[i >> 3] >> (7 - (i & 7))) & 1;
            f.write_str(if bit == 1 { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Builds the padded data codewords for `segs` in a symbol of the given version and level.
///
/// The result always holds exactly `version.data_codewords(ecl)` bytes.
pub fn build(segs: &[Segment], version: Version, ecl: EcLevel) -> Result<Vec<u8>> {
    let datacapacitybits: usize = version.data_codewords(ecl) * 8;
    let datausedbits = match Segment::total_bits(segs, version) {
        Some(bits) if bits <= datacapacitybits => bits,
        bits => {
            return Err(QrError::DataTooLarge {
                required_bits: bits.unwrap_or_else(|| Segment::encoded_bits(segs, version)),
                capacity_bits: datacapacitybits,
            })
        }
    };

    let mut bb = BitBuffer::with_capacity(datacapacitybits);
    for seg in segs {
        bb.append_bits(seg.mode().mode_bits(), 4);
        let ccbits = seg.mode().num_char_count_bits(version);
        if ccbits > 0 {
            bb.append_bits(seg.num_chars() as u32, ccbits);
        }
        seg.write_data(&mut bb);
    }
    debug_assert_eq!(bb.len(), datausedbits);

    // Add terminator and pad up to a byte if applicable
    let numzerobits = core::cmp::min(4, datacapacitybits - bb.len());
    bb.append_bits(0, numzerobits as u8);
    let numzerobits = bb.len().wrapping_neg() & 7;
    bb.append_bits(0, numzerobits as u8);
    debug_assert_eq!(bb.len() % 8, 0);

    // Pad with alternating bytes until data capacity is reached
    for &padbyte in PAD_BYTES.iter().cycle() {
        if bb.len() >= datacapacitybits {
            break;
        }
        bb.append_bits(padbyte, 8);
    }

    let data = bb.into_bytes();
    if data.len() != version.data_codewords(ecl) {
        return Err(QrError::InternalLayout(format!(
            "built {} data codewords, version {}-{} holds {}",
            data.len(),
            version,
            ecl,
            version.data_codewords(ecl)
        )));
    }
    Ok(data)
}

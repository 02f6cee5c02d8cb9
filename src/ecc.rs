//! Reed-Solomon error correction over GF(256) and block interleaving.
//!
//! The field uses the primitive polynomial x^8 + x^4 + x^3 + x^2 + 1 (0x11D) with
//! generator element 2. Its exp/log tables are computed at compile time.

use crate::error::{QrError, Result};
use crate::version::{EcLevel, Version};

/// Exponent and logarithm tables for GF(256).
struct GfTables {
    exp: [u8; 256],
    log: [u8; 256],
}

impl GfTables {
    const fn build() -> Self {
        let mut exp = [0u8; 256];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        let mut i = 0;
        while i < 255 {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= 0x11D;
            }
            i += 1;
        }
        exp[255] = exp[0];
        Self { exp, log }
    }
}

static GF: GfTables = GfTables::build();

/// Multiplication in GF(256).
pub fn gf_mul(x: u8, y: u8) -> u8 {
    if x == 0 || y == 0 {
        return 0;
    }
    let sum = usize::from(GF.log[usize::from(x)]) + usize::from(GF.log[usize::from(y)]);
    GF.exp[sum % 255]
}

/// `2^n` in GF(256).
pub fn gf_exp(n: usize) -> u8 {
    GF.exp[n % 255]
}

/// Computes Reed-Solomon remainders for one generator degree.
pub struct ReedSolomonGenerator {
    /// Generator coefficients below the implicit leading 1, highest degree first.
    divisor: Vec<u8>,
}

impl ReedSolomonGenerator {
    /// Builds the generator `(x - 2^0)(x - 2^1)...(x - 2^(degree-1))`.
    ///
    /// # Panics
    ///
    /// Panics if `degree` is outside 1..=255.
    pub fn new(degree: usize) -> Self {
        assert!((1..=255).contains(&degree), "Degree out of range");
        let mut divisor = vec![0u8; degree];
        divisor[degree - 1] = 1;
        let mut root: u8 = 1;
        for _ in 0..degree {
            for j in 0..degree {
                divisor[j] = gf_mul(divisor[j], root);
                if j + 1 < degree {
                    divisor[j] ^= divisor[j + 1];
                }
            }
            root = gf_mul(root, 0x02);
        }
        Self { divisor }
    }

    pub fn degree(&self) -> usize {
        self.divisor.len()
    }

    /// Returns the remainder of `data(x) * x^degree` divided by the generator.
    pub fn remainder(&self, data: &[u8]) -> Vec<u8> {
        let mut result = vec![0u8; self.degree()];
        for &b in data {
            let factor = b ^ result[0];
            result.rotate_left(1);
            if let Some(last) = result.last_mut() {
                *last = 0;
            }
            for (x, &y) in result.iter_mut().zip(self.divisor.iter()) {
                *x ^= gf_mul(y, factor);
            }
        }
        result
    }
}

/// A run of data codewords protected by its own error correction codewords.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Block {
    pub data: Vec<u8>,
    pub ecc_len: usize,
}

impl Block {
    pub fn ecc(&self, rs: &ReedSolomonGenerator) -> Vec<u8> {
        debug_assert_eq!(rs.degree(), self.ecc_len);
        rs.remainder(&self.data)
    }
}

/// Splits data codewords into the version's blocks. The last
/// `total % blocks` blocks carry one extra data codeword.
pub fn split_blocks(data: &[u8], version: Version, ecl: EcLevel) -> Result<Vec<Block>> {
    if data.len() != version.data_codewords(ecl) {
        return Err(QrError::InternalLayout(format!(
            "{} data codewords given, version {}-{} takes {}",
            data.len(),
            version,
            ecl,
            version.data_codewords(ecl)
        )));
    }
    let numblocks = version.num_blocks(ecl);
    let blockecclen = version.ecc_codewords_per_block(ecl);
    let rawcodewords = version.total_codewords();
    let numshortblocks = numblocks - rawcodewords % numblocks;
    let shortblockdatalen = rawcodewords / numblocks - blockecclen;

    let mut blocks = Vec::with_capacity(numblocks);
    let mut rest = data;
    for i in 0..numblocks {
        let datlen = shortblockdatalen + usize::from(i >= numshortblocks);
        let (head, tail) = rest.split_at(datlen);
        blocks.push(Block {
            data: head.to_vec(),
            ecc_len: blockecclen,
        });
        rest = tail;
    }
    debug_assert!(rest.is_empty());
    Ok(blocks)
}

/// Appends error correction to `data` and interleaves the blocks into the final
/// codeword sequence.
pub fn encode(data: &[u8], version: Version, ecl: EcLevel) -> Result<Vec<u8>> {
    let blocks = split_blocks(data, version, ecl)?;
    let rs = ReedSolomonGenerator::new(version.ecc_codewords_per_block(ecl));
    let eccs: Vec<Vec<u8>> = blocks.iter().map(|block| block.ecc(&rs)).collect();

    let mut result: Vec<u8> = Vec::with_capacity(version.total_codewords());
    let longest = blocks.iter().map(|b| b.data.len()).max().unwrap_or(0);
    for i in 0..longest {
        result.extend(blocks.iter().filter_map(|b| b.data.get(i)));
    }
    for i in 0..rs.degree() {
        result.extend(eccs.iter().map(|ecc| ecc[i]));
    }

    if result.len() != version.total_codewords() {
        return Err(QrError::InternalLayout(format!(
            "interleaved {} codewords, version {} holds {}",
            result.len(),
            version,
            version.total_codewords()
        )));
    }
    Ok(result)
}

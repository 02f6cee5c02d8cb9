//! The eight data mask patterns and the penalty rules used to choose between them.

use core::convert::TryFrom;
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{QrError, Result};
use crate::matrix::Matrix;
use crate::version::EcLevel;

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Mask(u8);

impl Mask {
    pub const ALL: [Mask; 8] = [
        Mask(0),
        Mask(1),
        Mask(2),
        Mask(3),
        Mask(4),
        Mask(5),
        Mask(6),
        Mask(7),
    ];

    /// Creates a mask object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    /// Returns the value, which is in the range [0, 7].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether this pattern inverts the module at column `x`, row `y`.
    pub fn inverts(self, x: usize, y: usize) -> bool {
        match self.0 {
            0 => (x + y) % 2 == 0,
            1 => y % 2 == 0,
            2 => x % 3 == 0,
            3 => (x + y) % 3 == 0,
            4 => (x / 3 + y / 2) % 2 == 0,
            5 => ((x * y) % 2) + ((x * y) % 3) == 0,
            6 => (((x * y) % 2) + ((x * y) % 3)) % 2 == 0,
            7 => (((x + y) % 2) + ((x * y) % 3)) % 2 == 0,
            _ => unreachable!(),
        }
    }

    /// XORs the pattern onto the data modules. Applying it twice restores the input.
    pub fn apply(self, matrix: &mut Matrix) {
        matrix.xor_data(|x, y| self.inverts(x, y));
    }
}

impl TryFrom<u8> for Mask {
    type Error = QrError;

    fn try_from(mask: u8) -> Result<Self> {
        if mask <= 7 {
            Ok(Self(mask))
        } else {
            Err(QrError::InvalidMask(mask.to_string()))
        }
    }
}

impl From<Mask> for u8 {
    fn from(mask: Mask) -> u8 {
        mask.0
    }
}

impl FromStr for Mask {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().parse::<u8>() {
            Ok(value) if value <= 7 => Ok(Mask(value)),
            _ => Err(QrError::InvalidMask(s.to_string())),
        }
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Masks `unmasked` with every pattern, writes the matching format bits, and keeps
/// the result with the lowest penalty. Ties go to the lowest mask number.
pub fn select_mask(unmasked: &Matrix, ecl: EcLevel) -> (Matrix, Mask) {
    let candidate = |mask: &Mask| {
        let mut matrix = unmasked.clone();
        mask.apply(&mut matrix);
        matrix.draw_format_bits(ecl, *mask);
        let penalty = penalty_score(&matrix);
        trace!(mask = mask.value(), penalty, "Scored mask");
        (penalty, *mask, matrix)
    };

    #[cfg(feature = "parallel")]
    let best = Mask::ALL
        .par_iter()
        .map(candidate)
        .min_by_key(|(penalty, mask, _)| (*penalty, *mask));
    #[cfg(not(feature = "parallel"))]
    let best = Mask::ALL
        .iter()
        .map(candidate)
        .min_by_key(|(penalty, mask, _)| (*penalty, *mask));

    match best {
        Some((penalty, mask, matrix)) => {
            debug!(mask = mask.value(), penalty, "Selected mask");
            (matrix, mask)
        }
        // Mask::ALL is never empty
        None => unreachable!(),
    }
}

/// Computes the penalty score of a finished symbol under rules N1 to N4.
pub fn penalty_score(matrix: &Matrix) -> i32 {
    let size = matrix.size();
    let modules = matrix.to_bools();
    let dark = |x: usize, y: usize| modules[y * size + x];
    let mut result: i32 = 0;

    // Runs and finder-like patterns along rows, then columns
    for horizontal in [true, false] {
        for a in 0..size {
            let mut runcolor = false;
            let mut runlen: i32 = 0;
            let mut runhistory = FinderPenalty::new(size as i32);
            for b in 0..size {
                let color = if horizontal { dark(b, a) } else { dark(a, b) };
                if color == runcolor {
                    runlen += 1;
                    if runlen == 5 {
                        result += PENALTY_N1;
                    } else if runlen > 5 {
                        result += 1;
                    }
                } else {
                    runhistory.add_history(runlen);
                    if !runcolor {
                        result += runhistory.count_patterns() * PENALTY_N3;
                    }
                    runcolor = color;
                    runlen = 1;
                }
            }
            result += runhistory.terminate_and_count(runcolor, runlen) * PENALTY_N3;
        }
    }

    // 2x2 blocks of one colour
    for y in 0..size - 1 {
        for x in 0..size - 1 {
            let color = dark(x, y);
            if color == dark(x + 1, y) && color == dark(x, y + 1) && color == dark(x + 1, y + 1) {
                result += PENALTY_N2;
            }
        }
    }

    // Dark/light balance
    let dark = modules.iter().filter(|&&m| m).count() as i32;
    let total = (size * size) as i32;
    let k: i32 = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
    result += k * PENALTY_N4;
    result
}

/// Tracks the last seven run lengths of a row or column to spot 1:1:3:1:1 patterns.
struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: i32) -> Self {
        Self {
            qr_size: size,
            run_history: [0; 7],
        }
    }

    fn add_history(&mut self, mut currentrunlength: i32) {
        // The light border counts as part of the first run
        if self.run_history[0] == 0 {
            currentrunlength += self.qr_size;
        }
        let len: usize = self.run_history.len();
        self.run_history.copy_within(0..len - 1, 1);
        self.run_history[0] = currentrunlength;
    }

    /// Counts a pattern on each side that has a light run of 4 units beside it.
    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n)
            + i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    fn terminate_and_count(mut self, currentruncolor: bool, mut currentrunlength: i32) -> i32 {
        if currentruncolor {
            self.add_history(currentrunlength);
            currentrunlength = 0;
        }
        currentrunlength += self.qr_size;
        self.add_history(currentrunlength);
        self.count_patterns()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::place;
    use crate::version::Version;

    fn sample_matrix() -> Matrix {
        let version = Version::new(2);
        let codewords: Vec<u8> = (0..version.total_codewords()).map(|i| (i * 37) as u8).collect();
        place(&codewords, version).unwrap()
    }

    #[test]
    fn test_mask_parse() {
        assert_eq!("3".parse::<Mask>().unwrap(), Mask::new(3));
        assert!(matches!("8".parse::<Mask>(), Err(QrError::InvalidMask(s)) if s == "8"));
        assert!(matches!("x3".parse::<Mask>(), Err(QrError::InvalidMask(s)) if s == "x3"));
        assert!(matches!("-1".parse::<Mask>(), Err(QrError::InvalidMask(s)) if s == "-1"));
        assert!(matches!(Mask::try_from(9), Err(QrError::InvalidMask(s)) if s == "9"));
        let err = "auto".parse::<Mask>().unwrap_err();
        assert!(err.to_string().contains("\"auto\""));
    }

    #[test]
    fn test_inverts() {
        assert!(Mask::new(0).inverts(0, 0));
        assert!(!Mask::new(0).inverts(1, 0));
        assert!(Mask::new(1).inverts(5, 2));
        assert!(Mask::new(2).inverts(3, 1));
        assert!(!Mask::new(2).inverts(4, 1));
    }

    #[test]
    fn test_apply_twice_restores() {
        let unmasked = sample_matrix();
        for mask in Mask::ALL {
            let mut matrix = unmasked.clone();
            mask.apply(&mut matrix);
            assert_ne!(matrix, unmasked);
            mask.apply(&mut matrix);
            assert_eq!(matrix, unmasked);
        }
    }

    #[test]
    fn test_function_modules_untouched() {
        let unmasked = sample_matrix();
        let mut matrix = unmasked.clone();
        Mask::new(0).apply(&mut matrix);
        for y in 0..matrix.size() {
            for x in 0..matrix.size() {
                if unmasked.is_reserved(x, y) {
                    assert_eq!(matrix.get(x, y), unmasked.get(x, y));
                }
            }
        }
    }

    #[test]
    fn test_select_mask_is_minimal() {
        let unmasked = sample_matrix();
        let (chosen, mask) = select_mask(&unmasked, EcLevel::M);
        let best = penalty_score(&chosen);
        for other in Mask::ALL {
            let mut matrix = unmasked.clone();
            other.apply(&mut matrix);
            matrix.draw_format_bits(EcLevel::M, other);
            let score = penalty_score(&matrix);
            assert!(score > best || (score == best && other >= mask));
        }
    }

    #[test]
    fn test_finder_pattern_counted_per_side() {
        let mut fp = FinderPenalty::new(21);
        // light 4, dark 1, light 1, dark 3, light 1, dark 1, light 4
        for run in [4, 1, 1, 3, 1, 1] {
            fp.add_history(run);
        }
        fp.add_history(4);
        // History (newest first): 4,1,1,3,1,1,4+21; both sides qualify
        assert_eq!(fp.count_patterns(), 2);
    }
}

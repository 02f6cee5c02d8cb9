//! Module layout: function patterns, format and version information, and the
//! zig-zag placement of codeword bits.

use crate::error::{QrError, Result};
use crate::mask::Mask;
use crate::version::{EcLevel, Version};

/// One cell of the symbol.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Module {
    /// Not yet drawn.
    Unset,
    /// Part of a reserved area. Never masked or overwritten by data.
    Function(bool),
    /// Carries a codeword bit (or a remainder bit).
    Data(bool),
}

impl Module {
    pub fn is_dark(self) -> bool {
        matches!(self, Module::Function(true) | Module::Data(true))
    }

    pub fn is_reserved(self) -> bool {
        matches!(self, Module::Function(_))
    }
}

/// A square grid of modules under construction.
///
/// Coordinates are `(x, y)` with `x` the column and `y` the row, origin top-left.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Matrix {
    version: Version,
    size: usize,
    modules: Vec<Module>,
}

impl Matrix {
    /// An empty grid for the given version.
    pub fn new(version: Version) -> Self {
        let size = version.size();
        Self {
            version,
            size,
            modules: vec![Module::Unset; size * size],
        }
    }

    /// A grid with every function pattern drawn and the format area reserved.
    pub fn with_function_patterns(version: Version) -> Self {
        let mut result = Self::new(version);
        result.draw_timing_patterns();
        result.draw_finder_patterns();
        result.draw_alignment_patterns();
        result.reserve_format_area();
        result.draw_version_info();
        result
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, x: usize, y: usize) -> Module {
        self.modules[y * self.size + x]
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.get(x, y).is_dark()
    }

    pub fn is_reserved(&self, x: usize, y: usize) -> bool {
        self.get(x, y).is_reserved()
    }

    /// Row-major dark/light values.
    pub fn to_bools(&self) -> Vec<bool> {
        self.modules.iter().map(|m| m.is_dark()).collect()
    }

    /// Coordinates of the non-reserved modules in placement order.
    pub fn data_positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        ZigZag::new(self.size).filter(move |&(x, y)| !self.is_reserved(x, y))
    }

    /// Inverts every data module for which `invert(x, y)` holds.
    pub(crate) fn xor_data(&mut self, invert: impl Fn(usize, usize) -> bool) {
        let size = self.size;
        for (i, module) in self.modules.iter_mut().enumerate() {
            if let Module::Data(dark) = *module {
                if invert(i % size, i / size) {
                    *module = Module::Data(!dark);
                }
            }
        }
    }

    fn set_function(&mut self, x: usize, y: usize, isdark: bool) {
        let size = self.size;
        self.modules[y * size + x] = Module::Function(isdark);
    }

    fn set_function_unbounded(&mut self, x: i32, y: i32, isdark: bool) {
        let range = 0..self.size as i32;
        if range.contains(&x) && range.contains(&y) {
            self.set_function(x as usize, y as usize, isdark);
        }
    }

    fn draw_timing_patterns(&mut self) {
        for i in 0..self.size {
            self.set_function(6, i, i % 2 == 0);
            self.set_function(i, 6, i % 2 == 0);
        }
    }

    /// Three 7x7 finders, each with its light separator.
    fn draw_finder_patterns(&mut self) {
        let far = self.size as i32 - 4;
        for (cx, cy) in [(3, 3), (far, 3), (3, far)] {
            for dy in -4i32..=4 {
                for dx in -4i32..=4 {
                    let dist = dx.abs().max(dy.abs());
                    self.set_function_unbounded(cx + dx, cy + dy, dist != 2 && dist != 4);
                }
            }
        }
    }

    fn draw_alignment_patterns(&mut self) {
        let alignpatpos = self.version.alignment_pattern_positions();
        let last = alignpatpos.len().saturating_sub(1);
        for (i, &pos0) in alignpatpos.iter().enumerate() {
            for (j, &pos1) in alignpatpos.iter().enumerate() {
                // Skip the three finder corners
                if (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0) {
                    continue;
                }
                for dy in -2i32..=2 {
                    for dx in -2i32..=2 {
                        let x = (i32::from(pos0) + dx) as usize;
                        let y = (i32::from(pos1) + dy) as usize;
                        self.set_function(x, y, dx.abs().max(dy.abs()) != 1);
                    }
                }
            }
        }
    }

    fn reserve_format_area(&mut self) {
        for copy in format_info_positions(self.size) {
            for (x, y) in copy {
                self.set_function(x, y, false);
            }
        }
        // The dark module next to the bottom-left finder
        let size = self.size;
        self.set_function(8, size - 8, true);
    }

    fn draw_version_info(&mut self) {
        if self.version.value() < 7 {
            return;
        }
        let bits = version_bits(self.version);
        for i in 0..18 {
            let bit = get_bit(bits, i);
            let a = self.size - 11 + (i % 3);
            let b = i / 3;
            self.set_function(a, b, bit);
            self.set_function(b, a, bit);
        }
    }

    /// Writes both copies of the format information for `ecl` and `mask`.
    pub fn draw_format_bits(&mut self, ecl: EcLevel, mask: Mask) {
        let bits = u32::from(format_bits(ecl, mask));
        for copy in format_info_positions(self.size) {
            for (i, (x, y)) in copy.into_iter().enumerate() {
                self.set_function(x, y, get_bit(bits, i));
            }
        }
    }

    /// Places the interleaved codewords into the free modules, most significant bit
    /// first, along the zig-zag traversal. The remaining modules become light.
    pub fn place_codewords(&mut self, codewords: &[u8]) -> Result<()> {
        let positions: Vec<(usize, usize)> = self.data_positions().collect();
        let databits = codewords.len() * 8;
        if positions.len() != databits + self.version.remainder_bits() {
            return Err(QrError::InternalLayout(format!(
                "{} free modules for {} codeword bits and {} remainder bits",
                positions.len(),
                databits,
                self.version.remainder_bits()
            )));
        }
        let size = self.size;
        for (i, &(x, y)) in positions.iter().enumerate() {
            let dark = i < databits && get_bit(u32::from(codewords[i >> 3]), 7 - (i & 7));
            self.modules[y * size + x] = Module::Data(dark);
        }
        if self.modules.contains(&Module::Unset) {
            return Err(QrError::InternalLayout("modules left undrawn".to_string()));
        }
        Ok(())
    }
}

/// Builds the unmasked symbol for `codewords`.
pub fn place(codewords: &[u8], version: Version) -> Result<Matrix> {
    if codewords.len() != version.total_codewords() {
        return Err(QrError::InternalLayout(format!(
            "{} codewords given, version {} holds {}",
            codewords.len(),
            version,
            version.total_codewords()
        )));
    }
    let mut matrix = Matrix::with_function_patterns(version);
    matrix.place_codewords(codewords)?;
    Ok(matrix)
}

/// The 15-bit format information: level and mask, BCH(15,5) coded, XOR 0x5412.
pub fn format_bits(ecl: EcLevel, mask: Mask) -> u16 {
    let data = u32::from(ecl.format_bits() << 3 | mask.value());
    let mut rem: u32 = data;
    for _ in 0..10 {
        rem = (rem << 1) ^ ((rem >> 9) * 0x537);
    }
    (((data << 10) | rem) ^ 0x5412) as u16
}

/// The 18-bit version information, BCH(18,6) coded.
pub fn version_bits(version: Version) -> u32 {
    let ver = u32::from(version.value());
    let mut rem: u32 = ver;
    for _ in 0..12 {
        rem = (rem << 1) ^ ((rem >> 11) * 0x1F25);
    }
    (ver << 12) | rem
}

/// Module coordinates of format bit `i` in each of the two copies.
fn format_info_positions(size: usize) -> [[(usize, usize); 15]; 2] {
    let mut around_finder = [(0, 0); 15];
    let mut split = [(0, 0); 15];
    for i in 0..15 {
        around_finder[i] = match i {
            0..=5 => (8, i),
            6 => (8, 7),
            7 => (8, 8),
            8 => (7, 8),
            _ => (14 - i, 8),
        };
        split[i] = if i < 8 { (size - 1 - i, 8) } else { (8, size - 15 + i) };
    }
    [around_finder, split]
}

/// The placement order of the standard: column pairs from the right edge, going up
/// then down alternately, skipping the vertical timing column. Yields every module
/// coordinate; callers filter out reserved ones.
#[derive(Clone, Debug)]
pub struct ZigZag {
    size: usize,
    right: i32,
    vert: usize,
    j: usize,
}

impl ZigZag {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            right: size as i32 - 1,
            vert: 0,
            j: 0,
        }
    }
}

impl Iterator for ZigZag {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        if self.vert == self.size {
            self.vert = 0;
            self.right -= 2;
            if self.right == 6 {
                self.right = 5;
            }
        }
        if self.right < 1 {
            return None;
        }
        let x = (self.right - self.j as i32) as usize;
        let upward = ((self.right + 1) & 2) == 0;
        let y = if upward { self.size - 1 - self.vert } else { self.vert };
        self.j += 1;
        if self.j == 2 {
            self.j = 0;
            self.vert += 1;
        }
        Some((x, y))
    }
}

fn get_bit(x: u32, i: usize) -> bool {
    ((x >> i) & 1) != 0
}

//! Read-back tests for produced symbols
//!
//! A minimal reader walks each symbol the way a scanner would after sampling:
//!
//! 1. **Format**: both format copies decode to the reported level and mask
//! 2. **Unmask**: the data modules are unmasked and read in placement order
//! 3. **Blocks**: codewords are de-interleaved and every block has zero syndromes
//! 4. **Segments**: the bit stream parses back to the original bytes

use encoding_rs::SHIFT_JIS;
use proptest::prelude::*;

use qrcore::ecc::{gf_exp, gf_mul};
use qrcore::matrix::{self, Matrix};
use qrcore::{encode_qr, EcLevel, EncodeOptions, Mask, Mode, QrCode, QrError, Version};

const ALPHANUMERIC_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

// =============================================================================
// Reader
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
struct Decoded {
    ecl: EcLevel,
    mask: Mask,
    eci: Option<u32>,
    modes: Vec<Mode>,
    bytes: Vec<u8>,
}

/// Format bit `i` of the copy around the top-left finder, and of the split copy.
fn format_positions(size: i32, i: i32) -> ((i32, i32), (i32, i32)) {
    let first = match i {
        0..=5 => (8, i),
        6 => (8, 7),
        7 => (8, 8),
        8 => (7, 8),
        _ => (14 - i, 8),
    };
    let second = if i < 8 { (size - 1 - i, 8) } else { (8, size - 15 + i) };
    (first, second)
}

fn read_format(qr: &QrCode) -> (EcLevel, Mask) {
    let (mut a, mut b) = (0u16, 0u16);
    for i in 0..15 {
        let ((x0, y0), (x1, y1)) = format_positions(qr.size(), i);
        a |= u16::from(qr.get_module(x0, y0)) << i;
        b |= u16::from(qr.get_module(x1, y1)) << i;
    }
    assert_eq!(a, b, "format copies differ");
    for ecl in EcLevel::ALL {
        for mask in Mask::ALL {
            if matrix::format_bits(ecl, mask) == a {
                return (ecl, mask);
            }
        }
    }
    panic!("unknown format bits {:015b}", a);
}

fn read_version_info(qr: &QrCode) -> Option<u32> {
    if qr.version().value() < 7 {
        return None;
    }
    let size = qr.size();
    let (mut a, mut b) = (0u32, 0u32);
    for i in 0..18 {
        let (x, y) = (size - 11 + i % 3, i / 3);
        a |= u32::from(qr.get_module(x, y)) << i;
        b |= u32::from(qr.get_module(y, x)) << i;
    }
    assert_eq!(a, b, "version copies differ");
    Some(a)
}

fn read_codewords(qr: &QrCode, mask: Mask) -> Vec<u8> {
    let version = qr.version();
    let layout = Matrix::with_function_patterns(version);
    let mut codewords = vec![0u8; version.total_codewords()];
    for (i, (x, y)) in layout
        .data_positions()
        .take(version.total_codewords() * 8)
        .enumerate()
    {
        let bit = qr.get_module(x as i32, y as i32) ^ mask.inverts(x, y);
        codewords[i >> 3] |= u8::from(bit) << (7 - (i & 7));
    }
    codewords
}

/// Splits the interleaved sequence back into whole blocks (data followed by ECC).
fn deinterleave(codewords: &[u8], version: Version, ecl: EcLevel) -> (Vec<Vec<u8>>, usize) {
    let numblocks = version.num_blocks(ecl);
    let ecclen = version.ecc_codewords_per_block(ecl);
    let total = version.total_codewords();
    let numshort = numblocks - total % numblocks;
    let shortlen = total / numblocks - ecclen;

    let datalens: Vec<usize> = (0..numblocks)
        .map(|j| shortlen + usize::from(j >= numshort))
        .collect();
    let mut blocks: Vec<Vec<u8>> = vec![Vec::new(); numblocks];
    let mut it = codewords.iter().copied();
    for i in 0..=shortlen {
        for (j, block) in blocks.iter_mut().enumerate() {
            if i < datalens[j] {
                block.push(it.next().unwrap());
            }
        }
    }
    for _ in 0..ecclen {
        for block in blocks.iter_mut() {
            block.push(it.next().unwrap());
        }
    }
    assert!(it.next().is_none());
    (blocks, ecclen)
}

fn syndromes_are_zero(block: &[u8], ecclen: usize) -> bool {
    (0..ecclen).all(|r| {
        let root = gf_exp(r);
        block.iter().fold(0u8, |acc, &c| gf_mul(acc, root) ^ c) == 0
    })
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl BitReader<'_> {
    fn remaining(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    fn read(&mut self, n: usize) -> u32 {
        let mut val = 0u32;
        for _ in 0..n {
            let bit = (self.data[self.pos >> 3] >> (7 - (self.pos & 7))) & 1;
            val = (val << 1) | u32::from(bit);
            self.pos += 1;
        }
        val
    }
}

fn parse_segments(data: &[u8], version: Version, decoded: &mut Decoded) {
    let mut br = BitReader { data, pos: 0 };
    while br.remaining() >= 4 {
        let modebits = br.read(4);
        let mode = match modebits {
            0 => break,
            1 => Mode::Numeric,
            2 => Mode::Alphanumeric,
            4 => Mode::Byte,
            7 => Mode::Eci,
            8 => Mode::Kanji,
            other => panic!("unexpected mode indicator {:04b}", other),
        };
        decoded.modes.push(mode);
        let count = br.read(usize::from(mode.num_char_count_bits(version))) as usize;
        match mode {
            Mode::Numeric => {
                let mut left = count;
                while left > 0 {
                    let take = left.min(3);
                    let value = br.read(take * 3 + 1);
                    let digits = format!("{:0width$}", value, width = take);
                    decoded.bytes.extend_from_slice(digits.as_bytes());
                    left -= take;
                }
            }
            Mode::Alphanumeric => {
                let mut left = count;
                while left > 0 {
                    if left >= 2 {
                        let value = br.read(11) as usize;
                        decoded.bytes.push(ALPHANUMERIC_CHARSET[value / 45]);
                        decoded.bytes.push(ALPHANUMERIC_CHARSET[value % 45]);
                        left -= 2;
                    } else {
                        decoded.bytes.push(ALPHANUMERIC_CHARSET[br.read(6) as usize]);
                        left -= 1;
                    }
                }
            }
            Mode::Byte => {
                for _ in 0..count {
                    decoded.bytes.push(br.read(8) as u8);
                }
            }
            Mode::Kanji => {
                for _ in 0..count {
                    let value = br.read(13);
                    let packed = ((value / 0xC0) << 8) | (value % 0xC0);
                    let sjis = if packed < 0x1F00 { packed + 0x8140 } else { packed + 0xC140 };
                    decoded.bytes.push((sjis >> 8) as u8);
                    decoded.bytes.push(sjis as u8);
                }
            }
            Mode::Eci => {
                let first = br.read(8);
                let value = if first & 0x80 == 0 {
                    first
                } else if first & 0xC0 == 0x80 {
                    ((first & 0x3F) << 8) | br.read(8)
                } else {
                    ((first & 0x1F) << 16) | br.read(16)
                };
                decoded.eci = Some(value);
            }
        }
    }
}

fn read_back(qr: &QrCode) -> Decoded {
    let version = qr.version();
    let (ecl, mask) = read_format(qr);
    if let Some(bits) = read_version_info(qr) {
        assert_eq!(bits, matrix::version_bits(version));
    }
    let codewords = read_codewords(qr, mask);
    let (blocks, ecclen) = deinterleave(&codewords, version, ecl);
    for block in &blocks {
        assert!(syndromes_are_zero(block, ecclen), "corrupt block");
    }
    let data: Vec<u8> = blocks
        .iter()
        .flat_map(|b| b[..b.len() - ecclen].iter().copied())
        .collect();
    assert_eq!(data.len(), version.data_codewords(ecl));

    let mut decoded = Decoded {
        ecl,
        mask,
        eci: None,
        modes: Vec::new(),
        bytes: Vec::new(),
    };
    parse_segments(&data, version, &mut decoded);
    decoded
}

// =============================================================================
// Known Symbols
// =============================================================================

#[test]
fn test_hello_world_reads_back() {
    let qr = QrCode::encode_text("HELLO WORLD", EcLevel::Q).unwrap();
    let decoded = read_back(&qr);
    assert_eq!(decoded.ecl, EcLevel::Q);
    assert_eq!(decoded.mask, qr.mask());
    assert_eq!(decoded.modes, vec![Mode::Alphanumeric]);
    assert_eq!(decoded.bytes, b"HELLO WORLD");
}

#[test]
fn test_mixed_modes_read_back() {
    let text = "Order 12345678 ships to ROOM 101";
    let qr = QrCode::encode_text(text, EcLevel::M).unwrap();
    let decoded = read_back(&qr);
    assert_eq!(decoded.bytes, text.as_bytes());
    assert!(decoded.modes.contains(&Mode::Numeric));
    assert!(decoded.modes.contains(&Mode::Byte));
}

#[test]
fn test_kanji_reads_back() {
    let options = EncodeOptions {
        mode: Some(Mode::Kanji),
        ..EncodeOptions::default()
    };
    let qr = encode_qr("点茗", &options).unwrap();
    let decoded = read_back(&qr);
    assert_eq!(decoded.modes, vec![Mode::Kanji]);
    assert_eq!(decoded.bytes, vec![0x93, 0x5F, 0xE4, 0xAA]);
    let (sjis, _, _) = SHIFT_JIS.encode("点茗");
    assert_eq!(decoded.bytes, sjis.as_ref());
}

#[test]
fn test_eci_reads_back() {
    let options = EncodeOptions {
        eci: Some(899),
        ..EncodeOptions::default()
    };
    let qr = encode_qr(&[0xC3u8, 0xA9, 0x41][..], &options).unwrap();
    let decoded = read_back(&qr);
    assert_eq!(decoded.eci, Some(899));
    assert_eq!(decoded.modes[0], Mode::Eci);
    assert_eq!(decoded.bytes, vec![0xC3, 0xA9, 0x41]);
}

#[test]
fn test_large_version_reads_back() {
    // Lowercase only, so the whole payload stays one byte segment
    let data: Vec<u8> = (0..1000u32).map(|i| b'a' + (i * 7 % 26) as u8).collect();
    let qr = QrCode::encode_binary(&data, EcLevel::L).unwrap();
    assert!(qr.version().value() >= 7);
    let decoded = read_back(&qr);
    assert_eq!(decoded.bytes, data);
}

#[test]
fn test_every_fixed_mask_reads_back() {
    for mask in Mask::ALL {
        let options = EncodeOptions {
            mask: Some(mask),
            ec_level: EcLevel::H,
            ..EncodeOptions::default()
        };
        let qr = encode_qr("MASK TEST 0123", &options).unwrap();
        let decoded = read_back(&qr);
        assert_eq!(decoded.mask, mask);
        assert_eq!(decoded.bytes, b"MASK TEST 0123");
    }
}

#[test]
fn test_capacity_limits() {
    // Version 40-L holds 2953 bytes in byte mode
    let fits = vec![b'a'; 2953];
    let qr = QrCode::encode_binary(&fits, EcLevel::L).unwrap();
    assert_eq!(qr.version(), Version::MAX);

    let too_many = vec![b'a'; 2954];
    assert!(matches!(
        QrCode::encode_binary(&too_many, EcLevel::L),
        Err(QrError::DataTooLarge { .. })
    ));

    let at_h = vec![b'a'; 3000];
    match QrCode::encode_binary(&at_h, EcLevel::H) {
        Err(QrError::DataTooLarge { capacity_bits, .. }) => assert_eq!(capacity_bits, 1276 * 8),
        other => panic!("unexpected result: {:?}", other.map(|qr| qr.version())),
    }
}

#[test]
fn test_empty_input() {
    assert!(matches!(
        encode_qr("", &EncodeOptions::default()),
        Err(QrError::EmptyData)
    ));
}

// =============================================================================
// Properties
// =============================================================================

fn ecl_strategy() -> impl Strategy<Value = EcLevel> {
    prop::sample::select(EcLevel::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: any byte payload reads back unchanged with the reported level.
    #[test]
    fn prop_bytes_round_trip(
        data in prop::collection::vec(any::<u8>(), 1..300),
        ecl in ecl_strategy(),
    ) {
        let qr = QrCode::encode_binary(&data, ecl).unwrap();
        let decoded = read_back(&qr);
        prop_assert_eq!(decoded.ecl, ecl);
        prop_assert_eq!(decoded.bytes, data);
    }

    /// Property: alphanumeric and numeric text round-trips through the denser modes.
    #[test]
    fn prop_alphanumeric_round_trip(
        text in "[0-9A-Z $%*+./:-]{1,200}",
        ecl in ecl_strategy(),
    ) {
        let qr = QrCode::encode_text(&text, ecl).unwrap();
        let decoded = read_back(&qr);
        prop_assert!(!decoded.modes.contains(&Mode::Byte));
        prop_assert_eq!(decoded.bytes, text.into_bytes());
    }

    /// Property: encoding is deterministic and the side length follows the version.
    #[test]
    fn prop_deterministic_and_sized(text in "\\PC{1,80}", ecl in ecl_strategy()) {
        let a = QrCode::encode_text(&text, ecl).unwrap();
        let b = QrCode::encode_text(&text, ecl).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.size(), i32::from(a.version().value()) * 4 + 17);
        prop_assert!(a.mask().value() <= 7);
    }

    /// Property: the automatic version is the smallest one that fits.
    #[test]
    fn prop_version_is_minimal(
        data in prop::collection::vec(any::<u8>(), 1..400),
        ecl in ecl_strategy(),
    ) {
        let qr = QrCode::encode_binary(&data, ecl).unwrap();
        let ver = qr.version().value();
        if ver > 1 {
            let options = EncodeOptions {
                ec_level: ecl,
                version: Some(Version::new(ver - 1)),
                ..EncodeOptions::default()
            };
            let smaller = encode_qr(&data, &options);
            prop_assert!(
                matches!(smaller, Err(QrError::DataTooLarge { .. })),
                "version {} would also fit",
                ver - 1
            );
        }
    }
}

#![forbid(unsafe_code)]
//! QR symbol construction.
//!
//! This module turns segments into data codewords, adds Reed-Solomon error
//! correction, lays the interleaved codewords out on the module grid and picks
//! the mask with the lowest penalty. It supports QR Code Model 2 versions 1
//! to 40 at all four error correction levels.
use log::{debug, trace};

use crate::error::{Error, Result};
use crate::reed_solomon::ReedSolomonGenerator;
use crate::segment::{make_segments, prepare_text, BitBuffer, EncodeMode, QrSegment};
use crate::version::{ErrorLevel, Mask, Version};

/// A QR Code symbol, representing a square grid of dark and light modules.
///
/// Besides the module colors the symbol keeps which modules belong to
/// function patterns (finders, timing, alignment, format and version
/// information). Those are never touched by masking.
///
/// # Example
///
/// ```rust
/// use qrpng::qrcode::QrCode;
/// use qrpng::segment::EncodeMode;
/// use qrpng::version::{ErrorLevel, Version};
///
/// let qr = QrCode::encode_text(
///     "HELLO WORLD",
///     ErrorLevel::Medium,
///     EncodeMode::Auto,
///     true,
///     Version::MIN,
///     Version::MAX,
///     None,
///     false,
/// ).unwrap();
///
/// assert_eq!(qr.version().value(), 1);
/// assert_eq!(qr.size(), 21);
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QrCode {
    version: Version,
    /// The width and height in modules, `version * 4 + 17`.
    size: i32,
    error_level: ErrorLevel,
    mask: Mask,
    /// Row-major module colors, `true` is dark.
    modules: Vec<bool>,
    /// Row-major flags for function pattern modules.
    reserved: Vec<bool>,
}

impl QrCode {
    /// Encodes a text string into a QR code.
    ///
    /// The text must be non-empty ASCII. The smallest version within
    /// `minversion..=maxversion` that holds the data is chosen. If `boostecl`
    /// is `true` the error correction level may be raised when that does not
    /// increase the version. `mask` can be `None` for automatic selection.
    pub fn encode_text(
        text: &str,
        ecl: ErrorLevel,
        mode: EncodeMode,
        case_sensitive: bool,
        minversion: Version,
        maxversion: Version,
        mask: Option<Mask>,
        boostecl: bool,
    ) -> Result<QrCode> {
        check_version_range(minversion, maxversion)?;
        let text = prepare_text(text, case_sensitive)?;

        // The cheapest segmentation depends on the character count widths,
        // which change at versions 10 and 27
        let mut version = minversion;
        loop {
            let class_end = match version.value() {
                1..=9 => 9,
                10..=26 => 26,
                _ => 40,
            };
            let upper = Version::new(class_end.min(maxversion.value()));
            let segs = make_segments(&text, mode, version);
            match QrCode::encode_segments_to_codewords(&segs, ecl, version, upper, boostecl) {
                Ok((datacodewords, ecl, version)) => {
                    return QrCode::encode_codewords(&datacodewords, ecl, version, mask);
                }
                Err(e) => match upper.next() {
                    Some(next) if upper < maxversion => version = next,
                    _ => return Err(e),
                },
            }
        }
    }

    /// Encodes arbitrary binary data into a QR code in byte mode.
    pub fn encode_binary(
        data: &[u8],
        ecl: ErrorLevel,
        minversion: Version,
        maxversion: Version,
        mask: Option<Mask>,
        boostecl: bool,
    ) -> Result<QrCode> {
        if data.is_empty() {
            return Err(Error::EmptyPayload);
        }
        let segs = [QrSegment::make_bytes(data)];
        QrCode::encode_segments(&segs, ecl, minversion, maxversion, mask, boostecl)
    }

    /// Encodes already built segments into a QR code.
    pub fn encode_segments(
        segs: &[QrSegment],
        ecl: ErrorLevel,
        minversion: Version,
        maxversion: Version,
        mask: Option<Mask>,
        boostecl: bool,
    ) -> Result<QrCode> {
        let (datacodewords, ecl, version) =
            QrCode::encode_segments_to_codewords(segs, ecl, minversion, maxversion, boostecl)?;
        QrCode::encode_codewords(&datacodewords, ecl, version, mask)
    }

    /// Packs the given segments into the data codewords of the smallest
    /// version in range that holds them.
    ///
    /// Returns the data codewords together with the (possibly boosted) error
    /// correction level and the chosen version.
    pub fn encode_segments_to_codewords(
        segs: &[QrSegment],
        mut ecl: ErrorLevel,
        minversion: Version,
        maxversion: Version,
        boostecl: bool,
    ) -> Result<(Vec<u8>, ErrorLevel, Version)> {
        check_version_range(minversion, maxversion)?;

        // Find the minimal version number to use
        let mut version: Version = minversion;
        let datausedbits: usize = loop {
            let datacapacitybits: usize = version.data_capacity_bits(ecl);
            let dataused: Option<usize> = QrSegment::get_total_bits(segs, version);
            match dataused {
                Some(n) if n <= datacapacitybits => break n,
                _ if version >= maxversion => {
                    return Err(match dataused {
                        None => Error::SegmentTooLong,
                        Some(n) => Error::DataTooLong {
                            used_bits: n,
                            capacity_bits: datacapacitybits,
                        },
                    });
                }
                _ => version = Version::new(version.value() + 1),
            }
        };

        // Increase the error correction level while the data still fits
        for newecl in ErrorLevel::ALL {
            if boostecl && newecl > ecl && datausedbits <= version.data_capacity_bits(newecl) {
                ecl = newecl;
            }
        }

        // Concatenate all segments to create the data bit string
        let datacapacitybits: usize = version.data_capacity_bits(ecl);
        let mut bb = BitBuffer::with_capacity(datacapacitybits);
        for seg in segs {
            bb.append_bits(seg.mode().mode_bits(), 4);
            bb.append_bits(seg.num_chars() as u32, seg.mode().num_char_count_bits(version));
            bb.append_buffer(seg.data());
        }
        debug_assert_eq!(bb.len(), datausedbits);

        // Add terminator and pad up to a byte if applicable
        let numzerobits: usize = core::cmp::min(4, datacapacitybits - bb.len());
        bb.append_bits(0, numzerobits as u8);
        let numzerobits: usize = bb.len().wrapping_neg() & 7;
        bb.append_bits(0, numzerobits as u8);
        debug_assert_eq!(bb.len() % 8, 0);

        // Pad with alternating bytes until data capacity is reached
        for &padbyte in [0xec, 0x11].iter().cycle() {
            if bb.len() >= datacapacitybits {
                break;
            }
            bb.append_bits(padbyte, 8);
        }

        debug!(
            "version {} at level {} uses {} of {} data bits in {} segments",
            version,
            ecl,
            datausedbits,
            datacapacitybits,
            segs.len()
        );
        Ok((bb.into_bytes(), ecl, version))
    }

    /// Creates a QR Code with the given version number, error correction
    /// level, data codeword bytes and mask number.
    ///
    /// This is a low-level API; most callers want [`QrCode::encode_text`].
    pub fn encode_codewords(
        datacodewords: &[u8],
        ecl: ErrorLevel,
        version: Version,
        msk: Option<Mask>,
    ) -> Result<QrCode> {
        let size = version.size();
        let area = (size * size) as usize;
        let mut result = QrCode {
            version,
            size,
            error_level: ecl,
            mask: Mask::new(0),
            modules: vec![false; area],
            reserved: vec![false; area],
        };

        result.draw_function_patterns();
        let allcodewords = QrCode::add_ecc_and_interleave(datacodewords, version, ecl)?;
        result.draw_codewords(&allcodewords)?;

        let msk = match msk {
            Some(m) => m,
            None => result.select_mask(),
        };
        result.apply_mask(msk);
        result.draw_format_bits(msk);
        result.mask = msk;
        Ok(result)
    }

    /// Returns this QR Code's version, in the range [1, 40].
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns this QR Code's size, in the range [21, 177].
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Returns this QR Code's error correction level.
    pub fn error_level(&self) -> ErrorLevel {
        self.error_level
    }

    /// Returns this QR Code's mask, in the range [0, 7].
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Returns the color of the module at the given coordinates.
    ///
    /// Returns `true` for dark modules and `false` for light modules. Coordinates outside the QR
    /// code's bounds return `false`.
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.modules[self.index(x, y)]
    }

    /// Whether the module at the given coordinates belongs to a function pattern.
    pub fn is_reserved(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.reserved[self.index(x, y)]
    }

    /// Penalty of the current module layout under the four masking rules.
    pub fn penalty_score(&self) -> i32 {
        self.get_penalty_score()
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        let range = 0..self.size;
        range.contains(&x) && range.contains(&y)
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.size + x) as usize
    }

    fn set_module(&mut self, x: i32, y: i32, isdark: bool) {
        let i = self.index(x, y);
        self.modules[i] = isdark;
    }

    fn set_function_module(&mut self, x: i32, y: i32, isdark: bool) {
        let i = self.index(x, y);
        self.modules[i] = isdark;
        self.reserved[i] = true;
    }

    fn add_ecc_and_interleave(data: &[u8], ver: Version, ecl: ErrorLevel) -> Result<Vec<u8>> {
        if data.len() != ver.num_data_codewords(ecl) {
            return Err(Error::Internal("data codeword count does not match the version"));
        }
        let numblocks: usize = ver.num_error_correction_blocks(ecl);
        let blockecclen: usize = ver.ecc_codewords_per_block(ecl);
        let rawcodewords: usize = ver.num_raw_data_modules() / 8;
        let numshortblocks: usize = numblocks - (rawcodewords % numblocks);
        let shortblockdatalen: usize = rawcodewords / numblocks - blockecclen;

        let mut result = vec![0u8; rawcodewords];
        let rs = ReedSolomonGenerator::new(blockecclen);
        let mut ecc = vec![0u8; blockecclen];
        let mut dat: &[u8] = data;
        for i in 0..numblocks {
            let datlen: usize = shortblockdatalen + usize::from(i >= numshortblocks);
            rs.compute_remainder(&dat[..datlen], &mut ecc);
            // Long blocks carry one extra data codeword, placed after every short block's data
            let mut k: usize = i;
            for (j, &b) in dat[..datlen].iter().enumerate() {
                if j == shortblockdatalen {
                    k -= numshortblocks;
                }
                result[k] = b;
                k += numblocks;
            }
            let mut k: usize = data.len() + i;
            for &b in &ecc {
                result[k] = b;
                k += numblocks;
            }
            dat = &dat[datlen..];
        }
        debug_assert_eq!(dat.len(), 0);
        Ok(result)
    }

    fn draw_function_patterns(&mut self) {
        let size: i32 = self.size;

        // Timing patterns
        for i in 0..size {
            self.set_function_module(6, i, i % 2 == 0);
            self.set_function_module(i, 6, i % 2 == 0);
        }

        // Finder patterns with separators, the bottom right corner has none
        self.draw_finder_pattern(3, 3);
        self.draw_finder_pattern(size - 4, 3);
        self.draw_finder_pattern(3, size - 4);

        // Alignment patterns, skipping the three that would overlap finders
        let alignpatpos: Vec<i32> = self.version.alignment_pattern_positions();
        let numalign: usize = alignpatpos.len();
        for (i, &pos0) in alignpatpos.iter().enumerate() {
            for (j, &pos1) in alignpatpos.iter().enumerate() {
                if (i == 0 && j == 0)
                    || (i == 0 && j == numalign - 1)
                    || (i == numalign - 1 && j == 0)
                {
                    continue;
                }
                self.draw_alignment_pattern(pos0, pos1);
            }
        }

        // Reserve the format areas with placeholder bits; masking rewrites them
        self.draw_format_bits(Mask::new(0));
        self.draw_version();
    }

    fn draw_finder_pattern(&mut self, x: i32, y: i32) {
        for dy in -4i32..=4 {
            for dx in -4i32..=4 {
                let (xx, yy) = (x + dx, y + dy);
                if self.in_bounds(xx, yy) {
                    let dist: i32 = dx.abs().max(dy.abs());
                    self.set_function_module(xx, yy, dist != 2 && dist != 4);
                }
            }
        }
    }

    fn draw_alignment_pattern(&mut self, x: i32, y: i32) {
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                self.set_function_module(x + dx, y + dy, dx.abs().max(dy.abs()) != 1);
            }
        }
    }

    fn draw_version(&mut self) {
        let ver = u32::from(self.version.value());
        if ver < 7 {
            return;
        }
        let bits: u32 = {
            let mut rem: u32 = ver;
            for _ in 0..12 {
                rem = (rem << 1) ^ ((rem >> 11) * 0x1f25);
            }
            (ver << 12) | rem
        };
        let size = self.size;
        for i in 0u8..18 {
            let bit: bool = get_bit(bits, i);
            let a: i32 = size - 11 + i32::from(i % 3);
            let b: i32 = i32::from(i / 3);
            self.set_function_module(a, b, bit);
            self.set_function_module(b, a, bit);
        }
    }

    fn draw_format_bits(&mut self, mask: Mask) {
        let bits: u32 = format_bits(self.error_level, mask);

        // First copy, around the top left finder
        for i in 0..6 {
            self.set_function_module(8, i, get_bit(bits, i as u8));
        }
        self.set_function_module(8, 7, get_bit(bits, 6));
        self.set_function_module(8, 8, get_bit(bits, 7));
        self.set_function_module(7, 8, get_bit(bits, 8));
        for i in 9..15 {
            self.set_function_module(14 - i, 8, get_bit(bits, i as u8));
        }

        // Second copy, split between the other two finders
        let size: i32 = self.size;
        for i in 0..8 {
            self.set_function_module(size - 1 - i, 8, get_bit(bits, i as u8));
        }
        for i in 8..15 {
            self.set_function_module(8, size - 15 + i, get_bit(bits, i as u8));
        }
        // Always dark
        self.set_function_module(8, size - 8, true);
    }

    fn draw_codewords(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.version.num_raw_data_modules() / 8 {
            return Err(Error::Internal("codeword count does not fill the symbol"));
        }
        let size: i32 = self.size;
        let total: usize = data.len() * 8;
        let mut i: usize = 0;
        // Column pairs from the right edge, skipping the vertical timing pattern
        let mut right: i32 = size - 1;
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            for vert in 0..size {
                for j in 0..2 {
                    let x: i32 = right - j;
                    let upward: bool = ((right + 1) & 2) == 0;
                    let y: i32 = if upward { size - 1 - vert } else { vert };
                    if !self.is_reserved(x, y) && i < total {
                        self.set_module(x, y, get_bit(data[i >> 3].into(), 7 - ((i as u8) & 7)));
                        i += 1;
                    }
                    // Remainder bits stay light
                }
            }
            right -= 2;
        }
        if i != total {
            return Err(Error::Internal("codewords do not fit the data modules"));
        }
        Ok(())
    }

    /// XORs the mask over every non-function module. Applying it twice undoes it.
    fn apply_mask(&mut self, mask: Mask) {
        for y in 0..self.size {
            for x in 0..self.size {
                let i = self.index(x, y);
                if !self.reserved[i] {
                    self.modules[i] ^= mask.inverts(x, y);
                }
            }
        }
    }

    fn select_mask(&mut self) -> Mask {
        let mut best: Mask = Mask::new(0);
        let mut minpenalty = i32::MAX;
        for i in 0u8..8 {
            let candidate = Mask::new(i);
            self.apply_mask(candidate);
            self.draw_format_bits(candidate);
            let penalty: i32 = self.get_penalty_score();
            trace!("mask {} penalty {}", i, penalty);
            if penalty < minpenalty {
                best = candidate;
                minpenalty = penalty;
            }
            self.apply_mask(candidate); // Undoes the mask due to XOR
        }
        debug!("selected mask {} with penalty {}", best.value(), minpenalty);
        best
    }

    fn get_penalty_score(&self) -> i32 {
        let mut result: i32 = 0;
        let size: i32 = self.size;

        // Adjacent modules in row having same color, and finder-like patterns
        for y in 0..size {
            let mut runcolor = false;
            let mut runx: i32 = 0;
            let mut runhistory = FinderPenalty::new(size);
            for x in 0..size {
                if self.get_module(x, y) == runcolor {
                    runx += 1;
                    if runx == 5 {
                        result += PENALTY_N1;
                    } else if runx > 5 {
                        result += 1;
                    }
                } else {
                    runhistory.add_history(runx);
                    if !runcolor {
                        result += runhistory.count_patterns() * PENALTY_N3;
                    }
                    runcolor = self.get_module(x, y);
                    runx = 1;
                }
            }
            result += runhistory.terminate_and_count(runcolor, runx) * PENALTY_N3;
        }
        // Adjacent modules in column having same color, and finder-like patterns
        for x in 0..size {
            let mut runcolor = false;
            let mut runy: i32 = 0;
            let mut runhistory = FinderPenalty::new(size);
            for y in 0..size {
                if self.get_module(x, y) == runcolor {
                    runy += 1;
                    if runy == 5 {
                        result += PENALTY_N1;
                    } else if runy > 5 {
                        result += 1;
                    }
                } else {
                    runhistory.add_history(runy);
                    if !runcolor {
                        result += runhistory.count_patterns() * PENALTY_N3;
                    }
                    runcolor = self.get_module(x, y);
                    runy = 1;
                }
            }
            result += runhistory.terminate_and_count(runcolor, runy) * PENALTY_N3;
        }
        // 2*2 blocks of modules having same color
        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let color: bool = self.get_module(x, y);
                if color == self.get_module(x + 1, y)
                    && color == self.get_module(x, y + 1)
                    && color == self.get_module(x + 1, y + 1)
                {
                    result += PENALTY_N2;
                }
            }
        }
        // Balance of dark and light modules
        let dark = self.modules.iter().filter(|&&m| m).count() as i32;
        let total = size * size;
        // Smallest k such that (45-5k)% <= dark/total <= (55+5k)%
        let k: i32 = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        result += k * PENALTY_N4;
        result
    }
}

/// The 15-bit format word: level and mask protected by a BCH(15,5) code.
pub(crate) fn format_bits(ecl: ErrorLevel, mask: Mask) -> u32 {
    let data = u32::from((ecl.format_bits() << 3) | mask.value());
    let mut rem: u32 = data;
    for _ in 0..10 {
        rem = (rem << 1) ^ ((rem >> 9) * 0x537);
    }
    ((data << 10) | rem) ^ 0x5412
}

fn check_version_range(minversion: Version, maxversion: Version) -> Result<()> {
    if minversion > maxversion {
        return Err(Error::InvalidVersionRange {
            min: minversion.value(),
            max: maxversion.value(),
        });
    }
    Ok(())
}

/// Tracks the last seven run lengths of a row or column to spot 1:1:3:1:1 patterns.
struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    pub fn new(size: i32) -> Self {
        Self {
            qr_size: size,
            run_history: [0; 7],
        }
    }

    pub fn add_history(&mut self, mut currentrunlength: i32) {
        if self.run_history[0] == 0 {
            currentrunlength += self.qr_size; // Add light border to initial run
        }
        let len: usize = self.run_history.len();
        self.run_history.copy_within(0..len - 1, 1);
        self.run_history[0] = currentrunlength;
    }

    /// Counts a 1:1:3:1:1 run at most once, when the light run on either side
    /// is at least four modules wide. Both sides qualifying still count as one.
    pub fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        debug_assert!(n <= self.qr_size * 3);
        i32::from(
            n > 0
                && rh[2] == n
                && rh[3] == n * 3
                && rh[4] == n
                && rh[5] == n
                && (rh[0] >= n * 4 || rh[6] >= n * 4),
        )
    }

    pub fn terminate_and_count(mut self, currentruncolor: bool, mut currentrunlength: i32) -> i32 {
        if currentruncolor {
            self.add_history(currentrunlength);
            currentrunlength = 0;
        }
        currentrunlength += self.qr_size; // Add light border to final run
        self.add_history(currentrunlength);
        self.count_patterns()
    }
}

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

fn get_bit(x: u32, i: u8) -> bool {
    ((x >> i) & 1) != 0
}

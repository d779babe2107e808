//! Symbol versions, error correction levels, masks and the fixed capacity tables.

use std::fmt;
use std::str::FromStr;

/// Error correction level for a QR code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub enum ErrorLevel {
    /// Tolerates ~7% erroneous codewords (QR level L).
    Low,
    /// Tolerates ~15% erroneous codewords (QR level M).
    #[default]
    Medium,
    /// Tolerates ~25% erroneous codewords (QR level Q).
    High,
    /// Tolerates ~30% erroneous codewords (QR level H).
    Max,
}

impl ErrorLevel {
    pub const ALL: [ErrorLevel; 4] =
        [ErrorLevel::Low, ErrorLevel::Medium, ErrorLevel::High, ErrorLevel::Max];

    /// Returns an unsigned 2-bit integer (in the range 0 to 3).
    pub(crate) fn ordinal(self) -> usize {
        use ErrorLevel::*;
        match self {
            Low => 0,
            Medium => 1,
            High => 2,
            Max => 3,
        }
    }

    /// Returns the 2-bit value written into the format information.
    pub fn format_bits(self) -> u8 {
        use ErrorLevel::*;
        match self {
            Low => 1,
            Medium => 0,
            High => 3,
            Max => 2,
        }
    }

    pub fn from_format_bits(bits: u8) -> Option<Self> {
        use ErrorLevel::*;
        match bits {
            1 => Some(Low),
            0 => Some(Medium),
            3 => Some(High),
            2 => Some(Max),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorLevel::Low => "low",
            ErrorLevel::Medium => "medium",
            ErrorLevel::High => "high",
            ErrorLevel::Max => "max",
        };
        f.write_str(name)
    }
}

impl FromStr for ErrorLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(ErrorLevel::Low),
            "medium" | "middle" | "m" => Ok(ErrorLevel::Medium),
            "high" | "q" => Ok(ErrorLevel::High),
            "max" | "h" => Ok(ErrorLevel::Max),
            other => Err(format!("unknown error correction level '{}'", other)),
        }
    }
}

/// A QR code version (1–40).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version(u8);

impl Version {
    /// The minimum version number supported in the QR Code Model 2 standard.
    pub const MIN: Version = Version(1);

    /// The maximum version number supported in the QR Code Model 2 standard.
    pub const MAX: Version = Version(40);

    /// Creates a version object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [1, 40].
    pub const fn new(ver: u8) -> Self {
        assert!(
            Version::MIN.value() <= ver && ver <= Version::MAX.value(),
            "Version number out of range"
        );
        Self(ver)
    }

    /// Like [`Version::new`], but returns `None` instead of panicking.
    pub const fn checked(ver: u8) -> Option<Self> {
        if Version::MIN.value() <= ver && ver <= Version::MAX.value() {
            Some(Self(ver))
        } else {
            None
        }
    }

    /// Returns the value, which is in the range [1, 40].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Width and height of the symbol in modules, `4 * version + 17`.
    pub const fn size(self) -> i32 {
        (self.0 as i32) * 4 + 17
    }

    pub(crate) fn next(self) -> Option<Self> {
        Version::checked(self.0 + 1)
    }

    /// Number of modules left for data and error correction codewords once
    /// every function pattern is drawn. Includes remainder bits.
    pub fn num_raw_data_modules(self) -> usize {
        let ver = usize::from(self.0);
        let mut result: usize = (16 * ver + 128) * ver + 64;
        if ver >= 2 {
            let numalign: usize = ver / 7 + 2;
            result -= (25 * numalign - 10) * numalign - 55;
            if ver >= 7 {
                result -= 36;
            }
        }
        result
    }

    /// Number of 8-bit data codewords this version holds at the given level.
    pub fn num_data_codewords(self, level: ErrorLevel) -> usize {
        self.num_raw_data_modules() / 8
            - self.ecc_codewords_per_block(level) * self.num_error_correction_blocks(level)
    }

    pub fn data_capacity_bits(self, level: ErrorLevel) -> usize {
        self.num_data_codewords(level) * 8
    }

    pub fn ecc_codewords_per_block(self, level: ErrorLevel) -> usize {
        table_get(&ECC_CODEWORDS_PER_BLOCK, self, level)
    }

    pub fn num_error_correction_blocks(self, level: ErrorLevel) -> usize {
        table_get(&NUM_ERROR_CORRECTION_BLOCKS, self, level)
    }

    /// Centre coordinates of the alignment patterns along one axis,
    /// in ascending order. Empty for version 1.
    pub fn alignment_pattern_positions(self) -> Vec<i32> {
        let ver = i32::from(self.0);
        if ver == 1 {
            return Vec::new();
        }
        let numalign = ver / 7 + 2;
        let step = if ver == 32 {
            26
        } else {
            ((ver * 4 + numalign * 2 + 1) / (numalign * 2 - 2)) * 2
        };
        let mut result: Vec<i32> = (0..numalign - 1).map(|i| self.size() - 7 - i * step).collect();
        result.push(6);
        result.reverse();
        result
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Mask(u8);

impl Mask {
    /// Creates a mask object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    pub const fn checked(mask: u8) -> Option<Self> {
        if mask <= 7 {
            Some(Self(mask))
        } else {
            None
        }
    }

    /// Returns the value, which is in the range [0, 7].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether the module at (x, y) is flipped by this mask.
    pub fn inverts(self, x: i32, y: i32) -> bool {
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
}

fn table_get(table: &'static [[i8; 41]; 4], ver: Version, level: ErrorLevel) -> usize {
    table[level.ordinal()][usize::from(ver.value())] as usize
}

static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30,
        30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30,
        30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Max
];

static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // High
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // Max
];

//! Data segments and the bit stream they are packed into.
//!
//! A payload is split into numeric, alphanumeric and byte segments. In
//! [`EncodeMode::Auto`] the split is the one with the fewest bits for the
//! version being tried; [`EncodeMode::Byte`] forces a single byte segment.
use std::borrow::Cow;

use log::debug;

use crate::error::{Error, Result};
use crate::version::Version;

static ALPHANUMERIC_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// How the payload is mapped onto segment modes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum EncodeMode {
    /// Pick numeric, alphanumeric or byte mode per run of characters.
    #[default]
    Auto,
    /// Encode everything as 8-bit bytes.
    Byte,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SegmentMode {
    Numeric,
    Alphanumeric,
    Byte,
}

impl SegmentMode {
    /// The 4-bit mode indicator.
    pub fn mode_bits(self) -> u32 {
        use SegmentMode::*;
        match self {
            Numeric => 0x1,
            Alphanumeric => 0x2,
            Byte => 0x4,
        }
    }

    /// Width of the character count field for the given version.
    pub fn num_char_count_bits(self, ver: Version) -> u8 {
        use SegmentMode::*;
        (match self {
            Numeric => [10, 12, 14],
            Alphanumeric => [9, 11, 13],
            Byte => [8, 16, 16],
        })[usize::from((ver.value() + 7) / 17)]
    }
}

/// Validates and case-folds text before it is split into segments.
///
/// Text must be non-empty ASCII. With `case_sensitive == false` lower-case
/// letters are upper-cased so they fit alphanumeric mode.
pub fn prepare_text(text: &str, case_sensitive: bool) -> Result<Cow<'_, str>> {
    if text.is_empty() {
        return Err(Error::EmptyPayload);
    }
    if !text.is_ascii() {
        return Err(Error::UnencodableText);
    }
    if case_sensitive || !text.bytes().any(|b| b.is_ascii_lowercase()) {
        Ok(Cow::Borrowed(text))
    } else {
        Ok(Cow::Owned(text.to_ascii_uppercase()))
    }
}

/// A run of payload characters sharing one mode, already packed into bits.
#[derive(Clone, Debug)]
pub struct QrSegment {
    mode: SegmentMode,
    numchars: usize,
    data: BitBuffer,
}

impl QrSegment {
    /// Creates a segment for binary data in byte mode.
    pub fn make_bytes(data: &[u8]) -> Self {
        let mut bb = BitBuffer::with_capacity(data.len() * 8);
        for &b in data {
            bb.append_bits(b.into(), 8);
        }
        QrSegment::new(SegmentMode::Byte, data.len(), bb)
    }

    /// Creates a segment for a string of decimal digits in numeric mode.
    ///
    /// # Panics
    ///
    /// Panics if `text` contains non-digit characters.
    pub fn make_numeric(text: &str) -> Self {
        let mut bb = BitBuffer::with_capacity(text.len() * 10 / 3 + 4);
        let mut accumdata: u32 = 0;
        let mut accumcount: u8 = 0;
        for b in text.bytes() {
            assert!(b.is_ascii_digit(), "String contains non-numeric characters");
            accumdata = accumdata * 10 + u32::from(b - b'0');
            accumcount += 1;
            if accumcount == 3 {
                bb.append_bits(accumdata, 10);
                accumdata = 0;
                accumcount = 0;
            }
        }
        if accumcount > 0 {
            bb.append_bits(accumdata, accumcount * 3 + 1);
        }
        QrSegment::new(SegmentMode::Numeric, text.len(), bb)
    }

    /// Creates a segment for alphanumeric text.
    ///
    /// Allowed characters: 0–9, A–Z (uppercase), space, `$`, `%`, `*`, `+`, `-`, `.`, `/`, `:`.
    ///
    /// # Panics
    ///
    /// Panics if `text` contains invalid characters.
    pub fn make_alphanumeric(text: &str) -> Self {
        let mut bb = BitBuffer::with_capacity(text.len() * 11 / 2 + 6);
        let mut accumdata: u32 = 0;
        let mut accumcount: u8 = 0;
        for c in text.chars() {
            let i = ALPHANUMERIC_CHARSET
                .find(c)
                .expect("String contains unencodable characters in alphanumeric mode");
            accumdata = accumdata * 45 + i as u32;
            accumcount += 1;
            if accumcount == 2 {
                bb.append_bits(accumdata, 11);
                accumdata = 0;
                accumcount = 0;
            }
        }
        if accumcount > 0 {
            bb.append_bits(accumdata, 6);
        }
        QrSegment::new(SegmentMode::Alphanumeric, text.len(), bb)
    }

    fn new(mode: SegmentMode, numchars: usize, data: BitBuffer) -> Self {
        Self { mode, numchars, data }
    }

    pub fn mode(&self) -> SegmentMode {
        self.mode
    }

    pub fn num_chars(&self) -> usize {
        self.numchars
    }

    pub fn data(&self) -> &BitBuffer {
        &self.data
    }

    /// Total bits needed by `segs` at `version`, headers included.
    ///
    /// Returns `None` if a segment has more characters than its count field allows.
    pub fn get_total_bits(segs: &[Self], version: Version) -> Option<usize> {
        let mut result: usize = 0;
        for seg in segs {
            let ccbits: u8 = seg.mode.num_char_count_bits(version);
            if seg.numchars >= 1usize << ccbits {
                return None;
            }
            result = result.checked_add(4 + usize::from(ccbits))?;
            result = result.checked_add(seg.data.len())?;
        }
        Some(result)
    }

    pub fn is_numeric(text: &str) -> bool {
        text.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn is_alphanumeric(text: &str) -> bool {
        text.chars().all(|c| ALPHANUMERIC_CHARSET.contains(c))
    }
}

/// Splits prepared ASCII text into segments for the version class of `version`.
///
/// The character count field width changes at versions 10 and 27, so the
/// cheapest split differs between the three classes.
pub fn make_segments(text: &str, mode: EncodeMode, version: Version) -> Vec<QrSegment> {
    if mode == EncodeMode::Byte {
        return vec![QrSegment::make_bytes(text.as_bytes())];
    }
    if QrSegment::is_numeric(text) {
        return vec![QrSegment::make_numeric(text)];
    }

    let modes = compute_character_modes(text.as_bytes(), version);
    let mut result = Vec::new();
    let mut start = 0;
    for i in 1..=modes.len() {
        if i == modes.len() || modes[i] != modes[start] {
            let run = &text[start..i];
            result.push(match modes[start] {
                SegmentMode::Numeric => QrSegment::make_numeric(run),
                SegmentMode::Alphanumeric => QrSegment::make_alphanumeric(run),
                SegmentMode::Byte => QrSegment::make_bytes(run.as_bytes()),
            });
            start = i;
        }
    }
    debug!(
        "split {} chars into {} segments for version class of {}",
        text.len(),
        result.len(),
        version
    );
    result
}

/// Chooses a mode for every character so the total bit length is minimal.
///
/// Costs are tracked in sixths of a bit so numeric (10/3) and alphanumeric
/// (11/2) characters stay integral.
fn compute_character_modes(text: &[u8], version: Version) -> Vec<SegmentMode> {
    use SegmentMode::*;
    const MODES: [SegmentMode; 3] = [Byte, Alphanumeric, Numeric];

    let head_costs: [usize; 3] = MODES.map(|m| (4 + usize::from(m.num_char_count_bits(version))) * 6);
    // char_modes[i][j]: mode of character i when the state after it is MODES[j]
    let mut char_modes: Vec<[Option<SegmentMode>; 3]> = Vec::with_capacity(text.len());
    let mut prev_costs = head_costs;

    for &c in text {
        let mut cur_costs = [0usize; 3];
        let mut cur_modes: [Option<SegmentMode>; 3] = [None; 3];

        cur_costs[0] = prev_costs[0] + 8 * 6;
        cur_modes[0] = Some(Byte);
        if ALPHANUMERIC_CHARSET.as_bytes().contains(&c) {
            cur_costs[1] = prev_costs[1] + 33;
            cur_modes[1] = Some(Alphanumeric);
        }
        if c.is_ascii_digit() {
            cur_costs[2] = prev_costs[2] + 20;
            cur_modes[2] = Some(Numeric);
        }

        // Close the current segment and open a new one in another mode
        for j in 0..MODES.len() {
            for k in 0..MODES.len() {
                let new_cost = (cur_costs[k] + 5) / 6 * 6 + head_costs[j];
                if cur_modes[k].is_some() && (cur_modes[j].is_none() || new_cost < cur_costs[j]) {
                    cur_costs[j] = new_cost;
                    cur_modes[j] = Some(MODES[k]);
                }
            }
        }

        char_modes.push(cur_modes);
        prev_costs = cur_costs;
    }

    let mut state: Option<SegmentMode> = None;
    let mut min_cost = 0;
    if let Some(last) = char_modes.last() {
        for (j, &mode) in MODES.iter().enumerate() {
            if last[j].is_some() && (state.is_none() || prev_costs[j] < min_cost) {
                min_cost = prev_costs[j];
                state = Some(mode);
            }
        }
    }

    // Trace back from the cheapest final state
    let mut result = vec![Byte; text.len()];
    for i in (0..char_modes.len()).rev() {
        let j = MODES.iter().position(|&m| Some(m) == state).unwrap_or(0);
        state = char_modes[i][j];
        result[i] = state.unwrap_or(Byte);
    }
    result
}

/// An appendable sequence of bits, most significant bit first within each byte.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
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

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Appends the low `len` bits of `val`, most significant first.
    pub fn append_bits(&mut self, val: u32, len: u8) {
        assert!(len <= 31 && (val >> len) == 0);
        for i in (0..len).rev() {
            let shift: u8 = 7 - ((self.length as u8) & 7);
            let bit: u8 = ((val >> i) as u8) & 1;
            if shift == 7 {
                self.data.push(bit << shift);
            } else {
                let last = self.data.len() - 1;
                self.data[last] |= bit << shift;
            }
            self.length += 1;
        }
    }

    pub fn append_buffer(&mut self, other: &BitBuffer) {
        for i in 0..other.len() {
            self.append_bits(u32::from(other.bit(i)), 1);
        }
    }

    pub fn bit(&self, i: usize) -> bool {
        assert!(i < self.length);
        (self.data[i >> 3] >> (7 - (i & 7))) & 1 != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

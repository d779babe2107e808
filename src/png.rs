//! A small PNG encoder for 8-bit grayscale and RGB images.
//!
//! Output is the signature, one IHDR chunk, the zlib stream split into IDAT
//! chunks of at most 8 KiB and an empty IEND chunk. Every chunk carries a
//! CRC-32 over its type and data.

use std::io::Write;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::helper::Bitmap;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Maximum IDAT payload, matching libpng.
const IDAT_CHUNK_SIZE: usize = 8192;

const COMPRESSION_LEVEL: u8 = 9;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColorType {
    Grayscale,
    Rgb,
}

impl ColorType {
    /// The IHDR color type byte.
    pub const fn to_int(self) -> u8 {
        match self {
            ColorType::Grayscale => 0,
            ColorType::Rgb => 2,
        }
    }

    pub const fn num_components(self) -> usize {
        match self {
            ColorType::Grayscale => 1,
            ColorType::Rgb => 3,
        }
    }
}

/// Per-scanline filter types.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FilterType {
    None,
    Sub,
    Up,
    Average,
    Paeth,
}

impl FilterType {
    pub const ALL: [FilterType; 5] =
        [FilterType::None, FilterType::Sub, FilterType::Up, FilterType::Average, FilterType::Paeth];

    pub const fn to_int(self) -> u8 {
        match self {
            FilterType::None => 0,
            FilterType::Sub => 1,
            FilterType::Up => 2,
            FilterType::Average => 3,
            FilterType::Paeth => 4,
        }
    }
}

/// How a filter is picked for each scanline.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum FilterStrategy {
    /// Try every filter and keep the one with the smallest sum of absolute
    /// values, treating bytes as signed.
    #[default]
    Adaptive,
    /// Use the same filter for every row.
    Fixed(FilterType),
}

pub struct PngWriter<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    color: ColorType,
    strategy: FilterStrategy,
}

impl<'a> PngWriter<'a> {
    /// Creates a writer over row-major 8-bit pixel data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRender`] if a dimension is zero or the data
    /// length does not match the dimensions.
    pub fn new(data: &'a [u8], width: u32, height: u32, color: ColorType) -> Result<Self> {
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(Error::InvalidRender("png dimensions out of range"));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(color.num_components()))
            .ok_or(Error::InvalidRender("png dimensions overflow"))?;
        if data.len() != expected {
            return Err(Error::InvalidRender("pixel data does not match png dimensions"));
        }
        Ok(PngWriter {
            data,
            width,
            height,
            color,
            strategy: FilterStrategy::default(),
        })
    }

    pub fn from_bitmap(bitmap: &'a Bitmap) -> Result<Self> {
        let color = if bitmap.is_grayscale() {
            ColorType::Grayscale
        } else {
            ColorType::Rgb
        };
        PngWriter::new(bitmap.as_raw(), bitmap.width(), bitmap.height(), color)
    }

    pub fn with_filter(mut self, strategy: FilterStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Encodes the image into a complete PNG byte stream.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let filtered = self.filter_scanlines()?;
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&filtered, COMPRESSION_LEVEL);
        debug!(
            "png {}x{} {:?}: {} filtered bytes deflated to {}",
            self.width,
            self.height,
            self.color,
            filtered.len(),
            compressed.len()
        );

        // signature + IHDR + IDAT overhead per chunk + IEND
        let num_idat = (compressed.len() + IDAT_CHUNK_SIZE - 1) / IDAT_CHUNK_SIZE;
        let capacity = PNG_SIGNATURE.len() + 25 + compressed.len() + 12 * num_idat.max(1) + 12;
        let mut out = Vec::new();
        out.try_reserve_exact(capacity).map_err(|_| Error::Memory)?;

        out.extend_from_slice(&PNG_SIGNATURE);
        write_chunk(&mut out, b"IHDR", &self.ihdr());
        for chunk in compressed.chunks(IDAT_CHUNK_SIZE) {
            write_chunk(&mut out, b"IDAT", chunk);
        }
        write_chunk(&mut out, b"IEND", &[]);
        Ok(out)
    }

    /// Encodes the image and writes it to `sink`.
    ///
    /// Nothing is written unless encoding succeeds.
    pub fn write_to<W: Write>(&self, mut sink: W) -> Result<()> {
        let bytes = self.encode()?;
        sink.write_all(&bytes).map_err(Error::Write)?;
        sink.flush().map_err(Error::Write)
    }

    fn ihdr(&self) -> [u8; 13] {
        let mut ihdr = [0u8; 13];
        ihdr[0..4].copy_from_slice(&self.width.to_be_bytes());
        ihdr[4..8].copy_from_slice(&self.height.to_be_bytes());
        ihdr[8] = 8; // bit depth
        ihdr[9] = self.color.to_int();
        // compression, filter method and interlace are all 0
        ihdr
    }

    fn filter_scanlines(&self) -> Result<Vec<u8>> {
        let bpp = self.color.num_components();
        let stride = self.width as usize * bpp;
        let total = (stride + 1)
            .checked_mul(self.height as usize)
            .ok_or(Error::InvalidRender("png dimensions overflow"))?;
        let mut out = Vec::new();
        out.try_reserve_exact(total).map_err(|_| Error::Memory)?;

        let mut candidate = vec![0u8; stride];
        let mut best = vec![0u8; stride];
        let mut previous: &[u8] = &[];
        for (y, row) in self.data.chunks_exact(stride).enumerate() {
            let filter = match self.strategy {
                FilterStrategy::Fixed(filter) => {
                    filter_row(filter, row, previous, bpp, &mut best);
                    filter
                }
                FilterStrategy::Adaptive => {
                    let mut chosen = FilterType::None;
                    let mut min_sum = u64::MAX;
                    for filter in FilterType::ALL {
                        filter_row(filter, row, previous, bpp, &mut candidate);
                        let sum = signed_abs_sum(&candidate);
                        if sum < min_sum {
                            min_sum = sum;
                            chosen = filter;
                            std::mem::swap(&mut best, &mut candidate);
                        }
                    }
                    chosen
                }
            };
            trace!("row {} uses filter {:?}", y, filter);
            out.push(filter.to_int());
            out.extend_from_slice(&best);
            previous = row;
        }
        Ok(out)
    }
}

/// Applies `filter` to `row`. An empty `previous` stands for the all-zero
/// row above the image.
pub fn filter_row(filter: FilterType, row: &[u8], previous: &[u8], bpp: usize, out: &mut [u8]) {
    let up = |i: usize| previous.get(i).copied().unwrap_or(0);
    let left = |i: usize| if i >= bpp { row[i - bpp] } else { 0 };
    let upper_left = |i: usize| if i >= bpp { up(i - bpp) } else { 0 };

    for (i, (dst, &x)) in out.iter_mut().zip(row).enumerate() {
        *dst = match filter {
            FilterType::None => x,
            FilterType::Sub => x.wrapping_sub(left(i)),
            FilterType::Up => x.wrapping_sub(up(i)),
            FilterType::Average => {
                // needs 9 bits of precision
                let avg = ((u16::from(left(i)) + u16::from(up(i))) >> 1) as u8;
                x.wrapping_sub(avg)
            }
            FilterType::Paeth => x.wrapping_sub(paeth(left(i), up(i), upper_left(i))),
        };
    }
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (ia, ib, ic) = (i16::from(a), i16::from(b), i16::from(c));
    let p = ia + ib - ic;
    let (pa, pb, pc) = ((p - ia).abs(), (p - ib).abs(), (p - ic).abs());
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn signed_abs_sum(row: &[u8]) -> u64 {
    row.iter().map(|&b| u64::from((b as i8).unsigned_abs())).sum()
}

/// Appends length, type, data and CRC of one chunk.
pub fn write_chunk(out: &mut Vec<u8>, name: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(data);
    // crc is a continuous function, so first crc the chunk name
    // and then crc that with the chunk bytes passing in the previous crc
    let crc = !update_crc(update_crc(u32::MAX, name), data);
    out.extend_from_slice(&crc.to_be_bytes());
}

/// CRC-32 (ISO 3309 polynomial, as used by PNG and zlib) of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    !update_crc(u32::MAX, data)
}

fn update_crc(mut crc: u32, data: &[u8]) -> u32 {
    for &b in data {
        crc = CRC_TABLE[((crc ^ u32::from(b)) & 0xff) as usize] ^ (crc >> 8);
    }
    crc
}

static CRC_TABLE: [u32; 256] = make_crc_table();

const fn make_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

//! QR readers for round-trip tests.
//!
//! [`scan_png`] runs the independent `rqrr` decoder and is the check for
//! payloads. [`decode_png`] is a minimal reader for what this crate writes:
//! axis aligned symbols at a known scale and quiet zone with no damage. It
//! reports the version, level and mask, which `rqrr` does not expose in a
//! form tied to this crate's types.
#![allow(dead_code)]

use qrpng::reed_solomon::compute_ec_codewords;
use qrpng::{ErrorLevel, Mask, Version};

#[derive(Debug)]
pub struct Decoded {
    pub version: Version,
    pub level: ErrorLevel,
    pub mask: Mask,
    pub payload: Vec<u8>,
}

/// Module grid sampled from a PNG, `true` for dark.
pub struct Grid {
    pub size: i32,
    modules: Vec<bool>,
}

impl Grid {
    pub fn from_png(png: &[u8], scale: u32, quiet_zone: u32) -> Result<Grid, String> {
        let img = image::load_from_memory(png).map_err(|e| e.to_string())?.to_rgb8();
        if img.width() != img.height() || img.width() % scale != 0 {
            return Err(format!("unexpected dimensions {:?}", img.dimensions()));
        }
        let side = (img.width() / scale) as i32 - 2 * quiet_zone as i32;
        if side < 21 || (side - 17) % 4 != 0 {
            return Err(format!("{} modules is not a symbol size", side));
        }
        // The quiet zone gives the light color
        let light = *img.get_pixel(0, 0);
        let mut modules = Vec::with_capacity((side * side) as usize);
        for y in 0..side as u32 {
            for x in 0..side as u32 {
                let px = (x + quiet_zone) * scale + scale / 2;
                let py = (y + quiet_zone) * scale + scale / 2;
                modules.push(*img.get_pixel(px, py) != light);
            }
        }
        Ok(Grid { size: side, modules })
    }

    pub fn get(&self, x: i32, y: i32) -> bool {
        self.modules[(y * self.size + x) as usize]
    }

    pub fn version(&self) -> Version {
        Version::new(((self.size - 17) / 4) as u8)
    }
}

/// Magnification applied before `rqrr` sees the image, so one pixel modules
/// still give it room to find the finder patterns.
const SCAN_ZOOM: usize = 3;
const SCAN_PADDING: usize = 8;

/// Decodes the payload of the single symbol in `png` with `rqrr`.
pub fn scan_png(png: &[u8]) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory(png).map_err(|e| e.to_string())?.to_luma8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    let light = img.get_pixel(0, 0).0[0];
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        w * SCAN_ZOOM + 2 * SCAN_PADDING,
        h * SCAN_ZOOM + 2 * SCAN_PADDING,
        |x, y| {
            let (x, y) = (x.wrapping_sub(SCAN_PADDING), y.wrapping_sub(SCAN_PADDING));
            if x < w * SCAN_ZOOM && y < h * SCAN_ZOOM {
                img.get_pixel((x / SCAN_ZOOM) as u32, (y / SCAN_ZOOM) as u32).0[0]
            } else {
                light
            }
        },
    );
    let grids = prepared.detect_grids();
    if grids.len() != 1 {
        return Err(format!("expected one symbol, found {}", grids.len()));
    }
    let mut payload = Vec::new();
    grids[0].decode_to(&mut payload).map_err(|e| format!("{:?}", e))?;
    Ok(payload)
}

pub fn scan_text(png: &[u8]) -> String {
    let payload = scan_png(png).expect("rqrr cannot decode the symbol");
    String::from_utf8(payload).expect("payload is not utf-8")
}

pub fn decode_png(png: &[u8], scale: u32, quiet_zone: u32) -> Result<Decoded, String> {
    decode_grid(&Grid::from_png(png, scale, quiet_zone)?)
}

pub fn decode_grid(grid: &Grid) -> Result<Decoded, String> {
    let version = grid.version();
    let (level, mask) = read_format(grid)?;
    let reserved = function_map(version);
    let codewords = read_codewords(grid, &reserved, mask, version);
    let data = deinterleave(&codewords, version, level)?;
    let payload = parse_segments(&data, version)?;
    Ok(Decoded { version, level, mask, payload })
}

fn format_word(level: ErrorLevel, mask: Mask) -> u32 {
    let data = (u32::from(level.format_bits()) << 3) | u32::from(mask.value());
    let mut rem = data;
    for _ in 0..10 {
        rem = (rem << 1) ^ ((rem >> 9) * 0x537);
    }
    ((data << 10) | rem) ^ 0x5412
}

fn read_format(grid: &Grid) -> Result<(ErrorLevel, Mask), String> {
    let size = grid.size;
    let mut first = 0u32;
    let mut second = 0u32;
    let set = |word: &mut u32, bit: usize, dark: bool| {
        if dark {
            *word |= 1 << bit;
        }
    };
    for i in 0..6 {
        set(&mut first, i, grid.get(8, i as i32));
    }
    set(&mut first, 6, grid.get(8, 7));
    set(&mut first, 7, grid.get(8, 8));
    set(&mut first, 8, grid.get(7, 8));
    for i in 9..15 {
        set(&mut first, i, grid.get(14 - i as i32, 8));
    }
    for i in 0..8 {
        set(&mut second, i, grid.get(size - 1 - i as i32, 8));
    }
    for i in 8..15 {
        set(&mut second, i, grid.get(8, size - 15 + i as i32));
    }
    if first != second {
        return Err(format!("format copies differ: {:015b} vs {:015b}", first, second));
    }
    for level in ErrorLevel::ALL {
        for m in 0..8 {
            let mask = Mask::new(m);
            if format_word(level, mask) == first {
                return Ok((level, mask));
            }
        }
    }
    Err(format!("no format matches {:015b}", first))
}

fn function_map(version: Version) -> Vec<bool> {
    let size = version.size();
    let mut reserved = vec![false; (size * size) as usize];
    let mut mark = |x: i32, y: i32| reserved[(y * size + x) as usize] = true;
    for y in 0..size {
        for x in 0..size {
            let top_left = x < 9 && y < 9;
            let top_right = x >= size - 8 && y < 9;
            let bottom_left = x < 9 && y >= size - 8;
            if top_left || top_right || bottom_left || x == 6 || y == 6 {
                mark(x, y);
            }
        }
    }
    let positions = version.alignment_pattern_positions();
    let last = positions.len().saturating_sub(1);
    for (i, &cx) in positions.iter().enumerate() {
        for (j, &cy) in positions.iter().enumerate() {
            if (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0) {
                continue;
            }
            for dy in -2..=2 {
                for dx in -2..=2 {
                    mark(cx + dx, cy + dy);
                }
            }
        }
    }
    if version.value() >= 7 {
        for a in 0..6 {
            for b in size - 11..size - 8 {
                mark(a, b);
                mark(b, a);
            }
        }
    }
    reserved
}

fn read_codewords(grid: &Grid, reserved: &[bool], mask: Mask, version: Version) -> Vec<u8> {
    let size = grid.size;
    let count = version.num_raw_data_modules() / 8;
    let mut bytes = vec![0u8; count];
    let mut i = 0usize;
    let mut right = size - 1;
    while right >= 1 {
        if right == 6 {
            right = 5;
        }
        for vert in 0..size {
            for j in 0..2 {
                let x = right - j;
                let upward = ((right + 1) & 2) == 0;
                let y = if upward { size - 1 - vert } else { vert };
                if !reserved[(y * size + x) as usize] && i < count * 8 {
                    if grid.get(x, y) ^ mask.inverts(x, y) {
                        bytes[i >> 3] |= 0x80 >> (i & 7);
                    }
                    i += 1;
                }
            }
        }
        right -= 2;
    }
    bytes
}

fn deinterleave(codewords: &[u8], version: Version, level: ErrorLevel) -> Result<Vec<u8>, String> {
    let numblocks = version.num_error_correction_blocks(level);
    let ecclen = version.ecc_codewords_per_block(level);
    let numshort = numblocks - codewords.len() % numblocks;
    let shortdatalen = codewords.len() / numblocks - ecclen;
    let datalen = version.num_data_codewords(level);

    let mut data = Vec::with_capacity(datalen);
    for b in 0..numblocks {
        let len = shortdatalen + usize::from(b >= numshort);
        let block: Vec<u8> = (0..len)
            .map(|j| {
                let k = b + j * numblocks;
                if j == shortdatalen {
                    codewords[k - numshort]
                } else {
                    codewords[k]
                }
            })
            .collect();
        let ecc: Vec<u8> = (0..ecclen).map(|e| codewords[datalen + b + e * numblocks]).collect();
        if compute_ec_codewords(&block, ecclen) != ecc {
            return Err(format!("block {} fails error correction", b));
        }
        data.extend(block);
    }
    Ok(data)
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl BitReader<'_> {
    fn remaining(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    fn read(&mut self, n: usize) -> Result<u32, String> {
        if n > self.remaining() {
            return Err("bit stream ended early".into());
        }
        let mut v = 0u32;
        for _ in 0..n {
            let bit = (self.data[self.pos >> 3] >> (7 - (self.pos & 7))) & 1;
            v = (v << 1) | u32::from(bit);
            self.pos += 1;
        }
        Ok(v)
    }
}

const ALPHANUMERIC: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

fn parse_segments(data: &[u8], version: Version) -> Result<Vec<u8>, String> {
    let class = match version.value() {
        1..=9 => 0,
        10..=26 => 1,
        _ => 2,
    };
    let mut reader = BitReader { data, pos: 0 };
    let mut out = Vec::new();
    while reader.remaining() >= 4 {
        match reader.read(4)? {
            0 => break,
            1 => {
                let mut count = reader.read([10, 12, 14][class])? as usize;
                while count >= 3 {
                    out.extend(format!("{:03}", reader.read(10)?).bytes());
                    count -= 3;
                }
                match count {
                    2 => out.extend(format!("{:02}", reader.read(7)?).bytes()),
                    1 => out.extend(format!("{}", reader.read(4)?).bytes()),
                    _ => {}
                }
            }
            2 => {
                let mut count = reader.read([9, 11, 13][class])? as usize;
                while count >= 2 {
                    let v = reader.read(11)? as usize;
                    out.push(ALPHANUMERIC[v / 45]);
                    out.push(ALPHANUMERIC[v % 45]);
                    count -= 2;
                }
                if count == 1 {
                    out.push(ALPHANUMERIC[reader.read(6)? as usize]);
                }
            }
            4 => {
                let count = reader.read([8, 16, 16][class])?;
                for _ in 0..count {
                    out.push(reader.read(8)? as u8);
                }
            }
            mode => return Err(format!("unsupported mode {}", mode)),
        }
    }
    Ok(out)
}

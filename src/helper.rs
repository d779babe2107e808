use image::{GrayImage, ImageBuffer, RgbImage};
use log::debug;

use crate::error::{Error, Result};
use crate::qrcode::QrCode;

/*---- Colors ----*/

/// An opaque 8-bit color.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from untrusted integer channels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidColor`] naming the first channel outside 0–255.
    pub fn try_from_components(r: i32, g: i32, b: i32) -> Result<Self> {
        let channel = |name: char, value: i32| {
            u8::try_from(value).map_err(|_| Error::InvalidColor { channel: name, value })
        };
        Ok(Self::new(channel('r', r)?, channel('g', g)?, channel('b', b)?))
    }

    fn is_gray(self) -> bool {
        self.r == self.g && self.g == self.b
    }
}

impl TryFrom<&[i32]> for Rgb {
    type Error = Error;

    /// Exactly three components are required; anything else is rejected.
    fn try_from(components: &[i32]) -> Result<Self> {
        match *components {
            [r, g, b] => Rgb::try_from_components(r, g, b),
            _ => Err(Error::MissingColorComponent(components.len())),
        }
    }
}

/// Colors for dark and light modules. Defaults to black on white.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Colors {
    pub dark: Rgb,
    pub light: Rgb,
}

impl Colors {
    /// Custom dark modules on a white background.
    pub fn with_dark(dark: Rgb) -> Self {
        Self { dark, light: Rgb::WHITE }
    }

    /// Whether both colors are shades of gray, so a grayscale image suffices.
    pub fn is_grayscale(&self) -> bool {
        self.dark.is_gray() && self.light.is_gray()
    }
}

impl Default for Colors {
    fn default() -> Self {
        Self { dark: Rgb::BLACK, light: Rgb::WHITE }
    }
}

/*---- Bitmaps ----*/

/// A rendered symbol, grayscale when the colors allow it.
#[derive(Clone, Debug)]
pub enum Bitmap {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        match self {
            Bitmap::Gray(img) => img.width(),
            Bitmap::Rgb(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Bitmap::Gray(img) => img.height(),
            Bitmap::Rgb(img) => img.height(),
        }
    }

    /// Row-major pixel bytes, one or three per pixel.
    pub fn as_raw(&self) -> &[u8] {
        match self {
            Bitmap::Gray(img) => img.as_raw(),
            Bitmap::Rgb(img) => img.as_raw(),
        }
    }

    pub fn is_grayscale(&self) -> bool {
        matches!(self, Bitmap::Gray(_))
    }
}

/// Largest bitmap side in pixels. A version 40 symbol at scale 150 still fits.
pub const MAX_BITMAP_SIDE: u32 = 1 << 15;

/// Side length in pixels of a rendered symbol.
///
/// # Errors
///
/// Returns [`Error::InvalidRender`] for a zero scale or a side above
/// [`MAX_BITMAP_SIDE`].
pub fn bitmap_side(qr: &QrCode, scale: u32, quiet_zone: u32) -> Result<u32> {
    if scale == 0 {
        return Err(Error::InvalidRender("scale must be at least 1"));
    }
    let side = quiet_zone
        .checked_mul(2)
        .and_then(|border| border.checked_add(qr.size() as u32))
        .and_then(|modules| modules.checked_mul(scale))
        .filter(|&side| side <= MAX_BITMAP_SIDE)
        .ok_or(Error::InvalidRender("bitmap side exceeds the maximum"))?;
    Ok(side)
}

/// Renders `qr` with `scale` pixels per module and `quiet_zone` light modules of border.
///
/// # Errors
///
/// [`Error::InvalidRender`] as for [`bitmap_side`], and [`Error::Memory`] if
/// the pixel buffer cannot be allocated.
pub fn render_bitmap(qr: &QrCode, colors: &Colors, scale: u32, quiet_zone: u32) -> Result<Bitmap> {
    let side = bitmap_side(qr, scale, quiet_zone)?;
    debug!(
        "rendering {}x{} symbol as {}x{} pixels",
        qr.size(),
        qr.size(),
        side,
        side
    );
    let (dark, light) = (colors.dark, colors.light);
    let bitmap = if colors.is_grayscale() {
        let raw = fill_pixels(qr, side, scale, quiet_zone, &[dark.r], &[light.r])?;
        Bitmap::Gray(from_raw(side, raw)?)
    } else {
        let raw = fill_pixels(
            qr,
            side,
            scale,
            quiet_zone,
            &[dark.r, dark.g, dark.b],
            &[light.r, light.g, light.b],
        )?;
        Bitmap::Rgb(from_raw(side, raw)?)
    };
    Ok(bitmap)
}

fn from_raw<P>(side: u32, raw: Vec<u8>) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: image::Pixel<Subpixel = u8>,
{
    ImageBuffer::from_raw(side, side, raw)
        .ok_or(Error::Internal("pixel buffer does not match the bitmap side"))
}

/// Row-major pixel bytes, each row built once per module row and repeated `scale` times.
fn fill_pixels(
    qr: &QrCode,
    side: u32,
    scale: u32,
    quiet_zone: u32,
    dark: &[u8],
    light: &[u8],
) -> Result<Vec<u8>> {
    let row_len = (side as usize)
        .checked_mul(dark.len())
        .ok_or(Error::InvalidRender("bitmap dimensions overflow"))?;
    let total = row_len
        .checked_mul(side as usize)
        .ok_or(Error::InvalidRender("bitmap dimensions overflow"))?;
    let mut raw = Vec::new();
    raw.try_reserve_exact(total).map_err(|_| Error::Memory)?;
    let mut row = Vec::new();
    row.try_reserve_exact(row_len).map_err(|_| Error::Memory)?;

    let border = i64::from(quiet_zone);
    for y in 0..side {
        if y % scale == 0 {
            let qr_y = i64::from(y / scale) - border;
            row.clear();
            for x in 0..side {
                let qr_x = i64::from(x / scale) - border;
                // Quiet zone coordinates fall outside the symbol and read as light
                let is_dark = qr_x >= 0 && qr_y >= 0 && qr.get_module(qr_x as i32, qr_y as i32);
                row.extend_from_slice(if is_dark { dark } else { light });
            }
        }
        raw.extend_from_slice(&row);
    }
    Ok(raw)
}

/*---- Text ----*/

/// Returns the symbol drawn with block characters, two per module, with the
/// given number of border modules. Lines end with `\n`.
pub fn to_text_string(qr: &QrCode, border: i32) -> String {
    assert!(border >= 0, "Border must be non-negative");
    let mut result = String::new();
    for y in -border..qr.size() + border {
        for x in -border..qr.size() + border {
            let c: char = if qr.get_module(x, y) { '█' } else { ' ' };
            result.push(c);
            result.push(c);
        }
        result.push('\n');
    }
    result
}

// Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::EncodeMode;
    use image::{Luma, Rgb as RgbPixel};
    use crate::version::{ErrorLevel, Version};

    fn hello() -> QrCode {
        QrCode::encode_text(
            "Hello, world!",
            ErrorLevel::Low,
            EncodeMode::Auto,
            true,
            Version::MIN,
            Version::MAX,
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_render_gray_bitmap() {
        let qr = hello();
        let bitmap = render_bitmap(&qr, &Colors::default(), 1, 4).unwrap();

        // The QR code for "Hello, world!" with a low error correction level
        // and a border of 4 should be 29x29 pixels.
        assert_eq!((bitmap.width(), bitmap.height()), (29, 29));
        assert!(bitmap.is_grayscale());
        let Bitmap::Gray(img) = bitmap else { unreachable!() };
        assert_eq!(img.get_pixel(0, 0), &Luma([255u8]));
        assert_eq!(img.get_pixel(4, 4), &Luma([0u8]));
    }

    #[test]
    fn test_render_scaled_color_bitmap() {
        let qr = hello();
        let colors = Colors::with_dark(Rgb::new(200, 0, 40));
        let bitmap = render_bitmap(&qr, &colors, 3, 2).unwrap();
        assert_eq!(bitmap.width(), (21 + 4) * 3);
        assert_eq!(bitmap.as_raw().len(), 75 * 75 * 3);
        let Bitmap::Rgb(img) = bitmap else { unreachable!() };
        // Top left finder corner covers a 3x3 pixel block
        for (x, y) in [(6, 6), (8, 8)] {
            assert_eq!(img.get_pixel(x, y), &RgbPixel([200, 0, 40]));
        }
        assert_eq!(img.get_pixel(5, 5), &RgbPixel([255, 255, 255]));
    }

    #[test]
    fn test_render_rejects_zero_scale() {
        let err = render_bitmap(&hello(), &Colors::default(), 0, 4).unwrap_err();
        assert!(matches!(err, Error::InvalidRender(_)));
    }

    #[test]
    fn test_render_rejects_oversized_bitmap() {
        let qr = hello();
        // 29 modules at scale 70000 would need terabytes
        let err = render_bitmap(&qr, &Colors::default(), 70_000, 4).unwrap_err();
        assert!(matches!(err, Error::InvalidRender(_)));
        let err = bitmap_side(&qr, u32::MAX, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidRender(_)));

        let largest = MAX_BITMAP_SIDE / 29;
        assert_eq!(bitmap_side(&qr, largest, 4).unwrap(), largest * 29);
        assert!(bitmap_side(&qr, largest + 1, 4).is_err());
    }

    #[test]
    fn test_scaled_rows_repeat() {
        let qr = hello();
        let Bitmap::Gray(img) = render_bitmap(&qr, &Colors::default(), 4, 1).unwrap() else {
            unreachable!()
        };
        assert_eq!(img.dimensions(), (92, 92));
        for y in 0..92 {
            for x in 0..92 {
                let module = qr.get_module(x as i32 / 4 - 1, y as i32 / 4 - 1);
                let expected = if module { 0 } else { 255 };
                assert_eq!(img.get_pixel(x, y).0[0], expected, "pixel {},{}", x, y);
            }
        }
    }

    #[test]
    fn test_color_validation() {
        assert_eq!(Rgb::try_from_components(255, 0, 10).unwrap(), Rgb::new(255, 0, 10));
        assert!(matches!(
            Rgb::try_from_components(256, 0, 0),
            Err(Error::InvalidColor { channel: 'r', value: 256 })
        ));
        assert!(matches!(
            Rgb::try_from(&[0, -1, 0][..]),
            Err(Error::InvalidColor { channel: 'g', value: -1 })
        ));
        assert!(matches!(Rgb::try_from(&[0, 0][..]), Err(Error::MissingColorComponent(2))));
    }

    #[test]
    fn test_to_text_string() {
        let qr = hello();
        let text = to_text_string(&qr, 1);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 23);
        assert_eq!(lines[0].chars().count(), 46);
        assert!(lines[1].starts_with("  ██"));
    }
}

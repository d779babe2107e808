//! Text in, PNG out.
//!
//! Every stage short-circuits on its first failure. A target file is only
//! created once the PNG has been fully encoded in memory, so a rejected
//! payload or color never leaves a partial file behind.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result, ResultCode};
use crate::helper::{render_bitmap, Colors, Rgb};
use crate::options::{OutputTarget, QrOptions};
use crate::png::PngWriter;
use crate::qrcode::QrCode;
use crate::version::ErrorLevel;

/// What a successful run produced.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Generated {
    /// PNG bytes, for [`OutputTarget::Memory`].
    Bytes(Vec<u8>),
    /// Path of the written file, for [`OutputTarget::File`].
    File(PathBuf),
}

impl Generated {
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Generated::Bytes(bytes) => Some(bytes),
            Generated::File(_) => None,
        }
    }
}

/// Encodes `text` into a symbol without rendering it.
pub fn encode_symbol(text: &str, options: &QrOptions) -> Result<QrCode> {
    let qr = QrCode::encode_text(
        text,
        options.level,
        options.mode,
        options.case_sensitive,
        options.min_version,
        options.max_version,
        options.mask,
        options.boost_level,
    )?;
    debug!(
        "encoded {} chars as version {} level {} mask {}",
        text.len(),
        qr.version(),
        qr.error_level(),
        qr.mask().value()
    );
    Ok(qr)
}

/// Renders `qr` with the colors and geometry in `options` and encodes it as PNG.
pub fn encode_png(qr: &QrCode, options: &QrOptions) -> Result<Vec<u8>> {
    let bitmap = render_bitmap(qr, &options.colors, options.scale, options.quiet_zone)?;
    PngWriter::from_bitmap(&bitmap)?.with_filter(options.filter).encode()
}

/// Encodes `text` as a QR code PNG and delivers it to `options.target`.
///
/// ```
/// use qrpng::{generate, OutputTarget, QrOptions};
///
/// let options = QrOptions::default().with_target(OutputTarget::Memory);
/// let png = generate("HELLO WORLD", &options).unwrap();
/// assert!(png.bytes().unwrap().starts_with(b"\x89PNG"));
/// ```
pub fn generate(text: &str, options: &QrOptions) -> Result<Generated> {
    let qr = encode_symbol(text, options)?;
    deliver(encode_png(&qr, options)?, &options.target)
}

/// Like [`generate`], but encodes raw bytes in byte mode.
pub fn generate_binary(data: &[u8], options: &QrOptions) -> Result<Generated> {
    let qr = QrCode::encode_binary(
        data,
        options.level,
        options.min_version,
        options.max_version,
        options.mask,
        options.boost_level,
    )?;
    debug!("encoded {} bytes as version {}", data.len(), qr.version());
    deliver(encode_png(&qr, options)?, &options.target)
}

/// Writes `text` as a PNG file and reports the outcome as a [`ResultCode`].
///
/// `color_components` sets the dark module color and must hold exactly three
/// channels in 0–255. It is checked before anything else, so an invalid color
/// never creates the file.
pub fn generate_code(
    text: &str,
    level: ErrorLevel,
    output: &Path,
    color_components: Option<&[i32]>,
    case_sensitive: bool,
) -> ResultCode {
    let result = color_components
        .map(Rgb::try_from)
        .transpose()
        .and_then(|dark| {
            let colors = dark.map_or_else(Colors::default, Colors::with_dark);
            let options = QrOptions::default()
                .with_level(level)
                .with_output_file(output)
                .with_colors(colors)
                .with_case_sensitive(case_sensitive);
            generate(text, &options)
        });
    if let Err(e) = &result {
        debug!("generate failed: {}", e);
    }
    ResultCode::from_result(&result)
}

/// Hands finished PNG bytes to `target`.
pub fn deliver(png: Vec<u8>, target: &OutputTarget) -> Result<Generated> {
    match target {
        OutputTarget::Memory => Ok(Generated::Bytes(png)),
        OutputTarget::File(path) => {
            write_file(&png, path)?;
            Ok(Generated::File(path.clone()))
        }
    }
}

fn write_file(png: &[u8], path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|source| Error::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    writer.write_all(png).map_err(Error::Write)?;
    writer.flush().map_err(Error::Write)?;
    info!("wrote {} bytes to {}", png.len(), path.display());
    Ok(())
}

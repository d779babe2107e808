//! # qrpng
//!
//! A self-contained QR code encoder that writes PNG images.
//!
//! `qrpng` encodes ASCII text or raw bytes into QR Code Model 2 symbols
//! (versions 1 to 40, four error correction levels) and writes them as
//! grayscale or RGB PNG files without an external image encoder.
//!
//! ## Features
//!
//! - Numeric, alphanumeric and byte segments with an optimal mixed split.
//! - Reed-Solomon error correction and automatic mask selection.
//! - Scalable output with a configurable quiet zone and module colors.
//! - A PNG writer with adaptive scanline filters and zlib compression.
//! - Stable numeric result codes for callers across a language boundary.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Example
//!
//! Write `qr.png` in the working directory:
//!
//! ```no_run
//! use qrpng::{generate, QrOptions};
//!
//! fn main() -> qrpng::Result<()> {
//!     generate("https://example.com", &QrOptions::default())?;
//!     Ok(())
//! }
//! ```
//!
//! Keep the PNG in memory with a custom color:
//!
//! ```rust
//! use qrpng::{generate, ErrorLevel, OutputTarget, QrOptions, Rgb};
//!
//! let options = QrOptions::default()
//!     .with_level(ErrorLevel::High)
//!     .with_dark_color(Rgb::new(255, 165, 0))
//!     .with_scale(4)
//!     .with_target(OutputTarget::Memory);
//! let png = generate("Hello, World!", &options).unwrap();
//! assert!(png.bytes().is_some());
//! ```
//!
//! ## Modules
//!
//! - [`qrcode`]: Core QR code encoding functionality.
//! - [`segment`]: Segments and the data bit stream.
//! - [`reed_solomon`]: Error correction codewords.
//! - [`version`]: Versions, levels, masks and capacity tables.
//! - [`helper`]: Colors, bitmap rendering and text output.
//! - [`png`]: The PNG encoder.
//! - [`pipeline`]: The text to PNG facade.
#![forbid(unsafe_code)]

pub mod error;
pub mod helper;
pub mod options;
pub mod pipeline;
pub mod png;
pub mod qrcode;
pub mod reed_solomon;
pub mod segment;
pub mod version;

pub use error::{Error, ErrorKind, Result, ResultCode};
pub use helper::{Colors, Rgb};
pub use options::{OutputTarget, QrOptions};
pub use pipeline::{encode_png, encode_symbol, generate, generate_binary, generate_code, Generated};
pub use png::{FilterStrategy, FilterType};
pub use qrcode::QrCode;
pub use segment::EncodeMode;
pub use version::{ErrorLevel, Mask, Version};

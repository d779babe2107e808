//! Error types shared by every stage of the pipeline.
//!
//! Internally each stage returns [`Error`]. The stable numeric codes of
//! [`ResultCode`] only appear at the outer boundary, through [`Error::code`]
//! and [`ResultCode::from_result`].

use std::io;
use std::path::PathBuf;

/// Broad class of a failure.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// The caller supplied something that cannot be encoded or rendered.
    Input,
    /// Memory or the output sink was unavailable.
    Resource,
    /// The encoder reached a state its tables should rule out.
    Internal,
}

/// Everything that can go wrong between a payload and a PNG.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("payload contains characters outside of ASCII")]
    UnencodableText,

    #[error("payload is empty")]
    EmptyPayload,

    /// A segment holds more characters than its count indicator can express.
    #[error("segment too long")]
    SegmentTooLong,

    /// Ways to handle this error include lowering the error correction
    /// level, raising the maximum version or shortening the payload.
    #[error("data length = {used_bits} bits, max capacity = {capacity_bits} bits")]
    DataTooLong { used_bits: usize, capacity_bits: usize },

    #[error("invalid version range {min}..={max}")]
    InvalidVersionRange { min: u8, max: u8 },

    #[error("color channel {channel} out of range: {value}")]
    InvalidColor { channel: char, value: i32 },

    #[error("expected 3 color components, got {0}")]
    MissingColorComponent(usize),

    #[error("cannot render bitmap: {0}")]
    InvalidRender(&'static str),

    #[error("cannot open {}: {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write png: {0}")]
    Write(#[source] io::Error),

    #[error("out of memory while encoding")]
    Memory,

    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            UnencodableText
            | EmptyPayload
            | SegmentTooLong
            | DataTooLong { .. }
            | InvalidVersionRange { .. }
            | InvalidColor { .. }
            | MissingColorComponent(_)
            | InvalidRender(_) => ErrorKind::Input,
            FileOpen { .. } | Write(_) | Memory => ErrorKind::Resource,
            Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the stable numeric code for this error.
    pub fn code(&self) -> ResultCode {
        use Error::*;
        match self {
            UnencodableText
            | InvalidVersionRange { .. }
            | InvalidColor { .. }
            | MissingColorComponent(_) => ResultCode::UnexpectedInput,
            EmptyPayload | SegmentTooLong | DataTooLong { .. } => ResultCode::NoSymbolProduced,
            InvalidRender(_) => ResultCode::InitError,
            FileOpen { .. } => ResultCode::FileError,
            Write(_) => ResultCode::WriteError,
            Memory => ResultCode::MemoryError,
            Internal(_) => ResultCode::UnknownError,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Result codes kept stable for callers across a language boundary.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(i32)]
pub enum ResultCode {
    Success = 0,
    FileError = -1,
    MemoryError = -2,
    InitError = -3,
    WriteError = -4,
    UnexpectedInput = -5000,
    NoSymbolProduced = -5001,
    UnknownError = -5002,
}

impl ResultCode {
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ResultCode::Success,
            Err(e) => e.code(),
        }
    }

    pub const fn value(self) -> i32 {
        self as i32
    }

    /// Maps a raw code back, falling back to [`ResultCode::UnknownError`].
    pub fn from_value(value: i32) -> Self {
        use ResultCode::*;
        match value {
            0 => Success,
            -1 => FileError,
            -2 => MemoryError,
            -3 => InitError,
            -4 => WriteError,
            -5000 => UnexpectedInput,
            -5001 => NoSymbolProduced,
            _ => UnknownError,
        }
    }
}

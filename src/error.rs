//! Error type shared by the reader, writer and every box decoder.

use crate::boxes::FourCC;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated: need {needed} bytes at position {position}, {available} available")]
    Truncated {
        position: usize,
        needed: usize,
        available: usize,
    },
    #[error("invalid box size {size} (header is {header_len} bytes)")]
    InvalidSize { size: u64, header_len: u64 },
    #[error("box size 0 (extends to end of file) is not supported")]
    SizeExtendsToEof,
    #[error("child box '{typ}' of size {size} at offset {offset} overruns parent end {end}")]
    ChildOverrun {
        typ: FourCC,
        size: u64,
        offset: u64,
        end: u64,
    },
    #[error("{unread} bytes of payload left unread")]
    TrailingBytes { unread: usize },
    #[error("unsupported version {version}")]
    UnsupportedVersion { version: u8 },
    #[error("no zero terminator within {max_len} bytes")]
    MissingTerminator { max_len: usize },
    #[error("invalid string: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),
    #[error("write of {needed} bytes overflows buffer ({remaining} left)")]
    WriteOverflow { needed: usize, remaining: usize },
    #[error("wrote {written} bytes, expected {declared}")]
    SizeMismatch { written: usize, declared: usize },
    #[error("invalid bit count {0}")]
    InvalidBitCount(u32),
    #[error("position {position} out of range (length {len})")]
    InvalidPosition { position: usize, len: usize },
    #[error("invalid info level selector '{0}'")]
    InvalidInfoLevels(String),
    #[error("{0}")]
    InvalidData(String),
    #[error("box header at offset {offset}: {inner}")]
    InHeader { offset: u64, inner: Box<Error> },
    #[error("box '{typ}' at offset {offset}: {inner}")]
    InBox {
        typ: FourCC,
        offset: u64,
        inner: Box<Error>,
    },
}

impl Error {
    /// Wrap with the tag and starting offset of the box being decoded.
    pub fn in_box(self, typ: FourCC, offset: u64) -> Self {
        Error::InBox {
            typ,
            offset,
            inner: Box::new(self),
        }
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Error::InvalidData(msg.into())
    }

    /// The innermost error, with all box context stripped.
    pub fn root(&self) -> &Error {
        match self {
            Error::InBox { inner, .. } | Error::InHeader { inner, .. } => inner.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

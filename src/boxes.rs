//! Core box types: four-character codes, headers and the `Mp4Box` trait.

use crate::error::Result;
use crate::info::InfoLevels;
use crate::reader::SliceReader;
use crate::writer::SliceWriter;
use std::any::Any;
use std::fmt;
use std::io;

#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const fn new(b: &[u8; 4]) -> Self {
        FourCC(*b)
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl From<&[u8; 4]> for FourCC {
    fn from(b: &[u8; 4]) -> Self {
        FourCC(*b)
    }
}

/// Type and length prefix shared by every box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub typ: FourCC,
    /// Total size including header, payload and children.
    pub size: u64,
    /// 8, or 16 when the 64-bit large size is present.
    pub header_size: u64,
}

impl BoxHeader {
    pub fn payload_size(&self) -> u64 {
        self.size - self.header_size
    }
}

/// Header length needed to encode a box whose payload is `payload_size` bytes.
pub fn header_size_for(payload_size: u64) -> u64 {
    if payload_size + 8 >= 1 << 32 { 16 } else { 8 }
}

/// Total size of a box with the given payload length.
pub fn box_size_for(payload_size: u64) -> u64 {
    header_size_for(payload_size) + payload_size
}

/// The capability set every box kind implements.
///
/// `size()` is always computed from the current field and child state, and
/// `encode()` must write exactly that many bytes.
pub trait Mp4Box: BoxAny + fmt::Debug {
    fn box_type(&self) -> FourCC;

    fn size(&self) -> u64;

    /// Write header and payload.
    fn encode(&self, w: &mut SliceWriter) -> Result<()>;

    /// Write a human-readable dump. `levels` selects per-type verbosity.
    fn info(
        &self,
        w: &mut dyn io::Write,
        levels: &InfoLevels,
        indent: &str,
        indent_step: &str,
    ) -> Result<()>;

    /// Child boxes in encoded order. Leaves have none.
    fn children(&self) -> &[Box<dyn Mp4Box>] {
        &[]
    }
}

/// Object-safe helpers implemented for every `Mp4Box + Clone + PartialEq`.
pub trait BoxAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn box_eq(&self, other: &dyn Mp4Box) -> bool;
    fn clone_box(&self) -> Box<dyn Mp4Box>;
}

impl<T: Mp4Box + Clone + PartialEq> BoxAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn box_eq(&self, other: &dyn Mp4Box) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }

    fn clone_box(&self) -> Box<dyn Mp4Box> {
        Box::new(self.clone())
    }
}

impl dyn Mp4Box {
    pub fn downcast_ref<T: Mp4Box>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Mp4Box>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn is<T: Mp4Box>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl PartialEq for dyn Mp4Box {
    fn eq(&self, other: &Self) -> bool {
        self.box_eq(other)
    }
}

impl Clone for Box<dyn Mp4Box> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A box type that can be decoded from its payload.
///
/// `hdr.typ` is passed through so one type can serve several tags.
pub trait DecodeBox: Mp4Box + Sized {
    fn decode_payload(
        hdr: &BoxHeader,
        start: u64,
        r: &mut SliceReader<'_>,
        reg: &crate::registry::Registry,
    ) -> Result<Self>;
}

/// Packed version (top byte) and 24-bit flags leading every full box payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullBoxHeader {
    pub version: u8,
    pub flags: u32,
}

impl FullBoxHeader {
    pub const SIZE: u64 = 4;

    pub fn new(version: u8, flags: u32) -> Self {
        Self {
            version,
            flags: flags & 0x00ff_ffff,
        }
    }

    pub fn from_word(word: u32) -> Self {
        Self {
            version: (word >> 24) as u8,
            flags: word & 0x00ff_ffff,
        }
    }

    pub fn to_word(self) -> u32 {
        (u32::from(self.version) << 24) | (self.flags & 0x00ff_ffff)
    }

    pub fn decode(r: &mut SliceReader<'_>) -> Result<Self> {
        Ok(Self::from_word(r.read_u32()?))
    }

    pub fn encode(self, w: &mut SliceWriter) -> Result<()> {
        w.write_u32(self.to_word())
    }

    /// Fail with `UnsupportedVersion` unless the version is at most `max`.
    pub fn check_version(self, max: u8) -> Result<Self> {
        if self.version > max {
            return Err(crate::error::Error::UnsupportedVersion {
                version: self.version,
            });
        }
        Ok(self)
    }

    /// Fail if a version 0 box would have to cut any of `values` down to 32 bits.
    pub fn check_fits_v0(self, values: &[u64]) -> Result<()> {
        if self.version == 0 && values.iter().any(|&v| v > u64::from(u32::MAX)) {
            return Err(crate::error::Error::invalid_data("64-bit value in a version 0 box"));
        }
        Ok(())
    }
}

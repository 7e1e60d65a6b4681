//! Fixed-capacity big-endian writer.
//!
//! A [`SliceWriter`] is created with the exact size a box reports through
//! `size()`. Writing past that capacity fails, and [`SliceWriter::finish`]
//! fails unless the buffer was filled completely.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// Fixed-point 16.16 / 2.30 identity matrix used by `mvhd` and `tkhd`.
pub const UNITY_MATRIX: [i32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

#[derive(Debug)]
pub struct SliceWriter {
    buf: Vec<u8>,
    pos: usize,
}

impl SliceWriter {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn claim(&mut self, n: usize) -> Result<&mut [u8]> {
        if n > self.remaining() {
            return Err(Error::WriteOverflow {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&mut self.buf[start..start + n])
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.claim(1)?[0] = v;
        Ok(())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        BigEndian::write_u16(self.claim(2)?, v);
        Ok(())
    }

    pub fn write_u24(&mut self, v: u32) -> Result<()> {
        BigEndian::write_u24(self.claim(3)?, v & 0x00ff_ffff);
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        BigEndian::write_u32(self.claim(4)?, v);
        Ok(())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        BigEndian::write_u64(self.claim(8)?, v);
        Ok(())
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_u8(v as u8)
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        BigEndian::write_i16(self.claim(2)?, v);
        Ok(())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        BigEndian::write_i32(self.claim(4)?, v);
        Ok(())
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        BigEndian::write_i64(self.claim(8)?, v);
        Ok(())
    }

    pub fn write_bytes(&mut self, b: &[u8]) -> Result<()> {
        self.claim(b.len())?.copy_from_slice(b);
        Ok(())
    }

    pub fn write_fourcc(&mut self, typ: crate::boxes::FourCC) -> Result<()> {
        self.write_bytes(&typ.0)
    }

    /// Zero-fill `n` bytes.
    pub fn write_zeros(&mut self, n: usize) -> Result<()> {
        self.claim(n)?.fill(0);
        Ok(())
    }

    pub fn write_string(&mut self, s: &[u8], add_zero_termination: bool) -> Result<()> {
        self.write_bytes(s)?;
        if add_zero_termination {
            self.write_u8(0)?;
        }
        Ok(())
    }

    /// Write `s` into a field of exactly `len` bytes, zero-padding the tail.
    pub fn write_fixed_string(&mut self, s: &[u8], len: usize) -> Result<()> {
        if s.len() > len {
            return Err(Error::invalid_data(format!(
                "string of {} bytes does not fit a {len}-byte field",
                s.len()
            )));
        }
        self.write_bytes(s)?;
        self.write_zeros(len - s.len())
    }

    pub fn write_unity_matrix(&mut self) -> Result<()> {
        for v in UNITY_MATRIX {
            self.write_i32(v)?;
        }
        Ok(())
    }

    /// Return the encoded bytes, failing unless exactly `capacity` bytes were written.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.pos != self.buf.len() {
            return Err(Error::SizeMismatch {
                written: self.pos,
                declared: self.buf.len(),
            });
        }
        Ok(self.buf)
    }

    pub fn sticky(&mut self) -> StickyWriter<'_> {
        StickyWriter {
            inner: self,
            err: None,
        }
    }
}

/// Accumulated-error view over a [`SliceWriter`]; mirrors [`crate::reader::StickyReader`].
#[derive(Debug)]
pub struct StickyWriter<'w> {
    inner: &'w mut SliceWriter,
    err: Option<Error>,
}

macro_rules! sticky_write {
    ($($name:ident($ty:ty)),* $(,)?) => {
        $(
            pub fn $name(&mut self, v: $ty) {
                if self.err.is_none() {
                    if let Err(e) = self.inner.$name(v) {
                        self.err = Some(e);
                    }
                }
            }
        )*
    };
}

impl StickyWriter<'_> {
    sticky_write! {
        write_u8(u8),
        write_u16(u16),
        write_u24(u32),
        write_u32(u32),
        write_u64(u64),
        write_i8(i8),
        write_i16(i16),
        write_i32(i32),
        write_i64(i64),
        write_bytes(&[u8]),
        write_fourcc(crate::boxes::FourCC),
        write_zeros(usize),
    }

    pub fn write_string(&mut self, s: &[u8], add_zero_termination: bool) {
        if self.err.is_none() {
            if let Err(e) = self.inner.write_string(s, add_zero_termination) {
                self.err = Some(e);
            }
        }
    }

    pub fn write_fixed_string(&mut self, s: &[u8], len: usize) {
        if self.err.is_none() {
            if let Err(e) = self.inner.write_fixed_string(s, len) {
                self.err = Some(e);
            }
        }
    }

    pub fn write_unity_matrix(&mut self) {
        if self.err.is_none() {
            if let Err(e) = self.inner.write_unity_matrix() {
                self.err = Some(e);
            }
        }
    }

    pub fn acc_error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    pub fn finish(self) -> Result<()> {
        match self.err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_exact_capacity() {
        let mut w = SliceWriter::new(7);
        w.write_u16(0x0102).unwrap();
        w.write_u24(0x030405).unwrap();
        w.write_i16(-1).unwrap();
        assert_eq!(w.finish().unwrap(), vec![1, 2, 3, 4, 5, 0xff, 0xff]);
    }

    #[test]
    fn overflow_is_rejected() {
        let mut w = SliceWriter::new(2);
        assert!(matches!(
            w.write_u32(1),
            Err(Error::WriteOverflow {
                needed: 4,
                remaining: 2
            })
        ));
        assert_eq!(w.position(), 0);
    }

    #[test]
    fn short_write_fails_finish() {
        let mut w = SliceWriter::new(4);
        w.write_u16(1).unwrap();
        assert!(matches!(
            w.finish(),
            Err(Error::SizeMismatch {
                written: 2,
                declared: 4
            })
        ));
    }

    #[test]
    fn empty_string_without_terminator_writes_nothing() {
        let mut w = SliceWriter::new(0);
        w.write_string(b"", false).unwrap();
        assert!(w.finish().unwrap().is_empty());
    }

    #[test]
    fn unity_matrix_is_36_bytes() {
        let mut w = SliceWriter::new(36);
        w.write_unity_matrix().unwrap();
        let out = w.finish().unwrap();
        assert_eq!(&out[0..4], &[0, 1, 0, 0]);
        assert_eq!(&out[32..36], &[0x40, 0, 0, 0]);
    }

    #[test]
    fn sticky_writer_latches() {
        let mut w = SliceWriter::new(3);
        let mut s = w.sticky();
        s.write_u16(7);
        s.write_u32(9);
        s.write_u8(1);
        assert!(matches!(s.acc_error(), Some(Error::WriteOverflow { .. })));
        assert!(s.finish().is_err());
        assert_eq!(w.position(), 2);
    }
}

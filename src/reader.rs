//! Sequential big-endian reader over an in-memory byte slice.
//!
//! [`SliceReader`] reports every failure immediately. [`StickyReader`] wraps
//! one and latches the first failure instead, turning every later read into a
//! no-op that yields a zero value, so long runs of field reads can be checked
//! once at the end with [`StickyReader::finish`].

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

#[derive(Debug, Clone, Copy)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(Error::InvalidPosition {
                position,
                len: self.data.len(),
            });
        }
        self.pos = position;
        Ok(())
    }

    /// Take the next `n` bytes without copying. The position does not move on failure.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::Truncated {
                position: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Everything from the current position to the end.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    /// Split off a reader over exactly the next `n` bytes and advance past them.
    ///
    /// Box decoders receive such a reader, which makes it impossible for them to
    /// read beyond their declared payload.
    pub fn sub_reader(&mut self, n: usize) -> Result<SliceReader<'a>> {
        self.read_bytes(n).map(SliceReader::new)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u24(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u24(self.read_bytes(3)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.read_bytes(8)?))
    }

    pub fn read_fourcc(&mut self) -> Result<crate::boxes::FourCC> {
        let b = self.read_bytes(4)?;
        Ok(crate::boxes::FourCC([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_fixed_length_string(&mut self, n: usize) -> Result<String> {
        let b = self.read_bytes(n)?;
        Ok(String::from_utf8(b.to_vec())?)
    }

    /// Read up to and including a NUL byte, looking at no more than `max_len` bytes.
    ///
    /// A missing terminator is an error and leaves the position unchanged.
    pub fn read_zero_terminated_string(&mut self, max_len: usize) -> Result<String> {
        let window = &self.data[self.pos..self.pos + max_len.min(self.remaining())];
        let Some(nul) = window.iter().position(|&c| c == 0) else {
            return Err(Error::MissingTerminator { max_len });
        };
        let s = String::from_utf8(window[..nul].to_vec())?;
        self.pos += nul + 1;
        Ok(s)
    }

    pub fn sticky(&mut self) -> StickyReader<'_, 'a> {
        StickyReader {
            inner: self,
            err: None,
        }
    }
}

/// Accumulated-error view over a [`SliceReader`].
///
/// After the first failed read nothing else is consumed and all reads return
/// zero or empty values. Values read after a failure are meaningless: always
/// call [`finish`](Self::finish) before using any of them.
#[derive(Debug)]
pub struct StickyReader<'r, 'a> {
    inner: &'r mut SliceReader<'a>,
    err: Option<Error>,
}

macro_rules! sticky_read {
    ($($name:ident -> $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> $ty {
                if self.err.is_some() {
                    return Default::default();
                }
                match self.inner.$name() {
                    Ok(v) => v,
                    Err(e) => {
                        self.err = Some(e);
                        Default::default()
                    }
                }
            }
        )*
    };
}

impl<'r, 'a> StickyReader<'r, 'a> {
    sticky_read! {
        read_u8 -> u8,
        read_u16 -> u16,
        read_u24 -> u32,
        read_u32 -> u32,
        read_u64 -> u64,
        read_i8 -> i8,
        read_i16 -> i16,
        read_i32 -> i32,
        read_i64 -> i64,
    }

    fn latch<T: Default>(&mut self, res: Result<T>) -> T {
        match res {
            Ok(v) => v,
            Err(e) => {
                self.err = Some(e);
                T::default()
            }
        }
    }

    pub fn read_fourcc(&mut self) -> crate::boxes::FourCC {
        if self.err.is_some() {
            return crate::boxes::FourCC([0; 4]);
        }
        match self.inner.read_fourcc() {
            Ok(v) => v,
            Err(e) => {
                self.err = Some(e);
                crate::boxes::FourCC([0; 4])
            }
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> &'a [u8] {
        if self.err.is_some() {
            return &[];
        }
        let res = self.inner.read_bytes(n);
        self.latch(res)
    }

    pub fn skip(&mut self, n: usize) {
        if self.err.is_none() {
            let res = self.inner.skip(n);
            self.latch(res)
        }
    }

    pub fn read_fixed_length_string(&mut self, n: usize) -> String {
        if self.err.is_some() {
            return String::new();
        }
        let res = self.inner.read_fixed_length_string(n);
        self.latch(res)
    }

    pub fn read_zero_terminated_string(&mut self, max_len: usize) -> String {
        if self.err.is_some() {
            return String::new();
        }
        let res = self.inner.read_zero_terminated_string(max_len);
        self.latch(res)
    }

    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }

    pub fn position(&self) -> usize {
        self.inner.position()
    }

    /// The first error encountered, if any.
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
    fn reads_big_endian_integers() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0xff];
        let mut r = SliceReader::new(&data);
        assert_eq!(r.read_u16().unwrap(), 0x0102);
        assert_eq!(r.read_u24().unwrap(), 0x030405);
        assert_eq!(r.read_u32().unwrap(), 0x06070809);
        assert_eq!(r.read_i8().unwrap(), -1);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn truncated_read_keeps_position() {
        let data = [0u8; 3];
        let mut r = SliceReader::new(&data);
        r.skip(1).unwrap();
        let err = r.read_u32().unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                position: 1,
                needed: 4,
                available: 2
            }
        ));
        assert_eq!(r.position(), 1);
    }

    #[test]
    fn zero_terminated_string_within_bound() {
        let data = b"abc\0def";
        let mut r = SliceReader::new(data);
        assert_eq!(r.read_zero_terminated_string(16).unwrap(), "abc");
        assert_eq!(r.position(), 4);
    }

    #[test]
    fn zero_terminated_string_missing_terminator() {
        let data = b"abcdef\0";
        let mut r = SliceReader::new(data);
        assert!(matches!(
            r.read_zero_terminated_string(4),
            Err(Error::MissingTerminator { max_len: 4 })
        ));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn sub_reader_is_bounded() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut r = SliceReader::new(&data);
        let mut sub = r.sub_reader(2).unwrap();
        assert_eq!(r.position(), 2);
        assert_eq!(sub.read_u16().unwrap(), 0x0102);
        assert!(sub.read_u8().is_err());
    }

    #[test]
    fn sticky_reader_latches_first_error() {
        let data = [0xaau8, 0xbb];
        let mut r = SliceReader::new(&data);
        let mut s = r.sticky();
        assert_eq!(s.read_u32(), 0);
        assert_eq!(s.read_u8(), 0);
        assert_eq!(s.read_u16(), 0);
        assert_eq!(s.read_u64(), 0);
        assert_eq!(s.position(), 0);
        let err = s.finish().unwrap_err();
        assert!(matches!(err, Error::Truncated { needed: 4, .. }));
    }

    #[test]
    fn sticky_reader_without_error() {
        let data = [0u8, 1, b'h', b'i', 0];
        let mut r = SliceReader::new(&data);
        let mut s = r.sticky();
        assert_eq!(s.read_u16(), 1);
        assert_eq!(s.read_zero_terminated_string(8), "hi");
        assert!(s.acc_error().is_none());
        assert!(s.finish().is_ok());
    }
}

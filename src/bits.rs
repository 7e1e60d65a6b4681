//! Bit-granular reader for packed sub-byte fields.
//!
//! Like the sticky byte reader, [`BitReader`] accumulates the first error and
//! returns zero from every read after it.

use crate::error::{Error, Result};

/// Mask for the `n` least significant bits.
pub fn mask(n: u32) -> u32 {
    if n >= 32 { u32::MAX } else { (1u32 << n) - 1 }
}

#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    // next unread bit, counted from the start of `data`
    bit_pos: usize,
    err: Option<Error>,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_pos: 0,
            err: None,
        }
    }

    /// Read `n` (1..=32) bits, most significant first.
    pub fn read_bits(&mut self, n: u32) -> u32 {
        if self.err.is_some() {
            return 0;
        }
        if n == 0 || n > 32 {
            self.err = Some(Error::InvalidBitCount(n));
            return 0;
        }
        let available = self.data.len() * 8 - self.bit_pos;
        if n as usize > available {
            self.err = Some(Error::Truncated {
                position: self.bit_pos / 8,
                needed: (n as usize).div_ceil(8),
                available: available / 8,
            });
            return 0;
        }
        let mut value = 0u64;
        for _ in 0..n {
            let byte = self.data[self.bit_pos / 8];
            let bit = (byte >> (7 - (self.bit_pos % 8))) & 1;
            value = (value << 1) | u64::from(bit);
            self.bit_pos += 1;
        }
        value as u32
    }

    pub fn read_flag(&mut self) -> bool {
        self.read_bits(1) == 1
    }

    /// Read `n` bits as a two's complement signed value.
    pub fn read_signed_bits(&mut self, n: u32) -> i32 {
        let v = self.read_bits(n);
        if n == 0 || n >= 32 {
            return v as i32;
        }
        if v >> (n - 1) == 1 {
            (v | !mask(n)) as i32
        } else {
            v as i32
        }
    }

    /// Unsigned Exp-Golomb code, ue(v).
    pub fn read_exp_golomb(&mut self) -> u32 {
        let mut leading_zeros = 0u32;
        while !self.read_flag() {
            if self.err.is_some() {
                return 0;
            }
            leading_zeros += 1;
            if leading_zeros > 31 {
                self.err = Some(Error::invalid_data("exp-golomb code longer than 32 bits"));
                return 0;
            }
        }
        if leading_zeros == 0 {
            return 0;
        }
        let suffix = self.read_bits(leading_zeros);
        if self.err.is_some() {
            return 0;
        }
        (mask(leading_zeros) as u64 + suffix as u64) as u32
    }

    /// Signed Exp-Golomb code, se(v).
    pub fn read_signed_exp_golomb(&mut self) -> i32 {
        let k = self.read_exp_golomb() as i64;
        if k % 2 == 1 { ((k + 1) / 2) as i32 } else { (-(k / 2)) as i32 }
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.bit_pos % 8 == 0
    }

    /// Skip to the next byte boundary.
    pub fn align(&mut self) {
        self.bit_pos = self.bit_pos.div_ceil(8) * 8;
    }

    pub fn bits_read(&self) -> usize {
        self.bit_pos
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

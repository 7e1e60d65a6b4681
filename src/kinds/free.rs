//! Padding and media data boxes.

use crate::boxes::{BoxHeader, DecodeBox, FourCC, Mp4Box, box_size_for};
use crate::error::Result;
use crate::info::{InfoLevels, write_box_line};
use crate::parser::write_box_header;
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io;

/// `free` / `skip` padding. The padding bytes are kept as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeBox {
    pub typ: FourCC,
    pub data: Vec<u8>,
}

impl FreeBox {
    /// `free` box with `n` zero bytes of padding.
    pub fn zeroed(n: usize) -> Self {
        Self {
            typ: FourCC(*b"free"),
            data: vec![0; n],
        }
    }
}

impl DecodeBox for FreeBox {
    fn decode_payload(hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        Ok(Self {
            typ: hdr.typ,
            data: r.read_remaining().to_vec(),
        })
    }
}

impl Mp4Box for FreeBox {
    fn box_type(&self) -> FourCC {
        self.typ
    }

    fn size(&self) -> u64 {
        box_size_for(self.data.len() as u64)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.typ, self.size())?;
        w.write_bytes(&self.data)
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_box_line(w, self, levels, indent)?;
        Ok(())
    }
}

/// `mdat`: media samples, held as one opaque byte vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MdatBox {
    pub data: Vec<u8>,
}

impl MdatBox {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Offset of the first data byte relative to the start of the box.
    pub fn payload_offset(&self) -> u64 {
        self.size() - self.data.len() as u64
    }
}

impl DecodeBox for MdatBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        Ok(Self {
            data: r.read_remaining().to_vec(),
        })
    }
}

impl Mp4Box for MdatBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"mdat")
    }

    fn size(&self) -> u64 {
        box_size_for(self.data.len() as u64)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        w.write_bytes(&self.data)
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_box_line(w, self, levels, indent)?;
        Ok(())
    }
}

//! Handler reference and media information headers.

use crate::boxes::{BoxHeader, DecodeBox, FourCC, FullBoxHeader, Mp4Box, box_size_for};
use crate::error::Result;
use crate::info::{InfoLevels, write_full_box_line};
use crate::parser::write_box_header;
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io;

/// `hdlr`: handler type (`vide`, `soun`, ...) and a human-readable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdlrBox {
    pub full: FullBoxHeader,
    pub pre_defined: u32,
    pub handler_type: FourCC,
    /// Raw name bytes. Usually UTF-8, but files written with other encodings exist.
    pub name: Vec<u8>,
    /// Some writers omit the terminating NUL; keep what was read.
    pub lacks_zero_termination: bool,
}

impl HdlrBox {
    pub fn new(handler_type: FourCC, name: &str) -> Self {
        Self {
            full: FullBoxHeader::default(),
            pre_defined: 0,
            handler_type,
            name: name.as_bytes().to_vec(),
            lacks_zero_termination: false,
        }
    }
}

impl DecodeBox for HdlrBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let pre_defined = r.read_u32()?;
        let handler_type = r.read_fourcc()?;
        r.skip(12)?;
        let rest = r.read_remaining();
        let (name, lacks_zero_termination) = match rest.split_last() {
            Some((0, head)) => (head, false),
            _ => (rest, true),
        };
        Ok(Self {
            full,
            pre_defined,
            handler_type,
            name: name.to_vec(),
            lacks_zero_termination,
        })
    }
}

impl Mp4Box for HdlrBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"hdlr")
    }

    fn size(&self) -> u64 {
        let nul = if self.lacks_zero_termination { 0 } else { 1 };
        box_size_for(FullBoxHeader::SIZE + 20 + self.name.len() as u64 + nul)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_u32(self.pre_defined)?;
        w.write_fourcc(self.handler_type)?;
        w.write_zeros(12)?;
        w.write_string(&self.name, !self.lacks_zero_termination)
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - handlerType: {}", self.handler_type)?;
        writeln!(w, "{indent} - handlerName: {:?}", String::from_utf8_lossy(&self.name))?;
        Ok(())
    }
}

/// `vmhd`: video media header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmhdBox {
    pub full: FullBoxHeader,
    pub graphics_mode: u16,
    pub opcolor: [u16; 3],
}

impl Default for VmhdBox {
    fn default() -> Self {
        Self {
            full: FullBoxHeader::new(0, 1),
            graphics_mode: 0,
            opcolor: [0; 3],
        }
    }
}

impl DecodeBox for VmhdBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let graphics_mode = r.read_u16()?;
        let opcolor = [r.read_u16()?, r.read_u16()?, r.read_u16()?];
        Ok(Self {
            full,
            graphics_mode,
            opcolor,
        })
    }
}

impl Mp4Box for VmhdBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"vmhd")
    }

    fn size(&self) -> u64 {
        box_size_for(FullBoxHeader::SIZE + 8)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_u16(self.graphics_mode)?;
        for c in self.opcolor {
            w.write_u16(c)?;
        }
        Ok(())
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - graphicsMode: {}", self.graphics_mode)?;
        writeln!(w, "{indent} - opColor: {:?}", self.opcolor)?;
        Ok(())
    }
}

/// `smhd`: sound media header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmhdBox {
    pub full: FullBoxHeader,
    /// 8.8 fixed point, 0 is centre.
    pub balance: i16,
}

impl DecodeBox for SmhdBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let balance = r.read_i16()?;
        r.skip(2)?;
        Ok(Self { full, balance })
    }
}

impl Mp4Box for SmhdBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"smhd")
    }

    fn size(&self) -> u64 {
        box_size_for(FullBoxHeader::SIZE + 4)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_i16(self.balance)?;
        w.write_u16(0)
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - balance: {}", self.balance)?;
        Ok(())
    }
}

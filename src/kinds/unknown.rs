//! Boxes kept as raw bytes: unregistered tags and `uuid`.

use crate::boxes::{BoxHeader, DecodeBox, FourCC, Mp4Box, box_size_for};
use crate::error::Result;
use crate::info::{InfoLevels, write_box_line};
use crate::parser::write_box_header;
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::util::hex_dump;
use crate::writer::SliceWriter;
use std::io;

/// Any box without a registered decoder. The payload is kept verbatim so the
/// box re-encodes byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBox {
    pub typ: FourCC,
    pub payload: Vec<u8>,
}

impl UnknownBox {
    pub fn new(typ: FourCC, payload: Vec<u8>) -> Self {
        Self { typ, payload }
    }
}

impl DecodeBox for UnknownBox {
    fn decode_payload(hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        Ok(Self {
            typ: hdr.typ,
            payload: r.read_remaining().to_vec(),
        })
    }
}

impl Mp4Box for UnknownBox {
    fn box_type(&self) -> FourCC {
        self.typ
    }

    fn size(&self) -> u64 {
        box_size_for(self.payload.len() as u64)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.typ, self.size())?;
        w.write_bytes(&self.payload)
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let level = write_box_line(w, self, levels, indent)?;
        writeln!(w, "{indent} - unknown box, {} payload bytes", self.payload.len())?;
        if level >= 2 {
            for line in hex_dump(&self.payload, 0).lines() {
                writeln!(w, "{indent}   {line}")?;
            }
        }
        Ok(())
    }
}

/// `uuid` box: a 16-byte extended type followed by opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidBox {
    pub user_type: [u8; 16],
    pub payload: Vec<u8>,
}

impl DecodeBox for UuidBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let mut user_type = [0u8; 16];
        user_type.copy_from_slice(r.read_bytes(16)?);
        Ok(Self {
            user_type,
            payload: r.read_remaining().to_vec(),
        })
    }
}

impl Mp4Box for UuidBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"uuid")
    }

    fn size(&self) -> u64 {
        box_size_for(16 + self.payload.len() as u64)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        w.write_bytes(&self.user_type)?;
        w.write_bytes(&self.payload)
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let level = write_box_line(w, self, levels, indent)?;
        writeln!(w, "{indent} - userType: {}", hex::encode(self.user_type))?;
        if level >= 1 {
            writeln!(w, "{indent} - payload: {}", hex::encode(&self.payload))?;
        }
        Ok(())
    }
}

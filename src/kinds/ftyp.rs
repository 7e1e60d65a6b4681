//! File and segment type boxes.

use crate::boxes::{BoxHeader, DecodeBox, FourCC, Mp4Box, box_size_for};
use crate::error::{Error, Result};
use crate::info::{InfoLevels, write_box_line};
use crate::parser::write_box_header;
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io;

/// `ftyp` / `styp`: major brand, minor version, compatible brands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtypBox {
    pub typ: FourCC,
    pub major_brand: FourCC,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCC>,
}

impl FtypBox {
    pub fn new(major_brand: FourCC, minor_version: u32, compatible_brands: Vec<FourCC>) -> Self {
        Self {
            typ: FourCC(*b"ftyp"),
            major_brand,
            minor_version,
            compatible_brands,
        }
    }

    /// Same content as an `ftyp`, tagged as a segment type box.
    pub fn new_styp(major_brand: FourCC, minor_version: u32, compatible_brands: Vec<FourCC>) -> Self {
        Self {
            typ: FourCC(*b"styp"),
            ..Self::new(major_brand, minor_version, compatible_brands)
        }
    }
}

impl DecodeBox for FtypBox {
    fn decode_payload(hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        if r.remaining() < 8 || r.remaining() % 4 != 0 {
            return Err(Error::invalid_data(format!("payload of {} bytes is not 8 + 4*n", r.remaining())));
        }
        let major_brand = r.read_fourcc()?;
        let minor_version = r.read_u32()?;
        let mut compatible_brands = Vec::with_capacity(r.remaining() / 4);
        while r.remaining() > 0 {
            compatible_brands.push(r.read_fourcc()?);
        }
        Ok(Self {
            typ: hdr.typ,
            major_brand,
            minor_version,
            compatible_brands,
        })
    }
}

impl Mp4Box for FtypBox {
    fn box_type(&self) -> FourCC {
        self.typ
    }

    fn size(&self) -> u64 {
        box_size_for(8 + 4 * self.compatible_brands.len() as u64)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.typ, self.size())?;
        w.write_fourcc(self.major_brand)?;
        w.write_u32(self.minor_version)?;
        for b in &self.compatible_brands {
            w.write_fourcc(*b)?;
        }
        Ok(())
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_box_line(w, self, levels, indent)?;
        writeln!(w, "{indent} - majorBrand: {}", self.major_brand)?;
        writeln!(w, "{indent} - minorVersion: {}", self.minor_version)?;
        for b in &self.compatible_brands {
            writeln!(w, "{indent} - compatibleBrand: {b}")?;
        }
        Ok(())
    }
}

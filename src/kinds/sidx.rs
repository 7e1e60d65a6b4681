//! Segment index.

use crate::bits::BitReader;
use crate::boxes::{BoxHeader, DecodeBox, FourCC, FullBoxHeader, Mp4Box, box_size_for};
use crate::error::{Error, Result};
use crate::info::{InfoLevels, write_full_box_line};
use crate::parser::write_box_header;
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidxReference {
    /// true when the reference points at another `sidx`.
    pub reference_type: bool,
    /// 31 bits.
    pub referenced_size: u32,
    pub subsegment_duration: u32,
    pub starts_with_sap: bool,
    /// 3 bits.
    pub sap_type: u8,
    /// 28 bits.
    pub sap_delta_time: u32,
}

/// `sidx`: segment index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidxBox {
    pub full: FullBoxHeader,
    pub reference_id: u32,
    pub timescale: u32,
    pub earliest_presentation_time: u64,
    pub first_offset: u64,
    pub references: Vec<SidxReference>,
}

impl DecodeBox for SidxBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?.check_version(1)?;
        let reference_id = r.read_u32()?;
        let timescale = r.read_u32()?;
        let (earliest_presentation_time, first_offset) = if full.version == 1 {
            (r.read_u64()?, r.read_u64()?)
        } else {
            (u64::from(r.read_u32()?), u64::from(r.read_u32()?))
        };
        r.skip(2)?;
        let count = r.read_u16()? as usize;
        if count * 12 != r.remaining() {
            return Err(Error::invalid_data(format!(
                "{count} references do not match {} payload bytes",
                r.remaining()
            )));
        }
        let mut bits = BitReader::new(r.read_bytes(count * 12)?);
        let references = (0..count)
            .map(|_| SidxReference {
                reference_type: bits.read_flag(),
                referenced_size: bits.read_bits(31),
                subsegment_duration: bits.read_bits(32),
                starts_with_sap: bits.read_flag(),
                sap_type: bits.read_bits(3) as u8,
                sap_delta_time: bits.read_bits(28),
            })
            .collect();
        bits.finish()?;
        Ok(Self {
            full,
            reference_id,
            timescale,
            earliest_presentation_time,
            first_offset,
            references,
        })
    }
}

impl Mp4Box for SidxBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"sidx")
    }

    fn size(&self) -> u64 {
        let times = if self.full.version == 1 { 16 } else { 8 };
        box_size_for(FullBoxHeader::SIZE + 8 + times + 4 + 12 * self.references.len() as u64)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        if self.references.len() > usize::from(u16::MAX) {
            return Err(Error::invalid_data("more than 65535 sidx references"));
        }
        self.full
            .check_fits_v0(&[self.earliest_presentation_time, self.first_offset])?;
        for r in &self.references {
            if r.referenced_size > 0x7fff_ffff || r.sap_type > 0x07 || r.sap_delta_time > 0x0fff_ffff {
                return Err(Error::invalid_data(format!("sidx reference field out of range: {r:?}")));
            }
        }
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        let mut s = w.sticky();
        s.write_u32(self.reference_id);
        s.write_u32(self.timescale);
        if self.full.version == 1 {
            s.write_u64(self.earliest_presentation_time);
            s.write_u64(self.first_offset);
        } else {
            s.write_u32(self.earliest_presentation_time as u32);
            s.write_u32(self.first_offset as u32);
        }
        s.write_u16(0);
        s.write_u16(self.references.len() as u16);
        for r in &self.references {
            s.write_u32((u32::from(r.reference_type) << 31) | r.referenced_size);
            s.write_u32(r.subsegment_duration);
            s.write_u32(
                (u32::from(r.starts_with_sap) << 31)
                    | (u32::from(r.sap_type) << 28)
                    | r.sap_delta_time,
            );
        }
        s.finish()
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let level = write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - referenceID: {}", self.reference_id)?;
        writeln!(w, "{indent} - timeScale: {}", self.timescale)?;
        writeln!(w, "{indent} - earliestPresentationTime: {}", self.earliest_presentation_time)?;
        writeln!(w, "{indent} - firstOffset: {}", self.first_offset)?;
        writeln!(w, "{indent} - referenceCount: {}", self.references.len())?;
        if level >= 1 {
            for (i, r) in self.references.iter().enumerate() {
                writeln!(
                    w,
                    "{indent} - reference[{}]: type={} size={} duration={} startsWithSAP={} SAPType={} SAPDeltaTime={}",
                    i + 1,
                    u8::from(r.reference_type),
                    r.referenced_size,
                    r.subsegment_duration,
                    u8::from(r.starts_with_sap),
                    r.sap_type,
                    r.sap_delta_time
                )?;
            }
        }
        Ok(())
    }
}

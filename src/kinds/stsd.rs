//! Sample description box and the sample entries it carries.
//!
//! Sample entries are hybrid boxes: a fixed block of fields followed by an
//! arbitrary list of child boxes (`avcC`, `esds`, `sinf`, `btrt`, ...).

use crate::boxes::{BoxHeader, DecodeBox, FourCC, FullBoxHeader, Mp4Box, box_size_for};
use crate::error::{Error, Result};
use crate::info::{InfoLevels, write_box_line, write_children_info, write_full_box_line};
use crate::parser::{encode_children, write_box_header};
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io;

fn children_size(children: &[Box<dyn Mp4Box>]) -> u64 {
    children.iter().map(|c| c.size()).sum()
}

/// `stsd`: full box, entry count, then the sample entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StsdBox {
    pub full: FullBoxHeader,
    pub children: Vec<Box<dyn Mp4Box>>,
}

impl StsdBox {
    pub fn add_entry(&mut self, entry: Box<dyn Mp4Box>) {
        self.children.push(entry);
    }
}

impl DecodeBox for StsdBox {
    fn decode_payload(hdr: &BoxHeader, start: u64, r: &mut SliceReader<'_>, reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let entry_count = r.read_u32()?;
        let first = start + hdr.header_size + FullBoxHeader::SIZE + 4;
        let children = reg.decode_children(first, start + hdr.size, r)?;
        if children.len() != entry_count as usize {
            return Err(Error::invalid_data(format!(
                "entry count {entry_count} but {} sample entries present",
                children.len()
            )));
        }
        Ok(Self { full, children })
    }
}

impl Mp4Box for StsdBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"stsd")
    }

    fn size(&self) -> u64 {
        box_size_for(FullBoxHeader::SIZE + 4 + children_size(&self.children))
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_u32(self.children.len() as u32)?;
        encode_children(&self.children, w)
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        write_children_info(w, &self.children, levels, indent, indent_step)
    }

    fn children(&self) -> &[Box<dyn Mp4Box>] {
        &self.children
    }
}

/// Fixed part of a visual sample entry, from the reserved bytes to `pre_defined`.
const VISUAL_FIXED_SIZE: u64 = 78;

/// Visual sample entry (`avc1`, `hvc1`, `av01`, `encv`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct VisualSampleEntryBox {
    pub typ: FourCC,
    pub data_reference_index: u16,
    pub width: u16,
    pub height: u16,
    /// 16.16 fixed point pixels per inch.
    pub horizresolution: u32,
    pub vertresolution: u32,
    pub frame_count: u16,
    /// At most 31 bytes, not necessarily UTF-8; stored as a length-prefixed 32-byte field.
    pub compressor_name: Vec<u8>,
    pub depth: u16,
    /// Normally -1.
    pub pre_defined: i16,
    pub children: Vec<Box<dyn Mp4Box>>,
}

impl VisualSampleEntryBox {
    pub fn new(typ: FourCC, width: u16, height: u16) -> Self {
        Self {
            typ,
            data_reference_index: 1,
            width,
            height,
            horizresolution: 0x0048_0000,
            vertresolution: 0x0048_0000,
            frame_count: 1,
            compressor_name: Vec::new(),
            depth: 0x0018,
            pre_defined: -1,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: impl Mp4Box) -> Self {
        self.children.push(Box::new(child));
        self
    }
}

impl DecodeBox for VisualSampleEntryBox {
    fn decode_payload(hdr: &BoxHeader, start: u64, r: &mut SliceReader<'_>, reg: &Registry) -> Result<Self> {
        let mut s = r.sticky();
        s.skip(6);
        let data_reference_index = s.read_u16();
        s.skip(16);
        let width = s.read_u16();
        let height = s.read_u16();
        let horizresolution = s.read_u32();
        let vertresolution = s.read_u32();
        s.skip(4);
        let frame_count = s.read_u16();
        let name_len = s.read_u8();
        let name = s.read_bytes(31);
        let depth = s.read_u16();
        let pre_defined = s.read_i16();
        s.finish()?;

        if name_len > 31 {
            return Err(Error::invalid_data(format!("compressor name length {name_len}")));
        }
        let compressor_name = name[..name_len as usize].to_vec();
        let first = start + hdr.header_size + VISUAL_FIXED_SIZE;
        let children = reg.decode_children(first, start + hdr.size, r)?;
        Ok(Self {
            typ: hdr.typ,
            data_reference_index,
            width,
            height,
            horizresolution,
            vertresolution,
            frame_count,
            compressor_name,
            depth,
            pre_defined,
            children,
        })
    }
}

impl Mp4Box for VisualSampleEntryBox {
    fn box_type(&self) -> FourCC {
        self.typ
    }

    fn size(&self) -> u64 {
        box_size_for(VISUAL_FIXED_SIZE + children_size(&self.children))
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        if self.compressor_name.len() > 31 {
            return Err(Error::invalid_data("compressor name longer than 31 bytes"));
        }
        write_box_header(w, self.typ, self.size())?;
        let mut s = w.sticky();
        s.write_zeros(6);
        s.write_u16(self.data_reference_index);
        s.write_zeros(16);
        s.write_u16(self.width);
        s.write_u16(self.height);
        s.write_u32(self.horizresolution);
        s.write_u32(self.vertresolution);
        s.write_zeros(4);
        s.write_u16(self.frame_count);
        s.write_u8(self.compressor_name.len() as u8);
        s.write_fixed_string(&self.compressor_name, 31);
        s.write_u16(self.depth);
        s.write_i16(self.pre_defined);
        s.finish()?;
        encode_children(&self.children, w)
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, indent_step: &str) -> Result<()> {
        write_box_line(w, self, levels, indent)?;
        writeln!(w, "{indent} - dataReferenceIndex: {}", self.data_reference_index)?;
        writeln!(w, "{indent} - width: {}", self.width)?;
        writeln!(w, "{indent} - height: {}", self.height)?;
        if !self.compressor_name.is_empty() {
            writeln!(w, "{indent} - compressorName: {:?}", String::from_utf8_lossy(&self.compressor_name))?;
        }
        write_children_info(w, &self.children, levels, indent, indent_step)
    }

    fn children(&self) -> &[Box<dyn Mp4Box>] {
        &self.children
    }
}

const AUDIO_FIXED_SIZE: u64 = 28;

/// Audio sample entry (`mp4a`, `ac-3`, `Opus`, `enca`, ...). Only the
/// ISO layout is handled; QuickTime sound description versions 1 and 2 are
/// rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSampleEntryBox {
    pub typ: FourCC,
    pub data_reference_index: u16,
    pub channel_count: u16,
    pub sample_size: u16,
    /// 16.16 fixed point.
    pub sample_rate: u32,
    pub children: Vec<Box<dyn Mp4Box>>,
}

impl AudioSampleEntryBox {
    pub fn new(typ: FourCC, channel_count: u16, sample_rate: u16) -> Self {
        Self {
            typ,
            data_reference_index: 1,
            channel_count,
            sample_size: 16,
            sample_rate: u32::from(sample_rate) << 16,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: impl Mp4Box) -> Self {
        self.children.push(Box::new(child));
        self
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate >> 16
    }
}

impl DecodeBox for AudioSampleEntryBox {
    fn decode_payload(hdr: &BoxHeader, start: u64, r: &mut SliceReader<'_>, reg: &Registry) -> Result<Self> {
        let mut s = r.sticky();
        s.skip(6);
        let data_reference_index = s.read_u16();
        let sound_version = s.read_u16();
        s.skip(6);
        let channel_count = s.read_u16();
        let sample_size = s.read_u16();
        s.skip(4);
        let sample_rate = s.read_u32();
        s.finish()?;

        if sound_version != 0 {
            return Err(Error::UnsupportedVersion {
                version: sound_version as u8,
            });
        }
        let first = start + hdr.header_size + AUDIO_FIXED_SIZE;
        let children = reg.decode_children(first, start + hdr.size, r)?;
        Ok(Self {
            typ: hdr.typ,
            data_reference_index,
            channel_count,
            sample_size,
            sample_rate,
            children,
        })
    }
}

impl Mp4Box for AudioSampleEntryBox {
    fn box_type(&self) -> FourCC {
        self.typ
    }

    fn size(&self) -> u64 {
        box_size_for(AUDIO_FIXED_SIZE + children_size(&self.children))
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.typ, self.size())?;
        let mut s = w.sticky();
        s.write_zeros(6);
        s.write_u16(self.data_reference_index);
        s.write_zeros(8);
        s.write_u16(self.channel_count);
        s.write_u16(self.sample_size);
        s.write_zeros(4);
        s.write_u32(self.sample_rate);
        s.finish()?;
        encode_children(&self.children, w)
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, indent_step: &str) -> Result<()> {
        write_box_line(w, self, levels, indent)?;
        writeln!(w, "{indent} - dataReferenceIndex: {}", self.data_reference_index)?;
        writeln!(w, "{indent} - channelCount: {}", self.channel_count)?;
        writeln!(w, "{indent} - sampleSize: {}", self.sample_size)?;
        writeln!(w, "{indent} - sampleRate: {}", self.sample_rate_hz())?;
        write_children_info(w, &self.children, levels, indent, indent_step)
    }

    fn children(&self) -> &[Box<dyn Mp4Box>] {
        &self.children
    }
}

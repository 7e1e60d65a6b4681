//! Data reference box and its `url ` entries.

use crate::boxes::{BoxHeader, DecodeBox, FourCC, FullBoxHeader, Mp4Box, box_size_for};
use crate::error::{Error, Result};
use crate::info::{InfoLevels, write_children_info, write_full_box_line};
use crate::parser::{encode_children, write_box_header};
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io;

/// Flag marking a data entry whose media is in the same file.
pub const SELF_CONTAINED: u32 = 0x000001;

/// `dref`: full box, entry count, then that many data entry boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct DrefBox {
    pub full: FullBoxHeader,
    pub children: Vec<Box<dyn Mp4Box>>,
}

impl Default for DrefBox {
    /// One self-contained `url ` entry, as in almost every file.
    fn default() -> Self {
        Self {
            full: FullBoxHeader::default(),
            children: vec![Box::new(UrlBox::self_contained())],
        }
    }
}

impl DecodeBox for DrefBox {
    fn decode_payload(hdr: &BoxHeader, start: u64, r: &mut SliceReader<'_>, reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let entry_count = r.read_u32()?;
        let first = start + hdr.header_size + FullBoxHeader::SIZE + 4;
        let children = reg.decode_children(first, start + hdr.size, r)?;
        if children.len() != entry_count as usize {
            return Err(Error::invalid_data(format!(
                "entry count {entry_count} but {} entries present",
                children.len()
            )));
        }
        Ok(Self { full, children })
    }
}

impl Mp4Box for DrefBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"dref")
    }

    fn size(&self) -> u64 {
        box_size_for(FullBoxHeader::SIZE + 4 + self.children.iter().map(|c| c.size()).sum::<u64>())
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

/// `url `: data entry.
///
/// The location is normally absent when the self-contained flag is set, but
/// some writers emit an empty one anyway, so presence follows the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBox {
    pub full: FullBoxHeader,
    pub location: Option<String>,
}

impl UrlBox {
    pub fn self_contained() -> Self {
        Self {
            full: FullBoxHeader::new(0, SELF_CONTAINED),
            location: None,
        }
    }

    pub fn is_self_contained(&self) -> bool {
        self.full.flags & SELF_CONTAINED != 0
    }
}

impl DecodeBox for UrlBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let location = if r.remaining() == 0 {
            None
        } else {
            Some(r.read_zero_terminated_string(r.remaining())?)
        };
        Ok(Self { full, location })
    }
}

impl Mp4Box for UrlBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"url ")
    }

    fn size(&self) -> u64 {
        let loc = self.location.as_ref().map_or(0, |l| l.len() as u64 + 1);
        box_size_for(FullBoxHeader::SIZE + loc)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        if let Some(location) = &self.location {
            w.write_string(location.as_bytes(), true)?;
        }
        Ok(())
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        if let Some(location) = &self.location {
            writeln!(w, "{indent} - location: {location:?}")?;
        }
        Ok(())
    }
}

//! Pure containers and `meta`.

use crate::boxes::{BoxHeader, DecodeBox, FourCC, FullBoxHeader, Mp4Box, box_size_for};
use crate::error::Result;
use crate::info::{InfoLevels, write_box_line, write_children_info, write_full_box_line};
use crate::parser::{container_size, encode_children, encode_container, write_box_header};
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io;

/// Typed lookup over an owned child list.
pub trait ChildLookup {
    fn child_boxes(&self) -> &[Box<dyn Mp4Box>];

    /// First child of type `T`.
    fn child<T: Mp4Box>(&self) -> Option<&T> {
        self.child_boxes().iter().find_map(|c| c.downcast_ref::<T>())
    }

    /// All children of type `T`, in order.
    fn children_of<T: Mp4Box>(&self) -> impl Iterator<Item = &T> {
        self.child_boxes().iter().filter_map(|c| c.downcast_ref::<T>())
    }

    /// First child with the given tag, whatever its decoded type.
    fn child_by_type(&self, typ: FourCC) -> Option<&dyn Mp4Box> {
        self.child_boxes()
            .iter()
            .find(|c| c.box_type() == typ)
            .map(|c| c.as_ref())
    }
}

impl ChildLookup for [Box<dyn Mp4Box>] {
    fn child_boxes(&self) -> &[Box<dyn Mp4Box>] {
        self
    }
}

/// Pure container: header followed by nothing but child boxes.
///
/// Serves `moov`, `trak`, `mdia`, `minf`, `stbl`, `moof`, `traf` and the
/// other boxes that carry no fields of their own.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerBox {
    pub typ: FourCC,
    pub children: Vec<Box<dyn Mp4Box>>,
}

impl ContainerBox {
    pub fn new(typ: FourCC) -> Self {
        Self {
            typ,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: impl Mp4Box) -> Self {
        self.children.push(Box::new(child));
        self
    }

    pub fn add_child(&mut self, child: Box<dyn Mp4Box>) {
        self.children.push(child);
    }
}

impl ChildLookup for ContainerBox {
    fn child_boxes(&self) -> &[Box<dyn Mp4Box>] {
        &self.children
    }
}

impl DecodeBox for ContainerBox {
    fn decode_payload(hdr: &BoxHeader, start: u64, r: &mut SliceReader<'_>, reg: &Registry) -> Result<Self> {
        let first = start + hdr.header_size;
        let children = reg.decode_children(first, start + hdr.size, r)?;
        Ok(Self { typ: hdr.typ, children })
    }
}

impl Mp4Box for ContainerBox {
    fn box_type(&self) -> FourCC {
        self.typ
    }

    fn size(&self) -> u64 {
        container_size(&self.children)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        encode_container(self.typ, &self.children, w)
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, indent_step: &str) -> Result<()> {
        write_box_line(w, self, levels, indent)?;
        write_children_info(w, &self.children, levels, indent, indent_step)
    }

    fn children(&self) -> &[Box<dyn Mp4Box>] {
        &self.children
    }
}

/// `meta`: a full box whose payload is a child list (`hdlr`, `ilst`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct MetaBox {
    pub full: FullBoxHeader,
    pub children: Vec<Box<dyn Mp4Box>>,
}

impl ChildLookup for MetaBox {
    fn child_boxes(&self) -> &[Box<dyn Mp4Box>] {
        &self.children
    }
}

impl DecodeBox for MetaBox {
    fn decode_payload(hdr: &BoxHeader, start: u64, r: &mut SliceReader<'_>, reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let first = start + hdr.header_size + FullBoxHeader::SIZE;
        let children = reg.decode_children(first, start + hdr.size, r)?;
        Ok(Self { full, children })
    }
}

impl Mp4Box for MetaBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"meta")
    }

    fn size(&self) -> u64 {
        let payload: u64 = FullBoxHeader::SIZE + self.children.iter().map(|c| c.size()).sum::<u64>();
        box_size_for(payload)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
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

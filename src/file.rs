//! Whole-file view over the top-level box list.

use crate::boxes::{FourCC, Mp4Box};
use crate::error::{Error, Result};
use crate::info::InfoLevels;
use crate::kinds::{ChildLookup, ContainerBox, FtypBox, MdatBox, SidxBox};
use crate::parser::read_box_bytes;
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io::{self, Read};
use tracing::{debug, warn};

/// How the file decoder reacts to a top-level box that fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// The first failure fails the whole decode.
    #[default]
    Strict,
    /// Keep every top-level box decoded before the first failure and record it.
    BestEffort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub mode: DecodeMode,
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self { mode: DecodeMode::Strict }
    }

    pub fn best_effort() -> Self {
        Self {
            mode: DecodeMode::BestEffort,
        }
    }
}

/// A movie fragment: a `moof` and the `mdat` that follows it, if any.
#[derive(Debug, Clone, Copy)]
pub struct Fragment<'a> {
    pub moof: &'a ContainerBox,
    pub mdat: Option<&'a MdatBox>,
}

/// Decoded MP4 file: the ordered top-level boxes.
#[derive(Debug, Default)]
pub struct Mp4File {
    pub boxes: Vec<Box<dyn Mp4Box>>,
    error: Option<Error>,
}

impl Mp4File {
    pub fn new(boxes: Vec<Box<dyn Mp4Box>>) -> Self {
        Self { boxes, error: None }
    }

    /// Decode every top-level box in `data`.
    pub fn decode(data: &[u8], registry: &Registry, options: DecodeOptions) -> Result<Self> {
        let mut r = SliceReader::new(data);
        let end = data.len() as u64;
        let mut file = Self::default();
        while r.remaining() > 0 {
            let pos = r.position() as u64;
            match registry.decode_next(pos, end, &mut r) {
                Ok(b) => file.boxes.push(b),
                Err(e) => return file.stop(e, options),
            }
        }
        debug!(boxes = file.boxes.len(), "decoded file");
        Ok(file)
    }

    /// Stream variant of [`Mp4File::decode`]: reads one top-level box at a time.
    pub fn read_from<R: Read>(r: &mut R, registry: &Registry, options: DecodeOptions) -> Result<Self> {
        let mut file = Self::default();
        let mut pos = 0u64;
        loop {
            let bytes = match read_box_bytes(r, pos) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => break,
                Err(e) => return file.stop(e, options),
            };
            let mut sr = SliceReader::new(&bytes);
            match registry.decode_box(pos, &mut sr) {
                Ok(b) => file.boxes.push(b),
                Err(e) => return file.stop(e, options),
            }
            pos += bytes.len() as u64;
        }
        debug!(boxes = file.boxes.len(), "read file");
        Ok(file)
    }

    fn stop(mut self, err: Error, options: DecodeOptions) -> Result<Self> {
        match options.mode {
            DecodeMode::Strict => Err(err),
            DecodeMode::BestEffort => {
                warn!(kept = self.boxes.len(), error = %err, "stopped decoding at first failure");
                self.error = Some(err);
                Ok(self)
            }
        }
    }

    /// The failure that ended a best-effort decode early.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn ftyp(&self) -> Option<&FtypBox> {
        self.children_of::<FtypBox>().find(|b| b.box_type() == FourCC(*b"ftyp"))
    }

    pub fn moov(&self) -> Option<&ContainerBox> {
        self.container(FourCC(*b"moov"))
    }

    pub fn sidx(&self) -> Option<&SidxBox> {
        self.child::<SidxBox>()
    }

    fn container(&self, typ: FourCC) -> Option<&ContainerBox> {
        self.children_of::<ContainerBox>().find(|c| c.typ == typ)
    }

    /// Every `moof`, each paired with the first `mdat` after it and before the next `moof`.
    pub fn fragments(&self) -> Vec<Fragment<'_>> {
        let moof = FourCC(*b"moof");
        let mut fragments: Vec<Fragment<'_>> = Vec::new();
        for b in &self.boxes {
            if let Some(c) = b.downcast_ref::<ContainerBox>().filter(|c| c.typ == moof) {
                fragments.push(Fragment { moof: c, mdat: None });
            } else if let Some(mdat) = b.downcast_ref::<MdatBox>() {
                if let Some(last) = fragments.last_mut().filter(|f| f.mdat.is_none()) {
                    last.mdat = Some(mdat);
                }
            }
        }
        fragments
    }

    /// True when any `moof` is present or `moov` carries an `mvex`.
    pub fn is_fragmented(&self) -> bool {
        self.container(FourCC(*b"moof")).is_some()
            || self
                .moov()
                .is_some_and(|m| m.child_by_type(FourCC(*b"mvex")).is_some())
    }

    pub fn size(&self) -> u64 {
        self.boxes.iter().map(|b| b.size()).sum()
    }

    /// Concatenation of the encoded top-level boxes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let size = usize::try_from(self.size())
            .map_err(|_| Error::invalid_data(format!("file size {} does not fit in memory", self.size())))?;
        let mut w = SliceWriter::new(size);
        for b in &self.boxes {
            b.encode(&mut w)?;
        }
        w.finish()
    }

    pub fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels) -> Result<()> {
        for b in &self.boxes {
            b.info(w, levels, "", "  ")?;
        }
        Ok(())
    }
}

impl ChildLookup for Mp4File {
    fn child_boxes(&self) -> &[Box<dyn Mp4Box>] {
        &self.boxes
    }
}

//! Sample table leaves of `stbl`.

use crate::boxes::{BoxHeader, DecodeBox, FourCC, FullBoxHeader, Mp4Box, box_size_for};
use crate::error::{Error, Result};
use crate::info::{InfoLevels, write_full_box_line};
use crate::parser::write_box_header;
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io;

/// Read the entry count and make sure exactly that many entries fill the rest of the payload.
fn read_entry_count(r: &mut SliceReader<'_>, entry_size: usize) -> Result<usize> {
    let count = r.read_u32()? as usize;
    if count.checked_mul(entry_size) != Some(r.remaining()) {
        return Err(Error::invalid_data(format!(
            "{count} entries of {entry_size} bytes do not match {} payload bytes",
            r.remaining()
        )));
    }
    Ok(count)
}

fn table_size(entries: usize, entry_size: u64) -> u64 {
    box_size_for(FullBoxHeader::SIZE + 4 + entries as u64 * entry_size)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

/// `stts`: decoding time to sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SttsBox {
    pub full: FullBoxHeader,
    pub entries: Vec<SttsEntry>,
}

impl DecodeBox for SttsBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let count = read_entry_count(r, 8)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(SttsEntry {
                sample_count: r.read_u32()?,
                sample_delta: r.read_u32()?,
            });
        }
        Ok(Self { full, entries })
    }
}

impl Mp4Box for SttsBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"stts")
    }

    fn size(&self) -> u64 {
        table_size(self.entries.len(), 8)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_u32(self.entries.len() as u32)?;
        for e in &self.entries {
            w.write_u32(e.sample_count)?;
            w.write_u32(e.sample_delta)?;
        }
        Ok(())
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let level = write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - entryCount: {}", self.entries.len())?;
        if level >= 1 {
            for (i, e) in self.entries.iter().enumerate() {
                writeln!(w, "{indent} - entry[{}]: count={} delta={}", i + 1, e.sample_count, e.sample_delta)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CttsEntry {
    pub sample_count: u32,
    /// Unsigned in version 0 files; stored as read.
    pub sample_offset: i32,
}

/// `ctts`: composition time offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CttsBox {
    pub full: FullBoxHeader,
    pub entries: Vec<CttsEntry>,
}

impl DecodeBox for CttsBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?.check_version(1)?;
        let count = read_entry_count(r, 8)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(CttsEntry {
                sample_count: r.read_u32()?,
                sample_offset: r.read_i32()?,
            });
        }
        Ok(Self { full, entries })
    }
}

impl Mp4Box for CttsBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"ctts")
    }

    fn size(&self) -> u64 {
        table_size(self.entries.len(), 8)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_u32(self.entries.len() as u32)?;
        for e in &self.entries {
            w.write_u32(e.sample_count)?;
            w.write_i32(e.sample_offset)?;
        }
        Ok(())
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let level = write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - entryCount: {}", self.entries.len())?;
        if level >= 1 {
            for (i, e) in self.entries.iter().enumerate() {
                writeln!(w, "{indent} - entry[{}]: count={} offset={}", i + 1, e.sample_count, e.sample_offset)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StscEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// `stsc`: sample to chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StscBox {
    pub full: FullBoxHeader,
    pub entries: Vec<StscEntry>,
}

impl DecodeBox for StscBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let count = read_entry_count(r, 12)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(StscEntry {
                first_chunk: r.read_u32()?,
                samples_per_chunk: r.read_u32()?,
                sample_description_index: r.read_u32()?,
            });
        }
        Ok(Self { full, entries })
    }
}

impl Mp4Box for StscBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"stsc")
    }

    fn size(&self) -> u64 {
        table_size(self.entries.len(), 12)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_u32(self.entries.len() as u32)?;
        for e in &self.entries {
            w.write_u32(e.first_chunk)?;
            w.write_u32(e.samples_per_chunk)?;
            w.write_u32(e.sample_description_index)?;
        }
        Ok(())
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let level = write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - entryCount: {}", self.entries.len())?;
        if level >= 1 {
            for (i, e) in self.entries.iter().enumerate() {
                writeln!(
                    w,
                    "{indent} - entry[{}]: firstChunk={} samplesPerChunk={} sampleDescriptionID={}",
                    i + 1,
                    e.first_chunk,
                    e.samples_per_chunk,
                    e.sample_description_index
                )?;
            }
        }
        Ok(())
    }
}

/// `stsz`: sample sizes, either one constant size or a per-sample list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StszBox {
    pub full: FullBoxHeader,
    /// Non-zero when all samples share this size; `sample_sizes` is then empty.
    pub sample_size: u32,
    pub sample_count: u32,
    pub sample_sizes: Vec<u32>,
}

impl StszBox {
    pub fn with_sizes(sample_sizes: Vec<u32>) -> Self {
        Self {
            full: FullBoxHeader::default(),
            sample_size: 0,
            sample_count: sample_sizes.len() as u32,
            sample_sizes,
        }
    }

    /// Size of sample `nr` (1-based).
    pub fn get_sample_size(&self, nr: u32) -> Option<u32> {
        if nr == 0 || nr > self.sample_count {
            return None;
        }
        if self.sample_size != 0 {
            return Some(self.sample_size);
        }
        self.sample_sizes.get(nr as usize - 1).copied()
    }
}

impl DecodeBox for StszBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let sample_size = r.read_u32()?;
        let sample_count = r.read_u32()?;
        let mut sample_sizes = Vec::new();
        if sample_size == 0 {
            if (sample_count as usize).checked_mul(4) != Some(r.remaining()) {
                return Err(Error::invalid_data(format!(
                    "{sample_count} sample sizes do not match {} payload bytes",
                    r.remaining()
                )));
            }
            sample_sizes.reserve(sample_count as usize);
            for _ in 0..sample_count {
                sample_sizes.push(r.read_u32()?);
            }
        }
        Ok(Self {
            full,
            sample_size,
            sample_count,
            sample_sizes,
        })
    }
}

impl Mp4Box for StszBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"stsz")
    }

    fn size(&self) -> u64 {
        box_size_for(FullBoxHeader::SIZE + 8 + 4 * self.sample_sizes.len() as u64)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        let expected = if self.sample_size == 0 { self.sample_count as usize } else { 0 };
        if self.sample_sizes.len() != expected {
            return Err(Error::invalid_data(format!(
                "sample count {} but {} sizes",
                self.sample_count,
                self.sample_sizes.len()
            )));
        }
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_u32(self.sample_size)?;
        w.write_u32(self.sample_count)?;
        for s in &self.sample_sizes {
            w.write_u32(*s)?;
        }
        Ok(())
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let level = write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - sampleCount: {}", self.sample_count)?;
        if self.sample_size != 0 {
            writeln!(w, "{indent} - sampleSize: {}", self.sample_size)?;
        } else if level >= 1 {
            for (i, s) in self.sample_sizes.iter().enumerate() {
                writeln!(w, "{indent} - sample[{}] size={s}", i + 1)?;
            }
        }
        Ok(())
    }
}

/// `stco`: 32-bit chunk offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StcoBox {
    pub full: FullBoxHeader,
    pub chunk_offsets: Vec<u32>,
}

impl DecodeBox for StcoBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let count = read_entry_count(r, 4)?;
        let chunk_offsets = (0..count).map(|_| r.read_u32()).collect::<Result<_>>()?;
        Ok(Self { full, chunk_offsets })
    }
}

impl Mp4Box for StcoBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"stco")
    }

    fn size(&self) -> u64 {
        table_size(self.chunk_offsets.len(), 4)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_u32(self.chunk_offsets.len() as u32)?;
        for o in &self.chunk_offsets {
            w.write_u32(*o)?;
        }
        Ok(())
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let level = write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - entryCount: {}", self.chunk_offsets.len())?;
        if level >= 1 {
            for (i, o) in self.chunk_offsets.iter().enumerate() {
                writeln!(w, "{indent} - chunk[{}]: offset={o}", i + 1)?;
            }
        }
        Ok(())
    }
}

/// `co64`: 64-bit chunk offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Co64Box {
    pub full: FullBoxHeader,
    pub chunk_offsets: Vec<u64>,
}

impl DecodeBox for Co64Box {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let count = read_entry_count(r, 8)?;
        let chunk_offsets = (0..count).map(|_| r.read_u64()).collect::<Result<_>>()?;
        Ok(Self { full, chunk_offsets })
    }
}

impl Mp4Box for Co64Box {
    fn box_type(&self) -> FourCC {
        FourCC(*b"co64")
    }

    fn size(&self) -> u64 {
        table_size(self.chunk_offsets.len(), 8)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_u32(self.chunk_offsets.len() as u32)?;
        for o in &self.chunk_offsets {
            w.write_u64(*o)?;
        }
        Ok(())
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let level = write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - entryCount: {}", self.chunk_offsets.len())?;
        if level >= 1 {
            for (i, o) in self.chunk_offsets.iter().enumerate() {
                writeln!(w, "{indent} - chunk[{}]: offset={o}", i + 1)?;
            }
        }
        Ok(())
    }
}

/// `stss`: sync (key frame) sample numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StssBox {
    pub full: FullBoxHeader,
    pub sample_numbers: Vec<u32>,
}

impl StssBox {
    pub fn is_sync_sample(&self, nr: u32) -> bool {
        self.sample_numbers.binary_search(&nr).is_ok()
    }
}

impl DecodeBox for StssBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let count = read_entry_count(r, 4)?;
        let sample_numbers = (0..count).map(|_| r.read_u32()).collect::<Result<_>>()?;
        Ok(Self { full, sample_numbers })
    }
}

impl Mp4Box for StssBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"stss")
    }

    fn size(&self) -> u64 {
        table_size(self.sample_numbers.len(), 4)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_u32(self.sample_numbers.len() as u32)?;
        for n in &self.sample_numbers {
            w.write_u32(*n)?;
        }
        Ok(())
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let level = write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - syncSampleCount: {}", self.sample_numbers.len())?;
        if level >= 1 {
            for n in &self.sample_numbers {
                writeln!(w, "{indent} - syncSample: {n}")?;
            }
        }
        Ok(())
    }
}

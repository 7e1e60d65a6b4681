//! Movie, track and media header boxes.

use crate::bits::BitReader;
use crate::boxes::{BoxHeader, DecodeBox, FourCC, FullBoxHeader, Mp4Box, box_size_for};
use crate::error::{Error, Result};
use crate::info::{InfoLevels, write_full_box_line};
use crate::parser::write_box_header;
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::{SliceWriter, StickyWriter, UNITY_MATRIX};
use std::io;

fn write_matrix(w: &mut StickyWriter<'_>, matrix: &[i32; 9]) {
    if *matrix == UNITY_MATRIX {
        w.write_unity_matrix();
    } else {
        for v in matrix {
            w.write_i32(*v);
        }
    }
}

/// Read a creation/modification/duration style field, 32 or 64 bits by version.
fn read_versioned(r: &mut crate::reader::StickyReader<'_, '_>, version: u8) -> u64 {
    if version == 1 { r.read_u64() } else { u64::from(r.read_u32()) }
}

fn write_versioned(w: &mut StickyWriter<'_>, version: u8, v: u64) {
    if version == 1 { w.write_u64(v) } else { w.write_u32(v as u32) }
}

/// `mvhd`: movie-wide timescale and duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MvhdBox {
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// 16.16 fixed point, 0x00010000 is normal rate.
    pub rate: i32,
    /// 8.8 fixed point.
    pub volume: i16,
    pub matrix: [i32; 9],
    pub next_track_id: u32,
}

impl MvhdBox {
    pub fn new(timescale: u32, duration: u64, next_track_id: u32) -> Self {
        let version = if duration > u64::from(u32::MAX) { 1 } else { 0 };
        Self {
            full: FullBoxHeader::new(version, 0),
            creation_time: 0,
            modification_time: 0,
            timescale,
            duration,
            rate: 0x0001_0000,
            volume: 0x0100,
            matrix: UNITY_MATRIX,
            next_track_id,
        }
    }
}

impl DecodeBox for MvhdBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?.check_version(1)?;
        let mut s = r.sticky();
        let creation_time = read_versioned(&mut s, full.version);
        let modification_time = read_versioned(&mut s, full.version);
        let timescale = s.read_u32();
        let duration = read_versioned(&mut s, full.version);
        let rate = s.read_i32();
        let volume = s.read_i16();
        s.skip(10);
        let mut matrix = [0i32; 9];
        for m in &mut matrix {
            *m = s.read_i32();
        }
        s.skip(24);
        let next_track_id = s.read_u32();
        s.finish()?;
        Ok(Self {
            full,
            creation_time,
            modification_time,
            timescale,
            duration,
            rate,
            volume,
            matrix,
            next_track_id,
        })
    }
}

impl Mp4Box for MvhdBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"mvhd")
    }

    fn size(&self) -> u64 {
        let times = if self.full.version == 1 { 28 } else { 16 };
        box_size_for(FullBoxHeader::SIZE + times + 80)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        self.full
            .check_fits_v0(&[self.creation_time, self.modification_time, self.duration])?;
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        let v = self.full.version;
        let mut s = w.sticky();
        write_versioned(&mut s, v, self.creation_time);
        write_versioned(&mut s, v, self.modification_time);
        s.write_u32(self.timescale);
        write_versioned(&mut s, v, self.duration);
        s.write_i32(self.rate);
        s.write_i16(self.volume);
        s.write_zeros(10);
        write_matrix(&mut s, &self.matrix);
        s.write_zeros(24);
        s.write_u32(self.next_track_id);
        s.finish()
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - timeScale: {}", self.timescale)?;
        writeln!(w, "{indent} - duration: {}", self.duration)?;
        writeln!(w, "{indent} - creationTime: {}", self.creation_time)?;
        writeln!(w, "{indent} - modificationTime: {}", self.modification_time)?;
        writeln!(w, "{indent} - nextTrackID: {}", self.next_track_id)?;
        Ok(())
    }
}

/// `tkhd`: per-track identity, duration and presentation size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TkhdBox {
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    pub track_id: u32,
    pub duration: u64,
    pub layer: i16,
    pub alternate_group: i16,
    pub volume: i16,
    pub matrix: [i32; 9],
    /// 16.16 fixed point.
    pub width: u32,
    /// 16.16 fixed point.
    pub height: u32,
}

impl TkhdBox {
    /// Enabled, in-movie, in-preview track.
    pub fn new(track_id: u32, duration: u64) -> Self {
        let version = if duration > u64::from(u32::MAX) { 1 } else { 0 };
        Self {
            full: FullBoxHeader::new(version, 0x000007),
            creation_time: 0,
            modification_time: 0,
            track_id,
            duration,
            layer: 0,
            alternate_group: 0,
            volume: 0,
            matrix: UNITY_MATRIX,
            width: 0,
            height: 0,
        }
    }
}

impl DecodeBox for TkhdBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?.check_version(1)?;
        let mut s = r.sticky();
        let creation_time = read_versioned(&mut s, full.version);
        let modification_time = read_versioned(&mut s, full.version);
        let track_id = s.read_u32();
        s.skip(4);
        let duration = read_versioned(&mut s, full.version);
        s.skip(8);
        let layer = s.read_i16();
        let alternate_group = s.read_i16();
        let volume = s.read_i16();
        s.skip(2);
        let mut matrix = [0i32; 9];
        for m in &mut matrix {
            *m = s.read_i32();
        }
        let width = s.read_u32();
        let height = s.read_u32();
        s.finish()?;
        Ok(Self {
            full,
            creation_time,
            modification_time,
            track_id,
            duration,
            layer,
            alternate_group,
            volume,
            matrix,
            width,
            height,
        })
    }
}

impl Mp4Box for TkhdBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"tkhd")
    }

    fn size(&self) -> u64 {
        let times = if self.full.version == 1 { 32 } else { 20 };
        box_size_for(FullBoxHeader::SIZE + times + 60)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        self.full
            .check_fits_v0(&[self.creation_time, self.modification_time, self.duration])?;
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        let v = self.full.version;
        let mut s = w.sticky();
        write_versioned(&mut s, v, self.creation_time);
        write_versioned(&mut s, v, self.modification_time);
        s.write_u32(self.track_id);
        s.write_zeros(4);
        write_versioned(&mut s, v, self.duration);
        s.write_zeros(8);
        s.write_i16(self.layer);
        s.write_i16(self.alternate_group);
        s.write_i16(self.volume);
        s.write_zeros(2);
        write_matrix(&mut s, &self.matrix);
        s.write_u32(self.width);
        s.write_u32(self.height);
        s.finish()
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - trackID: {}", self.track_id)?;
        writeln!(w, "{indent} - duration: {}", self.duration)?;
        writeln!(
            w,
            "{indent} - Width x Height: {} x {}",
            f64::from(self.width) / 65536.0,
            f64::from(self.height) / 65536.0
        )?;
        Ok(())
    }
}

/// `mdhd`: media timescale, duration and ISO-639-2/T language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdhdBox {
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// Three lower-case letters, each stored as 5 bits offset by 0x60.
    pub language: [u8; 3],
}

impl MdhdBox {
    pub fn new(timescale: u32, duration: u64, language: &str) -> Result<Self> {
        let b = language.as_bytes();
        if b.len() != 3 || b.iter().any(|c| !(0x60..=0x7f).contains(c)) {
            return Err(Error::invalid_data(format!("bad language code '{language}'")));
        }
        let version = if duration > u64::from(u32::MAX) { 1 } else { 0 };
        Ok(Self {
            full: FullBoxHeader::new(version, 0),
            creation_time: 0,
            modification_time: 0,
            timescale,
            duration,
            language: [b[0], b[1], b[2]],
        })
    }

    pub fn language(&self) -> String {
        self.language.iter().map(|&c| c as char).collect()
    }

    fn packed_language(&self) -> u16 {
        self.language
            .iter()
            .fold(0u16, |acc, &c| (acc << 5) | u16::from(c.wrapping_sub(0x60) & 0x1f))
    }
}

impl DecodeBox for MdhdBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?.check_version(1)?;
        let mut s = r.sticky();
        let creation_time = read_versioned(&mut s, full.version);
        let modification_time = read_versioned(&mut s, full.version);
        let timescale = s.read_u32();
        let duration = read_versioned(&mut s, full.version);
        let packed = s.read_bytes(2);
        s.skip(2);
        s.finish()?;

        let mut bits = BitReader::new(packed);
        bits.read_flag();
        let mut language = [0u8; 3];
        for c in &mut language {
            *c = bits.read_bits(5) as u8 + 0x60;
        }
        bits.finish()?;
        Ok(Self {
            full,
            creation_time,
            modification_time,
            timescale,
            duration,
            language,
        })
    }
}

impl Mp4Box for MdhdBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"mdhd")
    }

    fn size(&self) -> u64 {
        let times = if self.full.version == 1 { 28 } else { 16 };
        box_size_for(FullBoxHeader::SIZE + times + 4)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        self.full
            .check_fits_v0(&[self.creation_time, self.modification_time, self.duration])?;
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        let v = self.full.version;
        let mut s = w.sticky();
        write_versioned(&mut s, v, self.creation_time);
        write_versioned(&mut s, v, self.modification_time);
        s.write_u32(self.timescale);
        write_versioned(&mut s, v, self.duration);
        s.write_u16(self.packed_language());
        s.write_u16(0);
        s.finish()
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - timeScale: {}", self.timescale)?;
        writeln!(w, "{indent} - duration: {}", self.duration)?;
        writeln!(w, "{indent} - language: {}", self.language())?;
        Ok(())
    }
}

//! Movie fragment boxes: `mehd`, `trex`, `mfhd`, `tfhd`, `tfdt`, `trun`.

use crate::boxes::{BoxHeader, DecodeBox, FourCC, FullBoxHeader, Mp4Box, box_size_for};
use crate::error::{Error, Result};
use crate::info::{InfoLevels, write_full_box_line};
use crate::parser::write_box_header;
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io;

/// `mehd`: overall duration of a fragmented movie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MehdBox {
    pub full: FullBoxHeader,
    pub fragment_duration: u64,
}

impl DecodeBox for MehdBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?.check_version(1)?;
        let fragment_duration = if full.version == 1 { r.read_u64()? } else { u64::from(r.read_u32()?) };
        Ok(Self { full, fragment_duration })
    }
}

impl Mp4Box for MehdBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"mehd")
    }

    fn size(&self) -> u64 {
        let d = if self.full.version == 1 { 8 } else { 4 };
        box_size_for(FullBoxHeader::SIZE + d)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        self.full.check_fits_v0(&[self.fragment_duration])?;
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        if self.full.version == 1 {
            w.write_u64(self.fragment_duration)
        } else {
            w.write_u32(self.fragment_duration as u32)
        }
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - fragmentDuration: {}", self.fragment_duration)?;
        Ok(())
    }
}

/// `trex`: per-track defaults for fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrexBox {
    pub full: FullBoxHeader,
    pub track_id: u32,
    pub default_sample_description_index: u32,
    pub default_sample_duration: u32,
    pub default_sample_size: u32,
    pub default_sample_flags: u32,
}

impl TrexBox {
    pub fn new(track_id: u32) -> Self {
        Self {
            track_id,
            default_sample_description_index: 1,
            ..Self::default()
        }
    }
}

impl DecodeBox for TrexBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let mut s = r.sticky();
        let b = Self {
            full,
            track_id: s.read_u32(),
            default_sample_description_index: s.read_u32(),
            default_sample_duration: s.read_u32(),
            default_sample_size: s.read_u32(),
            default_sample_flags: s.read_u32(),
        };
        s.finish()?;
        Ok(b)
    }
}

impl Mp4Box for TrexBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"trex")
    }

    fn size(&self) -> u64 {
        box_size_for(FullBoxHeader::SIZE + 20)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        let mut s = w.sticky();
        s.write_u32(self.track_id);
        s.write_u32(self.default_sample_description_index);
        s.write_u32(self.default_sample_duration);
        s.write_u32(self.default_sample_size);
        s.write_u32(self.default_sample_flags);
        s.finish()
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - trackID: {}", self.track_id)?;
        writeln!(w, "{indent} - defaultSampleDescriptionIndex: {}", self.default_sample_description_index)?;
        writeln!(w, "{indent} - defaultSampleDuration: {}", self.default_sample_duration)?;
        writeln!(w, "{indent} - defaultSampleSize: {}", self.default_sample_size)?;
        writeln!(w, "{indent} - defaultSampleFlags: {:08x}", self.default_sample_flags)?;
        Ok(())
    }
}

/// `mfhd`: fragment sequence number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MfhdBox {
    pub full: FullBoxHeader,
    pub sequence_number: u32,
}

impl MfhdBox {
    pub fn new(sequence_number: u32) -> Self {
        Self {
            full: FullBoxHeader::default(),
            sequence_number,
        }
    }
}

impl DecodeBox for MfhdBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let sequence_number = r.read_u32()?;
        Ok(Self { full, sequence_number })
    }
}

impl Mp4Box for MfhdBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"mfhd")
    }

    fn size(&self) -> u64 {
        box_size_for(FullBoxHeader::SIZE + 4)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        w.write_u32(self.sequence_number)
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - sequenceNumber: {}", self.sequence_number)?;
        Ok(())
    }
}

pub const TFHD_BASE_DATA_OFFSET: u32 = 0x000001;
pub const TFHD_SAMPLE_DESCRIPTION_INDEX: u32 = 0x000002;
pub const TFHD_DEFAULT_SAMPLE_DURATION: u32 = 0x000008;
pub const TFHD_DEFAULT_SAMPLE_SIZE: u32 = 0x000010;
pub const TFHD_DEFAULT_SAMPLE_FLAGS: u32 = 0x000020;
pub const TFHD_DURATION_IS_EMPTY: u32 = 0x010000;
pub const TFHD_DEFAULT_BASE_IS_MOOF: u32 = 0x020000;

const TFHD_FIELD_FLAGS: u32 = TFHD_BASE_DATA_OFFSET
    | TFHD_SAMPLE_DESCRIPTION_INDEX
    | TFHD_DEFAULT_SAMPLE_DURATION
    | TFHD_DEFAULT_SAMPLE_SIZE
    | TFHD_DEFAULT_SAMPLE_FLAGS;

/// `tfhd`: track fragment header.
///
/// Optional fields are `None` when absent. `full.flags` only keeps the bits
/// that carry no field (`duration-is-empty`, `default-base-is-moof`); the
/// encoded flags come from [`TfhdBox::flags`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TfhdBox {
    pub full: FullBoxHeader,
    pub track_id: u32,
    pub base_data_offset: Option<u64>,
    pub sample_description_index: Option<u32>,
    pub default_sample_duration: Option<u32>,
    pub default_sample_size: Option<u32>,
    pub default_sample_flags: Option<u32>,
}

impl TfhdBox {
    /// Header with `default-base-is-moof` set and no optional fields.
    pub fn new(track_id: u32) -> Self {
        Self {
            full: FullBoxHeader::new(0, TFHD_DEFAULT_BASE_IS_MOOF),
            track_id,
            ..Self::default()
        }
    }

    /// Flags as encoded: the stored bits plus one bit per optional field that is set.
    pub fn flags(&self) -> u32 {
        let presence = [
            (self.base_data_offset.is_some(), TFHD_BASE_DATA_OFFSET),
            (self.sample_description_index.is_some(), TFHD_SAMPLE_DESCRIPTION_INDEX),
            (self.default_sample_duration.is_some(), TFHD_DEFAULT_SAMPLE_DURATION),
            (self.default_sample_size.is_some(), TFHD_DEFAULT_SAMPLE_SIZE),
            (self.default_sample_flags.is_some(), TFHD_DEFAULT_SAMPLE_FLAGS),
        ];
        presence
            .iter()
            .filter(|(set, _)| *set)
            .fold(self.full.flags & !TFHD_FIELD_FLAGS, |acc, &(_, bit)| acc | bit)
    }
}

impl DecodeBox for TfhdBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?;
        let f = full.flags;
        let track_id = r.read_u32()?;
        let base_data_offset = if f & TFHD_BASE_DATA_OFFSET != 0 { Some(r.read_u64()?) } else { None };
        let mut opt_u32 = |bit: u32| -> Result<Option<u32>> {
            if f & bit != 0 { r.read_u32().map(Some) } else { Ok(None) }
        };
        Ok(Self {
            full: FullBoxHeader::new(full.version, f & !TFHD_FIELD_FLAGS),
            track_id,
            base_data_offset,
            sample_description_index: opt_u32(TFHD_SAMPLE_DESCRIPTION_INDEX)?,
            default_sample_duration: opt_u32(TFHD_DEFAULT_SAMPLE_DURATION)?,
            default_sample_size: opt_u32(TFHD_DEFAULT_SAMPLE_SIZE)?,
            default_sample_flags: opt_u32(TFHD_DEFAULT_SAMPLE_FLAGS)?,
        })
    }
}

impl Mp4Box for TfhdBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"tfhd")
    }

    fn size(&self) -> u64 {
        let optional = [
            self.sample_description_index,
            self.default_sample_duration,
            self.default_sample_size,
            self.default_sample_flags,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count() as u64
            * 4;
        let base = if self.base_data_offset.is_some() { 8 } else { 0 };
        box_size_for(FullBoxHeader::SIZE + 4 + base + optional)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        FullBoxHeader::new(self.full.version, self.flags()).encode(w)?;
        w.write_u32(self.track_id)?;
        if let Some(v) = self.base_data_offset {
            w.write_u64(v)?;
        }
        for v in [
            self.sample_description_index,
            self.default_sample_duration,
            self.default_sample_size,
            self.default_sample_flags,
        ]
        .into_iter()
        .flatten()
        {
            w.write_u32(v)?;
        }
        Ok(())
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let full = FullBoxHeader::new(self.full.version, self.flags());
        write_full_box_line(w, self, full, levels, indent)?;
        writeln!(w, "{indent} - trackID: {}", self.track_id)?;
        if let Some(v) = self.base_data_offset {
            writeln!(w, "{indent} - baseDataOffset: {v}")?;
        }
        if let Some(v) = self.sample_description_index {
            writeln!(w, "{indent} - sampleDescriptionIndex: {v}")?;
        }
        if let Some(v) = self.default_sample_duration {
            writeln!(w, "{indent} - defaultSampleDuration: {v}")?;
        }
        if let Some(v) = self.default_sample_size {
            writeln!(w, "{indent} - defaultSampleSize: {v}")?;
        }
        if let Some(v) = self.default_sample_flags {
            writeln!(w, "{indent} - defaultSampleFlags: {v:08x}")?;
        }
        Ok(())
    }
}

/// `tfdt`: base media decode time of the first sample in the fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TfdtBox {
    pub full: FullBoxHeader,
    pub base_media_decode_time: u64,
}

impl TfdtBox {
    pub fn new(base_media_decode_time: u64) -> Self {
        let version = if base_media_decode_time > u64::from(u32::MAX) { 1 } else { 0 };
        Self {
            full: FullBoxHeader::new(version, 0),
            base_media_decode_time,
        }
    }
}

impl DecodeBox for TfdtBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?.check_version(1)?;
        let base_media_decode_time = if full.version == 1 { r.read_u64()? } else { u64::from(r.read_u32()?) };
        Ok(Self {
            full,
            base_media_decode_time,
        })
    }
}

impl Mp4Box for TfdtBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"tfdt")
    }

    fn size(&self) -> u64 {
        let t = if self.full.version == 1 { 8 } else { 4 };
        box_size_for(FullBoxHeader::SIZE + t)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        self.full.check_fits_v0(&[self.base_media_decode_time])?;
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        if self.full.version == 1 {
            w.write_u64(self.base_media_decode_time)
        } else {
            w.write_u32(self.base_media_decode_time as u32)
        }
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        writeln!(w, "{indent} - baseMediaDecodeTime: {}", self.base_media_decode_time)?;
        Ok(())
    }
}

pub const TRUN_DATA_OFFSET: u32 = 0x000001;
pub const TRUN_FIRST_SAMPLE_FLAGS: u32 = 0x000004;
pub const TRUN_SAMPLE_DURATION: u32 = 0x000100;
pub const TRUN_SAMPLE_SIZE: u32 = 0x000200;
pub const TRUN_SAMPLE_FLAGS: u32 = 0x000400;
pub const TRUN_SAMPLE_COMPOSITION_TIME_OFFSET: u32 = 0x000800;

/// Upper bound on `sample_count` when no per-sample field is present, so the
/// count is not bounded by the payload length.
pub const TRUN_MAX_FIELDLESS_SAMPLES: usize = 1 << 20;

const TRUN_PER_SAMPLE_BITS: [u32; 4] = [
    TRUN_SAMPLE_DURATION,
    TRUN_SAMPLE_SIZE,
    TRUN_SAMPLE_FLAGS,
    TRUN_SAMPLE_COMPOSITION_TIME_OFFSET,
];

/// One `trun` sample. Fields whose flag is clear in the box are written as nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrunSample {
    pub duration: u32,
    pub size: u32,
    pub flags: u32,
    /// Signed in version 1, unsigned (stored as the same bits) in version 0.
    pub composition_time_offset: i32,
}

/// `trun`: track fragment run.
///
/// `full.flags` selects the per-sample fields. The `data-offset` and
/// `first-sample-flags` bits follow the corresponding `Option`s and are not
/// kept in `full.flags`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrunBox {
    pub full: FullBoxHeader,
    pub data_offset: Option<i32>,
    pub first_sample_flags: Option<u32>,
    pub samples: Vec<TrunSample>,
}

impl TrunBox {
    fn per_sample_size(&self) -> u64 {
        TRUN_PER_SAMPLE_BITS
            .iter()
            .filter(|&&bit| self.full.flags & bit != 0)
            .count() as u64
            * 4
    }

    /// Flags as encoded.
    pub fn flags(&self) -> u32 {
        let mut f = self.full.flags & !(TRUN_DATA_OFFSET | TRUN_FIRST_SAMPLE_FLAGS);
        if self.data_offset.is_some() {
            f |= TRUN_DATA_OFFSET;
        }
        if self.first_sample_flags.is_some() {
            f |= TRUN_FIRST_SAMPLE_FLAGS;
        }
        f
    }

    pub fn sample_count(&self) -> u32 {
        self.samples.len() as u32
    }

    /// Sum of sample durations, or `default_duration` per sample when durations are absent.
    pub fn duration(&self, default_duration: u32) -> u64 {
        if self.full.flags & TRUN_SAMPLE_DURATION == 0 {
            return u64::from(default_duration) * self.samples.len() as u64;
        }
        self.samples.iter().map(|s| u64::from(s.duration)).sum()
    }
}

impl DecodeBox for TrunBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?.check_version(1)?;
        let f = full.flags;
        let sample_count = r.read_u32()? as usize;
        let data_offset = if f & TRUN_DATA_OFFSET != 0 { Some(r.read_i32()?) } else { None };
        let first_sample_flags = if f & TRUN_FIRST_SAMPLE_FLAGS != 0 { Some(r.read_u32()?) } else { None };

        let mut trun = Self {
            full: FullBoxHeader::new(full.version, f & !(TRUN_DATA_OFFSET | TRUN_FIRST_SAMPLE_FLAGS)),
            data_offset,
            first_sample_flags,
            samples: Vec::new(),
        };
        let per_sample = trun.per_sample_size() as usize;
        if per_sample == 0 && sample_count > TRUN_MAX_FIELDLESS_SAMPLES {
            return Err(Error::invalid_data(format!(
                "{sample_count} samples without per-sample fields exceed the limit of {TRUN_MAX_FIELDLESS_SAMPLES}"
            )));
        }
        if sample_count.checked_mul(per_sample) != Some(r.remaining()) {
            return Err(Error::invalid_data(format!(
                "{sample_count} samples of {per_sample} bytes do not match {} payload bytes",
                r.remaining()
            )));
        }
        let mut s = r.sticky();
        trun.samples = (0..sample_count)
            .map(|_| {
                let mut sample = TrunSample::default();
                if f & TRUN_SAMPLE_DURATION != 0 {
                    sample.duration = s.read_u32();
                }
                if f & TRUN_SAMPLE_SIZE != 0 {
                    sample.size = s.read_u32();
                }
                if f & TRUN_SAMPLE_FLAGS != 0 {
                    sample.flags = s.read_u32();
                }
                if f & TRUN_SAMPLE_COMPOSITION_TIME_OFFSET != 0 {
                    sample.composition_time_offset = s.read_i32();
                }
                sample
            })
            .collect();
        s.finish()?;
        Ok(trun)
    }
}

impl Mp4Box for TrunBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"trun")
    }

    fn size(&self) -> u64 {
        let optional = u64::from(self.data_offset.is_some()) * 4 + u64::from(self.first_sample_flags.is_some()) * 4;
        box_size_for(FullBoxHeader::SIZE + 4 + optional + self.per_sample_size() * self.samples.len() as u64)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        write_box_header(w, self.box_type(), self.size())?;
        let f = self.flags();
        FullBoxHeader::new(self.full.version, f).encode(w)?;
        let mut s = w.sticky();
        s.write_u32(self.samples.len() as u32);
        if let Some(v) = self.data_offset {
            s.write_i32(v);
        }
        if let Some(v) = self.first_sample_flags {
            s.write_u32(v);
        }
        for sample in &self.samples {
            if f & TRUN_SAMPLE_DURATION != 0 {
                s.write_u32(sample.duration);
            }
            if f & TRUN_SAMPLE_SIZE != 0 {
                s.write_u32(sample.size);
            }
            if f & TRUN_SAMPLE_FLAGS != 0 {
                s.write_u32(sample.flags);
            }
            if f & TRUN_SAMPLE_COMPOSITION_TIME_OFFSET != 0 {
                s.write_i32(sample.composition_time_offset);
            }
        }
        s.finish()
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        let full = FullBoxHeader::new(self.full.version, self.flags());
        let level = write_full_box_line(w, self, full, levels, indent)?;
        writeln!(w, "{indent} - sampleCount: {}", self.samples.len())?;
        if let Some(v) = self.data_offset {
            writeln!(w, "{indent} - DataOffset: {v}")?;
        }
        if let Some(v) = self.first_sample_flags {
            writeln!(w, "{indent} - firstSampleFlags: {v:08x}")?;
        }
        if level >= 1 {
            for (i, s) in self.samples.iter().enumerate() {
                writeln!(
                    w,
                    "{indent} - sample[{}]: dur={} size={} flags={:08x} compositionTimeOffset={}",
                    i + 1,
                    s.duration,
                    s.size,
                    s.flags,
                    s.composition_time_offset
                )?;
            }
        }
        Ok(())
    }
}

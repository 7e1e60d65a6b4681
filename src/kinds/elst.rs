//! Edit list.

use crate::boxes::{BoxHeader, DecodeBox, FourCC, FullBoxHeader, Mp4Box, box_size_for};
use crate::error::{Error, Result};
use crate::info::{InfoLevels, write_full_box_line};
use crate::parser::write_box_header;
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElstEntry {
    pub segment_duration: u64,
    /// -1 marks an empty edit.
    pub media_time: i64,
    pub media_rate_integer: i16,
    pub media_rate_fraction: i16,
}

/// `elst`: edit list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElstBox {
    pub full: FullBoxHeader,
    pub entries: Vec<ElstEntry>,
}

impl DecodeBox for ElstBox {
    fn decode_payload(_hdr: &BoxHeader, _start: u64, r: &mut SliceReader<'_>, _reg: &Registry) -> Result<Self> {
        let full = FullBoxHeader::decode(r)?.check_version(1)?;
        let entry_count = r.read_u32()? as usize;
        let entry_size = if full.version == 1 { 20 } else { 12 };
        if entry_count.checked_mul(entry_size) != Some(r.remaining()) {
            return Err(Error::invalid_data(format!(
                "{entry_count} entries of {entry_size} bytes do not match {} payload bytes",
                r.remaining()
            )));
        }
        let mut s = r.sticky();
        let entries = (0..entry_count)
            .map(|_| {
                let (segment_duration, media_time) = if full.version == 1 {
                    (s.read_u64(), s.read_i64())
                } else {
                    (u64::from(s.read_u32()), i64::from(s.read_i32()))
                };
                ElstEntry {
                    segment_duration,
                    media_time,
                    media_rate_integer: s.read_i16(),
                    media_rate_fraction: s.read_i16(),
                }
            })
            .collect();
        s.finish()?;
        Ok(Self { full, entries })
    }
}

impl Mp4Box for ElstBox {
    fn box_type(&self) -> FourCC {
        FourCC(*b"elst")
    }

    fn size(&self) -> u64 {
        let entry_size = if self.full.version == 1 { 20 } else { 12 };
        box_size_for(FullBoxHeader::SIZE + 4 + entry_size * self.entries.len() as u64)
    }

    fn encode(&self, w: &mut SliceWriter) -> Result<()> {
        if self.full.version == 0 {
            for e in &self.entries {
                self.full.check_fits_v0(&[e.segment_duration])?;
                if i32::try_from(e.media_time).is_err() {
                    return Err(Error::invalid_data(format!(
                        "media time {} does not fit a version 0 elst",
                        e.media_time
                    )));
                }
            }
        }
        write_box_header(w, self.box_type(), self.size())?;
        self.full.encode(w)?;
        let mut s = w.sticky();
        s.write_u32(self.entries.len() as u32);
        for e in &self.entries {
            if self.full.version == 1 {
                s.write_u64(e.segment_duration);
                s.write_i64(e.media_time);
            } else {
                s.write_u32(e.segment_duration as u32);
                s.write_i32(e.media_time as i32);
            }
            s.write_i16(e.media_rate_integer);
            s.write_i16(e.media_rate_fraction);
        }
        s.finish()
    }

    fn info(&self, w: &mut dyn io::Write, levels: &InfoLevels, indent: &str, _indent_step: &str) -> Result<()> {
        write_full_box_line(w, self, self.full, levels, indent)?;
        for (i, e) in self.entries.iter().enumerate() {
            writeln!(
                w,
                "{indent} - entry[{}]: segmentDuration={} mediaTime={} mediaRate={}.{}",
                i + 1,
                e.segment_duration,
                e.media_time,
                e.media_rate_integer,
                e.media_rate_fraction
            )?;
        }
        Ok(())
    }
}

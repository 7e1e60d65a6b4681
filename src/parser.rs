//! Box header codec, child-list decoding and the stream adapters.

use crate::boxes::{BoxHeader, FourCC, Mp4Box, header_size_for};
use crate::error::{Error, Result};
use crate::reader::SliceReader;
use crate::registry::Registry;
use crate::writer::SliceWriter;
use std::io::{self, Read, Write};

/// Decode a box header. Size 1 selects the 64-bit large size; size 0 is rejected.
pub fn read_box_header(r: &mut SliceReader<'_>) -> Result<BoxHeader> {
    let size32 = r.read_u32()?;
    let typ = r.read_fourcc()?;
    let (size, header_size) = match size32 {
        0 => return Err(Error::SizeExtendsToEof),
        1 => (r.read_u64()?, 16),
        n => (u64::from(n), 8),
    };
    if size < header_size {
        return Err(Error::InvalidSize { size, header_len: header_size });
    }
    Ok(BoxHeader { typ, size, header_size })
}

/// Encode a header for a box of `total_size` bytes.
///
/// The large-size form is used exactly when `total_size >= 2^32`.
pub fn write_box_header(w: &mut SliceWriter, typ: FourCC, total_size: u64) -> Result<()> {
    if total_size >= 1 << 32 {
        w.write_u32(1)?;
        w.write_fourcc(typ)?;
        w.write_u64(total_size)
    } else {
        w.write_u32(total_size as u32)?;
        w.write_fourcc(typ)
    }
}

/// Size of a pure container: header plus the sum of its children.
pub fn container_size(children: &[Box<dyn Mp4Box>]) -> u64 {
    let payload: u64 = children.iter().map(|c| c.size()).sum();
    header_size_for(payload) + payload
}

/// Encode children in their stored order.
pub fn encode_children(children: &[Box<dyn Mp4Box>], w: &mut SliceWriter) -> Result<()> {
    for c in children {
        c.encode(w)?;
    }
    Ok(())
}

/// Encode a header followed by the children, as for a pure container.
pub fn encode_container(typ: FourCC, children: &[Box<dyn Mp4Box>], w: &mut SliceWriter) -> Result<()> {
    write_box_header(w, typ, container_size(children))?;
    encode_children(children, w)
}

/// Encode a box into a freshly allocated buffer of exactly `size()` bytes.
pub fn encode_box(b: &dyn Mp4Box) -> Result<Vec<u8>> {
    let size = usize::try_from(b.size())
        .map_err(|_| Error::invalid_data(format!("box size {} does not fit in memory", b.size())))?;
    let mut w = SliceWriter::new(size);
    b.encode(&mut w)?;
    w.finish()
}

/// Stream adapter: encode through the slice writer and write the bytes once.
pub fn write_box<W: Write>(b: &dyn Mp4Box, out: &mut W) -> Result<()> {
    out.write_all(&encode_box(b)?)?;
    Ok(())
}

/// Read into `buf` until it is full or the stream ends; returns the byte count read.
fn fill<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        match r.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(got)
}

fn read_stream_header<R: Read>(r: &mut R, buf: &mut Vec<u8>) -> Result<Option<BoxHeader>> {
    let mut head = [0u8; 16];
    let got = fill(r, &mut head[..8])?;
    if got == 0 {
        return Ok(None);
    }
    if got < 8 {
        return Err(Error::Truncated {
            position: 0,
            needed: 8,
            available: got,
        });
    }
    let mut header_len = 8;
    if head[..4] == [0, 0, 0, 1] {
        let got = fill(r, &mut head[8..])?;
        if got < 8 {
            return Err(Error::Truncated {
                position: 8,
                needed: 8,
                available: got,
            });
        }
        header_len = 16;
    }
    buf.extend_from_slice(&head[..header_len]);
    read_box_header(&mut SliceReader::new(buf.as_slice())).map(Some)
}

/// Stream adapter: read one complete box (header and payload) into memory.
///
/// `start` is the stream offset of the box and is only used for error context.
/// Returns `Ok(None)` at a clean end of stream. The buffer grows with the bytes
/// actually read, so a declared size larger than the stream is reported as
/// `Truncated` rather than allocated up front.
pub fn read_box_bytes<R: Read>(r: &mut R, start: u64) -> Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    let hdr = match read_stream_header(r, &mut buf) {
        Ok(Some(hdr)) => hdr,
        Ok(None) => return Ok(None),
        Err(e) => {
            return Err(Error::InHeader {
                offset: start,
                inner: Box::new(e),
            });
        }
    };
    let payload = hdr.size - hdr.header_size;
    r.by_ref()
        .take(payload)
        .read_to_end(&mut buf)
        .map_err(|e| Error::from(e).in_box(hdr.typ, start))?;
    let got = (buf.len() as u64 - hdr.header_size) as usize;
    if (got as u64) < payload {
        let needed = usize::try_from(payload).unwrap_or(usize::MAX);
        return Err(Error::Truncated {
            position: hdr.header_size as usize,
            needed,
            available: got,
        }
        .in_box(hdr.typ, start));
    }
    Ok(Some(buf))
}

impl Registry {
    /// Stream adapter over [`Registry::decode_box`]. `start` is only used for error context.
    pub fn read_box<R: Read>(&self, start: u64, r: &mut R) -> Result<Option<Box<dyn Mp4Box>>> {
        let Some(bytes) = read_box_bytes(r, start)? else {
            return Ok(None);
        };
        let mut sr = SliceReader::new(&bytes);
        self.decode_box(start, &mut sr).map(Some)
    }

    /// Decode the box at absolute offset `pos`, which must end at or before `end`.
    ///
    /// A box whose declared size runs past `end` is reported as `ChildOverrun`
    /// before its payload is touched.
    pub fn decode_next(&self, pos: u64, end: u64, r: &mut SliceReader<'_>) -> Result<Box<dyn Mp4Box>> {
        let hdr = read_box_header(&mut r.clone()).map_err(|e| Error::InHeader {
            offset: pos,
            inner: Box::new(e),
        })?;
        if pos.checked_add(hdr.size).is_none_or(|box_end| box_end > end) {
            return Err(Error::ChildOverrun {
                typ: hdr.typ,
                size: hdr.size,
                offset: pos,
                end,
            });
        }
        self.decode_box(pos, r)
    }

    /// Decode children from `r` until absolute offset `end` is reached.
    ///
    /// `start` is the absolute offset of the first child.
    pub fn decode_children(
        &self,
        start: u64,
        end: u64,
        r: &mut SliceReader<'_>,
    ) -> Result<Vec<Box<dyn Mp4Box>>> {
        let mut children = Vec::new();
        let base = r.position() as u64;
        let mut pos = start;
        while pos < end {
            children.push(self.decode_next(pos, end, r)?);
            pos = start + (r.position() as u64 - base);
        }
        Ok(children)
    }

    /// Decode every box in `data`, treating it as a sequence of siblings at offset 0.
    pub fn decode_all(&self, data: &[u8]) -> Result<Vec<Box<dyn Mp4Box>>> {
        let mut r = SliceReader::new(data);
        self.decode_children(0, data.len() as u64, &mut r)
    }
}

//! Tag to decoder dispatch.

use crate::boxes::{BoxHeader, DecodeBox, FourCC, Mp4Box};
use crate::error::{Error, Result};
use crate::kinds::*;
use crate::parser::read_box_header;
use crate::reader::SliceReader;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

/// Trait for box decoders.
///
/// A decoder gets the already decoded header, the absolute offset of the box
/// start, and a reader bounded to exactly the payload. It must consume the
/// whole payload. Closures with the same signature implement this trait.
pub trait BoxDecoder: Send + Sync {
    fn decode(
        &self,
        hdr: &BoxHeader,
        start: u64,
        payload: &mut SliceReader<'_>,
        reg: &Registry,
    ) -> Result<Box<dyn Mp4Box>>;
}

impl<F> BoxDecoder for F
where
    F: Fn(&BoxHeader, u64, &mut SliceReader<'_>, &Registry) -> Result<Box<dyn Mp4Box>> + Send + Sync,
{
    fn decode(
        &self,
        hdr: &BoxHeader,
        start: u64,
        payload: &mut SliceReader<'_>,
        reg: &Registry,
    ) -> Result<Box<dyn Mp4Box>> {
        self(hdr, start, payload, reg)
    }
}

/// Adapts any [`DecodeBox`] type into a [`BoxDecoder`].
pub struct TypedDecoder<T>(PhantomData<fn() -> T>);

impl<T> TypedDecoder<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for TypedDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DecodeBox> BoxDecoder for TypedDecoder<T> {
    fn decode(
        &self,
        hdr: &BoxHeader,
        start: u64,
        payload: &mut SliceReader<'_>,
        reg: &Registry,
    ) -> Result<Box<dyn Mp4Box>> {
        Ok(Box::new(T::decode_payload(hdr, start, payload, reg)?))
    }
}

/// A registered decoder, as handed back by [`Registry::unregister`] so it can be restored.
#[derive(Clone)]
pub struct RegisteredDecoder {
    inner: Arc<dyn BoxDecoder>,
    name: String,
}

impl RegisteredDecoder {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for RegisteredDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredDecoder").field("name", &self.name).finish()
    }
}

/// Mapping from box type to decoder.
///
/// A registry is plain configuration: build it once (usually with
/// [`default_registry`]) and share it by reference. Mutation needs `&mut`, so
/// a registry shared across threads has to be wrapped by the caller.
#[derive(Clone, Default)]
pub struct Registry {
    map: HashMap<FourCC, RegisteredDecoder>,
}

impl Registry {
    /// Create an empty registry. Every box decodes as [`UnknownBox`].
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    /// Return a new registry with the given decoder added.
    ///
    /// `name` is human-readable and used only for debugging / logging.
    pub fn with_decoder(mut self, typ: FourCC, name: &str, dec: impl BoxDecoder + 'static) -> Self {
        self.register(typ, name, dec);
        self
    }

    /// Builder shorthand for registering a [`DecodeBox`] type under one or more tags.
    pub fn with_box<T: DecodeBox>(mut self, tags: &[&[u8; 4]]) -> Self {
        for tag in tags {
            let typ = FourCC(**tag);
            self.register(typ, &typ.as_str_lossy(), TypedDecoder::<T>::new());
        }
        self
    }

    /// Add or replace the decoder for `typ`, returning the one it displaced.
    pub fn register(
        &mut self,
        typ: FourCC,
        name: &str,
        dec: impl BoxDecoder + 'static,
    ) -> Option<RegisteredDecoder> {
        debug!(%typ, name, "registering box decoder");
        self.map.insert(
            typ,
            RegisteredDecoder {
                inner: Arc::new(dec),
                name: name.to_string(),
            },
        )
    }

    /// Remove the decoder for `typ`. Pass the result to [`Registry::restore`] to undo.
    pub fn unregister(&mut self, typ: FourCC) -> Option<RegisteredDecoder> {
        debug!(%typ, "removing box decoder");
        self.map.remove(&typ)
    }

    /// Put back a decoder previously returned by `unregister` or `register`.
    pub fn restore(&mut self, typ: FourCC, dec: RegisteredDecoder) -> Option<RegisteredDecoder> {
        self.map.insert(typ, dec)
    }

    pub fn contains(&self, typ: FourCC) -> bool {
        self.map.contains_key(&typ)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Decode one box at the current position of `r`.
    ///
    /// `start` is the absolute offset of the box in the stream. The decoder
    /// only sees a reader bounded to the payload, and any failure is wrapped
    /// with the box type and `start`. Types without a decoder become
    /// [`UnknownBox`].
    pub fn decode_box(&self, start: u64, r: &mut SliceReader<'_>) -> Result<Box<dyn Mp4Box>> {
        let hdr = read_box_header(r).map_err(|e| Error::InHeader {
            offset: start,
            inner: Box::new(e),
        })?;
        let payload_len = usize::try_from(hdr.payload_size()).map_err(|_| {
            Error::invalid_data(format!("payload of {} bytes does not fit in memory", hdr.payload_size()))
                .in_box(hdr.typ, start)
        })?;
        let mut payload = r.sub_reader(payload_len).map_err(|e| e.in_box(hdr.typ, start))?;

        let decoded = match self.map.get(&hdr.typ) {
            Some(entry) => {
                trace!(typ = %hdr.typ, start, size = hdr.size, decoder = %entry.name, "decoding box");
                entry.inner.decode(&hdr, start, &mut payload, self)
            }
            None => {
                debug!(typ = %hdr.typ, start, size = hdr.size, "no decoder registered, keeping raw payload");
                UnknownBox::decode_payload(&hdr, start, &mut payload, self).map(|b| Box::new(b) as Box<dyn Mp4Box>)
            }
        };
        let b = decoded.map_err(|e| e.in_box(hdr.typ, start))?;
        if payload.remaining() != 0 {
            return Err(Error::TrailingBytes {
                unread: payload.remaining(),
            }
            .in_box(hdr.typ, start));
        }
        Ok(b)
    }
}

/// Registry holding every built-in box kind.
pub fn default_registry() -> Registry {
    Registry::new()
        .with_box::<ContainerBox>(&[
            b"moov", b"trak", b"mdia", b"minf", b"stbl", b"dinf", b"edts", b"udta", b"mvex", b"moof", b"traf",
            b"mfra", b"schi", b"sinf",
        ])
        .with_box::<MetaBox>(&[b"meta"])
        .with_box::<FtypBox>(&[b"ftyp", b"styp"])
        .with_box::<FreeBox>(&[b"free", b"skip"])
        .with_box::<MdatBox>(&[b"mdat"])
        .with_box::<UuidBox>(&[b"uuid"])
        .with_box::<MvhdBox>(&[b"mvhd"])
        .with_box::<TkhdBox>(&[b"tkhd"])
        .with_box::<MdhdBox>(&[b"mdhd"])
        .with_box::<HdlrBox>(&[b"hdlr"])
        .with_box::<VmhdBox>(&[b"vmhd"])
        .with_box::<SmhdBox>(&[b"smhd"])
        .with_box::<DrefBox>(&[b"dref"])
        .with_box::<UrlBox>(&[b"url "])
        .with_box::<ElstBox>(&[b"elst"])
        .with_box::<StsdBox>(&[b"stsd"])
        .with_box::<VisualSampleEntryBox>(&[b"avc1", b"avc3", b"hvc1", b"hev1", b"av01", b"vp09", b"encv"])
        .with_box::<AudioSampleEntryBox>(&[b"mp4a", b"ac-3", b"ec-3", b"Opus", b"enca"])
        .with_box::<SttsBox>(&[b"stts"])
        .with_box::<CttsBox>(&[b"ctts"])
        .with_box::<StscBox>(&[b"stsc"])
        .with_box::<StszBox>(&[b"stsz"])
        .with_box::<StcoBox>(&[b"stco"])
        .with_box::<Co64Box>(&[b"co64"])
        .with_box::<StssBox>(&[b"stss"])
        .with_box::<SidxBox>(&[b"sidx"])
        .with_box::<MehdBox>(&[b"mehd"])
        .with_box::<TrexBox>(&[b"trex"])
        .with_box::<MfhdBox>(&[b"mfhd"])
        .with_box::<TfhdBox>(&[b"tfhd"])
        .with_box::<TfdtBox>(&[b"tfdt"])
        .with_box::<TrunBox>(&[b"trun"])
}

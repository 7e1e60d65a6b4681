//! Built-in box kinds.

mod container;
mod dref;
mod elst;
mod fragment;
mod free;
mod ftyp;
mod hdlr;
mod headers;
mod sample_tables;
mod sidx;
mod stsd;
mod unknown;

pub use container::{ChildLookup, ContainerBox, MetaBox};
pub use dref::{DrefBox, SELF_CONTAINED, UrlBox};
pub use elst::{ElstBox, ElstEntry};
pub use fragment::{
    MehdBox, MfhdBox, TFHD_BASE_DATA_OFFSET, TFHD_DEFAULT_BASE_IS_MOOF, TFHD_DEFAULT_SAMPLE_DURATION,
    TFHD_DEFAULT_SAMPLE_FLAGS, TFHD_DEFAULT_SAMPLE_SIZE, TFHD_DURATION_IS_EMPTY, TFHD_SAMPLE_DESCRIPTION_INDEX,
    TRUN_DATA_OFFSET, TRUN_FIRST_SAMPLE_FLAGS, TRUN_MAX_FIELDLESS_SAMPLES, TRUN_SAMPLE_COMPOSITION_TIME_OFFSET,
    TRUN_SAMPLE_DURATION, TRUN_SAMPLE_FLAGS, TRUN_SAMPLE_SIZE, TfdtBox, TfhdBox, TrexBox, TrunBox, TrunSample,
};
pub use free::{FreeBox, MdatBox};
pub use ftyp::FtypBox;
pub use hdlr::{HdlrBox, SmhdBox, VmhdBox};
pub use headers::{MdhdBox, MvhdBox, TkhdBox};
pub use sample_tables::{
    Co64Box, CttsBox, CttsEntry, StcoBox, StscBox, StscEntry, StssBox, StszBox, SttsBox, SttsEntry,
};
pub use sidx::{SidxBox, SidxReference};
pub use stsd::{AudioSampleEntryBox, StsdBox, VisualSampleEntryBox};
pub use unknown::{UnknownBox, UuidBox};

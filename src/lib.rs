//! ISOBMFF (MP4) box codec.
//!
//! Bytes are decoded into a tree of typed boxes through a [`Registry`] that
//! maps four-character codes to decoders. Every decoded tree re-encodes to
//! the exact bytes it came from, boxes can be built or edited in memory, and
//! tags without a decoder are kept as [`kinds::UnknownBox`].

pub mod bits;
pub mod boxes;
pub mod error;
pub mod file;
pub mod info;
pub mod kinds;
pub mod parser;
pub mod reader;
pub mod registry;
pub mod summary;
pub mod util;
pub mod writer;

pub use boxes::{BoxHeader, DecodeBox, FourCC, FullBoxHeader, Mp4Box};
pub use error::{Error, Result};
pub use file::{DecodeMode, DecodeOptions, Fragment, Mp4File};
pub use info::InfoLevels;
pub use kinds::ChildLookup;
pub use parser::{encode_box, read_box_header, write_box, write_box_header};
pub use reader::SliceReader;
pub use registry::{BoxDecoder, Registry, default_registry};
pub use summary::{BoxSummary, summarize};
pub use writer::SliceWriter;

//! Keyword record codec.
//!
//! Leaf-first: byte order and element types, Fortran record framing, the
//! formatted text layout, single records, then whole keyword streams.

pub mod endian;
pub mod formatted;
pub mod fortio;
pub mod mmap;
pub mod record;
pub mod source;
pub mod stream;
pub mod types;

pub use crate::error::{Error, Result};
pub use endian::{ByteOrder, ByteOrderProvider, Endian, NativeByteOrder};
pub use mmap::MmapFile;
pub use record::{read_record, skip_record, write_record, FileMode, Record};
pub use stream::{classify, FileInfo, FileKind, KeywordReader, KeywordWriter, StreamConfig};
pub use types::{decode_elements, element_size, encode_elements, string8_eq, ElementData, KeywordName, TypeTag};

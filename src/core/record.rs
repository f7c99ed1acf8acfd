//! Single keyword records and their on-disk codec.
//!
//! Unformatted layout:
//!
//! ```text
//! [16] NAME(8) COUNT(i32) TYPE(4) [16]
//! [n*size] elements 0..block [n*size]
//! [n*size] elements block..2*block [n*size]
//! ...
//! ```
//!
//! Data is split into records of at most [`TypeTag::block_len`] elements.
//! Payload bytes held by a [`Record`] are always in host order; the stream's
//! flip flag is applied at the read/write boundary.

use std::io::{BufRead, Seek, Write};

use crate::core::endian::Endian;
use crate::core::formatted;
use crate::core::fortio;
use crate::core::source::ByteSource;
use crate::core::types::{decode_elements, encode_elements, ElementData, KeywordName, TypeTag, STRING8_LEN, TYPE_NAME_LEN};
use crate::core::{Error, Result};

/// Size of the header record payload.
pub const HEADER_PAYLOAD_LEN: usize = STRING8_LEN + 4 + TYPE_NAME_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    Unformatted,
    Formatted,
}

/// One named, typed keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    name: KeywordName,
    tag: TypeTag,
    count: u32,
    payload: Vec<u8>,
}

impl Record {
    pub fn new(name: &str, data: ElementData) -> Result<Self> {
        let name = KeywordName::new(name)?;
        Self::from_data(name, &data)
    }

    pub fn from_data(name: KeywordName, data: &ElementData) -> Result<Self> {
        let count = u32::try_from(data.len())
            .ok()
            .filter(|c| *c <= i32::MAX as u32)
            .ok_or_else(|| Error::write("element count exceeds i32 range"))?;
        let payload = encode_elements(data, Endian::NATIVE)?;
        Ok(Self {
            name,
            tag: data.tag(),
            count,
            payload,
        })
    }

    /// Build from host-order payload bytes.
    pub fn from_raw(name: KeywordName, tag: TypeTag, count: u32, payload: Vec<u8>) -> Result<Self> {
        if payload.len() != count as usize * tag.element_size() {
            return Err(Error::decode(format!(
                "{name}: payload is {} bytes, expected {} for {count} {tag} elements",
                payload.len(),
                count as usize * tag.element_size()
            )));
        }
        Ok(Self {
            name,
            tag,
            count,
            payload,
        })
    }

    pub fn name(&self) -> &KeywordName {
        &self.name
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == *name
    }

    pub fn values(&self) -> Result<ElementData> {
        decode_elements(self.tag, &self.payload, self.count as usize, Endian::NATIVE)
    }

    fn expect_tag(&self, tag: TypeTag) -> Result<()> {
        if self.tag != tag {
            return Err(Error::decode(format!("{}: expected {tag} data, found {}", self.name, self.tag)));
        }
        Ok(())
    }

    pub fn as_i32(&self) -> Result<Vec<i32>> {
        self.expect_tag(TypeTag::Int32)?;
        match self.values()? {
            ElementData::Int32(v) => Ok(v),
            _ => Err(Error::decode("type mismatch")),
        }
    }

    pub fn as_f32(&self) -> Result<Vec<f32>> {
        self.expect_tag(TypeTag::Float32)?;
        match self.values()? {
            ElementData::Float32(v) => Ok(v),
            _ => Err(Error::decode("type mismatch")),
        }
    }

    pub fn as_f64(&self) -> Result<Vec<f64>> {
        self.expect_tag(TypeTag::Float64)?;
        match self.values()? {
            ElementData::Float64(v) => Ok(v),
            _ => Err(Error::decode("type mismatch")),
        }
    }

    pub fn as_strings(&self) -> Result<Vec<String>> {
        match self.values()? {
            ElementData::Char8(v) => Ok(v),
            ElementData::Message(s) => Ok(vec![s]),
            _ => Err(Error::decode(format!("{}: expected character data, found {}", self.name, self.tag))),
        }
    }

    /// Numeric payload widened to f64 regardless of the stored precision.
    pub fn as_f64_lossy(&self) -> Result<Vec<f64>> {
        self.values()?
            .to_f64_vec()
            .ok_or_else(|| Error::decode(format!("{}: expected numeric data, found {}", self.name, self.tag)))
    }
}

/// Decode one record. `None` at a clean end of input; any partial record is
/// an error.
pub fn read_record<R: BufRead + Seek>(
    src: &mut ByteSource<R>,
    mode: FileMode,
    endian: Endian,
) -> Result<Option<Record>> {
    match mode {
        FileMode::Unformatted => read_unformatted(src, endian),
        FileMode::Formatted => {
            let Some((name, count, tag)) = formatted::read_header(src)? else {
                return Ok(None);
            };
            let data = formatted::read_values(src, tag, count)?;
            Ok(Some(Record::from_data(name, &data)?))
        }
    }
}

fn read_unformatted_header<R: BufRead + Seek>(
    src: &mut ByteSource<R>,
    endian: Endian,
) -> Result<Option<(KeywordName, u32, TypeTag)>> {
    let Some(len) = fortio::begin_frame(src, endian)? else {
        return Ok(None);
    };
    if len != HEADER_PAYLOAD_LEN {
        return Err(Error::decode(format!(
            "keyword header record of {len} bytes, expected {HEADER_PAYLOAD_LEN}"
        )));
    }
    let mut header = [0u8; HEADER_PAYLOAD_LEN];
    src.read_exact(&mut header)?;
    fortio::end_frame(src, endian, len)?;

    let mut name = [0u8; STRING8_LEN];
    name.copy_from_slice(&header[..STRING8_LEN]);
    let count = endian.read_i32([header[8], header[9], header[10], header[11]]);
    if count < 0 {
        return Err(Error::decode(format!("negative element count {count}")));
    }
    let tag = TypeTag::from_disk_name(&header[12..16])?;
    Ok(Some((KeywordName::from_padded(&name), count as u32, tag)))
}

fn read_unformatted<R: BufRead + Seek>(src: &mut ByteSource<R>, endian: Endian) -> Result<Option<Record>> {
    let Some((name, count, tag)) = read_unformatted_header(src, endian)? else {
        return Ok(None);
    };
    let size = tag.element_size();
    let total = count as usize * size;
    let mut payload = Vec::new();
    let mut frame = Vec::new();
    while payload.len() < total {
        let remaining = total - payload.len();
        let block_bytes = remaining.min(tag.block_len() * size);
        fortio::read_frame_exact(src, endian, block_bytes, &mut frame)?;
        payload.extend_from_slice(&frame);
    }
    endian.apply(tag, &mut payload);
    Ok(Some(Record {
        name,
        tag,
        count,
        payload,
    }))
}

/// Advance past one record, returning its header. Unformatted data records
/// are skipped with seeks but their markers are still validated.
pub fn skip_record<R: BufRead + Seek>(
    src: &mut ByteSource<R>,
    mode: FileMode,
    endian: Endian,
) -> Result<Option<(KeywordName, u32, TypeTag)>> {
    match mode {
        FileMode::Formatted => Ok(read_record(src, mode, endian)?.map(|r| (r.name, r.count, r.tag))),
        FileMode::Unformatted => {
            let Some((name, count, tag)) = read_unformatted_header(src, endian)? else {
                return Ok(None);
            };
            let size = tag.element_size();
            let mut remaining = count as usize * size;
            while remaining > 0 {
                let len = fortio::skip_frame(src, endian)?.ok_or(Error::TruncatedRecord)?;
                if len > remaining || len % size != 0 {
                    return Err(Error::decode(format!("{name}: data record of {len} bytes does not fit")));
                }
                remaining -= len;
            }
            Ok(Some((name, count, tag)))
        }
    }
}

/// Encode one record. Returns bytes written.
pub fn write_record<W: Write>(out: &mut W, mode: FileMode, endian: Endian, record: &Record) -> Result<u64> {
    match mode {
        FileMode::Formatted => formatted::write_keyword(out, &record.name, &record.values()?),
        FileMode::Unformatted => {
            let mut header = [0u8; HEADER_PAYLOAD_LEN];
            header[..STRING8_LEN].copy_from_slice(&record.name.padded());
            header[8..12].copy_from_slice(&endian.write_i32(record.count as i32));
            header[12..16].copy_from_slice(record.tag.disk_name());
            let mut written = fortio::write_frame(out, endian, &header)?;

            let mut payload = record.payload.clone();
            endian.apply(record.tag, &mut payload);
            let block_bytes = record.tag.block_len() * record.tag.element_size();
            for chunk in payload.chunks(block_bytes) {
                written += fortio::write_frame(out, endian, chunk)?;
            }
            Ok(written)
        }
    }
}

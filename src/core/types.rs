//! Element type tags and the element codec.

use std::borrow::Borrow;
use std::fmt;

use crate::core::endian::Endian;
use crate::core::{Error, Result};

/// Width of names and character elements on disk.
pub const STRING8_LEN: usize = 8;
/// Width of the type string in a keyword header.
pub const TYPE_NAME_LEN: usize = 4;

const BLOCK_LEN_NUMERIC: usize = 1000;
const BLOCK_LEN_CHAR: usize = 105;

const BOOL_TRUE_INT: i32 = -1;
const BOOL_FALSE_INT: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    Int32,
    Float32,
    Float64,
    Char8,
    Bool,
    Message,
}

impl TypeTag {
    pub const ALL: [TypeTag; 6] = [
        TypeTag::Int32,
        TypeTag::Float32,
        TypeTag::Float64,
        TypeTag::Char8,
        TypeTag::Bool,
        TypeTag::Message,
    ];

    #[inline]
    pub const fn element_size(self) -> usize {
        match self {
            TypeTag::Int32 | TypeTag::Float32 | TypeTag::Bool => 4,
            TypeTag::Float64 | TypeTag::Char8 | TypeTag::Message => 8,
        }
    }

    pub const fn disk_name(self) -> &'static [u8; TYPE_NAME_LEN] {
        match self {
            TypeTag::Int32 => b"INTE",
            TypeTag::Float32 => b"REAL",
            TypeTag::Float64 => b"DOUB",
            TypeTag::Char8 => b"CHAR",
            TypeTag::Bool => b"LOGI",
            TypeTag::Message => b"MESS",
        }
    }

    pub fn from_disk_name(name: &[u8]) -> Result<Self> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.disk_name().as_slice() == name)
            .ok_or_else(|| Error::UnknownTypeTag(String::from_utf8_lossy(name).into_owned()))
    }

    /// Maximum number of elements stored in one data record.
    pub const fn block_len(self) -> usize {
        match self {
            TypeTag::Char8 | TypeTag::Message => BLOCK_LEN_CHAR,
            _ => BLOCK_LEN_NUMERIC,
        }
    }

    /// Elements per line in formatted files.
    pub const fn formatted_columns(self) -> usize {
        match self {
            TypeTag::Char8 => 7,
            TypeTag::Float32 => 4,
            TypeTag::Float64 => 3,
            TypeTag::Int32 => 6,
            TypeTag::Bool => 25,
            TypeTag::Message => 1,
        }
    }

    pub fn is_char(self) -> bool {
        matches!(self, TypeTag::Char8 | TypeTag::Message)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // disk names are ASCII
        f.pad(std::str::from_utf8(self.disk_name()).unwrap_or("????"))
    }
}

/// Fixed 8-byte identifier; trailing blanks are not significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeywordName(String);

impl KeywordName {
    pub fn new(name: &str) -> Result<Self> {
        let trimmed = name.trim_end();
        if trimmed.len() > STRING8_LEN {
            return Err(Error::write(format!(
                "keyword name {trimmed:?} longer than {STRING8_LEN} bytes"
            )));
        }
        if !trimmed.is_ascii() {
            return Err(Error::write(format!("keyword name {trimmed:?} is not ascii")));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn from_padded(bytes: &[u8; STRING8_LEN]) -> Self {
        Self(trim_string8(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn padded(&self) -> [u8; STRING8_LEN] {
        pad_string8(&self.0)
    }
}

impl fmt::Display for KeywordName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl PartialEq<str> for KeywordName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.trim_end()
    }
}

impl PartialEq<&str> for KeywordName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.trim_end()
    }
}

impl Borrow<str> for KeywordName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Compare two 8-char strings ignoring trailing blanks.
pub fn string8_eq(a: &str, b: &str) -> bool {
    a.trim_end() == b.trim_end()
}

pub(crate) fn pad_string8(value: &str) -> [u8; STRING8_LEN] {
    let mut out = [b' '; STRING8_LEN];
    let bytes = value.as_bytes();
    let len = bytes.len().min(STRING8_LEN);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

pub(crate) fn trim_string8(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|b| *b != b' ' && *b != 0)
        .map_or(0, |idx| idx + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Decoded element array, one variant per type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementData {
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Char8(Vec<String>),
    Bool(Vec<bool>),
    /// A single string stored as consecutive 8-byte chunks.
    Message(String),
}

impl ElementData {
    pub fn tag(&self) -> TypeTag {
        match self {
            ElementData::Int32(_) => TypeTag::Int32,
            ElementData::Float32(_) => TypeTag::Float32,
            ElementData::Float64(_) => TypeTag::Float64,
            ElementData::Char8(_) => TypeTag::Char8,
            ElementData::Bool(_) => TypeTag::Bool,
            ElementData::Message(_) => TypeTag::Message,
        }
    }

    /// Number of on-disk elements.
    pub fn len(&self) -> usize {
        match self {
            ElementData::Int32(v) => v.len(),
            ElementData::Float32(v) => v.len(),
            ElementData::Float64(v) => v.len(),
            ElementData::Char8(v) => v.len(),
            ElementData::Bool(v) => v.len(),
            ElementData::Message(s) => s.len().div_ceil(STRING8_LEN),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric view widened to f64; `None` for character data.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            ElementData::Int32(v) => Some(v.iter().map(|x| *x as f64).collect()),
            ElementData::Float32(v) => Some(v.iter().map(|x| *x as f64).collect()),
            ElementData::Float64(v) => Some(v.clone()),
            ElementData::Bool(v) => Some(v.iter().map(|x| if *x { 1.0 } else { 0.0 }).collect()),
            ElementData::Char8(_) | ElementData::Message(_) => None,
        }
    }
}

#[inline]
pub fn element_size(tag: TypeTag) -> usize {
    tag.element_size()
}

/// Decode `count` elements of `tag` from `bytes`, applying `endian` to every
/// multi-byte element.
pub fn decode_elements(tag: TypeTag, bytes: &[u8], count: usize, endian: Endian) -> Result<ElementData> {
    let size = tag.element_size();
    let expected = count
        .checked_mul(size)
        .ok_or_else(|| Error::decode("element count overflow"))?;
    if bytes.len() != expected {
        return Err(Error::decode(format!(
            "{tag} payload is {} bytes, expected {expected} for {count} elements",
            bytes.len()
        )));
    }

    let data = match tag {
        TypeTag::Int32 => ElementData::Int32(
            bytes
                .chunks_exact(4)
                .map(|c| endian.read_i32([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        TypeTag::Float32 => ElementData::Float32(
            bytes
                .chunks_exact(4)
                .map(|c| endian.read_f32([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        TypeTag::Float64 => ElementData::Float64(
            bytes
                .chunks_exact(8)
                .map(|c| endian.read_f64([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        // Writers emit -1 for true; other non-zero values are read as true too.
        TypeTag::Bool => ElementData::Bool(
            bytes
                .chunks_exact(4)
                .map(|c| endian.read_i32([c[0], c[1], c[2], c[3]]) != BOOL_FALSE_INT)
                .collect(),
        ),
        TypeTag::Char8 => ElementData::Char8(bytes.chunks_exact(STRING8_LEN).map(trim_string8).collect()),
        TypeTag::Message => ElementData::Message(trim_string8(bytes)),
    };
    Ok(data)
}

/// Encode `data` into its on-disk byte form under `endian`.
pub fn encode_elements(data: &ElementData, endian: Endian) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * data.tag().element_size());
    match data {
        ElementData::Int32(values) => {
            for value in values {
                out.extend_from_slice(&endian.write_i32(*value));
            }
        }
        ElementData::Float32(values) => {
            for value in values {
                out.extend_from_slice(&endian.write_f32(*value));
            }
        }
        ElementData::Float64(values) => {
            for value in values {
                out.extend_from_slice(&endian.write_f64(*value));
            }
        }
        ElementData::Bool(values) => {
            for value in values {
                let raw = if *value { BOOL_TRUE_INT } else { BOOL_FALSE_INT };
                out.extend_from_slice(&endian.write_i32(raw));
            }
        }
        ElementData::Char8(values) => {
            for value in values {
                if value.trim_end().len() > STRING8_LEN {
                    return Err(Error::write(format!(
                        "string {value:?} does not fit in {STRING8_LEN} bytes"
                    )));
                }
                out.extend_from_slice(&pad_string8(value.trim_end()));
            }
        }
        ElementData::Message(text) => {
            for chunk in text.as_bytes().chunks(STRING8_LEN) {
                let mut block = [b' '; STRING8_LEN];
                block[..chunk.len()].copy_from_slice(chunk);
                out.extend_from_slice(&block);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endian::{ByteOrder, NativeByteOrder};

    fn samples() -> Vec<ElementData> {
        vec![
            ElementData::Int32(vec![0, 1, -1, i32::MAX, i32::MIN]),
            ElementData::Float32(vec![0.0, 100.5, -3.25, f32::MAX]),
            ElementData::Float64(vec![1e-300, 200.25, -7.0]),
            ElementData::Char8(vec!["WOPR".into(), "OP_1".into(), "".into(), "ABCDEFGH".into()]),
            ElementData::Bool(vec![true, false, true]),
            ElementData::Message("restart written at step 12".into()),
        ]
    }

    #[test]
    fn element_sizes_match_layout() {
        let sizes: Vec<usize> = TypeTag::ALL.iter().map(|t| element_size(*t)).collect();
        assert_eq!(sizes, vec![4, 4, 8, 8, 4, 8]);
    }

    #[test]
    fn encode_then_decode_restores_values_for_both_orders() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let endian = Endian::resolve(order, &NativeByteOrder);
            for data in samples() {
                let bytes = encode_elements(&data, endian).expect("encode");
                assert_eq!(bytes.len(), data.len() * data.tag().element_size());
                let decoded = decode_elements(data.tag(), &bytes, data.len(), endian).expect("decode");
                assert_eq!(decoded, data);
            }
        }
    }

    #[test]
    fn unknown_type_name_is_rejected() {
        let err = TypeTag::from_disk_name(b"C008").expect_err("unknown tag");
        assert!(matches!(err, Error::UnknownTypeTag(ref name) if name == "C008"));
        assert_eq!(TypeTag::from_disk_name(b"DOUB").expect("known"), TypeTag::Float64);
    }

    #[test]
    fn string8_compare_ignores_trailing_blanks() {
        assert!(string8_eq("ABCD", "ABCD    "));
        let name = KeywordName::new("ABCD    ").expect("name");
        assert_eq!(name, "ABCD");
        assert_eq!(&name.padded(), b"ABCD    ");
        assert!(KeywordName::new("TOOLONGNAME").is_err());
    }

    #[test]
    fn payload_length_must_match_count() {
        let err = decode_elements(TypeTag::Int32, &[0u8; 6], 2, Endian::NATIVE).expect_err("short");
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn bool_encoding_uses_minus_one() {
        let bytes = encode_elements(&ElementData::Bool(vec![true]), Endian::NATIVE).expect("encode");
        assert_eq!(i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), -1);
    }
}

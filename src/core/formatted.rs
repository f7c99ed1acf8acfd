//! ASCII ("formatted") keyword files.
//!
//! A keyword is a header line ` 'NAME    '       count 'TYPE'` followed by
//! whitespace separated values. Character values are single-quoted and may
//! contain blanks; floats use Fortran notation with `E` or `D` exponents.

use std::io::{BufRead, Seek, Write};

use crate::core::source::ByteSource;
use crate::core::types::{ElementData, KeywordName, TypeTag, STRING8_LEN};
use crate::core::{Error, Result};

const QUOTE: u8 = b'\'';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Quoted(String),
    Bare(String),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Token::Quoted(s) | Token::Bare(s) => s,
        }
    }
}

#[inline]
fn is_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

/// Next token, or `None` when only whitespace remains.
pub fn next_token<R: BufRead + Seek>(src: &mut ByteSource<R>) -> Result<Option<Token>> {
    loop {
        match src.peek_byte()? {
            None => return Ok(None),
            Some(b) if is_blank(b) => {
                src.next_byte()?;
            }
            Some(_) => break,
        }
    }

    let mut text = Vec::new();
    if src.peek_byte()? == Some(QUOTE) {
        src.next_byte()?;
        loop {
            match src.next_byte()? {
                None => return Err(Error::TruncatedRecord),
                Some(QUOTE) => break,
                Some(b) => text.push(b),
            }
        }
        return Ok(Some(Token::Quoted(String::from_utf8_lossy(&text).into_owned())));
    }

    while let Some(b) = src.peek_byte()? {
        if is_blank(b) {
            break;
        }
        text.push(b);
        src.next_byte()?;
    }
    Ok(Some(Token::Bare(String::from_utf8_lossy(&text).into_owned())))
}

fn require_token<R: BufRead + Seek>(src: &mut ByteSource<R>) -> Result<Token> {
    next_token(src)?.ok_or(Error::TruncatedRecord)
}

fn require_quoted<R: BufRead + Seek>(src: &mut ByteSource<R>, what: &str) -> Result<String> {
    match require_token(src)? {
        Token::Quoted(s) => Ok(s),
        Token::Bare(s) => Err(Error::decode(format!("expected quoted {what}, found {s:?}"))),
    }
}

/// Read a keyword header line. `None` at a clean end of input.
pub fn read_header<R: BufRead + Seek>(src: &mut ByteSource<R>) -> Result<Option<(KeywordName, usize, TypeTag)>> {
    let name = match next_token(src)? {
        None => return Ok(None),
        Some(Token::Quoted(name)) => name,
        Some(Token::Bare(other)) => {
            return Err(Error::decode(format!("expected quoted keyword name, found {other:?}")))
        }
    };
    if name.trim_end().len() > STRING8_LEN {
        return Err(Error::decode(format!("keyword name {name:?} too long")));
    }
    let count_token = require_token(src)?;
    let count: i64 = count_token
        .text()
        .parse()
        .map_err(|_| Error::decode(format!("invalid element count {:?}", count_token.text())))?;
    if !(0..=i32::MAX as i64).contains(&count) {
        return Err(Error::decode(format!("element count {count} out of range")));
    }
    let type_name = require_quoted(src, "type name")?;
    let tag = TypeTag::from_disk_name(type_name.as_bytes())?;
    Ok(Some((KeywordName::new(&name).map_err(|e| Error::decode(e.to_string()))?, count as usize, tag)))
}

fn parse_float(token: &Token) -> Result<f64> {
    let text = token.text().replace(['D', 'd'], "E");
    text.parse::<f64>()
        .map_err(|_| Error::decode(format!("invalid floating point value {:?}", token.text())))
}

/// Read `count` values of `tag`.
pub fn read_values<R: BufRead + Seek>(src: &mut ByteSource<R>, tag: TypeTag, count: usize) -> Result<ElementData> {
    let data = match tag {
        TypeTag::Int32 => {
            let mut values = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                let token = require_token(src)?;
                let value = token
                    .text()
                    .parse::<i32>()
                    .map_err(|_| Error::decode(format!("invalid integer {:?}", token.text())))?;
                values.push(value);
            }
            ElementData::Int32(values)
        }
        TypeTag::Float32 => {
            let mut values = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                values.push(parse_float(&require_token(src)?)? as f32);
            }
            ElementData::Float32(values)
        }
        TypeTag::Float64 => {
            let mut values = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                values.push(parse_float(&require_token(src)?)?);
            }
            ElementData::Float64(values)
        }
        TypeTag::Bool => {
            let mut values = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                let token = require_token(src)?;
                let value = match token.text() {
                    "T" | "t" => true,
                    "F" | "f" => false,
                    other => return Err(Error::decode(format!("invalid logical {other:?}"))),
                };
                values.push(value);
            }
            ElementData::Bool(values)
        }
        TypeTag::Char8 => {
            let mut values = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                values.push(require_quoted(src, "string")?.trim_end().to_string());
            }
            ElementData::Char8(values)
        }
        TypeTag::Message => {
            let mut text = String::new();
            for _ in 0..count {
                let chunk = require_quoted(src, "message")?;
                text.push_str(&format!("{chunk:<8}"));
            }
            ElementData::Message(text.trim_end().to_string())
        }
    };
    Ok(data)
}

/// Split `x` into a mantissa in [0.1, 1) and a decimal exponent, after
/// rounding the mantissa to `decimals` places. The digits come from Rust's
/// own exponent formatting so no power of ten is ever materialised.
fn fortran_split(x: f64, decimals: i32) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let digits = (decimals.max(1) - 1) as usize;
    let text = format!("{:.*e}", digits, x.abs());
    let Some((mantissa, exp)) = text.split_once('e') else {
        return (x, 0);
    };
    let (Ok(exp), Ok(arg)) = (exp.parse::<i32>(), format!("0.{}", mantissa.replace('.', "")).parse::<f64>()) else {
        return (x, 0);
    };
    (arg.copysign(x), exp + 1)
}

/// Fortran style scientific text: `0.10050000E+03`.
pub fn fortran_scientific(x: f64, decimals: usize, exponent: char) -> String {
    let (arg, pow) = fortran_split(x, decimals as i32);
    let width = decimals + 3;
    format!("{arg:>width$.decimals$}{exponent}{pow:+03}")
}

fn format_value(data: &ElementData, idx: usize) -> String {
    match data {
        ElementData::Int32(v) => format!(" {:>11}", v[idx]),
        ElementData::Float32(v) => format!("  {}", fortran_scientific(v[idx] as f64, 8, 'E')),
        ElementData::Float64(v) => format!("  {}", fortran_scientific(v[idx], 14, 'D')),
        ElementData::Bool(v) => format!("  {}", if v[idx] { 'T' } else { 'F' }),
        ElementData::Char8(v) => format!(" '{:<8}'", v[idx]),
        ElementData::Message(s) => {
            let bytes = s.as_bytes();
            let start = idx * STRING8_LEN;
            let end = (start + STRING8_LEN).min(bytes.len());
            format!(" '{:<8}'", String::from_utf8_lossy(&bytes[start..end]))
        }
    }
}

/// Write one keyword in formatted layout. Returns bytes written.
pub fn write_keyword<W: Write>(out: &mut W, name: &KeywordName, data: &ElementData) -> Result<u64> {
    let tag = data.tag();
    let count = data.len();
    let mut text = format!(" '{:<8}' {:>11} '{}'\n", name.as_str(), count, tag);

    if let ElementData::Char8(values) = data {
        if let Some(long) = values.iter().find(|v| v.trim_end().len() > STRING8_LEN) {
            return Err(Error::write(format!("string {long:?} does not fit in {STRING8_LEN} bytes")));
        }
    }

    let block = tag.block_len();
    let columns = tag.formatted_columns();
    let mut start = 0;
    while start < count {
        let end = (start + block).min(count);
        for line_start in (start..end).step_by(columns) {
            let line_end = (line_start + columns).min(end);
            for idx in line_start..line_end {
                text.push_str(&format_value(data, idx));
            }
            text.push('\n');
        }
        start = end;
    }

    out.write_all(text.as_bytes())?;
    Ok(text.len() as u64)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn source(text: &str) -> ByteSource<Cursor<Vec<u8>>> {
        ByteSource::new(Cursor::new(text.as_bytes().to_vec())).expect("source")
    }

    #[test]
    fn scientific_matches_fortran_layout() {
        assert_eq!(fortran_scientific(100.5, 8, 'E'), " 0.10050000E+03");
        assert_eq!(fortran_scientific(0.0, 8, 'E'), " 0.00000000E+00");
        assert_eq!(fortran_scientific(-0.25, 14, 'D'), "-0.25000000000000D+00");
        assert_eq!(fortran_scientific(1.0, 8, 'E'), " 0.10000000E+01");
        assert_eq!(fortran_scientific(0.999999999, 8, 'E'), " 0.10000000E+01");
        assert_eq!(fortran_scientific(f64::MAX, 14, 'D'), " 0.17976931348623D+309");
    }

    #[test]
    fn extreme_doubles_survive_formatted_text() {
        let name = KeywordName::new("EXTREME").unwrap();
        let values = vec![f64::MAX, -f64::MAX, 5e307, f64::MIN_POSITIVE, -1.25e-300];
        let mut out = Vec::new();
        write_keyword(&mut out, &name, &ElementData::Float64(values.clone())).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut src = source(&text);
        let (_, count, tag) = read_header(&mut src).unwrap().unwrap();
        let ElementData::Float64(read) = read_values(&mut src, tag, count).unwrap() else {
            panic!("expected doubles");
        };
        for (got, want) in read.iter().zip(&values) {
            assert!(((got - want) / want).abs() < 1e-13, "{got} vs {want}");
        }
    }

    #[test]
    fn tokenizer_handles_quotes_and_blank_runs() {
        let mut src = source("  'WOPR    '\t 12\n\n'INTE'  ");
        assert_eq!(next_token(&mut src).unwrap(), Some(Token::Quoted("WOPR    ".into())));
        assert_eq!(next_token(&mut src).unwrap(), Some(Token::Bare("12".into())));
        assert_eq!(next_token(&mut src).unwrap(), Some(Token::Quoted("INTE".into())));
        assert_eq!(next_token(&mut src).unwrap(), None);
    }

    #[test]
    fn header_and_values_parse() {
        let mut src = source(" 'PRESSURE'           3 'REAL'\n   0.10050000E+03   0.20025000E+03  0.300125D+03\n");
        let (name, count, tag) = read_header(&mut src).unwrap().expect("header");
        assert_eq!(name, "PRESSURE");
        assert_eq!((count, tag), (3, TypeTag::Float32));
        let values = read_values(&mut src, tag, count).unwrap();
        assert_eq!(values, ElementData::Float32(vec![100.5, 200.25, 300.125]));
    }

    #[test]
    fn unterminated_quote_is_truncated() {
        let mut src = source(" 'PRESS");
        assert!(matches!(read_header(&mut src), Err(Error::TruncatedRecord)));
    }

    #[test]
    fn written_keyword_reads_back() {
        let name = KeywordName::new("SWAT").unwrap();
        let data = ElementData::Float64((0..10).map(|i| i as f64 * 0.5).collect());
        let mut out = Vec::new();
        write_keyword(&mut out, &name, &data).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(" 'SWAT    '          10 'DOUB'\n"));
        // three doubles per line
        assert_eq!(text.lines().count(), 1 + 4);

        let mut src = source(&text);
        let (_, count, tag) = read_header(&mut src).unwrap().unwrap();
        assert_eq!(read_values(&mut src, tag, count).unwrap(), data);
    }
}

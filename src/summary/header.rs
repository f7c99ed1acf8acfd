//! Summary header (`SMSPEC`) keywords.
//!
//! The header is a keyword stream of parallel arrays, one entry per slot:
//!
//! ```text
//! DIMENS   INTE  [nlist, nx, ny, nz, 0, restart_step]
//! KEYWORDS CHAR  nlist
//! WGNAMES  CHAR  nlist   (NAMES in newer files)
//! NUMS     INTE  nlist
//! UNITS    CHAR  nlist
//! STARTDAT INTE  [day, month, year, hour, minute, microsecond]
//! RESTART  CHAR  restart case name in 8-char pieces
//! LGRS / NUMLX / NUMLY / NUMLZ for local grid variables
//! ```

use std::collections::HashMap;
use std::io::{BufRead, Seek, Write};

use time::{Date, Month, PrimitiveDateTime, Time};

use crate::core::{ElementData, KeywordReader, KeywordWriter, Record};
use crate::error::{Error, Result};

const RESTART_PIECES: usize = 9;

/// Raw contents of a summary header.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryHeader {
    pub keywords: Vec<String>,
    pub wgnames: Option<Vec<String>>,
    pub nums: Option<Vec<i32>>,
    pub units: Option<Vec<String>>,
    pub lgrs: Option<Vec<String>>,
    pub lgr_ijk: Option<Vec<[i32; 3]>>,
    pub dims: [i32; 3],
    pub start: PrimitiveDateTime,
    pub restart_case: Option<String>,
    pub restart_step: Option<i32>,
}

fn check_len(name: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(Error::header(format!(
            "{name} has {len} entries, KEYWORDS has {expected}"
        )));
    }
    Ok(())
}

/// Decode a STARTDAT array.
pub fn parse_start_date(values: &[i32]) -> Result<PrimitiveDateTime> {
    if values.len() < 3 {
        return Err(Error::header(format!("STARTDAT has {} items, need at least 3", values.len())));
    }
    let invalid = || Error::header(format!("invalid STARTDAT {values:?}"));
    let month = u8::try_from(values[1]).ok().and_then(|m| Month::try_from(m).ok()).ok_or_else(invalid)?;
    let day = u8::try_from(values[0]).map_err(|_| invalid())?;
    let date = Date::from_calendar_date(values[2], month, day).map_err(|_| invalid())?;

    let item = |idx: usize| values.get(idx).copied().unwrap_or(0);
    let micros = item(5).max(0);
    let hour = u8::try_from(item(3)).map_err(|_| invalid())?;
    let minute = u8::try_from(item(4)).map_err(|_| invalid())?;
    let second = u8::try_from(micros / 1_000_000).map_err(|_| invalid())?;
    let time = Time::from_hms_micro(hour, minute, second, (micros % 1_000_000) as u32).map_err(|_| invalid())?;
    Ok(PrimitiveDateTime::new(date, time))
}

pub fn encode_start_date(start: PrimitiveDateTime) -> Vec<i32> {
    vec![
        start.day() as i32,
        u8::from(start.month()) as i32,
        start.year(),
        start.hour() as i32,
        start.minute() as i32,
        start.second() as i32 * 1_000_000 + start.microsecond() as i32,
    ]
}

impl SummaryHeader {
    pub fn new(keywords: Vec<String>, start: PrimitiveDateTime) -> Self {
        Self {
            keywords,
            wgnames: None,
            nums: None,
            units: None,
            lgrs: None,
            lgr_ijk: None,
            dims: [0, 0, 0],
            start,
            restart_case: None,
            restart_step: None,
        }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Read and validate a header stream. Any inconsistency fails the whole
    /// header.
    pub fn read<R: BufRead + Seek>(reader: &mut KeywordReader<R>) -> Result<Self> {
        let mut records: HashMap<String, Record> = HashMap::new();
        while let Some(record) = reader.next_record()? {
            records.entry(record.name().as_str().to_string()).or_insert(record);
        }
        let strings = |name: &str| -> Result<Option<Vec<String>>> {
            records
                .get(name)
                .map(|r| r.as_strings().map_err(|e| Error::header(format!("{name}: {e}"))))
                .transpose()
        };
        let ints = |name: &str| -> Result<Option<Vec<i32>>> {
            records
                .get(name)
                .map(|r| r.as_i32().map_err(|e| Error::header(format!("{name}: {e}"))))
                .transpose()
        };

        let keywords = strings("KEYWORDS")?.ok_or_else(|| Error::header("missing KEYWORDS"))?;
        let expected = keywords.len();
        let wgnames = match strings("WGNAMES")? {
            Some(names) => Some(names),
            None => strings("NAMES")?,
        };
        let nums = ints("NUMS")?;
        let units = strings("UNITS")?;
        let lgrs = strings("LGRS")?;
        if let Some(v) = &wgnames {
            check_len("WGNAMES", v.len(), expected)?;
        }
        if let Some(v) = &nums {
            check_len("NUMS", v.len(), expected)?;
        }
        if let Some(v) = &units {
            check_len("UNITS", v.len(), expected)?;
        }
        if let Some(v) = &lgrs {
            check_len("LGRS", v.len(), expected)?;
        }
        let lgr_ijk = match (ints("NUMLX")?, ints("NUMLY")?, ints("NUMLZ")?) {
            (Some(x), Some(y), Some(z)) => {
                check_len("NUMLX", x.len(), expected)?;
                check_len("NUMLY", y.len(), expected)?;
                check_len("NUMLZ", z.len(), expected)?;
                Some((0..expected).map(|i| [x[i], y[i], z[i]]).collect())
            }
            (None, None, None) => None,
            _ => return Err(Error::header("NUMLX/NUMLY/NUMLZ must appear together")),
        };

        let mut dims = [0, 0, 0];
        let mut restart_step = None;
        if let Some(d) = ints("DIMENS")? {
            if d.len() < 4 {
                return Err(Error::header(format!("DIMENS has {} items", d.len())));
            }
            check_len("DIMENS[0]", d[0].max(0) as usize, expected)?;
            dims = [d[1], d[2], d[3]];
            restart_step = d.get(5).copied().filter(|s| *s > 0);
        }

        let start = parse_start_date(&ints("STARTDAT")?.ok_or_else(|| Error::header("missing STARTDAT"))?)?;
        let restart_case = strings("RESTART")?
            .map(|pieces| pieces.concat().trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            keywords,
            wgnames,
            nums,
            units,
            lgrs,
            lgr_ijk,
            dims,
            start,
            restart_case,
            restart_step,
        })
    }

    /// Write the header keywords in the conventional order.
    pub fn write<W: Write>(&self, writer: &mut KeywordWriter<W>) -> Result<()> {
        let n = self.keywords.len() as i32;
        let [nx, ny, nz] = self.dims;
        writer.append_data(
            "DIMENS",
            ElementData::Int32(vec![n, nx, ny, nz, 0, self.restart_step.unwrap_or(-1)]),
        )?;
        if let Some(case) = &self.restart_case {
            let mut pieces: Vec<String> = case
                .as_bytes()
                .chunks(8)
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect();
            if pieces.len() > RESTART_PIECES {
                return Err(Error::write(format!("restart case name {case:?} is too long")));
            }
            pieces.resize(RESTART_PIECES, String::new());
            writer.append_data("RESTART", ElementData::Char8(pieces))?;
        }
        writer.append_data("KEYWORDS", ElementData::Char8(self.keywords.clone()))?;
        if let Some(v) = &self.wgnames {
            writer.append_data("WGNAMES", ElementData::Char8(v.clone()))?;
        }
        if let Some(v) = &self.nums {
            writer.append_data("NUMS", ElementData::Int32(v.clone()))?;
        }
        if let Some(v) = &self.lgrs {
            writer.append_data("LGRS", ElementData::Char8(v.clone()))?;
        }
        if let Some(v) = &self.lgr_ijk {
            for (axis, name) in ["NUMLX", "NUMLY", "NUMLZ"].into_iter().enumerate() {
                writer.append_data(name, ElementData::Int32(v.iter().map(|ijk| ijk[axis]).collect()))?;
            }
        }
        if let Some(v) = &self.units {
            writer.append_data("UNITS", ElementData::Char8(v.clone()))?;
        }
        writer.append_data("STARTDAT", ElementData::Int32(encode_start_date(self.start)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use time::macros::datetime;

    use super::*;
    use crate::core::{FileMode, StreamConfig};

    fn round_trip(header: &SummaryHeader) -> Result<SummaryHeader> {
        let config = StreamConfig::default();
        let mut writer = KeywordWriter::from_writer(Vec::new(), FileMode::Unformatted, config.endian());
        header.write(&mut writer)?;
        let bytes = writer.finish()?;
        let mut reader = KeywordReader::with_config(Cursor::new(bytes), &config)?;
        SummaryHeader::read(&mut reader)
    }

    #[test]
    fn start_date_with_time_of_day() {
        let start = parse_start_date(&[15, 3, 2021, 6, 30, 12_500_000]).unwrap();
        assert_eq!(start, datetime!(2021-03-15 06:30:12.5));
        assert_eq!(parse_start_date(&encode_start_date(start)).unwrap(), start);
        assert_eq!(parse_start_date(&[1, 1, 2000]).unwrap(), datetime!(2000-01-01 0:00));
        assert!(parse_start_date(&[31, 2, 2000]).is_err());
        assert!(parse_start_date(&[1, 13, 2000]).is_err());
    }

    #[test]
    fn header_survives_write_and_read() {
        let mut header = SummaryHeader::new(
            vec!["TIME".into(), "FOPT".into(), "WOPR".into()],
            datetime!(2020-01-01 0:00),
        );
        header.wgnames = Some(vec![":+:+:+:+".into(), ":+:+:+:+".into(), "P1".into()]);
        header.nums = Some(vec![0, 0, 0]);
        header.units = Some(vec!["DAYS".into(), "SM3".into(), "SM3/DAY".into()]);
        header.dims = [10, 10, 3];
        header.restart_case = Some("BASE_CASE_WITH_LONG_NAME".into());
        header.restart_step = Some(12);
        assert_eq!(round_trip(&header).unwrap(), header);
    }

    #[test]
    fn mismatched_parallel_arrays_fail() {
        let mut header = SummaryHeader::new(vec!["FOPT".into(), "WOPR".into()], datetime!(2020-01-01 0:00));
        header.wgnames = Some(vec!["P1".into()]);
        assert!(matches!(round_trip(&header), Err(Error::HeaderParse(_))));
    }

    #[test]
    fn missing_keywords_fail() {
        let config = StreamConfig::default();
        let mut writer = KeywordWriter::from_writer(Vec::new(), FileMode::Unformatted, config.endian());
        writer.append_data("STARTDAT", ElementData::Int32(vec![1, 1, 2000])).unwrap();
        let bytes = writer.finish().unwrap();
        let mut reader = KeywordReader::with_config(Cursor::new(bytes), &config).unwrap();
        assert!(matches!(SummaryHeader::read(&mut reader), Err(Error::HeaderParse(_))));
    }
}

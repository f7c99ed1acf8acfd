//! CSV summary tables.
//!
//! Two layouts are recognised:
//!
//! - line based: a `;`-separated header naming `DATE`, `VECTOR`, `VALUE` and
//!   optionally `ERROR` and `COMMENTS`, then one sample per line
//! - column based: a header of vector names (units as `NAME [unit]` or
//!   `NAME (unit)`), an optional unit line and an optional well/group name
//!   line, then one row per time step
//!
//! Cell and decimal separators are guessed from the first lines unless set
//! in [`CsvOptions`].

use std::collections::BTreeMap;
use std::path::Path;

use ::csv::{ReaderBuilder, StringRecord, Trim};
use anyhow::{anyhow, bail, Result};
use log::{info, warn};
use time::format_description::{self, OwnedFormatItem};
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

use crate::series::{ImportReport, NamedSeries};
use crate::tabular::{read_text, report};

const SNIFF_LINES: usize = 10;
const CELL_SEPARATORS: [u8; 3] = [b'\t', b';', b','];
const LINE_BASED_SEPARATOR: u8 = b';';
const LINE_BASED_COLUMNS: [&str; 5] = ["DATE", "VECTOR", "VALUE", "ERROR", "COMMENTS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvLayout {
    ColumnBased,
    LineBased,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    /// Cell separator; guessed when `None`.
    pub cell_separator: Option<u8>,
    /// Decimal separator; guessed when `None`.
    pub decimal_separator: Option<char>,
    /// Extra date format in `time` format-description syntax, tried first.
    pub date_format: Option<String>,
    /// Column holding the time axis in column-based files.
    pub time_column: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            cell_separator: None,
            decimal_separator: None,
            date_format: None,
            time_column: "DATE".to_string(),
        }
    }
}

pub fn import_csv(path: impl AsRef<Path>, options: &CsvOptions) -> ImportReport {
    let path = path.as_ref();
    info!("importing csv {}", path.display());
    report(read_text(path).and_then(|text| parse(&text, options)))
}

pub fn import_csv_str(text: &str, options: &CsvOptions) -> ImportReport {
    report(parse(text, options))
}

fn sample_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|l| !l.trim().is_empty()).take(SNIFF_LINES).collect()
}

/// Separator giving the highest average column count over the first lines.
pub fn detect_cell_separator(text: &str) -> u8 {
    let lines = sample_lines(text);
    let mut best = (CELL_SEPARATORS[0], 0usize);
    for sep in CELL_SEPARATORS {
        let total: usize = lines.iter().map(|l| l.split(sep as char).count()).sum();
        if total > best.1 {
            best = (sep, total);
        }
    }
    best.0
}

/// `,` when more cells parse with a decimal comma than with a dot.
pub fn detect_decimal_separator(text: &str, cell_separator: u8) -> char {
    let mut dot = 0;
    let mut comma = 0;
    for line in sample_lines(text) {
        for cell in line.split(cell_separator as char).map(str::trim) {
            if parse_number(cell, '.').is_some() {
                dot += 1;
            }
            if parse_number(cell, ',').is_some() {
                comma += 1;
            }
        }
    }
    if comma > dot {
        ','
    } else {
        '.'
    }
}

pub fn detect_layout(text: &str) -> CsvLayout {
    let header = text
        .lines()
        .map(|l| split_trim(l, LINE_BASED_SEPARATOR))
        .find(|cells| (3..=5).contains(&cells.len()));
    match header {
        Some(cells) if ["DATE", "VECTOR", "VALUE"].iter().all(|c| cells.iter().any(|h| h == c)) => {
            CsvLayout::LineBased
        }
        _ => CsvLayout::ColumnBased,
    }
}

fn split_trim(line: &str, sep: u8) -> Vec<String> {
    line.split(sep as char).map(|s| s.trim().to_string()).collect()
}

fn parse_number(text: &str, decimal: char) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if decimal == ',' {
        if text.contains('.') {
            return None;
        }
        text.replace(',', ".").parse().ok()
    } else {
        if text.contains(',') {
            return None;
        }
        text.parse().ok()
    }
}

struct DateParser {
    custom: Option<OwnedFormatItem>,
}

impl DateParser {
    fn new(options: &CsvOptions) -> Result<Self> {
        let custom = options
            .date_format
            .as_deref()
            .map(format_description::parse_owned::<2>)
            .transpose()
            .map_err(|e| anyhow!("bad date format: {e}"))?;
        Ok(Self { custom })
    }

    fn parse(&self, text: &str) -> Option<PrimitiveDateTime> {
        let text = text.trim();
        if let Some(fmt) = &self.custom {
            if let Ok(dt) = PrimitiveDateTime::parse(text, fmt) {
                return Some(dt);
            }
            if let Ok(date) = Date::parse(text, fmt) {
                return Some(date.midnight());
            }
        }
        let date_times = [
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        ];
        for fmt in date_times {
            if let Ok(dt) = PrimitiveDateTime::parse(text, fmt) {
                return Some(dt);
            }
        }
        let dates = [
            format_description!("[year]-[month]-[day]"),
            format_description!("[day].[month].[year]"),
        ];
        dates
            .into_iter()
            .find_map(|fmt| Date::parse(text, fmt).ok())
            .map(Date::midnight)
    }
}

fn parse(text: &str, options: &CsvOptions) -> Result<ImportReport> {
    if text.trim().is_empty() {
        bail!("CSV import: file is empty");
    }
    let dates = DateParser::new(options)?;
    match detect_layout(text) {
        CsvLayout::LineBased => parse_line_based(text, &dates),
        CsvLayout::ColumnBased => {
            let sep = options.cell_separator.unwrap_or_else(|| detect_cell_separator(text));
            let decimal = options
                .decimal_separator
                .unwrap_or_else(|| detect_decimal_separator(text, sep));
            parse_column_based(text, sep, decimal, &dates, &options.time_column)
        }
    }
}

/// Non-blank records, plus the number the csv reader rejected.
fn records(text: &str, sep: u8) -> (Vec<StringRecord>, usize) {
    let reader = ReaderBuilder::new()
        .delimiter(sep)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    let mut rejected = 0;
    for record in reader.into_records() {
        match record {
            Ok(row) if row.iter().any(|cell| !cell.is_empty()) => rows.push(row),
            Ok(_) => {}
            Err(err) => {
                warn!("csv record rejected: {err}");
                rejected += 1;
            }
        }
    }
    (rows, rejected)
}

/// Split `NAME [unit]` / `NAME (unit)` into name and unit.
fn split_unit(header: &str) -> (String, Option<String>) {
    for (open, close) in [('[', ']'), ('(', ')')] {
        if let (Some(start), Some(end)) = (header.find(open), header.rfind(close)) {
            if start < end {
                let unit = header[start + 1..end].trim().to_string();
                let name = format!("{}{}", &header[..start], &header[end + 1..]);
                let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
                return (name, Some(unit));
            }
        }
    }
    (header.split_whitespace().collect::<Vec<_>>().join(" "), None)
}

enum ColumnKind {
    Time,
    Numeric,
    Text,
}

/// A column is numeric when at least half of its filled cells parse.
fn column_kind<'a>(cells: impl Iterator<Item = &'a str>, decimal: char) -> ColumnKind {
    let (mut filled, mut numbers) = (0usize, 0usize);
    for cell in cells.filter(|c| !c.is_empty()) {
        filled += 1;
        if parse_number(cell, decimal).is_some() {
            numbers += 1;
        }
    }
    if numbers > 0 && 2 * numbers >= filled {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}

fn parse_column_based(
    text: &str,
    sep: u8,
    decimal: char,
    dates: &DateParser,
    time_column: &str,
) -> Result<ImportReport> {
    let (rows, mut skipped) = records(text, sep);
    let mut rows = rows.into_iter().peekable();
    let Some(header) = rows.next() else {
        bail!("CSV import: Failed to parse header columns");
    };
    let width = header.len();
    let is_data = |r: &StringRecord| r.iter().any(|cell| parse_number(cell, decimal).is_some());

    // up to two non-numeric lines of the header's width: units, then names
    let mut extra: Vec<StringRecord> = Vec::new();
    while extra.len() < 2 {
        match rows.peek() {
            Some(r) if r.len() == width && !is_data(r) => {
                if let Some(r) = rows.next() {
                    extra.push(r);
                }
            }
            _ => break,
        }
    }
    let unit_line = extra.first();
    let name_line = extra.get(1);

    let mut names = Vec::with_capacity(width);
    let mut units = Vec::with_capacity(width);
    for (col, cell) in header.iter().enumerate() {
        let (mut name, mut unit) = split_unit(cell);
        if let Some(qualifier) = name_line.and_then(|r| r.get(col)).filter(|s| !s.is_empty()) {
            name = format!("{name}:{qualifier}");
        }
        if let Some(u) = unit_line.and_then(|r| r.get(col)) {
            unit = Some(u.to_string());
        }
        names.push(name);
        units.push(unit);
    }

    let mut data = Vec::new();
    for (line, row) in rows.enumerate() {
        if row.len() != width {
            warn!("csv row {}: {} columns, expected {width}; skipped", line + 1, row.len());
            skipped += 1;
        } else {
            data.push((line, row));
        }
    }
    if data.is_empty() {
        bail!("CSV import: no data rows");
    }
    let kinds: Vec<ColumnKind> = names
        .iter()
        .enumerate()
        .map(|(col, name)| {
            if name.eq_ignore_ascii_case(time_column) {
                ColumnKind::Time
            } else {
                column_kind(data.iter().map(|(_, row)| row.get(col).unwrap_or("")), decimal)
            }
        })
        .collect();

    let mut values: Vec<Vec<f64>> = vec![Vec::new(); width];
    let mut times = Vec::new();
    for (line, row) in &data {
        let mut time = None;
        let mut parsed = Vec::with_capacity(width);
        let mut bad = false;
        for (kind, cell) in kinds.iter().zip(row.iter()) {
            match kind {
                ColumnKind::Time => match dates.parse(cell) {
                    Some(t) => time = Some(t),
                    None => bad = true,
                },
                ColumnKind::Numeric => match parse_number(cell, decimal) {
                    Some(v) => parsed.push(Some(v)),
                    None => bad = true,
                },
                ColumnKind::Text => parsed.push(None),
            }
        }
        if bad {
            warn!("csv row {}: unparsable cell; skipped", line + 1);
            skipped += 1;
            continue;
        }
        if let Some(t) = time {
            times.push(t);
        }
        let numeric = kinds.iter().enumerate().filter(|(_, k)| !matches!(k, ColumnKind::Time));
        for ((col, _), value) in numeric.zip(parsed) {
            if let Some(v) = value {
                values[col].push(v);
            }
        }
    }

    let series = kinds
        .iter()
        .enumerate()
        .filter(|(_, kind)| matches!(kind, ColumnKind::Numeric))
        .map(|(col, _)| {
            let mut series = NamedSeries::new(names[col].clone(), std::mem::take(&mut values[col]))
                .with_timestamps(times.clone());
            if let Some(unit) = &units[col] {
                series = series.with_unit(unit.clone());
            }
            series
        })
        .collect();
    Ok(ImportReport::ok(series, skipped))
}

fn parse_line_based(text: &str, dates: &DateParser) -> Result<ImportReport> {
    let mut header: Option<Vec<Option<usize>>> = None;
    let mut samples: BTreeMap<String, Vec<(PrimitiveDateTime, f64)>> = BTreeMap::new();
    let mut skipped = 0usize;

    let (rows, rejected) = records(text, LINE_BASED_SEPARATOR);
    skipped += rejected;

    for (line_no, row) in rows.iter().enumerate() {
        if !(3..=5).contains(&row.len()) {
            if header.is_some() {
                warn!("csv line {}: {} cells; skipped", line_no + 1, row.len());
                skipped += 1;
            }
            continue;
        }
        if header.is_none() {
            let cols: Vec<Option<usize>> = LINE_BASED_COLUMNS
                .iter()
                .map(|name| row.iter().position(|cell| cell == *name))
                .collect();
            if cols[..3].iter().all(Option::is_some) {
                header = Some(cols);
            }
            continue;
        }
        let Some(cols) = &header else {
            continue;
        };
        let width = cols.iter().flatten().count();
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i));
        let (Some(date), Some(vector), Some(value)) = (cell(cols[0]), cell(cols[1]), cell(cols[2])) else {
            skipped += 1;
            continue;
        };
        if row.len() != width || vector.is_empty() {
            skipped += 1;
            continue;
        }
        let (Some(time), Some(value)) = (dates.parse(date), parse_number(value, '.')) else {
            warn!("csv line {}: cannot parse date or value; skipped", line_no + 1);
            skipped += 1;
            continue;
        };
        samples.entry(vector.to_string()).or_default().push((time, value));
        if let Some(error) = cell(cols[3]) {
            let error = parse_number(error, '.').unwrap_or(f64::INFINITY);
            samples.entry(format!("ERR:{vector}")).or_default().push((time, error));
        }
    }

    if header.is_none() {
        bail!("CSV import: missing DATE;VECTOR;VALUE header");
    }
    let series = samples
        .into_iter()
        .map(|(name, mut rows)| {
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            let (times, values): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
            let keyword = name.strip_prefix("ERR:").unwrap_or(&name);
            let category = NamedSeries::new(keyword, Vec::new()).category;
            NamedSeries::new(name, values)
                .with_category(category)
                .with_timestamps(times)
        })
        .collect();
    Ok(ImportReport::ok(series, skipped))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn separators_are_detected() {
        assert_eq!(detect_cell_separator("a;b;c\n1;2;3\n"), b';');
        assert_eq!(detect_cell_separator("a\tb\n1\t2\n"), b'\t');
        assert_eq!(detect_cell_separator("a,b,c\n1,2,3\n"), b',');
        assert_eq!(detect_decimal_separator("A;B\n1,5;2,25\n3,5;4,0\n", b';'), ',');
        assert_eq!(detect_decimal_separator("A;B\n1.5;2.25\n", b';'), '.');
    }

    #[test]
    fn units_come_from_brackets() {
        assert_eq!(split_unit("WOPR [SM3/DAY]"), ("WOPR".to_string(), Some("SM3/DAY".to_string())));
        assert_eq!(split_unit("FOPT  (SM3)"), ("FOPT".to_string(), Some("SM3".to_string())));
        assert_eq!(split_unit("FGPT"), ("FGPT".to_string(), None));
    }

    #[test]
    fn column_based_with_unit_and_name_lines() {
        let text = "DATE;WOPR;WWCT;COMMENT\n;SM3/DAY;;\n;P1;P1;\n2020-01-01;100,5;0,1;start\n2020-02-01;99,0;0,2;x\n";
        let report = import_csv_str(text, &CsvOptions::default());
        assert!(report.success, "{:?}", report.error_text);
        assert_eq!(report.series.len(), 2);
        let wopr = report.find("WOPR:P1").unwrap();
        assert_eq!(wopr.values, vec![100.5, 99.0]);
        assert_eq!(wopr.unit.as_deref(), Some("SM3/DAY"));
        assert_eq!(wopr.timestamps[1], datetime!(2020-02-01 0:00));
    }

    #[test]
    fn bad_rows_are_skipped() {
        let text = "DATE,FOPT,FGPT\n2020-01-01,1.0,2.0\nnot-a-date,3.0,4.0\n2020-01-03,5.0\n2020-01-04,7.0,8.0\n";
        let report = import_csv_str(text, &CsvOptions::default());
        assert!(report.success);
        assert_eq!(report.skipped_rows, 2);
        let fopt = report.find("FOPT").unwrap();
        assert_eq!(fopt.values, vec![1.0, 7.0]);
        assert_eq!(fopt.timestamps.len(), 2);
    }

    #[test]
    fn blank_first_cell_keeps_numeric_column() {
        let text = "DATE,FOPT,FGPT\n2020-01-01,,2.0\n2020-01-02,5.0,3.0\n2020-01-03,6.0,4.0\n";
        let report = import_csv_str(text, &CsvOptions::default());
        assert!(report.success, "{:?}", report.error_text);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.find("FOPT").unwrap().values, vec![5.0, 6.0]);
        assert_eq!(report.find("FGPT").unwrap().values, vec![3.0, 4.0]);
    }

    #[test]
    fn line_based_rows_of_wrong_width_count_as_skipped() {
        let text = "DATE;VECTOR;VALUE\n2020-01-01;FOPT;5\n2020-01-02;FOPT;6;1;2;3\n2020-01-03;FOPT\n";
        let report = import_csv_str(text, &CsvOptions::default());
        assert!(report.success, "{:?}", report.error_text);
        assert_eq!(report.skipped_rows, 2);
        assert_eq!(report.find("FOPT").unwrap().values, vec![5.0]);
    }

    #[test]
    fn line_based_groups_by_vector() {
        let text = "DATE;VECTOR;VALUE;ERROR\n\
                    2020-02-01;WOPR:P1;20;1\n\
                    2020-01-01;WOPR:P1;10;0.5\n\
                    2020-01-01;FOPT;5;x\n\
                    broken;FOPT;6;1\n";
        let report = import_csv_str(text, &CsvOptions::default());
        assert!(report.success);
        assert_eq!(report.skipped_rows, 1);
        let wopr = report.find("WOPR:P1").unwrap();
        assert_eq!(wopr.values, vec![10.0, 20.0]);
        assert_eq!(wopr.timestamps[0], datetime!(2020-01-01 0:00));
        let err = report.find("ERR:WOPR:P1").unwrap();
        assert_eq!(err.values, vec![0.5, 1.0]);
        assert_eq!(err.category, wopr.category);
        assert_eq!(report.find("ERR:FOPT").unwrap().values, vec![f64::INFINITY]);
    }

    #[test]
    fn custom_date_format() {
        let options = CsvOptions {
            date_format: Some("[day]/[month]/[year]".into()),
            ..CsvOptions::default()
        };
        let report = import_csv_str("DATE,FOPT\n15/03/2021,1\n", &options);
        assert!(report.success, "{:?}", report.error_text);
        assert_eq!(report.series[0].timestamps, vec![datetime!(2021-03-15 0:00)]);
    }

    #[test]
    fn empty_input_fails() {
        let report = import_csv_str("  \n", &CsvOptions::default());
        assert!(!report.success);
        assert!(report.error_text.is_some());
    }
}

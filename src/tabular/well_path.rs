//! RMS well-path text files.
//!
//! ```text
//! 1.0
//! Undefined
//! OP_1 461000.0 5932000.0 25.0
//! 2
//! Poro UNK lin
//! Zonelog DISC 1 Upper 2 Lower
//! 461000.0 5932000.0 1500.0 0.21 1
//! ```
//!
//! The third line holds the well name, head position and an optional RKB.
//! Each data row is `x y z` followed by one value per log; -999 marks a
//! missing log value. Measured depth is accumulated along the path.

use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::series::{ImportReport, NamedSeries};
use crate::summary::VarCategory;
use crate::tabular::{read_text, report};

const MISSING: f64 = -999.0;

#[derive(Debug, Clone, PartialEq)]
pub struct WellLog {
    pub name: String,
    /// Unit for continuous logs, `DISC` for discrete ones.
    pub kind: String,
    /// Code to name table of a discrete log.
    pub codes: Vec<(i32, String)>,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WellPath {
    pub name: String,
    pub head: (f64, f64),
    pub rkb: Option<f64>,
    pub points: Vec<[f64; 3]>,
    pub md: Vec<f64>,
    pub logs: Vec<WellLog>,
}

impl WellPath {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn log(&self, name: &str) -> Option<&WellLog> {
        self.logs.iter().find(|log| log.name.eq_ignore_ascii_case(name))
    }

    /// X, Y, Z and MD series followed by one series per log, each
    /// qualified by the well name. Missing log values become NaN.
    pub fn to_series(&self) -> Vec<NamedSeries> {
        let column = |idx: usize| self.points.iter().map(|p| p[idx]).collect::<Vec<_>>();
        let mut series = vec![
            NamedSeries::new(format!("X:{}", self.name), column(0)),
            NamedSeries::new(format!("Y:{}", self.name), column(1)),
            NamedSeries::new(format!("Z:{}", self.name), column(2)),
            NamedSeries::new(format!("MD:{}", self.name), self.md.clone()),
        ];
        for log in &self.logs {
            let values = log.values.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            let mut s = NamedSeries::new(format!("{}:{}", log.name, self.name), values);
            if !log.kind.eq_ignore_ascii_case("DISC") && !log.kind.eq_ignore_ascii_case("UNK") {
                s = s.with_unit(log.kind.clone());
            }
            series.push(s);
        }
        series
            .into_iter()
            .map(|s| s.with_category(VarCategory::Misc))
            .collect()
    }
}

fn number(token: &str, what: &str) -> Result<f64> {
    token
        .parse()
        .with_context(|| format!("{what} {token:?} is not a number"))
}

fn parse_log_definition(line: &str) -> Result<WellLog> {
    let mut tokens = line.split_whitespace();
    let Some(name) = tokens.next() else {
        bail!("empty log definition");
    };
    let kind = tokens.next().unwrap_or("UNK").to_string();
    let mut codes = Vec::new();
    if kind.eq_ignore_ascii_case("DISC") {
        let rest: Vec<&str> = tokens.collect();
        for pair in rest.chunks(2) {
            if let [code, label] = pair {
                let code = code
                    .parse()
                    .with_context(|| format!("log {name}: code {code:?} is not an integer"))?;
                codes.push((code, label.to_string()));
            }
        }
    }
    Ok(WellLog {
        name: name.to_string(),
        kind,
        codes,
        values: Vec::new(),
    })
}

/// Parse a well path. Returns the path and the number of skipped rows.
pub fn parse_well_path(text: &str) -> Result<(WellPath, usize)> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let _version = lines.next().context("missing version line")?;
    let _kind = lines.next().context("missing well type line")?;

    let head_line = lines.next().context("missing well head line")?;
    let head: Vec<&str> = head_line.split_whitespace().collect();
    if head.len() < 3 {
        bail!("well head line {head_line:?} needs name, x and y");
    }
    let name = head[0].to_string();
    let x = number(head[1], "head x")?;
    let y = number(head[2], "head y")?;
    let rkb = head.get(3).map(|t| number(t, "rkb")).transpose()?;

    let count_line = lines.next().context("missing log count")?;
    let log_count: usize = count_line
        .parse()
        .with_context(|| format!("log count {count_line:?} is not an integer"))?;
    let mut logs = Vec::with_capacity(log_count);
    for _ in 0..log_count {
        let line = lines.next().context("log definitions end early")?;
        logs.push(parse_log_definition(line)?);
    }

    let mut points = Vec::new();
    let mut skipped = 0usize;
    for (row, line) in lines.enumerate() {
        let values: Option<Vec<f64>> = line.split_whitespace().map(|t| t.parse().ok()).collect();
        match values {
            Some(values) if values.len() == 3 + log_count => {
                points.push([values[0], values[1], values[2]]);
                for (log, value) in logs.iter_mut().zip(&values[3..]) {
                    log.values.push((*value != MISSING).then_some(*value));
                }
            }
            _ => {
                warn!("{name}: skipping malformed row {}: {line:?}", row + 1);
                skipped += 1;
            }
        }
    }

    let mut md = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (idx, point) in points.iter().enumerate() {
        if let Some(prev) = idx.checked_sub(1).and_then(|p| points.get(p)) {
            let d: f64 = (0..3).map(|k| (point[k] - prev[k]).powi(2)).sum();
            total += d.sqrt();
        }
        md.push(total);
    }

    Ok((
        WellPath {
            name,
            head: (x, y),
            rkb,
            points,
            md,
            logs,
        },
        skipped,
    ))
}

pub fn read_well_path(path: impl AsRef<Path>) -> Result<WellPath> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let (well, _) = parse_well_path(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(well)
}

pub fn import_well_path(path: impl AsRef<Path>) -> ImportReport {
    let path = path.as_ref();
    info!("importing well path {}", path.display());
    report(
        read_text(path)
            .and_then(|text| parse_well_path(&text).with_context(|| format!("parse {}", path.display())))
            .map(|(well, skipped)| ImportReport::ok(well.to_series(), skipped)),
    )
}

//! Summary payload: one PARAMS row per ministep.
//!
//! ```text
//! SEQHDR   (starts a report step)
//! MINISTEP INTE [n]
//! PARAMS   REAL [slot values]
//! MINISTEP ...
//! ```
//!
//! Unified cases keep every report step in one `UNSMRY` file; split cases
//! have one `Snnnn` file per report step.

use std::fs;
use std::io::{BufRead, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use time::{Duration, PrimitiveDateTime};

use crate::core::{classify, FileKind, KeywordReader, StreamConfig};
use crate::error::{Error, Result};
use crate::series::NamedSeries;
use crate::summary::index::SummaryIndex;
use crate::summary::key::SummaryKey;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Rows of a summary payload.
#[derive(Debug, Clone, Default)]
pub struct SummaryData {
    rows: Vec<Vec<f32>>,
    ministeps: Vec<i32>,
    report_steps: Vec<u32>,
    report_step: u32,
}

impl SummaryData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one payload stream.
    pub fn load<R: BufRead + Seek>(index: &SummaryIndex, reader: &mut KeywordReader<R>) -> Result<Self> {
        let mut data = Self::new();
        data.extend_from(index, reader)?;
        Ok(data)
    }

    /// Append the rows of another payload stream (next file of a split case).
    pub fn extend_from<R: BufRead + Seek>(&mut self, index: &SummaryIndex, reader: &mut KeywordReader<R>) -> Result<()> {
        let mut ministep = None;
        while let Some(record) = reader.next_record()? {
            match record.name().as_str() {
                "SEQHDR" => self.report_step += 1,
                "MINISTEP" => ministep = record.as_i32()?.first().copied(),
                "PARAMS" => {
                    let values = record.as_f32()?;
                    if values.len() != index.len() {
                        return Err(Error::decode(format!(
                            "PARAMS row has {} values, header has {} slots",
                            values.len(),
                            index.len()
                        )));
                    }
                    self.rows.push(values);
                    self.ministeps.push(ministep.take().unwrap_or(self.rows.len() as i32 - 1));
                    self.report_steps.push(self.report_step);
                }
                other => debug!("ignoring summary keyword {other}"),
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ministeps(&self) -> &[i32] {
        &self.ministeps
    }

    /// Report step each row belongs to (1-based, counted by SEQHDR).
    pub fn report_steps(&self) -> &[u32] {
        &self.report_steps
    }

    /// Column of one slot across all rows.
    pub fn values(&self, slot: usize) -> Option<Vec<f64>> {
        self.rows.iter().map(|row| row.get(slot).map(|v| *v as f64)).collect()
    }

    /// Wall-clock time of each row from the TIME (or DAYS) vector.
    pub fn timestamps(&self, index: &SummaryIndex) -> Result<Vec<PrimitiveDateTime>> {
        let slot = index
            .lookup_str("TIME")
            .or_else(|| index.lookup_str("DAYS"))
            .ok_or_else(|| Error::header("summary has neither TIME nor DAYS"))?;
        let days = self.values(slot).unwrap_or_default();
        let start = index.start();
        days.into_iter()
            .enumerate()
            .map(|(row, d)| {
                Duration::checked_seconds_f64(d * SECONDS_PER_DAY)
                    .and_then(|offset| start.checked_add(offset))
                    .ok_or_else(|| Error::decode(format!("summary row {row} has unusable time {d}")))
            })
            .collect()
    }

    pub fn series(&self, index: &SummaryIndex, key: &SummaryKey) -> Result<Option<NamedSeries>> {
        let Some(slot) = index.lookup_key(key) else {
            return Ok(None);
        };
        let values = self.values(slot).unwrap_or_default();
        let mut series = NamedSeries::new(key.to_string(), values)
            .with_category(key.category)
            .with_timestamps(self.timestamps(index)?);
        if let Some(unit) = index.unit(slot) {
            series = series.with_unit(unit);
        }
        Ok(Some(series))
    }
}

/// A summary header plus its payload files.
#[derive(Debug, Clone)]
pub struct SummaryCase {
    index: Arc<SummaryIndex>,
    data: SummaryData,
    files: Vec<PathBuf>,
}

impl SummaryCase {
    /// Open a case from its header file. The payload is the unified file if
    /// one exists next to the header, otherwise the numbered files in report
    /// order.
    pub fn open(header: impl AsRef<Path>) -> Result<Self> {
        let header = header.as_ref();
        let index = Arc::new(SummaryIndex::open(header)?);
        let files = payload_files(header)?;
        info!("summary case {}: {} payload file(s)", header.display(), files.len());

        let mut data = SummaryData::new();
        for file in &files {
            let mut reader = KeywordReader::open_with_config(file, &StreamConfig::default())?;
            data.extend_from(&index, &mut reader)?;
        }
        Ok(Self { index, data, files })
    }

    pub fn index(&self) -> &Arc<SummaryIndex> {
        &self.index
    }

    pub fn data(&self) -> &SummaryData {
        &self.data
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn series(&self, key: &str) -> Result<Option<NamedSeries>> {
        match SummaryKey::parse(key) {
            Some(key) => self.data.series(&self.index, &key),
            None => Ok(None),
        }
    }

    /// Every vector matching a wildcard pattern, in key order.
    pub fn matching(&self, pattern: &str) -> Result<Vec<NamedSeries>> {
        let mut out = Vec::new();
        for (key, _) in self.index.matching(pattern) {
            if let Some(series) = self.data.series(&self.index, key)? {
                out.push(series);
            }
        }
        Ok(out)
    }
}

fn payload_files(header: &Path) -> Result<Vec<PathBuf>> {
    let dir = match header.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let stem = header
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::header(format!("bad header path {}", header.display())))?;
    let header_mode = classify(header).map(|info| info.mode);

    let mut unified = None;
    let mut numbered = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.file_stem().and_then(|s| s.to_str()) != Some(stem) {
            continue;
        }
        let Some(info) = classify(&path) else {
            continue;
        };
        if header_mode.is_some_and(|mode| mode != info.mode) {
            continue;
        }
        match (info.kind, info.report_step) {
            (FileKind::UnifiedSummary, _) => unified = Some(path),
            (FileKind::Summary, Some(step)) => numbered.push((step, path)),
            _ => {}
        }
    }
    if let Some(path) = unified {
        return Ok(vec![path]);
    }
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

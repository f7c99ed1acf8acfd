//! Restart stream reader.
//!
//! A unified restart file is a run of report steps, each opened by SEQNUM:
//!
//! ```text
//! SEQNUM   [step]
//! INTEHEAD [..] day/month/year at 64/65/66, hour/minute at 206/207, us at 410
//! LOGIHEAD / DOUBHEAD [sim_days, ..] / ...
//! STARTSOL
//! PRESSURE, SWAT, ...
//! ENDSOL
//! SEQNUM   [next step]
//! ```
//!
//! Split (`Xnnnn`) files hold one step without SEQNUM; the step number comes
//! from the extension.
//!
//! Steps are indexed lazily and only forward from the last scanned offset.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use time::PrimitiveDateTime;

use crate::core::{classify, KeywordReader, Record, StreamConfig};
use crate::error::{Error, Result};
use crate::restart::index::{StepEntry, StepIndex, TimeLookup};
use crate::summary::header::parse_start_date;

pub(crate) const INTEHEAD_DAY: usize = 64;
pub(crate) const INTEHEAD_MONTH: usize = 65;
pub(crate) const INTEHEAD_YEAR: usize = 66;
pub(crate) const INTEHEAD_HOUR: usize = 206;
pub(crate) const INTEHEAD_MINUTE: usize = 207;
pub(crate) const INTEHEAD_MICROSECOND: usize = 410;
pub(crate) const INTEHEAD_LEN: usize = INTEHEAD_MICROSECOND + 1;

/// One report step with all of its keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStepBlock {
    pub step: i32,
    pub sim_time: PrimitiveDateTime,
    pub sim_days: f64,
    pub keywords: Vec<Record>,
}

impl TimeStepBlock {
    /// First keyword with this name in the step.
    pub fn get(&self, name: &str) -> Option<&Record> {
        self.keywords.iter().find(|r| r.is(name))
    }

    /// Keywords between STARTSOL and ENDSOL.
    pub fn solution(&self) -> &[Record] {
        let Some(start) = self.keywords.iter().position(|r| r.is("STARTSOL")) else {
            return &[];
        };
        let end = self.keywords[start..]
            .iter()
            .position(|r| r.is("ENDSOL"))
            .map_or(self.keywords.len(), |p| start + p);
        &self.keywords[start + 1..end]
    }
}

/// Timestamp encoded in an INTEHEAD array.
pub fn intehead_time(intehead: &[i32]) -> Result<PrimitiveDateTime> {
    if intehead.len() <= INTEHEAD_YEAR {
        return Err(Error::decode(format!("INTEHEAD has {} items", intehead.len())));
    }
    let item = |idx: usize| intehead.get(idx).copied().unwrap_or(0);
    parse_start_date(&[
        item(INTEHEAD_DAY),
        item(INTEHEAD_MONTH),
        item(INTEHEAD_YEAR),
        item(INTEHEAD_HOUR),
        item(INTEHEAD_MINUTE),
        item(INTEHEAD_MICROSECOND),
    ])
    .map_err(|e| Error::decode(format!("INTEHEAD date: {e}")))
}

/// Random-access reader over the report steps of one restart file.
pub struct RestartReader<R = BufReader<File>> {
    reader: KeywordReader<R>,
    index: Arc<StepIndex>,
    default_step: i32,
    path: Option<PathBuf>,
    config: StreamConfig,
}

impl RestartReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &StreamConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: &StreamConfig) -> Result<Self> {
        let path = path.as_ref();
        let reader = KeywordReader::open_with_config(path, config)?;
        let default_step = classify(path)
            .and_then(|info| info.report_step)
            .map_or(0, |step| step as i32);
        Ok(Self {
            reader,
            index: Arc::new(StepIndex::new()),
            default_step,
            path: Some(path.to_path_buf()),
            config: config.clone(),
        })
    }

    /// A second handle on the same file sharing this reader's step index.
    /// Each handle owns its own file cursor, so handles can be moved to
    /// worker threads.
    pub fn try_clone_handle(&self) -> Result<Self> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| Error::decode("restart reader has no backing path"))?;
        let reader = KeywordReader::open_with_config(path, &self.config)?;
        Ok(Self {
            reader,
            index: Arc::clone(&self.index),
            default_step: self.default_step,
            path: self.path.clone(),
            config: self.config.clone(),
        })
    }
}

impl<R: BufRead + Seek> RestartReader<R> {
    pub fn from_keyword_reader(reader: KeywordReader<R>) -> Self {
        Self {
            reader,
            index: Arc::new(StepIndex::new()),
            default_step: 0,
            path: None,
            config: StreamConfig::default(),
        }
    }

    pub fn index(&self) -> &Arc<StepIndex> {
        &self.index
    }

    /// Scan one step starting at `offset`. Returns the entry and the offset
    /// of the following step, or `None` when no records remain.
    fn scan_step(&mut self, offset: u64) -> Result<Option<(StepEntry, Option<u64>)>> {
        let reader = &mut self.reader;
        reader.seek(offset)?;
        let mut step = None;
        let mut intehead = None;
        let mut doubhead = None;
        let mut seen = 0usize;
        let next = loop {
            let pos = reader.position();
            let Some((name, _, _)) = reader.skip_record()? else {
                break None;
            };
            if name == "SEQNUM" {
                if seen > 0 {
                    break Some(pos);
                }
                reader.seek(pos)?;
                let record = reader.next_record()?.ok_or(Error::TruncatedRecord)?;
                step = record.as_i32()?.first().copied();
            } else if name == "INTEHEAD" && intehead.is_none() {
                reader.seek(pos)?;
                let record = reader.next_record()?.ok_or(Error::TruncatedRecord)?;
                intehead = Some(record.as_i32()?);
            } else if name == "DOUBHEAD" && doubhead.is_none() {
                reader.seek(pos)?;
                let record = reader.next_record()?.ok_or(Error::TruncatedRecord)?;
                doubhead = record.as_f64()?.first().copied();
            }
            seen += 1;
        };
        if seen == 0 {
            return Ok(None);
        }
        let intehead = intehead.ok_or_else(|| Error::decode(format!("step at offset {offset} has no INTEHEAD")))?;
        let entry = StepEntry {
            step: step.unwrap_or(self.default_step),
            offset,
            sim_time: intehead_time(&intehead)?,
            sim_days: doubhead.unwrap_or(0.0),
        };
        debug!("indexed restart step {} at offset {offset} ({})", entry.step, entry.sim_time);
        Ok(Some((entry, next)))
    }

    /// Grow the shared index until `done` holds or the file is exhausted.
    fn grow_until(&mut self, done: impl Fn(&[StepEntry]) -> bool) -> Result<()> {
        loop {
            {
                let state = self.index.read()?;
                if state.is_complete() || done(state.entries()) {
                    return Ok(());
                }
            }
            let index = Arc::clone(&self.index);
            let mut state = index.write()?;
            if state.is_complete() || done(state.entries()) {
                return Ok(());
            }
            match self.scan_step(state.scan_offset())? {
                Some((entry, next)) => state.push(entry, next),
                None => state.mark_complete(),
            }
        }
    }

    /// Make sure step `idx` is indexed. Returns whether it exists.
    fn ensure_indexed(&mut self, idx: usize) -> Result<bool> {
        self.grow_until(|entries| entries.len() > idx)?;
        Ok(self.index.len()? > idx)
    }

    /// Scan the whole file; returns the number of steps.
    pub fn index_all(&mut self) -> Result<usize> {
        self.grow_until(|_| false)?;
        self.index.len()
    }

    pub fn steps(&mut self) -> Result<Vec<StepEntry>> {
        self.index_all()?;
        self.index.entries()
    }

    /// Index of the first step at or after `time`, or `None` when `time`
    /// lies before the first step or after the last one.
    pub fn get_step_at_or_after(&mut self, time: PrimitiveDateTime) -> Result<Option<usize>> {
        self.grow_until(|entries| entries.last().is_some_and(|last| last.sim_time >= time))?;
        Ok(match self.index.read()?.at_or_after(time) {
            TimeLookup::Found(idx) => Some(idx),
            TimeLookup::BeforeFirst | TimeLookup::PastLast => None,
        })
    }

    /// Index of the step with report number `step`.
    pub fn get_step_by_number(&mut self, step: i32) -> Result<Option<usize>> {
        self.grow_until(|entries| entries.iter().any(|e| e.step == step))?;
        Ok(self.index.read()?.entries().iter().position(|e| e.step == step))
    }

    pub fn read_block(&mut self, idx: usize) -> Result<TimeStepBlock> {
        if !self.ensure_indexed(idx)? {
            return Err(Error::StepOutOfRange(idx));
        }
        let entry = self.index.get(idx)?.ok_or(Error::StepOutOfRange(idx))?;
        let next = self.index.get(idx + 1)?.map(|e| e.offset);

        self.reader.seek(entry.offset)?;
        let mut keywords = Vec::new();
        loop {
            if next.is_some_and(|n| self.reader.position() >= n) {
                break;
            }
            let Some(record) = self.reader.next_record()? else {
                break;
            };
            if record.is("SEQNUM") && !keywords.is_empty() {
                break;
            }
            keywords.push(record);
        }
        Ok(TimeStepBlock {
            step: entry.step,
            sim_time: entry.sim_time,
            sim_days: entry.sim_days,
            keywords,
        })
    }

    /// One solution array of one step, without collecting the rest.
    pub fn read_keyword(&mut self, idx: usize, name: &str) -> Result<Option<Record>> {
        if !self.ensure_indexed(idx)? {
            return Err(Error::StepOutOfRange(idx));
        }
        let entry = self.index.get(idx)?.ok_or(Error::StepOutOfRange(idx))?;
        let next = self.index.get(idx + 1)?.map(|e| e.offset);
        self.reader.seek(entry.offset)?;
        loop {
            let pos = self.reader.position();
            if next.is_some_and(|n| pos >= n) {
                return Ok(None);
            }
            let Some((found, _, _)) = self.reader.skip_record()? else {
                return Ok(None);
            };
            if found == "SEQNUM" && pos != entry.offset {
                return Ok(None);
            }
            if found == *name {
                self.reader.seek(pos)?;
                return self.reader.next_record();
            }
        }
    }
}

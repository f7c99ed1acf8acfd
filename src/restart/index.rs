//! Step → byte offset index shared between restart reader handles.
//!
//! Entries are appended in file order as steps are scanned and never
//! rewritten. Lookups take the read lock; growth takes the write lock and
//! scans forward from `scan_offset`, so no handle ever rescans a step another
//! handle already indexed.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use time::PrimitiveDateTime;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEntry {
    /// Report step number from SEQNUM (or the file name for split files).
    pub step: i32,
    /// Offset of the first record of the step.
    pub offset: u64,
    pub sim_time: PrimitiveDateTime,
    pub sim_days: f64,
}

/// Where a time falls relative to the indexed steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeLookup {
    BeforeFirst,
    Found(usize),
    PastLast,
}

#[derive(Debug, Default)]
pub(crate) struct IndexState {
    entries: Vec<StepEntry>,
    scan_offset: u64,
    complete: bool,
}

impl IndexState {
    pub(crate) fn entries(&self) -> &[StepEntry] {
        &self.entries
    }

    pub(crate) fn scan_offset(&self) -> u64 {
        self.scan_offset
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.complete
    }

    /// Record a scanned step. `next` is the offset of the following step, or
    /// `None` when the scan hit end of file.
    pub(crate) fn push(&mut self, entry: StepEntry, next: Option<u64>) {
        self.entries.push(entry);
        match next {
            Some(offset) => self.scan_offset = offset,
            None => self.complete = true,
        }
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// First indexed step with `sim_time >= time`.
    pub(crate) fn at_or_after(&self, time: PrimitiveDateTime) -> TimeLookup {
        let Some(first) = self.entries.first() else {
            return TimeLookup::PastLast;
        };
        if time < first.sim_time {
            return TimeLookup::BeforeFirst;
        }
        let idx = self.entries.partition_point(|e| e.sim_time < time);
        if idx == self.entries.len() {
            TimeLookup::PastLast
        } else {
            TimeLookup::Found(idx)
        }
    }
}

#[derive(Debug, Default)]
pub struct StepIndex {
    state: RwLock<IndexState>,
}

impl StepIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, IndexState>> {
        self.state.read().map_err(|_| Error::Poisoned("restart step index"))
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, IndexState>> {
        self.state.write().map_err(|_| Error::Poisoned("restart step index"))
    }

    /// Steps indexed so far.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, idx: usize) -> Result<Option<StepEntry>> {
        Ok(self.read()?.entries.get(idx).copied())
    }

    pub fn entries(&self) -> Result<Vec<StepEntry>> {
        Ok(self.read()?.entries.clone())
    }

    /// True once the whole file has been scanned.
    pub fn is_complete(&self) -> Result<bool> {
        Ok(self.read()?.complete)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use time::Duration;

    use super::*;

    fn state(days: &[i64]) -> IndexState {
        let mut state = IndexState::default();
        let start = datetime!(2000-01-01 0:00);
        for (i, d) in days.iter().enumerate() {
            let entry = StepEntry {
                step: i as i32,
                offset: i as u64 * 100,
                sim_time: start + Duration::days(*d),
                sim_days: *d as f64,
            };
            state.push(entry, Some((i as u64 + 1) * 100));
        }
        state
    }

    #[test]
    fn time_lookup_brackets() {
        let state = state(&[0, 10, 20]);
        let at = |d: i64| state.at_or_after(datetime!(2000-01-01 0:00) + Duration::days(d));
        assert_eq!(at(-1), TimeLookup::BeforeFirst);
        assert_eq!(at(0), TimeLookup::Found(0));
        assert_eq!(at(5), TimeLookup::Found(1));
        assert_eq!(at(10), TimeLookup::Found(1));
        assert_eq!(at(20), TimeLookup::Found(2));
        assert_eq!(at(21), TimeLookup::PastLast);
        assert_eq!(IndexState::default().at_or_after(datetime!(2000-01-01 0:00)), TimeLookup::PastLast);
    }

    #[test]
    fn push_tracks_scan_offset() {
        let mut state = state(&[0]);
        assert_eq!(state.scan_offset(), 100);
        assert!(!state.is_complete());
        let entry = state.entries()[0];
        state.push(entry, None);
        assert!(state.is_complete());
        assert_eq!(state.scan_offset(), 100);
    }
}

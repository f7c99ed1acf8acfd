use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use time::PrimitiveDateTime;

use crate::core::{ElementData, KeywordWriter, Record, StreamConfig};
use crate::error::{Error, Result};
use crate::restart::reader::{
    INTEHEAD_DAY, INTEHEAD_HOUR, INTEHEAD_LEN, INTEHEAD_MICROSECOND, INTEHEAD_MINUTE, INTEHEAD_MONTH, INTEHEAD_YEAR,
};
use crate::summary::header::encode_start_date;

struct OpenBlock {
    step: i32,
    sim_time: PrimitiveDateTime,
    sim_days: f64,
    keywords: Vec<Record>,
}

/// Append-only restart writer.
///
/// Keywords of an open solution block are buffered and written when the
/// block ends, so a rejected block never reaches the file.
pub struct RestartWriter<W: Write = BufWriter<File>> {
    writer: KeywordWriter<W>,
    open: Option<OpenBlock>,
    blocks: usize,
}

impl RestartWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with_config(path, &StreamConfig::default())
    }

    pub fn create_with_config(path: impl AsRef<Path>, config: &StreamConfig) -> Result<Self> {
        Ok(Self::new(KeywordWriter::create_with_config(path, config)?))
    }
}

impl<W: Write> RestartWriter<W> {
    pub fn new(writer: KeywordWriter<W>) -> Self {
        Self {
            writer,
            open: None,
            blocks: 0,
        }
    }

    pub fn blocks_written(&self) -> usize {
        self.blocks
    }

    pub fn start_solution_block(&mut self, step: i32, sim_time: PrimitiveDateTime, sim_days: f64) -> Result<()> {
        if let Some(open) = &self.open {
            return Err(Error::write(format!("solution block for step {} is still open", open.step)));
        }
        self.open = Some(OpenBlock {
            step,
            sim_time,
            sim_days,
            keywords: Vec::new(),
        });
        Ok(())
    }

    pub fn add_keyword(&mut self, record: Record) -> Result<()> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| Error::write("no solution block is open"))?;
        open.keywords.push(record);
        Ok(())
    }

    pub fn add_keyword_data(&mut self, name: &str, data: ElementData) -> Result<()> {
        self.add_keyword(Record::new(name, data)?)
    }

    /// Write the open block. Returns the offset of its SEQNUM record.
    ///
    /// A block without keywords fails with [`Error::EmptySolutionBlock`] and
    /// stays open.
    pub fn end_solution_block(&mut self) -> Result<u64> {
        let open = self.open.take().ok_or_else(|| Error::write("no solution block is open"))?;
        if open.keywords.is_empty() {
            self.open = Some(open);
            return Err(Error::EmptySolutionBlock);
        }

        let mut intehead = vec![0i32; INTEHEAD_LEN];
        let date = encode_start_date(open.sim_time);
        intehead[INTEHEAD_DAY] = date[0];
        intehead[INTEHEAD_MONTH] = date[1];
        intehead[INTEHEAD_YEAR] = date[2];
        intehead[INTEHEAD_HOUR] = date[3];
        intehead[INTEHEAD_MINUTE] = date[4];
        intehead[INTEHEAD_MICROSECOND] = date[5];

        let offset = self.writer.append_data("SEQNUM", ElementData::Int32(vec![open.step]))?;
        self.writer.append_data("INTEHEAD", ElementData::Int32(intehead))?;
        self.writer.append_data("DOUBHEAD", ElementData::Float64(vec![open.sim_days]))?;
        self.writer.append_data("STARTSOL", ElementData::Message(String::new()))?;
        for record in &open.keywords {
            self.writer.append(record)?;
        }
        self.writer.append_data("ENDSOL", ElementData::Message(String::new()))?;
        self.blocks += 1;
        debug!("wrote restart step {} with {} keywords", open.step, open.keywords.len());
        Ok(offset)
    }

    pub fn finish(self) -> Result<W> {
        if let Some(open) = &self.open {
            return Err(Error::write(format!("solution block for step {} was never ended", open.step)));
        }
        self.writer.finish()
    }
}

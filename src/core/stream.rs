//! Keyword streams: sequences of records in one file.
//!
//! # Design
//!
//! - Mode (formatted/unformatted) and byte order are settled once at open
//! - The reader is sequential with an explicit `seek` to a known record offset
//! - The first decode failure makes the reader unusable; reopen to retry
//! - The writer is append-only

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::core::endian::{ByteOrder, ByteOrderProvider, Endian, NativeByteOrder};
use crate::core::record::{self, FileMode, Record};
use crate::core::source::ByteSource;
use crate::core::types::{ElementData, KeywordName, TypeTag};
use crate::core::{Error, Result};

/// What a file holds, judged from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    SummaryHeader,
    UnifiedSummary,
    Summary,
    UnifiedRestart,
    Restart,
    EGrid,
    Grid,
    Init,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub kind: FileKind,
    pub mode: FileMode,
    /// Report number of numbered files such as `CASE.X0012`.
    pub report_step: Option<u32>,
}

fn numbered(ext: &str, unformatted: char, formatted: char) -> Option<(FileMode, u32)> {
    let mut chars = ext.chars();
    let lead = chars.next()?;
    let digits = chars.as_str();
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let step = digits.parse().ok()?;
    if lead == unformatted {
        Some((FileMode::Unformatted, step))
    } else if lead == formatted {
        Some((FileMode::Formatted, step))
    } else {
        None
    }
}

/// Classify a file from its extension.
pub fn classify(path: &Path) -> Option<FileInfo> {
    let ext = path.extension()?.to_str()?.to_ascii_uppercase();
    let plain = |kind, mode| Some(FileInfo { kind, mode, report_step: None });
    match ext.as_str() {
        "SMSPEC" => plain(FileKind::SummaryHeader, FileMode::Unformatted),
        "FSMSPEC" => plain(FileKind::SummaryHeader, FileMode::Formatted),
        "UNSMRY" => plain(FileKind::UnifiedSummary, FileMode::Unformatted),
        "FUNSMRY" => plain(FileKind::UnifiedSummary, FileMode::Formatted),
        "UNRST" => plain(FileKind::UnifiedRestart, FileMode::Unformatted),
        "FUNRST" => plain(FileKind::UnifiedRestart, FileMode::Formatted),
        "EGRID" => plain(FileKind::EGrid, FileMode::Unformatted),
        "FEGRID" => plain(FileKind::EGrid, FileMode::Formatted),
        "GRID" => plain(FileKind::Grid, FileMode::Unformatted),
        "FGRID" => plain(FileKind::Grid, FileMode::Formatted),
        "INIT" => plain(FileKind::Init, FileMode::Unformatted),
        "FINIT" => plain(FileKind::Init, FileMode::Formatted),
        other => {
            if let Some((mode, step)) = numbered(other, 'S', 'A') {
                return Some(FileInfo {
                    kind: FileKind::Summary,
                    mode,
                    report_step: Some(step),
                });
            }
            numbered(other, 'X', 'F').map(|(mode, step)| FileInfo {
                kind: FileKind::Restart,
                mode,
                report_step: Some(step),
            })
        }
    }
}

/// Guess the mode from the first buffered bytes: formatted files start with
/// a quoted keyword name.
pub fn sniff_mode<R: BufRead>(inner: &mut R) -> Result<FileMode> {
    let buf = inner.fill_buf()?;
    let first = buf.iter().find(|b| !b.is_ascii_whitespace());
    Ok(if first == Some(&b'\'') {
        FileMode::Formatted
    } else {
        FileMode::Unformatted
    })
}

/// Open-time settings for keyword streams.
#[derive(Clone)]
pub struct StreamConfig {
    /// Force a mode instead of detecting it.
    pub mode: Option<FileMode>,
    /// Byte order of the file contents.
    pub byte_order: ByteOrder,
    /// Source of the host byte order.
    pub host: Arc<dyn ByteOrderProvider>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            mode: None,
            byte_order: ByteOrder::Big,
            host: Arc::new(NativeByteOrder),
        }
    }
}

impl fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfig")
            .field("mode", &self.mode)
            .field("byte_order", &self.byte_order)
            .field("host_order", &self.host.host_order())
            .finish()
    }
}

impl StreamConfig {
    pub fn with_mode(mut self, mode: FileMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    pub fn endian(&self) -> Endian {
        Endian::resolve(self.byte_order, self.host.as_ref())
    }
}

/// Sequential keyword reader.
pub struct KeywordReader<R = BufReader<File>> {
    src: ByteSource<R>,
    mode: FileMode,
    endian: Endian,
    path: Option<PathBuf>,
    failed: bool,
}

impl KeywordReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &StreamConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: &StreamConfig) -> Result<Self> {
        let path = path.as_ref();
        let mut inner = BufReader::new(File::open(path)?);
        let mode = match config.mode {
            Some(mode) => mode,
            None => match classify(path) {
                Some(info) => info.mode,
                None => sniff_mode(&mut inner)?,
            },
        };
        debug!("opened {} as {:?} (flip={})", path.display(), mode, config.endian().flip());
        let mut reader = Self::from_reader(inner, mode, config.endian())?;
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl<R: BufRead + Seek> KeywordReader<R> {
    pub fn from_reader(inner: R, mode: FileMode, endian: Endian) -> Result<Self> {
        Ok(Self {
            src: ByteSource::new(inner)?,
            mode,
            endian,
            path: None,
            failed: false,
        })
    }

    /// Wrap an in-memory or custom source, sniffing the mode unless the
    /// config forces one.
    pub fn with_config(mut inner: R, config: &StreamConfig) -> Result<Self> {
        let mode = match config.mode {
            Some(mode) => mode,
            None => sniff_mode(&mut inner)?,
        };
        Self::from_reader(inner, mode, config.endian())
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Byte offset of the next record.
    pub fn position(&self) -> u64 {
        self.src.position()
    }

    fn guarded<T>(&mut self, op: impl FnOnce(&mut ByteSource<R>, FileMode, Endian) -> Result<T>) -> Result<T> {
        if self.failed {
            return Err(Error::Unusable);
        }
        let result = op(&mut self.src, self.mode, self.endian);
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    /// Next record, or `None` at end of stream.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        self.guarded(record::read_record)
    }

    /// Advance past the next record without decoding its data.
    pub fn skip_record(&mut self) -> Result<Option<(KeywordName, u32, TypeTag)>> {
        self.guarded(record::skip_record)
    }

    /// Position the reader at a record boundary previously returned by
    /// [`position`](Self::position).
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.guarded(|src, _, _| src.seek(offset))
    }

    /// Scan forward for the next record called `name`. On a miss the reader
    /// is left where it started.
    pub fn find(&mut self, name: &str) -> Result<Option<Record>> {
        let start = self.position();
        loop {
            let offset = self.position();
            let Some((found, _, _)) = self.skip_record()? else {
                self.seek(start)?;
                return Ok(None);
            };
            if found == *name {
                self.seek(offset)?;
                return self.next_record();
            }
        }
    }

    /// Read every remaining record.
    pub fn read_all(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    pub fn into_inner(self) -> R {
        self.src.into_inner()
    }
}

/// Append-only keyword writer.
pub struct KeywordWriter<W: Write = BufWriter<File>> {
    out: W,
    mode: FileMode,
    endian: Endian,
    position: u64,
    records: u64,
}

impl KeywordWriter<BufWriter<File>> {
    /// Create (truncating) a file. The mode follows the extension
    /// convention and defaults to unformatted.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with_config(path, &StreamConfig::default())
    }

    pub fn create_with_config(path: impl AsRef<Path>, config: &StreamConfig) -> Result<Self> {
        let path = path.as_ref();
        let mode = config
            .mode
            .or_else(|| classify(path).map(|info| info.mode))
            .unwrap_or(FileMode::Unformatted);
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file), mode, config.endian()))
    }
}

impl<W: Write> KeywordWriter<W> {
    pub fn from_writer(out: W, mode: FileMode, endian: Endian) -> Self {
        Self {
            out,
            mode,
            endian,
            position: 0,
            records: 0,
        }
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// Bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Append one record; returns the offset it starts at.
    pub fn append(&mut self, record: &Record) -> Result<u64> {
        let offset = self.position;
        let written = record::write_record(&mut self.out, self.mode, self.endian, record)?;
        self.position += written;
        self.records += 1;
        Ok(offset)
    }

    pub fn append_data(&mut self, name: &str, data: ElementData) -> Result<u64> {
        let record = Record::new(name, data)?;
        self.append(&record)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

use crate::core::record::FileMode;
use crate::core::stream::{classify, sniff_mode, KeywordReader, StreamConfig};
use crate::core::Result;

/// Read-only mapping of a keyword file.
pub struct MmapFile {
    map: Mmap,
}

impl MmapFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only; concurrent truncation by another
        // process is outside what this crate guards against.
        let map = unsafe { MmapOptions::new().map(&file)? };
        Ok(Self { map })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_reader(self, mode: Option<FileMode>, config: &StreamConfig) -> Result<KeywordReader<Cursor<Mmap>>> {
        let mut cursor = Cursor::new(self.map);
        let mode = match mode {
            Some(mode) => mode,
            None => sniff_mode(&mut cursor)?,
        };
        KeywordReader::from_reader(cursor, mode, config.endian())
    }
}

impl KeywordReader<Cursor<Mmap>> {
    /// Open a keyword file through a memory map instead of buffered reads.
    pub fn open_mmap(path: impl AsRef<Path>, config: &StreamConfig) -> Result<Self> {
        let path = path.as_ref();
        let mode = config.mode.or_else(|| classify(path).map(|info| info.mode));
        MmapFile::open(path)?.into_reader(mode, config)
    }
}

use std::io::{BufRead, ErrorKind, Read, Seek, SeekFrom};

use crate::core::{Error, Result};

/// Buffered input that tracks its absolute byte offset.
pub struct ByteSource<R> {
    inner: R,
    pos: u64,
}

impl<R: BufRead + Seek> ByteSource<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let pos = inner.stream_position()?;
        Ok(Self { inner, pos })
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.pos = self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    pub fn skip(&mut self, len: u64) -> Result<()> {
        let delta = i64::try_from(len).map_err(|_| Error::decode("skip length overflow"))?;
        self.pos = self.inner.seek(SeekFrom::Current(delta))?;
        Ok(())
    }

    /// Fill `buf` completely. Returns the number of bytes read, which is
    /// less than `buf.len()` only when the source ends first.
    pub fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        self.pos += filled as u64;
        Ok(filled)
    }

    /// Fill `buf` completely or fail with [`Error::TruncatedRecord`].
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.read_up_to(buf)? != buf.len() {
            return Err(Error::TruncatedRecord);
        }
        Ok(())
    }

    /// Append exactly `len` bytes to `buf`. The buffer grows with the data
    /// actually read, so a corrupt length cannot force a huge allocation.
    pub fn read_into_vec(&mut self, len: usize, buf: &mut Vec<u8>) -> Result<()> {
        let read = (&mut self.inner).take(len as u64).read_to_end(buf)?;
        self.pos += read as u64;
        if read != len {
            return Err(Error::TruncatedRecord);
        }
        Ok(())
    }

    pub fn peek_byte(&mut self) -> Result<Option<u8>> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.inner.consume(1);
            self.pos += 1;
        }
        Ok(byte)
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

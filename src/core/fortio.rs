//! Fortran sequential-access record framing.
//!
//! Every unformatted record is `[len:i32][payload; len][len:i32]`. The
//! trailing marker must repeat the leading one; a mismatch almost always
//! means corruption or a wrong byte-order assumption.

use std::io::{BufRead, Seek, Write};

use crate::core::endian::Endian;
use crate::core::source::ByteSource;
use crate::core::{Error, Result};

pub const MARKER_LEN: usize = 4;

/// Read a leading marker. `None` on a clean end of input.
pub fn begin_frame<R: BufRead + Seek>(src: &mut ByteSource<R>, endian: Endian) -> Result<Option<usize>> {
    let mut marker = [0u8; MARKER_LEN];
    match src.read_up_to(&mut marker)? {
        0 => return Ok(None),
        MARKER_LEN => {}
        _ => return Err(Error::TruncatedRecord),
    }
    let len = endian.read_i32(marker);
    if len < 0 {
        return Err(Error::decode(format!("negative record length {len}")));
    }
    Ok(Some(len as usize))
}

/// Read and validate the trailing marker of a frame of length `leading`.
pub fn end_frame<R: BufRead + Seek>(src: &mut ByteSource<R>, endian: Endian, leading: usize) -> Result<()> {
    let mut marker = [0u8; MARKER_LEN];
    src.read_exact(&mut marker)?;
    let trailing = endian.read_i32(marker);
    if trailing as i64 != leading as i64 {
        return Err(Error::FramingMismatch {
            leading: leading as i32,
            trailing,
        });
    }
    Ok(())
}

/// Read one whole frame, replacing the contents of `buf`.
/// Returns `false` on a clean end of input.
pub fn read_frame<R: BufRead + Seek>(src: &mut ByteSource<R>, endian: Endian, buf: &mut Vec<u8>) -> Result<bool> {
    buf.clear();
    let Some(len) = begin_frame(src, endian)? else {
        return Ok(false);
    };
    src.read_into_vec(len, buf)?;
    end_frame(src, endian, len)?;
    Ok(true)
}

/// Read one frame that must exist and must be exactly `expected` bytes.
pub fn read_frame_exact<R: BufRead + Seek>(
    src: &mut ByteSource<R>,
    endian: Endian,
    expected: usize,
    buf: &mut Vec<u8>,
) -> Result<()> {
    buf.clear();
    let len = begin_frame(src, endian)?.ok_or(Error::TruncatedRecord)?;
    if len != expected {
        return Err(Error::decode(format!("record of {len} bytes, expected {expected}")));
    }
    src.read_into_vec(len, buf)?;
    end_frame(src, endian, len)
}

/// Advance past one frame without reading its payload.
pub fn skip_frame<R: BufRead + Seek>(src: &mut ByteSource<R>, endian: Endian) -> Result<Option<usize>> {
    let Some(len) = begin_frame(src, endian)? else {
        return Ok(None);
    };
    src.skip(len as u64)?;
    end_frame(src, endian, len)?;
    Ok(Some(len))
}

/// Write one framed record. Returns the number of bytes written.
pub fn write_frame<W: Write>(out: &mut W, endian: Endian, payload: &[u8]) -> Result<u64> {
    let len = i32::try_from(payload.len()).map_err(|_| Error::write("record payload exceeds i32 range"))?;
    let marker = endian.write_i32(len);
    out.write_all(&marker)?;
    out.write_all(payload)?;
    out.write_all(&marker)?;
    Ok((payload.len() + 2 * MARKER_LEN) as u64)
}

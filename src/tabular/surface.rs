//! IRAP regular surface grids.
//!
//! Classic ASCII layout:
//!
//! ```text
//! -996 ny xinc yinc
//! xori xmax yori ymax
//! nx rotation xrot yrot
//! 0 0 0 0 0 0 0
//! z values, x fastest
//! ```
//!
//! The binary (`.gri`) variant stores the same header as big-endian Fortran
//! records of 32, 16 and 28 bytes followed by float records. Nodes equal to
//! 9999900 are undefined.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;

use crate::core::endian::{ByteOrder, Endian, NativeByteOrder};
use crate::core::fortio;
use crate::core::source::ByteSource;
use crate::series::{ImportReport, NamedSeries};
use crate::summary::VarCategory;
use crate::tabular::{open_input, report};

pub const UNDEFINED: f64 = 9_999_900.0;
const IRAP_ID: i32 = -996;
const HEADER_ZEROS: usize = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub nx: usize,
    pub ny: usize,
    pub xori: f64,
    pub yori: f64,
    pub xinc: f64,
    pub yinc: f64,
    /// Rotation in degrees, counter-clockwise around (xori, yori).
    pub rotation: f64,
    /// Node values with x fastest; `None` for undefined nodes.
    pub values: Vec<Option<f64>>,
}

impl Surface {
    pub fn value(&self, i: usize, j: usize) -> Option<f64> {
        if i >= self.nx || j >= self.ny {
            return None;
        }
        self.values.get(i + j * self.nx).copied().flatten()
    }

    /// Map coordinates of node (i, j).
    pub fn node_xy(&self, i: usize, j: usize) -> (f64, f64) {
        let (dx, dy) = (i as f64 * self.xinc, j as f64 * self.yinc);
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        (self.xori + dx * cos - dy * sin, self.yori + dx * sin + dy * cos)
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().flatten().count()
    }

    fn xmax(&self) -> f64 {
        self.xori + self.xinc * (self.nx.saturating_sub(1)) as f64
    }

    fn ymax(&self) -> f64 {
        self.yori + self.yinc * (self.ny.saturating_sub(1)) as f64
    }

    /// X, Y and Z series over the defined nodes.
    pub fn to_series(&self) -> Vec<NamedSeries> {
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut z = Vec::new();
        for j in 0..self.ny {
            for i in 0..self.nx {
                if let Some(value) = self.value(i, j) {
                    let (px, py) = self.node_xy(i, j);
                    x.push(px);
                    y.push(py);
                    z.push(value);
                }
            }
        }
        [("X", x), ("Y", y), ("Z", z)]
            .into_iter()
            .map(|(name, values)| NamedSeries::new(name, values).with_category(VarCategory::Misc))
            .collect()
    }

    pub fn write_ascii<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{IRAP_ID} {} {:.6} {:.6}", self.ny, self.xinc, self.yinc)?;
        writeln!(out, "{:.6} {:.6} {:.6} {:.6}", self.xori, self.xmax(), self.yori, self.ymax())?;
        writeln!(out, "{} {:.6} {:.6} {:.6}", self.nx, self.rotation, self.xori, self.yori)?;
        writeln!(out, "0 0 0 0 0 0 0")?;
        for row in self.values.chunks(6) {
            let line: Vec<String> = row.iter().map(|v| format!("{:.4}", v.unwrap_or(UNDEFINED))).collect();
            writeln!(out, "{}", line.join(" "))?;
        }
        Ok(())
    }

    pub fn write_binary<W: Write>(&self, out: &mut W) -> Result<()> {
        self.write_binary_as(out, big_endian())
    }

    fn write_binary_as<W: Write>(&self, out: &mut W, endian: Endian) -> Result<()> {
        let mut head = Vec::with_capacity(32);
        head.extend_from_slice(&endian.write_i32(IRAP_ID));
        head.extend_from_slice(&endian.write_i32(self.ny as i32));
        for v in [self.xori, self.xmax(), self.yori, self.ymax(), self.xinc, self.yinc] {
            head.extend_from_slice(&endian.write_f32(v as f32));
        }
        fortio::write_frame(out, endian, &head)?;

        let mut head = Vec::with_capacity(16);
        head.extend_from_slice(&endian.write_i32(self.nx as i32));
        for v in [self.rotation, self.xori, self.yori] {
            head.extend_from_slice(&endian.write_f32(v as f32));
        }
        fortio::write_frame(out, endian, &head)?;
        fortio::write_frame(out, endian, &[0u8; HEADER_ZEROS * 4])?;

        for row in self.values.chunks(self.nx.max(1)) {
            let bytes: Vec<u8> = row
                .iter()
                .flat_map(|v| endian.write_f32(v.unwrap_or(UNDEFINED) as f32))
                .collect();
            fortio::write_frame(out, endian, &bytes)?;
        }
        Ok(())
    }
}

fn big_endian() -> Endian {
    Endian::resolve(ByteOrder::Big, &NativeByteOrder)
}

/// Byte order of a binary surface, told apart by its 32-byte leading marker.
fn marker_order(bytes: &[u8]) -> Option<ByteOrder> {
    let marker: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    if i32::from_be_bytes(marker) == 32 {
        Some(ByteOrder::Big)
    } else if i32::from_le_bytes(marker) == 32 {
        Some(ByteOrder::Little)
    } else {
        None
    }
}

fn node(value: f64) -> Option<f64> {
    (value < UNDEFINED * 0.999_999).then_some(value)
}

fn check_dims(nx: f64, ny: f64) -> Result<(usize, usize)> {
    if !(nx >= 1.0 && ny >= 1.0 && nx.fract() == 0.0 && ny.fract() == 0.0) {
        bail!("invalid surface dimensions {nx} x {ny}");
    }
    Ok((nx as usize, ny as usize))
}

/// Node count of an `nx` by `ny` lattice, refused when the input cannot hold
/// that many values at `min_size` bytes each.
fn node_count(nx: usize, ny: usize, available: usize, min_size: usize) -> Result<usize> {
    match nx.checked_mul(ny) {
        Some(count) if count.checked_mul(min_size).is_some_and(|size| size <= available) => Ok(count),
        _ => bail!("surface dimensions {nx} x {ny} exceed the {available} bytes of input"),
    }
}

pub fn read_irap_ascii(text: &str) -> Result<Surface> {
    let mut tokens = text.split_whitespace();
    let mut header = [0f64; 19];
    for (idx, slot) in header.iter_mut().enumerate() {
        let token = tokens.next().with_context(|| format!("IRAP header ends after {idx} values"))?;
        *slot = token
            .parse()
            .with_context(|| format!("IRAP header value {token:?} is not a number"))?;
    }
    if header[0] as i32 != IRAP_ID {
        bail!("not an IRAP classic surface (id {})", header[0]);
    }
    let (nx, ny) = check_dims(header[8], header[1])?;
    let count = node_count(nx, ny, text.len(), 2)?;
    let mut values = Vec::with_capacity(count);
    for token in tokens.take(count) {
        let value: f64 = token
            .parse()
            .with_context(|| format!("IRAP value {token:?} is not a number"))?;
        values.push(node(value));
    }
    if values.len() != count {
        bail!("IRAP surface has {} of {count} values", values.len());
    }
    Ok(Surface {
        nx,
        ny,
        xinc: header[2],
        yinc: header[3],
        xori: header[4],
        yori: header[6],
        rotation: header[9],
        values,
    })
}

pub fn read_irap_binary(bytes: &[u8]) -> Result<Surface> {
    let order = marker_order(bytes).unwrap_or_default();
    let endian = Endian::resolve(order, &NativeByteOrder);
    let mut src = ByteSource::new(Cursor::new(bytes))?;
    let mut frame = Vec::new();

    fortio::read_frame_exact(&mut src, endian, 32, &mut frame).context("IRAP binary header")?;
    let int = |b: &[u8], at: usize| endian.read_i32([b[at], b[at + 1], b[at + 2], b[at + 3]]);
    let float = |b: &[u8], at: usize| endian.read_f32([b[at], b[at + 1], b[at + 2], b[at + 3]]) as f64;
    if int(&frame, 0) != IRAP_ID {
        bail!("not an IRAP binary surface (id {})", int(&frame, 0));
    }
    let ny = int(&frame, 4);
    let (xori, yori, xinc, yinc) = (float(&frame, 8), float(&frame, 16), float(&frame, 24), float(&frame, 28));

    fortio::read_frame_exact(&mut src, endian, 16, &mut frame).context("IRAP binary header")?;
    let nx = int(&frame, 0);
    let rotation = float(&frame, 4);
    fortio::read_frame_exact(&mut src, endian, HEADER_ZEROS * 4, &mut frame).context("IRAP binary header")?;

    let (nx, ny) = check_dims(nx as f64, ny as f64)?;
    let count = node_count(nx, ny, bytes.len(), 4)?;
    let mut values = Vec::with_capacity(count);
    while values.len() < count && fortio::read_frame(&mut src, endian, &mut frame)? {
        for chunk in frame.chunks_exact(4) {
            values.push(node(float(chunk, 0)));
        }
    }
    if values.len() < count {
        bail!("IRAP binary surface has {} of {count} values", values.len());
    }
    values.truncate(count);
    Ok(Surface {
        nx,
        ny,
        xori,
        yori,
        xinc,
        yinc,
        rotation,
        values,
    })
}

/// Read either IRAP variant; binary files start with the 32-byte marker.
pub fn read_surface(path: &Path) -> Result<Surface> {
    let mut bytes = Vec::new();
    open_input(path)?
        .read_to_end(&mut bytes)
        .with_context(|| format!("read {}", path.display()))?;
    if marker_order(&bytes).is_some() {
        read_irap_binary(&bytes)
    } else {
        read_irap_ascii(&String::from_utf8_lossy(&bytes))
    }
}

pub fn import_surface(path: impl AsRef<Path>) -> ImportReport {
    let path = path.as_ref();
    info!("importing surface {}", path.display());
    report(read_surface(path).map(|surface| {
        let undefined = surface.values.len() - surface.defined_count();
        ImportReport::ok(surface.to_series(), undefined)
    }))
}

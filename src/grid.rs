//! Corner-point grid geometry.
//!
//! EGRID files carry the main grid as
//!
//! ```text
//! GRIDHEAD INTE [type, nx, ny, nz, ..]
//! COORD    REAL 6*(nx+1)*(ny+1)   pillar top xyz, bottom xyz
//! ZCORN    REAL 8*nx*ny*nz
//! ACTNUM   INTE nx*ny*nz          (optional, all active when absent)
//! ENDGRID
//! ```
//!
//! followed by any local grids, which are not read here. Older GRID files
//! use a DIMENS header and one COORDS/CORNERS pair per cell; their corner
//! depths are folded into the same ZCORN layout.

use std::io::{BufRead, Seek};
use std::path::Path;

use log::debug;

use crate::core::KeywordReader;
use crate::error::{Error, Result};

/// Corner-point geometry of the main grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    dims: [usize; 3],
    coord: Vec<f32>,
    zcorn: Vec<f32>,
    active: Vec<Option<usize>>,
    global: Vec<usize>,
    mapaxes: Option<[f32; 6]>,
}

fn dim(value: i32, axis: &str) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| Error::decode(format!("grid {axis} dimension {value} is not positive")))
}

fn check_len(name: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(Error::decode(format!("{name} has {len} values, expected {expected}")));
    }
    Ok(())
}

/// Cell count of a grid, refused when it or the derived corner and pillar
/// array lengths do not fit in `usize`.
fn cell_total(dims: [usize; 3]) -> Result<usize> {
    let [nx, ny, nz] = dims;
    let cells = nx.checked_mul(ny).and_then(|c| c.checked_mul(nz));
    let pillars = (nx + 1).checked_mul(ny + 1).and_then(|p| p.checked_mul(6));
    match (cells, pillars) {
        (Some(cells), Some(_)) if cells.checked_mul(8).is_some() => Ok(cells),
        _ => Err(Error::decode(format!("grid dimensions {nx}x{ny}x{nz} overflow"))),
    }
}

impl Grid {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = KeywordReader::open(path)?;
        Self::read(&mut reader)
    }

    pub fn read<R: BufRead + Seek>(reader: &mut KeywordReader<R>) -> Result<Self> {
        let mut dims = None;
        let mut coord = Vec::new();
        let mut zcorn = Vec::new();
        let mut actnum = None;
        let mut mapaxes = None;
        // legacy per-cell layout: (global, active, corner depths)
        let mut legacy_cells: Vec<(usize, bool, [f32; 8])> = Vec::new();
        let mut legacy_cell: Option<(usize, bool)> = None;

        while let Some(record) = reader.next_record()? {
            match record.name().as_str() {
                "GRIDHEAD" => {
                    let head = record.as_i32()?;
                    if head.len() < 4 {
                        return Err(Error::decode(format!("GRIDHEAD has {} items", head.len())));
                    }
                    let d = [dim(head[1], "x")?, dim(head[2], "y")?, dim(head[3], "z")?];
                    cell_total(d)?;
                    dims = Some(d);
                }
                "DIMENS" if dims.is_none() => {
                    let head = record.as_i32()?;
                    if head.len() < 3 {
                        return Err(Error::decode(format!("DIMENS has {} items", head.len())));
                    }
                    let d = [dim(head[0], "x")?, dim(head[1], "y")?, dim(head[2], "z")?];
                    cell_total(d)?;
                    dims = Some(d);
                }
                "MAPAXES" => {
                    let values = record.as_f32()?;
                    check_len("MAPAXES", values.len(), 6)?;
                    mapaxes = Some([values[0], values[1], values[2], values[3], values[4], values[5]]);
                }
                "COORD" => coord = record.as_f32()?,
                "ZCORN" => zcorn = record.as_f32()?,
                "ACTNUM" => actnum = Some(record.as_i32()?),
                "COORDS" => {
                    let d = dims.ok_or_else(|| Error::decode("COORDS before DIMENS"))?;
                    let c = record.as_i32()?;
                    if c.len() < 3 {
                        return Err(Error::decode(format!("COORDS has {} items", c.len())));
                    }
                    let [i, j, k] = [c[0] - 1, c[1] - 1, c[2] - 1];
                    if i < 0 || j < 0 || k < 0 || i as usize >= d[0] || j as usize >= d[1] || k as usize >= d[2] {
                        return Err(Error::decode(format!("COORDS cell {:?} outside the grid", &c[..3])));
                    }
                    let global = i as usize + j as usize * d[0] + k as usize * d[0] * d[1];
                    let is_active = c.get(4).map_or(true, |a| *a != 0);
                    legacy_cell = Some((global, is_active));
                }
                "CORNERS" => {
                    let (global, is_active) = legacy_cell
                        .take()
                        .ok_or_else(|| Error::decode("CORNERS without COORDS"))?;
                    let corners = record.as_f32()?;
                    check_len("CORNERS", corners.len(), 24)?;
                    let mut depths = [0f32; 8];
                    for (corner, depth) in depths.iter_mut().enumerate() {
                        *depth = corners[corner * 3 + 2];
                    }
                    legacy_cells.push((global, is_active, depths));
                }
                "ENDGRID" | "LGR" => break,
                _ => {}
            }
        }

        let dims = dims.ok_or_else(|| Error::decode("grid has neither GRIDHEAD nor DIMENS"))?;
        let [nx, ny, nz] = dims;
        let cells = cell_total(dims)?;
        if zcorn.is_empty() && !legacy_cells.is_empty() {
            // every cell carries its own record, so the file itself bounds the size
            if legacy_cells.len() != cells {
                return Err(Error::decode(format!(
                    "GRID has {} cell records, expected {cells}",
                    legacy_cells.len()
                )));
            }
            zcorn = vec![0.0; 8 * cells];
            let mut flags = vec![0; cells];
            for (global, is_active, depths) in &legacy_cells {
                let ijk = [global % nx, (global / nx) % ny, global / (nx * ny)];
                for (corner, depth) in depths.iter().enumerate() {
                    zcorn[zcorn_index(dims, ijk, corner)] = *depth;
                }
                flags[*global] = i32::from(*is_active);
            }
            actnum = actnum.or(Some(flags));
        } else {
            check_len("COORD", coord.len(), 6 * (nx + 1) * (ny + 1))?;
        }
        check_len("ZCORN", zcorn.len(), 8 * cells)?;
        let actnum = actnum.unwrap_or_else(|| vec![1; cells]);
        check_len("ACTNUM", actnum.len(), cells)?;

        let mut active = Vec::with_capacity(cells);
        let mut global = Vec::new();
        for (cell, flag) in actnum.iter().enumerate() {
            if *flag > 0 {
                active.push(Some(global.len()));
                global.push(cell);
            } else {
                active.push(None);
            }
        }
        debug!("grid {nx}x{ny}x{nz}: {} active of {cells}", global.len());

        Ok(Self {
            dims,
            coord,
            zcorn,
            active,
            global,
            mapaxes,
        })
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn cell_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_count(&self) -> usize {
        self.global.len()
    }

    pub fn mapaxes(&self) -> Option<[f32; 6]> {
        self.mapaxes
    }

    /// Global index of zero-based (i, j, k).
    pub fn global_index(&self, ijk: [usize; 3]) -> Option<usize> {
        let [nx, ny, nz] = self.dims;
        let [i, j, k] = ijk;
        (i < nx && j < ny && k < nz).then(|| i + j * nx + k * nx * ny)
    }

    pub fn ijk(&self, global: usize) -> Option<[usize; 3]> {
        let [nx, ny, _] = self.dims;
        (global < self.cell_count()).then(|| [global % nx, (global / nx) % ny, global / (nx * ny)])
    }

    pub fn active_index(&self, global: usize) -> Option<usize> {
        self.active.get(global).copied().flatten()
    }

    pub fn global_of_active(&self, active: usize) -> Option<usize> {
        self.global.get(active).copied()
    }

    pub fn is_active(&self, global: usize) -> bool {
        self.active_index(global).is_some()
    }

    /// Depth of one of the eight corners of a cell. Corners are numbered
    /// i fastest, then j, then k (0 = top south-west, 7 = bottom north-east).
    pub fn corner_depth(&self, ijk: [usize; 3], corner: usize) -> Option<f64> {
        if corner >= 8 {
            return None;
        }
        self.global_index(ijk)?;
        self.zcorn.get(zcorn_index(self.dims, ijk, corner)).map(|z| *z as f64)
    }

    /// Mean of the eight corner depths.
    pub fn cell_depth(&self, ijk: [usize; 3]) -> Option<f64> {
        let sum: Option<f64> = (0..8).map(|c| self.corner_depth(ijk, c)).sum();
        sum.map(|s| s / 8.0)
    }

    /// Top and bottom points of pillar (i, j), `i <= nx`, `j <= ny`.
    pub fn pillar(&self, i: usize, j: usize) -> Option<([f64; 3], [f64; 3])> {
        let [nx, ny, _] = self.dims;
        if i > nx || j > ny {
            return None;
        }
        let base = 6 * (i + j * (nx + 1));
        let p = self.coord.get(base..base + 6)?;
        let f = |v: f32| v as f64;
        Some(([f(p[0]), f(p[1]), f(p[2])], [f(p[3]), f(p[4]), f(p[5])]))
    }

    /// Spread an active-cell array over all cells.
    pub fn expand_active<T: Copy>(&self, values: &[T]) -> Result<Vec<Option<T>>> {
        check_len("active-cell array", values.len(), self.active_count())?;
        Ok(self.active.iter().map(|a| a.map(|idx| values[idx])).collect())
    }
}

fn zcorn_index(dims: [usize; 3], ijk: [usize; 3], corner: usize) -> usize {
    let [nx, ny, _] = dims;
    let [i, j, k] = ijk;
    let (ci, cj, ck) = (corner & 1, (corner >> 1) & 1, (corner >> 2) & 1);
    (2 * k + ck) * 4 * nx * ny + (2 * j + cj) * 2 * nx + (2 * i + ci)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::core::{ElementData, FileMode, KeywordWriter, StreamConfig};

    /// 2x1x2 grid, layers at depth 1000..1010 and 1010..1020, second cell of
    /// the bottom layer inactive.
    fn egrid(actnum: Option<Vec<i32>>, zcorn_len: usize) -> Vec<u8> {
        let (nx, ny, nz) = (2usize, 1usize, 2usize);
        let config = StreamConfig::default();
        let mut w = KeywordWriter::from_writer(Vec::new(), FileMode::Unformatted, config.endian());
        w.append_data("GRIDHEAD", ElementData::Int32(vec![1, nx as i32, ny as i32, nz as i32])).unwrap();
        let mut coord = Vec::new();
        for j in 0..=ny {
            for i in 0..=nx {
                coord.extend_from_slice(&[i as f32 * 100.0, j as f32 * 100.0, 1000.0]);
                coord.extend_from_slice(&[i as f32 * 100.0, j as f32 * 100.0, 1020.0]);
            }
        }
        w.append_data("COORD", ElementData::Float32(coord)).unwrap();
        let mut zcorn = Vec::new();
        for kk in 0..2 * nz {
            let depth = 1000.0 + 10.0 * ((kk + 1) / 2) as f32;
            zcorn.extend(std::iter::repeat(depth).take(4 * nx * ny));
        }
        zcorn.truncate(zcorn_len);
        w.append_data("ZCORN", ElementData::Float32(zcorn)).unwrap();
        if let Some(actnum) = actnum {
            w.append_data("ACTNUM", ElementData::Int32(actnum)).unwrap();
        }
        w.append_data("ENDGRID", ElementData::Int32(vec![])).unwrap();
        w.finish().unwrap()
    }

    fn read(bytes: Vec<u8>) -> Result<Grid> {
        let mut reader = KeywordReader::with_config(Cursor::new(bytes), &StreamConfig::default())?;
        Grid::read(&mut reader)
    }

    #[test]
    fn active_mapping_and_depths() {
        let grid = read(egrid(Some(vec![1, 1, 1, 0]), 32)).unwrap();
        assert_eq!(grid.dims(), [2, 1, 2]);
        assert_eq!(grid.active_count(), 3);
        assert_eq!(grid.active_index(3), None);
        assert_eq!(grid.global_of_active(2), Some(2));
        assert_eq!(grid.ijk(3), Some([1, 0, 1]));
        assert_eq!(grid.cell_depth([0, 0, 0]), Some(1005.0));
        assert_eq!(grid.corner_depth([1, 0, 1], 7), Some(1020.0));
        assert_eq!(grid.pillar(2, 1), Some(([200.0, 100.0, 1000.0], [200.0, 100.0, 1020.0])));
        assert_eq!(grid.expand_active(&[1, 2, 3]).unwrap(), vec![Some(1), Some(2), Some(3), None]);
        assert!(grid.expand_active(&[1, 2]).is_err());
    }

    #[test]
    fn missing_actnum_means_all_active() {
        let grid = read(egrid(None, 32)).unwrap();
        assert_eq!(grid.active_count(), 4);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert!(matches!(read(egrid(None, 31)), Err(Error::Decode(_))));
        assert!(matches!(read(egrid(Some(vec![1, 1]), 32)), Err(Error::Decode(_))));
    }

    #[test]
    fn legacy_cells_fill_corner_depths() {
        let config = StreamConfig::default();
        let mut w = KeywordWriter::from_writer(Vec::new(), FileMode::Unformatted, config.endian());
        w.append_data("DIMENS", ElementData::Int32(vec![1, 1, 2])).unwrap();
        for k in 1..=2 {
            w.append_data("COORDS", ElementData::Int32(vec![1, 1, k, k, i32::from(k == 1)])).unwrap();
            let top = 2000.0 + 5.0 * (k - 1) as f32;
            let corners: Vec<f32> = (0..8)
                .flat_map(|c| [0.0, 0.0, if c < 4 { top } else { top + 5.0 }])
                .collect();
            w.append_data("CORNERS", ElementData::Float32(corners)).unwrap();
        }
        let grid = read(w.finish().unwrap()).unwrap();
        assert_eq!(grid.active_count(), 1);
        assert_eq!(grid.cell_depth([0, 0, 1]), Some(2007.5));
        assert_eq!(grid.pillar(0, 0), None);
    }

    fn header_only(name: &str, head: Vec<i32>) -> Vec<u8> {
        let config = StreamConfig::default();
        let mut w = KeywordWriter::from_writer(Vec::new(), FileMode::Unformatted, config.endian());
        w.append_data(name, ElementData::Int32(head)).unwrap();
        w.append_data("ENDGRID", ElementData::Int32(vec![])).unwrap();
        w.finish().unwrap()
    }

    #[test]
    fn oversized_dimensions_are_decode_errors() {
        assert!(matches!(read(header_only("DIMENS", vec![i32::MAX; 3])), Err(Error::Decode(_))));
        assert!(matches!(
            read(header_only("GRIDHEAD", vec![1, i32::MAX, i32::MAX, i32::MAX])),
            Err(Error::Decode(_))
        ));
        // fits in usize but nothing on disk backs it
        assert!(matches!(read(header_only("DIMENS", vec![1000, 1000, 1000])), Err(Error::Decode(_))));
    }
}

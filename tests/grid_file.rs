use tempfile::tempdir;

use kwfile::core::{ElementData, KeywordWriter};
use kwfile::Grid;

fn write_grid(path: &std::path::Path) {
    let (nx, ny, nz) = (3usize, 2usize, 1usize);
    let mut writer = KeywordWriter::create(path).expect("create");
    writer
        .append_data("GRIDHEAD", ElementData::Int32(vec![1, nx as i32, ny as i32, nz as i32]))
        .unwrap();
    writer
        .append_data("MAPAXES", ElementData::Float32(vec![0.0, 100.0, 0.0, 0.0, 100.0, 0.0]))
        .unwrap();
    let mut coord = Vec::new();
    for j in 0..=ny {
        for i in 0..=nx {
            let (x, y) = (i as f32 * 50.0, j as f32 * 50.0);
            coord.extend_from_slice(&[x, y, 1500.0, x, y, 1600.0]);
        }
    }
    writer.append_data("COORD", ElementData::Float32(coord)).unwrap();
    let mut zcorn = vec![1500.0f32; 4 * nx * ny];
    zcorn.extend(std::iter::repeat(1520.0f32).take(4 * nx * ny));
    writer.append_data("ZCORN", ElementData::Float32(zcorn)).unwrap();
    writer
        .append_data("ACTNUM", ElementData::Int32(vec![1, 0, 1, 1, 1, 0]))
        .unwrap();
    writer.append_data("ENDGRID", ElementData::Int32(vec![])).unwrap();
    // local grids after ENDGRID are not part of the main grid
    writer.append_data("LGR", ElementData::Char8(vec!["LGR1".into()])).unwrap();
    writer.append_data("ZCORN", ElementData::Float32(vec![0.0; 8])).unwrap();
    writer.finish().expect("finish");
}

#[test]
fn egrid_reads_in_both_encodings() {
    let dir = tempdir().expect("tempdir");
    for name in ["MODEL.EGRID", "MODEL.FEGRID"] {
        let path = dir.path().join(name);
        write_grid(&path);
        let grid = Grid::open(&path).expect("grid");
        assert_eq!(grid.dims(), [3, 2, 1]);
        assert_eq!(grid.cell_count(), 6);
        assert_eq!(grid.active_count(), 4);
        assert!(!grid.is_active(1));
        assert_eq!(grid.active_index(4), Some(3));
        assert_eq!(grid.cell_depth([2, 1, 0]), Some(1510.0));
        assert_eq!(grid.mapaxes(), Some([0.0, 100.0, 0.0, 0.0, 100.0, 0.0]));
        assert_eq!(grid.pillar(3, 2), Some(([150.0, 100.0, 1500.0], [150.0, 100.0, 1600.0])));
    }
}

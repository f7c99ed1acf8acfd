#![cfg(feature = "tabular")]

use std::fs::{self, File};
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::tempdir;
use time::macros::datetime;

use kwfile::tabular::{export_parquet, import_file, Surface};
use kwfile::VarCategory;

#[test]
fn gzipped_csv_is_imported() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("vectors.csv.gz");
    let mut gz = GzEncoder::new(File::create(&path).expect("create"), Compression::default());
    gz.write_all(b"DATE\tFOPT [SM3]\tWBHP:P1 [BARSA]\n2021-01-01\t0\t250.5\n2021-01-02\t1200\t249.75\n")
        .expect("write");
    gz.finish().expect("finish");

    let report = import_file(&path);
    assert!(report.success, "{:?}", report.error_text);
    let fopt = report.find("FOPT").expect("FOPT");
    assert_eq!(fopt.unit.as_deref(), Some("SM3"));
    assert_eq!(fopt.category, VarCategory::Field);
    let bhp = report.find("WBHP:P1").expect("WBHP");
    assert_eq!(bhp.category, VarCategory::Well);
    assert_eq!(bhp.values, vec![250.5, 249.75]);
}

#[test]
fn csv_survives_a_parquet_round_trip() {
    let dir = tempdir().expect("tempdir");
    let csv = dir.path().join("obs.csv");
    fs::write(
        &csv,
        "DATE;VECTOR;VALUE;ERROR\n2019-01-01;FOPR;100;5\n2019-02-01;FOPR;110;5\n2019-03-01;FOPR;120;6\n",
    )
    .unwrap();
    let report = import_file(&csv);
    assert!(report.success, "{:?}", report.error_text);
    assert_eq!(report.series.len(), 2);

    let parquet = dir.path().join("obs.parquet");
    assert_eq!(export_parquet(&parquet, &report.series).unwrap(), 3);
    let back = import_file(&parquet);
    assert!(back.success, "{:?}", back.error_text);
    let fopr = back.find("FOPR").unwrap();
    assert_eq!(fopr.values, vec![100.0, 110.0, 120.0]);
    assert_eq!(fopr.timestamps[2], datetime!(2019-03-01 0:00));
    assert_eq!(back.find("ERR:FOPR").unwrap().values, vec![5.0, 5.0, 6.0]);
}

#[test]
fn surfaces_import_in_both_encodings() {
    let dir = tempdir().expect("tempdir");
    let surface = Surface {
        nx: 2,
        ny: 2,
        xori: 500.0,
        yori: 800.0,
        xinc: 10.0,
        yinc: 20.0,
        rotation: 0.0,
        values: vec![Some(1700.0), None, Some(1710.5), Some(1712.0)],
    };

    let ascii = dir.path().join("top.irap");
    let mut file = File::create(&ascii).unwrap();
    surface.write_ascii(&mut file).unwrap();
    drop(file);
    let binary = dir.path().join("top.gri");
    let mut file = File::create(&binary).unwrap();
    surface.write_binary(&mut file).unwrap();
    drop(file);

    for path in [ascii, binary] {
        let report = import_file(&path);
        assert!(report.success, "{}: {:?}", path.display(), report.error_text);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.find("Z").unwrap().values, vec![1700.0, 1710.5, 1712.0]);
        assert_eq!(report.find("Y").unwrap().values, vec![800.0, 820.0, 820.0]);
    }
}

#[test]
fn well_path_imports_with_measured_depth() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("A-1.w");
    fs::write(
        &path,
        "1.0\nUnknown\nA-1 10.0 20.0\n1\nPERM mD lin\n10 20 0 -999\n10 20 30 150\n10 60 60 120\n",
    )
    .unwrap();
    let report = import_file(&path);
    assert!(report.success, "{:?}", report.error_text);
    assert_eq!(report.find("MD:A-1").unwrap().values, vec![0.0, 30.0, 80.0]);
    let perm = report.find("PERM:A-1").unwrap();
    assert_eq!(perm.unit.as_deref(), Some("mD"));
    assert!(perm.values[0].is_nan());
}

#[test]
fn unreadable_files_report_failure() {
    let dir = tempdir().expect("tempdir");
    let report = import_file(dir.path().join("absent.csv"));
    assert!(!report.success);
    assert!(report.series.is_empty());

    let garbage = dir.path().join("bad.gri");
    fs::write(&garbage, b"\x00\x00\x00\x20short").unwrap();
    assert!(!import_file(&garbage).success);
}

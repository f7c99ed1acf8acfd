use std::path::Path;
use std::thread;

use tempfile::tempdir;
use time::macros::datetime;
use time::{Duration, PrimitiveDateTime};

use kwfile::core::{ElementData, KeywordWriter};
use kwfile::restart::{RestartReader, RestartWriter};
use kwfile::Error;

const START: PrimitiveDateTime = datetime!(2010-01-01 0:00);

fn step_time(step: i32) -> PrimitiveDateTime {
    START + Duration::days(step as i64 * 10)
}

fn write_unified(path: &Path, steps: i32) {
    let mut writer = RestartWriter::create(path).expect("create");
    for step in 0..steps {
        writer
            .start_solution_block(step * 2, step_time(step), step as f64 * 10.0)
            .expect("start");
        writer
            .add_keyword_data("PRESSURE", ElementData::Float32(vec![200.0 + step as f32; 8]))
            .expect("pressure");
        writer
            .add_keyword_data("SGAS", ElementData::Float32(vec![0.1; 8]))
            .expect("sgas");
        writer.end_solution_block().expect("end");
    }
    writer.finish().expect("finish");
}

#[test]
fn date_lookup_brackets_the_requested_time() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("CASE.UNRST");
    write_unified(&path, 12);
    let mut reader = RestartReader::open(&path).expect("open");

    for hours in (0..=110 * 24).step_by(7) {
        let t = START + Duration::hours(hours);
        let idx = reader.get_step_at_or_after(t).unwrap().expect("inside range");
        let block = reader.read_block(idx).unwrap();
        assert!(block.sim_time >= t);
        if idx > 0 {
            assert!(reader.read_block(idx - 1).unwrap().sim_time < t);
        }
    }
    assert_eq!(reader.get_step_at_or_after(START - Duration::days(1)).unwrap(), None);
    assert_eq!(reader.get_step_at_or_after(step_time(11) + Duration::seconds(1)).unwrap(), None);
}

#[test]
fn blocks_are_read_lazily_and_randomly() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("CASE.UNRST");
    write_unified(&path, 6);
    let mut reader = RestartReader::open(&path).expect("open");

    let block = reader.read_block(2).unwrap();
    assert_eq!(block.step, 4);
    assert_eq!(block.sim_days, 20.0);
    assert_eq!(reader.index().len().unwrap(), 3);
    assert!(!reader.index().is_complete().unwrap());

    let pressure = reader.read_keyword(5, "PRESSURE").unwrap().unwrap();
    assert_eq!(pressure.as_f32().unwrap()[0], 205.0);
    assert!(reader.read_keyword(1, "SWAT").unwrap().is_none());
    assert_eq!(reader.get_step_by_number(6).unwrap(), Some(3));
    assert!(matches!(reader.read_block(6), Err(Error::StepOutOfRange(6))));
    assert_eq!(reader.steps().unwrap().len(), 6);
}

#[test]
fn handles_share_the_index_across_threads() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("CASE.UNRST");
    write_unified(&path, 16);
    let reader = RestartReader::open(&path).expect("open");

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let mut handle = reader.try_clone_handle().expect("handle");
            thread::spawn(move || {
                for idx in (worker..16).step_by(4).rev() {
                    let block = handle.read_block(idx).expect("block");
                    assert_eq!(block.step, idx as i32 * 2);
                    assert_eq!(block.solution().len(), 2);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker");
    }
    assert_eq!(reader.index().len().unwrap(), 16);
}

#[test]
fn split_restart_file_takes_step_from_extension() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("CASE.X0007");
    let mut intehead = vec![0; 411];
    intehead[64] = 15;
    intehead[65] = 6;
    intehead[66] = 2012;
    let mut writer = KeywordWriter::create(&path).expect("create");
    writer.append_data("INTEHEAD", ElementData::Int32(intehead)).unwrap();
    writer.append_data("DOUBHEAD", ElementData::Float64(vec![896.0])).unwrap();
    writer.append_data("STARTSOL", ElementData::Message(String::new())).unwrap();
    writer.append_data("PRESSURE", ElementData::Float32(vec![180.0; 4])).unwrap();
    writer.append_data("ENDSOL", ElementData::Message(String::new())).unwrap();
    writer.finish().unwrap();

    let mut reader = RestartReader::open(&path).expect("open");
    let steps = reader.steps().unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].step, 7);
    assert_eq!(steps[0].sim_time, datetime!(2012-06-15 0:00));
    assert_eq!(reader.read_block(0).unwrap().solution()[0].name(), "PRESSURE");
}

#[test]
fn empty_solution_block_is_refused() {
    let dir = tempdir().expect("tempdir");
    let mut writer = RestartWriter::create(dir.path().join("CASE.UNRST")).expect("create");
    writer.start_solution_block(1, START, 0.0).unwrap();
    assert!(matches!(writer.end_solution_block(), Err(Error::EmptySolutionBlock)));
}

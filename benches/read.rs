use std::path::Path;

use criterion::{black_box, BenchmarkId, Criterion};
use criterion::{criterion_group, criterion_main};
use tempfile::tempdir;
use time::macros::datetime;
use time::Duration;

use kwfile::core::{ElementData, FileMode, KeywordReader, KeywordWriter, StreamConfig};
use kwfile::restart::{RestartReader, RestartWriter};

const CELLS: usize = 20_000;
const STEPS: i32 = 64;

fn write_keywords(path: &Path, mode: FileMode) {
    let config = StreamConfig::default().with_mode(mode);
    let mut writer = KeywordWriter::create_with_config(path, &config).expect("create");
    for idx in 0..16 {
        let values: Vec<f32> = (0..CELLS).map(|c| (c + idx) as f32 * 0.5).collect();
        writer
            .append_data(&format!("ARR{idx}"), ElementData::Float32(values))
            .expect("append");
    }
    writer.finish().expect("finish");
}

fn write_restart(path: &Path) {
    let mut writer = RestartWriter::create(path).expect("create");
    let start = datetime!(2000-01-01 0:00);
    for step in 0..STEPS {
        writer
            .start_solution_block(step, start + Duration::days(step as i64 * 30), step as f64 * 30.0)
            .expect("start");
        writer
            .add_keyword_data("PRESSURE", ElementData::Float32(vec![step as f32; CELLS]))
            .expect("pressure");
        writer
            .add_keyword_data("SWAT", ElementData::Float32(vec![0.2; CELLS]))
            .expect("swat");
        writer.end_solution_block().expect("end");
    }
    writer.finish().expect("finish");
}

fn bench_sequential(c: &mut Criterion) {
    let dir = tempdir().expect("tempdir");
    let mut group = c.benchmark_group("sequential_read");
    for (label, mode, file) in [
        ("unformatted", FileMode::Unformatted, "CASE.INIT"),
        ("formatted", FileMode::Formatted, "CASE.FINIT"),
    ] {
        let path = dir.path().join(file);
        write_keywords(&path, mode);
        group.bench_with_input(BenchmarkId::from_parameter(label), &path, |b, path| {
            b.iter(|| {
                let mut reader = KeywordReader::open(path).expect("open");
                let records = reader.read_all().expect("read");
                black_box(records.len())
            });
        });
    }
    group.finish();
}

fn bench_restart_random_access(c: &mut Criterion) {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("CASE.UNRST");
    write_restart(&path);

    let mut reader = RestartReader::open(&path).expect("open");
    reader.index_all().expect("index");
    c.bench_function("restart_read_block", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            idx = (idx * 7 + 13) % STEPS as usize;
            let block = reader.read_block(black_box(idx)).expect("block");
            black_box(block.keywords.len())
        });
    });
    c.bench_function("restart_date_lookup", |b| {
        let time = datetime!(2002-06-15 0:00);
        b.iter(|| black_box(reader.get_step_at_or_after(black_box(time)).expect("lookup")));
    });
}

criterion_group!(benches, bench_sequential, bench_restart_random_access);
criterion_main!(benches);

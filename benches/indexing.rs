//! Index building benchmarks over generated log files.
//!
//! Run with: `cargo bench --bench indexing`
//! Save baseline: `cargo bench --bench indexing -- --save-baseline main`
//! Compare: `cargo bench --bench indexing -- --baseline main`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use loglens::index::{ChunkReader, LineIndexBuilder};
use loglens::utils::{AbortFlag, NoProgress};
use std::fs;
use std::hint::black_box;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const LEVELS: [&str; 4] = ["INFO", "WARN", "ERROR", "DEBUG"];

/// Write a log file of roughly `lines` lines with mixed terminators
fn create_log_file(lines: usize) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("bench.log");

    let mut content = String::with_capacity(lines * 80);
    for i in 0..lines {
        let terminator = if i % 50 == 0 { "\r\n" } else { "\n" };
        content.push_str(&format!(
            "2024-03-01T12:{:02}:{:02}.{:03}Z {} worker-{} request {} handled in {}ms{}",
            (i / 60) % 60,
            i % 60,
            i % 1000,
            LEVELS[i % LEVELS.len()],
            i % 16,
            i,
            i % 977,
            terminator
        ));
    }
    fs::write(&path, content).expect("Failed to write log file");
    (dir, path)
}

fn bench_build_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_index");
    group.measurement_time(Duration::from_secs(10));

    for lines in [10_000, 100_000, 1_000_000] {
        let (_dir, path) = create_log_file(lines);
        let size = fs::metadata(&path).expect("Failed to stat log file").len();
        group.throughput(Throughput::Bytes(size));

        for use_mmap in [false, true] {
            let label = if use_mmap { "mmap" } else { "pread" };
            let reader = ChunkReader::open(&path, use_mmap).expect("Failed to open log file");
            group.bench_with_input(BenchmarkId::new(label, lines), &reader, |b, reader| {
                b.iter(|| {
                    LineIndexBuilder::default()
                        .build(black_box(reader), &mut NoProgress, &AbortFlag::new())
                        .expect("Failed to build index")
                })
            });
        }
    }
    group.finish();
}

fn bench_chunk_size(c: &mut Criterion) {
    let (_dir, path) = create_log_file(200_000);
    let reader = ChunkReader::open(&path, false).expect("Failed to open log file");

    let mut group = c.benchmark_group("chunk_size");
    group.throughput(Throughput::Bytes(reader.len()));
    for chunk_size in [64 * 1024, 1024 * 1024, 8 * 1024 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk_size), &chunk_size, |b, &size| {
            b.iter(|| {
                LineIndexBuilder::new(size)
                    .build(&reader, &mut NoProgress, &AbortFlag::new())
                    .expect("Failed to build index")
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_index, bench_chunk_size);
criterion_main!(benches);

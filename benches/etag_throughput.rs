use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use etagverify::{hash_chunked, hash_stream, ChunkPlan, DEFAULT_STREAM_BLOCK_SIZE, MIB};
use std::fs::File;
use std::hint::black_box;
use std::io::Write;
use tempfile::TempDir;

const FILE_SIZE: usize = 64 * MIB as usize;

fn create_test_file(size: usize) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("object.bin");

    let mut file = File::create(&file_path).unwrap();
    let chunk = vec![0x42u8; MIB as usize];
    for _ in 0..(size / MIB as usize) {
        file.write_all(&chunk).unwrap();
    }
    file.sync_all().unwrap();

    (temp_dir, file_path)
}

fn bench_multipart(c: &mut Criterion) {
    let mut group = c.benchmark_group("multipart_etag");
    group.throughput(Throughput::Bytes(FILE_SIZE as u64));
    group.sample_size(10);

    let (_temp_dir, file_path) = create_test_file(FILE_SIZE);
    let plan = ChunkPlan::for_local(FILE_SIZE as u64, 8 * MIB).unwrap();

    for workers in [1usize, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("hash_chunked", workers),
            &workers,
            |b, &workers| {
                b.iter(|| black_box(hash_chunked(&file_path, &plan, workers, None).unwrap()));
            },
        );
    }

    group.bench_function("hash_stream", |b| {
        b.iter(|| black_box(hash_stream(&file_path, DEFAULT_STREAM_BLOCK_SIZE, None).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_multipart);
criterion_main!(benches);

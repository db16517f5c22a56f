#![allow(missing_docs)]
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use verichain_primitives::{ContentHasher, DocumentHash, Sha256Hasher};

pub fn hasher_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_hash");
    let hasher = Sha256Hasher::new();

    // Typical document sizes: a short text file up to a multi-megabyte PDF
    for size in [1024usize, 64 * 1024, 1024 * 1024, 8 * 1024 * 1024] {
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("sha256", size), &data, |b, data| {
            b.iter(|| black_box(hasher.digest(black_box(data))))
        });
    }

    group.finish();

    let hex = "9f".repeat(32);
    c.bench_function("parse_hex", |b| {
        b.iter(|| black_box(DocumentHash::from_hex(black_box(&hex))))
    });
}

criterion_group!(benches, hasher_benchmarks);
criterion_main!(benches);

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mirror_fs::io::{self, RobustnessConfig};
use mirror_fs::{NormalizedPath, scan};
use std::fs;
use tempfile::tempdir;

fn write_atomic_benchmark(c: &mut Criterion) {
    c.bench_function("io::write_atomic", |b| {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("test_file.txt"));
        let content = "hello world".as_bytes();
        let config = RobustnessConfig::default();

        b.iter(|| {
            io::write_atomic(black_box(&path), black_box(content), config).unwrap();
        })
    });
}

fn scan_benchmark(c: &mut Criterion) {
    c.bench_function("scan::scan (200 files)", |b| {
        let dir = tempdir().unwrap();
        for d in 0..10 {
            let sub = dir.path().join(format!("dir{}", d));
            fs::create_dir_all(&sub).unwrap();
            for f in 0..20 {
                fs::write(sub.join(format!("f{}.txt", f)), "x").unwrap();
            }
        }

        b.iter(|| {
            let entries = scan(black_box(dir.path())).unwrap();
            assert_eq!(entries.len(), 210);
        })
    });
}

criterion_group!(benches, write_atomic_benchmark, scan_benchmark);
criterion_main!(benches);

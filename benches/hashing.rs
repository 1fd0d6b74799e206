use criterion::{criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

fn bench_message_checksum(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..4 {
        let path = dir.path().join(format!("att_{i}.bin"));
        std::fs::write(&path, vec![i as u8; 256 * 1024]).unwrap();
        paths.push((format!("att_{i}.bin"), path));
    }

    c.bench_function("message_checksum_4x256k", |b| {
        b.iter(|| {
            mmsarc::checksum::compute_checksum(
                Some("subject"),
                Some("body text"),
                paths.iter().map(|(name, path)| (name.as_str(), path.as_path())),
            )
            .unwrap()
        })
    });
}

fn bench_index_build(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    for i in 0..64 {
        let sub = dir.path().join(format!("msg-{}", i / 8));
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join(format!("file_{i}.jpg")), vec![i as u8; 16 * 1024]).unwrap();
    }

    c.bench_function("build_index_64_files", |b| {
        b.iter(|| mmsarc::index::builder::build_index(dir.path(), None).unwrap())
    });
}

criterion_group!(benches, bench_message_checksum, bench_index_build);
criterion_main!(benches);

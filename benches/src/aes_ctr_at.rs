//! Random-access AES-CTR benchmark
use benches::{criterion_group_bench, Benchmarker, SIZES};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use aes_ctr_at::{AesCtrAt, BackendKind};
use ctr::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};

const IV: [u8; 16] = [0x24; 16];

fn backends() -> Vec<(&'static str, BackendKind)> {
    let mut out = vec![("portable", BackendKind::Portable)];
    if BackendKind::Accelerated.is_available() {
        out.push(("accelerated", BackendKind::Accelerated));
    }
    out
}

fn bench_key_sizes(c: &mut Benchmarker) {
    for key_len in [16, 24, 32] {
        let key = vec![0x42u8; key_len];
        let mut group = c.benchmark_group(format!("aes{}-ctr-at", key_len * 8));

        for (name, kind) in backends() {
            let cipher = AesCtrAt::with_backend(&key, kind).unwrap();
            for size in SIZES {
                let mut buf = vec![0u8; size];
                group.throughput(Throughput::Bytes(size as u64));
                group.bench_function(BenchmarkId::new(name, size), |b| {
                    b.iter(|| cipher.apply_keystream_at(&IV, 0, &mut buf).unwrap());
                });
            }
        }

        group.finish();
    }
}

// misaligned offsets go through the head and tail paths
fn bench_offsets(c: &mut Benchmarker) {
    const SIZE: usize = 64 * 1024;

    let cipher = AesCtrAt::new(&[0x42u8; 16]).unwrap();
    let src = vec![0u8; SIZE];
    let mut dst = vec![0u8; SIZE];

    let mut group = c.benchmark_group("aes128-ctr-at-offset");
    group.throughput(Throughput::Bytes(SIZE as u64));
    for offset in [0u64, 1, 16, 1024, 1 << 40] {
        group.bench_function(BenchmarkId::new("b2b", offset), |b| {
            b.iter(|| {
                cipher
                    .apply_keystream_at_b2b(&IV, offset, &src, &mut dst)
                    .unwrap();
            });
        });
    }
    group.finish();
}

fn bench_ctr_crate(c: &mut Benchmarker) {
    type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

    let mut group = c.benchmark_group("aes128-ctr-seek");
    for size in SIZES {
        let mut buf = vec![0u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(BenchmarkId::new("ctr", size), |b| {
            let mut cipher = Aes128Ctr::new(&[0x42; 16].into(), &IV.into());
            b.iter(|| {
                cipher.seek(0u64);
                cipher.apply_keystream(&mut buf);
            });
        });
    }
    group.finish();
}

criterion_group_bench!(benches_aes_ctr_at, bench_key_sizes, bench_offsets, bench_ctr_crate);

criterion_main!(benches_aes_ctr_at);

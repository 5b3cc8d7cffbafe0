//! Benchmarks for the per-period mix pass.
//!
//! Run with: cargo bench
//!
//! The pass must finish far inside one period to leave the playback thread
//! headroom for the device write. Deadlines at 44.1 kHz mono:
//!   - 441 frames  = 10 ms deadline
//!   - 1102 frames = 25 ms deadline
//!   - 2205 frames = 50 ms deadline (the default period)
//! Worst case is 30 voices all active, which is what the 30-voice group
//! measures.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use bitemix::clip::Clip;
use bitemix::pool::VoicePool;

/// Period sizes at 10/25/50 ms of mono 44.1 kHz audio.
const PERIOD_SIZES: &[usize] = &[441, 1102, 2205];

fn bench_mix_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("mix/pass");

    for &size in PERIOD_SIZES {
        for &voices in &[1usize, 8, 30] {
            // Long clips so refills are rare relative to iterations.
            let samples: Vec<i16> = (0..size * 64)
                .map(|i| ((i % 128) as i16 - 64) * 200)
                .collect();
            let clip = Clip::from_samples(samples);

            let pool = VoicePool::new();
            for _ in 0..voices {
                pool.enqueue(&clip).unwrap();
            }

            let mut out = vec![0i16; size];
            group.bench_with_input(
                BenchmarkId::new(format!("{voices}_voices"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        if pool.active() == 0 {
                            for _ in 0..voices {
                                pool.enqueue(&clip).unwrap();
                            }
                        }
                        pool.mix_into(black_box(&mut out));
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_mix_pass);
criterion_main!(benches);

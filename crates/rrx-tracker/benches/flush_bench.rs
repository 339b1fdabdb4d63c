//! Benchmarks for invalidate-and-flush throughput.
//!
//! Run with: cargo bench -p rrx-tracker -- flush

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use rrx_tracker::{Computation, Tracker, Var};

// ---------------------------------------------------------------------------
// 1. Fan-out: one var read by N computations
// ---------------------------------------------------------------------------

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush/fan_out");

    for count in [10u64, 100, 1_000] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let tracker = Tracker::new();
            let source = Var::new(&tracker, 0u64);
            let _readers: Vec<Computation> = (0..count)
                .map(|_| {
                    let read = source.accessor();
                    tracker.autorun(move |_| {
                        black_box(read());
                    })
                })
                .collect();

            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                source.set(next);
                black_box(tracker.flush().unwrap());
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 2. Coalescing: many invalidations of one computation per flush
// ---------------------------------------------------------------------------

fn bench_coalesce(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush/coalesce");

    for bursts in [1u64, 16, 256] {
        group.throughput(Throughput::Elements(bursts));
        group.bench_with_input(BenchmarkId::from_parameter(bursts), &bursts, |b, &bursts| {
            let tracker = Tracker::new();
            let computation = tracker.autorun(|_| {});
            b.iter(|| {
                for _ in 0..bursts {
                    computation.invalidate();
                }
                black_box(tracker.flush().unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fan_out, bench_coalesce);
criterion_main!(benches);

//! Benchmarks for ddosd per-packet and per-window paths
//!
//! Run with: cargo bench --features full

// Require the windowing and detection features
#[cfg(not(all(feature = "exact", feature = "anomaly")))]
compile_error!("Benchmarks require the exact and anomaly features. Run: cargo bench --features full");

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use ddosd::anomaly::{AlarmRule, AnomalyDetector, TrafficCharacterizer};
use ddosd::entropy::{entropy_term, EntropyEstimator, ExactEntropy};
use ddosd::lookup::RangeLookupTable;
use ddosd::sketch::CountSketch;
use ddosd::window::{EntropyPipeline, Packet};

/// Spread sequential counters over the address space
fn address(i: u32) -> u32 {
    i.wrapping_mul(2_654_435_761)
}

// ============================================================================
// Count Sketch Benchmarks
// ============================================================================

fn bench_count_sketch(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_sketch");
    group.throughput(Throughput::Elements(1));

    for depth in [3, 5, 7] {
        group.bench_function(format!("update_d{}", depth), |b| {
            let mut sketch = CountSketch::with_seed(depth, 4096, 1).unwrap();
            let mut i = 0u32;
            b.iter(|| {
                black_box(sketch.update(address(i % 1024)));
                i = i.wrapping_add(1);
            });
        });
    }

    group.bench_function("reset", |b| {
        let mut sketch = CountSketch::with_seed(5, 65_536, 1).unwrap();
        b.iter(|| sketch.reset());
    });

    group.finish();
}

// ============================================================================
// Range Lookup Table Benchmarks
// ============================================================================

fn bench_lookup_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_lookup_table");

    for window in [1024u32, 16_384] {
        group.bench_function(format!("build_w{}", window), |b| {
            b.iter(|| RangeLookupTable::build(entropy_term, black_box(window), 1).unwrap());
        });
    }

    group.throughput(Throughput::Elements(1));
    group.bench_function("get", |b| {
        let table = RangeLookupTable::build(entropy_term, 16_384, 1).unwrap();
        let mut i = 0u32;
        b.iter(|| {
            let value = table.get(i % 16_385).unwrap();
            i = i.wrapping_add(1);
            black_box(value)
        });
    });

    group.finish();
}

// ============================================================================
// Entropy Benchmarks
// ============================================================================

fn bench_estimator(c: &mut Criterion) {
    let mut group = c.benchmark_group("entropy_estimator");
    group.throughput(Throughput::Elements(1));

    for width in [1024, 16_384] {
        group.bench_function(format!("update_w{}", width), |b| {
            let mut estimator = EntropyEstimator::with_seed(4096, 5, width, 1).unwrap();
            let mut i = 0u32;
            b.iter(|| {
                if estimator.packets() == 4096 {
                    estimator.reset();
                }
                estimator.update(address(i % 500), i % 20).unwrap();
                i = i.wrapping_add(1);
            });
        });
    }

    group.bench_function("readout", |b| {
        let mut estimator = EntropyEstimator::with_seed(4096, 5, 4096, 1).unwrap();
        for i in 0..4096u32 {
            estimator.update(address(i % 500), i % 20).unwrap();
        }
        b.iter(|| black_box((estimator.src_entropy(), estimator.dst_entropy())));
    });

    group.finish();
}

fn bench_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact_entropy");
    group.throughput(Throughput::Elements(1));

    group.bench_function("update", |b| {
        let mut exact = ExactEntropy::new();
        let mut i = 0u32;
        b.iter(|| {
            if exact.packets() == 4096 {
                exact.reset();
            }
            exact.update(address(i % 500), i % 20);
            i = i.wrapping_add(1);
        });
    });

    group.bench_function("readout", |b| {
        let mut exact = ExactEntropy::new();
        for i in 0..4096u32 {
            exact.update(address(i % 500), i % 20);
        }
        b.iter(|| black_box((exact.src_entropy(), exact.dst_entropy())));
    });

    group.finish();
}

// ============================================================================
// Detection Benchmarks
// ============================================================================

fn bench_characterizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("characterizer");
    group.throughput(Throughput::Elements(1));

    group.bench_function("update", |b| {
        let mut characterizer = TrafficCharacterizer::new(32);
        let mut i = 0u32;
        b.iter(|| {
            characterizer.update(black_box(100 + i % 50), black_box(60 + i % 30));
            i = i.wrapping_add(1);
        });
    });

    group.bench_function("observe", |b| {
        let mut detector = AnomalyDetector::new(32, AlarmRule::new(24, 10));
        let mut i = 0u32;
        b.iter(|| {
            let verdict = detector.observe(100 + i % 50, 60 + i % 30);
            i = i.wrapping_add(1);
            black_box(verdict)
        });
    });

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_baseline_and_4_estimators", |b| {
        let mut pipeline = EntropyPipeline::new(4096).unwrap().with_baseline();
        for seed in 0..4 {
            pipeline
                .add_estimator(EntropyEstimator::with_seed(4096, 5, 4096, seed).unwrap())
                .unwrap();
        }
        let mut i = 0u32;
        b.iter(|| {
            let report = pipeline
                .push(Packet::new(address(i % 500), i % 20, i as u64))
                .unwrap();
            i = i.wrapping_add(1);
            black_box(report)
        });
    });

    group.finish();
}

// ============================================================================
// Main
// ============================================================================

criterion_group!(
    benches,
    bench_count_sketch,
    bench_lookup_table,
    bench_estimator,
    bench_exact,
    bench_characterizer,
    bench_pipeline,
);

criterion_main!(benches);

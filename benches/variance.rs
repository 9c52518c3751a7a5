use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use fia_estimator::estimation::{PopulationTotals, StratumSample, StratumVariance, VarianceEngine};
use fia_estimator::models::{AdjustmentFactors, Stratum};

// =============================================================================
// Synthetic design
// =============================================================================

/// `n_strata` strata of `plots` plots each, spread over ten estimation units
fn make_samples(n_strata: usize, plots: usize) -> Vec<StratumSample> {
    (0..n_strata)
        .map(|s| {
            let stratum = Stratum {
                cn: format!("S{s}"),
                estn_unit_cn: format!("U{}", s % 10),
                evalid: 132301,
                expansion_factor: 5000.0 + s as f64,
                adjustment: AdjustmentFactors::default(),
                p1_points: Some((plots * 40) as f64),
                p2_points: None,
            };
            let y = (0..plots)
                .map(|p| ((p * 7919 + s * 31) % 997) as f64 * 0.37)
                .collect();
            let x = (0..plots)
                .map(|p| if p % 5 == 0 { 0.5 } else { 1.0 })
                .collect();
            StratumSample::new(stratum, y, x)
        })
        .collect()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_stratum_variance(c: &mut Criterion) {
    let samples = make_samples(1, 2000);
    c.bench_function("stratum_variance_2000_plots", |b| {
        b.iter(|| StratumVariance::compute(black_box(&samples[0]), true))
    });
}

fn bench_pooled_variance(c: &mut Criterion) {
    let mut group = c.benchmark_group("pooled_variance");
    let samples = make_samples(400, 150);

    for workers in [1usize, 4] {
        let engine = VarianceEngine::new(workers, true).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(workers), &samples, |b, samples| {
            b.iter(|| {
                let pooled = engine.pooled(black_box(samples));
                let totals = PopulationTotals::from_samples(samples);
                black_box((pooled, totals))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stratum_variance, bench_pooled_variance);
criterion_main!(benches);

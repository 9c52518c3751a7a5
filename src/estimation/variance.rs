//! Stratified variance of expanded totals and of ratio estimates.
//!
//! For stratum `h` with `n_h` plots, expansion factor `EXPNS_h` and
//! represented area `A_h = EXPNS_h * n_h`:
//!
//! ```text
//! s2_h    = [sum(y^2) - n_h * mean(y)^2] / (n_h - 1)      (0 when n_h <= 1)
//! Var(Y)  = sum_h A_h^2 * (1 - f_h) * s2_h / n_h
//! Var(R)  = [Var(Y) + R^2 Var(X) - 2 R Cov(Y, X)] / X^2
//! ```
//!
//! Sample moments are computed in the centred two-pass form, which is
//! algebraically identical to the textbook expression but stays exact for
//! constant strata and finite across wide magnitude ranges.

use super::population::StratumSample;
use crate::error::{EstimationError, Result};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Sample variance `s2` of one stratum's plot responses
pub fn stratum_variance(values: &[f64]) -> f64 {
    stratum_covariance(values, values)
}

/// Sample covariance of paired plot responses; zero when fewer than two plots
pub fn stratum_covariance(y: &[f64], x: &[f64]) -> f64 {
    let n = y.len().min(x.len());
    if n <= 1 {
        return 0.0;
    }
    let (y, x) = (&y[..n], &x[..n]);
    if is_constant(y) || is_constant(x) {
        return 0.0;
    }

    let n_f = n as f64;
    let mean_y = y.iter().sum::<f64>() / n_f;
    let mean_x = x.iter().sum::<f64>() / n_f;
    let cross: f64 = y
        .iter()
        .zip(x)
        .map(|(yi, xi)| (yi - mean_y) * (xi - mean_x))
        .sum();
    cross / (n_f - 1.0)
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Finite-population correction `1 - f_h`, or 1 when design counts are unusable
pub fn finite_population_correction(sample: &StratumSample, enabled: bool) -> f64 {
    if !enabled {
        return 1.0;
    }
    match sample.stratum.sampling_fraction(sample.n()) {
        Some(fraction) => 1.0 - fraction,
        None => {
            debug!(
                "Stratum {}: no usable P1POINTCNT for {} plots, FPC set to 1",
                sample.stratum.cn,
                sample.n()
            );
            1.0
        }
    }
}

/// Variance contribution of one stratum to the expanded totals
#[derive(Debug, Clone, PartialEq)]
pub struct StratumVariance {
    pub stratum_cn: String,
    pub estn_unit_cn: String,
    pub n: usize,
    pub var_y: f64,
    pub var_x: f64,
    pub cov_yx: f64,
}

impl StratumVariance {
    pub fn compute(sample: &StratumSample, fpc_enabled: bool) -> Self {
        let n = sample.n();
        let (var_y, var_x, cov_yx) = if n <= 1 {
            (0.0, 0.0, 0.0)
        } else {
            let area = sample.area_weight();
            let scale = area * area * finite_population_correction(sample, fpc_enabled) / n as f64;
            (
                scale * stratum_variance(&sample.y),
                scale * stratum_variance(&sample.x),
                scale * stratum_covariance(&sample.y, &sample.x),
            )
        };
        Self {
            stratum_cn: sample.stratum.cn.clone(),
            estn_unit_cn: sample.stratum.estn_unit_cn.clone(),
            n,
            var_y,
            var_x,
            cov_yx,
        }
    }
}

/// Pooled variance components of the expanded totals
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PooledVariance {
    pub var_y: f64,
    pub var_x: f64,
    pub cov_yx: f64,
}

impl PooledVariance {
    fn add(&mut self, other: &Self) {
        self.var_y += other.var_y;
        self.var_x += other.var_x;
        self.cov_yx += other.cov_yx;
    }
}

/// Pool stratum contributions within estimation units, then across units
pub fn pool(strata: &[StratumVariance]) -> PooledVariance {
    let mut units: BTreeMap<&str, PooledVariance> = BTreeMap::new();
    for stratum in strata {
        units
            .entry(stratum.estn_unit_cn.as_str())
            .or_default()
            .add(&PooledVariance {
                var_y: stratum.var_y,
                var_x: stratum.var_x,
                cov_yx: stratum.cov_yx,
            });
    }

    let mut total = PooledVariance::default();
    for unit in units.values() {
        total.add(unit);
    }
    total
}

/// Taylor-linearised variance of the ratio `Y / X`
pub fn ratio_variance(
    y_total: f64,
    x_total: f64,
    var_y: f64,
    var_x: f64,
    cov_yx: f64,
) -> Result<f64> {
    if x_total == 0.0 || !x_total.is_finite() {
        return Err(EstimationError::insufficient_data(format!(
            "ratio variance undefined for denominator total {}",
            x_total
        )));
    }
    let r = y_total / x_total;
    let variance = (var_y + r * r * var_x - 2.0 * r * cov_yx) / (x_total * x_total);
    // Rounding can push perfectly correlated ratios slightly below zero
    Ok(variance.max(0.0))
}

pub fn standard_error(variance: f64) -> f64 {
    variance.max(0.0).sqrt()
}

/// Coefficient of variation in percent; undefined for a zero estimate
pub fn coefficient_of_variation(se: f64, estimate: f64) -> Result<f64> {
    if estimate == 0.0 || !estimate.is_finite() {
        return Err(EstimationError::insufficient_data(
            "coefficient of variation undefined for a zero estimate",
        ));
    }
    Ok(100.0 * se / estimate.abs())
}

/// Computes stratum variances on a dedicated thread pool
pub struct VarianceEngine {
    pool: ThreadPool,
    finite_population_correction: bool,
}

impl VarianceEngine {
    pub fn new(workers: usize, finite_population_correction: bool) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .map_err(|e| {
                EstimationError::configuration(format!("failed to build variance pool: {}", e))
            })?;
        Ok(Self {
            pool,
            finite_population_correction,
        })
    }

    /// Per-stratum contributions, computed concurrently
    pub fn stratum_variances(&self, samples: &[StratumSample]) -> Vec<StratumVariance> {
        let fpc = self.finite_population_correction;
        self.pool.install(|| {
            samples
                .par_iter()
                .map(|sample| StratumVariance::compute(sample, fpc))
                .collect()
        })
    }

    /// Pooled variance once every stratum has finished
    pub fn pooled(&self, samples: &[StratumSample]) -> PooledVariance {
        let strata = self.stratum_variances(samples);
        let pooled = pool(&strata);
        debug!(
            "Pooled {} strata: var_y={:.6e}, var_x={:.6e}, cov={:.6e}",
            strata.len(),
            pooled.var_y,
            pooled.var_x,
            pooled.cov_yx
        );
        pooled
    }
}

impl std::fmt::Debug for VarianceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VarianceEngine")
            .field("threads", &self.pool.current_num_threads())
            .field(
                "finite_population_correction",
                &self.finite_population_correction,
            )
            .finish()
    }
}

//! Ratio-of-means population estimator.

use crate::error::{EstimationError, Result};
use crate::models::Stratum;

/// Per-plot responses of one stratum for one output group.
///
/// `y` and `x` hold one entry per plot assigned to the stratum, zeros
/// included, so `n()` is the stratum sample size.
#[derive(Debug, Clone, PartialEq)]
pub struct StratumSample {
    pub stratum: Stratum,
    pub y: Vec<f64>,
    pub x: Vec<f64>,
}

impl StratumSample {
    pub fn new(stratum: Stratum, y: Vec<f64>, x: Vec<f64>) -> Self {
        debug_assert_eq!(y.len(), x.len());
        Self { stratum, y, x }
    }

    pub fn n(&self) -> usize {
        self.y.len()
    }

    /// Area the stratum represents: expansion factor times plot count
    pub fn area_weight(&self) -> f64 {
        self.stratum.expansion_factor * self.n() as f64
    }
}

/// Expanded numerator and denominator totals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationTotals {
    pub y: f64,
    pub x: f64,
}

impl PopulationTotals {
    pub fn from_samples(samples: &[StratumSample]) -> Self {
        let mut y = 0.0;
        let mut x = 0.0;
        for sample in samples {
            let expns = sample.stratum.expansion_factor;
            y += expns * sample.y.iter().sum::<f64>();
            x += expns * sample.x.iter().sum::<f64>();
        }
        Self { y, x }
    }

    /// `Y / X`, failing when the denominator is zero or not finite
    pub fn ratio(&self) -> Result<f64> {
        ratio_of_means(self.y, self.x)
    }
}

/// Ratio-of-means estimate `Y / X`
pub fn ratio_of_means(y_total: f64, x_total: f64) -> Result<f64> {
    if x_total == 0.0 || !x_total.is_finite() {
        return Err(EstimationError::insufficient_data(format!(
            "denominator total is {} so the ratio estimate is undefined",
            x_total
        )));
    }
    let ratio = y_total / x_total;
    if !ratio.is_finite() {
        return Err(EstimationError::insufficient_data(format!(
            "ratio {} / {} is not finite",
            y_total, x_total
        )));
    }
    Ok(ratio)
}

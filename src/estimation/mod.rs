//! Post-stratified ratio-of-means estimation.
//!
//! Every measure runs through the same pipeline: select evaluations, link
//! plots to strata, filter domains, compute per-record contributions,
//! aggregate them to plots in two stages, then expand, ratio and pool
//! stratified variances into a one-row-per-group result table.

pub mod aggregation;
pub mod components;
pub mod estimators;
pub mod frames;
pub mod measure;
pub mod output;
pub mod pipeline;
pub mod population;
pub mod stratification;
pub mod values;
pub mod variance;

#[cfg(test)]
pub mod tests;

pub use estimators::{
    area, area_change, biomass, growth, mortality, removals, tree_count, volume,
};
pub use measure::{Grain, GrmKind, Measure};
pub use output::{EstimationOutput, GroupEstimate, GroupFailure, OutputLayout, convert_uncertainty};
pub use population::{PopulationTotals, StratumSample};
pub use stratification::StratificationDesign;
pub use variance::{PooledVariance, StratumVariance, VarianceEngine};

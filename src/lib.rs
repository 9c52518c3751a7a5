//! FIA Estimator Library
//!
//! Design-based population estimates from USDA Forest Service Forest
//! Inventory and Analysis (FIA) database tables.
//!
//! This library provides tools for:
//! - Loading FIADB tables from Parquet or CSV files into lazy frames
//! - Selecting evaluations and linking plots to their sampling strata
//! - Parsing tree and area domain predicates into filter expressions
//! - Area, area change, volume, biomass, tree count, mortality, removals
//!   and growth estimators over the same post-stratified pipeline
//! - Ratio-of-means estimates with Bechtold & Patterson stratified variance
//!
//! ```no_run
//! use fia_estimator::{EstimatorConfig, FiaDatabase, LandType, VolumeType};
//! use std::path::Path;
//!
//! let database = FiaDatabase::from_directory(Path::new("data/ga"))?;
//! let config = EstimatorConfig::default()
//!     .with_land_type(LandType::Timber)
//!     .with_grp_by(["SPCD"])
//!     .with_totals();
//! let output = fia_estimator::volume(&database, &config, VolumeType::Net)?;
//! println!("{}", output.frame);
//! # Ok::<(), fia_estimator::EstimationError>(())
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod domain;
pub mod error;
pub mod estimation;
pub mod evaluation;
pub mod models;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{
    AreaChangeType, BiomassComponent, EstimatorConfig, GrmAttribute, GrmTreeClass, LandType,
    TreeCountMetric, TreeType, VolumeType,
};
pub use database::FiaDatabase;
pub use error::{EstimationError, Result};
pub use estimation::{
    EstimationOutput, GroupFailure, Measure, area, area_change, biomass, convert_uncertainty,
    growth, mortality, removals, tree_count, volume,
};
pub use evaluation::{EvalType, EvaluationId};

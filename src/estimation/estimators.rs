//! Public entry points, one per measure.

use super::measure::Measure;
use super::output::EstimationOutput;
use super::pipeline;
use crate::config::{
    AreaChangeType, BiomassComponent, EstimatorConfig, GrmAttribute, GrmTreeClass,
    TreeCountMetric, VolumeType,
};
use crate::database::FiaDatabase;
use crate::error::Result;

/// Land area as a percentage of the land type (`AREA_PERC`)
pub fn area(database: &FiaDatabase, config: &EstimatorConfig) -> Result<EstimationOutput> {
    pipeline::run(database, config, &Measure::Area)
}

/// Gain, loss or net change in land-type area between measurements
pub fn area_change(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    change: AreaChangeType,
    annualize: bool,
) -> Result<EstimationOutput> {
    pipeline::run(database, config, &Measure::AreaChange { change, annualize })
}

/// Per-acre and total volume
pub fn volume(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    volume: VolumeType,
) -> Result<EstimationOutput> {
    pipeline::run(database, config, &Measure::Volume { volume })
}

/// Per-acre and total dry biomass in tons
pub fn biomass(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    component: BiomassComponent,
) -> Result<EstimationOutput> {
    pipeline::run(database, config, &Measure::Biomass { component })
}

/// Trees per acre or basal area per acre
pub fn tree_count(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    metric: TreeCountMetric,
) -> Result<EstimationOutput> {
    pipeline::run(database, config, &Measure::TreeCount { metric })
}

pub fn mortality(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    tree_class: GrmTreeClass,
    attribute: GrmAttribute,
    annualize: bool,
) -> Result<EstimationOutput> {
    pipeline::run(
        database,
        config,
        &Measure::Mortality {
            tree_class,
            attribute,
            annualize,
        },
    )
}

pub fn removals(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    tree_class: GrmTreeClass,
    attribute: GrmAttribute,
    annualize: bool,
) -> Result<EstimationOutput> {
    pipeline::run(
        database,
        config,
        &Measure::Removals {
            tree_class,
            attribute,
            annualize,
        },
    )
}

/// Net annual growth; always annualised by `REMPER`
pub fn growth(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    tree_class: GrmTreeClass,
    attribute: GrmAttribute,
) -> Result<EstimationOutput> {
    pipeline::run(
        database,
        config,
        &Measure::Growth {
            tree_class,
            attribute,
        },
    )
}

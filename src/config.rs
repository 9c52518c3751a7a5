//! Configuration management and validation.
//!
//! Provides the uniform configuration surface shared by every estimator
//! entry point, plus the measure-specific option enums.

use crate::error::{EstimationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Land classification restricting which conditions are in the population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandType {
    /// Every sampled condition
    All,
    /// Accessible forest land
    #[default]
    Forest,
    /// Productive, unreserved forest land
    Timber,
}

/// Tree status family restricting which trees contribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeType {
    All,
    #[default]
    Live,
    Dead,
    GrowingStock,
    /// Live sawtimber trees carrying a gross board-foot scale
    GrossScale,
}

/// Cubic or board-foot volume attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeType {
    #[default]
    Net,
    Gross,
    Sound,
    Sawlog,
    BoardFoot,
}

/// Dry-weight biomass component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiomassComponent {
    #[default]
    AboveGround,
    BelowGround,
    Total,
}

/// Per-unit tree count metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeCountMetric {
    /// Trees per acre
    #[default]
    Trees,
    /// Basal area (square feet) per acre
    BasalArea,
}

/// Tree class basis of the growth/removal/mortality columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrmTreeClass {
    AllLive,
    #[default]
    GrowingStock,
}

/// Attribute measured on growth/removal/mortality trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrmAttribute {
    #[default]
    Volume,
    Biomass,
    Count,
}

/// Direction of land-use change counted by the area-change measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaChangeType {
    #[default]
    Net,
    GrossGain,
    GrossLoss,
}

macro_rules! impl_option_enum {
    (
        $name:ident, $label:literal,
        { $($text:literal => $variant:ident),+ $(,)? }
        $(aliases { $($alias:literal => $alias_variant:ident),+ $(,)? })?
    ) => {
        impl FromStr for $name {
            type Err = EstimationError;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_lowercase().replace('-', "_").as_str() {
                    $($text => Ok($name::$variant),)+
                    $($($alias => Ok($name::$alias_variant),)+)?
                    other => Err(EstimationError::configuration(format!(
                        "Unknown {} '{}'. Expected one of: {}",
                        $label,
                        other,
                        [$($text),+].join(", ")
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let text = match self {
                    $($name::$variant => $text,)+
                };
                f.write_str(text)
            }
        }
    };
}

impl_option_enum!(LandType, "land type", {
    "all" => All,
    "forest" => Forest,
    "timber" => Timber,
});

impl_option_enum!(TreeType, "tree type", {
    "all" => All,
    "live" => Live,
    "dead" => Dead,
    "growing_stock" => GrowingStock,
    "gross_scale" => GrossScale,
} aliases {
    "gs" => GrowingStock,
});

impl_option_enum!(VolumeType, "volume type", {
    "net" => Net,
    "gross" => Gross,
    "sound" => Sound,
    "sawlog" => Sawlog,
    "board_foot" => BoardFoot,
});

impl_option_enum!(BiomassComponent, "biomass component", {
    "above_ground" => AboveGround,
    "below_ground" => BelowGround,
    "total" => Total,
} aliases {
    "ag" => AboveGround,
    "bg" => BelowGround,
});

impl_option_enum!(TreeCountMetric, "tree count metric", {
    "trees" => Trees,
    "basal_area" => BasalArea,
});

impl_option_enum!(GrmTreeClass, "tree class", {
    "all_live" => AllLive,
    "growing_stock" => GrowingStock,
} aliases {
    "al" => AllLive,
    "gs" => GrowingStock,
});

impl_option_enum!(GrmAttribute, "growth/mortality attribute", {
    "volume" => Volume,
    "biomass" => Biomass,
    "count" => Count,
});

impl_option_enum!(AreaChangeType, "area change type", {
    "net" => Net,
    "gross_gain" => GrossGain,
    "gross_loss" => GrossLoss,
});

/// Uniform configuration surface shared by all estimators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Land classification of the population
    pub land_type: LandType,

    /// Tree status family
    pub tree_type: TreeType,

    /// Free-form predicate over tree columns
    pub tree_domain: Option<String>,

    /// Free-form predicate over condition/plot columns
    pub area_domain: Option<String>,

    /// Output grouping columns
    pub grp_by: Vec<String>,

    /// Include population totals alongside per-unit estimates
    pub totals: bool,

    /// Emit VARIANCE columns instead of SE columns
    pub variance: bool,

    /// Evaluation ids to estimate over (empty = derive from the database)
    pub evalids: Vec<u32>,

    /// When deriving evaluations, keep only the most recent per state
    pub most_recent: bool,

    /// Apply the (1 - f_h) finite population correction
    pub finite_population_correction: bool,

    /// Worker threads for stratum-level variance
    pub workers: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            land_type: LandType::Forest,
            tree_type: TreeType::Live,
            tree_domain: None,
            area_domain: None,
            grp_by: Vec::new(),
            totals: false,
            variance: false,
            evalids: Vec::new(),
            most_recent: true,
            finite_population_correction: true,
            workers: num_cpus::get(),
        }
    }
}

impl EstimatorConfig {
    pub fn with_land_type(mut self, land_type: LandType) -> Self {
        self.land_type = land_type;
        self
    }

    pub fn with_tree_type(mut self, tree_type: TreeType) -> Self {
        self.tree_type = tree_type;
        self
    }

    pub fn with_tree_domain(mut self, expression: impl Into<String>) -> Self {
        self.tree_domain = Some(expression.into());
        self
    }

    pub fn with_area_domain(mut self, expression: impl Into<String>) -> Self {
        self.area_domain = Some(expression.into());
        self
    }

    /// Group output rows by the given columns
    pub fn with_grp_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grp_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_totals(mut self) -> Self {
        self.totals = true;
        self
    }

    pub fn with_variance(mut self) -> Self {
        self.variance = true;
        self
    }

    pub fn with_evalids(mut self, evalids: impl IntoIterator<Item = u32>) -> Self {
        self.evalids = evalids.into_iter().collect();
        self
    }

    pub fn without_finite_population_correction(mut self) -> Self {
        self.finite_population_correction = false;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Reject configurations no estimator can run
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(EstimationError::configuration(
                "workers must be at least 1",
            ));
        }

        let mut seen = HashSet::new();
        for column in &self.grp_by {
            if column.trim().is_empty() {
                return Err(EstimationError::configuration(
                    "grouping column names must not be empty",
                ));
            }
            if !seen.insert(column.as_str()) {
                return Err(EstimationError::configuration(format!(
                    "grouping column '{}' listed more than once",
                    column
                )));
            }
        }

        debug!(
            "Validated configuration: land={}, tree={}, groups={:?}, totals={}, variance={}",
            self.land_type, self.tree_type, self.grp_by, self.totals, self.variance
        );
        Ok(())
    }
}

//! Closed set of estimation measures.
//!
//! Each variant carries its own options and answers the questions the
//! generic pipeline asks: which grain it starts at, which columns it needs,
//! which evaluation types support it and how its outputs are named.

use crate::config::{
    AreaChangeType, BiomassComponent, GrmAttribute, GrmTreeClass, LandType, TreeCountMetric,
    VolumeType,
};
use crate::constants::{SUBPLOTS_PER_PLOT, columns};
use crate::evaluation::EvalType;
use std::fmt;

/// Grain at which per-record contributions are first computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grain {
    /// One record per condition (area)
    Condition,
    /// One record per tree (volume, biomass, tree counts)
    Tree,
    /// One record per tree-period with a GRM component
    TreePeriod,
    /// One record per subplot condition-change pair
    SubplotChange,
}

/// Which GRM components a tree-period measure keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrmKind {
    Growth,
    Mortality,
    Removals,
}

impl GrmKind {
    /// Per-tree expansion column family in `TREE_GRM_COMPONENT`
    pub fn tpa_family(&self) -> &'static str {
        match self {
            GrmKind::Growth => "TPAGROW_UNADJ",
            GrmKind::Mortality => "TPAMORT_UNADJ",
            GrmKind::Removals => "TPAREMV_UNADJ",
        }
    }
}

/// Column names for one GRM tree class and land basis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrmColumns {
    pub component: String,
    pub tpa: String,
    pub subplot_type: String,
}

impl GrmColumns {
    pub fn new(kind: GrmKind, tree_class: GrmTreeClass, land_type: LandType) -> Self {
        let basis = match land_type {
            LandType::Timber => "TIMBER",
            LandType::Forest | LandType::All => "FOREST",
        };
        let suffix = format!("{}_{}", tree_class.column_suffix(), basis);
        Self {
            component: format!("SUBP_COMPONENT_{}", suffix),
            tpa: format!("SUBP_{}_{}", kind.tpa_family(), suffix),
            subplot_type: format!("SUBP_SUBPTYP_GRM_{}", suffix),
        }
    }
}

/// An estimation measure with its options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Area,
    AreaChange {
        change: AreaChangeType,
        annualize: bool,
    },
    Volume {
        volume: VolumeType,
    },
    Biomass {
        component: BiomassComponent,
    },
    TreeCount {
        metric: TreeCountMetric,
    },
    Mortality {
        tree_class: GrmTreeClass,
        attribute: GrmAttribute,
        annualize: bool,
    },
    Removals {
        tree_class: GrmTreeClass,
        attribute: GrmAttribute,
        annualize: bool,
    },
    Growth {
        tree_class: GrmTreeClass,
        attribute: GrmAttribute,
    },
}

impl Measure {
    pub fn grain(&self) -> Grain {
        match self {
            Measure::Area => Grain::Condition,
            Measure::AreaChange { .. } => Grain::SubplotChange,
            Measure::Volume { .. } | Measure::Biomass { .. } | Measure::TreeCount { .. } => {
                Grain::Tree
            }
            Measure::Mortality { .. } | Measure::Removals { .. } | Measure::Growth { .. } => {
                Grain::TreePeriod
            }
        }
    }

    /// GRM role, attribute, class and annualization for tree-period measures
    pub fn grm(&self) -> Option<(GrmKind, GrmTreeClass, GrmAttribute, bool)> {
        match *self {
            Measure::Mortality {
                tree_class,
                attribute,
                annualize,
            } => Some((GrmKind::Mortality, tree_class, attribute, annualize)),
            Measure::Removals {
                tree_class,
                attribute,
                annualize,
            } => Some((GrmKind::Removals, tree_class, attribute, annualize)),
            Measure::Growth {
                tree_class,
                attribute,
            } => Some((GrmKind::Growth, tree_class, attribute, true)),
            _ => None,
        }
    }

    /// Evaluation types whose plot sample supports this measure
    pub fn accepted_eval_types(&self) -> &'static [EvalType] {
        match self.grain() {
            Grain::Condition => &[EvalType::Current, EvalType::Volume],
            Grain::Tree => &[EvalType::Volume],
            Grain::TreePeriod | Grain::SubplotChange => &[EvalType::Change],
        }
    }

    /// Tree attribute columns the value formula reads
    pub fn tree_attribute_columns(&self) -> Vec<&'static str> {
        match self {
            Measure::Volume { volume } => vec![volume_column(*volume)],
            Measure::Biomass { component } => match component {
                BiomassComponent::AboveGround => vec![columns::DRYBIO_AG],
                BiomassComponent::BelowGround => vec![columns::DRYBIO_BG],
                BiomassComponent::Total => vec![columns::DRYBIO_AG, columns::DRYBIO_BG],
            },
            Measure::TreeCount {
                metric: TreeCountMetric::BasalArea,
            } => vec![columns::DIA],
            Measure::Mortality { attribute, .. }
            | Measure::Removals { attribute, .. }
            | Measure::Growth { attribute, .. } => match attribute {
                GrmAttribute::Volume => vec![columns::VOLCFNET],
                GrmAttribute::Biomass => vec![columns::DRYBIO_AG],
                GrmAttribute::Count => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Stem of the output column names
    pub fn base_name(&self) -> &'static str {
        match self {
            Measure::Area => "AREA",
            Measure::AreaChange { .. } => "AREA_CHNG",
            Measure::Volume { volume } => volume_column(*volume),
            Measure::Biomass { component } => match component {
                BiomassComponent::AboveGround => "BIO_AG",
                BiomassComponent::BelowGround => "BIO_BG",
                BiomassComponent::Total => "BIO",
            },
            Measure::TreeCount { metric } => match metric {
                TreeCountMetric::Trees => "TPA",
                TreeCountMetric::BasalArea => "BAA",
            },
            Measure::Mortality { .. } => "MORT",
            Measure::Removals { .. } => "REMV",
            Measure::Growth { .. } => "GROWTH",
        }
    }

    /// Estimate reported as a percentage of land-type area
    pub fn is_percentage(&self) -> bool {
        matches!(self, Measure::Area | Measure::AreaChange { .. })
    }

    /// Denominator is the ungrouped land-type area rather than the domain area
    pub fn uses_land_denominator(&self) -> bool {
        self.is_percentage()
    }

    pub fn estimate_column(&self) -> String {
        if self.is_percentage() {
            format!("{}_PERC", self.base_name())
        } else {
            format!("{}_ACRE", self.base_name())
        }
    }

    pub fn total_column(&self) -> String {
        format!("{}_TOTAL", self.base_name())
    }

    /// Divisor applied when condition sums collapse to the plot
    pub fn plot_divisor(&self) -> f64 {
        match self {
            Measure::AreaChange { .. } => SUBPLOTS_PER_PLOT,
            _ => 1.0,
        }
    }
}

fn volume_column(volume: VolumeType) -> &'static str {
    match volume {
        VolumeType::Net => columns::VOLCFNET,
        VolumeType::Gross => columns::VOLCFGRS,
        VolumeType::Sound => columns::VOLCFSND,
        VolumeType::Sawlog => columns::VOLCSNET,
        VolumeType::BoardFoot => columns::VOLBFNET,
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Area => write!(f, "area"),
            Measure::AreaChange { change, .. } => write!(f, "area change ({})", change),
            Measure::Volume { volume } => write!(f, "volume ({})", volume),
            Measure::Biomass { component } => write!(f, "biomass ({})", component),
            Measure::TreeCount { metric } => write!(f, "tree count ({})", metric),
            Measure::Mortality {
                tree_class,
                attribute,
                ..
            } => write!(f, "mortality ({}, {})", tree_class, attribute),
            Measure::Removals {
                tree_class,
                attribute,
                ..
            } => write!(f, "removals ({}, {})", tree_class, attribute),
            Measure::Growth {
                tree_class,
                attribute,
            } => write!(f, "growth ({}, {})", tree_class, attribute),
        }
    }
}

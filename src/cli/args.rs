//! Command-line argument definitions for `fia-estimate`
//!
//! Each subcommand is one estimator. The options every estimator shares live
//! in [`EstimateArgs`] and are flattened into the subcommands; measure
//! options sit next to them.

use crate::config::{
    AreaChangeType, BiomassComponent, EstimatorConfig, GrmAttribute, GrmTreeClass, LandType,
    TreeCountMetric, TreeType, VolumeType,
};
use crate::error::{EstimationError, Result};
use crate::estimation::Measure;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the FIA population estimator
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fia-estimate",
    version,
    about = "Design-based estimates of forest area, volume, biomass and change from FIA tables",
    long_about = "Computes post-stratified ratio-of-means estimates with Bechtold & Patterson \
                  stratified variance from FIA database tables stored as Parquet or CSV files. \
                  Results are per-acre estimates with standard errors, optionally with \
                  population totals, one row per output group."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// One subcommand per estimator
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Land area as a percentage of the land type
    Area(EstimateArgs),
    /// Gain, loss or net change of land-type area between measurements
    AreaChange(AreaChangeArgs),
    /// Tree volume per acre
    Volume(VolumeArgs),
    /// Dry biomass (tons) per acre
    Biomass(BiomassArgs),
    /// Trees or basal area per acre
    Tpa(TpaArgs),
    /// Annual mortality per acre
    Mortality(GrmArgs),
    /// Annual removals per acre
    Removals(GrmArgs),
    /// Net annual growth per acre
    Growth(GrowthArgs),
}

/// Options shared by every estimator
#[derive(Debug, Clone, clap::Args)]
pub struct EstimateArgs {
    /// Directory holding FIADB tables as `<TABLE>.parquet` or `<TABLE>.csv`
    #[arg(
        short = 'd',
        long = "data",
        value_name = "DIR",
        help = "Directory of FIADB tables (Parquet or CSV)"
    )]
    pub data: PathBuf,

    /// Evaluation ids to estimate over
    ///
    /// When omitted, the most recent evaluation of a suitable type is used
    /// for every state present in POP_PLOT_STRATUM_ASSGN.
    #[arg(
        short = 'e',
        long = "evalid",
        value_name = "EVALID",
        value_delimiter = ',',
        help = "Evaluation ids (comma-separated or repeated)"
    )]
    pub evalid: Vec<u32>,

    /// Use every evaluation of a suitable type instead of the most recent
    #[arg(long = "all-evaluations", conflicts_with = "evalid")]
    pub all_evaluations: bool,

    #[arg(long = "land-type", value_name = "TYPE", help = "all, forest or timber")]
    pub land_type: Option<LandType>,

    #[arg(
        long = "tree-type",
        value_name = "TYPE",
        help = "all, live, dead, growing_stock or gross_scale"
    )]
    pub tree_type: Option<TreeType>,

    /// Predicate over tree columns, e.g. "DIA >= 10 AND SPCD IN (131, 110)"
    #[arg(long = "tree-domain", value_name = "EXPR")]
    pub tree_domain: Option<String>,

    /// Predicate over condition and plot columns, e.g. "OWNGRPCD == 40"
    #[arg(long = "area-domain", value_name = "EXPR")]
    pub area_domain: Option<String>,

    #[arg(
        short = 'g',
        long = "grp-by",
        value_name = "COLUMN",
        value_delimiter = ',',
        help = "Grouping columns (comma-separated or repeated)"
    )]
    pub grp_by: Vec<String>,

    #[arg(long = "totals", help = "Include population totals")]
    pub totals: bool,

    #[arg(long = "variance", help = "Report variances instead of standard errors")]
    pub variance: bool,

    #[arg(long = "no-fpc", help = "Disable the finite population correction")]
    pub no_fpc: bool,

    #[arg(
        short = 'j',
        long = "workers",
        value_name = "COUNT",
        help = "Worker threads for stratum variance"
    )]
    pub workers: Option<usize>,

    /// JSON file with an `EstimatorConfig`; command-line flags override it
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    #[arg(
        long = "format",
        value_enum,
        default_value = "table",
        help = "Output format for the result table"
    )]
    pub format: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct AreaChangeArgs {
    #[command(flatten)]
    pub common: EstimateArgs,

    #[arg(long = "change", default_value = "net", help = "net, gross_gain or gross_loss")]
    pub change: AreaChangeType,

    #[arg(long = "annualize", help = "Divide change by the remeasurement period")]
    pub annualize: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct VolumeArgs {
    #[command(flatten)]
    pub common: EstimateArgs,

    #[arg(
        long = "vol-type",
        default_value = "net",
        help = "net, gross, sound, sawlog or board_foot"
    )]
    pub volume_type: VolumeType,
}

#[derive(Debug, Clone, clap::Args)]
pub struct BiomassArgs {
    #[command(flatten)]
    pub common: EstimateArgs,

    #[arg(
        long = "component",
        default_value = "above_ground",
        help = "above_ground, below_ground or total"
    )]
    pub component: BiomassComponent,
}

#[derive(Debug, Clone, clap::Args)]
pub struct TpaArgs {
    #[command(flatten)]
    pub common: EstimateArgs,

    #[arg(long = "metric", default_value = "trees", help = "trees or basal_area")]
    pub metric: TreeCountMetric,
}

/// Mortality and removals options
#[derive(Debug, Clone, clap::Args)]
pub struct GrmArgs {
    #[command(flatten)]
    pub common: EstimateArgs,

    #[arg(
        long = "tree-class",
        default_value = "growing_stock",
        help = "all_live or growing_stock"
    )]
    pub tree_class: GrmTreeClass,

    #[arg(long = "attribute", default_value = "volume", help = "volume, biomass or count")]
    pub attribute: GrmAttribute,

    /// Report the whole remeasurement period instead of an annual rate
    #[arg(long = "periodic")]
    pub periodic: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct GrowthArgs {
    #[command(flatten)]
    pub common: EstimateArgs,

    #[arg(
        long = "tree-class",
        default_value = "growing_stock",
        help = "all_live or growing_stock"
    )]
    pub tree_class: GrmTreeClass,

    #[arg(long = "attribute", default_value = "volume", help = "volume, biomass or count")]
    pub attribute: GrmAttribute,
}

/// Output format options for the result table
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// CSV for data analysis
    Csv,
    /// JSON records for scripting
    Json,
}

impl Commands {
    pub fn common(&self) -> &EstimateArgs {
        match self {
            Commands::Area(common) => common,
            Commands::AreaChange(args) => &args.common,
            Commands::Volume(args) => &args.common,
            Commands::Biomass(args) => &args.common,
            Commands::Tpa(args) => &args.common,
            Commands::Mortality(args) | Commands::Removals(args) => &args.common,
            Commands::Growth(args) => &args.common,
        }
    }

    /// Measure this subcommand estimates
    pub fn measure(&self) -> Measure {
        match self {
            Commands::Area(_) => Measure::Area,
            Commands::AreaChange(args) => Measure::AreaChange {
                change: args.change,
                annualize: args.annualize,
            },
            Commands::Volume(args) => Measure::Volume {
                volume: args.volume_type,
            },
            Commands::Biomass(args) => Measure::Biomass {
                component: args.component,
            },
            Commands::Tpa(args) => Measure::TreeCount {
                metric: args.metric,
            },
            Commands::Mortality(args) => Measure::Mortality {
                tree_class: args.tree_class,
                attribute: args.attribute,
                annualize: !args.periodic,
            },
            Commands::Removals(args) => Measure::Removals {
                tree_class: args.tree_class,
                attribute: args.attribute,
                annualize: !args.periodic,
            },
            Commands::Growth(args) => Measure::Growth {
                tree_class: args.tree_class,
                attribute: args.attribute,
            },
        }
    }
}

impl EstimateArgs {
    /// Validate argument combinations clap cannot express
    pub fn validate(&self) -> Result<()> {
        if !self.data.is_dir() {
            return Err(EstimationError::configuration(format!(
                "Data directory does not exist: {}",
                self.data.display()
            )));
        }

        if let Some(config_file) = &self.config_file {
            if !config_file.exists() {
                return Err(EstimationError::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }

        if self.workers == Some(0) {
            return Err(EstimationError::configuration(
                "Number of workers must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Overlay the command-line options on a base configuration
    pub fn apply_to(&self, base: EstimatorConfig) -> EstimatorConfig {
        let mut config = base;
        if let Some(land_type) = self.land_type {
            config = config.with_land_type(land_type);
        }
        if let Some(tree_type) = self.tree_type {
            config = config.with_tree_type(tree_type);
        }
        if let Some(expression) = &self.tree_domain {
            config = config.with_tree_domain(expression.clone());
        }
        if let Some(expression) = &self.area_domain {
            config = config.with_area_domain(expression.clone());
        }
        if !self.grp_by.is_empty() {
            config = config.with_grp_by(self.grp_by.iter().cloned());
        }
        if self.totals {
            config = config.with_totals();
        }
        if self.variance {
            config = config.with_variance();
        }
        if !self.evalid.is_empty() {
            config = config.with_evalids(self.evalid.iter().copied());
        }
        if self.all_evaluations {
            config.most_recent = false;
        }
        if self.no_fpc {
            config = config.without_finite_population_correction();
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        config
    }

    /// Log level from verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

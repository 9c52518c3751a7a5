//! Table names, column names and unit constants for FIA estimation
//!
//! Column names follow the FIA database (FIADB) conventions so that
//! tables exported from the national database can be consumed as-is.

// =============================================================================
// Table Names
// =============================================================================

pub mod tables {
    pub const PLOT: &str = "PLOT";
    pub const COND: &str = "COND";
    pub const TREE: &str = "TREE";
    pub const POP_STRATUM: &str = "POP_STRATUM";
    pub const POP_PLOT_STRATUM_ASSGN: &str = "POP_PLOT_STRATUM_ASSGN";
    pub const POP_ESTN_UNIT: &str = "POP_ESTN_UNIT";
    pub const POP_EVAL: &str = "POP_EVAL";
    pub const TREE_GRM_COMPONENT: &str = "TREE_GRM_COMPONENT";
    pub const TREE_GRM_BEGIN: &str = "TREE_GRM_BEGIN";
    pub const TREE_GRM_MIDPT: &str = "TREE_GRM_MIDPT";
    pub const SUBP_COND_CHNG_MTRX: &str = "SUBP_COND_CHNG_MTRX";

    /// All tables the loader recognises when scanning a directory
    pub const KNOWN_TABLES: &[&str] = &[
        PLOT,
        COND,
        TREE,
        POP_STRATUM,
        POP_PLOT_STRATUM_ASSGN,
        POP_ESTN_UNIT,
        POP_EVAL,
        TREE_GRM_COMPONENT,
        TREE_GRM_BEGIN,
        TREE_GRM_MIDPT,
        SUBP_COND_CHNG_MTRX,
    ];
}

// =============================================================================
// Source Columns
// =============================================================================

pub mod columns {
    // Identifiers
    pub const CN: &str = "CN";
    pub const PLT_CN: &str = "PLT_CN";
    pub const PREV_PLT_CN: &str = "PREV_PLT_CN";
    pub const TRE_CN: &str = "TRE_CN";
    pub const STRATUM_CN: &str = "STRATUM_CN";
    pub const ESTN_UNIT_CN: &str = "ESTN_UNIT_CN";
    pub const EVALID: &str = "EVALID";
    pub const STATECD: &str = "STATECD";
    pub const CONDID: &str = "CONDID";
    pub const PREVCOND: &str = "PREVCOND";

    /// Key columns normalised to strings when tables are registered
    pub const KEY_COLUMNS: &[&str] = &[CN, PLT_CN, PREV_PLT_CN, TRE_CN, STRATUM_CN, ESTN_UNIT_CN];

    /// Condition identifiers joined across tables, normalised to Int64
    pub const CONDITION_KEY_COLUMNS: &[&str] = &[CONDID, PREVCOND];

    // POP_STRATUM
    pub const EXPNS: &str = "EXPNS";
    pub const ADJ_FACTOR_SUBP: &str = "ADJ_FACTOR_SUBP";
    pub const ADJ_FACTOR_MICR: &str = "ADJ_FACTOR_MICR";
    pub const ADJ_FACTOR_MACR: &str = "ADJ_FACTOR_MACR";
    pub const P1POINTCNT: &str = "P1POINTCNT";
    pub const P2POINTCNT: &str = "P2POINTCNT";

    // PLOT
    pub const INVYR: &str = "INVYR";
    pub const REMPER: &str = "REMPER";
    pub const MACRO_BREAKPOINT_DIA: &str = "MACRO_BREAKPOINT_DIA";

    // COND
    pub const COND_STATUS_CD: &str = "COND_STATUS_CD";
    pub const CONDPROP_UNADJ: &str = "CONDPROP_UNADJ";
    pub const PROP_BASIS: &str = "PROP_BASIS";
    pub const SITECLCD: &str = "SITECLCD";
    pub const RESERVCD: &str = "RESERVCD";

    // TREE
    pub const STATUSCD: &str = "STATUSCD";
    pub const TREECLCD: &str = "TREECLCD";
    pub const DIA: &str = "DIA";
    pub const TPA_UNADJ: &str = "TPA_UNADJ";
    pub const VOLCFNET: &str = "VOLCFNET";
    pub const VOLCFGRS: &str = "VOLCFGRS";
    pub const VOLCFSND: &str = "VOLCFSND";
    pub const VOLCSNET: &str = "VOLCSNET";
    pub const VOLBFNET: &str = "VOLBFNET";
    pub const VOLBFGRS: &str = "VOLBFGRS";
    pub const DRYBIO_AG: &str = "DRYBIO_AG";
    pub const DRYBIO_BG: &str = "DRYBIO_BG";

    // SUBP_COND_CHNG_MTRX
    pub const SUBPTYP: &str = "SUBPTYP";
    pub const SUBPTYP_PROP_CHNG: &str = "SUBPTYP_PROP_CHNG";
}

// =============================================================================
// Pipeline Columns
// =============================================================================

/// Columns created inside a single estimation call
pub mod derived {
    pub const VALUE: &str = "ESTN_VALUE";
    pub const COND_AREA: &str = "ESTN_COND_AREA";
    pub const PLOT_Y: &str = "PLOT_Y";
    pub const PLOT_X: &str = "PLOT_X";
    pub const ADJ: &str = "ESTN_ADJ";
    pub const BEGIN_VALUE: &str = "ESTN_BEGIN_VALUE";
    pub const END_VALUE: &str = "ESTN_END_VALUE";
    pub const MIDPT_VALUE: &str = "ESTN_MIDPT_VALUE";
    pub const COMPONENT: &str = "ESTN_COMPONENT";
    pub const GRM_TPA: &str = "ESTN_GRM_TPA";
    pub const GRM_SUBPTYP: &str = "ESTN_GRM_SUBPTYP";
    pub const PREV_STATUS: &str = "ESTN_PREV_STATUS";
    pub const CURR_STATUS: &str = "ESTN_CURR_STATUS";
    pub const N_PLOTS: &str = "N_PLOTS";
}

// =============================================================================
// Design and Unit Constants
// =============================================================================

/// Number of subplots on a standard FIA plot
pub const SUBPLOTS_PER_PLOT: f64 = 4.0;

/// Diameter (inches) below which trees are tallied on the microplot
pub const MICROPLOT_BREAKPOINT_DIA: f64 = 5.0;

/// Pounds per short ton, used to report biomass in tons
pub const POUNDS_PER_TON: f64 = 2000.0;

/// Basal area factor: square feet per square inch of diameter
pub const BASAL_AREA_FACTOR: f64 = 0.005_454_154;

/// Percent scaling for `_PERC` estimates and coefficient of variation
pub const PERCENT: f64 = 100.0;

/// Condition status code for accessible forest land
pub const FOREST_STATUS_CD: i64 = 1;

/// Growing-stock tree class code
pub const GROWING_STOCK_TREECLCD: i64 = 2;

/// Evaluation-year window: two-digit years up to this value are 20xx
pub const EVALID_YEAR_PIVOT: u32 = 30;

//! Unit tests for the estimation pipeline
//!
//! Shared fixtures build a two-plot database with one stratum so that
//! expected totals, ratios and variances can be worked out by hand.

pub mod aggregation_tests;
pub mod components_tests;
pub mod output_tests;
pub mod stratification_tests;

use crate::config::EstimatorConfig;
use crate::database::FiaDatabase;
use crate::models::{AdjustmentFactors, Stratum};
use polars::prelude::*;

pub const VOLUME_EVALID: u32 = 132301;
pub const CHANGE_EVALID: u32 = 132303;

/// Plots A and B, both remeasured over 5 years
pub fn plot_table() -> DataFrame {
    df!(
        "CN" => ["A", "B"],
        "STATECD" => [13i64, 13],
        "INVYR" => [2022i64, 2022],
        "REMPER" => [5.0, 5.0],
        "PREV_PLT_CN" => ["PA", "PB"],
    )
    .unwrap()
}

/// A: 0.6 forest + 0.4 nonforest; B: 1.0 forest.
/// PA and PB are the previous measurements of A and B (forest, nonforest).
pub fn cond_table() -> DataFrame {
    df!(
        "PLT_CN" => ["A", "A", "B", "PA", "PB"],
        "CONDID" => [1i64, 2, 1, 1, 1],
        "COND_STATUS_CD" => [1i64, 2, 1, 1, 2],
        "CONDPROP_UNADJ" => [0.6, 0.4, 1.0, 1.0, 1.0],
        "SITECLCD" => [3i64, 7, 5, 3, 7],
        "RESERVCD" => [0i64, 0, 0, 0, 0],
        "OWNGRPCD" => [40i64, 40, 10, 40, 10],
    )
    .unwrap()
}

/// One live growing-stock tree on each forest condition
pub fn tree_table() -> DataFrame {
    tree_table_with_tpa(10.0, 20.0)
}

pub fn tree_table_with_tpa(tpa_a: f64, tpa_b: f64) -> DataFrame {
    df!(
        "CN" => ["T1", "T2"],
        "PLT_CN" => ["A", "B"],
        "CONDID" => [1i64, 1],
        "STATUSCD" => [1i64, 1],
        "TREECLCD" => [2i64, 2],
        "SPCD" => [131i64, 110],
        "DIA" => [10.0, 12.0],
        "TPA_UNADJ" => [tpa_a, tpa_b],
        "VOLCFNET" => [20.0, 30.0],
        "DRYBIO_AG" => [400.0, 600.0],
        "DRYBIO_BG" => [100.0, 200.0],
    )
    .unwrap()
}

/// Stratum S1 serves the volume evaluation, S3 the change evaluation
pub fn stratum_table() -> DataFrame {
    df!(
        "CN" => ["S1", "S3"],
        "ESTN_UNIT_CN" => ["U1", "U3"],
        "EVALID" => [VOLUME_EVALID as i64, CHANGE_EVALID as i64],
        "EXPNS" => [1000.0, 1000.0],
        "ADJ_FACTOR_SUBP" => [1.0, 1.0],
        "ADJ_FACTOR_MICR" => [1.0, 1.0],
        "ADJ_FACTOR_MACR" => [1.0, 1.0],
    )
    .unwrap()
}

pub fn assignment_table() -> DataFrame {
    df!(
        "PLT_CN" => ["A", "B", "A", "B"],
        "STRATUM_CN" => ["S1", "S1", "S3", "S3"],
        "EVALID" => [
            VOLUME_EVALID as i64,
            VOLUME_EVALID as i64,
            CHANGE_EVALID as i64,
            CHANGE_EVALID as i64
        ],
    )
    .unwrap()
}

/// T1 died during the period; T2 survived
pub fn grm_component_table() -> DataFrame {
    df!(
        "TRE_CN" => ["T1", "T2"],
        "PLT_CN" => ["A", "B"],
        "SUBP_COMPONENT_AL_FOREST" => ["MORTALITY1", "SURVIVOR"],
        "SUBP_TPAMORT_UNADJ_AL_FOREST" => [6.0, 0.0],
        "SUBP_TPAGROW_UNADJ_AL_FOREST" => [0.0, 6.0],
        "SUBP_TPAREMV_UNADJ_AL_FOREST" => [0.0, 0.0],
        "SUBP_SUBPTYP_GRM_AL_FOREST" => [1i64, 1],
    )
    .unwrap()
}

/// T1 was cut and T2 diverted to nonforest during the period
pub fn grm_removal_table() -> DataFrame {
    df!(
        "TRE_CN" => ["T1", "T2"],
        "PLT_CN" => ["A", "B"],
        "SUBP_COMPONENT_AL_FOREST" => ["CUT1", "DIVERSION2"],
        "SUBP_TPAMORT_UNADJ_AL_FOREST" => [0.0, 0.0],
        "SUBP_TPAGROW_UNADJ_AL_FOREST" => [0.0, 0.0],
        "SUBP_TPAREMV_UNADJ_AL_FOREST" => [6.0, 2.0],
        "SUBP_SUBPTYP_GRM_AL_FOREST" => [1i64, 1],
    )
    .unwrap()
}

pub fn grm_midpoint_table() -> DataFrame {
    df!(
        "TRE_CN" => ["T1", "T2"],
        "VOLCFNET" => [10.0, 25.0],
        "DRYBIO_AG" => [300.0, 500.0],
    )
    .unwrap()
}

pub fn grm_begin_table() -> DataFrame {
    df!(
        "TRE_CN" => ["T1", "T2"],
        "VOLCFNET" => [8.0, 20.0],
        "DRYBIO_AG" => [250.0, 450.0],
    )
    .unwrap()
}

/// Subplot condition-change matrix: A lost 1.6 subplots of forest, B gained 4
pub fn change_matrix_table() -> DataFrame {
    df!(
        "PLT_CN" => ["A", "A", "B"],
        "PREV_PLT_CN" => ["PA", "PA", "PB"],
        "CONDID" => [1i64, 2, 1],
        "PREVCOND" => [1i64, 1, 1],
        "SUBPTYP" => [1i64, 1, 1],
        "SUBPTYP_PROP_CHNG" => [2.4, 1.6, 4.0],
    )
    .unwrap()
}

pub fn database_with(cond: DataFrame, tree: DataFrame) -> FiaDatabase {
    database_with_components(cond, tree, grm_component_table())
}

pub fn database_with_components(
    cond: DataFrame,
    tree: DataFrame,
    components: DataFrame,
) -> FiaDatabase {
    FiaDatabase::new()
        .with_table("PLOT", plot_table())
        .and_then(|db| db.with_table("COND", cond))
        .and_then(|db| db.with_table("TREE", tree))
        .and_then(|db| db.with_table("POP_STRATUM", stratum_table()))
        .and_then(|db| db.with_table("POP_PLOT_STRATUM_ASSGN", assignment_table()))
        .and_then(|db| db.with_table("TREE_GRM_COMPONENT", components))
        .and_then(|db| db.with_table("TREE_GRM_MIDPT", grm_midpoint_table()))
        .and_then(|db| db.with_table("TREE_GRM_BEGIN", grm_begin_table()))
        .and_then(|db| db.with_table("SUBP_COND_CHNG_MTRX", change_matrix_table()))
        .unwrap()
}

pub fn test_database() -> FiaDatabase {
    database_with(cond_table(), tree_table())
}

/// Default configuration on one worker; fixture strata carry no P1 counts
pub fn test_config() -> EstimatorConfig {
    EstimatorConfig::default().with_workers(1)
}

pub fn test_stratum(cn: &str, unit: &str, expns: f64) -> Stratum {
    Stratum {
        cn: cn.to_string(),
        estn_unit_cn: unit.to_string(),
        evalid: VOLUME_EVALID,
        expansion_factor: expns,
        adjustment: AdjustmentFactors::default(),
        p1_points: None,
        p2_points: None,
    }
}

/// Single f64 cell of a result frame
pub fn cell(frame: &DataFrame, column: &str, row: usize) -> Option<f64> {
    frame
        .column(column)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .get(row)
}

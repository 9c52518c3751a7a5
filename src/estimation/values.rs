//! Per-record contribution formulas.
//!
//! Each formula is a polars expression evaluated by the lazy pipeline.
//! Null inputs give null contributions.

use super::measure::Measure;
use crate::config::{BiomassComponent, GrmAttribute, TreeCountMetric};
use crate::constants::{
    BASAL_AREA_FACTOR, MICROPLOT_BREAKPOINT_DIA, POUNDS_PER_TON, columns, derived,
};
use crate::error::{EstimationError, Result};
use polars::prelude::*;

/// Adjustment factor for a condition, chosen by the basis its proportion was measured on
pub fn condition_adjustment_expr(has_prop_basis: bool) -> Expr {
    if has_prop_basis {
        when(col(columns::PROP_BASIS).eq(lit("MACR")))
            .then(col(columns::ADJ_FACTOR_MACR))
            .otherwise(col(columns::ADJ_FACTOR_SUBP))
    } else {
        col(columns::ADJ_FACTOR_SUBP)
    }
}

/// Adjustment factor for a tree, chosen by the plot size its diameter implies
pub fn tree_adjustment_expr(has_macro_breakpoint: bool) -> Expr {
    let dia = col(columns::DIA);
    let micro = when(dia.clone().is_null())
        .then(col(columns::ADJ_FACTOR_SUBP))
        .when(dia.clone().lt(lit(MICROPLOT_BREAKPOINT_DIA)))
        .then(col(columns::ADJ_FACTOR_MICR));

    if has_macro_breakpoint {
        let breakpoint = col(columns::MACRO_BREAKPOINT_DIA);
        micro
            .when(
                breakpoint
                    .clone()
                    .is_not_null()
                    .and(breakpoint.clone().gt(lit(0.0)))
                    .and(dia.gt_eq(breakpoint)),
            )
            .then(col(columns::ADJ_FACTOR_MACR))
            .otherwise(col(columns::ADJ_FACTOR_SUBP))
    } else {
        micro.otherwise(col(columns::ADJ_FACTOR_SUBP))
    }
}

/// Condition area contribution: proportion times its adjustment factor
pub fn condition_area_expr() -> Expr {
    col(columns::CONDPROP_UNADJ).cast(DataType::Float64) * col(derived::ADJ)
}

/// Per-tree attribute for a tree-grain measure (1 for counts)
pub fn tree_attribute_expr(measure: &Measure) -> Result<Expr> {
    let expr = match measure {
        Measure::Volume { .. } => {
            let column = measure.tree_attribute_columns()[0];
            col(column).cast(DataType::Float64)
        }
        Measure::Biomass { component } => match component {
            BiomassComponent::AboveGround => {
                col(columns::DRYBIO_AG).cast(DataType::Float64) / lit(POUNDS_PER_TON)
            }
            BiomassComponent::BelowGround => {
                col(columns::DRYBIO_BG).cast(DataType::Float64) / lit(POUNDS_PER_TON)
            }
            BiomassComponent::Total => {
                (col(columns::DRYBIO_AG).cast(DataType::Float64)
                    + col(columns::DRYBIO_BG).cast(DataType::Float64))
                    / lit(POUNDS_PER_TON)
            }
        },
        Measure::TreeCount { metric } => match metric {
            TreeCountMetric::Trees => lit(1.0),
            TreeCountMetric::BasalArea => {
                let dia = col(columns::DIA).cast(DataType::Float64);
                dia.clone() * dia * lit(BASAL_AREA_FACTOR)
            }
        },
        other => {
            return Err(EstimationError::configuration(format!(
                "{} is not a tree-grain measure",
                other
            )));
        }
    };
    Ok(expr)
}

/// Per-tree-period attribute read from a GRM snapshot table
pub fn grm_attribute_expr(attribute: GrmAttribute) -> Expr {
    match attribute {
        GrmAttribute::Volume => col(columns::VOLCFNET).cast(DataType::Float64),
        GrmAttribute::Biomass => {
            col(columns::DRYBIO_AG).cast(DataType::Float64) / lit(POUNDS_PER_TON)
        }
        GrmAttribute::Count => lit(1.0),
    }
}

/// Tree contribution: expansion factor times attribute times adjustment
pub fn tree_value_expr(measure: &Measure) -> Result<Expr> {
    Ok(col(columns::TPA_UNADJ).cast(DataType::Float64)
        * tree_attribute_expr(measure)?
        * col(derived::ADJ))
}

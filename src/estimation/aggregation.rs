//! Two-stage aggregation of per-record contributions.
//!
//! Stage 1 collapses records to (plot, stratum, condition, groups); stage 2
//! collapses conditions to (plot, stratum, groups). Both stages are plain
//! sums, so the grand total is preserved however records are partitioned.

use crate::constants::{columns, derived};
use crate::error::Result;
use polars::prelude::*;
use tracing::debug;

/// Key columns followed by the grouping columns not already among them
pub fn key_exprs(keys: &[&str], grp_by: &[String]) -> Vec<Expr> {
    keys.iter()
        .map(|k| col(*k))
        .chain(
            grp_by
                .iter()
                .filter(|g| !keys.contains(&g.as_str()))
                .map(|g| col(g.as_str())),
        )
        .collect()
}

/// Drop records whose contribution is null, logging how many were removed
pub fn drop_null_contributions(frame: DataFrame, stage: &str) -> Result<DataFrame> {
    let nulls = frame.column(derived::VALUE)?.null_count();
    if nulls == 0 {
        return Ok(frame);
    }
    debug!("{}: dropping {} records with null contribution", stage, nulls);
    Ok(frame
        .lazy()
        .filter(col(derived::VALUE).is_not_null())
        .collect()?)
}

/// Stage 1: sum record contributions within each condition
pub fn aggregate_to_conditions(records: LazyFrame, grp_by: &[String]) -> LazyFrame {
    records
        .group_by(key_exprs(
            &[columns::PLT_CN, columns::STRATUM_CN, columns::CONDID],
            grp_by,
        ))
        .agg([col(derived::VALUE).sum().alias(derived::VALUE)])
}

/// Stage 2: sum condition contributions within each plot.
///
/// `divisor` normalises per-subplot indicators to a plot proportion.
pub fn aggregate_to_plots(
    conditions: LazyFrame,
    grp_by: &[String],
    divisor: f64,
    output: &str,
) -> LazyFrame {
    let summed = col(derived::VALUE).sum();
    let value = if divisor == 1.0 {
        summed
    } else {
        summed / lit(divisor)
    };
    conditions
        .group_by(key_exprs(&[columns::PLT_CN, columns::STRATUM_CN], grp_by))
        .agg([value.alias(output)])
}

/// Run both stages, collecting after each
pub fn aggregate_two_stage(
    records: DataFrame,
    grp_by: &[String],
    divisor: f64,
    output: &str,
) -> Result<DataFrame> {
    let conditions = aggregate_to_conditions(records.lazy(), grp_by).collect()?;
    debug!("Stage 1 produced {} condition rows", conditions.height());

    let plots = aggregate_to_plots(conditions.lazy(), grp_by, divisor, output).collect()?;
    debug!("Stage 2 produced {} plot rows", plots.height());
    Ok(plots)
}

/// Sum of a float column, treating an empty frame as zero
pub fn column_total(frame: &DataFrame, name: &str) -> Result<f64> {
    let column = frame.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().flatten().sum())
}

//! Result table assembly.
//!
//! Rows arrive keyed in a `BTreeMap`, so each grouping key appears exactly
//! once and rows come out in key order.

use super::variance::{coefficient_of_variation, standard_error};
use crate::constants::derived;
use crate::error::Result;
use crate::models::{GroupKey, GroupValue};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Point estimate, total and variances for one output group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEstimate {
    /// `None` when the group failed with insufficient data
    pub estimate: Option<f64>,
    pub estimate_variance: Option<f64>,
    pub total: f64,
    pub total_variance: f64,
    pub n_plots: usize,
}

/// A group whose estimate could not be computed
#[derive(Debug, Clone, PartialEq)]
pub struct GroupFailure {
    pub key: GroupKey,
    pub group: String,
    pub message: String,
}

/// Result of one estimation call
#[derive(Debug, Clone)]
pub struct EstimationOutput {
    pub frame: DataFrame,
    pub group_failures: Vec<GroupFailure>,
    /// Sampling units in the active evaluations
    pub n_plots_total: usize,
}

/// Column naming and optional columns of a result table
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    pub grp_by: Vec<String>,
    pub estimate_column: String,
    pub total_column: String,
    pub totals: bool,
    pub variance: bool,
}

impl OutputLayout {
    fn uncertainty_suffix(&self) -> &'static str {
        if self.variance { "VARIANCE" } else { "SE" }
    }

    pub fn estimate_uncertainty_column(&self) -> String {
        format!("{}_{}", self.estimate_column, self.uncertainty_suffix())
    }

    pub fn estimate_cv_column(&self) -> String {
        format!("{}_SE_PERCENT", self.estimate_column)
    }

    pub fn total_uncertainty_column(&self) -> String {
        format!("{}_{}", self.total_column, self.uncertainty_suffix())
    }

    /// Names of all columns in output order
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.grp_by.clone();
        names.push(self.estimate_column.clone());
        names.push(self.estimate_uncertainty_column());
        names.push(self.estimate_cv_column());
        if self.totals {
            names.push(self.total_column.clone());
            names.push(self.total_uncertainty_column());
        }
        names.push(derived::N_PLOTS.to_string());
        names
    }
}

/// Build the result frame, one row per group
pub fn format_output(
    layout: &OutputLayout,
    rows: &BTreeMap<GroupKey, GroupEstimate>,
) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::new();

    for (index, name) in layout.grp_by.iter().enumerate() {
        let values: Vec<&GroupValue> = rows.keys().map(|key| &key[index]).collect();
        columns.push(group_column(name, &values));
    }

    let mut estimates = Vec::with_capacity(rows.len());
    let mut uncertainty = Vec::with_capacity(rows.len());
    let mut cvs = Vec::with_capacity(rows.len());
    let mut totals = Vec::with_capacity(rows.len());
    let mut total_uncertainty = Vec::with_capacity(rows.len());
    let mut n_plots = Vec::with_capacity(rows.len());

    for row in rows.values() {
        estimates.push(row.estimate);
        uncertainty.push(
            row.estimate_variance
                .map(|v| render_uncertainty(v, layout.variance)),
        );
        cvs.push(match (row.estimate, row.estimate_variance) {
            (Some(estimate), Some(variance)) => {
                coefficient_of_variation(standard_error(variance), estimate).ok()
            }
            _ => None,
        });
        totals.push(row.total);
        total_uncertainty.push(render_uncertainty(row.total_variance, layout.variance));
        n_plots.push(row.n_plots as u32);
    }

    columns.push(Column::new(layout.estimate_column.as_str().into(), estimates));
    columns.push(Column::new(
        layout.estimate_uncertainty_column().into(),
        uncertainty,
    ));
    columns.push(Column::new(layout.estimate_cv_column().into(), cvs));
    if layout.totals {
        columns.push(Column::new(layout.total_column.as_str().into(), totals));
        columns.push(Column::new(
            layout.total_uncertainty_column().into(),
            total_uncertainty,
        ));
    }
    columns.push(Column::new(derived::N_PLOTS.into(), n_plots));

    Ok(DataFrame::new(columns)?)
}

fn render_uncertainty(variance: f64, as_variance: bool) -> f64 {
    if as_variance {
        variance
    } else {
        standard_error(variance)
    }
}

/// Typed column for one grouping variable
fn group_column(name: &str, values: &[&GroupValue]) -> Column {
    let non_null = || values.iter().filter(|v| !matches!(v, GroupValue::Null));

    if non_null().all(|v| matches!(v, GroupValue::Int(_))) {
        let data: Vec<Option<i64>> = values
            .iter()
            .map(|v| match v {
                GroupValue::Int(i) => Some(*i),
                _ => None,
            })
            .collect();
        return Column::new(name.into(), data);
    }
    if non_null().all(|v| matches!(v, GroupValue::Int(_) | GroupValue::Float(_))) {
        let data: Vec<Option<f64>> = values
            .iter()
            .map(|v| match v {
                GroupValue::Int(i) => Some(*i as f64),
                GroupValue::Float(f) => Some(*f),
                _ => None,
            })
            .collect();
        return Column::new(name.into(), data);
    }
    if non_null().all(|v| matches!(v, GroupValue::Bool(_))) {
        let data: Vec<Option<bool>> = values
            .iter()
            .map(|v| match v {
                GroupValue::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        return Column::new(name.into(), data);
    }

    let data: Vec<Option<String>> = values
        .iter()
        .map(|v| match v {
            GroupValue::Null => None,
            other => Some(other.to_string()),
        })
        .collect();
    Column::new(name.into(), data)
}

/// Switch the uncertainty columns of a result frame between SE and VARIANCE.
///
/// `_SE` columns become `_VARIANCE` (squared) or the reverse (square root);
/// `_SE_PERCENT` columns are untouched.
pub fn convert_uncertainty(frame: &DataFrame, to_variance: bool) -> Result<DataFrame> {
    let (from, to) = if to_variance {
        ("_SE", "_VARIANCE")
    } else {
        ("_VARIANCE", "_SE")
    };

    let mut columns = Vec::with_capacity(frame.width());
    for column in frame.get_columns() {
        let name = column.name().to_string();
        match name.strip_suffix(from) {
            Some(stem) => {
                let values: Vec<Option<f64>> = column
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .map(|v| v.map(|x| if to_variance { x * x } else { standard_error(x) }))
                    .collect();
                columns.push(Column::new(format!("{}{}", stem, to).into(), values));
            }
            None => columns.push(column.clone()),
        }
    }
    Ok(DataFrame::new(columns)?)
}

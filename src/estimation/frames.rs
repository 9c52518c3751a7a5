//! Small helpers for moving between lazy plans and collected frames.

use crate::database::schema_of;
use crate::error::Result;
use polars::prelude::*;

/// Join `right` onto `left`, bringing only columns `left` does not already have.
///
/// Keeps source tables that share descriptive columns (`INVYR`, `STATECD`,
/// ...) from producing suffixed duplicates.
pub fn join_new_columns(
    left: LazyFrame,
    right: LazyFrame,
    left_on: &[&str],
    right_on: &[&str],
    how: JoinType,
) -> Result<LazyFrame> {
    let left_schema = schema_of(&left)?;
    let right_schema = schema_of(&right)?;

    let mut selection: Vec<Expr> = right_on.iter().map(|k| col(*k)).collect();
    for name in right_schema.iter_names() {
        let name = name.as_str();
        if !right_on.contains(&name) && !left_schema.contains(name) {
            selection.push(col(name));
        }
    }

    let left_keys: Vec<Expr> = left_on.iter().map(|k| col(*k)).collect();
    let right_keys: Vec<Expr> = right_on.iter().map(|k| col(*k)).collect();
    Ok(left.join(
        right.select(selection),
        left_keys,
        right_keys,
        JoinArgs::new(how),
    ))
}

pub fn has_column(lazy: &LazyFrame, name: &str) -> Result<bool> {
    Ok(schema_of(lazy)?.contains(name))
}

pub fn string_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = frame.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

pub fn float_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = frame.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Like [`float_column`], but all-null when the column is absent
pub fn optional_float_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    if frame.get_column_index(name).is_some() {
        float_column(frame, name)
    } else {
        Ok(vec![None; frame.height()])
    }
}

//! Named lazy tables consumed by the estimators.
//!
//! This is the storage collaborator boundary: the estimators only see
//! `LazyFrame` handles and never decide how tables are physically stored.
//! Tables can be registered from in-memory frames or discovered on disk as
//! Parquet/CSV files named after the FIADB table (optionally state-prefixed,
//! e.g. `GA_PLOT.csv`).

use crate::constants::{columns, tables};
use crate::error::{EstimationError, Result};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Collection of FIADB tables exposed as lazy query plans
#[derive(Clone, Default)]
pub struct FiaDatabase {
    tables: HashMap<String, LazyFrame>,
}

impl FiaDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an in-memory table, normalising key columns to strings
    pub fn insert_frame(&mut self, name: &str, frame: DataFrame) -> Result<()> {
        let lazy = normalize_key_columns(frame.lazy())?;
        self.insert_lazy(name, lazy)
    }

    /// Builder form of [`FiaDatabase::insert_frame`]
    pub fn with_table(mut self, name: &str, frame: DataFrame) -> Result<Self> {
        self.insert_frame(name, frame)?;
        Ok(self)
    }

    /// Additional frames for an existing table are unioned (multi-state loads)
    fn insert_lazy(&mut self, name: &str, lazy: LazyFrame) -> Result<()> {
        let key = name.to_uppercase();
        let merged = match self.tables.remove(&key) {
            Some(existing) => concat([existing, lazy], UnionArgs::default())?,
            None => lazy,
        };
        self.tables.insert(key, merged);
        Ok(())
    }

    /// Discover `*.parquet` and `*.csv` tables in a directory
    pub fn from_directory(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(EstimationError::configuration(format!(
                "Database directory not found: {}",
                dir.display()
            )));
        }

        let mut database = Self::new();
        for path in discover_table_files(dir)? {
            let Some(table) = table_name_for(&path) else {
                debug!("Skipping unrecognised file: {}", path.display());
                continue;
            };
            let frame = read_table_file(&path)?;
            debug!(
                "Loaded {} rows for {} from {}",
                frame.height(),
                table,
                path.display()
            );
            database.insert_frame(table, frame)?;
        }

        info!(
            "Loaded {} tables from {}",
            database.tables.len(),
            dir.display()
        );
        Ok(database)
    }

    /// Lazy handle to a named table
    pub fn table(&self, name: &str) -> Result<LazyFrame> {
        self.tables
            .get(&name.to_uppercase())
            .cloned()
            .ok_or_else(|| EstimationError::missing_table(name))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_uppercase())
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for FiaDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FiaDatabase")
            .field("tables", &self.table_names())
            .finish()
    }
}

/// Resolve the schema of a lazy table
pub fn schema_of(lazy: &LazyFrame) -> Result<SchemaRef> {
    let mut planned = lazy.clone();
    Ok(planned.collect_schema()?)
}

/// Fail with `MissingColumn` naming the first required column that is absent
pub fn require_columns(table: &str, lazy: &LazyFrame, required: &[&str]) -> Result<()> {
    let schema = schema_of(lazy)?;
    for column in required {
        if !schema.contains(column) {
            return Err(EstimationError::missing_column(table, *column));
        }
    }
    Ok(())
}

fn normalize_key_columns(lazy: LazyFrame) -> Result<LazyFrame> {
    let schema = schema_of(&lazy)?;
    let mut casts: Vec<Expr> = columns::KEY_COLUMNS
        .iter()
        .filter(|name| schema.contains(name))
        .map(|name| col(*name).cast(DataType::String))
        .collect();
    casts.extend(
        columns::CONDITION_KEY_COLUMNS
            .iter()
            .filter(|name| schema.contains(name))
            .map(|name| col(*name).cast(DataType::Int64)),
    );

    if casts.is_empty() {
        Ok(lazy)
    } else {
        Ok(lazy.with_columns(casts))
    }
}

fn discover_table_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for extension in ["parquet", "csv"] {
        let pattern = dir.join(format!("*.{}", extension));
        let pattern = pattern.to_string_lossy();
        let entries = glob::glob(&pattern).map_err(|e| {
            EstimationError::configuration(format!("Invalid table pattern '{}': {}", pattern, e))
        })?;
        for entry in entries {
            files.push(entry.map_err(std::io::Error::from)?);
        }
    }
    files.sort();
    Ok(files)
}

/// Map a file stem to a known table name, honouring state prefixes
fn table_name_for(path: &Path) -> Option<&'static str> {
    let stem = path.file_stem()?.to_string_lossy().to_uppercase();

    let mut known: Vec<&'static str> = tables::KNOWN_TABLES.to_vec();
    known.sort_by_key(|name| std::cmp::Reverse(name.len()));

    known.into_iter().find(|name| {
        stem == *name
            || stem
                .strip_suffix(name)
                .is_some_and(|prefix| prefix.ends_with('_'))
    })
}

fn read_table_file(path: &Path) -> Result<DataFrame> {
    let is_parquet = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

    let frame = if is_parquet {
        ParquetReader::new(File::open(path)?).finish()?
    } else {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?
    };
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_resolution() {
        assert_eq!(table_name_for(Path::new("PLOT.csv")), Some("PLOT"));
        assert_eq!(table_name_for(Path::new("ga_tree.parquet")), Some("TREE"));
        assert_eq!(
            table_name_for(Path::new("GA_TREE_GRM_BEGIN.csv")),
            Some("TREE_GRM_BEGIN")
        );
        assert_eq!(table_name_for(Path::new("notes.csv")), None);
        assert_eq!(table_name_for(Path::new("SUBTREE.csv")), None);
    }

    #[test]
    fn test_key_columns_become_strings() {
        let frame = df!(
            "CN" => [1i64, 2],
            "PLT_CN" => [10i64, 20],
            "DIA" => [5.0, 6.0],
        )
        .unwrap();
        let database = FiaDatabase::new().with_table("tree", frame).unwrap();

        let schema = schema_of(&database.table("TREE").unwrap()).unwrap();
        assert_eq!(schema.get("CN"), Some(&DataType::String));
        assert_eq!(schema.get("PLT_CN"), Some(&DataType::String));
        assert_eq!(schema.get("DIA"), Some(&DataType::Float64));
    }

    #[test]
    fn test_missing_table_and_column_errors() {
        let frame = df!("CN" => ["1"]).unwrap();
        let database = FiaDatabase::new().with_table("PLOT", frame).unwrap();

        let Err(err) = database.table("COND") else {
            panic!("Expected COND to be missing");
        };
        assert!(matches!(err, EstimationError::MissingTable { .. }));

        let plot = database.table("PLOT").unwrap();
        let err = require_columns("PLOT", &plot, &["CN", "REMPER"]).unwrap_err();
        match err {
            EstimationError::MissingColumn { table, column } => {
                assert_eq!(table, "PLOT");
                assert_eq!(column, "REMPER");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_repeated_insert_appends_rows() {
        let mut database = FiaDatabase::new();
        database
            .insert_frame("PLOT", df!("CN" => ["1"], "INVYR" => [2020i64]).unwrap())
            .unwrap();
        database
            .insert_frame("PLOT", df!("CN" => ["2"], "INVYR" => [2021i64]).unwrap())
            .unwrap();

        let rows = database.table("PLOT").unwrap().collect().unwrap();
        assert_eq!(rows.height(), 2);
    }
}

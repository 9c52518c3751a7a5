//! Error handling for estimation operations.
//!
//! Lower-level components raise these typed errors and the pipeline
//! propagates them unchanged, so a caller always sees the original
//! failure kind.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstimationError {
    #[error("Invalid domain expression at '{fragment}': {reason}")]
    InvalidDomain { fragment: String, reason: String },

    #[error("Stratification error: {message}")]
    Stratification { message: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Missing column '{column}' in table {table}")]
    MissingColumn { table: String, column: String },

    #[error("Missing table: {table}")]
    MissingTable { table: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EstimationError {
    /// Create a domain-expression error naming the offending fragment
    pub fn invalid_domain(fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDomain {
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }

    /// Create a stratification linkage error
    pub fn stratification(message: impl Into<String>) -> Self {
        Self::Stratification {
            message: message.into(),
        }
    }

    /// Create an insufficient-data error
    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: message.into(),
        }
    }

    /// Create a missing column error
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a missing table error
    pub fn missing_table(table: impl Into<String>) -> Self {
        Self::MissingTable {
            table: table.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for failures that are scoped to a single output group
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

pub type Result<T> = std::result::Result<T, EstimationError>;

//! Named land and tree filters and domain application.
//!
//! Every named filter is written in the same predicate language users
//! supply, so built-in and ad-hoc domains pass through one parser.

use super::parser::parse_expression;
use super::predicate::DomainExpression;
use crate::config::{GrmTreeClass, LandType, TreeType};
use crate::database::schema_of;
use crate::error::{EstimationError, Result};
use polars::prelude::*;
use std::fmt;
use tracing::debug;

/// Table grain a domain expression is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    Plot,
    Condition,
    Tree,
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableRole::Plot => "PLOT",
            TableRole::Condition => "COND",
            TableRole::Tree => "TREE",
        };
        write!(f, "{}", name)
    }
}

/// Standard FIA population definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedFilter {
    ForestLand,
    TimberLand,
    LiveTrees,
    DeadTrees,
    GrowingStock,
    GrossScale,
    Reserved,
    Unreserved,
}

impl NamedFilter {
    pub fn expression(&self) -> &'static str {
        match self {
            NamedFilter::ForestLand => "COND_STATUS_CD == 1",
            NamedFilter::TimberLand => {
                "COND_STATUS_CD == 1 AND SITECLCD IN (1, 2, 3, 4, 5, 6) AND RESERVCD == 0"
            }
            NamedFilter::LiveTrees => "STATUSCD == 1",
            NamedFilter::DeadTrees => "STATUSCD == 2",
            NamedFilter::GrowingStock => "STATUSCD == 1 AND TREECLCD == 2 AND DIA >= 5.0",
            NamedFilter::GrossScale => "STATUSCD == 1 AND DIA >= 9.0 AND VOLBFGRS IS NOT NULL",
            NamedFilter::Reserved => "RESERVCD == 1",
            NamedFilter::Unreserved => "RESERVCD == 0",
        }
    }

    pub fn role(&self) -> TableRole {
        match self {
            NamedFilter::ForestLand
            | NamedFilter::TimberLand
            | NamedFilter::Reserved
            | NamedFilter::Unreserved => TableRole::Condition,
            _ => TableRole::Tree,
        }
    }

    pub fn domain(&self) -> Result<DomainFilter> {
        DomainFilter::parse(self.expression(), self.role())
    }
}

impl LandType {
    /// `None` for all land (no restriction)
    pub fn named_filter(&self) -> Option<NamedFilter> {
        match self {
            LandType::All => None,
            LandType::Forest => Some(NamedFilter::ForestLand),
            LandType::Timber => Some(NamedFilter::TimberLand),
        }
    }
}

impl TreeType {
    /// `None` for all trees (no restriction)
    pub fn named_filter(&self) -> Option<NamedFilter> {
        match self {
            TreeType::All => None,
            TreeType::Live => Some(NamedFilter::LiveTrees),
            TreeType::Dead => Some(NamedFilter::DeadTrees),
            TreeType::GrowingStock => Some(NamedFilter::GrowingStock),
            TreeType::GrossScale => Some(NamedFilter::GrossScale),
        }
    }
}

impl GrmTreeClass {
    /// Column suffix selecting the GRM variant (`AL` all live, `GS` growing stock)
    pub fn column_suffix(&self) -> &'static str {
        match self {
            GrmTreeClass::AllLive => "AL",
            GrmTreeClass::GrowingStock => "GS",
        }
    }
}

/// Parsed domain bound to the table grain it filters
#[derive(Debug, Clone, PartialEq)]
pub struct DomainFilter {
    role: TableRole,
    expression: DomainExpression,
}

impl DomainFilter {
    pub fn parse(expression: &str, role: TableRole) -> Result<Self> {
        Ok(Self {
            role,
            expression: parse_expression(expression)?,
        })
    }

    /// Filter that keeps every row
    pub fn accept_all(role: TableRole) -> Self {
        Self {
            role,
            expression: DomainExpression::empty(),
        }
    }

    pub fn role(&self) -> TableRole {
        self.role
    }

    pub fn expression(&self) -> &DomainExpression {
        &self.expression
    }

    /// Conjoin another filter of the same grain
    pub fn and(self, other: DomainFilter) -> Self {
        Self {
            role: self.role,
            expression: self.expression.and(other.expression),
        }
    }

    /// Conjoin an optional user expression
    pub fn and_parsed(self, expression: Option<&str>) -> Result<Self> {
        match expression {
            Some(text) => {
                let role = self.role;
                Ok(self.and(DomainFilter::parse(text, role)?))
            }
            None => Ok(self),
        }
    }

    /// Check every referenced column against a schema
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        for predicate in self.expression.predicates() {
            if !schema.contains(&predicate.column) {
                return Err(EstimationError::invalid_domain(
                    predicate.to_string(),
                    format!("unknown column '{}' for {} domain", predicate.column, self.role),
                ));
            }
        }
        Ok(())
    }

    /// Restrict a lazy table to rows satisfying the domain
    pub fn apply(&self, lazy: LazyFrame) -> Result<LazyFrame> {
        if self.expression.is_empty() {
            return Ok(lazy);
        }

        let schema = schema_of(&lazy)?;
        self.validate(&schema)?;

        match self.expression.to_expr()? {
            Some(predicate) => {
                debug!("Applying {} domain: {}", self.role, self.expression);
                Ok(lazy.filter(predicate))
            }
            None => Ok(lazy),
        }
    }
}

/// Condition-grain filter for a land type plus an optional area domain
pub fn condition_domain(land_type: LandType, area_domain: Option<&str>) -> Result<DomainFilter> {
    let base = match land_type.named_filter() {
        Some(filter) => filter.domain()?,
        None => DomainFilter::accept_all(TableRole::Condition),
    };
    base.and_parsed(area_domain)
}

/// Tree-grain filter for a tree type plus an optional tree domain
pub fn tree_domain(tree_type: TreeType, tree_domain: Option<&str>) -> Result<DomainFilter> {
    let base = match tree_type.named_filter() {
        Some(filter) => filter.domain()?,
        None => DomainFilter::accept_all(TableRole::Tree),
    };
    base.and_parsed(tree_domain)
}

//! Structured predicates produced by the domain parser.

use crate::error::{EstimationError, Result};
use polars::prelude::*;
use std::fmt;

/// Scalar operand of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Literal {
    pub fn to_expr(&self) -> Expr {
        match self {
            Literal::Int(v) => lit(*v),
            Literal::Float(v) => lit(*v),
            Literal::Text(s) => lit(s.clone()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// Comparison operator of a single predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
    Between,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Scalar(Literal),
    List(Vec<Literal>),
    Range(Literal, Literal),
}

/// One `(column, operator, operand)` triple
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub operator: Operator,
    pub operand: Operand,
}

impl Predicate {
    pub fn new(column: impl Into<String>, operator: Operator, operand: Operand) -> Self {
        Self {
            column: column.into(),
            operator,
            operand,
        }
    }

    /// Polars expression evaluating this predicate; null cells never pass
    pub fn to_expr(&self) -> Result<Expr> {
        let column = col(self.column.as_str());
        let expr = match (&self.operator, &self.operand) {
            (Operator::Eq, Operand::Scalar(v)) => column.eq(v.to_expr()),
            (Operator::NotEq, Operand::Scalar(v)) => column.neq(v.to_expr()),
            (Operator::Lt, Operand::Scalar(v)) => column.lt(v.to_expr()),
            (Operator::LtEq, Operand::Scalar(v)) => column.lt_eq(v.to_expr()),
            (Operator::Gt, Operand::Scalar(v)) => column.gt(v.to_expr()),
            (Operator::GtEq, Operand::Scalar(v)) => column.gt_eq(v.to_expr()),
            (Operator::In, Operand::List(values)) => membership(column, values),
            (Operator::NotIn, Operand::List(values)) => {
                let guard = column.clone().is_not_null();
                guard.and(membership(column, values).not())
            }
            (Operator::Between, Operand::Range(low, high)) => column
                .clone()
                .gt_eq(low.to_expr())
                .and(column.lt_eq(high.to_expr())),
            (Operator::IsNull, Operand::None) => column.is_null(),
            (Operator::IsNotNull, Operand::None) => column.is_not_null(),
            _ => {
                return Err(EstimationError::invalid_domain(
                    self.to_string(),
                    "operand does not match operator",
                ));
            }
        };
        Ok(expr)
    }
}

fn membership(column: Expr, values: &[Literal]) -> Expr {
    values
        .iter()
        .map(|value| column.clone().eq(value.to_expr()))
        .reduce(|acc, next| acc.or(next))
        .unwrap_or_else(|| lit(false))
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Operand::None => write!(f, "{} {}", self.column, self.operator.symbol()),
            Operand::Scalar(v) => write!(f, "{} {} {}", self.column, self.operator.symbol(), v),
            Operand::List(values) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(
                    f,
                    "{} {} ({})",
                    self.column,
                    self.operator.symbol(),
                    items.join(", ")
                )
            }
            Operand::Range(low, high) => write!(
                f,
                "{} {} {} AND {}",
                self.column,
                self.operator.symbol(),
                low,
                high
            ),
        }
    }
}

/// Conjunction of predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainExpression {
    predicates: Vec<Predicate>,
}

impl DomainExpression {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    /// Expression that accepts every row
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Distinct column names referenced, in first-use order
    pub fn columns(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for predicate in &self.predicates {
            if !seen.contains(&predicate.column.as_str()) {
                seen.push(predicate.column.as_str());
            }
        }
        seen
    }

    /// Conjoin two expressions
    pub fn and(mut self, other: DomainExpression) -> Self {
        self.predicates.extend(other.predicates);
        self
    }

    /// `None` when the expression is empty (no filtering)
    pub fn to_expr(&self) -> Result<Option<Expr>> {
        let mut combined: Option<Expr> = None;
        for predicate in &self.predicates {
            let expr = predicate.to_expr()?;
            combined = Some(match combined {
                Some(acc) => acc.and(expr),
                None => expr,
            });
        }
        Ok(combined)
    }
}

impl fmt::Display for DomainExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.predicates.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(" AND "))
    }
}

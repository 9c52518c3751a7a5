//! Domain filtering.
//!
//! Turns boolean expressions over FIADB columns into structured predicates
//! and applies them to lazy tables. Named land and tree filters are defined
//! in the same language.

pub mod filters;
pub mod parser;
pub mod predicate;

#[cfg(test)]
pub mod tests;

pub use filters::{DomainFilter, NamedFilter, TableRole, condition_domain, tree_domain};
pub use parser::parse_expression;
pub use predicate::{DomainExpression, Literal, Operand, Operator, Predicate};

//! Core data structures shared across the estimation pipeline.
//!
//! Defines stratum design records, per-subplot-type adjustment factors,
//! and the hashable group-key values used to collapse output rows.

use polars::prelude::AnyValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Subplot type a record was sampled on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubplotType {
    /// Code 0: not sampled, contributes nothing
    NotSampled,
    /// Code 1: full-size (24 ft) subplot
    Subplot,
    /// Code 2: microplot (6.8 ft)
    Microplot,
    /// Code 3: macroplot (58.9 ft)
    Macroplot,
}

impl SubplotType {
    /// Decode the FIA subplot-type code. Unknown codes are treated as not sampled.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => SubplotType::Subplot,
            2 => SubplotType::Microplot,
            3 => SubplotType::Macroplot,
            _ => SubplotType::NotSampled,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            SubplotType::NotSampled => 0,
            SubplotType::Subplot => 1,
            SubplotType::Microplot => 2,
            SubplotType::Macroplot => 3,
        }
    }
}

/// Per-stratum multipliers correcting for partially sampled plots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentFactors {
    pub subplot: f64,
    pub microplot: f64,
    pub macroplot: f64,
}

impl AdjustmentFactors {
    pub fn new(subplot: f64, microplot: f64, macroplot: f64) -> Self {
        Self {
            subplot,
            microplot,
            macroplot,
        }
    }

    /// Factor for a record sampled on the given subplot type
    pub fn for_subplot_type(&self, subplot_type: SubplotType) -> f64 {
        match subplot_type {
            SubplotType::NotSampled => 0.0,
            SubplotType::Subplot => self.subplot,
            SubplotType::Microplot => self.microplot,
            SubplotType::Macroplot => self.macroplot,
        }
    }
}

impl Default for AdjustmentFactors {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// A design stratum within an estimation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stratum {
    pub cn: String,
    pub estn_unit_cn: String,
    pub evalid: u32,
    /// Acres represented by one sampled plot
    pub expansion_factor: f64,
    pub adjustment: AdjustmentFactors,
    /// Phase-1 point count (population of sample points)
    pub p1_points: Option<f64>,
    /// Phase-2 point count (plots selected by design)
    pub p2_points: Option<f64>,
}

impl Stratum {
    /// Phase-2 sampling fraction `n_h / P1POINTCNT`, if the design count is usable
    pub fn sampling_fraction(&self, n_plots: usize) -> Option<f64> {
        match self.p1_points {
            Some(points) if points > 0.0 && (n_plots as f64) <= points => {
                Some(n_plots as f64 / points)
            }
            _ => None,
        }
    }
}

/// One cell of an output grouping key
#[derive(Debug, Clone)]
pub enum GroupValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl GroupValue {
    /// Convert a polars cell into an owned, hashable group value
    pub fn from_any_value(value: &AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => GroupValue::Null,
            AnyValue::Boolean(b) => GroupValue::Bool(*b),
            AnyValue::Int32(v) => GroupValue::Int(*v as i64),
            AnyValue::Int64(v) => GroupValue::Int(*v),
            AnyValue::UInt32(v) => GroupValue::Int(*v as i64),
            AnyValue::UInt64(v) => GroupValue::Int(*v as i64),
            AnyValue::Float32(v) => GroupValue::Float(*v as f64),
            AnyValue::Float64(v) => GroupValue::Float(*v),
            AnyValue::String(s) => GroupValue::Text((*s).to_string()),
            AnyValue::StringOwned(s) => GroupValue::Text(s.to_string()),
            other => GroupValue::Text(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            GroupValue::Null => 0,
            GroupValue::Bool(_) => 1,
            GroupValue::Int(_) | GroupValue::Float(_) => 2,
            GroupValue::Text(_) => 3,
        }
    }
}

impl PartialEq for GroupValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupValue {}

impl PartialOrd for GroupValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupValue::Bool(a), GroupValue::Bool(b)) => a.cmp(b),
            (GroupValue::Int(a), GroupValue::Int(b)) => a.cmp(b),
            (GroupValue::Float(a), GroupValue::Float(b)) => a.total_cmp(b),
            (GroupValue::Int(a), GroupValue::Float(b)) => (*a as f64).total_cmp(b),
            (GroupValue::Float(a), GroupValue::Int(b)) => a.total_cmp(&(*b as f64)),
            (GroupValue::Text(a), GroupValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for GroupValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            GroupValue::Null => {}
            GroupValue::Bool(b) => b.hash(state),
            // Integral floats hash like the matching integer so Eq and Hash agree
            GroupValue::Int(v) => (*v as f64).to_bits().hash(state),
            GroupValue::Float(v) => v.to_bits().hash(state),
            GroupValue::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Null => write!(f, "null"),
            GroupValue::Bool(b) => write!(f, "{}", b),
            GroupValue::Int(v) => write!(f, "{}", v),
            GroupValue::Float(v) => write!(f, "{}", v),
            GroupValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Ordered values of the grouping columns for one output row
pub type GroupKey = Vec<GroupValue>;

/// Render a group key for log and error messages
pub fn describe_group(columns: &[String], key: &[GroupValue]) -> String {
    if columns.is_empty() {
        return "population".to_string();
    }
    columns
        .iter()
        .zip(key)
        .map(|(column, value)| format!("{}={}", column, value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_subplot_type_codes() {
        for code in 0..=3 {
            assert_eq!(SubplotType::from_code(code).code(), code);
        }
        assert_eq!(SubplotType::from_code(9), SubplotType::NotSampled);
    }

    #[test]
    fn test_adjustment_factor_selection() {
        let adj = AdjustmentFactors::new(1.1, 1.2, 1.3);
        assert_eq!(adj.for_subplot_type(SubplotType::NotSampled), 0.0);
        assert_eq!(adj.for_subplot_type(SubplotType::Subplot), 1.1);
        assert_eq!(adj.for_subplot_type(SubplotType::Microplot), 1.2);
        assert_eq!(adj.for_subplot_type(SubplotType::Macroplot), 1.3);
    }

    #[test]
    fn test_sampling_fraction() {
        let stratum = Stratum {
            cn: "S1".to_string(),
            estn_unit_cn: "U1".to_string(),
            evalid: 132301,
            expansion_factor: 6000.0,
            adjustment: AdjustmentFactors::default(),
            p1_points: Some(200.0),
            p2_points: Some(10.0),
        };
        assert_eq!(stratum.sampling_fraction(10), Some(0.05));
        assert_eq!(stratum.sampling_fraction(500), None);
    }

    #[test]
    fn test_group_value_int_float_equivalence() {
        let a = GroupValue::Int(3);
        let b = GroupValue::Float(3.0);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(vec![a]);
        assert!(set.contains(&vec![b]));
    }

    #[test]
    fn test_group_value_ordering_puts_null_first() {
        let mut values = vec![
            GroupValue::Text("b".to_string()),
            GroupValue::Int(2),
            GroupValue::Null,
            GroupValue::Int(1),
        ];
        values.sort();
        assert_eq!(values[0], GroupValue::Null);
        assert_eq!(values[1], GroupValue::Int(1));
        assert_eq!(values[3], GroupValue::Text("b".to_string()));
    }
}

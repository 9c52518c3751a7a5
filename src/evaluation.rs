//! Evaluation identifiers and chronological selection.
//!
//! An EVALID packs a state code, a windowed two-digit year and an
//! evaluation-type code into one integer (`SSYYTT`). Ordering must always
//! use the decoded four-digit year: `139901` (1999) precedes `132301` (2023)
//! even though it is numerically larger.

use crate::constants::EVALID_YEAR_PIVOT;
use crate::error::{EstimationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of population an evaluation supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EvalType {
    /// 00: current area
    Current,
    /// 01: current area and volume
    Volume,
    /// 03: growth, removals, mortality and area change
    Change,
    /// 07: down woody material
    DownWoody,
    Other(u8),
}

impl EvalType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => EvalType::Current,
            1 => EvalType::Volume,
            3 => EvalType::Change,
            7 => EvalType::DownWoody,
            other => EvalType::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            EvalType::Current => 0,
            EvalType::Volume => 1,
            EvalType::Change => 3,
            EvalType::DownWoody => 7,
            EvalType::Other(code) => *code,
        }
    }
}

/// Decoded evaluation identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationId(u32);

impl EvaluationId {
    /// Wrap a raw EVALID, rejecting values that cannot carry a state code
    pub fn new(raw: u32) -> Result<Self> {
        if raw < 10_000 || raw > 999_999 {
            return Err(EstimationError::configuration(format!(
                "EVALID {} is not a 5- or 6-digit evaluation identifier",
                raw
            )));
        }
        Ok(Self(raw))
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn state_code(&self) -> u32 {
        self.0 / 10_000
    }

    /// Two-digit year as stored in the identifier
    pub fn year_digits(&self) -> u32 {
        (self.0 / 100) % 100
    }

    /// Four-digit year: 00-30 map to 2000-2030, 31-99 to 1931-1999
    pub fn year(&self) -> u32 {
        let yy = self.year_digits();
        if yy <= EVALID_YEAR_PIVOT {
            2000 + yy
        } else {
            1900 + yy
        }
    }

    pub fn eval_type(&self) -> EvalType {
        EvalType::from_code((self.0 % 100) as u8)
    }

    /// Key that orders evaluations chronologically, ties broken by id
    pub fn chronological_key(&self) -> (u32, u32) {
        (self.year(), self.0)
    }
}

impl FromStr for EvaluationId {
    type Err = EstimationError;

    fn from_str(s: &str) -> Result<Self> {
        let raw: u32 = s.trim().parse().map_err(|_| {
            EstimationError::configuration(format!("EVALID '{}' is not an integer", s))
        })?;
        Self::new(raw)
    }
}

impl fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sort evaluations by decoded year, never by raw numeric id
pub fn sort_chronologically(ids: &mut [EvaluationId]) {
    ids.sort_by_key(|id| id.chronological_key());
}

/// Most recent evaluation per state among those of an accepted type
pub fn most_recent(ids: &[EvaluationId], accepted: &[EvalType]) -> Vec<EvaluationId> {
    let mut latest: BTreeMap<u32, EvaluationId> = BTreeMap::new();
    for id in ids.iter().filter(|id| accepted.contains(&id.eval_type())) {
        latest
            .entry(id.state_code())
            .and_modify(|current| {
                if id.chronological_key() > current.chronological_key() {
                    *current = *id;
                }
            })
            .or_insert(*id);
    }
    latest.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_y2k_window() {
        let old = EvaluationId::new(139901).unwrap();
        let new = EvaluationId::new(132301).unwrap();
        assert_eq!(old.year(), 1999);
        assert_eq!(new.year(), 2023);
        assert_eq!(EvaluationId::new(133001).unwrap().year(), 2030);
        assert_eq!(EvaluationId::new(133101).unwrap().year(), 1931);
    }

    #[test]
    fn test_chronological_sort_ignores_numeric_order() {
        let mut ids = vec![
            EvaluationId::new(139901).unwrap(),
            EvaluationId::new(132301).unwrap(),
            EvaluationId::new(130501).unwrap(),
        ];
        sort_chronologically(&mut ids);
        let raw: Vec<u32> = ids.iter().map(|id| id.raw()).collect();
        assert_eq!(raw, vec![139901, 130501, 132301]);
    }

    #[test]
    fn test_decoding_fields() {
        let id = EvaluationId::new(412103).unwrap();
        assert_eq!(id.state_code(), 41);
        assert_eq!(id.year(), 2021);
        assert_eq!(id.eval_type(), EvalType::Change);

        let five_digit = EvaluationId::new(12301).unwrap();
        assert_eq!(five_digit.state_code(), 1);
        assert_eq!(five_digit.eval_type(), EvalType::Volume);
    }

    #[test]
    fn test_invalid_ids_rejected() {
        assert!(EvaluationId::new(999).is_err());
        assert!(EvaluationId::new(1_000_000).is_err());
        assert!("abc".parse::<EvaluationId>().is_err());
    }

    #[test]
    fn test_most_recent_per_state() {
        let ids: Vec<EvaluationId> = [139901, 132301, 131901, 132303, 452201]
            .into_iter()
            .map(|raw| EvaluationId::new(raw).unwrap())
            .collect();

        let picked = most_recent(&ids, &[EvalType::Volume]);
        let raw: Vec<u32> = picked.iter().map(|id| id.raw()).collect();
        assert_eq!(raw, vec![132301, 452201]);
    }
}

//! Growth, removal and mortality component classification.
//!
//! Component labels are parsed once into a family tag plus an optional
//! numeric variant (`MORTALITY2` is `Mortality` variant 2) and matched
//! structurally afterwards.

use super::frames::{float_column, optional_float_column};
use super::measure::GrmKind;
use crate::constants::{columns, derived};
use crate::error::{EstimationError, Result};
use crate::models::{AdjustmentFactors, SubplotType};
use polars::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Component family of a tree across one remeasurement period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentFamily {
    Survivor,
    Ingrowth,
    Reversion,
    Mortality,
    Cut,
    Diversion,
    /// Labels outside the GRM vocabulary (`NOT USED`, blanks, ...)
    Unclassified,
}

/// A parsed GRM component label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrmComponent {
    pub family: ComponentFamily,
    pub variant: Option<u8>,
}

impl GrmComponent {
    pub fn new(family: ComponentFamily, variant: Option<u8>) -> Self {
        Self { family, variant }
    }

    pub fn unclassified() -> Self {
        Self::new(ComponentFamily::Unclassified, None)
    }

    /// Parse a label, mapping anything unrecognised to `Unclassified`
    pub fn parse(label: &str) -> Self {
        label.parse().unwrap_or_else(|_| Self::unclassified())
    }

    /// Whether a record of this component enters the given measure
    pub fn contributes_to(&self, kind: GrmKind) -> bool {
        match kind {
            GrmKind::Growth => matches!(
                self.family,
                ComponentFamily::Survivor | ComponentFamily::Ingrowth | ComponentFamily::Reversion
            ),
            GrmKind::Mortality => self.family == ComponentFamily::Mortality,
            GrmKind::Removals => matches!(
                self.family,
                ComponentFamily::Cut | ComponentFamily::Diversion
            ),
        }
    }
}

impl FromStr for GrmComponent {
    type Err = EstimationError;

    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim().to_uppercase();
        let split = label
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(label.len());
        let (word, digits) = label.split_at(split);

        let family = match word {
            "SURVIVOR" => ComponentFamily::Survivor,
            "INGROWTH" => ComponentFamily::Ingrowth,
            "REVERSION" => ComponentFamily::Reversion,
            "MORTALITY" => ComponentFamily::Mortality,
            "CUT" => ComponentFamily::Cut,
            "DIVERSION" => ComponentFamily::Diversion,
            _ => {
                return Err(EstimationError::configuration(format!(
                    "unknown GRM component '{}'",
                    s
                )));
            }
        };

        let variant = if digits.is_empty() {
            None
        } else {
            Some(digits.parse::<u8>().map_err(|_| {
                EstimationError::configuration(format!("invalid GRM component variant in '{}'", s))
            })?)
        };

        let numbered = matches!(
            family,
            ComponentFamily::Reversion
                | ComponentFamily::Mortality
                | ComponentFamily::Cut
                | ComponentFamily::Diversion
        );
        if variant.is_some() && !numbered {
            return Err(EstimationError::configuration(format!(
                "GRM component '{}' has no numbered variants",
                s
            )));
        }

        Ok(Self::new(family, variant))
    }
}

impl fmt::Display for GrmComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self.family {
            ComponentFamily::Survivor => "SURVIVOR",
            ComponentFamily::Ingrowth => "INGROWTH",
            ComponentFamily::Reversion => "REVERSION",
            ComponentFamily::Mortality => "MORTALITY",
            ComponentFamily::Cut => "CUT",
            ComponentFamily::Diversion => "DIVERSION",
            ComponentFamily::Unclassified => "UNCLASSIFIED",
        };
        match self.variant {
            Some(n) => write!(f, "{}{}", word, n),
            None => f.write_str(word),
        }
    }
}

/// Outcome of evaluating one tree-period record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contribution {
    /// Component or subplot type outside the measure
    Excluded,
    /// A required input was null
    Missing,
    Value(f64),
}

/// One tree-period observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrmRecord {
    pub component: GrmComponent,
    pub subplot_type: SubplotType,
    pub tpa: Option<f64>,
    pub begin: Option<f64>,
    pub end: Option<f64>,
    pub midpoint: Option<f64>,
    pub remper: Option<f64>,
}

impl GrmRecord {
    /// Contribution of this record, adjusted by its own subplot type
    pub fn contribution(
        &self,
        kind: GrmKind,
        adjustment: &AdjustmentFactors,
        annualize: bool,
    ) -> Contribution {
        if !self.component.contributes_to(kind) || self.subplot_type == SubplotType::NotSampled {
            return Contribution::Excluded;
        }
        let factor = adjustment.for_subplot_type(self.subplot_type);

        let change = match kind {
            GrmKind::Growth => annual_change(self.component, self.begin, self.end, self.remper),
            GrmKind::Mortality | GrmKind::Removals => {
                if annualize {
                    per_year(self.midpoint, self.remper)
                } else {
                    self.midpoint
                }
            }
        };

        match (self.tpa, change) {
            (Some(tpa), Some(change)) => Contribution::Value(tpa * change * factor),
            _ => Contribution::Missing,
        }
    }
}

/// Annual net change of one tree-period attribute.
///
/// Survivors grow by `(end - begin) / remper`; ingrowth and reversions enter
/// with their whole end value. Other families have no growth.
pub fn annual_change(
    component: GrmComponent,
    begin: Option<f64>,
    end: Option<f64>,
    remper: Option<f64>,
) -> Option<f64> {
    match component.family {
        ComponentFamily::Survivor => per_year(Some(end? - begin?), remper),
        ComponentFamily::Ingrowth | ComponentFamily::Reversion => per_year(end, remper),
        _ => Some(0.0),
    }
}

fn per_year(value: Option<f64>, remper: Option<f64>) -> Option<f64> {
    let remper = remper.filter(|years| *years > 0.0)?;
    Some(value? / remper)
}

/// Counts from classifying a collected tree-period frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub kept: usize,
    pub excluded: usize,
    pub missing: usize,
}

/// Classify every row of a collected tree-period frame and attach the
/// contribution column. Excluded and null rows carry a null value and are
/// dropped by the caller.
///
/// Expects the component, TPA, subplot-type, snapshot, `REMPER` and
/// adjustment-factor columns produced by the tree-period pipeline stage.
/// Snapshot columns a measure does not read may be absent.
pub fn attach_contributions(
    frame: &mut DataFrame,
    kind: GrmKind,
    annualize: bool,
) -> Result<ClassificationSummary> {
    let components = frame.column(derived::COMPONENT)?.cast(&DataType::String)?;
    let components = components.str()?;
    let tpa = float_column(frame, derived::GRM_TPA)?;
    let subplot = frame.column(derived::GRM_SUBPTYP)?.cast(&DataType::Int64)?;
    let subplot = subplot.i64()?;
    let begin = optional_float_column(frame, derived::BEGIN_VALUE)?;
    let end = optional_float_column(frame, derived::END_VALUE)?;
    let midpoint = optional_float_column(frame, derived::MIDPT_VALUE)?;
    let remper = float_column(frame, columns::REMPER)?;
    let adj_subp = float_column(frame, columns::ADJ_FACTOR_SUBP)?;
    let adj_micr = float_column(frame, columns::ADJ_FACTOR_MICR)?;
    let adj_macr = float_column(frame, columns::ADJ_FACTOR_MACR)?;

    let mut summary = ClassificationSummary::default();
    let mut values: Vec<Option<f64>> = Vec::with_capacity(frame.height());

    for i in 0..frame.height() {
        let record = GrmRecord {
            component: components
                .get(i)
                .map(GrmComponent::parse)
                .unwrap_or_else(GrmComponent::unclassified),
            subplot_type: subplot
                .get(i)
                .map(SubplotType::from_code)
                .unwrap_or(SubplotType::NotSampled),
            tpa: tpa[i],
            begin: begin[i],
            end: end[i],
            midpoint: midpoint[i],
            remper: remper[i],
        };
        let adjustment = AdjustmentFactors::new(
            adj_subp[i].unwrap_or(0.0),
            adj_micr[i].unwrap_or(0.0),
            adj_macr[i].unwrap_or(0.0),
        );

        match record.contribution(kind, &adjustment, annualize) {
            Contribution::Value(v) => {
                summary.kept += 1;
                values.push(Some(v));
            }
            Contribution::Excluded => {
                summary.excluded += 1;
                values.push(None);
            }
            Contribution::Missing => {
                summary.missing += 1;
                values.push(None);
            }
        }
    }

    frame.with_column(Column::new(derived::VALUE.into(), values))?;
    Ok(summary)
}

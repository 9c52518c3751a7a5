//! Plot-to-stratum linkage for the active evaluations.
//!
//! Loads `POP_PLOT_STRATUM_ASSGN` and `POP_STRATUM`, checks that every
//! assignment resolves to exactly one existing stratum, and exposes the
//! per-plot adjustment factors the value formulas need.

use super::frames::{float_column, optional_float_column, string_column};
use crate::constants::{columns, tables};
use crate::database::{FiaDatabase, require_columns, schema_of};
use crate::error::{EstimationError, Result};
use crate::evaluation::EvaluationId;
use crate::models::{AdjustmentFactors, Stratum};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Stratification design of one estimation call.
///
/// A sampling unit is a (plot, stratum) pair.
#[derive(Debug, Clone)]
pub struct StratificationDesign {
    strata: BTreeMap<String, Stratum>,
    plots_by_stratum: BTreeMap<String, Vec<String>>,
    assigned: HashSet<(String, String)>,
}

/// Filter expression selecting rows whose `EVALID` is one of `evalids`
pub fn evalid_filter(evalids: &[EvaluationId]) -> Expr {
    evalids
        .iter()
        .map(|id| {
            col(columns::EVALID)
                .cast(DataType::Int64)
                .eq(lit(id.raw() as i64))
        })
        .reduce(|acc, next| acc.or(next))
        .unwrap_or_else(|| lit(false))
}

impl StratificationDesign {
    /// Load assignments and strata for the given evaluations
    pub fn load(database: &FiaDatabase, evalids: &[EvaluationId]) -> Result<Self> {
        let assignments = database.table(tables::POP_PLOT_STRATUM_ASSGN)?;
        require_columns(
            tables::POP_PLOT_STRATUM_ASSGN,
            &assignments,
            &[columns::PLT_CN, columns::STRATUM_CN, columns::EVALID],
        )?;
        let assignments = assignments
            .filter(evalid_filter(evalids))
            .select([
                col(columns::PLT_CN),
                col(columns::STRATUM_CN),
                col(columns::EVALID).cast(DataType::Int64),
            ])
            .collect()?;

        for id in evalids {
            let present = assignments
                .column(columns::EVALID)?
                .i64()?
                .into_iter()
                .any(|v| v == Some(id.raw() as i64));
            if !present {
                return Err(EstimationError::stratification(format!(
                    "no plot has a stratum assignment for EVALID {}",
                    id
                )));
            }
        }

        let strata = database.table(tables::POP_STRATUM)?;
        require_columns(
            tables::POP_STRATUM,
            &strata,
            &[
                columns::CN,
                columns::ESTN_UNIT_CN,
                columns::EXPNS,
                columns::ADJ_FACTOR_SUBP,
                columns::ADJ_FACTOR_MICR,
                columns::ADJ_FACTOR_MACR,
            ],
        )?;
        let strata = select_strata_columns(strata)?.collect()?;

        Self::from_frames(&assignments, &strata)
    }

    /// Build from collected assignment and stratum frames
    pub fn from_frames(assignments: &DataFrame, strata: &DataFrame) -> Result<Self> {
        let strata = read_strata(strata)?;

        let plots = string_column(assignments, columns::PLT_CN)?;
        let stratum_cns = string_column(assignments, columns::STRATUM_CN)?;
        let evalids = assignments
            .column(columns::EVALID)?
            .cast(&DataType::Int64)?;
        let evalids: Vec<Option<i64>> = evalids.i64()?.into_iter().collect();

        let mut seen: HashMap<(String, u32), String> = HashMap::new();
        let mut evals_per_plot: HashMap<String, HashSet<u32>> = HashMap::new();
        let mut plots_by_stratum: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut assigned = HashSet::new();

        for i in 0..assignments.height() {
            let (Some(plot), Some(stratum_cn)) = (&plots[i], &stratum_cns[i]) else {
                return Err(EstimationError::stratification(format!(
                    "assignment row {} has a null plot or stratum",
                    i
                )));
            };
            let evalid = evalids[i].unwrap_or_default() as u32;

            if !strata.contains_key(stratum_cn) {
                return Err(EstimationError::stratification(format!(
                    "plot {} is assigned to stratum {} which does not exist",
                    plot, stratum_cn
                )));
            }

            match seen.get(&(plot.clone(), evalid)) {
                Some(existing) if existing != stratum_cn => {
                    return Err(EstimationError::stratification(format!(
                        "plot {} is assigned to strata {} and {} in EVALID {}",
                        plot, existing, stratum_cn, evalid
                    )));
                }
                Some(_) => continue,
                None => {
                    seen.insert((plot.clone(), evalid), stratum_cn.clone());
                }
            }

            evals_per_plot
                .entry(plot.clone())
                .or_default()
                .insert(evalid);
            if assigned.insert((plot.clone(), stratum_cn.clone())) {
                plots_by_stratum
                    .entry(stratum_cn.clone())
                    .or_default()
                    .push(plot.clone());
            }
        }

        let multi = evals_per_plot.values().filter(|e| e.len() > 1).count();
        if multi > 0 {
            warn!(
                "{} plots belong to more than one active evaluation and are counted in each",
                multi
            );
        }

        let strata: BTreeMap<String, Stratum> = strata
            .into_iter()
            .filter(|(cn, _)| plots_by_stratum.contains_key(cn))
            .collect();
        for plots in plots_by_stratum.values_mut() {
            plots.sort();
        }

        info!(
            "Stratification: {} plots in {} strata",
            assigned.len(),
            strata.len()
        );
        Ok(Self {
            strata,
            plots_by_stratum,
            assigned,
        })
    }

    pub fn strata(&self) -> impl Iterator<Item = &Stratum> {
        self.strata.values()
    }

    /// Plots assigned to a stratum, sorted
    pub fn plots_in(&self, stratum_cn: &str) -> &[String] {
        self.plots_by_stratum
            .get(stratum_cn)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of sampling units
    pub fn n_plots(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_assigned(&self, plot_cn: &str, stratum_cn: &str) -> bool {
        self.assigned
            .contains(&(plot_cn.to_string(), stratum_cn.to_string()))
    }

    /// Fail unless every (plot, stratum) pair is a known assignment
    pub fn check_linked<'a, I>(&self, units: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (plot, stratum) in units {
            if !self.strata.contains_key(stratum) {
                return Err(EstimationError::stratification(format!(
                    "stratum {} referenced by plot {} does not exist",
                    stratum, plot
                )));
            }
            if !self.is_assigned(plot, stratum) {
                return Err(EstimationError::stratification(format!(
                    "plot {} has no assignment to stratum {} in the active evaluations",
                    plot, stratum
                )));
            }
        }
        Ok(())
    }

    /// `PLT_CN`, `STRATUM_CN` and the stratum adjustment factors for every assigned plot
    pub fn assignment_frame(&self) -> Result<DataFrame> {
        let mut plot_cns = Vec::with_capacity(self.assigned.len());
        let mut stratum_cns = Vec::with_capacity(self.assigned.len());
        let mut subp = Vec::with_capacity(self.assigned.len());
        let mut micr = Vec::with_capacity(self.assigned.len());
        let mut macr = Vec::with_capacity(self.assigned.len());

        for (stratum_cn, plots) in &self.plots_by_stratum {
            let adjustment = self
                .strata
                .get(stratum_cn)
                .map(|s| s.adjustment)
                .unwrap_or_default();
            for plot in plots {
                plot_cns.push(plot.clone());
                stratum_cns.push(stratum_cn.clone());
                subp.push(adjustment.subplot);
                micr.push(adjustment.microplot);
                macr.push(adjustment.macroplot);
            }
        }

        let frame = DataFrame::new(vec![
            Column::new(columns::PLT_CN.into(), plot_cns),
            Column::new(columns::STRATUM_CN.into(), stratum_cns),
            Column::new(columns::ADJ_FACTOR_SUBP.into(), subp),
            Column::new(columns::ADJ_FACTOR_MICR.into(), micr),
            Column::new(columns::ADJ_FACTOR_MACR.into(), macr),
        ])?;
        debug!("Assignment frame has {} rows", frame.height());
        Ok(frame)
    }
}

fn select_strata_columns(strata: LazyFrame) -> Result<LazyFrame> {
    let schema = schema_of(&strata)?;
    let mut exprs = vec![
        col(columns::CN),
        col(columns::ESTN_UNIT_CN),
        col(columns::EXPNS).cast(DataType::Float64),
        col(columns::ADJ_FACTOR_SUBP).cast(DataType::Float64),
        col(columns::ADJ_FACTOR_MICR).cast(DataType::Float64),
        col(columns::ADJ_FACTOR_MACR).cast(DataType::Float64),
    ];
    for optional in [columns::P1POINTCNT, columns::P2POINTCNT, columns::EVALID] {
        if schema.contains(optional) {
            let dtype = if optional == columns::EVALID {
                DataType::Int64
            } else {
                DataType::Float64
            };
            exprs.push(col(optional).cast(dtype));
        }
    }
    Ok(strata.select(exprs))
}

fn read_strata(frame: &DataFrame) -> Result<HashMap<String, Stratum>> {
    let cns = string_column(frame, columns::CN)?;
    let units = string_column(frame, columns::ESTN_UNIT_CN)?;
    let expns = float_column(frame, columns::EXPNS)?;
    let subp = float_column(frame, columns::ADJ_FACTOR_SUBP)?;
    let micr = float_column(frame, columns::ADJ_FACTOR_MICR)?;
    let macr = float_column(frame, columns::ADJ_FACTOR_MACR)?;
    let p1 = optional_float_column(frame, columns::P1POINTCNT)?;
    let p2 = optional_float_column(frame, columns::P2POINTCNT)?;
    let evalids = optional_float_column(frame, columns::EVALID)?;

    let mut strata = HashMap::with_capacity(frame.height());
    for i in 0..frame.height() {
        let Some(cn) = cns[i].clone() else {
            continue;
        };
        let expansion_factor = expns[i].ok_or_else(|| {
            EstimationError::stratification(format!("stratum {} has no expansion factor", cn))
        })?;
        let stratum = Stratum {
            cn: cn.clone(),
            estn_unit_cn: units[i].clone().unwrap_or_default(),
            evalid: evalids[i].unwrap_or_default() as u32,
            expansion_factor,
            adjustment: AdjustmentFactors::new(
                subp[i].unwrap_or(0.0),
                micr[i].unwrap_or(0.0),
                macr[i].unwrap_or(0.0),
            ),
            p1_points: p1[i],
            p2_points: p2[i],
        };
        strata.insert(cn, stratum);
    }
    Ok(strata)
}

//! Generic estimation pipeline.
//!
//! One call runs, in order: evaluation selection, stratification, domain
//! filtering, per-record values, stage 1 and stage 2 aggregation, the ratio
//! estimator, variance and output formatting. Lazy plans are materialised at
//! three points per response: after filtering and value calculation, after
//! stage 1 and after stage 2. Everything downstream works on collected
//! plot-level frames.

use super::aggregation::{aggregate_two_stage, drop_null_contributions, key_exprs};
use super::components::attach_contributions;
use super::frames::{float_column, has_column, join_new_columns, string_column};
use super::measure::{Grain, GrmColumns, GrmKind, Measure};
use super::output::{
    EstimationOutput, GroupEstimate, GroupFailure, OutputLayout, format_output,
};
use super::population::{PopulationTotals, StratumSample};
use super::stratification::StratificationDesign;
use super::values::{
    condition_adjustment_expr, condition_area_expr, grm_attribute_expr, tree_adjustment_expr,
    tree_value_expr,
};
use super::variance::{VarianceEngine, ratio_variance};
use crate::config::{AreaChangeType, EstimatorConfig, GrmAttribute, LandType};
use crate::constants::{PERCENT, columns, derived, tables};
use crate::database::{FiaDatabase, require_columns, schema_of};
use crate::domain::{DomainFilter, NamedFilter, TableRole, condition_domain, tree_domain};
use crate::error::{EstimationError, Result};
use crate::evaluation::{EvaluationId, most_recent, sort_chronologically};
use crate::models::{GroupKey, GroupValue, describe_group};
use colored::*;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run one estimation end to end
pub fn run(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    measure: &Measure,
) -> Result<EstimationOutput> {
    config.validate()?;
    let start = Instant::now();
    info!("Estimating {}", measure.to_string().cyan());

    let evalids = resolve_evaluations(database, config, measure)?;
    let design = StratificationDesign::load(database, &evalids)?;
    let conditions = ConditionFrames::build(database, config, &design)?;

    let response = match measure.grain() {
        Grain::Condition => conditions.area_response(&config.grp_by)?,
        Grain::Tree => tree_response(database, config, measure, &conditions)?,
        Grain::TreePeriod => tree_period_response(database, config, measure, &conditions)?,
        Grain::SubplotChange => area_change_response(database, config, measure, &conditions)?,
    };
    let denominator = conditions.denominator(measure, &config.grp_by)?;

    let y = PlotResponses::from_frame(&response, &design)?;
    let x = PlotResponses::from_frame(&denominator, &design)?;

    let engine = VarianceEngine::new(config.workers, config.finite_population_correction)?;
    let (rows, group_failures) =
        estimate_groups(measure, &design, &y, &x, &engine, &config.grp_by)?;

    let layout = OutputLayout {
        grp_by: config.grp_by.clone(),
        estimate_column: measure.estimate_column(),
        total_column: measure.total_column(),
        totals: config.totals,
        variance: config.variance,
    };
    let frame = format_output(&layout, &rows)?;

    info!(
        "Estimated {} for {} groups from {} plots in {:.2?}",
        measure,
        frame.height(),
        design.n_plots(),
        start.elapsed()
    );
    if !group_failures.is_empty() {
        warn!(
            "{} groups had insufficient data",
            group_failures.len().to_string().yellow()
        );
    }

    Ok(EstimationOutput {
        frame,
        group_failures,
        n_plots_total: design.n_plots(),
    })
}

/// Evaluations the estimate is computed over.
///
/// Configured ids must all be of a type the measure accepts. Without
/// configured ids, every accepted evaluation in the assignment table is used,
/// or only the latest per state when `most_recent` is set.
pub fn resolve_evaluations(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    measure: &Measure,
) -> Result<Vec<EvaluationId>> {
    let accepted = measure.accepted_eval_types();

    if !config.evalids.is_empty() {
        let mut ids = config
            .evalids
            .iter()
            .map(|raw| EvaluationId::new(*raw))
            .collect::<Result<Vec<_>>>()?;
        if let Some(bad) = ids.iter().find(|id| !accepted.contains(&id.eval_type())) {
            return Err(EstimationError::configuration(format!(
                "EVALID {} has evaluation type {:?}, which cannot support {} (accepted: {:?})",
                bad,
                bad.eval_type(),
                measure,
                accepted
            )));
        }
        sort_chronologically(&mut ids);
        ids.dedup();
        debug!("Using configured evaluations {:?}", ids);
        return Ok(ids);
    }

    let assignments = database.table(tables::POP_PLOT_STRATUM_ASSGN)?;
    require_columns(
        tables::POP_PLOT_STRATUM_ASSGN,
        &assignments,
        &[columns::EVALID],
    )?;
    let frame = assignments
        .select([col(columns::EVALID).cast(DataType::Int64)])
        .collect()?;
    let distinct: BTreeSet<i64> = frame
        .column(columns::EVALID)?
        .i64()?
        .into_iter()
        .flatten()
        .collect();
    let available: Vec<EvaluationId> = distinct
        .into_iter()
        .filter_map(|raw| u32::try_from(raw).ok())
        .filter_map(|raw| EvaluationId::new(raw).ok())
        .collect();

    let mut selected = if config.most_recent {
        most_recent(&available, accepted)
    } else {
        available
            .into_iter()
            .filter(|id| accepted.contains(&id.eval_type()))
            .collect()
    };
    if selected.is_empty() {
        return Err(EstimationError::configuration(format!(
            "no evaluation of type {:?} found for {}",
            accepted, measure
        )));
    }

    sort_chronologically(&mut selected);
    info!(
        "Selected evaluations: {}",
        selected
            .iter()
            .map(|id| format!("{} ({})", id, id.year()))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(selected)
}

/// Plot-level response frame with its grouping columns
struct PlotResponseFrame {
    frame: DataFrame,
    grp_by: Vec<String>,
    value_column: &'static str,
}

/// Condition frames shared by every measure
struct ConditionFrames {
    /// Assigned conditions with plot columns, adjustment and area contribution
    assigned: LazyFrame,
    /// Conditions in the land type
    land: LazyFrame,
    /// Land-type conditions that also satisfy the area domain
    domain: LazyFrame,
    area_filter: DomainFilter,
}

impl ConditionFrames {
    fn build(
        database: &FiaDatabase,
        config: &EstimatorConfig,
        design: &StratificationDesign,
    ) -> Result<Self> {
        let cond = database.table(tables::COND)?;
        require_columns(
            tables::COND,
            &cond,
            &[
                columns::PLT_CN,
                columns::CONDID,
                columns::COND_STATUS_CD,
                columns::CONDPROP_UNADJ,
            ],
        )?;
        let plot = database.table(tables::PLOT)?;
        require_columns(tables::PLOT, &plot, &[columns::CN])?;

        let plot = plot.with_column(col(columns::CN).alias(columns::PLT_CN));
        let with_plot = join_new_columns(
            cond,
            plot,
            &[columns::PLT_CN],
            &[columns::PLT_CN],
            JoinType::Left,
        )?;
        let assigned = join_new_columns(
            with_plot,
            design.assignment_frame()?.lazy(),
            &[columns::PLT_CN],
            &[columns::PLT_CN],
            JoinType::Inner,
        )?;

        let has_basis = has_column(&assigned, columns::PROP_BASIS)?;
        let assigned = assigned
            .with_column(condition_adjustment_expr(has_basis).alias(derived::ADJ))
            .with_column(condition_area_expr().alias(derived::COND_AREA));

        let land_filter = condition_domain(config.land_type, None)?;
        require_columns(tables::COND, &assigned, &land_filter.expression().columns())?;
        let land = land_filter.apply(assigned.clone())?;

        let area_filter = condition_domain(LandType::All, config.area_domain.as_deref())?;
        let domain = area_filter.apply(land.clone())?;

        Ok(Self {
            assigned,
            land,
            domain,
            area_filter,
        })
    }

    fn area_response(&self, grp_by: &[String]) -> Result<PlotResponseFrame> {
        require_group_columns(tables::COND, &self.domain, grp_by)?;
        let records = self
            .domain
            .clone()
            .with_column(col(derived::COND_AREA).alias(derived::VALUE));
        collect_response(records, grp_by, 1.0, derived::PLOT_Y, "area")
    }

    /// Land area per plot; grouped by the condition-level grouping columns
    /// unless the measure is a share of the whole land type
    fn denominator(&self, measure: &Measure, grp_by: &[String]) -> Result<PlotResponseFrame> {
        let (source, groups) = if measure.uses_land_denominator() {
            (self.land.clone(), Vec::new())
        } else {
            let schema = schema_of(&self.domain)?;
            let groups: Vec<String> = grp_by
                .iter()
                .filter(|g| schema.contains(g.as_str()))
                .cloned()
                .collect();
            (self.domain.clone(), groups)
        };
        let records = source.with_column(col(derived::COND_AREA).alias(derived::VALUE));
        collect_response(records, &groups, 1.0, derived::PLOT_X, "denominator")
    }
}

fn require_group_columns(table: &str, lazy: &LazyFrame, grp_by: &[String]) -> Result<()> {
    let required: Vec<&str> = grp_by.iter().map(String::as_str).collect();
    require_columns(table, lazy, &required)
}

/// Collect values at record grain, drop nulls and run both aggregation stages
fn collect_response(
    records: LazyFrame,
    grp_by: &[String],
    divisor: f64,
    output: &'static str,
    stage: &str,
) -> Result<PlotResponseFrame> {
    let records = records
        .select(record_selection(grp_by, &[derived::VALUE]))
        .collect()?;
    debug!("{}: collected {} records", stage, records.height());
    let records = drop_null_contributions(records, stage)?;
    let frame = aggregate_two_stage(records, grp_by, divisor, output)?;
    Ok(PlotResponseFrame {
        frame,
        grp_by: grp_by.to_vec(),
        value_column: output,
    })
}

fn record_selection(grp_by: &[String], extra: &[&str]) -> Vec<Expr> {
    let mut selection = key_exprs(
        &[columns::PLT_CN, columns::STRATUM_CN, columns::CONDID],
        grp_by,
    );
    selection.extend(extra.iter().map(|c| col(*c)));
    selection
}

fn tree_response(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    measure: &Measure,
    conditions: &ConditionFrames,
) -> Result<PlotResponseFrame> {
    let tree = database.table(tables::TREE)?;
    let mut required = vec![
        columns::CN,
        columns::PLT_CN,
        columns::CONDID,
        columns::TPA_UNADJ,
        columns::DIA,
    ];
    required.extend(measure.tree_attribute_columns());
    require_columns(tables::TREE, &tree, &required)?;

    let named = tree_domain(config.tree_type, None)?;
    require_columns(tables::TREE, &tree, &named.expression().columns())?;
    let tree_filter = named.and_parsed(config.tree_domain.as_deref())?;
    let trees = tree_filter.apply(tree)?;

    let records = join_new_columns(
        trees,
        conditions.domain.clone(),
        &[columns::PLT_CN, columns::CONDID],
        &[columns::PLT_CN, columns::CONDID],
        JoinType::Inner,
    )?;
    let has_macro = has_column(&records, columns::MACRO_BREAKPOINT_DIA)?;
    let records = records
        .with_column(tree_adjustment_expr(has_macro).alias(derived::ADJ))
        .with_column(tree_value_expr(measure)?.alias(derived::VALUE));

    require_group_columns(tables::TREE, &records, &config.grp_by)?;
    collect_response(records, &config.grp_by, 1.0, derived::PLOT_Y, "tree")
}

fn tree_period_response(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    measure: &Measure,
    conditions: &ConditionFrames,
) -> Result<PlotResponseFrame> {
    let (kind, tree_class, attribute, annualize) = measure.grm().ok_or_else(|| {
        EstimationError::configuration(format!("{} is not a tree-period measure", measure))
    })?;
    let names = GrmColumns::new(kind, tree_class, config.land_type);
    debug!(
        "GRM columns: {}, {}, {}",
        names.component, names.tpa, names.subplot_type
    );

    let component = database.table(tables::TREE_GRM_COMPONENT)?;
    require_columns(
        tables::TREE_GRM_COMPONENT,
        &component,
        &[
            columns::TRE_CN,
            columns::PLT_CN,
            names.component.as_str(),
            names.tpa.as_str(),
            names.subplot_type.as_str(),
        ],
    )?;
    let component = component.select([
        col(columns::TRE_CN),
        col(columns::PLT_CN),
        col(names.component.as_str())
            .cast(DataType::String)
            .alias(derived::COMPONENT),
        col(names.tpa.as_str())
            .cast(DataType::Float64)
            .alias(derived::GRM_TPA),
        col(names.subplot_type.as_str())
            .cast(DataType::Int64)
            .alias(derived::GRM_SUBPTYP),
    ]);

    // Tree class comes from the GRM column variant; only the user domain applies
    let tree = database.table(tables::TREE)?;
    let mut required = vec![columns::CN, columns::CONDID];
    if kind == GrmKind::Growth {
        required.extend(measure.tree_attribute_columns());
    }
    require_columns(tables::TREE, &tree, &required)?;
    let tree = DomainFilter::accept_all(TableRole::Tree)
        .and_parsed(config.tree_domain.as_deref())?
        .apply(tree)?;
    let tree = if kind == GrmKind::Growth {
        tree.with_column(grm_attribute_expr(attribute).alias(derived::END_VALUE))
    } else {
        tree
    };

    let mut records = join_new_columns(
        component,
        tree,
        &[columns::TRE_CN],
        &[columns::CN],
        JoinType::Inner,
    )?;

    let mut snapshots = vec![derived::END_VALUE];
    if attribute == GrmAttribute::Count {
        records = records.with_columns([
            lit(1.0).alias(derived::BEGIN_VALUE),
            lit(1.0).alias(derived::MIDPT_VALUE),
        ]);
        snapshots.extend([derived::BEGIN_VALUE, derived::MIDPT_VALUE]);
        if kind != GrmKind::Growth {
            snapshots.retain(|c| *c != derived::END_VALUE);
        }
    } else {
        let (table, alias) = match kind {
            GrmKind::Growth => (tables::TREE_GRM_BEGIN, derived::BEGIN_VALUE),
            GrmKind::Mortality | GrmKind::Removals => {
                (tables::TREE_GRM_MIDPT, derived::MIDPT_VALUE)
            }
        };
        let snapshot = database.table(table)?;
        let mut required = vec![columns::TRE_CN];
        required.extend(measure.tree_attribute_columns());
        require_columns(table, &snapshot, &required)?;
        let snapshot = snapshot.select([
            col(columns::TRE_CN),
            grm_attribute_expr(attribute).alias(alias),
        ]);
        records = records.join(
            snapshot,
            [col(columns::TRE_CN)],
            [col(columns::TRE_CN)],
            JoinArgs::new(JoinType::Left),
        );
        if kind == GrmKind::Growth {
            snapshots.push(derived::BEGIN_VALUE);
        } else {
            snapshots = vec![derived::MIDPT_VALUE];
        }
    }

    let records = join_new_columns(
        records,
        conditions.domain.clone(),
        &[columns::PLT_CN, columns::CONDID],
        &[columns::PLT_CN, columns::CONDID],
        JoinType::Inner,
    )?;
    require_columns(tables::PLOT, &records, &[columns::REMPER])?;
    require_group_columns(tables::TREE, &records, &config.grp_by)?;

    let mut extra = vec![
        derived::COMPONENT,
        derived::GRM_TPA,
        derived::GRM_SUBPTYP,
        columns::REMPER,
        columns::ADJ_FACTOR_SUBP,
        columns::ADJ_FACTOR_MICR,
        columns::ADJ_FACTOR_MACR,
    ];
    extra.extend(snapshots);
    let mut frame = records
        .select(record_selection(&config.grp_by, &extra))
        .collect()?;
    debug!("tree-period: collected {} records", frame.height());

    let summary = attach_contributions(&mut frame, kind, annualize)?;
    debug!(
        "tree-period: {} kept, {} outside {:?}, {} with null inputs",
        summary.kept, summary.excluded, kind, summary.missing
    );
    let frame = frame
        .lazy()
        .filter(col(derived::VALUE).is_not_null())
        .collect()?;

    let frame = aggregate_two_stage(frame, &config.grp_by, 1.0, derived::PLOT_Y)?;
    Ok(PlotResponseFrame {
        frame,
        grp_by: config.grp_by.clone(),
        value_column: derived::PLOT_Y,
    })
}

fn area_change_response(
    database: &FiaDatabase,
    config: &EstimatorConfig,
    measure: &Measure,
    conditions: &ConditionFrames,
) -> Result<PlotResponseFrame> {
    let Measure::AreaChange { change, annualize } = *measure else {
        return Err(EstimationError::configuration(format!(
            "{} is not an area-change measure",
            measure
        )));
    };

    let matrix = database.table(tables::SUBP_COND_CHNG_MTRX)?;
    require_columns(
        tables::SUBP_COND_CHNG_MTRX,
        &matrix,
        &[
            columns::PLT_CN,
            columns::PREV_PLT_CN,
            columns::CONDID,
            columns::PREVCOND,
            columns::SUBPTYP,
            columns::SUBPTYP_PROP_CHNG,
        ],
    )?;
    let matrix = matrix
        .filter(col(columns::SUBPTYP).cast(DataType::Int64).eq(lit(1i64)))
        .select([
            col(columns::PLT_CN),
            col(columns::PREV_PLT_CN),
            col(columns::CONDID),
            col(columns::PREVCOND),
            col(columns::SUBPTYP_PROP_CHNG).cast(DataType::Float64),
        ]);

    // Change is tracked for forest land when no narrower land type is set
    let class_filter = match config.land_type {
        LandType::All => NamedFilter::ForestLand.domain()?,
        other => condition_domain(other, None)?,
    };
    let class_columns = class_filter.expression().columns();
    let in_class = class_filter
        .expression()
        .to_expr()?
        .unwrap_or_else(|| lit(true))
        .fill_null(lit(false));

    require_columns(tables::COND, &conditions.assigned, &class_columns)?;
    let current = conditions
        .assigned
        .clone()
        .with_column(in_class.clone().alias(derived::CURR_STATUS));
    let current = conditions.area_filter.apply(current)?;

    let cond = database.table(tables::COND)?;
    let previous = cond.select([
        col(columns::PLT_CN).alias(columns::PREV_PLT_CN),
        col(columns::CONDID).alias(columns::PREVCOND),
        in_class.alias(derived::PREV_STATUS),
    ]);

    let records = join_new_columns(
        matrix,
        current,
        &[columns::PLT_CN, columns::CONDID],
        &[columns::PLT_CN, columns::CONDID],
        JoinType::Inner,
    )?
    .join(
        previous,
        [col(columns::PREV_PLT_CN), col(columns::PREVCOND)],
        [col(columns::PREV_PLT_CN), col(columns::PREVCOND)],
        JoinArgs::new(JoinType::Left),
    );

    let current_flag = col(derived::CURR_STATUS).cast(DataType::Float64);
    let previous_flag = col(derived::PREV_STATUS).cast(DataType::Float64);
    let indicator = match change {
        AreaChangeType::GrossGain => current_flag * (lit(1.0) - previous_flag),
        AreaChangeType::GrossLoss => previous_flag * (lit(1.0) - current_flag),
        AreaChangeType::Net => current_flag - previous_flag,
    };
    let mut value =
        col(columns::SUBPTYP_PROP_CHNG) * col(columns::ADJ_FACTOR_SUBP) * indicator;
    if annualize {
        require_columns(tables::PLOT, &records, &[columns::REMPER])?;
        let remper = col(columns::REMPER).cast(DataType::Float64);
        value = when(remper.clone().gt(lit(0.0)))
            .then(value / remper)
            .otherwise(lit(NULL).cast(DataType::Float64));
    }
    let records = records.with_column(value.alias(derived::VALUE));

    require_group_columns(tables::COND, &records, &config.grp_by)?;
    collect_response(
        records,
        &config.grp_by,
        measure.plot_divisor(),
        derived::PLOT_Y,
        "area change",
    )
}

/// Plot-level responses keyed by group, then stratum, then plot
#[derive(Debug, Default)]
struct PlotResponses {
    columns: Vec<String>,
    values: BTreeMap<GroupKey, HashMap<String, HashMap<String, f64>>>,
}

impl PlotResponses {
    fn from_frame(response: &PlotResponseFrame, design: &StratificationDesign) -> Result<Self> {
        let frame = &response.frame;
        let plots = string_column(frame, columns::PLT_CN)?;
        let strata = string_column(frame, columns::STRATUM_CN)?;
        let values = float_column(frame, response.value_column)?;
        let groups = response
            .grp_by
            .iter()
            .map(|name| frame.column(name))
            .collect::<PolarsResult<Vec<_>>>()?;

        let units = plots
            .iter()
            .zip(&strata)
            .filter_map(|(p, s)| Some((p.as_deref()?, s.as_deref()?)));
        design.check_linked(units)?;

        let mut responses = Self {
            columns: response.grp_by.clone(),
            values: BTreeMap::new(),
        };
        for i in 0..frame.height() {
            let (Some(plot), Some(stratum)) = (&plots[i], &strata[i]) else {
                return Err(EstimationError::stratification(format!(
                    "plot-level row {} has no plot or stratum",
                    i
                )));
            };
            let key = groups
                .iter()
                .map(|column| column.get(i).map(|v| GroupValue::from_any_value(&v)))
                .collect::<PolarsResult<GroupKey>>()?;
            *responses
                .values
                .entry(key)
                .or_default()
                .entry(stratum.clone())
                .or_default()
                .entry(plot.clone())
                .or_insert(0.0) += values[i].unwrap_or(0.0);
        }
        Ok(responses)
    }

    fn group(&self, key: &GroupKey) -> Option<&HashMap<String, HashMap<String, f64>>> {
        self.values.get(key)
    }
}

/// Estimate every output group
fn estimate_groups(
    measure: &Measure,
    design: &StratificationDesign,
    y: &PlotResponses,
    x: &PlotResponses,
    engine: &VarianceEngine,
    grp_by: &[String],
) -> Result<(BTreeMap<GroupKey, GroupEstimate>, Vec<GroupFailure>)> {
    let grouped = !grp_by.is_empty();
    let keys: Vec<GroupKey> = if grouped {
        y.values.keys().cloned().collect()
    } else {
        vec![Vec::new()]
    };

    let x_positions = x
        .columns
        .iter()
        .map(|c| grp_by.iter().position(|g| g == c))
        .collect::<Option<Vec<usize>>>()
        .ok_or_else(|| {
            EstimationError::configuration("denominator grouped by a column outside grp_by")
        })?;

    let scale = if measure.is_percentage() { PERCENT } else { 1.0 };
    let empty = HashMap::new();
    let mut rows = BTreeMap::new();
    let mut failures = Vec::new();

    for key in keys {
        let y_group = y.group(&key).unwrap_or(&empty);
        let x_key: GroupKey = x_positions.iter().map(|&i| key[i].clone()).collect();
        let x_group = x.group(&x_key).unwrap_or(&empty);

        let samples: Vec<StratumSample> = design
            .strata()
            .map(|stratum| {
                let plots = design.plots_in(&stratum.cn);
                let lookup = |group: &HashMap<String, HashMap<String, f64>>, plot: &String| {
                    group
                        .get(&stratum.cn)
                        .and_then(|by_plot| by_plot.get(plot))
                        .copied()
                        .unwrap_or(0.0)
                };
                let y_values = plots.iter().map(|p| lookup(y_group, p)).collect();
                let x_values = plots.iter().map(|p| lookup(x_group, p)).collect();
                StratumSample::new(stratum.clone(), y_values, x_values)
            })
            .collect();

        let totals = PopulationTotals::from_samples(&samples);
        let pooled = engine.pooled(&samples);
        let n_plots = y_group.values().map(HashMap::len).sum();

        let ratio = totals.ratio().and_then(|r| {
            let variance = ratio_variance(
                totals.y,
                totals.x,
                pooled.var_y,
                pooled.var_x,
                pooled.cov_yx,
            )?;
            Ok((r, variance))
        });

        let (estimate, estimate_variance) = match ratio {
            Ok((r, v)) => (Some(r * scale), Some(v * scale * scale)),
            Err(err) if grouped && err.is_insufficient_data() => {
                let group = describe_group(grp_by, &key);
                warn!("Group {}: {}", group, err);
                failures.push(GroupFailure {
                    key: key.clone(),
                    group,
                    message: err.to_string(),
                });
                (None, None)
            }
            Err(err) => return Err(err),
        };

        rows.insert(
            key,
            GroupEstimate {
                estimate,
                estimate_variance,
                total: totals.y,
                total_variance: pooled.var_y,
                n_plots,
            },
        );
    }

    Ok((rows, failures))
}

//! Two-stage aggregation tests

use crate::constants::derived;
use crate::estimation::aggregation::*;
use approx::assert_relative_eq;
use polars::prelude::*;

fn records() -> DataFrame {
    df!(
        "PLT_CN" => ["A", "A", "A", "B", "B", "C"],
        "STRATUM_CN" => ["S1", "S1", "S1", "S1", "S1", "S2"],
        "CONDID" => [1i64, 1, 2, 1, 1, 1],
        "SPCD" => [131i64, 110, 131, 131, 131, 110],
        "OWNGRPCD" => [10i64, 10, 40, 40, 40, 10],
        derived::VALUE => [1.5, 2.0, 4.0, 0.25, 0.75, 8.0],
    )
    .unwrap()
}

#[test]
fn test_total_preserved_for_every_grouping() {
    let expected = column_total(&records(), derived::VALUE).unwrap();
    let groupings: [Vec<String>; 3] = [
        vec![],
        vec!["SPCD".to_string()],
        vec!["SPCD".to_string(), "OWNGRPCD".to_string()],
    ];

    for grp_by in groupings {
        let plots = aggregate_two_stage(records(), &grp_by, 1.0, derived::PLOT_Y).unwrap();
        let total = column_total(&plots, derived::PLOT_Y).unwrap();
        assert_relative_eq!(total, expected, epsilon = 1e-12);
    }
}

#[test]
fn test_one_row_per_plot_and_group() {
    let plots = aggregate_two_stage(records(), &["SPCD".to_string()], 1.0, derived::PLOT_Y)
        .unwrap()
        .sort(["PLT_CN", "SPCD"], SortMultipleOptions::default())
        .unwrap();

    assert_eq!(plots.height(), 4);
    let values: Vec<f64> = plots
        .column(derived::PLOT_Y)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    // A/110, A/131 (two conditions), B/131, C/110
    assert_eq!(values, vec![2.0, 5.5, 1.0, 8.0]);
}

#[test]
fn test_divisor_applied_at_plot_stage() {
    let plots = aggregate_two_stage(records(), &[], 4.0, derived::PLOT_Y).unwrap();
    let total = column_total(&plots, derived::PLOT_Y).unwrap();
    assert_relative_eq!(total, 16.5 / 4.0, epsilon = 1e-12);
}

#[test]
fn test_grouping_by_a_key_column() {
    let plots =
        aggregate_two_stage(records(), &["CONDID".to_string()], 1.0, derived::PLOT_Y).unwrap();
    assert_eq!(plots.height(), 4);
    assert!(plots.column("CONDID").is_ok());
}

#[test]
fn test_null_contributions_dropped() {
    let frame = df!(
        "PLT_CN" => ["A", "A"],
        derived::VALUE => [Some(1.0), None],
    )
    .unwrap();
    let kept = drop_null_contributions(frame, "test").unwrap();
    assert_eq!(kept.height(), 1);
}

/// `plots` x `conds` x `trees` records with distinct, uneven values
fn nested_records(plots: usize, conds: usize, trees: usize) -> DataFrame {
    let mut plt_cn = Vec::new();
    let mut condid = Vec::new();
    let mut value = Vec::new();
    for p in 0..plots {
        for c in 0..conds {
            for t in 0..trees {
                plt_cn.push(format!("P{}", p));
                condid.push(c as i64 + 1);
                value.push(0.5 + (p * 31 + c * 7 + t) as f64 * 0.25);
            }
        }
    }
    let stratum_cn = vec!["S1"; value.len()];
    df!(
        "PLT_CN" => plt_cn,
        "STRATUM_CN" => stratum_cn,
        "CONDID" => condid,
        derived::VALUE => value,
    )
    .unwrap()
}

#[test]
fn test_condition_stage_preserves_totals_across_shapes() {
    for (plots, conds, trees) in [(1, 1, 1), (3, 2, 4), (5, 3, 2), (2, 4, 7)] {
        let records = nested_records(plots, conds, trees);
        let expected = column_total(&records, derived::VALUE).unwrap();

        let conditions = aggregate_to_conditions(records.clone().lazy(), &[])
            .collect()
            .unwrap();
        assert_eq!(conditions.height(), plots * conds);
        assert_relative_eq!(
            column_total(&conditions, derived::VALUE).unwrap(),
            expected,
            epsilon = 1e-9
        );

        let by_plot = aggregate_two_stage(records, &[], 1.0, derived::PLOT_Y).unwrap();
        assert_eq!(by_plot.height(), plots);
        assert_relative_eq!(
            column_total(&by_plot, derived::PLOT_Y).unwrap(),
            expected,
            epsilon = 1e-9
        );
    }
}

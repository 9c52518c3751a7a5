//! Result table formatting tests

use super::cell;
use crate::estimation::output::*;
use crate::models::{GroupKey, GroupValue};
use approx::assert_relative_eq;
use std::collections::BTreeMap;

fn layout(grp_by: &[&str], totals: bool, variance: bool) -> OutputLayout {
    OutputLayout {
        grp_by: grp_by.iter().map(|s| s.to_string()).collect(),
        estimate_column: "VOLCFNET_ACRE".to_string(),
        total_column: "VOLCFNET_TOTAL".to_string(),
        totals,
        variance,
    }
}

fn estimate(value: f64, variance: f64) -> GroupEstimate {
    GroupEstimate {
        estimate: Some(value),
        estimate_variance: Some(variance),
        total: value * 1000.0,
        total_variance: variance * 1e6,
        n_plots: 3,
    }
}

#[test]
fn test_column_order() {
    assert_eq!(
        layout(&["SPCD"], true, false).column_names(),
        vec![
            "SPCD",
            "VOLCFNET_ACRE",
            "VOLCFNET_ACRE_SE",
            "VOLCFNET_ACRE_SE_PERCENT",
            "VOLCFNET_TOTAL",
            "VOLCFNET_TOTAL_SE",
            "N_PLOTS",
        ]
    );
    assert_eq!(
        layout(&[], false, true).column_names(),
        vec![
            "VOLCFNET_ACRE",
            "VOLCFNET_ACRE_VARIANCE",
            "VOLCFNET_ACRE_SE_PERCENT",
            "N_PLOTS",
        ]
    );
}

#[test]
fn test_one_row_per_group_in_key_order() {
    let mut rows: BTreeMap<GroupKey, GroupEstimate> = BTreeMap::new();
    rows.insert(vec![GroupValue::Int(131)], estimate(10.0, 4.0));
    rows.insert(vec![GroupValue::Int(110)], estimate(20.0, 9.0));
    // Same key again replaces rather than duplicating
    rows.insert(vec![GroupValue::Float(110.0)], estimate(30.0, 9.0));

    let layout = layout(&["SPCD"], true, false);
    let frame = format_output(&layout, &rows).unwrap();

    assert_eq!(frame.height(), 2);
    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, layout.column_names());

    let spcd: Vec<Option<i64>> = frame.column("SPCD").unwrap().i64().unwrap().into_iter().collect();
    assert_eq!(spcd, vec![Some(110), Some(131)]);
    assert_eq!(cell(&frame, "VOLCFNET_ACRE", 0), Some(30.0));
    assert_eq!(cell(&frame, "VOLCFNET_ACRE_SE", 0), Some(3.0));
    assert_relative_eq!(cell(&frame, "VOLCFNET_ACRE_SE_PERCENT", 0).unwrap(), 10.0, epsilon = 1e-12);
    assert_eq!(cell(&frame, "VOLCFNET_TOTAL_SE", 1), Some(2000.0));
}

#[test]
fn test_failed_group_has_null_estimate() {
    let mut rows = BTreeMap::new();
    rows.insert(
        vec![GroupValue::Text("A".into())],
        GroupEstimate {
            estimate: None,
            estimate_variance: None,
            total: 5.0,
            total_variance: 1.0,
            n_plots: 1,
        },
    );
    let frame = format_output(&layout(&["GROUP"], true, false), &rows).unwrap();
    assert_eq!(cell(&frame, "VOLCFNET_ACRE", 0), None);
    assert_eq!(cell(&frame, "VOLCFNET_ACRE_SE", 0), None);
    assert_eq!(cell(&frame, "VOLCFNET_TOTAL", 0), Some(5.0));
}

#[test]
fn test_convert_uncertainty_round_trip() {
    let mut rows = BTreeMap::new();
    rows.insert(Vec::new(), estimate(10.0, 4.0));
    let se_frame = format_output(&layout(&[], true, false), &rows).unwrap();

    let variance_frame = convert_uncertainty(&se_frame, true).unwrap();
    assert!(variance_frame.column("VOLCFNET_ACRE_SE").is_err());
    assert_eq!(cell(&variance_frame, "VOLCFNET_ACRE_VARIANCE", 0), Some(4.0));
    assert_eq!(cell(&variance_frame, "VOLCFNET_TOTAL_VARIANCE", 0), Some(4e6));
    // CV column keeps its name and value
    assert_eq!(
        cell(&variance_frame, "VOLCFNET_ACRE_SE_PERCENT", 0),
        cell(&se_frame, "VOLCFNET_ACRE_SE_PERCENT", 0)
    );

    let back = convert_uncertainty(&variance_frame, false).unwrap();
    assert_eq!(cell(&back, "VOLCFNET_ACRE_SE", 0), Some(2.0));
}

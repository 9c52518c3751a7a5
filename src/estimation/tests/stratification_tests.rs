//! Plot-to-stratum linkage tests

use super::*;
use crate::error::EstimationError;
use crate::estimation::stratification::StratificationDesign;
use crate::evaluation::EvaluationId;

fn strata() -> DataFrame {
    df!(
        "CN" => ["S1", "S2"],
        "ESTN_UNIT_CN" => ["U1", "U1"],
        "EVALID" => [132301i64, 132301],
        "EXPNS" => [1000.0, 2000.0],
        "ADJ_FACTOR_SUBP" => [1.0, 1.1],
        "ADJ_FACTOR_MICR" => [1.0, 1.2],
        "ADJ_FACTOR_MACR" => [1.0, 1.3],
        "P1POINTCNT" => [100.0, 50.0],
    )
    .unwrap()
}

fn stratification_error(err: EstimationError) -> String {
    match err {
        EstimationError::Stratification { message } => message,
        other => panic!("Expected Stratification error, got {other}"),
    }
}

#[test]
fn test_design_from_frames() {
    let assignments = df!(
        "PLT_CN" => ["A", "B", "C"],
        "STRATUM_CN" => ["S1", "S1", "S2"],
        "EVALID" => [132301i64, 132301, 132301],
    )
    .unwrap();
    let design = StratificationDesign::from_frames(&assignments, &strata()).unwrap();

    assert_eq!(design.n_plots(), 3);
    assert_eq!(design.plots_in("S1"), &["A".to_string(), "B".to_string()]);
    assert_eq!(design.plots_in("S2"), &["C".to_string()]);
    assert!(design.plots_in("S9").is_empty());
    assert!(design.is_assigned("C", "S2"));
    assert!(!design.is_assigned("C", "S1"));

    let s2 = design.strata().find(|s| s.cn == "S2").unwrap();
    assert_eq!(s2.expansion_factor, 2000.0);
    assert_eq!(s2.adjustment.microplot, 1.2);
    assert_eq!(s2.p1_points, Some(50.0));

    let frame = design.assignment_frame().unwrap();
    assert_eq!(frame.height(), 3);
    assert_eq!(frame.width(), 5);
}

#[test]
fn test_missing_stratum_is_an_error() {
    let assignments = df!(
        "PLT_CN" => ["A"],
        "STRATUM_CN" => ["S9"],
        "EVALID" => [132301i64],
    )
    .unwrap();
    let err = StratificationDesign::from_frames(&assignments, &strata()).unwrap_err();
    assert!(stratification_error(err).contains("S9"));
}

#[test]
fn test_plot_in_two_strata_of_one_evaluation() {
    let assignments = df!(
        "PLT_CN" => ["A", "A"],
        "STRATUM_CN" => ["S1", "S2"],
        "EVALID" => [132301i64, 132301],
    )
    .unwrap();
    let err = StratificationDesign::from_frames(&assignments, &strata()).unwrap_err();
    assert!(stratification_error(err).contains("plot A"));
}

#[test]
fn test_duplicate_assignment_rows_collapse() {
    let assignments = df!(
        "PLT_CN" => ["A", "A"],
        "STRATUM_CN" => ["S1", "S1"],
        "EVALID" => [132301i64, 132301],
    )
    .unwrap();
    let design = StratificationDesign::from_frames(&assignments, &strata()).unwrap();
    assert_eq!(design.n_plots(), 1);
}

#[test]
fn test_unlinked_response_rows_rejected() {
    let assignments = df!(
        "PLT_CN" => ["A"],
        "STRATUM_CN" => ["S1"],
        "EVALID" => [132301i64],
    )
    .unwrap();
    let design = StratificationDesign::from_frames(&assignments, &strata()).unwrap();

    assert!(design.check_linked([("A", "S1")]).is_ok());
    assert!(design.check_linked([("Z", "S1")]).is_err());
    assert!(design.check_linked([("A", "S7")]).is_err());
}

#[test]
fn test_load_requires_assignments_for_each_evaluation() {
    let db = test_database();
    let missing = EvaluationId::new(132201).unwrap();
    let err = StratificationDesign::load(&db, &[missing]).unwrap_err();
    assert!(stratification_error(err).contains("132201"));

    let volume = EvaluationId::new(VOLUME_EVALID).unwrap();
    let design = StratificationDesign::load(&db, &[volume]).unwrap();
    assert_eq!(design.n_plots(), 2);
    assert_eq!(design.strata().count(), 1);
}

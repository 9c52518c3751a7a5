//! GRM component classification tests

use crate::constants::{columns, derived};
use crate::estimation::components::*;
use crate::estimation::measure::GrmKind;
use crate::models::{AdjustmentFactors, SubplotType};
use approx::assert_relative_eq;
use polars::prelude::*;

fn record(label: &str) -> GrmRecord {
    GrmRecord {
        component: GrmComponent::parse(label),
        subplot_type: SubplotType::Subplot,
        tpa: Some(6.0),
        begin: Some(20.0),
        end: Some(30.0),
        midpoint: Some(25.0),
        remper: Some(5.0),
    }
}

#[test]
fn test_parse_numbered_components() {
    let mortality: GrmComponent = "MORTALITY2".parse().unwrap();
    assert_eq!(mortality.family, ComponentFamily::Mortality);
    assert_eq!(mortality.variant, Some(2));
    assert_eq!(mortality.to_string(), "MORTALITY2");

    let cut: GrmComponent = " cut1 ".parse().unwrap();
    assert_eq!(cut, GrmComponent::new(ComponentFamily::Cut, Some(1)));

    let survivor: GrmComponent = "SURVIVOR".parse().unwrap();
    assert_eq!(survivor.variant, None);
}

#[test]
fn test_parse_rejects_unknown_labels() {
    assert!("SURVIVOR1".parse::<GrmComponent>().is_err());
    assert!("NOT USED".parse::<GrmComponent>().is_err());
    assert!("".parse::<GrmComponent>().is_err());
    assert_eq!(GrmComponent::parse("NOT USED"), GrmComponent::unclassified());
}

#[test]
fn test_component_roles() {
    let survivor = GrmComponent::parse("SURVIVOR");
    let ingrowth = GrmComponent::parse("INGROWTH");
    let reversion = GrmComponent::parse("REVERSION1");
    let mortality = GrmComponent::parse("MORTALITY1");
    let cut = GrmComponent::parse("CUT2");
    let diversion = GrmComponent::parse("DIVERSION1");

    for growth in [survivor, ingrowth, reversion] {
        assert!(growth.contributes_to(GrmKind::Growth));
        assert!(!growth.contributes_to(GrmKind::Mortality));
    }
    assert!(mortality.contributes_to(GrmKind::Mortality));
    assert!(!mortality.contributes_to(GrmKind::Removals));
    assert!(cut.contributes_to(GrmKind::Removals));
    assert!(diversion.contributes_to(GrmKind::Removals));
    assert!(!GrmComponent::unclassified().contributes_to(GrmKind::Growth));
}

#[test]
fn test_growth_formulas() {
    let factors = AdjustmentFactors::default();
    // Survivor: 6 * (30 - 20) / 5
    assert_eq!(
        record("SURVIVOR").contribution(GrmKind::Growth, &factors, true),
        Contribution::Value(12.0)
    );
    // Ingrowth enters with its whole end value: 6 * 30 / 5
    assert_eq!(
        record("INGROWTH").contribution(GrmKind::Growth, &factors, true),
        Contribution::Value(36.0)
    );
    assert_eq!(
        record("MORTALITY1").contribution(GrmKind::Growth, &factors, true),
        Contribution::Excluded
    );
}

#[test]
fn test_mortality_uses_midpoint() {
    let factors = AdjustmentFactors::default();
    assert_eq!(
        record("MORTALITY1").contribution(GrmKind::Mortality, &factors, true),
        Contribution::Value(30.0)
    );
    assert_eq!(
        record("MORTALITY1").contribution(GrmKind::Mortality, &factors, false),
        Contribution::Value(150.0)
    );
}

#[test]
fn test_record_adjusted_by_its_own_subplot_type() {
    let factors = AdjustmentFactors::new(1.0, 4.0, 2.0);
    let mut micro = record("CUT1");
    micro.subplot_type = SubplotType::Microplot;
    let mut macro_ = record("CUT1");
    macro_.subplot_type = SubplotType::Macroplot;
    let mut unsampled = record("CUT1");
    unsampled.subplot_type = SubplotType::NotSampled;

    assert_eq!(
        micro.contribution(GrmKind::Removals, &factors, false),
        Contribution::Value(600.0)
    );
    assert_eq!(
        macro_.contribution(GrmKind::Removals, &factors, false),
        Contribution::Value(300.0)
    );
    assert_eq!(
        unsampled.contribution(GrmKind::Removals, &factors, false),
        Contribution::Excluded
    );
}

#[test]
fn test_missing_inputs() {
    let factors = AdjustmentFactors::default();
    let mut no_remper = record("SURVIVOR");
    no_remper.remper = Some(0.0);
    assert_eq!(
        no_remper.contribution(GrmKind::Growth, &factors, true),
        Contribution::Missing
    );

    let mut no_tpa = record("MORTALITY1");
    no_tpa.tpa = None;
    assert_eq!(
        no_tpa.contribution(GrmKind::Mortality, &factors, false),
        Contribution::Missing
    );
}

#[test]
fn test_annual_change_for_non_growth_family_is_zero() {
    let cut = GrmComponent::parse("CUT1");
    assert_eq!(annual_change(cut, None, None, None), Some(0.0));
}

#[test]
fn test_attach_contributions_to_frame() {
    let mut frame = df!(
        derived::COMPONENT => ["MORTALITY1", "SURVIVOR", "MORTALITY2", "NOT USED"],
        derived::GRM_TPA => [Some(6.0), Some(6.0), None, Some(6.0)],
        derived::GRM_SUBPTYP => [1i64, 1, 1, 1],
        derived::MIDPT_VALUE => [10.0, 10.0, 10.0, 10.0],
        columns::REMPER => [5.0, 5.0, 5.0, 5.0],
        columns::ADJ_FACTOR_SUBP => [1.5, 1.5, 1.5, 1.5],
        columns::ADJ_FACTOR_MICR => [1.0, 1.0, 1.0, 1.0],
        columns::ADJ_FACTOR_MACR => [1.0, 1.0, 1.0, 1.0],
    )
    .unwrap();

    let summary = attach_contributions(&mut frame, GrmKind::Mortality, true).unwrap();
    assert_eq!(
        summary,
        ClassificationSummary {
            kept: 1,
            excluded: 2,
            missing: 1,
        }
    );

    let values: Vec<Option<f64>> = frame
        .column(derived::VALUE)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(values.len(), 4);
    assert_relative_eq!(values[0].unwrap(), 18.0, epsilon = 1e-12);
    assert_eq!(&values[1..], &[None, None, None]);
}

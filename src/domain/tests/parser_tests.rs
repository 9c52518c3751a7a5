//! Parser tests

use crate::domain::parser::parse_expression;
use crate::domain::predicate::{Literal, Operand, Operator, Predicate};
use crate::error::EstimationError;

fn fragment_of(err: EstimationError) -> String {
    match err {
        EstimationError::InvalidDomain { fragment, .. } => fragment,
        other => panic!("Expected InvalidDomain, got {other}"),
    }
}

#[test]
fn test_simple_comparison() {
    let expr = parse_expression("DIA >= 10.0").unwrap();
    assert_eq!(
        expr.predicates(),
        &[Predicate::new(
            "DIA",
            Operator::GtEq,
            Operand::Scalar(Literal::Float(10.0))
        )]
    );
}

#[test]
fn test_conjunction_of_all_clause_forms() {
    let expr = parse_expression(
        "STATUSCD == 1 and SPCD IN (131, 110) AND DIA BETWEEN 5 AND 20 \
         AND OWNGRPCD NOT IN (40) AND VOLCFNET IS NOT NULL AND DSTRBCD1 IS NULL",
    )
    .unwrap();

    let ops: Vec<Operator> = expr.predicates().iter().map(|p| p.operator).collect();
    assert_eq!(
        ops,
        vec![
            Operator::Eq,
            Operator::In,
            Operator::Between,
            Operator::NotIn,
            Operator::IsNotNull,
            Operator::IsNull,
        ]
    );
    assert_eq!(
        expr.predicates()[1].operand,
        Operand::List(vec![Literal::Int(131), Literal::Int(110)])
    );
    assert_eq!(
        expr.predicates()[2].operand,
        Operand::Range(Literal::Int(5), Literal::Int(20))
    );
    assert_eq!(expr.columns().len(), 6);
}

#[test]
fn test_operator_spellings() {
    let expr = parse_expression("A = 1 AND B <> 2 AND C != 3 AND D < 4 AND E <= 5 AND F > 6").unwrap();
    let ops: Vec<Operator> = expr.predicates().iter().map(|p| p.operator).collect();
    assert_eq!(
        ops,
        vec![
            Operator::Eq,
            Operator::NotEq,
            Operator::NotEq,
            Operator::Lt,
            Operator::LtEq,
            Operator::Gt,
        ]
    );
}

#[test]
fn test_quoted_strings_and_negative_numbers() {
    let expr = parse_expression("PROP_BASIS == 'MACR' AND NOTE == 'o''brien' AND ELEV > -12").unwrap();
    assert_eq!(
        expr.predicates()[0].operand,
        Operand::Scalar(Literal::Text("MACR".to_string()))
    );
    assert_eq!(
        expr.predicates()[1].operand,
        Operand::Scalar(Literal::Text("o'brien".to_string()))
    );
    assert_eq!(
        expr.predicates()[2].operand,
        Operand::Scalar(Literal::Int(-12))
    );
}

#[test]
fn test_parenthesised_clauses() {
    let expr = parse_expression("(STATUSCD == 1 AND DIA > 5) AND (TREECLCD == 2)").unwrap();
    assert_eq!(expr.predicates().len(), 3);
}

#[test]
fn test_empty_expression_is_unrestricted() {
    let expr = parse_expression("   ").unwrap();
    assert!(expr.is_empty());
    assert!(expr.to_expr().unwrap().is_none());
}

#[test]
fn test_malformed_operator_names_fragment() {
    let fragment = fragment_of(parse_expression("DIA >>= 5").unwrap_err());
    assert!(fragment.starts_with(">= 5"), "fragment was {fragment}");
}

#[test]
fn test_disjunction_rejected() {
    let fragment = fragment_of(parse_expression("STATUSCD == 1 OR STATUSCD == 2").unwrap_err());
    assert!(fragment.starts_with("OR"));
}

#[test]
fn test_unclosed_list_rejected() {
    let err = parse_expression("SPCD IN (1, 2").unwrap_err();
    assert!(matches!(err, EstimationError::InvalidDomain { .. }));
}

#[test]
fn test_unrecognised_character_rejected() {
    let fragment = fragment_of(parse_expression("DIA >= 5 AND SPCD ~ 3").unwrap_err());
    assert!(fragment.starts_with('~'));
}

#[test]
fn test_missing_value_rejected() {
    let fragment = fragment_of(parse_expression("DIA >=").unwrap_err());
    assert_eq!(fragment, "<end of expression>");
}

#[test]
fn test_display_round_trips_through_parser() {
    let text = "STATUSCD == 1 AND SPCD IN (131, 110) AND DIA BETWEEN 5 AND 20";
    let expr = parse_expression(text).unwrap();
    let reparsed = parse_expression(&expr.to_string()).unwrap();
    assert_eq!(expr, reparsed);
}

mod common;

use std::collections::{BTreeMap, BTreeSet};

use tensordag::expr::{parse, parse_lhs, ParseError, ParsedExpr};
use tensordag::world::World;

use common::make_tensors;

fn term(name: &str) -> ParsedExpr {
    ParsedExpr::Term {
        name: name.to_string(),
        indices: String::new(),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let parsed = parse("A + B * C").expect("parse");
    assert_eq!(
        parsed,
        ParsedExpr::Add(
            Box::new(term("A")),
            Box::new(ParsedExpr::Mul(Box::new(term("B")), Box::new(term("C")))),
        )
    );
}

#[test]
fn subtraction_is_left_associative() {
    let parsed = parse("A - B - C").expect("parse");
    assert_eq!(
        parsed,
        ParsedExpr::Sub(
            Box::new(ParsedExpr::Sub(Box::new(term("A")), Box::new(term("B")))),
            Box::new(term("C")),
        )
    );
}

#[test]
fn parentheses_override_precedence() {
    let parsed = parse("(A + B) * C").expect("parse");
    assert_eq!(
        parsed,
        ParsedExpr::Mul(
            Box::new(ParsedExpr::Add(Box::new(term("A")), Box::new(term("B")))),
            Box::new(term("C")),
        )
    );
}

#[test]
fn scalar_factors_collapse_into_one_scale() {
    let parsed = parse("2 * A * 3").expect("parse");
    assert_eq!(parsed, ParsedExpr::Scaled(6.0, Box::new(term("A"))));

    let parsed = parse("B * C + 0.5 * D").expect("parse");
    assert_eq!(
        parsed,
        ParsedExpr::Add(
            Box::new(ParsedExpr::Mul(Box::new(term("B")), Box::new(term("C")))),
            Box::new(ParsedExpr::Scaled(0.5, Box::new(term("D")))),
        )
    );
}

#[test]
fn index_lists_attach_to_their_tensor() {
    let parsed = parse("A[ij] * B[jk]").expect("parse");
    assert_eq!(
        parsed,
        ParsedExpr::Mul(
            Box::new(ParsedExpr::Term {
                name: "A".to_string(),
                indices: "ij".to_string(),
            }),
            Box::new(ParsedExpr::Term {
                name: "B".to_string(),
                indices: "jk".to_string(),
            }),
        )
    );
}

#[test]
fn parse_lhs_accepts_optional_indices() {
    assert_eq!(
        parse_lhs("A[ij]").expect("parse"),
        ("A".to_string(), "ij".to_string())
    );
    assert_eq!(
        parse_lhs("  A "),
        Ok(("A".to_string(), String::new()))
    );
    assert!(matches!(
        parse_lhs("A B"),
        Err(ParseError::TrailingInput(_))
    ));
}

#[test]
fn malformed_expressions_are_rejected() {
    assert!(matches!(parse("2 + A"), Err(ParseError::ScalarOnly)));
    assert!(matches!(parse("A +"), Err(ParseError::UnexpectedEnd)));
    assert!(matches!(parse("A ) B"), Err(ParseError::TrailingInput(_))));
    assert!(matches!(
        parse("A[i"),
        Err(ParseError::UnterminatedIndices(_))
    ));
    assert!(matches!(parse("$"), Err(ParseError::UnexpectedChar('$', 0))));
}

#[test]
fn tensor_names_collects_every_mention_once() {
    let parsed = parse("A * B + A - 2 * C").expect("parse");
    let mut names = BTreeSet::new();
    parsed.tensor_names(&mut names);
    let names: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[test]
fn bind_resolves_declared_tensors_and_rejects_unknown_ones() {
    let world = World::single();
    let tensors = make_tensors(&world, &[("A", 4, 1.0), ("B", 4, 2.0)]);

    let bound = parse("A + B").expect("parse").bind(&tensors).expect("bind");
    let mut inputs = BTreeMap::new();
    bound.inputs(&mut inputs);
    assert_eq!(inputs.len(), 2);

    let err = parse("Z").expect("parse").bind(&tensors).unwrap_err();
    assert_eq!(err, ParseError::UnknownTensor("Z".to_string()));
}

#[test]
fn duplicate_reads_deduplicate_in_the_input_set() {
    let world = World::single();
    let tensors = make_tensors(&world, &[("A", 4, 1.0)]);

    let bound = parse("A * A + A").expect("parse").bind(&tensors).expect("bind");
    let mut inputs = BTreeMap::new();
    bound.inputs(&mut inputs);
    assert_eq!(inputs.len(), 1);
}

#[test]
fn evaluation_matches_the_expression_shape() {
    let world = World::single();
    let tensors = make_tensors(&world, &[("A", 4, 3.0), ("B", 4, 2.0)]);

    let bound = parse("2 * A * B - A")
        .expect("parse")
        .bind(&tensors)
        .expect("bind");
    // 2 * 3 * 2 - 3
    assert_eq!(bound.eval(), vec![9.0; 4]);
}

#[test]
fn cost_estimates_are_strictly_positive() {
    let world = World::single();
    let tensors = make_tensors(&world, &[("A", 7, 0.0), ("B", 7, 1.0)]);
    let lhs = tensors["A"].index("i");

    for rhs in ["B", "A + B", "A * B", "0.25 * B"] {
        let bound = parse(rhs).expect("parse").bind(&tensors).expect("bind");
        assert!(bound.estimate_cost(&lhs) > 0, "cost of '{rhs}'");
    }
}

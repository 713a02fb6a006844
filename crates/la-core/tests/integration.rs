//! End-to-end tests across the public API:
//! text → tokens → tree → value → record → features → recommendations.

use la_core::{
    BinOp, ErrorKind, Expr, IndexedExpression, LinearScan, MemoryCache, Recommender, Shape,
    StoredExpression, Value, cached_evaluate, evaluate, evaluate_str, export_json, import_json,
    index_corpus, parse, parse_str, run, tokenize,
};
use proptest::prelude::*;
use uuid::Uuid;

fn record(id: u128, source: &str, created_at: u64) -> StoredExpression {
    let value = evaluate_str(source).unwrap();
    StoredExpression {
        id: Uuid::from_u128(id),
        source: source.to_string(),
        canonical: value.to_string(),
        created_at,
        owner: "alice".to_string(),
    }
}

#[test]
fn scalar_times_vector_scenario() {
    let ast = parse_str("2 * [1,2,3]").unwrap();
    assert_eq!(
        ast,
        Expr::BinaryOp {
            op: BinOp::Mul,
            left: Box::new(Expr::NumberLiteral(2.0)),
            right: Box::new(Expr::VectorLiteral(vec![
                Expr::NumberLiteral(1.0),
                Expr::NumberLiteral(2.0),
                Expr::NumberLiteral(3.0),
            ])),
        }
    );
    let value = evaluate(&ast).unwrap();
    assert_eq!(value, Value::Vector(vec![2.0, 4.0, 6.0]));
    assert_eq!(value.to_string(), "[2 4 6]");
}

#[test]
fn documented_failures() {
    let kind = |text: &str| evaluate_str(text).unwrap_err().kind();
    assert_eq!(kind("[1,2] + [1,2,3]"), ErrorKind::Dimension);
    assert_eq!(kind("[[1,2],[3]]"), ErrorKind::Shape);
    assert_eq!(kind("Inv([[1,2],[2,4]])"), ErrorKind::Singular);
}

#[test]
fn deep_input_fails_cleanly() {
    let n = 100_000;
    for text in [
        format!("{}1{}", "(".repeat(n), ")".repeat(n)),
        format!("{}1", "- ".repeat(n)),
        format!("[[1,0],[0,1]]{}", "'".repeat(n)),
        vec!["[1,2]"; n].join(" + "),
    ] {
        assert_eq!(evaluate_str(&text).unwrap_err().kind(), ErrorKind::Parse);
    }
}

#[test]
fn badly_scaled_matrix_inverts() {
    let value = evaluate_str("Inv([[1e20,0],[0,1e-20]]) * [1e20,1e-20]").unwrap();
    let e = value.elements();
    assert!((e[0] - 1.0).abs() < 1e-9 && (e[1] - 1.0).abs() < 1e-9);
}

#[test]
fn ragged_matrix_parses_but_does_not_evaluate() {
    let tokens = tokenize("[[1,2],[3]]").unwrap();
    let ast = parse(&tokens).unwrap();
    assert!(matches!(ast, Expr::MatrixLiteral(ref rows) if rows.len() == 2));
    assert!(evaluate(&ast).is_err());
}

#[test]
fn algebraic_laws_on_square_matrices() {
    let a = "[[2,1,0],[1,3,1],[0,1,4]]";
    let b = "[[1,0,2],[0,1,0],[3,0,1]]";

    let sum = evaluate_str(&format!("{a} + {b}")).unwrap();
    let va = evaluate_str(a).unwrap();
    let vb = evaluate_str(b).unwrap();
    let expected: Vec<f64> = va
        .elements()
        .iter()
        .zip(vb.elements())
        .map(|(x, y)| x + y)
        .collect();
    assert_eq!(sum.elements(), expected.as_slice());
    assert_eq!(sum.shape(), Shape::Matrix(3, 3));

    assert_eq!(evaluate_str(&format!("({a})''")).unwrap(), va);

    let det = evaluate_str(&format!("Det({a})")).unwrap().as_scalar().unwrap();
    let det_inv = evaluate_str(&format!("Det(Inv({a}))"))
        .unwrap()
        .as_scalar()
        .unwrap();
    approx::assert_relative_eq!(det_inv, 1.0 / det, epsilon = 1e-9);
}

#[test]
fn recommender_respects_shape() {
    let target = IndexedExpression::index(record(1, "[1,2,3] + [1,1,1]", 100)).unwrap();
    let (corpus, rejected) = index_corpus(vec![
        record(2, "[4,5,6] * 2", 200),
        record(3, "[0,0,1] + [1,0,0]", 150),
        record(4, "[[1,2],[3,4]] + [[1,1],[1,1]]", 300),
    ]);
    assert!(rejected.is_empty());
    let scan = LinearScan::new(corpus);

    let out = Recommender::default().suggest(&scan, &[&target], 2);
    let ids: Vec<u128> = out.iter().map(|r| r.id.as_u128()).collect();
    // Same operator set ranks first; the matrix is never offered.
    assert_eq!(ids, vec![3, 2]);
}

#[test]
fn recommender_ties_are_reproducible() {
    let target = IndexedExpression::index(record(1, "Norm([3,4])", 0)).unwrap();
    let (corpus, _) = index_corpus(vec![
        record(9, "Norm([6,8])", 500),
        record(5, "Norm([5,12])", 500),
        record(7, "Norm([1,1])", 900),
    ]);
    let scan = LinearScan::new(corpus);
    let rec = Recommender::default();

    let first = rec.suggest_scored(&scan, &[&target], 3);
    // [1,1] shares the target's magnitude bucket. [6,8] and [5,12] tie one
    // bucket away and fall back to creation time, then id.
    let ids: Vec<u128> = first.iter().map(|s| s.record.id.as_u128()).collect();
    assert_eq!(ids, vec![7, 5, 9]);
    assert_eq!(first[1].score, first[2].score);
    for _ in 0..5 {
        assert_eq!(rec.suggest_scored(&scan, &[&target], 3), first);
    }
}

#[test]
fn corpus_survives_export_and_import() {
    let records = vec![record(1, "Det([[1,2],[3,4]])", 1_000), record(2, "[1,2]'", 2_000)];
    let json = export_json(&records).unwrap();
    let back = import_json(&json).unwrap();
    assert_eq!(back, records);

    let (indexed, rejected) = index_corpus(back);
    assert_eq!(indexed.len(), 2);
    assert!(rejected.is_empty());
}

#[test]
fn cached_evaluation_matches_direct() {
    let mut cache = MemoryCache::new();
    for text in ["1 + 2 * 3", "Cross([1,0,0],[0,1,0])", "1 + 2 * 3"] {
        assert_eq!(
            cached_evaluate(text, &mut cache).unwrap(),
            evaluate_str(text).unwrap()
        );
    }
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.hits(), 1);
}

#[test]
fn run_reports_canonical_text() {
    let evaluation = run("[[1,2],[3,4]]'").unwrap();
    assert_eq!(evaluation.canonical, "[1 3 2 4]");
    assert_eq!(evaluation.value.nested_text(), "[[1 3] [2 4]]");
}

fn literal_number() -> impl Strategy<Value = f64> {
    prop_oneof![
        (-1000i32..1000).prop_map(f64::from),
        (-1.0e6..1.0e6f64),
        // Full exponent range; the canonical text spells these out in full.
        prop::num::f64::NORMAL,
    ]
}

proptest! {
    #[test]
    fn parsing_is_deterministic(
        xs in proptest::collection::vec(literal_number(), 0..6),
        op in prop_oneof![Just("+"), Just("-"), Just("*"), Just("/")],
    ) {
        let items: Vec<String> = xs.iter().map(|x| x.to_string()).collect();
        let text = format!("2 {op} [{}]'", items.join(", "));
        let first = parse_str(&text).unwrap();
        prop_assert_eq!(parse_str(&text).unwrap(), first.clone());
        // The printed tree parses back to the same tree.
        prop_assert_eq!(parse_str(&first.to_string()).unwrap(), first);
    }

    #[test]
    fn vector_literal_round_trips(xs in proptest::collection::vec(literal_number(), 0..8)) {
        let items: Vec<String> = xs.iter().map(|x| x.to_string()).collect();
        let value = evaluate_str(&format!("[{}]", items.join(", "))).unwrap();
        let again = evaluate_str(&value.to_string()).unwrap();
        prop_assert_eq!(again, value);
    }

    #[test]
    fn scalar_literal_round_trips(x in literal_number()) {
        let value = evaluate_str(&x.to_string()).unwrap();
        prop_assert_eq!(evaluate_str(&value.to_string()).unwrap(), value);
    }

    #[test]
    fn matrix_nested_text_round_trips(
        rows in 1usize..4,
        cols in 1usize..4,
        seed in proptest::collection::vec(literal_number(), 16),
    ) {
        let text = format!(
            "[{}]",
            (0..rows)
                .map(|r| {
                    let row: Vec<String> =
                        (0..cols).map(|c| seed[r * cols + c].to_string()).collect();
                    format!("[{}]", row.join(", "))
                })
                .collect::<Vec<_>>()
                .join(", ")
        );
        let value = evaluate_str(&text).unwrap();
        prop_assert_eq!(value.shape(), Shape::Matrix(rows, cols));
        prop_assert_eq!(evaluate_str(&value.nested_text()).unwrap(), value);
    }
}

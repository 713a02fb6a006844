//! Criterion benchmarks for parsing, evaluation and recommendation.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use la_core::{
    IndexedExpression, LinearScan, Recommender, StoredExpression, evaluate, evaluate_str,
    index_corpus, parse_str,
};

fn matrix_literal(n: usize) -> String {
    let rows: Vec<String> = (0..n)
        .map(|r| {
            let row: Vec<String> = (0..n)
                .map(|c| if r == c { (n + 1).to_string() } else { ((r + c) % 3).to_string() })
                .collect();
            format!("[{}]", row.join(", "))
        })
        .collect();
    format!("[{}]", rows.join(", "))
}

fn bench_parse(c: &mut Criterion) {
    let text = format!("Det(Inv({m}) * {m}') + Norm([1,2,3]) * 2", m = matrix_literal(8));
    c.bench_function("parse/mixed", |b| b.iter(|| parse_str(black_box(&text))));
}

fn bench_linalg(c: &mut Criterion) {
    let mut group = c.benchmark_group("linalg");
    for n in [4, 16, 32] {
        let ast = parse_str(&format!("Inv({})", matrix_literal(n))).unwrap();
        group.bench_with_input(BenchmarkId::new("inv", n), &ast, |b, ast| {
            b.iter(|| evaluate(black_box(ast)))
        });
        let ast = parse_str(&format!("Det({})", matrix_literal(n))).unwrap();
        group.bench_with_input(BenchmarkId::new("det", n), &ast, |b, ast| {
            b.iter(|| evaluate(black_box(ast)))
        });
    }
    group.finish();
}

fn corpus(size: usize) -> Vec<StoredExpression> {
    let shapes = ["[1,2,3] * {i}", "Det([[{i},1],[1,2]])", "[[1,2],[3,{i}]]'", "Norm([{i},4])"];
    (0..size)
        .map(|i| {
            let source = shapes[i % shapes.len()].replace("{i}", &(i + 1).to_string());
            let value = evaluate_str(&source).unwrap();
            let mut record = StoredExpression::new(&source, &value, "bench");
            record.created_at = i as u64;
            record
        })
        .collect()
}

fn bench_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommend");
    for size in [100, 1000] {
        let (entries, _) = index_corpus(corpus(size));
        let target: IndexedExpression = entries[0].clone();
        let scan = LinearScan::new(entries);
        let rec = Recommender::default();
        group.bench_with_input(BenchmarkId::new("linear_scan", size), &scan, |b, scan| {
            b.iter(|| rec.suggest(scan, &[&target], 5))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_linalg, bench_recommend);
criterion_main!(benches);

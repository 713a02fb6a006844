//! Similarity ranking over a corpus of stored expressions.
//!
//! Shape is a hard filter: a candidate is only scored against targets with
//! the same result shape. Within a shape, the score adds a flat shape bonus,
//! weighted Jaccard similarity of operator sets and inverse magnitude-bucket
//! distance. Multiple targets average their scores, a target of another
//! shape contributing zero.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAGNITUDE_WEIGHT, DEFAULT_OPS_WEIGHT, DEFAULT_SHAPE_WEIGHT};
use crate::error::ExprError;
use crate::features::FeatureVector;
use crate::interpreter::{run, run_within};
use crate::record::{ExprId, StoredExpression};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub shape: f64,
    pub ops: f64,
    pub magnitude: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            shape: DEFAULT_SHAPE_WEIGHT,
            ops: DEFAULT_OPS_WEIGHT,
            magnitude: DEFAULT_MAGNITUDE_WEIGHT,
        }
    }
}

/// Score of `candidate` against `target`, or `None` when their shapes differ.
pub fn similarity(
    target: &FeatureVector,
    candidate: &FeatureVector,
    weights: &SimilarityWeights,
) -> Option<f64> {
    if target.shape != candidate.shape {
        return None;
    }
    let a = target.op_set();
    let b = candidate.op_set();
    let union = a.union(&b).count();
    let jaccard = if union == 0 {
        1.0
    } else {
        a.intersection(&b).count() as f64 / union as f64
    };
    let distance = (target.magnitude - candidate.magnitude).unsigned_abs() as f64;
    Some(weights.shape + weights.ops * jaccard + weights.magnitude / (1.0 + distance))
}

/// A stored record with its features computed.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedExpression {
    pub record: StoredExpression,
    pub features: FeatureVector,
}

impl IndexedExpression {
    /// Recompute features by re-running the stored source.
    pub fn index(record: StoredExpression) -> Result<Self, ExprError> {
        let evaluation = run(&record.source)?;
        let features = FeatureVector::extract(&evaluation.ast, &evaluation.value);
        Ok(Self { record, features })
    }
}

/// Index every record. Records whose source no longer evaluates are returned
/// separately so the caller can report them.
pub fn index_corpus(
    records: impl IntoIterator<Item = StoredExpression>,
) -> (Vec<IndexedExpression>, Vec<(StoredExpression, ExprError)>) {
    index_corpus_within(records, usize::MAX)
}

/// `index_corpus` with literal sizes bounded by `limit`; oversized records
/// are rejected with a shape error before any arithmetic runs.
pub fn index_corpus_within(
    records: impl IntoIterator<Item = StoredExpression>,
    limit: usize,
) -> (Vec<IndexedExpression>, Vec<(StoredExpression, ExprError)>) {
    let mut indexed = Vec::new();
    let mut rejected = Vec::new();
    for record in records {
        match run_within(&record.source, limit) {
            Ok(evaluation) => indexed.push(IndexedExpression {
                features: FeatureVector::extract(&evaluation.ast, &evaluation.value),
                record,
            }),
            Err(e) => rejected.push((record, e)),
        }
    }
    (indexed, rejected)
}

/// Supplies candidates worth scoring for a set of target features. An
/// implementation may over-approximate; the recommender re-scores
/// everything it is handed.
pub trait CandidateSource {
    fn candidates(&self, wanted: &[&FeatureVector]) -> Vec<&IndexedExpression>;
}

/// Exhaustive scan, filtered by shape.
#[derive(Clone, Debug, Default)]
pub struct LinearScan {
    entries: Vec<IndexedExpression>,
}

impl LinearScan {
    pub fn new(entries: Vec<IndexedExpression>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[IndexedExpression] {
        &self.entries
    }

    pub fn find(&self, id: ExprId) -> Option<&IndexedExpression> {
        self.entries.iter().find(|e| e.record.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CandidateSource for LinearScan {
    fn candidates(&self, wanted: &[&FeatureVector]) -> Vec<&IndexedExpression> {
        self.entries
            .iter()
            .filter(|e| wanted.iter().any(|p| p.shape == e.features.shape))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredExpression {
    pub record: StoredExpression,
    pub score: f64,
}

#[derive(Clone, Debug, Default)]
pub struct Recommender {
    pub weights: SimilarityWeights,
}

impl Recommender {
    pub fn new(weights: SimilarityWeights) -> Self {
        Self { weights }
    }

    /// Up to `k` records most similar to `targets`, best first. Targets
    /// themselves are never suggested.
    pub fn suggest(
        &self,
        source: &impl CandidateSource,
        targets: &[&IndexedExpression],
        k: usize,
    ) -> Vec<StoredExpression> {
        self.suggest_scored(source, targets, k)
            .into_iter()
            .map(|s| s.record)
            .collect()
    }

    pub fn suggest_scored(
        &self,
        source: &impl CandidateSource,
        targets: &[&IndexedExpression],
        k: usize,
    ) -> Vec<ScoredExpression> {
        if k == 0 || targets.is_empty() {
            return Vec::new();
        }
        let wanted: Vec<&FeatureVector> = targets.iter().map(|t| &t.features).collect();
        let excluded: HashSet<ExprId> = targets.iter().map(|t| t.record.id).collect();

        let mut scored: Vec<ScoredExpression> = source
            .candidates(&wanted)
            .into_iter()
            .filter(|c| !excluded.contains(&c.record.id))
            .filter_map(|c| {
                let mut matched = false;
                let mut total = 0.0;
                for want in &wanted {
                    if let Some(s) = similarity(want, &c.features, &self.weights) {
                        matched = true;
                        total += s;
                    }
                }
                matched.then(|| ScoredExpression {
                    record: c.record.clone(),
                    score: total / wanted.len() as f64,
                })
            })
            .collect();

        scored.sort_by(rank);
        scored.truncate(k);
        scored
    }
}

/// Score descending, then newest first, then id ascending.
fn rank(a: &ScoredExpression, b: &ScoredExpression) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.record.created_at.cmp(&a.record.created_at))
        .then_with(|| a.record.id.cmp(&b.record.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn entry(id: u128, source: &str, created_at: u64) -> IndexedExpression {
        IndexedExpression::index(StoredExpression {
            id: Uuid::from_u128(id),
            source: source.to_string(),
            canonical: String::new(),
            created_at,
            owner: "test".to_string(),
        })
        .unwrap()
    }

    fn ids(records: &[StoredExpression]) -> Vec<u128> {
        records.iter().map(|r| r.id.as_u128()).collect()
    }

    #[test]
    fn test_similarity_formula() {
        let w = SimilarityWeights::default();
        let a = entry(1, "[1,2,3] + [1,1,1]", 0).features;
        let b = entry(2, "[1,2,3] * 2", 0).features;
        // Same shape, ops {Add} vs {Mul}, both magnitude 0.
        assert_eq!(similarity(&a, &b, &w), Some(1.0 + 0.0 + 1.0));
        assert_eq!(similarity(&a, &a, &w), Some(1.0 + 2.0 + 1.0));

        let m = entry(3, "[[1,2],[3,4]]", 0).features;
        assert_eq!(similarity(&a, &m, &w), None);
    }

    #[test]
    fn test_empty_op_sets_are_identical() {
        let w = SimilarityWeights::default();
        let a = entry(1, "[1,2,3]", 0).features;
        let b = entry(2, "[300,2,3]", 0).features;
        // Jaccard 1, magnitude distance 2.
        assert_eq!(similarity(&a, &b, &w), Some(1.0 + 2.0 + 1.0 / 3.0));
    }

    #[test]
    fn test_shape_filter_and_ranking() {
        let target = entry(1, "[1,2,3] + [4,5,6]", 10);
        let close = entry(2, "[0,1,0] + [1,0,0]", 20);
        let far = entry(3, "Cross([1,0,0],[0,1,0])", 30);
        let matrix = entry(4, "[[1,2],[3,4]] + [[1,1],[1,1]]", 40);
        let scan = LinearScan::new(vec![target.clone(), close, far, matrix]);

        let out = Recommender::default().suggest(&scan, &[&target], 2);
        assert_eq!(ids(&out), vec![2, 3]);
    }

    #[test]
    fn test_tie_break_newest_then_id() {
        let target = entry(1, "[1,2]", 0);
        let scan = LinearScan::new(vec![
            target.clone(),
            entry(30, "[3,4]", 100),
            entry(20, "[5,6]", 200),
            entry(10, "[7,8]", 100),
        ]);
        let rec = Recommender::default();
        let first = rec.suggest(&scan, &[&target], 10);
        assert_eq!(ids(&first), vec![20, 10, 30]);
        assert_eq!(rec.suggest(&scan, &[&target], 10), first);
    }

    #[test]
    fn test_multi_target_mean() {
        let v = entry(1, "[1,2] * 2", 0);
        let m = entry(2, "[[1,2],[3,4]] * 2", 0);
        let cand_v = entry(3, "[1,1] * 3", 0);
        let cand_m = entry(4, "[[1,0],[0,1]] * 3", 0);
        let scan = LinearScan::new(vec![v.clone(), m.clone(), cand_v, cand_m]);

        let out = Recommender::default().suggest_scored(&scan, &[&v, &m], 5);
        assert_eq!(out.len(), 2);
        // Each candidate matches one of two targets exactly: (1 + 2 + 1) / 2.
        for s in &out {
            assert_eq!(s.score, 2.0);
        }
    }

    #[test]
    fn test_targets_excluded_and_empty_cases() {
        let target = entry(1, "Det([[1,2],[3,4]])", 0);
        let rec = Recommender::default();

        let scan = LinearScan::new(vec![target.clone()]);
        assert!(rec.suggest(&scan, &[&target], 3).is_empty());
        assert!(rec.suggest(&LinearScan::default(), &[&target], 3).is_empty());

        let scan = LinearScan::new(vec![target.clone(), entry(2, "5", 0)]);
        assert!(rec.suggest(&scan, &[&target], 0).is_empty());
        assert!(rec.suggest(&scan, &[], 3).is_empty());
    }

    #[test]
    fn test_index_corpus_reports_rejects() {
        let good = StoredExpression::new("1 + 1", &crate::value::Value::Scalar(2.0), "x");
        let mut bad = good.clone();
        bad.id = Uuid::new_v4();
        bad.source = "[1,2] + [1]".to_string();
        let (indexed, rejected) = index_corpus(vec![good, bad]);
        assert_eq!(indexed.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].1.kind(), crate::error::ErrorKind::Dimension);
    }

    #[test]
    fn test_index_corpus_within_rejects_oversized() {
        let small = StoredExpression::new("[1,2]", &crate::value::Value::Scalar(0.0), "x");
        let mut large = small.clone();
        large.id = Uuid::new_v4();
        large.source = "[1,2,3,4]".to_string();
        let (indexed, rejected) = index_corpus_within(vec![small.clone(), large], 3);
        assert_eq!(indexed.len(), 1);
        assert_eq!(indexed[0].record.id, small.id);
        assert_eq!(rejected[0].1.kind(), crate::error::ErrorKind::Shape);
    }

    #[test]
    fn test_weights_deserialize_partial() {
        let w: SimilarityWeights = serde_json::from_str(r#"{"ops": 5.0}"#).unwrap();
        assert_eq!(w.ops, 5.0);
        assert_eq!(w.shape, DEFAULT_SHAPE_WEIGHT);
    }
}

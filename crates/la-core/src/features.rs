//! Fixed-size summaries of evaluated expressions, used for similarity ranking.

use std::collections::BTreeSet;

use crate::ast::{BinOp, Expr, UnOp};
use crate::builtins::Builtin;
use crate::constants::{MAGNITUDE_MAX, MAGNITUDE_MIN, ZERO_MAGNITUDE};
use crate::value::{Shape, Value};

/// Operator and function kinds tracked per expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Transpose,
    Det,
    Inv,
    Dot,
    Cross,
    Norm,
    Trace,
    /// Calls to names outside the builtin table.
    Other,
}

impl OpKind {
    pub const COUNT: usize = 13;

    pub const ALL: [OpKind; Self::COUNT] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Neg,
        Self::Transpose,
        Self::Det,
        Self::Inv,
        Self::Dot,
        Self::Cross,
        Self::Norm,
        Self::Trace,
        Self::Other,
    ];

    fn of(expr: &Expr) -> Option<OpKind> {
        Some(match expr {
            Expr::BinaryOp { op, .. } => match op {
                BinOp::Add => Self::Add,
                BinOp::Sub => Self::Sub,
                BinOp::Mul => Self::Mul,
                BinOp::Div => Self::Div,
            },
            Expr::UnaryOp { op, .. } => match op {
                UnOp::Neg => Self::Neg,
                UnOp::Transpose => Self::Transpose,
            },
            Expr::FunctionCall { name, .. } => match Builtin::resolve(name) {
                Some(Builtin::Det) => Self::Det,
                Some(Builtin::Inv) => Self::Inv,
                Some(Builtin::Dot) => Self::Dot,
                Some(Builtin::Cross) => Self::Cross,
                Some(Builtin::Norm) => Self::Norm,
                Some(Builtin::Trace) => Self::Trace,
                None => Self::Other,
            },
            Expr::NumberLiteral(_) | Expr::VectorLiteral(_) | Expr::MatrixLiteral(_) => {
                return None;
            }
        })
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Length of [`FeatureVector::as_array`]: shape code, rows, cols, one count per
/// [`OpKind`], magnitude.
pub const FEATURE_DIM: usize = 3 + OpKind::COUNT + 1;

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    pub shape: Shape,
    pub op_counts: [u32; OpKind::COUNT],
    /// Decimal order of the largest absolute element.
    pub magnitude: i32,
}

impl FeatureVector {
    pub fn extract(ast: &Expr, value: &Value) -> Self {
        let mut op_counts = [0u32; OpKind::COUNT];
        ast.walk(&mut |node| {
            if let Some(kind) = OpKind::of(node) {
                op_counts[kind.index()] += 1;
            }
        });
        Self {
            shape: value.shape(),
            op_counts,
            magnitude: magnitude_bucket(value),
        }
    }

    /// Operator kinds present at least once.
    pub fn op_set(&self) -> BTreeSet<OpKind> {
        OpKind::ALL
            .into_iter()
            .filter(|k| self.op_counts[k.index()] > 0)
            .collect()
    }

    /// Flat numeric embedding for index implementations.
    pub fn as_array(&self) -> [f64; FEATURE_DIM] {
        let (code, rows, cols) = match self.shape {
            Shape::Scalar => (0.0, 1.0, 1.0),
            Shape::Vector(n) => (1.0, n as f64, 1.0),
            Shape::Matrix(r, c) => (2.0, r as f64, c as f64),
        };
        let mut out = [0.0; FEATURE_DIM];
        out[0] = code;
        out[1] = rows;
        out[2] = cols;
        for (slot, count) in out[3..3 + OpKind::COUNT].iter_mut().zip(self.op_counts) {
            *slot = count as f64;
        }
        out[FEATURE_DIM - 1] = self.magnitude as f64;
        out
    }
}

/// `floor(log10(max |x|))` clamped to the bucket range. All-zero and empty
/// values get their own bucket just below the range.
pub fn magnitude_bucket(value: &Value) -> i32 {
    let max = value
        .elements()
        .iter()
        .map(|x| x.abs())
        .fold(0.0_f64, f64::max);
    if max == 0.0 {
        return ZERO_MAGNITUDE;
    }
    (max.log10().floor() as i32).clamp(MAGNITUDE_MIN, MAGNITUDE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::run;

    fn features(text: &str) -> FeatureVector {
        let evaluation = run(text).unwrap();
        FeatureVector::extract(&evaluation.ast, &evaluation.value)
    }

    #[test]
    fn test_counts_operators_and_calls() {
        let f = features("Det([[1,2],[3,4]]') + 2 * Norm([3,4])");
        assert_eq!(f.shape, Shape::Scalar);
        assert_eq!(f.op_counts[OpKind::Add.index()], 1);
        assert_eq!(f.op_counts[OpKind::Mul.index()], 1);
        assert_eq!(f.op_counts[OpKind::Transpose.index()], 1);
        assert_eq!(f.op_counts[OpKind::Det.index()], 1);
        assert_eq!(f.op_counts[OpKind::Norm.index()], 1);
        assert_eq!(
            f.op_set().into_iter().collect::<Vec<_>>(),
            vec![OpKind::Add, OpKind::Mul, OpKind::Transpose, OpKind::Det, OpKind::Norm]
        );
    }

    #[test]
    fn test_call_names_fold_case() {
        let f = features("inv([[2,0],[0,2]])");
        assert_eq!(f.op_set().into_iter().collect::<Vec<_>>(), vec![OpKind::Inv]);
    }

    #[test]
    fn test_literal_has_no_ops() {
        assert!(features("[1,2,3]").op_set().is_empty());
    }

    #[test]
    fn test_magnitude_buckets() {
        assert_eq!(magnitude_bucket(&Value::Scalar(5.0)), 0);
        assert_eq!(magnitude_bucket(&Value::Vector(vec![-250.0, 3.0])), 2);
        assert_eq!(magnitude_bucket(&Value::Scalar(0.05)), -2);
        assert_eq!(magnitude_bucket(&Value::Scalar(1e300)), MAGNITUDE_MAX);
        assert_eq!(magnitude_bucket(&Value::Scalar(0.0)), ZERO_MAGNITUDE);
        assert_eq!(magnitude_bucket(&Value::Vector(vec![])), ZERO_MAGNITUDE);
    }

    #[test]
    fn test_as_array_layout() {
        let f = features("[[1,2],[3,4]] * 10");
        let a = f.as_array();
        assert_eq!(a.len(), FEATURE_DIM);
        assert_eq!(&a[..3], &[2.0, 2.0, 2.0]);
        assert_eq!(a[3 + OpKind::Mul.index()], 1.0);
        assert_eq!(a[FEATURE_DIM - 1], 1.0);
    }
}

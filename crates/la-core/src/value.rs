//! Runtime values: scalars, vectors and row-major matrices.
//!
//! Every operation allocates a fresh `Value`; nothing aliases. Shape rules:
//!
//! | op      | scalar/scalar | scalar/any      | vector/vector   | matrix/matrix   |
//! |---------|---------------|-----------------|-----------------|-----------------|
//! | `+ -`   | elementwise   | broadcast       | same length     | same dims       |
//! | `*`     | product       | scale           | type error      | matrix product  |
//! | `/`     | quotient      | any / scalar    | type error      | type error      |
//!
//! `M * v` treats `v` as a column, `v * M` treats it as a row.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::linalg;

/// Dimensional classification of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Scalar,
    Vector(usize),
    Matrix(usize, usize),
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => f.write_str("scalar"),
            Shape::Vector(len) => write!(f, "vector({len})"),
            Shape::Matrix(rows, cols) => write!(f, "matrix({rows}x{cols})"),
        }
    }
}

/// Dense row-major matrix. `data.len() == rows * cols` always holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = String;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        Matrix::new(raw.rows, raw.cols, raw.data).ok_or_else(|| {
            format!(
                "matrix data length does not match {}x{}",
                raw.rows, raw.cols
            )
        })
    }
}

impl Matrix {
    /// Build a matrix, returning `None` when `data` is not `rows * cols` long.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (rows.checked_mul(cols)? == data.len()).then_some(Self { rows, cols, data })
    }

    pub(crate) fn from_parts(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(rows * cols, data.len());
        Self { rows, cols, data }
    }

    /// Build from rows, failing with a shape error when they are ragged.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, EvalError> {
        let cols = rows.first().map_or(0, Vec::len);
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(EvalError::Shape {
                    op: "matrix literal".to_string(),
                    detail: format!("row {i} has {} elements, expected {cols}", row.len()),
                });
            }
            data.extend(row);
        }
        Ok(Self::from_parts(n_rows, cols, data))
    }

    pub fn identity(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self::from_parts(n, n, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn shape(&self) -> Shape {
        Shape::Matrix(self.rows, self.cols)
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::from_parts(self.rows, self.cols, self.data.iter().map(|&x| f(x)).collect())
    }
}

/// Result of evaluating an expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    Scalar(f64),
    Vector(Vec<f64>),
    Matrix(Matrix),
}

impl Value {
    pub fn shape(&self) -> Shape {
        match self {
            Value::Scalar(_) => Shape::Scalar,
            Value::Vector(v) => Shape::Vector(v.len()),
            Value::Matrix(m) => m.shape(),
        }
    }

    /// All numeric elements in row-major order.
    pub fn elements(&self) -> &[f64] {
        match self {
            Value::Scalar(x) => std::slice::from_ref(x),
            Value::Vector(v) => v,
            Value::Matrix(m) => m.data(),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(x) => Some(*x),
            _ => None,
        }
    }

    /// Same shape and every element within `eps` of its counterpart.
    pub fn approx_eq(&self, other: &Value, eps: f64) -> bool {
        self.shape() == other.shape()
            && self
                .elements()
                .iter()
                .zip(other.elements())
                .all(|(a, b)| (a - b).abs() <= eps)
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(x) => Value::Scalar(f(*x)),
            Value::Vector(v) => Value::Vector(v.iter().map(|&x| f(x)).collect()),
            Value::Matrix(m) => Value::Matrix(m.map(f)),
        }
    }

    pub fn add(&self, rhs: &Value) -> Result<Value, EvalError> {
        self.elementwise("+", rhs, |a, b| a + b)
    }

    pub fn sub(&self, rhs: &Value) -> Result<Value, EvalError> {
        self.elementwise("-", rhs, |a, b| a - b)
    }

    pub fn mul(&self, rhs: &Value) -> Result<Value, EvalError> {
        let out = match (self, rhs) {
            (Value::Scalar(s), other) | (other, Value::Scalar(s)) => {
                let s = *s;
                other.map(|x| x * s)
            }
            (Value::Matrix(a), Value::Matrix(b)) => {
                if a.cols() != b.rows() {
                    return Err(dimension("*", self, rhs));
                }
                Value::Matrix(linalg::matmul(a, b))
            }
            (Value::Matrix(m), Value::Vector(v)) => {
                if m.cols() != v.len() {
                    return Err(dimension("*", self, rhs));
                }
                Value::Vector(linalg::mat_vec(m, v))
            }
            (Value::Vector(v), Value::Matrix(m)) => {
                if v.len() != m.rows() {
                    return Err(dimension("*", self, rhs));
                }
                Value::Vector(linalg::vec_mat(v, m))
            }
            (Value::Vector(_), Value::Vector(_)) => {
                return Err(type_error(
                    "*",
                    self,
                    rhs,
                    "vector product is ambiguous; use Dot or Cross",
                ));
            }
        };
        out.finite("*")
    }

    pub fn div(&self, rhs: &Value) -> Result<Value, EvalError> {
        let Value::Scalar(d) = rhs else {
            return Err(type_error("/", self, rhs, "divisor must be a scalar"));
        };
        if *d == 0.0 {
            return Err(EvalError::Arithmetic {
                op: "/".to_string(),
                detail: "division by zero".to_string(),
            });
        }
        let d = *d;
        self.map(|x| x / d).finite("/")
    }

    pub fn neg(&self) -> Value {
        self.map(|x| -x)
    }

    /// Scalars and vectors are returned unchanged; vector orientation is
    /// decided by the consuming operation, not stored.
    pub fn transpose(&self) -> Value {
        match self {
            Value::Matrix(m) => Value::Matrix(linalg::transpose(m)),
            other => other.clone(),
        }
    }

    fn elementwise(
        &self,
        op: &str,
        rhs: &Value,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, EvalError> {
        let out = match (self, rhs) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(f(*a, *b)),
            (Value::Scalar(s), other) => {
                let s = *s;
                other.map(|x| f(s, x))
            }
            (other, Value::Scalar(s)) => {
                let s = *s;
                other.map(|x| f(x, s))
            }
            (Value::Vector(a), Value::Vector(b)) => {
                if a.len() != b.len() {
                    return Err(dimension(op, self, rhs));
                }
                Value::Vector(a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect())
            }
            (Value::Matrix(a), Value::Matrix(b)) => {
                if a.rows() != b.rows() || a.cols() != b.cols() {
                    return Err(dimension(op, self, rhs));
                }
                let data = a.data().iter().zip(b.data()).map(|(&x, &y)| f(x, y)).collect();
                Value::Matrix(Matrix::from_parts(a.rows(), a.cols(), data))
            }
            _ => {
                return Err(type_error(
                    op,
                    self,
                    rhs,
                    "vectors and matrices do not combine elementwise",
                ));
            }
        };
        out.finite(op)
    }

    /// Reject overflow and NaN so canonical text always re-parses.
    pub(crate) fn finite(self, op: &str) -> Result<Value, EvalError> {
        if self.elements().iter().all(|x| x.is_finite()) {
            Ok(self)
        } else {
            Err(EvalError::Arithmetic {
                op: op.to_string(),
                detail: "result is not finite".to_string(),
            })
        }
    }

    /// Lossless bracketed form that keeps row boundaries: `[[1 2] [3 4]]`.
    pub fn nested_text(&self) -> String {
        match self {
            Value::Matrix(m) => {
                let rows: Vec<String> = (0..m.rows()).map(|r| bracketed(m.row(r))).collect();
                format!("[{}]", rows.join(" "))
            }
            other => other.to_string(),
        }
    }
}

fn dimension(op: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::Dimension {
        op: op.to_string(),
        left: left.shape(),
        right: right.shape(),
    }
}

fn type_error(op: &str, left: &Value, right: &Value, detail: &str) -> EvalError {
    EvalError::Type {
        op: op.to_string(),
        operands: vec![left.shape(), right.shape()],
        detail: detail.to_string(),
    }
}

/// Shortest round-trip decimal, with negative zero folded to `0`.
pub fn format_number(x: f64) -> String {
    if x == 0.0 {
        "0".to_string()
    } else {
        format!("{x}")
    }
}

fn bracketed(xs: &[f64]) -> String {
    let parts: Vec<String> = xs.iter().map(|&x| format_number(x)).collect();
    format!("[{}]", parts.join(" "))
}

/// Canonical text. Matrices flatten row-major and lose their row boundaries.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(x) => f.write_str(&format_number(*x)),
            Value::Vector(v) => f.write_str(&bracketed(v)),
            Value::Matrix(m) => f.write_str(&bracketed(m.data())),
        }
    }
}

//! Tree-walking evaluator.
//!
//! A single post-order walk: children first (left to right), then the node's
//! operator. The first failing node aborts the walk. Nothing global is read or
//! written, so evaluation of the same tree always yields the same value.

use crate::ast::{BinOp, Expr, UnOp};
use crate::builtins::Builtin;
use crate::error::{EvalError, ExprError};
use crate::parser::parse_str;
use crate::value::{Matrix, Value};

pub fn evaluate(expr: &Expr) -> Result<Value, EvalError> {
    match expr {
        Expr::NumberLiteral(x) => Value::Scalar(*x).finite("literal"),
        Expr::VectorLiteral(elements) => {
            let values = elements
                .iter()
                .map(|e| scalar_entry(e, "vector literal"))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Vector(values))
        }
        Expr::MatrixLiteral(rows) => {
            let rows = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|e| scalar_entry(e, "matrix literal"))
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Matrix(Matrix::from_rows(rows)?))
        }
        Expr::BinaryOp { op, left, right } => {
            let l = evaluate(left)?;
            let r = evaluate(right)?;
            match op {
                BinOp::Add => l.add(&r),
                BinOp::Sub => l.sub(&r),
                BinOp::Mul => l.mul(&r),
                BinOp::Div => l.div(&r),
            }
        }
        Expr::UnaryOp { op, operand } => {
            let v = evaluate(operand)?;
            Ok(match op {
                UnOp::Neg => v.neg(),
                UnOp::Transpose => v.transpose(),
            })
        }
        Expr::FunctionCall { name, args } => {
            let values = args.iter().map(evaluate).collect::<Result<Vec<_>, _>>()?;
            let builtin = Builtin::resolve(name)
                .ok_or_else(|| EvalError::UnknownFunction { name: name.clone() })?;
            builtin.apply(&values)
        }
    }
}

fn scalar_entry(expr: &Expr, op: &str) -> Result<f64, EvalError> {
    match evaluate(expr)? {
        Value::Scalar(x) => Ok(x),
        other => Err(EvalError::Type {
            op: op.to_string(),
            operands: vec![other.shape()],
            detail: "elements must be scalars".to_string(),
        }),
    }
}

/// Tokenize, parse and evaluate.
pub fn evaluate_str(text: &str) -> Result<Value, ExprError> {
    let ast = parse_str(text)?;
    Ok(evaluate(&ast)?)
}

/// Everything a caller needs to persist and index one expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub ast: Expr,
    pub value: Value,
    pub canonical: String,
}

/// Reject a tree holding a literal with more than `limit` elements in any
/// vector, matrix row or row list. Runs before any arithmetic.
pub fn check_literal_size(ast: &Expr, limit: usize) -> Result<(), EvalError> {
    let dim = ast.max_literal_dimension();
    if dim > limit {
        return Err(EvalError::Shape {
            op: "literal".to_string(),
            detail: format!("{dim} elements exceeds the limit of {limit}"),
        });
    }
    Ok(())
}

/// Like `evaluate_str`, but keeps the tree alongside the result.
pub fn run(text: &str) -> Result<Evaluation, ExprError> {
    run_within(text, usize::MAX)
}

/// `run` with literal sizes bounded by `limit`.
pub fn run_within(text: &str, limit: usize) -> Result<Evaluation, ExprError> {
    let ast = parse_str(text)?;
    check_literal_size(&ast, limit)?;
    let value = evaluate(&ast)?;
    let canonical = value.to_string();
    Ok(Evaluation {
        ast,
        value,
        canonical,
    })
}

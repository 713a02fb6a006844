use crate::error::EvalError;
use crate::linalg;
use crate::value::{Matrix, Value};

/// Functions callable from expressions. Names resolve case-insensitively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Det,
    Inv,
    Dot,
    Cross,
    Norm,
    Trace,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Self::Det,
        Self::Inv,
        Self::Dot,
        Self::Cross,
        Self::Norm,
        Self::Trace,
    ];

    pub fn resolve(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(name))
    }

    /// Canonical spelling.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Det => "Det",
            Self::Inv => "Inv",
            Self::Dot => "Dot",
            Self::Cross => "Cross",
            Self::Norm => "Norm",
            Self::Trace => "Trace",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Dot | Self::Cross => 2,
            Self::Det | Self::Inv | Self::Norm | Self::Trace => 1,
        }
    }

    pub fn apply(&self, args: &[Value]) -> Result<Value, EvalError> {
        if args.len() != self.arity() {
            return Err(EvalError::Type {
                op: self.name().to_string(),
                operands: args.iter().map(Value::shape).collect(),
                detail: format!(
                    "expects {} argument(s), got {}",
                    self.arity(),
                    args.len()
                ),
            });
        }

        let out = match self {
            Self::Det => Value::Scalar(linalg::det(self.square(&args[0])?)),
            Self::Inv => {
                let m = self.square(&args[0])?;
                let inv = linalg::inverse(m).ok_or_else(|| EvalError::Singular {
                    op: self.name().to_string(),
                    det: linalg::det(m),
                })?;
                Value::Matrix(inv)
            }
            Self::Trace => Value::Scalar(linalg::trace(self.square(&args[0])?)),
            Self::Dot => {
                let (a, b) = self.vector_pair(args)?;
                Value::Scalar(a.iter().zip(b).map(|(x, y)| x * y).sum())
            }
            Self::Cross => {
                let (a, b) = self.vector_pair(args)?;
                if a.len() != 3 {
                    return Err(EvalError::Dimension {
                        op: self.name().to_string(),
                        left: args[0].shape(),
                        right: args[1].shape(),
                    });
                }
                Value::Vector(vec![
                    a[1] * b[2] - a[2] * b[1],
                    a[2] * b[0] - a[0] * b[2],
                    a[0] * b[1] - a[1] * b[0],
                ])
            }
            Self::Norm => {
                let Value::Vector(v) = &args[0] else {
                    return Err(self.wrong_kind(args, "argument must be a vector"));
                };
                Value::Scalar(v.iter().map(|x| x * x).sum::<f64>().sqrt())
            }
        };
        out.finite(self.name())
    }

    fn wrong_kind(&self, args: &[Value], detail: &str) -> EvalError {
        EvalError::Type {
            op: self.name().to_string(),
            operands: args.iter().map(Value::shape).collect(),
            detail: detail.to_string(),
        }
    }

    fn square<'v>(&self, arg: &'v Value) -> Result<&'v Matrix, EvalError> {
        let Value::Matrix(m) = arg else {
            return Err(self.wrong_kind(std::slice::from_ref(arg), "argument must be a matrix"));
        };
        if !m.is_square() {
            return Err(EvalError::Shape {
                op: self.name().to_string(),
                detail: format!("requires a square matrix, got {}", m.shape()),
            });
        }
        Ok(m)
    }

    fn vector_pair<'v>(&self, args: &'v [Value]) -> Result<(&'v [f64], &'v [f64]), EvalError> {
        match (&args[0], &args[1]) {
            (Value::Vector(a), Value::Vector(b)) => {
                if a.len() != b.len() {
                    return Err(EvalError::Dimension {
                        op: self.name().to_string(),
                        left: args[0].shape(),
                        right: args[1].shape(),
                    });
                }
                Ok((a.as_slice(), b.as_slice()))
            }
            _ => Err(self.wrong_kind(args, "arguments must be vectors")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mat(rows: usize, cols: usize, data: &[f64]) -> Value {
        Value::Matrix(Matrix::new(rows, cols, data.to_vec()).unwrap())
    }

    #[test]
    fn test_resolve_case_insensitive() {
        assert_eq!(Builtin::resolve("det"), Some(Builtin::Det));
        assert_eq!(Builtin::resolve("CROSS"), Some(Builtin::Cross));
        assert_eq!(Builtin::resolve("Frobnicate"), None);
    }

    #[test]
    fn test_det_requires_square() {
        let err = Builtin::Det.apply(&[mat(2, 3, &[0.0; 6])]).unwrap_err();
        assert!(matches!(err, EvalError::Shape { .. }));
        let err = Builtin::Det.apply(&[Value::Scalar(1.0)]).unwrap_err();
        assert!(matches!(err, EvalError::Type { .. }));
    }

    #[test]
    fn test_inv_singular() {
        let err = Builtin::Inv
            .apply(&[mat(2, 2, &[1.0, 2.0, 2.0, 4.0])])
            .unwrap_err();
        assert!(matches!(err, EvalError::Singular { .. }));
    }

    #[test]
    fn test_dot_cross_norm() {
        let a = Value::Vector(vec![1.0, 0.0, 0.0]);
        let b = Value::Vector(vec![0.0, 1.0, 0.0]);
        assert_eq!(
            Builtin::Dot.apply(&[a.clone(), b.clone()]).unwrap(),
            Value::Scalar(0.0)
        );
        assert_eq!(
            Builtin::Cross.apply(&[a, b]).unwrap(),
            Value::Vector(vec![0.0, 0.0, 1.0])
        );
        let n = Builtin::Norm
            .apply(&[Value::Vector(vec![3.0, 4.0])])
            .unwrap();
        assert_relative_eq!(n.as_scalar().unwrap(), 5.0);
    }

    #[test]
    fn test_cross_requires_length_three() {
        let a = Value::Vector(vec![1.0, 2.0]);
        assert!(matches!(
            Builtin::Cross.apply(&[a.clone(), a]),
            Err(EvalError::Dimension { .. })
        ));
    }

    #[test]
    fn test_dot_length_mismatch() {
        let err = Builtin::Dot
            .apply(&[Value::Vector(vec![1.0]), Value::Vector(vec![1.0, 2.0])])
            .unwrap_err();
        assert!(matches!(err, EvalError::Dimension { .. }));
    }

    #[test]
    fn test_arity() {
        let err = Builtin::Dot.apply(&[Value::Vector(vec![1.0])]).unwrap_err();
        assert!(err.to_string().contains("expects 2 argument(s), got 1"));
    }

    #[test]
    fn test_trace() {
        assert_eq!(
            Builtin::Trace.apply(&[mat(2, 2, &[1.0, 2.0, 3.0, 4.0])]).unwrap(),
            Value::Scalar(5.0)
        );
    }
}

//! Error taxonomy for every stage of the pipeline.
//!
//! Each stage returns exactly one typed error; `ExprError` unifies them for
//! callers that drive the whole text → value pipeline.

use std::fmt;

use crate::value::Shape;

/// Unrecognized character in the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexError {
    /// Byte offset of the offending character.
    pub offset: usize,
    pub unexpected: char,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unexpected character '{}' at offset {}",
            self.unexpected, self.offset
        )
    }
}

impl std::error::Error for LexError {}

/// Grammar violation: the parser wanted `expected` but saw `found`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub offset: usize,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {} but found {} at offset {}",
            self.expected, self.found, self.offset
        )
    }
}

impl std::error::Error for ParseError {}

/// Semantic failure raised while walking the AST.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalError {
    /// Elementwise or product operands whose dimensions disagree.
    Dimension {
        op: String,
        left: Shape,
        right: Shape,
    },
    /// Operator or function applied to an unsupported shape combination.
    Type {
        op: String,
        operands: Vec<Shape>,
        detail: String,
    },
    /// Ragged matrix literal, or non-square argument where square is required.
    Shape { op: String, detail: String },
    /// Inverse of a matrix whose determinant is within epsilon of zero.
    Singular { op: String, det: f64 },
    /// Division by zero or a non-finite result.
    Arithmetic { op: String, detail: String },
    UnknownFunction { name: String },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Dimension { op, left, right } => {
                write!(f, "dimension mismatch in '{op}': {left} vs {right}")
            }
            EvalError::Type {
                op,
                operands,
                detail,
            } => {
                let shapes: Vec<String> = operands.iter().map(|s| s.to_string()).collect();
                write!(f, "'{op}' not defined for ({}): {detail}", shapes.join(", "))
            }
            EvalError::Shape { op, detail } => write!(f, "bad shape in '{op}': {detail}"),
            EvalError::Singular { op, det } => {
                write!(f, "'{op}' of a singular matrix (det = {det:e})")
            }
            EvalError::Arithmetic { op, detail } => write!(f, "arithmetic error in '{op}': {detail}"),
            EvalError::UnknownFunction { name } => write!(f, "unknown function '{name}'"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Coarse classification of an `ExprError`, stable across message changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lex,
    Parse,
    Dimension,
    Type,
    Shape,
    Singular,
    Arithmetic,
    UnknownFunction,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lex => "lex",
            Self::Parse => "parse",
            Self::Dimension => "dimension",
            Self::Type => "type",
            Self::Shape => "shape",
            Self::Singular => "singular",
            Self::Arithmetic => "arithmetic",
            Self::UnknownFunction => "unknown_function",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any failure along text → tokens → AST → value.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprError {
    Lex(LexError),
    Parse(ParseError),
    Eval(EvalError),
}

impl ExprError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExprError::Lex(_) => ErrorKind::Lex,
            ExprError::Parse(_) => ErrorKind::Parse,
            ExprError::Eval(e) => match e {
                EvalError::Dimension { .. } => ErrorKind::Dimension,
                EvalError::Type { .. } => ErrorKind::Type,
                EvalError::Shape { .. } => ErrorKind::Shape,
                EvalError::Singular { .. } => ErrorKind::Singular,
                EvalError::Arithmetic { .. } => ErrorKind::Arithmetic,
                EvalError::UnknownFunction { .. } => ErrorKind::UnknownFunction,
            },
        }
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::Lex(e) => write!(f, "{e}"),
            ExprError::Parse(e) => write!(f, "{e}"),
            ExprError::Eval(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ExprError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExprError::Lex(e) => Some(e),
            ExprError::Parse(e) => Some(e),
            ExprError::Eval(e) => Some(e),
        }
    }
}

impl From<LexError> for ExprError {
    fn from(e: LexError) -> Self {
        ExprError::Lex(e)
    }
}

impl From<ParseError> for ExprError {
    fn from(e: ParseError) -> Self {
        ExprError::Parse(e)
    }
}

impl From<EvalError> for ExprError {
    fn from(e: EvalError) -> Self {
        ExprError::Eval(e)
    }
}

use std::fmt;

use crate::value::format_number;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Transpose,
}

/// Expression tree. Each node owns its children; the tree is never mutated
/// after parsing.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    NumberLiteral(f64),
    VectorLiteral(Vec<Expr>),
    /// Row lengths are not checked until evaluation.
    MatrixLiteral(Vec<Vec<Expr>>),
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<Expr>,
    },
    /// Name as written; resolved against the builtin table at evaluation.
    FunctionCall { name: String, args: Vec<Expr> },
}

impl Expr {
    /// Pre-order traversal over every node.
    pub fn walk(&self, visit: &mut impl FnMut(&Expr)) {
        visit(self);
        match self {
            Expr::NumberLiteral(_) => {}
            Expr::VectorLiteral(elements) => elements.iter().for_each(|e| e.walk(visit)),
            Expr::MatrixLiteral(rows) => rows.iter().flatten().for_each(|e| e.walk(visit)),
            Expr::BinaryOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::UnaryOp { operand, .. } => operand.walk(visit),
            Expr::FunctionCall { args, .. } => args.iter().for_each(|a| a.walk(visit)),
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        let mut n = 0;
        self.walk(&mut |_| n += 1);
        n
    }

    /// Largest element count of any literal vector, matrix row or matrix row
    /// list. Lets a caller bound work before evaluation.
    pub fn max_literal_dimension(&self) -> usize {
        let mut max = 0;
        self.walk(&mut |e| {
            let dim = match e {
                Expr::VectorLiteral(elements) => elements.len(),
                Expr::MatrixLiteral(rows) => rows
                    .iter()
                    .map(Vec::len)
                    .max()
                    .unwrap_or(0)
                    .max(rows.len()),
                _ => 0,
            };
            max = max.max(dim);
        });
        max
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Fully parenthesised source form; re-parses to an identical tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::NumberLiteral(x) => f.write_str(&format_number(*x)),
            Expr::VectorLiteral(elements) => {
                f.write_str("[")?;
                write_list(f, elements)?;
                f.write_str("]")
            }
            Expr::MatrixLiteral(rows) => {
                f.write_str("[")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str("[")?;
                    write_list(f, row)?;
                    f.write_str("]")?;
                }
                f.write_str("]")
            }
            Expr::BinaryOp { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
            // The space keeps the lexer from folding the sign into a literal.
            Expr::UnaryOp {
                op: UnOp::Neg,
                operand,
            } => write!(f, "(- {operand})"),
            Expr::UnaryOp {
                op: UnOp::Transpose,
                operand,
            } => write!(f, "{operand}'"),
            Expr::FunctionCall { name, args } => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
        }
    }
}

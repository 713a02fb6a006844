//! Recursive-descent parser.
//!
//! ```text
//! expr     := term (('+'|'-') term)*
//! term     := unary (('*'|'/') unary)*
//! unary    := '-' unary | postfix
//! postfix  := primary ("'")*
//! primary  := NUMBER | bracket | IDENT '(' args? ')' | '(' expr ')'
//! bracket  := '[' (expr (','? expr)*)? ']'
//! ```
//!
//! A bracket list whose elements are all bracket literals is a matrix,
//! anything else is a vector. Inside brackets whitespace also separates
//! elements, so `[1 2 3]` reads like `[1, 2, 3]`. There a minus with space
//! before it and none after starts a new element: `[1 -2]` has two elements,
//! `[1 - 2]` has one.
//!
//! Nesting in the source is bounded by [`MAX_NESTING`] and the height of the
//! resulting tree by [`MAX_DEPTH`]; deeper input is a parse error.

use crate::ast::{BinOp, Expr, UnOp};
use crate::constants::{MAX_DEPTH, MAX_NESTING};
use crate::error::{ExprError, ParseError};
use crate::lexer::{Token, TokenKind, tokenize};

/// A subtree together with its height.
type Parsed = (Expr, usize);

pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    eof: Token,
    /// Directly inside a bracket list, where whitespace separates elements.
    in_brackets: bool,
    /// Open parentheses, brackets, calls and prefix minuses.
    depth: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        let end = tokens.last().map_or(0, |t| t.offset + t.text.len());
        Self {
            tokens,
            pos: 0,
            eof: Token {
                kind: TokenKind::Eof,
                text: String::new(),
                offset: end,
                spaced: false,
            },
            in_brackets: false,
            depth: 0,
        }
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        self.tokens.get(self.pos + ahead).unwrap_or(&self.eof)
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos;
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        self.tokens.get(index).unwrap_or(&self.eof)
    }

    fn error(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError {
            offset: token.offset,
            expected: expected.to_string(),
            found: token.describe(),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.peek().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        let (expr, _) = self.expr()?;
        if self.peek().kind != TokenKind::Eof {
            return Err(self.error("end of input"));
        }
        Ok(expr)
    }

    /// Run `f` one nesting level deeper.
    fn descend<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("shallower nesting"));
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    /// Run `f` one level deeper with bracket separation switched on or off,
    /// restoring after.
    fn nested<T>(
        &mut self,
        in_brackets: bool,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.descend(|p| {
            let saved = std::mem::replace(&mut p.in_brackets, in_brackets);
            let out = f(p);
            p.in_brackets = saved;
            out
        })
    }

    /// Height of a node whose tallest child is `child` high.
    fn grow(&self, child: usize) -> Result<usize, ParseError> {
        if child >= MAX_DEPTH {
            return Err(self.error("shallower nesting"));
        }
        Ok(child + 1)
    }

    /// A spaced `-` glued to its operand ends the current bracket element.
    fn is_element_break(&self) -> bool {
        self.in_brackets && self.peek().spaced && !self.peek_at(1).spaced
    }

    fn expr(&mut self) -> Result<Parsed, ParseError> {
        let (mut left, mut height) = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            if op == BinOp::Sub && self.is_element_break() {
                break;
            }
            self.advance();
            let (right, right_height) = self.term()?;
            height = self.grow(height.max(right_height))?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok((left, height))
    }

    fn term(&mut self) -> Result<Parsed, ParseError> {
        let (mut left, mut height) = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let (right, right_height) = self.unary()?;
            height = self.grow(height.max(right_height))?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok((left, height))
    }

    fn unary(&mut self) -> Result<Parsed, ParseError> {
        if self.peek().kind == TokenKind::Minus {
            self.advance();
            let (operand, height) = self.descend(Self::unary)?;
            let height = self.grow(height)?;
            return Ok((
                Expr::UnaryOp {
                    op: UnOp::Neg,
                    operand: Box::new(operand),
                },
                height,
            ));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Parsed, ParseError> {
        let (mut expr, mut height) = self.primary()?;
        while self.peek().kind == TokenKind::Quote {
            height = self.grow(height)?;
            self.advance();
            expr = Expr::UnaryOp {
                op: UnOp::Transpose,
                operand: Box::new(expr),
            };
        }
        Ok((expr, height))
    }

    fn primary(&mut self) -> Result<Parsed, ParseError> {
        match self.peek().kind {
            TokenKind::Number(value) => {
                self.advance();
                Ok((Expr::NumberLiteral(value), 1))
            }
            TokenKind::LBracket => self.bracket(),
            TokenKind::Ident => self.call(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.nested(false, Self::expr)?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.error("expression")),
        }
    }

    fn call(&mut self) -> Result<Parsed, ParseError> {
        let name = self.advance().text.clone();
        self.expect(TokenKind::LParen, "'(' after function name")?;
        let (args, tallest) = self.nested(false, Self::list_until_paren)?;
        self.expect(TokenKind::RParen, "',' or ')'")?;
        let height = self.grow(tallest)?;
        Ok((Expr::FunctionCall { name, args }, height))
    }

    /// Comma-separated call arguments and the height of the tallest.
    fn list_until_paren(&mut self) -> Result<(Vec<Expr>, usize), ParseError> {
        let mut args = Vec::new();
        let mut tallest = 0;
        if self.peek().kind == TokenKind::RParen {
            return Ok((args, tallest));
        }
        loop {
            let (arg, height) = self.expr()?;
            args.push(arg);
            tallest = tallest.max(height);
            if self.peek().kind != TokenKind::Comma {
                break;
            }
            self.advance();
        }
        Ok((args, tallest))
    }

    fn bracket(&mut self) -> Result<Parsed, ParseError> {
        self.advance();
        let (elements, tallest) = self.nested(true, |p| {
            let mut elements = Vec::new();
            let mut tallest = 0;
            if p.peek().kind == TokenKind::RBracket {
                return Ok((elements, tallest));
            }
            loop {
                let (element, height) = p.expr()?;
                elements.push(element);
                tallest = tallest.max(height);
                match p.peek().kind {
                    TokenKind::Comma => {
                        p.advance();
                    }
                    TokenKind::RBracket => break,
                    TokenKind::Number(_)
                    | TokenKind::Ident
                    | TokenKind::LBracket
                    | TokenKind::LParen
                    | TokenKind::Minus
                        if p.peek().spaced => {}
                    _ => return Err(p.error("',' or ']'")),
                }
            }
            Ok((elements, tallest))
        })?;
        self.expect(TokenKind::RBracket, "']'")?;
        let height = self.grow(tallest)?;

        let is_matrix = !elements.is_empty()
            && elements.iter().all(|e| matches!(e, Expr::VectorLiteral(_)));
        if is_matrix {
            let rows = elements
                .into_iter()
                .map(|e| match e {
                    Expr::VectorLiteral(row) => row,
                    other => vec![other],
                })
                .collect();
            Ok((Expr::MatrixLiteral(rows), height))
        } else {
            Ok((Expr::VectorLiteral(elements), height))
        }
    }
}

/// Parse a token stream produced by `tokenize`.
pub fn parse(tokens: &[Token]) -> Result<Expr, ParseError> {
    Parser::new(tokens).parse()
}

/// Tokenize and parse in one step.
pub fn parse_str(text: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(text)?;
    Ok(parse(&tokens)?)
}

use regex::Regex;
use std::sync::LazyLock;

use crate::error::LexError;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").unwrap());
static IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap());

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident,
    Plus,
    Minus,
    Star,
    Slash,
    /// Postfix transpose marker `'`.
    Quote,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character.
    pub offset: usize,
    /// Whitespace immediately preceded this token.
    pub spaced: bool,
}

impl Token {
    /// How the token reads in error messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

/// A sign folds into a number only where no operand can precede it.
fn prefix_position(last: Option<&Token>) -> bool {
    match last.map(|t| t.kind) {
        None => true,
        Some(kind) => matches!(
            kind,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::Comma
        ),
    }
}

fn punctuation(c: char) -> Option<TokenKind> {
    Some(match c {
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '*' => TokenKind::Star,
        '/' => TokenKind::Slash,
        '\'' => TokenKind::Quote,
        '(' => TokenKind::LParen,
        ')' => TokenKind::RParen,
        '[' => TokenKind::LBracket,
        ']' => TokenKind::RBracket,
        ',' => TokenKind::Comma,
        _ => return None,
    })
}

/// Split source text into tokens, always ending with an `Eof` token.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut pos = 0;
    let mut spaced = false;

    while let Some(c) = text[pos..].chars().next() {
        if c.is_whitespace() {
            pos += c.len_utf8();
            spaced = true;
            continue;
        }

        let rest = &text[pos..];
        let signed = matches!(c, '+' | '-') && prefix_position(tokens.last());
        let number_len = if signed {
            NUMBER.find(&rest[1..]).map(|m| m.end() + 1)
        } else {
            NUMBER.find(rest).map(|m| m.end())
        };

        let (kind, len) = if let Some(len) = number_len {
            let literal = &rest[..len];
            let value = literal.parse::<f64>().map_err(|_| LexError {
                offset: pos,
                unexpected: c,
            })?;
            (TokenKind::Number(value), len)
        } else if let Some(m) = IDENT.find(rest) {
            (TokenKind::Ident, m.end())
        } else if let Some(kind) = punctuation(c) {
            (kind, c.len_utf8())
        } else {
            return Err(LexError {
                offset: pos,
                unexpected: c,
            });
        };

        tokens.push(Token {
            kind,
            text: rest[..len].to_string(),
            offset: pos,
            spaced,
        });
        pos += len;
        spaced = false;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        offset: text.len(),
        spaced,
    });
    Ok(tokens)
}

// src/expr/parse.rs

//! Textual form of right-hand-side expressions.
//!
//! Grammar (whitespace-insensitive):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor ('*' factor)*
//! factor := '(' expr ')' | NUMBER | IDENT ('[' indices ']')?
//! ```
//!
//! Scalar literals are multipliers: `0.5 * D` parses to a scaled term, and a
//! term that references no tensor at all (`A + 2`) is rejected. Parsing is
//! two-phase: [`parse`] produces an unbound [`ParsedExpr`] over tensor names
//! (which the config validator checks), and [`ParsedExpr::bind`] resolves
//! names to handles when a rank builds its schedule.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::expr::Expr;
use crate::tensor::TensorHandle;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("trailing input at position {0}")]
    TrailingInput(usize),

    #[error("unterminated index list starting at position {0}")]
    UnterminatedIndices(usize),

    #[error("term references no tensor (pure scalars are only allowed as multipliers)")]
    ScalarOnly,

    #[error("unknown tensor '{0}'")]
    UnknownTensor(String),
}

/// An expression over tensor *names*, not yet resolved to handles.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedExpr {
    Term { name: String, indices: String },
    Scaled(f64, Box<ParsedExpr>),
    Add(Box<ParsedExpr>, Box<ParsedExpr>),
    Sub(Box<ParsedExpr>, Box<ParsedExpr>),
    Mul(Box<ParsedExpr>, Box<ParsedExpr>),
}

impl ParsedExpr {
    /// Collect every tensor name this expression mentions.
    pub fn tensor_names(&self, out: &mut BTreeSet<String>) {
        match self {
            ParsedExpr::Term { name, .. } => {
                out.insert(name.clone());
            }
            ParsedExpr::Scaled(_, e) => e.tensor_names(out),
            ParsedExpr::Add(l, r) | ParsedExpr::Sub(l, r) | ParsedExpr::Mul(l, r) => {
                l.tensor_names(out);
                r.tensor_names(out);
            }
        }
    }

    /// Resolve tensor names against declared handles.
    pub fn bind(&self, tensors: &BTreeMap<String, TensorHandle>) -> Result<Expr, ParseError> {
        match self {
            ParsedExpr::Term { name, indices } => {
                let handle = tensors
                    .get(name)
                    .ok_or_else(|| ParseError::UnknownTensor(name.clone()))?;
                Ok(Expr::Term(handle.index(indices)))
            }
            ParsedExpr::Scaled(s, e) => Ok(Expr::Scaled(*s, Box::new(e.bind(tensors)?))),
            ParsedExpr::Add(l, r) => Ok(Expr::Add(
                Box::new(l.bind(tensors)?),
                Box::new(r.bind(tensors)?),
            )),
            ParsedExpr::Sub(l, r) => Ok(Expr::Sub(
                Box::new(l.bind(tensors)?),
                Box::new(r.bind(tensors)?),
            )),
            ParsedExpr::Mul(l, r) => Ok(Expr::Mul(
                Box::new(l.bind(tensors)?),
                Box::new(r.bind(tensors)?),
            )),
        }
    }
}

/// Parse an expression string into an unbound [`ParsedExpr`].
pub fn parse(input: &str) -> Result<ParsedExpr, ParseError> {
    let mut p = Parser::new(input);
    let expr = p.expr()?;
    p.skip_ws();
    if p.pos < p.chars.len() {
        return Err(ParseError::TrailingInput(p.pos));
    }
    Ok(expr)
}

/// Parse a left-hand side: a tensor name with optional index list, e.g.
/// `A` or `A[ij]`. Returns `(name, indices)`.
pub fn parse_lhs(input: &str) -> Result<(String, String), ParseError> {
    let mut p = Parser::new(input);
    p.skip_ws();
    let name = p.ident()?;
    let indices = p.opt_indices()?;
    p.skip_ws();
    if p.pos < p.chars.len() {
        return Err(ParseError::TrailingInput(p.pos));
    }
    Ok((name, indices))
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

/// A multiplicative chain under construction: the product of scalar factors,
/// and the product of tensor factors seen so far.
struct Term {
    scale: f64,
    saw_scalar: bool,
    expr: Option<ParsedExpr>,
}

impl Parser {
    fn new(input: &str) -> Self {
        Parser {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Result<ParsedExpr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    lhs = ParsedExpr::Add(Box::new(lhs), Box::new(rhs));
                }
                Some('-') => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    lhs = ParsedExpr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> Result<ParsedExpr, ParseError> {
        let mut term = Term {
            scale: 1.0,
            saw_scalar: false,
            expr: None,
        };
        self.factor_into(&mut term)?;
        loop {
            self.skip_ws();
            if self.peek() == Some('*') {
                self.pos += 1;
                self.factor_into(&mut term)?;
            } else {
                break;
            }
        }

        let expr = term.expr.ok_or(ParseError::ScalarOnly)?;
        if term.saw_scalar {
            Ok(ParsedExpr::Scaled(term.scale, Box::new(expr)))
        } else {
            Ok(expr)
        }
    }

    fn factor_into(&mut self, term: &mut Term) -> Result<(), ParseError> {
        self.skip_ws();
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let inner = self.expr()?;
                self.skip_ws();
                match self.peek() {
                    Some(')') => self.pos += 1,
                    Some(c) => return Err(ParseError::UnexpectedChar(c, self.pos)),
                    None => return Err(ParseError::UnexpectedEnd),
                }
                term.expr = Some(match term.expr.take() {
                    None => inner,
                    Some(prev) => ParsedExpr::Mul(Box::new(prev), Box::new(inner)),
                });
                Ok(())
            }
            Some(c) if c.is_ascii_digit() => {
                term.scale *= self.number()?;
                term.saw_scalar = true;
                Ok(())
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                let name = self.ident()?;
                let indices = self.opt_indices()?;
                let leaf = ParsedExpr::Term { name, indices };
                term.expr = Some(match term.expr.take() {
                    None => leaf,
                    Some(prev) => ParsedExpr::Mul(Box::new(prev), Box::new(leaf)),
                });
                Ok(())
            }
            Some(c) => Err(ParseError::UnexpectedChar(c, self.pos)),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map_err(|_| ParseError::UnexpectedChar(self.chars[start], start))
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            Some(c) => return Err(ParseError::UnexpectedChar(c, self.pos)),
            None => return Err(ParseError::UnexpectedEnd),
        }
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn opt_indices(&mut self) -> Result<String, ParseError> {
        if self.peek() != Some('[') {
            return Ok(String::new());
        }
        let open = self.pos;
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == ']' {
                let indices: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(indices);
            }
            self.pos += 1;
        }
        Err(ParseError::UnterminatedIndices(open))
    }
}

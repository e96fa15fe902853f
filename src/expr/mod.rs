// src/expr/mod.rs

//! The symbolic expression tree carried on the right-hand side of a recorded
//! assignment.
//!
//! The scheduler consumes three things from an expression: the set of tensors
//! it reads ([`Expr::inputs`]), a deterministic positive cost estimate
//! ([`Expr::estimate_cost`]), and a deep clone with tensor references
//! substituted through a remap table ([`Expr::clone_remapped`]). Evaluation
//! ([`Expr::eval`]) is elementwise over the replicated buffers and is shared
//! by the executor and the eager path.
//!
//! [`parse`] turns the textual form used in config files into an unbound
//! [`ParsedExpr`], which [`ParsedExpr::bind`] resolves against declared
//! tensors.

pub mod parse;

pub use parse::{parse, parse_lhs, ParseError, ParsedExpr};

use std::collections::{BTreeMap, HashMap};

use crate::tensor::{IdxTensor, TensorHandle, TensorId};

/// A right-hand-side expression over indexed tensors.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A single indexed tensor leaf.
    Term(IdxTensor),
    /// A scalar multiple of a sub-expression.
    Scaled(f64, Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Convenience leaf constructor.
    pub fn term(tensor: &TensorHandle, indices: &str) -> Expr {
        Expr::Term(tensor.index(indices))
    }

    /// Collect every tensor this expression reads, keyed (and therefore
    /// iterated) by tid.
    pub fn inputs(&self, out: &mut BTreeMap<TensorId, TensorHandle>) {
        match self {
            Expr::Term(t) => {
                out.insert(t.parent.tid(), t.parent.clone());
            }
            Expr::Scaled(_, e) => e.inputs(out),
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) => {
                l.inputs(out);
                r.inputs(out);
            }
        }
    }

    /// Deterministic, strictly positive cost of computing this expression
    /// into `lhs`. Leaves cost one pass over the operand; additive nodes add
    /// one pass over the destination, multiplicative nodes two.
    pub fn estimate_cost(&self, lhs: &IdxTensor) -> i64 {
        let lhs_elems = lhs.parent.elems() as i64;
        match self {
            Expr::Term(t) => (t.parent.elems() as i64).max(1),
            Expr::Scaled(_, e) => e.estimate_cost(lhs),
            Expr::Add(l, r) | Expr::Sub(l, r) => {
                l.estimate_cost(lhs) + r.estimate_cost(lhs) + lhs_elems
            }
            Expr::Mul(l, r) => l.estimate_cost(lhs) + r.estimate_cost(lhs) + 2 * lhs_elems,
        }
    }

    /// Deep clone substituting every tensor reference through `remap`.
    pub fn clone_remapped(&self, remap: &HashMap<TensorId, TensorHandle>) -> Expr {
        match self {
            Expr::Term(t) => Expr::Term(t.clone_remapped(remap)),
            Expr::Scaled(s, e) => Expr::Scaled(*s, Box::new(e.clone_remapped(remap))),
            Expr::Add(l, r) => Expr::Add(
                Box::new(l.clone_remapped(remap)),
                Box::new(r.clone_remapped(remap)),
            ),
            Expr::Sub(l, r) => Expr::Sub(
                Box::new(l.clone_remapped(remap)),
                Box::new(r.clone_remapped(remap)),
            ),
            Expr::Mul(l, r) => Expr::Mul(
                Box::new(l.clone_remapped(remap)),
                Box::new(r.clone_remapped(remap)),
            ),
        }
    }

    /// Evaluate elementwise against the tensors' current data.
    pub fn eval(&self) -> Vec<f64> {
        match self {
            Expr::Term(t) => t.parent.data(),
            Expr::Scaled(s, e) => {
                let mut v = e.eval();
                for x in v.iter_mut() {
                    *x *= s;
                }
                v
            }
            Expr::Add(l, r) => zip_eval(l, r, |a, b| a + b),
            Expr::Sub(l, r) => zip_eval(l, r, |a, b| a - b),
            Expr::Mul(l, r) => zip_eval(l, r, |a, b| a * b),
        }
    }
}

fn zip_eval(l: &Expr, r: &Expr, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    let mut lv = l.eval();
    let rv = r.eval();
    assert_eq!(
        lv.len(),
        rv.len(),
        "elementwise operands must have equal length"
    );
    for (a, b) in lv.iter_mut().zip(rv.iter()) {
        *a = f(*a, *b);
    }
    lv
}

// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::dag::OpKind;

/// Top-level problem description as read from a TOML file:
///
/// ```toml
/// [run]
/// ranks = 4
/// partitions = 0
///
/// [tensor.A]
/// elems = 100
/// fill = 1.0
///
/// [[step]]
/// lhs = "A"
/// op = "set"
/// rhs = "B * C + 0.5 * D"
/// ```
///
/// All sections are optional and have reasonable defaults, except that a
/// useful file declares at least one tensor.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Execution parameters from `[run]`.
    #[serde(default)]
    pub run: RunSection,

    /// All tensors from `[tensor.<name>]`, keyed by tensor name.
    #[serde(default)]
    pub tensor: BTreeMap<String, TensorConfig>,

    /// The recorded assignment sequence, in order, from `[[step]]`.
    #[serde(default, rename = "step")]
    pub steps: Vec<StepConfig>,
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Number of simulated ranks in the process grid.
    #[serde(default = "default_ranks")]
    pub ranks: usize,

    /// Cap on concurrent tasks per wave; 0 means unbounded.
    #[serde(default)]
    pub partitions: usize,
}

fn default_ranks() -> usize {
    1
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            ranks: default_ranks(),
            partitions: 0,
        }
    }
}

/// `[tensor.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TensorConfig {
    /// Element count; must be at least 1.
    pub elems: usize,

    /// Initial value for every element.
    #[serde(default)]
    pub fill: f64,
}

/// One `[[step]]` entry: `lhs <op> rhs`.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    /// Target tensor, optionally indexed: `"A"` or `"A[ij]"`.
    pub lhs: String,

    /// One of `"set"`, `"add"`, `"sub"`, `"mul"`.
    pub op: String,

    /// Right-hand-side expression, e.g. `"B * C + 0.5 * D"`.
    pub rhs: String,
}

impl StepConfig {
    /// Parse the `op` field into an assignment kind.
    pub fn kind(&self) -> Option<OpKind> {
        match self.op.trim().to_lowercase().as_str() {
            "set" => Some(OpKind::Set),
            "add" => Some(OpKind::Sum),
            "sub" => Some(OpKind::Subtract),
            "mul" => Some(OpKind::Multiply),
            _ => None,
        }
    }
}

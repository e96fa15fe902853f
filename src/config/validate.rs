// src/config/validate.rs

use std::collections::BTreeSet;

use crate::config::model::ConfigFile;
use crate::errors::{Result, TensordagError};
use crate::expr;

/// Run semantic validation against a loaded problem description.
///
/// This checks:
/// - there is at least one tensor
/// - `ranks >= 1` and every tensor has `elems >= 1`
/// - every step's `op` is one of set/add/sub/mul
/// - every step's `lhs` and every tensor named in its `rhs` is declared
/// - every `rhs` parses
/// - all tensors touched by one step have the same element count
///   (evaluation is elementwise)
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_tensors(cfg)?;
    validate_run(cfg)?;
    validate_tensors(cfg)?;
    validate_steps(cfg)?;
    Ok(())
}

fn ensure_has_tensors(cfg: &ConfigFile) -> Result<()> {
    if cfg.tensor.is_empty() {
        return Err(TensordagError::Config(
            "config must contain at least one [tensor.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_run(cfg: &ConfigFile) -> Result<()> {
    if cfg.run.ranks == 0 {
        return Err(TensordagError::Config(
            "[run].ranks must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_tensors(cfg: &ConfigFile) -> Result<()> {
    for (name, tensor) in cfg.tensor.iter() {
        if tensor.elems == 0 {
            return Err(TensordagError::Config(format!(
                "tensor '{name}' must have at least one element (elems = 0)"
            )));
        }
    }
    Ok(())
}

fn validate_steps(cfg: &ConfigFile) -> Result<()> {
    for (i, step) in cfg.steps.iter().enumerate() {
        step.kind().ok_or_else(|| {
            TensordagError::Config(format!(
                "step {} has invalid op '{}' (expected set, add, sub or mul)",
                i, step.op
            ))
        })?;

        let (lhs_name, _) = expr::parse_lhs(&step.lhs).map_err(|err| {
            TensordagError::Config(format!("step {} has invalid lhs '{}': {}", i, step.lhs, err))
        })?;
        if !cfg.tensor.contains_key(&lhs_name) {
            return Err(TensordagError::UnknownTensor(lhs_name));
        }

        let parsed = expr::parse(&step.rhs).map_err(|err| {
            TensordagError::Config(format!("step {} has invalid rhs '{}': {}", i, step.rhs, err))
        })?;

        let mut names = BTreeSet::new();
        parsed.tensor_names(&mut names);
        for name in &names {
            if !cfg.tensor.contains_key(name) {
                return Err(TensordagError::UnknownTensor(name.clone()));
            }
        }

        // Evaluation is elementwise, so everything one step touches must
        // agree on length.
        let lhs_elems = cfg.tensor[&lhs_name].elems;
        for name in &names {
            let elems = cfg.tensor[name].elems;
            if elems != lhs_elems {
                return Err(TensordagError::Config(format!(
                    "step {i} mixes tensors of different sizes: '{lhs_name}' has {lhs_elems} elements, '{name}' has {elems}"
                )));
            }
        }
    }
    Ok(())
}

// src/dag/op.rs

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};

use crate::dag::record;
use crate::expr::Expr;
use crate::tensor::{IdxTensor, TensorHandle, TensorId};

/// Index of an operation in its schedule's arena.
pub type OpId = usize;

/// Kind of a recorded tensor assignment.
///
/// `None` is the dummy anchor synthesised for tensors that are first read
/// without a prior write; it never touches data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    None,
    Set,
    Sum,
    Subtract,
    Multiply,
}

impl OpKind {
    /// Assignment operator spelling, used in operation names.
    pub fn symbol(&self) -> &'static str {
        match self {
            OpKind::None => "",
            OpKind::Set => "=",
            OpKind::Sum => "+=",
            OpKind::Subtract => "-=",
            OpKind::Multiply => "*=",
        }
    }
}

/// One recorded tensor assignment: `lhs <op> rhs`, plus the dependency
/// bookkeeping the scheduler hangs off it.
///
/// Operations are immutable after recording apart from `dependency_left`,
/// which `execute()` resets and counts down.
pub struct Operation {
    pub kind: OpKind,
    pub lhs: Option<IdxTensor>,
    pub rhs: Option<Expr>,

    /// Operations that must wait for this one.
    pub successors: Vec<OpId>,
    /// Operations that read this op's output tensor after it writes.
    pub reads: Vec<OpId>,
    /// Total unsatisfied predecessors when execution begins.
    pub dependency_count: usize,
    /// Mutable countdown; ready iff zero.
    pub dependency_left: usize,

    cached_cost: Cell<i64>,
}

impl Operation {
    pub fn new(kind: OpKind, lhs: IdxTensor, rhs: Expr) -> Self {
        assert!(kind != OpKind::None, "dummy operations carry no lhs/rhs");
        Operation {
            kind,
            lhs: Some(lhs),
            rhs: Some(rhs),
            successors: Vec::new(),
            reads: Vec::new(),
            dependency_count: 0,
            dependency_left: 0,
            cached_cost: Cell::new(0),
        }
    }

    /// A dummy root: anchors tensors first read without a prior write.
    pub fn dummy() -> Self {
        Operation {
            kind: OpKind::None,
            lhs: None,
            rhs: None,
            successors: Vec::new(),
            reads: Vec::new(),
            dependency_count: 0,
            dependency_left: 0,
            cached_cost: Cell::new(0),
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.kind == OpKind::None
    }

    /// Display name, e.g. `A+=` for a `Sum` into tensor `A`.
    pub fn name(&self) -> String {
        match &self.lhs {
            Some(lhs) => format!("{}{}", lhs.parent.name(), self.kind.symbol()),
            None => "none".to_string(),
        }
    }

    /// Insert the single output tensor (the lhs parent) into `out`.
    pub fn get_outputs(&self, out: &mut BTreeMap<TensorId, TensorHandle>) {
        let lhs = self
            .lhs
            .as_ref()
            .expect("operation has no lhs tensor");
        out.insert(lhs.parent.tid(), lhs.parent.clone());
    }

    /// Insert every tensor this operation reads into `out`. For all kinds but
    /// `Set`, the lhs is read-modify-write and counts as an input too.
    pub fn get_inputs(&self, out: &mut BTreeMap<TensorId, TensorHandle>) {
        let rhs = self
            .rhs
            .as_ref()
            .expect("operation has no rhs expression");
        rhs.inputs(out);

        match self.kind {
            OpKind::Set => {}
            OpKind::Sum | OpKind::Subtract | OpKind::Multiply => {
                let lhs = self
                    .lhs
                    .as_ref()
                    .expect("operation has no lhs tensor");
                out.insert(lhs.parent.tid(), lhs.parent.clone());
            }
            OpKind::None => panic!("dummy operations have no inputs"),
        }
    }

    /// Memoised cost estimate; strictly positive once computed.
    pub fn estimate_cost(&self) -> i64 {
        if self.cached_cost.get() == 0 {
            let lhs = self.lhs.as_ref().expect("cost of an operation without lhs");
            let rhs = self.rhs.as_ref().expect("cost of an operation without rhs");
            let cost = rhs.estimate_cost(lhs);
            assert!(cost > 0, "cost estimate must be strictly positive");
            self.cached_cost.set(cost);
        }
        self.cached_cost.get()
    }

    /// Apply the operation. With a remap table, lhs and rhs are deep-cloned
    /// to refer to the remapped (sub-world) tensors first; otherwise the
    /// originals are used.
    pub fn execute(&self, remap: Option<&HashMap<TensorId, TensorHandle>>) {
        assert!(
            !record::is_recording(),
            "executing an operation while a schedule is recording on this thread"
        );

        if self.kind == OpKind::None {
            return;
        }

        let lhs = self.lhs.as_ref().expect("operation has no lhs tensor");
        let rhs = self.rhs.as_ref().expect("operation has no rhs expression");

        match remap {
            Some(remap) => {
                let lhs = lhs.clone_remapped(remap);
                let rhs = rhs.clone_remapped(remap);
                apply_assign(self.kind, &lhs, &rhs);
            }
            None => apply_assign(self.kind, lhs, rhs),
        }
    }
}

/// Evaluate `rhs` and fold it into `lhs` according to `kind`. Shared by the
/// executor and the eager (non-recording) assignment path.
pub fn apply_assign(kind: OpKind, lhs: &IdxTensor, rhs: &Expr) {
    let value = rhs.eval();
    lhs.parent.with_data_mut(|data| {
        assert_eq!(
            data.len(),
            value.len(),
            "assignment into '{}' has mismatched length",
            lhs.parent.name()
        );
        match kind {
            OpKind::Set => data.copy_from_slice(&value),
            OpKind::Sum => {
                for (d, v) in data.iter_mut().zip(value.iter()) {
                    *d += v;
                }
            }
            OpKind::Subtract => {
                for (d, v) in data.iter_mut().zip(value.iter()) {
                    *d -= v;
                }
            }
            OpKind::Multiply => {
                for (d, v) in data.iter_mut().zip(value.iter()) {
                    *d *= v;
                }
            }
            OpKind::None => panic!("dummy operations cannot be applied"),
        }
    });
}

// src/tensor.rs

//! Tensor storage and the indexed-assignment surface.
//!
//! Storage is deliberately the simplest engine satisfying the contract the
//! scheduler consumes: dense `f64` buffers, fully replicated on every rank of
//! the owning world. Migration between worlds moves whole buffers:
//! `add_to_subworld` pushes parent data into a sub-world clone,
//! `add_from_subworld` pulls results back through the parent world's exchange
//! primitive so ranks outside the sub-world observe them too.
//!
//! [`TensorId`] gives the stable identity used to key tensor sets and maps.
//! Ids are allocated from a per-thread counter; since every rank runs the
//! identical program, id order agrees across ranks, which is what makes
//! collective iteration over `BTreeMap<TensorId, _>` safe.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dag::op::{apply_assign, OpKind};
use crate::dag::record;
use crate::expr::Expr;
use crate::world::World;

/// Stable tensor identity, ordered identically on every rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TensorId(u64);

thread_local! {
    static NEXT_TID: Cell<u64> = const { Cell::new(0) };
}

fn next_tid() -> TensorId {
    NEXT_TID.with(|next| {
        let tid = next.get();
        next.set(tid + 1);
        TensorId(tid)
    })
}

struct Tensor {
    tid: TensorId,
    name: String,
    data: Vec<f64>,
    world: World,
}

/// Shared-ownership handle to a tensor. Identity is the tid, not the data;
/// cloning the handle does not clone the tensor.
#[derive(Clone)]
pub struct TensorHandle {
    inner: Rc<RefCell<Tensor>>,
}

impl TensorHandle {
    /// Create a tensor of `elems` elements filled with `fill` on `world`.
    pub fn new(name: &str, elems: usize, fill: f64, world: &World) -> Self {
        assert!(elems >= 1, "tensor '{name}' must have at least one element");
        TensorHandle {
            inner: Rc::new(RefCell::new(Tensor {
                tid: next_tid(),
                name: name.to_string(),
                data: vec![fill; elems],
                world: world.clone(),
            })),
        }
    }

    pub fn tid(&self) -> TensorId {
        self.inner.borrow().tid
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn elems(&self) -> usize {
        self.inner.borrow().data.len()
    }

    /// Snapshot of the current data.
    pub fn data(&self) -> Vec<f64> {
        self.inner.borrow().data.clone()
    }

    pub fn world(&self) -> World {
        self.inner.borrow().world.clone()
    }

    pub(crate) fn with_data_mut<R>(&self, f: impl FnOnce(&mut [f64]) -> R) -> R {
        f(&mut self.inner.borrow_mut().data)
    }

    /// Indexed view of this tensor, e.g. `a.index("ij")`.
    pub fn index(&self, indices: &str) -> IdxTensor {
        IdxTensor {
            parent: self.clone(),
            indices: indices.to_string(),
        }
    }

    /// Clone constructor: allocate a logically equivalent tensor on a
    /// different world. Data starts zeroed; movement is `add_to_subworld`'s
    /// job.
    pub fn clone_onto(&self, world: &World) -> TensorHandle {
        let src = self.inner.borrow();
        TensorHandle {
            inner: Rc::new(RefCell::new(Tensor {
                tid: next_tid(),
                name: src.name.clone(),
                data: vec![0.0; src.data.len()],
                world: world.clone(),
            })),
        }
    }

    /// Collective on this tensor's world: scatter this tensor's contribution
    /// into `local` as `local := alpha * self + beta * local`.
    ///
    /// Ranks outside the target sub-world pass `None` and only take part in
    /// the collective.
    pub fn add_to_subworld(&self, local: Option<&TensorHandle>, alpha: f64, beta: f64) {
        if let Some(local) = local {
            let src = self.inner.borrow();
            local.with_data_mut(|dst| {
                assert_eq!(
                    src.data.len(),
                    dst.len(),
                    "sub-world clone of '{}' has mismatched length",
                    src.name
                );
                for (d, s) in dst.iter_mut().zip(src.data.iter()) {
                    *d = alpha * s + beta * *d;
                }
            });
        }
        self.world().barrier();
    }

    /// Collective on this tensor's world: gather the sub-world result back
    /// as `self := alpha * local + beta * self` on every rank.
    pub fn add_from_subworld(&self, local: Option<&TensorHandle>, alpha: f64, beta: f64) {
        let contribution = local.map(|l| l.data());
        let merged = self.world().share_from_any(contribution);

        if let Some(incoming) = merged {
            self.with_data_mut(|dst| {
                assert_eq!(
                    incoming.len(),
                    dst.len(),
                    "sub-world contribution has mismatched length"
                );
                for (d, s) in dst.iter_mut().zip(incoming.iter()) {
                    *d = alpha * s + beta * *d;
                }
            });
        }
    }
}

impl fmt::Debug for TensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.inner.borrow();
        f.debug_struct("TensorHandle")
            .field("tid", &t.tid)
            .field("name", &t.name)
            .field("elems", &t.data.len())
            .finish()
    }
}

/// An indexed tensor reference: the left-hand side of an assignment, or a
/// leaf of an expression tree. The index string is carried for naming and
/// cost realism; storage is elementwise.
#[derive(Debug, Clone)]
pub struct IdxTensor {
    pub parent: TensorHandle,
    pub indices: String,
}

impl IdxTensor {
    /// `lhs := rhs`
    pub fn set(&self, rhs: Expr) {
        self.assign(OpKind::Set, rhs);
    }

    /// `lhs += rhs`
    pub fn add(&self, rhs: Expr) {
        self.assign(OpKind::Sum, rhs);
    }

    /// `lhs -= rhs`
    pub fn subtract(&self, rhs: Expr) {
        self.assign(OpKind::Subtract, rhs);
    }

    /// `lhs *= rhs`
    pub fn multiply(&self, rhs: Expr) {
        self.assign(OpKind::Multiply, rhs);
    }

    /// Route the assignment: enqueue into the recording schedule if one is
    /// active on this thread, otherwise evaluate eagerly.
    fn assign(&self, kind: OpKind, rhs: Expr) {
        if record::is_recording() {
            record::push(record::Assignment {
                kind,
                lhs: self.clone(),
                rhs,
            });
        } else {
            apply_assign(kind, self, &rhs);
        }
    }

    /// Deep clone substituting the parent tensor through `remap`.
    pub fn clone_remapped(&self, remap: &HashMap<TensorId, TensorHandle>) -> IdxTensor {
        let parent = remap
            .get(&self.parent.tid())
            .expect("lhs tensor missing from remap table")
            .clone();
        IdxTensor {
            parent,
            indices: self.indices.clone(),
        }
    }
}

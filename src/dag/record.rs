// src/dag/record.rs

//! The recording sink.
//!
//! While a [`RecordGuard`] is alive on a thread, tensor assignments are
//! diverted into a buffer instead of executing eagerly. Dropping the guard
//! (on any exit path, including unwinding) drains the buffer into its
//! schedule in record order and re-enables eager evaluation. Recording is
//! strictly single-writer per thread: nesting guards panics.

use std::cell::{Cell, RefCell};

use crate::dag::op::OpKind;
use crate::dag::schedule::Schedule;
use crate::expr::Expr;
use crate::tensor::IdxTensor;

thread_local! {
    static RECORDING: Cell<bool> = const { Cell::new(false) };
    static PENDING: RefCell<Vec<Assignment>> = const { RefCell::new(Vec::new()) };
}

/// One buffered tensor assignment awaiting dependency wiring.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub kind: OpKind,
    pub lhs: IdxTensor,
    pub rhs: Expr,
}

/// True if a schedule is currently recording on this thread.
pub fn is_recording() -> bool {
    RECORDING.with(|r| r.get())
}

pub(crate) fn push(assignment: Assignment) {
    debug_assert!(is_recording());
    PENDING.with(|p| p.borrow_mut().push(assignment));
}

fn begin() {
    RECORDING.with(|r| {
        assert!(
            !r.get(),
            "a schedule is already recording on this thread (recording is single-writer)"
        );
        r.set(true);
    });
}

fn end() -> Vec<Assignment> {
    RECORDING.with(|r| r.set(false));
    PENDING.with(|p| std::mem::take(&mut *p.borrow_mut()))
}

/// RAII handle for a recording session; created by [`Schedule::record`].
///
/// The mutable borrow on the schedule makes executing while recording
/// unrepresentable; dropping the guard wires the buffered assignments into
/// the dependency graph.
pub struct RecordGuard<'a> {
    schedule: &'a mut Schedule,
}

impl<'a> RecordGuard<'a> {
    pub(crate) fn new(schedule: &'a mut Schedule) -> Self {
        begin();
        RecordGuard { schedule }
    }
}

impl Drop for RecordGuard<'_> {
    fn drop(&mut self) {
        for assignment in end() {
            self.schedule.add_operation(assignment);
        }
    }
}

/// Record every assignment made inside `f` into `schedule`.
pub fn record_into<R>(schedule: &mut Schedule, f: impl FnOnce() -> R) -> R {
    let _guard = schedule.record();
    f()
}

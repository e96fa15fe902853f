// src/dag/mod.rs

//! Operation recording and dependency-graph construction.
//!
//! - [`op`] defines [`Operation`] and the assignment kinds.
//! - [`schedule`] owns the operation arena and builds the last-writer
//!   dependency graph as assignments are recorded.
//! - [`record`] is the thread-scoped recording sink.
//! - [`graph`] offers a petgraph view for diagnostics.
//!
//! Wave execution lives in [`crate::engine`].

pub mod graph;
pub mod op;
pub mod record;
pub mod schedule;

pub use op::{OpId, OpKind, Operation};
pub use record::{record_into, Assignment, RecordGuard};
pub use schedule::Schedule;

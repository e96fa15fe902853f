// src/dag/schedule.rs

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::dag::op::{OpId, Operation};
use crate::dag::record::{Assignment, RecordGuard};
use crate::tensor::TensorId;
use crate::world::World;

/// A recorded batch of tensor assignments and the data-dependency DAG built
/// over them.
///
/// A schedule is created empty, records assignments (see
/// [`Schedule::record`]), and is then executed; executing drains the ready
/// queue and is not re-runnable. Operations are owned by the schedule's
/// arena and refer to each other by [`OpId`]; tensors are owned externally.
pub struct Schedule {
    pub(crate) world: World,
    /// User cap on concurrent tasks per wave; 0 means unbounded.
    pub(crate) partitions: usize,

    /// Arena in insertion order, dummy roots included.
    pub(crate) ops: Vec<Operation>,
    /// Operations with no predecessors at record time (the dummy roots).
    pub(crate) root_tasks: Vec<OpId>,
    /// Current wavefront: operations with `dependency_left == 0`, not yet
    /// executed.
    pub(crate) ready: VecDeque<OpId>,

    /// Most recent writer per tensor; maintained during recording only.
    latest_write: HashMap<TensorId, OpId>,
}

impl Schedule {
    /// An empty schedule on `world` with no cap on tasks per wave.
    pub fn new(world: &World) -> Self {
        Self::with_partitions(world, 0)
    }

    /// An empty schedule capped at `partitions` concurrent tasks per wave
    /// (0 = unbounded).
    pub fn with_partitions(world: &World, partitions: usize) -> Self {
        Schedule {
            world: world.clone(),
            partitions,
            ops: Vec::new(),
            root_tasks: Vec::new(),
            ready: VecDeque::new(),
            latest_write: HashMap::new(),
        }
    }

    /// Begin recording: until the returned guard is dropped, tensor
    /// assignments on this thread are buffered and then wired into this
    /// schedule's dependency graph.
    pub fn record(&mut self) -> RecordGuard<'_> {
        RecordGuard::new(self)
    }

    /// All operations in insertion order (dummy roots included).
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn op(&self, id: OpId) -> &Operation {
        &self.ops[id]
    }

    pub fn root_task_ids(&self) -> &[OpId] {
        &self.root_tasks
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Wire one assignment into the dependency graph.
    ///
    /// Read-after-write: the op depends on the latest writer of each input
    /// (synthesising a dummy root where no writer exists yet). Write-after-
    /// read: the op depends on every previously recorded reader of its output
    /// tensor, so it cannot clobber a value a pending read still needs.
    /// Write-after-write ordering is inherited transitively through those
    /// readers; two writes with no intervening reader may run in either
    /// order, which is safe because the second overwrites the first.
    pub fn add_operation(&mut self, assignment: Assignment) {
        let Assignment { kind, lhs, rhs } = assignment;
        let op_id = self.ops.len();
        self.ops.push(Operation::new(kind, lhs, rhs));

        let mut outputs = BTreeMap::new();
        self.ops[op_id].get_outputs(&mut outputs);
        assert_eq!(
            outputs.len(),
            1,
            "operations with more than one output are unsupported"
        );
        let out_tid = *outputs.keys().next().unwrap();

        let mut inputs = BTreeMap::new();
        self.ops[op_id].get_inputs(&mut inputs);

        for &tid in inputs.keys() {
            let writer = match self.latest_write.get(&tid) {
                Some(&w) => w,
                None => {
                    // First read of this tensor: synthesise a dummy root to
                    // serve as its writer.
                    let dummy = self.ops.len();
                    self.ops.push(Operation::dummy());
                    self.latest_write.insert(tid, dummy);
                    self.root_tasks.push(dummy);
                    dummy
                }
            };
            self.ops[writer].successors.push(op_id);
            self.ops[writer].reads.push(op_id);
            self.ops[op_id].dependency_count += 1;
        }

        if let Some(&prev) = self.latest_write.get(&out_tid) {
            let prev_reads = self.ops[prev].reads.clone();
            for reader in prev_reads {
                if reader != op_id {
                    self.ops[reader].successors.push(op_id);
                    self.ops[op_id].dependency_count += 1;
                }
            }
        }

        self.latest_write.insert(out_tid, op_id);
    }

    /// Mark `id` complete: decrement each successor's countdown and enqueue
    /// the ones that become ready.
    pub(crate) fn release_successors(&mut self, id: OpId) {
        assert_eq!(self.ops[id].dependency_left, 0);

        let successors = self.ops[id].successors.clone();
        for succ in successors {
            assert!(self.ops[succ].dependency_left > 0);
            self.ops[succ].dependency_left -= 1;
            if self.ops[succ].dependency_left == 0 {
                self.ready.push_back(succ);
            }
        }
    }
}

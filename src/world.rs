// src/world.rs

//! The communicator abstraction the scheduler runs on.
//!
//! [`World`] is a cheap-to-clone handle over a process grid. The scheduler
//! only uses the small collective surface below: `rank`/`size`, `barrier`,
//! `allreduce`, `split`, and `share_from_any` (the exchange primitive behind
//! tensor migration). The backing implementation here is in-process: one rank
//! per OS thread, collectives built from a reusable [`Barrier`] and per-rank
//! exchange slots.
//!
//! Every collective follows the same shape: each rank writes its own slot,
//! hits the barrier, reads all slots, and hits the barrier again so that no
//! rank races ahead into the next collective's writes. Slots are never
//! cleared; they are fully overwritten before any read.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

/// Reduction applied by [`World::allreduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Min,
    Max,
    Sum,
}

/// A communicator handle: this rank's view of a process grid.
///
/// Cloning is cheap and yields another handle to the same grid.
#[derive(Clone)]
pub struct World {
    rank: usize,
    size: usize,
    shared: Arc<WorldShared>,
}

struct WorldShared {
    barrier: Barrier,
    reduce_slots: Mutex<Vec<f64>>,
    share_slots: Mutex<Vec<Option<Vec<f64>>>>,
    split_colors: Mutex<Vec<usize>>,
    subworlds: Mutex<HashMap<usize, Arc<WorldShared>>>,
}

impl WorldShared {
    fn new(size: usize) -> Self {
        Self {
            barrier: Barrier::new(size),
            reduce_slots: Mutex::new(vec![0.0; size]),
            share_slots: Mutex::new(vec![None; size]),
            split_colors: Mutex::new(vec![0; size]),
            subworlds: Mutex::new(HashMap::new()),
        }
    }
}

impl World {
    /// A one-rank world. Collectives degenerate to local no-ops.
    pub fn single() -> Self {
        World {
            rank: 0,
            size: 1,
            shared: Arc::new(WorldShared::new(1)),
        }
    }

    /// Run `f` on `size` rank threads in lockstep and return the per-rank
    /// results in rank order.
    ///
    /// Every rank must issue the same sequence of collective calls; a rank
    /// that skips one deadlocks the grid, exactly as it would under MPI.
    pub fn spawn<T, F>(size: usize, f: F) -> Vec<T>
    where
        F: Fn(World) -> T + Sync,
        T: Send,
    {
        assert!(size >= 1, "world size must be at least 1");
        let shared = Arc::new(WorldShared::new(size));

        thread::scope(|scope| {
            let handles: Vec<_> = (0..size)
                .map(|rank| {
                    let world = World {
                        rank,
                        size,
                        shared: Arc::clone(&shared),
                    };
                    let f = &f;
                    scope.spawn(move || f(world))
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().expect("rank thread panicked"))
                .collect()
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Collective: block until every rank of this world has arrived.
    pub fn barrier(&self) {
        self.shared.barrier.wait();
    }

    /// Collective: combine `value` across all ranks; every rank receives the
    /// same result.
    pub fn allreduce(&self, value: f64, op: ReduceOp) -> f64 {
        self.shared.reduce_slots.lock().unwrap()[self.rank] = value;
        self.barrier();

        let result = {
            let slots = self.shared.reduce_slots.lock().unwrap();
            match op {
                ReduceOp::Min => slots.iter().copied().fold(f64::INFINITY, f64::min),
                ReduceOp::Max => slots.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                ReduceOp::Sum => slots.iter().sum(),
            }
        };

        self.barrier();
        result
    }

    /// Collective: every rank receives the contribution of the lowest rank
    /// that passed `Some`, or `None` if nobody contributed.
    ///
    /// This is the exchange primitive behind `add_from_subworld`: ranks inside
    /// a sub-world contribute the locally computed buffer, everyone else
    /// passes `None` and still receives the data.
    pub fn share_from_any(&self, contribution: Option<Vec<f64>>) -> Option<Vec<f64>> {
        self.shared.share_slots.lock().unwrap()[self.rank] = contribution;
        self.barrier();

        let merged = {
            let slots = self.shared.share_slots.lock().unwrap();
            slots.iter().find_map(|slot| slot.clone())
        };

        self.barrier();
        merged
    }

    /// Collective: partition the ranks of this world by `color` into
    /// sub-worlds. Within each group, ranks keep their relative order (the
    /// split key is the parent rank).
    pub fn split(&self, color: usize) -> World {
        self.shared.split_colors.lock().unwrap()[self.rank] = color;
        self.barrier();

        let colors = self.shared.split_colors.lock().unwrap().clone();
        let group: Vec<usize> = (0..self.size).filter(|&r| colors[r] == color).collect();
        let new_rank = group
            .iter()
            .position(|&r| r == self.rank)
            .expect("own rank missing from its colour group");

        // The first rank of each group allocates the sub-world state.
        if new_rank == 0 {
            self.shared
                .subworlds
                .lock()
                .unwrap()
                .insert(color, Arc::new(WorldShared::new(group.len())));
        }
        self.barrier();

        let sub = Arc::clone(
            self.shared
                .subworlds
                .lock()
                .unwrap()
                .get(&color)
                .expect("sub-world registered by its first rank"),
        );

        // Nobody may start a later split (and overwrite the registry entry)
        // until every rank of this one has fetched its sub-world.
        self.barrier();

        World {
            rank: new_rank,
            size: group.len(),
            shared: sub,
        }
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

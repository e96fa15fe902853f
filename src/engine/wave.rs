// src/engine/wave.rs

//! Wavefront execution: drain the recorded DAG one wave at a time, each wave
//! splitting the parent world into per-task sub-worlds.
//!
//! Every rank runs this code in lockstep. All collective calls (the split,
//! the tensor migrations, the barriers around execution, the imbalance
//! reductions) happen on the parent world in the same order on every rank;
//! the wave plan and the colour assignment are pure functions of state that
//! is identical everywhere, so no agreement round is needed.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use tracing::{debug, info};

use crate::dag::op::OpId;
use crate::dag::record;
use crate::dag::schedule::Schedule;
use crate::engine::partition;
use crate::engine::timer::ScheduleTimer;
use crate::tensor::{TensorHandle, TensorId};
use crate::world::{ReduceOp, World};

/// What one colour's sub-world is going to do this wave.
struct PartitionOps {
    color: usize,
    /// The sub-world, present only on ranks belonging to this colour.
    world: Option<World>,

    /// Operations to execute.
    ops: Vec<OpId>,
    /// Sub-world clones owned by this rank, kept alive until teardown.
    local_tensors: Vec<TensorHandle>,
    /// Maps each parent-world tensor to its sub-world clone.
    remap: HashMap<TensorId, TensorHandle>,

    /// Every tensor the colour touches, as parent-world tensors.
    global_tensors: BTreeMap<TensorId, TensorHandle>,
    /// Tensors to write back out, as parent-world tensors.
    output_tensors: BTreeMap<TensorId, TensorHandle>,
}

impl Schedule {
    /// Run the recorded DAG to completion in waves and return the aggregated
    /// timings. Collective on the schedule's world.
    pub fn execute(&mut self) -> ScheduleTimer {
        assert!(
            !record::is_recording(),
            "cannot execute while a schedule is recording on this thread"
        );

        let mut schedule_timer = ScheduleTimer::default();

        // Reset per-execution state and seed the wavefront from the roots.
        for op in &mut self.ops {
            op.dependency_left = op.dependency_count;
        }
        self.ready = self.root_tasks.iter().copied().collect();

        // Pre-drain the dummy roots from the front of the queue. Their
        // successors enqueue at the back, so every dummy is consumed before
        // the first real operation surfaces.
        while let Some(&front) = self.ready.front() {
            if !self.ops[front].is_dummy() {
                break;
            }
            self.ready.pop_front();
            self.release_successors(front);
        }

        while !self.ready.is_empty() {
            let iter_timer = self.partition_and_execute();
            if self.world.rank() == 0 {
                info!(
                    wall = iter_timer.imbalance_wall_time,
                    accum = iter_timer.imbalance_accum_time,
                    "wave imbalance"
                );
            }
            schedule_timer += iter_timer;
        }

        schedule_timer
    }

    /// Run the recorded DAG to completion one operation at a time on the
    /// parent world, with no splitting or migration.
    pub fn execute_serial(&mut self) -> ScheduleTimer {
        assert!(
            !record::is_recording(),
            "cannot execute while a schedule is recording on this thread"
        );

        let mut timer = ScheduleTimer::default();
        let start = Instant::now();

        for op in &mut self.ops {
            op.dependency_left = op.dependency_count;
        }
        self.ready = self.root_tasks.iter().copied().collect();

        while let Some(id) = self.ready.pop_front() {
            if !self.ops[id].is_dummy() {
                let exec_start = Instant::now();
                self.ops[id].execute(None);
                timer.exec_time += exec_start.elapsed().as_secs_f64();
            }
            self.release_successors(id);
        }

        timer.total_time = start.elapsed().as_secs_f64();
        timer
    }

    /// Execute one wave: plan the partition, split the world, migrate inputs
    /// down, run this rank's task, measure imbalance, migrate outputs up,
    /// tear down, and release successors.
    fn partition_and_execute(&mut self) -> ScheduleTimer {
        let mut timer = ScheduleTimer::default();
        let wave_start = Instant::now();

        let rank = self.world.rank();
        let size = self.world.size();

        // Sort the ready queue by descending cost.
        let mut sorted: Vec<OpId> = self.ready.drain(..).collect();
        sorted.sort_by(|&a, &b| self.ops[b].estimate_cost().cmp(&self.ops[a].estimate_cost()));
        self.ready.extend(sorted);

        let max_colors = partition::max_colors(size, self.ready.len(), self.partitions);
        let costs: Vec<i64> = self
            .ready
            .iter()
            .map(|&id| self.ops[id].estimate_cost())
            .collect();
        let plan = partition::plan_wave(&costs, size, max_colors);
        let window = &costs[plan.starting_task..plan.starting_task + plan.num_tasks];
        let colors = partition::colors_for_all_ranks(window, plan.sum_cost, size);
        let my_color = colors[rank];

        if rank == 0 {
            let queue: Vec<String> = self
                .ready
                .iter()
                .map(|&id| format!("{}({})", self.ops[id].name(), self.ops[id].estimate_cost()))
                .collect();
            info!(
                max_colors = plan.max_colors,
                starting_task = plan.starting_task,
                num_tasks = plan.num_tasks,
                ready = %queue.join(" "),
                "wave partition"
            );
        }

        let my_world = self.world.split(my_color);

        let mut comm_ops: Vec<PartitionOps> = (0..plan.num_tasks)
            .map(|color| PartitionOps {
                color,
                world: (color == my_color).then(|| my_world.clone()),
                ops: vec![self.ready[plan.starting_task + color]],
                local_tensors: Vec::new(),
                remap: HashMap::new(),
                global_tensors: BTreeMap::new(),
                output_tensors: BTreeMap::new(),
            })
            .collect();

        // Each removal shifts the rest down, so erasing num_tasks times at
        // starting_task removes exactly the chosen window while preserving
        // the order of the remaining tasks.
        for _ in 0..plan.num_tasks {
            self.ready
                .remove(plan.starting_task)
                .expect("chosen window task present in ready queue");
        }

        // Gather each colour's tensor sets.
        for part in &mut comm_ops {
            for &op in &part.ops {
                self.ops[op].get_inputs(&mut part.global_tensors);
                self.ops[op].get_outputs(&mut part.global_tensors);
                self.ops[op].get_outputs(&mut part.output_tensors);
            }
        }

        // Migrate inputs down into the sub-worlds.
        let down_start = Instant::now();
        for part in &mut comm_ops {
            debug!(
                color = part.color,
                tensors = part.global_tensors.len(),
                local = part.world.is_some(),
                "migrating colour inputs down"
            );
            for (&tid, global) in &part.global_tensors {
                let local = part.world.as_ref().map(|w| global.clone_onto(w));
                if let Some(local) = &local {
                    part.local_tensors.push(local.clone());
                    part.remap.insert(tid, local.clone());
                }
                global.add_to_subworld(local.as_ref(), 1.0, 0.0);
            }
            if part.world.is_some() {
                for tid in part.output_tensors.keys() {
                    assert!(
                        part.remap.contains_key(tid),
                        "output tensor missing from remap table"
                    );
                }
            }
        }
        timer.comm_down_time = down_start.elapsed().as_secs_f64();

        // Run this rank's task.
        self.world.barrier();
        let exec_start = Instant::now();
        if comm_ops.len() > my_color {
            let part = &comm_ops[my_color];
            for &op in &part.ops {
                self.ops[op].execute(Some(&part.remap));
            }
        }
        let my_exec_time = exec_start.elapsed().as_secs_f64();
        self.world.barrier();
        timer.exec_time = exec_start.elapsed().as_secs_f64();

        // Measure imbalance across the parent world.
        let min_exec = self.world.allreduce(my_exec_time, ReduceOp::Min);
        let max_exec = self.world.allreduce(my_exec_time, ReduceOp::Max);
        timer.imbalance_wall_time = max_exec - min_exec;
        timer.imbalance_accum_time = self.world.allreduce(my_exec_time - min_exec, ReduceOp::Sum);

        // Migrate outputs back into the parent-world tensors.
        let up_start = Instant::now();
        for part in &comm_ops {
            for (tid, global) in &part.output_tensors {
                global.add_from_subworld(part.remap.get(tid), 1.0, 0.0);
            }
        }
        timer.comm_up_time = up_start.elapsed().as_secs_f64();

        // Tear down sub-world tensors and worlds on the owning ranks.
        for part in &mut comm_ops {
            part.local_tensors.clear();
            part.remap.clear();
            part.world = None;
        }
        drop(my_world);

        // Release successors of everything this wave executed.
        let executed: Vec<OpId> = comm_ops
            .iter()
            .flat_map(|part| part.ops.iter().copied())
            .collect();
        for op in executed {
            self.release_successors(op);
        }

        timer.total_time = wave_start.elapsed().as_secs_f64();
        timer
    }
}

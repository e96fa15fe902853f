// src/engine/timer.rs

use std::ops::AddAssign;

/// Wall-clock accounting for one execution, in seconds. Per-wave timers are
/// accumulated into the schedule-level total with `+=`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScheduleTimer {
    pub total_time: f64,
    pub comm_down_time: f64,
    pub comm_up_time: f64,
    pub exec_time: f64,
    /// max − min of per-rank execution time within a wave.
    pub imbalance_wall_time: f64,
    /// Σ (per-rank execution time − min) within a wave.
    pub imbalance_accum_time: f64,
}

impl AddAssign for ScheduleTimer {
    fn add_assign(&mut self, rhs: ScheduleTimer) {
        self.total_time += rhs.total_time;
        self.comm_down_time += rhs.comm_down_time;
        self.comm_up_time += rhs.comm_up_time;
        self.exec_time += rhs.exec_time;
        self.imbalance_wall_time += rhs.imbalance_wall_time;
        self.imbalance_accum_time += rhs.imbalance_accum_time;
    }
}

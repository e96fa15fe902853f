// src/engine/partition.rs

//! The cost-driven partitioner.
//!
//! Given the ready queue sorted by descending cost, the partitioner picks a
//! contiguous window of tasks to run concurrently and assigns each rank to
//! one task in proportion to cost. Both steps are pure functions of the cost
//! list, the world size and the rank, so every rank computes the identical
//! wave plan with no agreement round.

/// The window of ready tasks chosen for one wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavePlan {
    pub max_colors: usize,
    pub starting_task: usize,
    pub num_tasks: usize,
    pub sum_cost: i64,
}

/// Upper bound on concurrent tasks this wave: world size, ready count, and
/// the user cap (0 = uncapped).
pub fn max_colors(size: usize, ready: usize, partitions: usize) -> usize {
    let mut max = size.min(ready);
    if partitions > 0 && max > partitions {
        max = partitions;
    }
    max
}

/// Find the widest balanceable window in `costs` (which must be sorted in
/// descending order).
///
/// From each starting position, the sweep keeps accepting tasks until the
/// smallest accepted task would receive less than one processor's worth of
/// the accumulated work (past that point widening only degrades utilisation)
/// or until the window reaches `max_colors`. The widest window wins; ties go
/// to the earliest start.
pub fn plan_wave(costs: &[i64], size: usize, max_colors: usize) -> WavePlan {
    let mut best = WavePlan {
        max_colors,
        starting_task: 0,
        num_tasks: 0,
        sum_cost: 0,
    };

    for starting_task in 0..costs.len() {
        let mut sum_cost: i64 = 0;
        let mut min_cost: i64 = 0;
        let mut num_tasks = 0;

        for (i, &this_cost) in costs.iter().enumerate().skip(starting_task) {
            if min_cost == 0 || this_cost < min_cost {
                min_cost = this_cost;
            }
            if min_cost < (this_cost + sum_cost) / size as i64 {
                break;
            }
            num_tasks = i - starting_task + 1;
            sum_cost += this_cost;
            if num_tasks >= max_colors {
                break;
            }
        }

        if num_tasks > best.num_tasks {
            best.starting_task = starting_task;
            best.num_tasks = num_tasks;
            best.sum_cost = sum_cost;
        }
    }

    best
}

/// Assign `rank` to a task of the chosen window (`window_costs` is the
/// `num_tasks`-long slice of the sorted cost list).
///
/// The total cost is divided into `size` equal strips; each rank samples the
/// midpoint of its strip and walks the window deducting task costs until the
/// remainder falls inside a task. Division truncates; ranks sampling past the
/// last task snap to it.
pub fn color_for_rank(window_costs: &[i64], sum_cost: i64, rank: usize, size: usize) -> usize {
    let strip = sum_cost / size as i64;
    let mut sample = strip * rank as i64 + strip / 2;

    let mut color = 0;
    for (i, &cost) in window_costs.iter().enumerate() {
        color = i;
        if sample < cost {
            break;
        }
        sample -= cost;
    }
    color
}

/// Colour every rank of the world, then repair coverage.
///
/// Truncating division makes the sample grid span slightly less than the
/// window's cost mass, so a chosen task can end up with no rank at all; its
/// sub-world would be empty and the operation would silently never run.
/// Every uncovered colour steals the highest rank of the currently largest
/// colour group. The repair is a pure function of its inputs, so all ranks
/// still agree on the full assignment.
pub fn colors_for_all_ranks(window_costs: &[i64], sum_cost: i64, size: usize) -> Vec<usize> {
    let mut colors: Vec<usize> = (0..size)
        .map(|rank| color_for_rank(window_costs, sum_cost, rank, size))
        .collect();

    for color in 0..window_costs.len().min(size) {
        if colors.contains(&color) {
            continue;
        }

        let mut counts = vec![0usize; window_costs.len()];
        for &c in &colors {
            counts[c] += 1;
        }
        let mut donor = 0;
        for (c, &n) in counts.iter().enumerate() {
            if n > counts[donor] {
                donor = c;
            }
        }

        let rank = colors
            .iter()
            .rposition(|&c| c == donor)
            .expect("donor colour has at least one rank");
        colors[rank] = color;
    }

    colors
}

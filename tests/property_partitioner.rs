use proptest::prelude::*;

use tensordag::engine::{color_for_rank, colors_for_all_ranks, max_colors, plan_wave};

// Ready queues arrive at the partitioner already sorted by descending cost.
fn sorted_costs() -> impl Strategy<Value = Vec<i64>> {
    proptest::collection::vec(1i64..10_000, 1..40).prop_map(|mut v| {
        v.sort_unstable_by(|a, b| b.cmp(a));
        v
    })
}

proptest! {
    #[test]
    fn plan_stays_inside_its_bounds(
        costs in sorted_costs(),
        size in 1usize..64,
        partitions in 0usize..8,
    ) {
        let cap = max_colors(size, costs.len(), partitions);
        let plan = plan_wave(&costs, size, cap);

        prop_assert!(plan.num_tasks >= 1);
        prop_assert!(plan.num_tasks <= cap);
        prop_assert!(plan.starting_task + plan.num_tasks <= costs.len());

        let window = &costs[plan.starting_task..plan.starting_task + plan.num_tasks];
        prop_assert_eq!(plan.sum_cost, window.iter().sum::<i64>());
    }

    #[test]
    fn sampled_colours_are_in_range_and_non_decreasing(
        costs in sorted_costs(),
        size in 1usize..64,
        partitions in 0usize..8,
    ) {
        let cap = max_colors(size, costs.len(), partitions);
        let plan = plan_wave(&costs, size, cap);
        let window = &costs[plan.starting_task..plan.starting_task + plan.num_tasks];

        let mut prev = 0;
        for rank in 0..size {
            let color = color_for_rank(window, plan.sum_cost, rank, size);
            prop_assert!(color < plan.num_tasks);
            prop_assert!(color >= prev, "colours must not decrease with rank");
            prev = color;
        }
    }

    #[test]
    fn repaired_colours_cover_every_chosen_task(
        costs in sorted_costs(),
        size in 1usize..64,
        partitions in 0usize..8,
    ) {
        let cap = max_colors(size, costs.len(), partitions);
        let plan = plan_wave(&costs, size, cap);
        let window = &costs[plan.starting_task..plan.starting_task + plan.num_tasks];

        let colors = colors_for_all_ranks(window, plan.sum_cost, size);
        prop_assert_eq!(colors.len(), size);
        for &color in &colors {
            prop_assert!(color < plan.num_tasks);
        }
        for color in 0..plan.num_tasks {
            prop_assert!(colors.contains(&color), "colour {} unpopulated", color);
        }
    }

    #[test]
    fn a_serial_world_always_plans_one_task(costs in sorted_costs()) {
        let plan = plan_wave(&costs, 1, max_colors(1, costs.len(), 0));
        prop_assert_eq!(plan.num_tasks, 1);
    }
}

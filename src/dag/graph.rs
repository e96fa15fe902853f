// src/dag/graph.rs

//! petgraph view of a recorded schedule, for diagnostics and tests.
//!
//! Node `i` of the returned graph is operation `i` of the schedule's arena,
//! so `NodeIndex::index()` round-trips with [`OpId`].

use petgraph::algo::toposort;
use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;

use crate::dag::op::OpId;
use crate::dag::schedule::Schedule;

/// Materialise the dependency DAG with operation names as node weights.
pub fn dependency_graph(schedule: &Schedule) -> DiGraph<String, ()> {
    let mut graph = DiGraph::new();

    let nodes: Vec<_> = schedule
        .operations()
        .iter()
        .map(|op| graph.add_node(op.name()))
        .collect();

    for (id, op) in schedule.operations().iter().enumerate() {
        for &succ in &op.successors {
            graph.add_edge(nodes[id], nodes[succ], ());
        }
    }

    graph
}

/// Group the non-dummy operations by dependency depth: level 0 holds the
/// operations runnable immediately, level `n` those whose longest predecessor
/// chain has `n` real operations. This is the best-case wave structure a
/// fully parallel execution could achieve.
///
/// Panics if the recorded graph is cyclic, which the last-writer construction
/// rules out.
pub fn wave_levels(schedule: &Schedule) -> Vec<Vec<OpId>> {
    let graph = dependency_graph(schedule);
    let order = toposort(&graph, None).expect("recorded schedule must be acyclic");

    let ops = schedule.operations();
    let mut depth = vec![0usize; ops.len()];
    for node in order {
        let id = node.index();
        for &succ in &ops[id].successors {
            // Dummy roots add no depth of their own.
            let step = if ops[id].is_dummy() { 0 } else { 1 };
            depth[succ] = depth[succ].max(depth[id] + step);
        }
    }

    let mut levels: Vec<Vec<OpId>> = Vec::new();
    for (id, op) in ops.iter().enumerate() {
        if op.is_dummy() {
            continue;
        }
        while levels.len() <= depth[id] {
            levels.push(Vec::new());
        }
        levels[depth[id]].push(id);
    }
    levels
}

/// Graphviz dot rendering of the dependency DAG.
pub fn to_dot(schedule: &Schedule) -> String {
    let graph = dependency_graph(schedule);
    format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
}

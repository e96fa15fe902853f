mod common;

use tensordag::dag::{graph, record_into, OpKind, Schedule};
use tensordag::expr::Expr;
use tensordag::world::World;

use common::make_tensors;

#[test]
fn read_after_write_edges_chain_through_latest_writer() {
    let world = World::single();
    let tensors = make_tensors(&world, &[("A", 4, 0.0), ("B", 4, 1.0), ("C", 4, 0.0)]);
    let (a, b, c) = (&tensors["A"], &tensors["B"], &tensors["C"]);

    let mut schedule = Schedule::new(&world);
    {
        let _guard = schedule.record();
        a.index("i").set(Expr::term(b, "i"));
        c.index("i").add(Expr::term(a, "i"));
    }

    // Arena: A= (0), dummy for B (1), C+= (2), dummy for C (3).
    assert_eq!(schedule.operations().len(), 4);
    assert_eq!(schedule.op(0).kind, OpKind::Set);
    assert_eq!(schedule.op(0).name(), "A=");
    assert!(schedule.op(1).is_dummy());
    assert!(schedule.op(3).is_dummy());
    assert_eq!(schedule.root_task_ids(), &[1, 3]);

    // A= waits only on B's root; C+= waits on A= and on C's root.
    assert_eq!(schedule.op(0).dependency_count, 1);
    assert_eq!(schedule.op(2).dependency_count, 2);
    assert_eq!(schedule.op(0).successors, vec![2]);
    assert_eq!(schedule.op(0).reads, vec![2]);
}

#[test]
fn write_after_read_depends_on_every_prior_reader() {
    let world = World::single();
    let tensors = make_tensors(
        &world,
        &[("A", 4, 5.0), ("B", 4, 7.0), ("C", 4, 0.0), ("D", 4, 0.0)],
    );
    let (a, b, c, d) = (&tensors["A"], &tensors["B"], &tensors["C"], &tensors["D"]);

    let mut schedule = Schedule::new(&world);
    {
        let _guard = schedule.record();
        c.index("i").set(Expr::term(a, "i"));
        d.index("i").set(Expr::term(a, "i"));
        a.index("i").set(Expr::term(b, "i"));
    }

    // Arena: C= (0), dummy for A (1), D= (2), A= (3), dummy for B (4).
    assert_eq!(schedule.operations().len(), 5);
    assert_eq!(schedule.op(1).reads, vec![0, 2]);

    // The rewrite of A waits on B's root plus both readers of the old A.
    assert_eq!(schedule.op(3).dependency_count, 3);
    assert_eq!(schedule.op(0).successors, vec![3]);
    assert_eq!(schedule.op(2).successors, vec![3]);
}

#[test]
fn first_reads_share_one_dummy_root_per_tensor() {
    let world = World::single();
    let tensors = make_tensors(&world, &[("A", 4, 0.0), ("B", 4, 1.0), ("C", 4, 0.0)]);
    let (a, b, c) = (&tensors["A"], &tensors["B"], &tensors["C"]);

    let mut schedule = Schedule::new(&world);
    {
        let _guard = schedule.record();
        a.index("i").set(Expr::term(b, "i"));
        c.index("i").set(Expr::term(b, "i"));
    }

    // One dummy for B, shared by both readers.
    assert_eq!(schedule.root_task_ids(), &[1]);
    assert_eq!(schedule.op(1).successors, vec![0, 2]);
    assert_eq!(schedule.op(0).dependency_count, 1);
    assert_eq!(schedule.op(2).dependency_count, 1);
}

#[test]
fn read_modify_write_does_not_depend_on_itself() {
    let world = World::single();
    let tensors = make_tensors(&world, &[("A", 4, 1.0)]);
    let a = &tensors["A"];

    let mut schedule = Schedule::new(&world);
    {
        let _guard = schedule.record();
        a.index("i").add(Expr::term(a, "i"));
    }

    // A += A reads its own lhs; the write-after-read pass must skip the op
    // itself, leaving only the dependency on A's root.
    assert_eq!(schedule.op(0).dependency_count, 1);
    assert!(!schedule.op(0).successors.contains(&0));
}

#[test]
fn wave_levels_layer_the_diamond() {
    let world = World::single();
    let tensors = make_tensors(
        &world,
        &[
            ("A", 4, 0.0),
            ("B", 4, 2.0),
            ("C", 4, 0.0),
            ("D", 4, 0.0),
            ("E", 4, 0.0),
        ],
    );
    let (a, b, c, d, e) = (
        &tensors["A"],
        &tensors["B"],
        &tensors["C"],
        &tensors["D"],
        &tensors["E"],
    );

    let mut schedule = Schedule::new(&world);
    {
        let _guard = schedule.record();
        a.index("i").set(Expr::term(b, "i"));
        c.index("i").set(Expr::term(a, "i"));
        d.index("i").set(Expr::term(a, "i"));
        e.index("i").set(Expr::Add(
            Box::new(Expr::term(c, "i")),
            Box::new(Expr::term(d, "i")),
        ));
    }

    // Arena: A= (0), dummy B (1), C= (2), D= (3), E= (4).
    let levels = graph::wave_levels(&schedule);
    assert_eq!(levels, vec![vec![0], vec![2, 3], vec![4]]);
}

#[test]
fn cost_estimates_follow_expression_shape() {
    let world = World::single();
    let tensors = make_tensors(&world, &[("A", 10, 0.0), ("B", 10, 1.0), ("C", 10, 2.0)]);
    let (a, b, c) = (&tensors["A"], &tensors["B"], &tensors["C"]);

    let mut schedule = Schedule::new(&world);
    {
        let _guard = schedule.record();
        a.index("i").set(Expr::term(b, "i"));
        a.index("i").add(Expr::Add(
            Box::new(Expr::term(b, "i")),
            Box::new(Expr::term(c, "i")),
        ));
        a.index("i").add(Expr::Mul(
            Box::new(Expr::term(b, "i")),
            Box::new(Expr::term(c, "i")),
        ));
    }

    // Arena: A= (0), dummy B (1), A+= with the additive rhs (2),
    // dummy C (3), A+= with the multiplicative rhs (4).
    assert!(schedule.op(3).is_dummy());

    // Leaf copy: one pass over the operand.
    assert_eq!(schedule.op(0).estimate_cost(), 10);
    // Additive node: both sides plus one pass over the destination.
    assert_eq!(schedule.op(2).estimate_cost(), 30);
    // Multiplicative node: both sides plus two passes over the destination.
    assert_eq!(schedule.op(4).estimate_cost(), 40);
}

#[test]
fn record_into_scopes_the_sink() {
    let world = World::single();
    let tensors = make_tensors(&world, &[("A", 4, 0.0), ("B", 4, 3.0)]);
    let (a, b) = (&tensors["A"], &tensors["B"]);

    let mut schedule = Schedule::new(&world);
    record_into(&mut schedule, || {
        a.index("i").set(Expr::term(b, "i"));
    });

    // Recorded, not applied.
    assert_eq!(schedule.operations().len(), 2);
    assert_eq!(a.data(), vec![0.0; 4]);

    // Outside the scope the same assignment runs eagerly.
    a.index("i").set(Expr::term(b, "i"));
    assert_eq!(a.data(), vec![3.0; 4]);
}

// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod expr;
pub mod logging;
pub mod tensor;
pub mod world;

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, StepConfig};
use crate::dag::{graph, OpKind, Schedule};
use crate::engine::ScheduleTimer;
use crate::errors::{Result, TensordagError};
use crate::tensor::TensorHandle;
use crate::world::World;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the simulated process grid
/// - per-rank schedule recording and execution
/// - the rank-0 summary report
pub fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;

    if let Some(ranks) = args.ranks {
        if ranks == 0 {
            return Err(TensordagError::Config("--ranks must be >= 1".to_string()));
        }
        cfg.run.ranks = ranks;
    }
    if let Some(partitions) = args.partitions {
        cfg.run.partitions = partitions;
    }

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    info!(
        ranks = cfg.run.ranks,
        partitions = cfg.run.partitions,
        serial = args.serial,
        steps = cfg.steps.len(),
        "starting execution"
    );

    // Every rank records the identical schedule and executes it in lockstep.
    let results = World::spawn(cfg.run.ranks, |world| run_rank(&cfg, world, args.serial));

    let mut results = results.into_iter();
    let report = results.next().expect("at least one rank")?;
    for other in results {
        other?;
    }

    report_summary(&report);
    Ok(())
}

/// What one rank brings back from an execution.
struct RankReport {
    timer: ScheduleTimer,
    checksums: Vec<(String, f64)>,
}

fn run_rank(cfg: &ConfigFile, world: World, serial: bool) -> Result<RankReport> {
    let tensors = build_tensors(cfg, &world);
    let mut schedule = build_schedule(cfg, &tensors, &world)?;

    let timer = if serial {
        schedule.execute_serial()
    } else {
        schedule.execute()
    };

    let checksums = tensors
        .iter()
        .map(|(name, t)| (name.clone(), t.data().iter().sum::<f64>()))
        .collect();

    Ok(RankReport { timer, checksums })
}

/// Materialise the declared tensors on `world`, keyed by name.
fn build_tensors(cfg: &ConfigFile, world: &World) -> BTreeMap<String, TensorHandle> {
    cfg.tensor
        .iter()
        .map(|(name, spec)| {
            (
                name.clone(),
                TensorHandle::new(name, spec.elems, spec.fill, world),
            )
        })
        .collect()
}

/// Record every config step into a fresh schedule.
fn build_schedule(
    cfg: &ConfigFile,
    tensors: &BTreeMap<String, TensorHandle>,
    world: &World,
) -> Result<Schedule> {
    let mut schedule = Schedule::with_partitions(world, cfg.run.partitions);
    {
        let _guard = schedule.record();
        for (i, step) in cfg.steps.iter().enumerate() {
            record_step(step, tensors)
                .map_err(|err| TensordagError::Config(format!("recording step {i}: {err}")))?;
        }
    }
    Ok(schedule)
}

fn record_step(step: &StepConfig, tensors: &BTreeMap<String, TensorHandle>) -> Result<()> {
    let kind = step
        .kind()
        .ok_or_else(|| TensordagError::Config(format!("invalid op '{}'", step.op)))?;

    let (lhs_name, lhs_indices) = expr::parse_lhs(&step.lhs)?;
    let lhs = tensors
        .get(&lhs_name)
        .ok_or_else(|| TensordagError::UnknownTensor(lhs_name.clone()))?
        .index(&lhs_indices);
    let rhs = expr::parse(&step.rhs)?.bind(tensors)?;

    match kind {
        OpKind::Set => lhs.set(rhs),
        OpKind::Sum => lhs.add(rhs),
        OpKind::Subtract => lhs.subtract(rhs),
        OpKind::Multiply => lhs.multiply(rhs),
        OpKind::None => unreachable!("config steps never produce dummy operations"),
    }
    Ok(())
}

fn report_summary(report: &RankReport) {
    info!(
        total = report.timer.total_time,
        comm_down = report.timer.comm_down_time,
        comm_up = report.timer.comm_up_time,
        exec = report.timer.exec_time,
        imbalance_wall = report.timer.imbalance_wall_time,
        imbalance_accum = report.timer.imbalance_accum_time,
        "execution finished"
    );
    for (name, checksum) in &report.checksums {
        info!(tensor = %name, checksum, "final tensor state");
    }
}

/// Dry-run output: validate, build the DAG on a single rank, and print its
/// wave structure plus a Graphviz rendering without executing anything.
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    let world = World::single();
    let tensors = build_tensors(cfg, &world);
    let schedule = build_schedule(cfg, &tensors, &world)?;

    println!("tensordag dry-run");
    println!("  run.ranks = {}", cfg.run.ranks);
    println!("  run.partitions = {}", cfg.run.partitions);
    println!();

    println!("tensors ({}):", cfg.tensor.len());
    for (name, tensor) in cfg.tensor.iter() {
        println!("  - {name}: elems = {}, fill = {}", tensor.elems, tensor.fill);
    }
    println!();

    let levels = graph::wave_levels(&schedule);
    println!("dependency waves ({} levels):", levels.len());
    for (i, level) in levels.iter().enumerate() {
        let names: Vec<String> = level
            .iter()
            .map(|&id| {
                format!(
                    "{}({})",
                    schedule.op(id).name(),
                    schedule.op(id).estimate_cost()
                )
            })
            .collect();
        println!("  wave {i}: {}", names.join(" "));
    }
    println!();
    println!("{}", graph::to_dot(&schedule));

    debug!("dry-run complete (no execution)");
    Ok(())
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Maze Haunt scenarios headlessly.

mod layout_code;
mod render;
mod scenario;
mod sim;

use std::{
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use glam::Vec3;
use maze_haunt_core::{CellCoord, ItemKind};
use maze_haunt_system_pathfinding::PathPlanner;
use maze_haunt_world::NavGrid;
use tracing_subscriber::EnvFilter;

use crate::{layout_code::ObstacleMask, scenario::Scenario, sim::Simulation};

const DEFAULT_LOG_FILTER: &str = "maze_haunt=warn";

/// Headless driver for the Maze Haunt pursuit engine.
#[derive(Debug, Parser)]
#[command(name = "maze-haunt", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Simulate a scenario and print the event transcript.
    Run(RunArgs),
    /// Plan a single route through a scenario's maze and draw it.
    Plan(PlanArgs),
    /// Print the layout code of a scenario's maze.
    Encode(ScenarioArg),
    /// Print the ASCII rows stored in a layout code.
    Decode(DecodeArgs),
}

#[derive(Debug, Args)]
struct ScenarioArg {
    /// Scenario TOML file.
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    input: ScenarioArg,

    /// Number of ticks to simulate, overriding the scenario.
    #[arg(long)]
    ticks: Option<u32>,

    /// Tick length in milliseconds, overriding the scenario.
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Also print successful path plans.
    #[arg(long)]
    show_plans: bool,
}

#[derive(Debug, Args)]
struct PlanArgs {
    #[command(flatten)]
    input: ScenarioArg,

    /// Start cell as COLUMN,ROW.
    #[arg(long, value_parser = parse_cell)]
    from: CellCoord,

    /// Goal cell as COLUMN,ROW.
    #[arg(long, value_parser = parse_cell)]
    to: CellCoord,
}

#[derive(Debug, Args)]
struct DecodeArgs {
    /// Layout code such as `haunt:v1:8x4:...`.
    #[arg(value_name = "CODE")]
    code: String,
}

/// Entry point for the Maze Haunt command-line interface.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Run(args) => run(args, &mut out),
        Command::Plan(args) => plan(args, &mut out),
        Command::Encode(args) => encode(args, &mut out),
        Command::Decode(args) => decode(args, &mut out),
    }
}

fn run(args: RunArgs, out: &mut impl Write) -> Result<()> {
    let scenario = Scenario::load(&args.input.scenario)?;
    let ticks = args.ticks.unwrap_or(scenario.ticks);
    let tick = args.tick_ms.map_or(scenario.tick, Duration::from_millis);
    ensure!(!tick.is_zero(), "--tick-ms must be positive");

    let mut simulation = Simulation::new(scenario);
    let summary = simulation.run(ticks, tick, args.show_plans, out)?;

    writeln!(out)?;
    writeln!(
        out,
        "simulated {:.2}s, {} events",
        summary.elapsed.as_secs_f32(),
        summary.event_count
    )?;
    for agent in &summary.agents {
        writeln!(out, "{}", render::agent_summary(agent))?;
    }
    match summary.target {
        Some(position) => writeln!(out, "target at {}", render::ground(position))?,
        None => writeln!(out, "target never appeared")?,
    }
    for kind in ItemKind::ALL {
        if summary.inventory.contains(kind) {
            writeln!(out, "holding {kind:?} x{}", summary.inventory.count(kind))?;
        }
    }
    Ok(())
}

fn plan(args: PlanArgs, out: &mut impl Write) -> Result<()> {
    let scenario = Scenario::load(&args.input.scenario)?;
    let grid = &scenario.grid;
    let start = cell_center(grid, args.from)?;
    let goal = cell_center(grid, args.to)?;

    let mut planner = PathPlanner::new();
    let path = planner.find_path(grid, start, goal).with_context(|| {
        format!(
            "no route from ({}, {}) to ({}, {})",
            args.from.column(),
            args.from.row(),
            args.to.column(),
            args.to.row()
        )
    })?;
    let stats = planner.last_stats();

    write!(out, "{}", render::grid_with_route(grid, Some(&path)))?;
    writeln!(
        out,
        "{} waypoints, length {:.2}, {} nodes expanded",
        path.len(),
        path.length(),
        stats.expanded
    )?;
    Ok(())
}

fn encode(args: ScenarioArg, out: &mut impl Write) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    writeln!(out, "{}", scenario.mask.encode())?;
    Ok(())
}

fn decode(args: DecodeArgs, out: &mut impl Write) -> Result<()> {
    let mask = ObstacleMask::decode(&args.code).context("invalid layout code")?;
    for row in mask.to_rows() {
        writeln!(out, "{row}")?;
    }
    Ok(())
}

fn cell_center(grid: &NavGrid, cell: CellCoord) -> Result<Vec3> {
    grid.index_at(cell)
        .and_then(|index| grid.cell_center(index))
        .with_context(|| {
            format!(
                "cell ({}, {}) lies outside the {}x{} grid",
                cell.column(),
                cell.row(),
                grid.columns(),
                grid.rows()
            )
        })
}

fn parse_cell(value: &str) -> Result<CellCoord, String> {
    let (column, row) = value
        .split_once(',')
        .ok_or_else(|| format!("expected COLUMN,ROW but got `{value}`"))?;
    let column = column
        .trim()
        .parse()
        .map_err(|_| format!("invalid column in `{value}`"))?;
    let row = row
        .trim()
        .parse()
        .map_err(|_| format!("invalid row in `{value}`"))?;
    Ok(CellCoord::new(column, row))
}

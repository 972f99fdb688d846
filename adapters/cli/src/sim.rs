//! Deterministic headless simulation of a scenario.

use std::{io::Write, time::Duration};

use anyhow::Result;
use glam::Vec3;
use maze_haunt_core::{Inventory, Path, PursuitEvent};
use maze_haunt_system_movement::PathFollower;
use maze_haunt_system_pathfinding::PathPlanner;
use maze_haunt_system_pursuit::{AgentSnapshot, Pursuer, RangeSenses};
use maze_haunt_world::NavGrid;
use tracing::{debug, warn};

use crate::{
    render,
    scenario::{ItemDrop, Scenario, ScheduledDamage, TargetScript},
};

/// Walks the target between its route points along planned paths, looping forever.
#[derive(Debug)]
struct TargetWalker {
    script: TargetScript,
    position: Vec3,
    leg: usize,
    path: Path,
    cursor: usize,
    planner: PathPlanner,
    follower: PathFollower,
}

impl TargetWalker {
    fn new(script: TargetScript) -> Self {
        let position = script.route.first().copied().unwrap_or(Vec3::ZERO);
        Self {
            script,
            position,
            leg: 0,
            path: Path::empty(),
            cursor: 0,
            planner: PathPlanner::new(),
            follower: PathFollower::default(),
        }
    }

    fn step(&mut self, grid: &NavGrid, dt: Duration) {
        if self.cursor >= self.path.len() {
            self.leg = (self.leg + 1) % self.script.route.len();
            let goal = self.script.route[self.leg];
            self.cursor = 0;
            self.path = match self.planner.find_path(grid, self.position, goal) {
                Ok(path) => path,
                Err(error) => {
                    warn!(%goal, %error, "target cannot reach its next route point");
                    Path::empty()
                }
            };
            if self.path.is_empty() {
                return;
            }
        }

        let step = self
            .follower
            .advance(&self.path, self.cursor, self.position, self.script.speed, dt);
        self.position = step.position;
        self.cursor = step.cursor;
    }
}

/// Final state of a simulation run.
#[derive(Debug)]
pub(crate) struct RunSummary {
    pub(crate) elapsed: Duration,
    pub(crate) agents: Vec<AgentSnapshot>,
    pub(crate) target: Option<Vec3>,
    pub(crate) inventory: Inventory,
    pub(crate) event_count: usize,
}

/// Owns every participant of a scenario and advances them in lockstep.
#[derive(Debug)]
pub(crate) struct Simulation {
    grid: NavGrid,
    agents: Vec<Pursuer>,
    senses: RangeSenses,
    walker: TargetWalker,
    appears_at: Duration,
    damage: Vec<ScheduledDamage>,
    items: Vec<ItemDrop>,
    inventory: Inventory,
    elapsed: Duration,
    events: Vec<PursuitEvent>,
    event_count: usize,
}

impl Simulation {
    /// Takes ownership of the scenario's participants.
    pub(crate) fn new(scenario: Scenario) -> Self {
        let mut senses = RangeSenses::new();
        if let Some(bounds) = scenario.bounds {
            senses = senses.with_bounds(bounds);
        }
        let mut damage = scenario.damage;
        damage.sort_by_key(|entry| entry.at);

        Self {
            grid: scenario.grid,
            agents: scenario.agents,
            senses,
            appears_at: scenario.target.appears_at,
            walker: TargetWalker::new(scenario.target),
            damage,
            items: scenario.items,
            inventory: Inventory::new(),
            elapsed: Duration::ZERO,
            events: Vec::new(),
            event_count: 0,
        }
    }

    /// Runs `ticks` steps of `dt`, writing one transcript line per reported event.
    ///
    /// Path planning outcomes are only written when `show_plans` is set.
    pub(crate) fn run(
        &mut self,
        ticks: u32,
        dt: Duration,
        show_plans: bool,
        out: &mut impl Write,
    ) -> Result<RunSummary> {
        for _ in 0..ticks {
            self.step(dt, out)?;
            for event in self.events.drain(..) {
                self.event_count += 1;
                if !show_plans && matches!(event, PursuitEvent::PathPlanned { .. }) {
                    continue;
                }
                writeln!(out, "{}", render::transcript_line(self.elapsed, &event))?;
            }
        }

        Ok(RunSummary {
            elapsed: self.elapsed,
            agents: self.agents.iter().map(Pursuer::snapshot).collect(),
            target: self.target(),
            inventory: self.inventory.clone(),
            event_count: self.event_count,
        })
    }

    fn target(&self) -> Option<Vec3> {
        (self.elapsed >= self.appears_at).then_some(self.walker.position)
    }

    fn step(&mut self, dt: Duration, out: &mut impl Write) -> Result<()> {
        self.elapsed += dt;

        if self.elapsed >= self.appears_at {
            self.walker.step(&self.grid, dt);
            self.collect_items(out)?;
        }
        self.senses.set_target(self.target());

        while let Some(entry) = self.damage.first().copied() {
            if entry.at > self.elapsed {
                break;
            }
            let _ = self.damage.remove(0);
            if let Some(agent) = self
                .agents
                .iter_mut()
                .find(|agent| agent.id() == entry.agent)
            {
                debug!(agent = %entry.agent, amount = entry.amount, "scripted damage");
                agent.apply_damage(entry.amount, &mut self.events);
            }
        }

        for agent in &mut self.agents {
            agent.tick(dt, &self.grid, &self.senses, &mut self.events);
        }
        Ok(())
    }

    fn collect_items(&mut self, out: &mut impl Write) -> Result<()> {
        let Some(cell) = self
            .grid
            .index_of(self.walker.position)
            .and_then(|index| self.grid.coord_of(index))
        else {
            return Ok(());
        };

        let mut index = 0;
        while index < self.items.len() {
            if self.items[index].cell != cell {
                index += 1;
                continue;
            }
            let item = self.items.remove(index);
            let count = self.inventory.add(item.kind);
            writeln!(
                out,
                "{}",
                render::pickup_line(self.elapsed, item.kind, count)
            )?;
        }
        Ok(())
    }
}

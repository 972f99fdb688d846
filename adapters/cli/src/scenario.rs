//! TOML scenario files describing a maze, its monsters and a scripted target.

use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use anyhow::{bail, ensure, Context, Result};
use glam::Vec3;
use maze_haunt_core::{AgentId, AttackPolicy, AttackRecovery, CellCoord, GridSpec, ItemKind};
use maze_haunt_system_pursuit::{MazeBounds, Pursuer, PursuitProfile, StallRecovery};
use maze_haunt_world::NavGrid;
use serde::Deserialize;

use crate::layout_code::ObstacleMask;

const SUPPORTED_SCENARIO_VERSION: u32 = 1;
const DEFAULT_TICKS: u32 = 600;
const DEFAULT_TICK_MS: u64 = 50;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    version: u32,
    grid: GridSpec,
    layout: LayoutSection,
    #[serde(default)]
    bounds: Option<BoundsSection>,
    target: TargetSection,
    #[serde(default)]
    profiles: BTreeMap<String, ProfileSection>,
    agents: Vec<AgentSection>,
    #[serde(default)]
    damage: Vec<DamageSection>,
    #[serde(default)]
    items: Vec<ItemSection>,
    #[serde(default)]
    run: RunSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutSection {
    rows: Option<Vec<String>>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BoundsSection {
    min: [f32; 2],
    max: [f32; 2],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetSection {
    route: Vec<[u32; 2]>,
    speed: f32,
    #[serde(default)]
    appears_at_secs: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileSection {
    patrol_speed: Option<f32>,
    chase_speed: Option<f32>,
    detection_radius: Option<f32>,
    attack_radius: Option<f32>,
    replan_interval_secs: Option<f32>,
    max_health: Option<f32>,
    attack: Option<AttackSection>,
    recovery: Option<AttackRecovery>,
    stall: Option<StallSection>,
    investigate_last_known: Option<bool>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
enum AttackSection {
    OncePerEntry,
    Cooldown { interval_secs: f32 },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StallSection {
    check_interval_secs: f32,
    radius: f32,
    freeze_secs: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentSection {
    profile: String,
    start: [u32; 2],
    patrol: Vec<[u32; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DamageSection {
    at_secs: f32,
    agent: u32,
    amount: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ItemSection {
    kind: ItemKind,
    cell: [u32; 2],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunSection {
    #[serde(default = "default_ticks")]
    ticks: u32,
    #[serde(default = "default_tick_ms")]
    tick_ms: u64,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            ticks: DEFAULT_TICKS,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

fn default_ticks() -> u32 {
    DEFAULT_TICKS
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

/// Damage dealt to one agent at a fixed simulated time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ScheduledDamage {
    pub(crate) at: Duration,
    pub(crate) agent: AgentId,
    pub(crate) amount: f32,
}

/// Item lying on a grid cell until the target walks over it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ItemDrop {
    pub(crate) kind: ItemKind,
    pub(crate) cell: CellCoord,
}

/// Scripted movement of the chased entity.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TargetScript {
    pub(crate) route: Vec<Vec3>,
    pub(crate) speed: f32,
    pub(crate) appears_at: Duration,
}

/// Fully resolved scenario, ready to simulate.
#[derive(Debug)]
pub(crate) struct Scenario {
    pub(crate) grid: NavGrid,
    pub(crate) mask: ObstacleMask,
    pub(crate) bounds: Option<MazeBounds>,
    pub(crate) target: TargetScript,
    pub(crate) agents: Vec<Pursuer>,
    pub(crate) damage: Vec<ScheduledDamage>,
    pub(crate) items: Vec<ItemDrop>,
    pub(crate) ticks: u32,
    pub(crate) tick: Duration,
}

impl Scenario {
    /// Reads and resolves the scenario stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario at {}", path.display()))
    }

    /// Parses and resolves scenario TOML.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let file: ScenarioFile =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        if file.version != SUPPORTED_SCENARIO_VERSION {
            bail!(
                "unsupported scenario version {}; expected {}",
                file.version,
                SUPPORTED_SCENARIO_VERSION
            );
        }

        let mask = file.layout.resolve()?;
        ensure!(
            mask.columns() == file.grid.columns && mask.rows() == file.grid.rows,
            "layout is {}x{} but the grid is {}x{}",
            mask.columns(),
            mask.rows(),
            file.grid.columns,
            file.grid.rows
        );

        let spec = file.grid;
        let grid = NavGrid::build(spec, |probe| mask.blocks(&spec, probe))
            .context("failed to build navigation grid")?;

        let target = file.target.resolve(&grid)?;
        let agents = resolve_agents(&grid, &file.profiles, file.agents)?;
        let damage = file
            .damage
            .into_iter()
            .map(|entry| entry.resolve(agents.len()))
            .collect::<Result<Vec<_>>>()?;
        let items = file
            .items
            .into_iter()
            .map(|item| {
                let [column, row] = item.cell;
                let cell = CellCoord::new(column, row);
                ensure!(
                    grid.index_at(cell).is_some(),
                    "item cell ({column}, {row}) lies outside the grid"
                );
                Ok(ItemDrop {
                    kind: item.kind,
                    cell,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        ensure!(file.run.tick_ms > 0, "run.tick_ms must be positive");

        Ok(Self {
            grid,
            mask,
            bounds: file.bounds.map(|bounds| {
                MazeBounds::new(
                    Vec3::new(bounds.min[0], 0.0, bounds.min[1]),
                    Vec3::new(bounds.max[0], 0.0, bounds.max[1]),
                )
            }),
            target,
            agents,
            damage,
            items,
            ticks: file.run.ticks,
            tick: Duration::from_millis(file.run.tick_ms),
        })
    }
}

impl LayoutSection {
    fn resolve(self) -> Result<ObstacleMask> {
        match (self.rows, self.code) {
            (Some(rows), None) => ObstacleMask::from_rows(&rows).context("invalid layout rows"),
            (None, Some(code)) => ObstacleMask::decode(&code).context("invalid layout code"),
            _ => bail!("layout needs exactly one of `rows` or `code`"),
        }
    }
}

impl TargetSection {
    fn resolve(self, grid: &NavGrid) -> Result<TargetScript> {
        ensure!(!self.route.is_empty(), "target route is empty");
        ensure!(
            self.speed.is_finite() && self.speed > 0.0,
            "target speed must be positive"
        );
        let route = self
            .route
            .iter()
            .map(|cell| cell_center(grid, *cell, "target route"))
            .collect::<Result<Vec<_>>>()?;
        Ok(TargetScript {
            route,
            speed: self.speed,
            appears_at: seconds("target.appears_at_secs", self.appears_at_secs)?,
        })
    }
}

impl ProfileSection {
    fn resolve(&self) -> Result<PursuitProfile> {
        let defaults = PursuitProfile::default();
        let attack_policy = match self.attack {
            None | Some(AttackSection::OncePerEntry) => AttackPolicy::OncePerEntry,
            Some(AttackSection::Cooldown { interval_secs }) => AttackPolicy::Cooldown {
                interval: seconds("attack.interval_secs", interval_secs)?,
            },
        };
        let stall_recovery = match &self.stall {
            None => None,
            Some(stall) => Some(StallRecovery {
                check_interval: seconds("stall.check_interval_secs", stall.check_interval_secs)?,
                radius: stall.radius,
                freeze: seconds("stall.freeze_secs", stall.freeze_secs)?,
            }),
        };
        let replan_interval = match self.replan_interval_secs {
            Some(secs) => seconds("replan_interval_secs", secs)?,
            None => defaults.replan_interval,
        };

        let profile = PursuitProfile {
            patrol_speed: self.patrol_speed.unwrap_or(defaults.patrol_speed),
            chase_speed: self.chase_speed.unwrap_or(defaults.chase_speed),
            detection_radius: self.detection_radius.unwrap_or(defaults.detection_radius),
            attack_radius: self.attack_radius.unwrap_or(defaults.attack_radius),
            replan_interval,
            max_health: self.max_health.unwrap_or(defaults.max_health),
            attack_policy,
            attack_recovery: self.recovery.unwrap_or(defaults.attack_recovery),
            stall_recovery,
            investigate_last_known: self
                .investigate_last_known
                .unwrap_or(defaults.investigate_last_known),
            seed: self.seed.unwrap_or(defaults.seed),
        };
        profile.validate()?;
        Ok(profile)
    }
}

impl DamageSection {
    fn resolve(self, agent_count: usize) -> Result<ScheduledDamage> {
        ensure!(
            (self.agent as usize) < agent_count,
            "damage targets agent {} but only {agent_count} agents exist",
            self.agent
        );
        Ok(ScheduledDamage {
            at: seconds("damage.at_secs", self.at_secs)?,
            agent: AgentId::new(self.agent),
            amount: self.amount,
        })
    }
}

fn resolve_agents(
    grid: &NavGrid,
    profiles: &BTreeMap<String, ProfileSection>,
    agents: Vec<AgentSection>,
) -> Result<Vec<Pursuer>> {
    ensure!(!agents.is_empty(), "scenario declares no agents");
    let default_profile = ProfileSection::default();

    agents
        .into_iter()
        .enumerate()
        .map(|(index, agent)| {
            let id = AgentId::new(u32::try_from(index).context("too many agents")?);
            let section = match agent.profile.as_str() {
                "default" => profiles.get("default").unwrap_or(&default_profile),
                name => profiles
                    .get(name)
                    .with_context(|| format!("{id} uses unknown profile `{name}`"))?,
            };
            let profile = section
                .resolve()
                .with_context(|| format!("invalid profile `{}`", agent.profile))?;
            let start = cell_center(grid, agent.start, "agent start")?;
            let patrol = agent
                .patrol
                .iter()
                .map(|cell| cell_center(grid, *cell, "patrol point"))
                .collect::<Result<Vec<_>>>()?;
            Pursuer::new(id, profile, patrol, start)
                .with_context(|| format!("failed to set up {id}"))
        })
        .collect()
}

fn cell_center(grid: &NavGrid, [column, row]: [u32; 2], what: &str) -> Result<Vec3> {
    grid.index_at(CellCoord::new(column, row))
        .and_then(|index| grid.cell_center(index))
        .with_context(|| format!("{what} ({column}, {row}) lies outside the grid"))
}

fn seconds(field: &str, value: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(value)
        .with_context(|| format!("{field} must be a non-negative number of seconds"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        version = 1

        [grid]
        rows = 3
        columns = 4
        cell_size = 1.0
        origin = [0.0, 0.0, 0.0]

        [layout]
        rows = ["....", ".##.", "...."]

        [target]
        route = [[0, 2], [3, 2]]
        speed = 1.5

        [profiles.stalker]
        chase_speed = 4.0
        attack = { policy = "cooldown", interval_secs = 0.5 }
        recovery = "Patrol"
        investigate_last_known = true

        [[agents]]
        profile = "stalker"
        start = [0, 0]
        patrol = [[0, 0], [3, 0]]

        [[agents]]
        profile = "default"
        start = [3, 2]
        patrol = [[3, 2]]

        [[damage]]
        at_secs = 2.5
        agent = 1
        amount = 150.0
    "#;

    #[test]
    fn parses_minimal_scenario() {
        let scenario = Scenario::parse(MINIMAL).expect("scenario parses");

        assert_eq!(scenario.grid.obstacle_cells().count(), 2);
        assert_eq!(scenario.agents.len(), 2);
        assert_eq!(
            scenario.agents[0].profile().attack_policy,
            AttackPolicy::Cooldown {
                interval: Duration::from_millis(500)
            }
        );
        assert_eq!(
            scenario.agents[0].profile().attack_recovery,
            AttackRecovery::Patrol
        );
        assert!(scenario.agents[0].profile().investigate_last_known);
        assert_eq!(scenario.agents[1].profile(), &PursuitProfile::default());
        assert_eq!(scenario.target.route[1], Vec3::new(3.5, 0.0, 2.5));
        assert_eq!(scenario.damage[0].at, Duration::from_millis(2500));
        assert_eq!(scenario.ticks, DEFAULT_TICKS);
    }

    #[test]
    fn layout_code_matches_ascii_rows() {
        let code = ObstacleMask::from_rows(&["....", ".##.", "...."])
            .expect("rows")
            .encode();
        let with_code = MINIMAL.replace(
            r#"rows = ["....", ".##.", "...."]"#,
            &format!("code = \"{code}\""),
        );

        let scenario = Scenario::parse(&with_code).expect("scenario parses");

        assert_eq!(scenario.mask.to_rows(), vec!["....", ".##.", "...."]);
    }

    #[test]
    fn rejects_mismatched_layout_and_unknown_profiles() {
        let wrong_size = MINIMAL.replace("columns = 4", "columns = 5");
        assert!(Scenario::parse(&wrong_size).is_err());

        let unknown = MINIMAL.replace(r#"profile = "stalker""#, r#"profile = "ghost""#);
        let error = Scenario::parse(&unknown).expect_err("unknown profile");
        assert!(format!("{error:#}").contains("ghost"));

        let newer = MINIMAL.replace("version = 1", "version = 2");
        assert!(Scenario::parse(&newer).is_err());
    }

    #[test]
    fn rejects_invalid_profile_values() {
        let broken = MINIMAL.replace("chase_speed = 4.0", "chase_speed = -1.0");
        let error = Scenario::parse(&broken).expect_err("negative speed");
        assert!(format!("{error:#}").contains("chase_speed"));
    }
}

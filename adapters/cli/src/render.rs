//! Plain-text rendering of grids, routes and transcripts.

use std::time::Duration;

use glam::Vec3;
use maze_haunt_core::{ItemKind, Path, PursuitEvent};
use maze_haunt_system_pursuit::AgentSnapshot;
use maze_haunt_world::NavGrid;

use crate::layout_code::{FLOOR_TILE, WALL_TILE};

const ROUTE_TILE: char = '*';
const START_TILE: char = 'S';
const GOAL_TILE: char = 'G';

/// Draws the grid row by row, overlaying the route when one is given.
pub(crate) fn grid_with_route(grid: &NavGrid, route: Option<&Path>) -> String {
    let columns = grid.columns() as usize;
    let mut tiles: Vec<char> = grid
        .cells()
        .iter()
        .map(|cell| if cell.is_obstacle() { WALL_TILE } else { FLOOR_TILE })
        .collect();

    if let Some(route) = route {
        let last = route.len().saturating_sub(1);
        for (step, waypoint) in route.waypoints().iter().enumerate() {
            let Some(index) = grid.index_of(*waypoint) else {
                continue;
            };
            tiles[index.get()] = match step {
                0 => START_TILE,
                step if step == last => GOAL_TILE,
                _ => ROUTE_TILE,
            };
        }
    }

    let mut text = String::with_capacity(tiles.len() + grid.rows() as usize);
    for row in tiles.chunks(columns.max(1)) {
        text.extend(row);
        text.push('\n');
    }
    text
}

/// One transcript line for a pursuit event.
pub(crate) fn transcript_line(at: Duration, event: &PursuitEvent) -> String {
    let body = match event {
        PursuitEvent::StateChanged { agent, from, to } => format!("{agent} {from} -> {to}"),
        PursuitEvent::PathPlanned {
            agent,
            goal,
            waypoints,
        } => format!(
            "{agent} planned {waypoints} waypoints to {}",
            ground(*goal)
        ),
        PursuitEvent::PathNotFound { agent, goal, error } => {
            format!("{agent} has no route to {}: {error}", ground(*goal))
        }
        PursuitEvent::AttackLaunched { agent, target } => {
            format!("{agent} attacks the target at {}", ground(*target))
        }
        PursuitEvent::Died { agent, position } => {
            format!("{agent} died at {}", ground(*position))
        }
        PursuitEvent::Teleported { agent, from, to } => format!(
            "{agent} teleported from {} to {}",
            ground(*from),
            ground(*to)
        ),
    };
    format!("{} {body}", timestamp(at))
}

/// Transcript line for an item the target walked over.
pub(crate) fn pickup_line(at: Duration, kind: ItemKind, count: u32) -> String {
    let name = match kind {
        ItemKind::Key => "key",
        ItemKind::GreenKey => "green key",
    };
    format!("{} target picked up {name} ({count} held)", timestamp(at))
}

/// Summary line describing an agent's final state.
pub(crate) fn agent_summary(snapshot: &AgentSnapshot) -> String {
    format!(
        "{} {} at {} health {:.1} waypoint {}/{} patrol {} failed plans {}",
        snapshot.id,
        snapshot.mode,
        ground(snapshot.position),
        snapshot.health,
        snapshot.cursor.min(snapshot.path.len()),
        snapshot.path.len(),
        snapshot.patrol_index,
        snapshot.failed_plans
    )
}

/// Ground-plane coordinates of a point.
pub(crate) fn ground(position: Vec3) -> String {
    format!("({:.2}, {:.2})", position.x, position.z)
}

fn timestamp(at: Duration) -> String {
    format!("[{:>8.2}s]", at.as_secs_f32())
}

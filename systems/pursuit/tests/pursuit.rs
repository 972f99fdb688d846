use std::time::Duration;

use glam::Vec3;
use maze_haunt_core::{
    AgentId, AgentMode, AttackPolicy, AttackRecovery, GridSpec, PlanError, PursuitEvent,
};
use maze_haunt_system_movement::planar_distance;
use maze_haunt_system_pursuit::{Pursuer, PursuitProfile, RangeSenses, StallRecovery};
use maze_haunt_world::NavGrid;

const TICK: Duration = Duration::from_millis(100);
const AGENT: AgentId = AgentId::new(1);

fn grid_from_rows(layout: &[&str]) -> NavGrid {
    let rows = u32::try_from(layout.len()).expect("row count");
    let columns = u32::try_from(layout[0].len()).expect("column count");
    NavGrid::build(GridSpec::new(rows, columns, 1.0, Vec3::ZERO), |probe| {
        let column = probe.x.floor() as usize;
        let row = probe.z.floor() as usize;
        layout[row].as_bytes()[column] == b'#'
    })
    .expect("grid builds")
}

fn at(column: u32, row: u32) -> Vec3 {
    Vec3::new(column as f32 + 0.5, 0.0, row as f32 + 0.5)
}

fn run_ticks(
    agent: &mut Pursuer,
    grid: &NavGrid,
    senses: &RangeSenses,
    ticks: usize,
) -> Vec<PursuitEvent> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        agent.tick(TICK, grid, senses, &mut events);
    }
    events
}

fn transitions(events: &[PursuitEvent]) -> Vec<(AgentMode, AgentMode)> {
    events
        .iter()
        .filter_map(|event| match event {
            PursuitEvent::StateChanged { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

fn attack_count(events: &[PursuitEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, PursuitEvent::AttackLaunched { .. }))
        .count()
}

fn plan_count(events: &[PursuitEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, PursuitEvent::PathPlanned { .. }))
        .count()
}

fn patrol_profile() -> PursuitProfile {
    PursuitProfile {
        patrol_speed: 1.0,
        chase_speed: 2.0,
        detection_radius: 3.0,
        attack_radius: 0.5,
        ..PursuitProfile::default()
    }
}

#[test]
fn detects_then_loses_target_and_resumes_next_patrol_point() {
    let grid = grid_from_rows(&["..........", "..........", "..........", ".........."]);
    let patrol = vec![at(0, 2), at(9, 2)];
    let mut agent = Pursuer::new(AGENT, patrol_profile(), patrol.clone(), at(0, 2))
        .expect("valid pursuer");
    let mut senses = RangeSenses::new();

    let warmup = run_ticks(&mut agent, &grid, &senses, 10);
    assert_eq!(transitions(&warmup), vec![(AgentMode::Inactive, AgentMode::Patrolling)]);
    assert_eq!(agent.mode(), AgentMode::Patrolling);
    let before = agent.snapshot().patrol_index;
    assert_eq!(before, 1);

    let target = agent.position() + Vec3::new(2.0, 0.0, 0.0);
    senses.set_target(Some(target));
    let detected = run_ticks(&mut agent, &grid, &senses, 1);

    assert_eq!(agent.mode(), AgentMode::Chasing);
    assert_eq!(transitions(&detected), vec![(AgentMode::Patrolling, AgentMode::Chasing)]);
    assert!(detected.iter().any(|event| matches!(
        event,
        PursuitEvent::PathPlanned { goal, .. } if *goal == target
    )));

    senses.set_target(Some(at(9, 0)));
    let lost = run_ticks(&mut agent, &grid, &senses, 1);

    assert_eq!(agent.mode(), AgentMode::Patrolling);
    assert_eq!(transitions(&lost), vec![(AgentMode::Chasing, AgentMode::Patrolling)]);
    let resumed = agent.snapshot().patrol_index;
    assert_eq!(resumed, (before + 1) % patrol.len());
    assert!(lost.iter().any(|event| matches!(
        event,
        PursuitEvent::PathPlanned { goal, .. } if *goal == patrol[resumed]
    )));
}

#[test]
fn patrol_visits_points_round_robin() {
    let grid = grid_from_rows(&[".....", ".....", "....."]);
    let patrol = vec![at(0, 0), at(4, 0), at(4, 2)];
    let mut agent =
        Pursuer::new(AGENT, patrol_profile(), patrol.clone(), at(0, 0)).expect("valid pursuer");

    let events = run_ticks(&mut agent, &grid, &RangeSenses::new(), 200);

    let goals: Vec<Vec3> = events
        .iter()
        .filter_map(|event| match event {
            PursuitEvent::PathPlanned { goal, .. } => Some(*goal),
            _ => None,
        })
        .take(5)
        .collect();
    assert_eq!(goals, vec![patrol[1], patrol[2], patrol[0], patrol[1], patrol[2]]);
}

#[test]
fn agent_parked_on_its_only_patrol_point_does_not_replan() {
    let grid = grid_from_rows(&["....", "...."]);
    let mut agent =
        Pursuer::new(AGENT, patrol_profile(), vec![at(1, 1)], at(1, 1)).expect("valid pursuer");

    let events = run_ticks(&mut agent, &grid, &RangeSenses::new(), 100);

    assert_eq!(plan_count(&events), 0);
    assert_eq!(agent.mode(), AgentMode::Patrolling);
    assert_eq!(agent.position(), at(1, 1));
}

#[test]
fn death_is_terminal_and_fires_once() {
    let grid = grid_from_rows(&["....", "...."]);
    let mut agent =
        Pursuer::new(AGENT, patrol_profile(), vec![at(3, 1)], at(0, 0)).expect("valid pursuer");
    let mut senses = RangeSenses::new();
    senses.set_target(Some(at(1, 0)));

    let mut events = run_ticks(&mut agent, &grid, &senses, 3);
    agent.apply_damage(1_000.0, &mut events);
    agent.apply_damage(1_000.0, &mut events);
    events.extend(run_ticks(&mut agent, &grid, &senses, 25));

    let deaths = events
        .iter()
        .filter(|event| matches!(event, PursuitEvent::Died { .. }))
        .count();
    assert_eq!(deaths, 1);
    assert_eq!(agent.mode(), AgentMode::Dead);

    let died_at = events
        .iter()
        .position(|event| matches!(event, PursuitEvent::Died { .. }))
        .expect("death recorded");
    assert!(events[died_at + 1..].is_empty());
    assert!(transitions(&events).contains(&(AgentMode::Chasing, AgentMode::Dead)));
}

fn attack_profile(policy: AttackPolicy, recovery: AttackRecovery) -> PursuitProfile {
    PursuitProfile {
        detection_radius: 5.0,
        attack_radius: 1.5,
        attack_policy: policy,
        attack_recovery: recovery,
        ..PursuitProfile::default()
    }
}

#[test]
fn once_per_entry_attacks_a_single_time_while_in_range() {
    let grid = grid_from_rows(&["......", "......"]);
    let profile = attack_profile(AttackPolicy::OncePerEntry, AttackRecovery::Chase);
    let mut agent = Pursuer::new(AGENT, profile, vec![at(0, 0)], at(0, 0)).expect("valid");
    let mut senses = RangeSenses::new();
    senses.set_target(Some(at(1, 0)));

    let events = run_ticks(&mut agent, &grid, &senses, 40);

    assert_eq!(agent.mode(), AgentMode::Attacking);
    assert_eq!(attack_count(&events), 1);
}

#[test]
fn cooldown_policy_repeats_attacks_on_interval() {
    let grid = grid_from_rows(&["......", "......"]);
    let policy = AttackPolicy::Cooldown {
        interval: Duration::from_millis(500),
    };
    let profile = attack_profile(policy, AttackRecovery::Chase);
    let mut agent = Pursuer::new(AGENT, profile, vec![at(0, 0)], at(0, 0)).expect("valid");
    let mut senses = RangeSenses::new();
    senses.set_target(Some(at(1, 0)));

    let events = run_ticks(&mut agent, &grid, &senses, 22);

    assert_eq!(attack_count(&events), 5);
}

#[test]
fn leaving_attack_range_follows_recovery_policy() {
    let grid = grid_from_rows(&["......", "......"]);

    for (recovery, expected) in [
        (AttackRecovery::Chase, AgentMode::Chasing),
        (AttackRecovery::Patrol, AgentMode::Patrolling),
    ] {
        let profile = attack_profile(AttackPolicy::OncePerEntry, recovery);
        let mut agent = Pursuer::new(AGENT, profile, vec![at(0, 1)], at(0, 0)).expect("valid");
        let mut senses = RangeSenses::new();
        senses.set_target(Some(at(1, 0)));
        let _ = run_ticks(&mut agent, &grid, &senses, 2);
        assert_eq!(agent.mode(), AgentMode::Attacking);

        senses.set_target(Some(at(4, 0)));
        let events = run_ticks(&mut agent, &grid, &senses, 1);

        assert_eq!(agent.mode(), expected);
        assert_eq!(transitions(&events), vec![(AgentMode::Attacking, expected)]);
    }
}

#[test]
fn re_entering_attack_range_attacks_again() {
    let grid = grid_from_rows(&["......", "......"]);
    let profile = attack_profile(AttackPolicy::OncePerEntry, AttackRecovery::Chase);
    let mut agent = Pursuer::new(AGENT, profile, vec![at(0, 0)], at(0, 0)).expect("valid");
    let mut senses = RangeSenses::new();
    senses.set_target(Some(at(1, 0)));

    let mut events = run_ticks(&mut agent, &grid, &senses, 5);
    senses.set_target(Some(at(4, 0)));
    events.extend(run_ticks(&mut agent, &grid, &senses, 1));
    senses.set_target(Some(at(1, 0)));
    events.extend(run_ticks(&mut agent, &grid, &senses, 5));

    assert_eq!(attack_count(&events), 2);
}

#[test]
fn unreachable_patrol_point_holds_position_and_retries_on_interval() {
    let grid = grid_from_rows(&[".#...", "##...", "....."]);
    let start = at(0, 0);
    let mut agent =
        Pursuer::new(AGENT, patrol_profile(), vec![at(4, 2)], start).expect("valid pursuer");
    let senses = RangeSenses::new();

    let events = run_ticks(&mut agent, &grid, &senses, 5);
    assert_eq!(agent.position(), start);
    assert_eq!(agent.snapshot().failed_plans, 1);
    assert!(events.contains(&PursuitEvent::PathNotFound {
        agent: AGENT,
        goal: at(4, 2),
        error: PlanError::NoPathFound,
    }));

    let _ = run_ticks(&mut agent, &grid, &senses, 10);
    assert_eq!(agent.position(), start);
    assert_eq!(agent.snapshot().failed_plans, 2);
    assert_eq!(agent.mode(), AgentMode::Patrolling);
}

#[test]
fn stalled_agent_teleports_to_a_patrol_point_and_freezes() {
    let grid = grid_from_rows(&[".#...", "##...", "....."]);
    let patrol = vec![at(4, 2), at(2, 0)];
    let profile = PursuitProfile {
        stall_recovery: Some(StallRecovery {
            check_interval: Duration::from_secs(1),
            radius: 0.5,
            freeze: Duration::from_millis(500),
        }),
        seed: 7,
        ..patrol_profile()
    };
    let mut agent = Pursuer::new(AGENT, profile, patrol.clone(), at(0, 0)).expect("valid");
    let senses = RangeSenses::new();

    let events = run_ticks(&mut agent, &grid, &senses, 10);
    let teleports: Vec<(Vec3, Vec3)> = events
        .iter()
        .filter_map(|event| match event {
            PursuitEvent::Teleported { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(teleports.len(), 1);
    let (from, to) = teleports[0];
    assert_eq!(from, at(0, 0));
    assert!(patrol.contains(&to));
    assert_eq!(agent.position(), to);
    assert!(agent.path().is_empty());

    let frozen = run_ticks(&mut agent, &grid, &senses, 5);
    assert!(frozen.is_empty());
    assert_eq!(agent.position(), to);
}

#[test]
fn chase_replans_on_interval_while_target_moves() {
    let corridor = ".".repeat(30);
    let grid = grid_from_rows(&[corridor.as_str(), corridor.as_str()]);
    let profile = PursuitProfile {
        chase_speed: 0.5,
        detection_radius: 8.0,
        attack_radius: 0.5,
        replan_interval: Duration::from_millis(500),
        ..PursuitProfile::default()
    };
    let mut agent = Pursuer::new(AGENT, profile, vec![at(0, 0)], at(0, 0)).expect("valid");
    let mut senses = RangeSenses::new();
    let mut target = at(3, 0);
    senses.set_target(Some(target));

    let mut events = run_ticks(&mut agent, &grid, &senses, 1);
    assert_eq!(agent.mode(), AgentMode::Chasing);
    assert_eq!(plan_count(&events), 1);

    let chase_ticks: u32 = 20;
    for _ in 0..chase_ticks {
        target += Vec3::new(0.1, 0.0, 0.0);
        senses.set_target(Some(target));
        events.extend(run_ticks(&mut agent, &grid, &senses, 1));
    }

    let elapsed = TICK * chase_ticks;
    let expected = 1 + (elapsed.as_millis() / 500) as usize;
    assert_eq!(agent.mode(), AgentMode::Chasing);
    assert_eq!(plan_count(&events), expected);
}

#[test]
fn chasing_into_a_sealed_pocket_holds_position_and_retries_on_interval() {
    let grid = grid_from_rows(&["....#.", "....#.", "....#."]);
    let start = at(2, 1);
    let profile = PursuitProfile {
        detection_radius: 5.0,
        attack_radius: 0.5,
        replan_interval: Duration::from_millis(500),
        ..PursuitProfile::default()
    };
    let mut agent = Pursuer::new(AGENT, profile, vec![start], start).expect("valid");
    let mut senses = RangeSenses::new();
    senses.set_target(Some(at(5, 1)));

    let events = run_ticks(&mut agent, &grid, &senses, 11);

    assert_eq!(agent.mode(), AgentMode::Chasing);
    assert_eq!(agent.position(), start);
    assert!(agent.path().is_empty());
    assert_eq!(plan_count(&events), 0);
    let misses = events
        .iter()
        .filter(|event| matches!(event, PursuitEvent::PathNotFound { .. }))
        .count();
    assert_eq!(misses, 3);
    assert_eq!(agent.snapshot().failed_plans, 3);
}

#[test]
fn chaser_closes_in_on_target_off_its_cell_center() {
    let spec = GridSpec::new(3, 3, 4.0, Vec3::ZERO);
    let grid = NavGrid::build(spec, |_| false).expect("grid builds");
    let profile = PursuitProfile {
        attack_radius: 1.0,
        ..PursuitProfile::default()
    };
    let start = Vec3::new(10.0, 0.0, 10.0);
    let mut agent = Pursuer::new(AGENT, profile, vec![start], start).expect("valid");
    let mut senses = RangeSenses::new();
    let target = Vec3::new(4.1, 0.0, 4.1);
    senses.set_target(Some(target));

    let events = run_ticks(&mut agent, &grid, &senses, 100);

    assert_eq!(agent.mode(), AgentMode::Attacking);
    assert_eq!(attack_count(&events), 1);
    assert!(planar_distance(agent.position(), target) <= 1.0);
}

#[test]
fn lost_target_is_investigated_at_its_last_known_position() {
    let grid = grid_from_rows(&["......", "......", "......"]);
    let profile = PursuitProfile {
        investigate_last_known: true,
        ..patrol_profile()
    };
    let post = at(0, 1);
    let mut agent = Pursuer::new(AGENT, profile, vec![post], post).expect("valid");
    let mut senses = RangeSenses::new();
    let spot = at(2, 1);
    senses.set_target(Some(spot));

    let _ = run_ticks(&mut agent, &grid, &senses, 1);
    assert_eq!(agent.mode(), AgentMode::Chasing);

    senses.set_target(None);
    let lost = run_ticks(&mut agent, &grid, &senses, 1);
    assert_eq!(agent.mode(), AgentMode::Chasing);
    assert_eq!(agent.snapshot().investigating, Some(spot));
    assert!(lost.iter().any(|event| matches!(
        event,
        PursuitEvent::PathPlanned { goal, .. } if *goal == spot
    )));

    let mut ticks = 0;
    while agent.mode() == AgentMode::Chasing {
        assert!(ticks < 50, "agent never finished investigating");
        let _ = run_ticks(&mut agent, &grid, &senses, 1);
        ticks += 1;
    }

    assert_eq!(agent.mode(), AgentMode::Patrolling);
    assert!(ticks > 5);
    assert!(planar_distance(agent.position(), spot) < 0.5);
    assert_eq!(agent.snapshot().investigating, None);
}

#[test]
fn lost_target_resumes_patrol_at_once_without_investigation() {
    let grid = grid_from_rows(&["......", "......", "......"]);
    let post = at(0, 1);
    let mut agent = Pursuer::new(AGENT, patrol_profile(), vec![post], post).expect("valid");
    let mut senses = RangeSenses::new();
    senses.set_target(Some(at(2, 1)));
    let _ = run_ticks(&mut agent, &grid, &senses, 1);

    senses.set_target(None);
    let lost = run_ticks(&mut agent, &grid, &senses, 1);

    assert_eq!(transitions(&lost), vec![(AgentMode::Chasing, AgentMode::Patrolling)]);
    assert_eq!(agent.snapshot().investigating, None);
}

use std::time::Duration;

use skirmish_core::{
    Archetype, CellCoord, Command, Deployment, Event, GridBounds, Side, UnitId, UnitSnapshot,
};
use skirmish_system_opponent::OpponentPolicy;
use skirmish_world::{self as world, query, Config, World};

fn pass_attacker_turn(world: &mut World, log: &mut Vec<Event>) {
    let attackers: Vec<UnitId> = query::units(world)
        .living(Side::Attacker)
        .map(|unit| unit.id)
        .collect();
    for unit in attackers {
        world::apply(world, Command::Hold { unit }, log).expect("attacker holds");
    }
    world::apply(
        world,
        Command::EndTurn {
            side: Side::Attacker,
        },
        log,
    )
    .expect("every attacker acted");
}

/// Drives the policy one unit at a time until control leaves the defenders.
fn run_defender_turn(
    world: &mut World,
    policy: &mut OpponentPolicy,
    log: &mut Vec<Event>,
) -> Vec<Vec<Command>> {
    let mut batches = Vec::new();
    while query::active_side(world) == Side::Defender && query::outcome(world).is_none() {
        let mut commands = Vec::new();
        policy.handle(
            query::active_side(world),
            &query::units(world),
            query::bounds(world),
            &mut commands,
        );
        assert!(!commands.is_empty(), "policy stalled with defenders pending");

        for command in commands.iter().cloned() {
            world::apply(world, command, log).expect("policy commands are legal");
        }
        world::apply(
            world,
            Command::Tick {
                dt: Duration::from_millis(250),
            },
            log,
        )
        .expect("tick");
        batches.push(commands);
    }
    batches
}

#[test]
fn distant_defender_closes_in_without_attacking() {
    let mut world = World::new(Config {
        bounds: GridBounds::new(10, 6),
        seed: 9,
        teardown: Duration::from_secs(1),
        deployments: vec![
            Deployment::stock(Side::Attacker, Archetype::Melee, CellCoord::new(2, 2)),
            Deployment::stock(Side::Defender, Archetype::Melee, CellCoord::new(7, 2)),
        ],
    })
    .expect("valid roster");
    let mut policy = OpponentPolicy::new();
    let mut log = Vec::new();

    pass_attacker_turn(&mut world, &mut log);
    log.clear();
    let batches = run_defender_turn(&mut world, &mut policy, &mut log);

    assert_eq!(
        batches,
        vec![vec![Command::Move {
            unit: UnitId::new(1),
            destination: CellCoord::new(4, 2),
        }]],
        "the move alone completes the defender round"
    );
    assert!(!log
        .iter()
        .any(|event| matches!(event, Event::UnitAttacked { .. })));
    let defender = query::unit(&world, UnitId::new(1)).expect("defender alive");
    assert_eq!(defender.cell.manhattan_distance(CellCoord::new(2, 2)), 2);
    assert_eq!(query::active_side(&world), Side::Attacker);
}

#[test]
fn later_units_see_earlier_moves() {
    let mut world = World::new(Config {
        bounds: GridBounds::new(6, 1),
        seed: 4,
        teardown: Duration::from_secs(1),
        deployments: vec![
            Deployment::stock(Side::Attacker, Archetype::Melee, CellCoord::new(0, 0)),
            Deployment::stock(Side::Defender, Archetype::Melee, CellCoord::new(4, 0)),
            Deployment::stock(Side::Defender, Archetype::Melee, CellCoord::new(5, 0)),
        ],
    })
    .expect("valid roster");
    let mut policy = OpponentPolicy::new();
    let mut log = Vec::new();

    pass_attacker_turn(&mut world, &mut log);
    let batches = run_defender_turn(&mut world, &mut policy, &mut log);

    assert_eq!(
        batches[0][0],
        Command::Move {
            unit: UnitId::new(1),
            destination: CellCoord::new(1, 0),
        }
    );
    assert_eq!(
        batches[1][0],
        Command::Move {
            unit: UnitId::new(2),
            destination: CellCoord::new(2, 0),
        },
        "the second defender follows into the lane the first one vacated"
    );
}

#[test]
fn moving_never_grants_a_strike() {
    let mut world = World::new(Config::default()).expect("default roster");
    let mut policy = OpponentPolicy::new();
    let mut log = Vec::new();

    for _ in 0..6 {
        if query::outcome(&world).is_some() {
            break;
        }
        pass_attacker_turn(&mut world, &mut log);
        for batch in run_defender_turn(&mut world, &mut policy, &mut log) {
            let moved = batch
                .iter()
                .any(|command| matches!(command, Command::Move { .. }));
            let struck = batch
                .iter()
                .any(|command| matches!(command, Command::Attack { .. }));
            assert!(!(moved && struck), "{batch:?}");
        }
    }

    assert!(
        log.iter()
            .any(|event| matches!(event, Event::UnitAttacked { .. })),
        "defenders reach the passive attackers within six rounds"
    );
}

#[test]
fn policy_driven_match_replays_deterministically() {
    let (first_log, first_units) = replay();
    let (second_log, second_units) = replay();
    assert!(!first_log.is_empty());
    assert_eq!(first_log, second_log, "event logs diverged between runs");
    assert_eq!(first_units, second_units);
}

fn replay() -> (Vec<Event>, Vec<UnitSnapshot>) {
    let mut world = World::new(Config::default()).expect("default roster");
    let mut policy = OpponentPolicy::new();
    let mut log = Vec::new();

    for _ in 0..8 {
        if query::outcome(&world).is_some() {
            break;
        }
        pass_attacker_turn(&mut world, &mut log);
        let _ = run_defender_turn(&mut world, &mut policy, &mut log);
    }

    (log, query::units(&world).into_vec())
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Skirmish.
//!
//! The world owns every unit record, the turn state, the combat random
//! source, and the teardown clock. Callers mutate it exclusively through
//! [`apply`] and observe it through the [`query`] module.

mod registry;
mod resolver;
mod turn;

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use skirmish_core::{
    Archetype, CellCoord, Command, CommandError, Deployment, Event, GridBounds, Side,
};
use thiserror::Error;
use tracing::{debug, trace};

use registry::UnitRegistry;
use turn::TurnController;

const DEFAULT_COLUMNS: u32 = 10;
const DEFAULT_ROWS: u32 = 6;
const DEFAULT_SEED: u64 = 0x5eed_0f_5c1a_a15e;

/// Time a dead unit stays in the registry while its fall and fade play out.
pub const DEFAULT_TEARDOWN: Duration = Duration::from_millis(1_500);

/// Parameters required to set up a match.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Dimensions of the battlefield.
    pub bounds: GridBounds,
    /// Seed for the combat random source.
    pub seed: u64,
    /// Time a dead unit lingers before it is removed.
    pub teardown: Duration,
    /// Units placed on the battlefield, in registry order.
    pub deployments: Vec<Deployment>,
}

impl Default for Config {
    /// Five attackers on the western edge facing five defenders on the east.
    fn default() -> Self {
        let attacker = |archetype, column, row| {
            Deployment::stock(Side::Attacker, archetype, CellCoord::new(column, row))
        };
        let defender = |archetype, column, row| {
            Deployment::stock(Side::Defender, archetype, CellCoord::new(column, row))
        };

        Self {
            bounds: GridBounds::new(DEFAULT_COLUMNS, DEFAULT_ROWS),
            seed: DEFAULT_SEED,
            teardown: DEFAULT_TEARDOWN,
            deployments: vec![
                attacker(Archetype::Melee, 1, 1),
                attacker(Archetype::Melee, 1, 4),
                attacker(Archetype::Ranged, 0, 2),
                attacker(Archetype::Ranged, 0, 3),
                attacker(Archetype::Healer, 0, 0),
                defender(Archetype::Melee, 8, 1),
                defender(Archetype::Melee, 8, 4),
                defender(Archetype::Melee, 9, 0),
                defender(Archetype::Ranged, 9, 2),
                defender(Archetype::Ranged, 9, 3),
            ],
        }
    }
}

/// Reasons a match cannot be set up from a [`Config`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SetupError {
    /// The grid has no cells.
    #[error("the battlefield has no cells")]
    EmptyGrid,
    /// A deployment lies outside the grid.
    #[error("deployment at {cell:?} lies outside the battlefield")]
    OutOfBounds {
        /// Offending cell.
        cell: CellCoord,
    },
    /// Two deployments share a cell.
    #[error("more than one unit deployed at {cell:?}")]
    CellTaken {
        /// Offending cell.
        cell: CellCoord,
    },
    /// A deployment has no hit points.
    #[error("deployment #{index} has no hit points")]
    InvalidStats {
        /// Position of the deployment in the roster.
        index: usize,
    },
    /// A side has no units.
    #[error("{0:?} side has no units")]
    MissingSide(Side),
    /// The roster cannot be numbered with unit identifiers.
    #[error("roster exceeds the unit identifier space")]
    RosterTooLarge,
}

/// Represents the authoritative Skirmish world state.
#[derive(Debug)]
pub struct World {
    bounds: GridBounds,
    registry: UnitRegistry,
    turn: TurnController,
    rng: ChaCha8Rng,
    clock: Duration,
    teardown: Duration,
}

impl World {
    /// Sets up a match, seeding the combat random source from the config.
    pub fn new(config: Config) -> Result<Self, SetupError> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }

    /// Sets up a match that draws combat rolls from the provided generator.
    pub fn with_rng(config: Config, rng: ChaCha8Rng) -> Result<Self, SetupError> {
        let registry = UnitRegistry::from_deployments(config.bounds, &config.deployments)?;
        debug!(
            columns = config.bounds.columns(),
            rows = config.bounds.rows(),
            units = config.deployments.len(),
            "world ready"
        );
        Ok(Self {
            bounds: config.bounds,
            registry,
            turn: TurnController::new(),
            rng,
            clock: Duration::ZERO,
            teardown: config.teardown,
        })
    }

    fn advance_clock(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });
        self.registry.remove_expired(self.clock, self.teardown, out_events);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// A rejected command returns the reason and leaves both the world and
/// `out_events` untouched.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    trace!(?command, "applying command");
    let result = match command {
        Command::Move { unit, destination } => world.resolve_move(unit, destination, out_events),
        Command::Attack { attacker, target } => world.resolve_attack(attacker, target, out_events),
        Command::Heal { healer, target } => world.resolve_heal(healer, target, out_events),
        Command::Hold { unit } => world.resolve_hold(unit, out_events),
        Command::EndTurn { side } => world.turn.end_turn(&mut world.registry, side, out_events),
        Command::Tick { dt } => {
            world.advance_clock(dt, out_events);
            Ok(())
        }
    };

    if let Err(error) = result {
        debug!(%error, "command rejected");
        return Err(error);
    }

    world.turn.settle(&mut world.registry, out_events);
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::{collections::HashSet, time::Duration};

    use skirmish_core::{
        CellCoord, CommandError, GridBounds, MatchOutcome, Side, UnitId, UnitSnapshot, UnitView,
    };
    use skirmish_system_reachability::{reachable_cells as solve, ReachableSet};

    use super::World;

    /// Captures a read-only view of every unit, dying ones included.
    #[must_use]
    pub fn units(world: &World) -> UnitView {
        UnitView::from_snapshots(world.registry.iter().map(|unit| unit.snapshot()).collect())
    }

    /// Captures the state of a single unit.
    #[must_use]
    pub fn unit(world: &World, id: UnitId) -> Option<UnitSnapshot> {
        world.registry.get(id).map(|unit| unit.snapshot())
    }

    /// Side currently allowed to issue commands.
    #[must_use]
    pub fn active_side(world: &World) -> Side {
        world.turn.active()
    }

    /// Round counter, starting at one.
    #[must_use]
    pub fn round(world: &World) -> u32 {
        world.turn.round()
    }

    /// Final result once the match ended.
    #[must_use]
    pub fn outcome(world: &World) -> Option<MatchOutcome> {
        world.turn.outcome()
    }

    /// Dimensions of the battlefield.
    #[must_use]
    pub fn bounds(world: &World) -> GridBounds {
        world.bounds
    }

    /// Simulated time accumulated through ticks.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Cells currently held by living units.
    #[must_use]
    pub fn occupied_cells(world: &World) -> HashSet<CellCoord> {
        world.registry.occupied_cells(None)
    }

    /// Cells a `Move` from the unit would currently be accepted into.
    ///
    /// The set is empty while the unit cannot move at all: the match is
    /// over, its side is waiting, or it already moved or acted this round.
    pub fn reachable_cells(world: &World, id: UnitId) -> Result<ReachableSet, CommandError> {
        let unit = world
            .registry
            .get(id)
            .ok_or(CommandError::UnknownUnit(id))?;
        if !unit.is_alive() {
            return Err(CommandError::Incapacitated(id));
        }
        if world.turn.outcome().is_some()
            || world.turn.active() != unit.side
            || unit.has_acted
            || unit.has_moved
        {
            return Ok(ReachableSet::default());
        }

        let occupied = world.registry.occupied_cells(Some(id));
        Ok(solve(unit.cell, unit.stats.movement, world.bounds, &occupied))
    }

    /// Reports whether every living unit of `side` used its action.
    #[must_use]
    pub fn is_round_complete(world: &World, side: Side) -> bool {
        world.registry.is_round_complete(side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{MatchOutcome, UnitId, UnitStats};

    fn duel(attacker_stats: UnitStats, defender_hp: u32, seed: u64) -> World {
        let defender_stats = UnitStats {
            max_hp: defender_hp,
            ..Archetype::Melee.default_stats()
        };
        World::new(Config {
            bounds: GridBounds::new(4, 1),
            seed,
            teardown: Duration::from_millis(300),
            deployments: vec![
                Deployment {
                    side: Side::Attacker,
                    archetype: Archetype::Melee,
                    cell: CellCoord::new(0, 0),
                    stats: attacker_stats,
                },
                Deployment {
                    side: Side::Defender,
                    archetype: Archetype::Melee,
                    cell: CellCoord::new(1, 0),
                    stats: defender_stats,
                },
            ],
        })
        .expect("valid duel")
    }

    fn strike(world: &mut World, events: &mut Vec<Event>) {
        apply(
            world,
            Command::Attack {
                attacker: UnitId::new(0),
                target: UnitId::new(1),
            },
            events,
        )
        .expect("adjacent attack is legal");
    }

    #[test]
    fn default_config_sets_up_five_per_side() {
        let world = World::new(Config::default()).expect("default roster is valid");
        let units = query::units(&world);
        assert_eq!(units.living(Side::Attacker).count(), 5);
        assert_eq!(units.living(Side::Defender).count(), 5);
        assert_eq!(query::active_side(&world), Side::Attacker);
        assert_eq!(query::round(&world), 1);
    }

    #[test]
    fn zero_attack_power_always_misses() {
        let stats = UnitStats {
            attack_power: 0,
            ..Archetype::Melee.default_stats()
        };
        let mut world = duel(stats, 1, 3);
        let mut events = Vec::new();
        strike(&mut world, &mut events);

        assert_eq!(query::unit(&world, UnitId::new(1)).map(|unit| unit.hp), Some(1));
        assert!(query::outcome(&world).is_none());
        assert!(matches!(
            events.as_slice(),
            [Event::UnitAttacked {
                strike: skirmish_core::Strike::Miss,
                ..
            }]
        ));
    }

    #[test]
    fn killing_blow_ends_the_match_and_teardown_removes_body() {
        let stats = UnitStats {
            attack_power: 1,
            ..Archetype::Melee.default_stats()
        };
        let (mut world, mut events) = (0..64)
            .find_map(|seed| {
                let mut world = duel(stats, 1, seed);
                let mut events = Vec::new();
                strike(&mut world, &mut events);
                query::outcome(&world).map(|_| (world, events))
            })
            .expect("a one-point hit lands within 64 seeds");

        assert_eq!(
            query::outcome(&world),
            Some(MatchOutcome::Defeated(Side::Defender))
        );
        assert_eq!(
            events.last(),
            Some(&Event::MatchEnded {
                outcome: MatchOutcome::Defeated(Side::Defender)
            })
        );
        assert!(query::unit(&world, UnitId::new(1)).map_or(false, |unit| unit.dying));
        assert!(!query::occupied_cells(&world).contains(&CellCoord::new(1, 0)));

        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(299),
            },
            &mut events,
        )
        .expect("ticks are accepted after the match ends");
        assert_eq!(query::clock(&world), Duration::from_millis(299));
        assert!(query::unit(&world, UnitId::new(1)).is_some());

        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(1),
            },
            &mut events,
        )
        .expect("ticks are accepted after the match ends");
        assert!(events.contains(&Event::UnitRemoved {
            unit: UnitId::new(1)
        }));
        assert_eq!(query::clock(&world), Duration::from_millis(300));
        assert!(query::unit(&world, UnitId::new(1)).is_none());
        assert_eq!(
            query::reachable_cells(&world, UnitId::new(0)).map(|set| set.len()),
            Ok(0)
        );

        let rejected = apply(
            &mut world,
            Command::Hold {
                unit: UnitId::new(0),
            },
            &mut events,
        );
        assert_eq!(rejected, Err(CommandError::MatchOver));
    }

    #[test]
    fn same_seed_replays_identical_rolls() {
        let run = || {
            let mut world = World::new(Config::default()).expect("default roster");
            let mut events = Vec::new();
            apply(
                &mut world,
                Command::Move {
                    unit: UnitId::new(0),
                    destination: CellCoord::new(4, 1),
                },
                &mut events,
            )
            .expect("three steps east are reachable");
            apply(
                &mut world,
                Command::Hold {
                    unit: UnitId::new(0),
                },
                &mut events,
            )
            .expect("hold closes the follow-up");
            events
        };

        assert_eq!(run(), run());
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that decides the computer-controlled side's actions.
//!
//! Each call to [`OpponentPolicy::handle`] decides for exactly one unit, the
//! first living unit in registry order that has not acted. Callers apply the
//! emitted commands and call again with fresh views, so every decision sees
//! the board as left by the previous unit.

use std::collections::HashSet;

use skirmish_core::{CellCoord, Command, GridBounds, Side, UnitId, UnitSnapshot, UnitView};
use skirmish_system_reachability::reachable_cells;
use tracing::debug;

/// Action chosen for a single unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Strike the named unit without moving.
    Strike {
        /// Unit to attack.
        target: UnitId,
    },
    /// Walk toward the nearest enemy; the move spends the action.
    Advance {
        /// Cell to end the move on.
        destination: CellCoord,
    },
    /// Stay put and end the action.
    Hold,
}

/// Decision procedure for the side it controls.
#[derive(Debug)]
pub struct OpponentPolicy {
    side: Side,
    scratch: Vec<Command>,
}

impl OpponentPolicy {
    /// Creates a policy controlling the defender side.
    #[must_use]
    pub fn new() -> Self {
        Self::for_side(Side::Defender)
    }

    /// Creates a policy controlling `side`.
    #[must_use]
    pub fn for_side(side: Side) -> Self {
        Self {
            side,
            scratch: Vec::new(),
        }
    }

    /// Side whose units this policy commands.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Emits the commands for the next unit that still has to act.
    ///
    /// Nothing is emitted while the controlled side is inactive or once every
    /// living unit of that side has acted.
    pub fn handle(
        &mut self,
        active_side: Side,
        units: &UnitView,
        bounds: GridBounds,
        out: &mut Vec<Command>,
    ) {
        if active_side != self.side {
            return;
        }

        let Some(actor) = units.living(self.side).find(|unit| !unit.has_acted) else {
            return;
        };

        let decision = decide(actor, units, bounds);
        debug!(unit = actor.id.get(), ?decision, "opponent decided");

        self.scratch.clear();
        match decision {
            Decision::Strike { target } => self.scratch.push(Command::Attack {
                attacker: actor.id,
                target,
            }),
            Decision::Advance { destination } => self.scratch.push(Command::Move {
                unit: actor.id,
                destination,
            }),
            Decision::Hold => self.scratch.push(Command::Hold { unit: actor.id }),
        }

        out.append(&mut self.scratch);
    }
}

impl Default for OpponentPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides what `actor` does this round.
///
/// The nearest enemy already in range is attacked; otherwise the unit moves to
/// the reachable cell closest to the nearest enemy on the board. Distance ties
/// keep the earliest candidate in registry order, staying put wins movement
/// ties, and a unit that moves never attacks in the same round.
#[must_use]
pub fn decide(actor: &UnitSnapshot, units: &UnitView, bounds: GridBounds) -> Decision {
    let distance = |unit: &&UnitSnapshot| actor.cell.manhattan_distance(unit.cell);
    let enemies = || units.living(actor.side.opponent());

    if let Some(target) = enemies()
        .filter(|enemy| actor.in_range_of(enemy))
        .min_by_key(distance)
    {
        return Decision::Strike { target: target.id };
    }

    let Some(nearest) = enemies().min_by_key(distance) else {
        return Decision::Hold;
    };

    let budget = if actor.has_moved {
        0
    } else {
        actor.stats.movement
    };
    let occupied: HashSet<CellCoord> = units
        .occupied_cells()
        .filter(|cell| *cell != actor.cell)
        .collect();
    let reachable = reachable_cells(actor.cell, budget, bounds, &occupied);
    let destination = reachable.closest_to(actor.cell, nearest.cell);

    if destination == actor.cell {
        Decision::Hold
    } else {
        Decision::Advance { destination }
    }
}

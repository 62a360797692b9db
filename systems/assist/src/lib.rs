#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure systems that translate the attacking player's intent into commands.
//!
//! [`Assist`] backs the click-to-attack affordance: a melee unit ordered to
//! strike a distant enemy first walks into reach. [`Autopilot`] plays the
//! whole attacker side on top of it when no human is at the controls.

use std::{cmp::Reverse, collections::HashSet};

use skirmish_core::{
    Archetype, CellCoord, Command, GridBounds, Side, UnitId, UnitSnapshot, UnitView,
};
use skirmish_system_reachability::reachable_cells;
use tracing::debug;

/// Plan produced when a unit can engage the requested target this round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engagement {
    /// The target is already within reach.
    Strike {
        /// Unit to attack.
        target: UnitId,
    },
    /// Step next to the target, then strike.
    Close {
        /// Cell the attacker walks to.
        destination: CellCoord,
        /// Unit to attack once there.
        target: UnitId,
    },
}

impl Engagement {
    /// Appends the commands that carry out the plan for `attacker`.
    pub fn push_commands(self, attacker: UnitId, out: &mut Vec<Command>) {
        match self {
            Self::Strike { target } => out.push(Command::Attack { attacker, target }),
            Self::Close {
                destination,
                target,
            } => {
                out.push(Command::Move {
                    unit: attacker,
                    destination,
                });
                out.push(Command::Attack { attacker, target });
            }
        }
    }
}

/// Engagement planner that reuses its occupancy scratch buffer.
#[derive(Debug, Default)]
pub struct Assist {
    occupied: HashSet<CellCoord>,
}

impl Assist {
    /// Creates a planner with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans how `attacker` engages `target`, if it can this round.
    ///
    /// A target in range is struck directly, including by a unit that just
    /// moved and still has its follow-up. A melee unit that has neither moved
    /// nor acted walks to the first reachable cell, in search order, from
    /// which the target is in range. Anything else yields `None`.
    pub fn engage(
        &mut self,
        attacker: &UnitSnapshot,
        target: &UnitSnapshot,
        units: &UnitView,
        bounds: GridBounds,
    ) -> Option<Engagement> {
        if !attacker.can_engage() || !target.is_alive() || target.side == attacker.side {
            return None;
        }

        if attacker.in_range_of(target) {
            return Some(Engagement::Strike { target: target.id });
        }

        if attacker.archetype != Archetype::Melee || !attacker.is_ready() {
            return None;
        }

        self.occupied.clear();
        self.occupied.extend(
            units
                .occupied_cells()
                .filter(|cell| *cell != attacker.cell),
        );
        let reachable = reachable_cells(
            attacker.cell,
            attacker.stats.movement,
            bounds,
            &self.occupied,
        );
        let engagement = reachable
            .iter()
            .find(|cell| cell.manhattan_distance(target.cell) <= attacker.stats.attack_range)
            .map(|destination| Engagement::Close {
                destination,
                target: target.id,
            });
        engagement
    }
}

/// Headless controller for one side, deciding a unit per call.
#[derive(Debug)]
pub struct Autopilot {
    side: Side,
    assist: Assist,
}

impl Autopilot {
    /// Creates an autopilot for the attacker side.
    #[must_use]
    pub fn new() -> Self {
        Self::for_side(Side::Attacker)
    }

    /// Creates an autopilot for `side`.
    #[must_use]
    pub fn for_side(side: Side) -> Self {
        Self {
            side,
            assist: Assist::new(),
        }
    }

    /// Side this autopilot plays.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Emits commands for the next ready unit, or `EndTurn` once none is left.
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
            if units.living(self.side).next().is_some() {
                out.push(Command::EndTurn { side: self.side });
            }
            return;
        };

        if actor.archetype.can_heal() {
            Self::tend(actor, units, out);
        } else {
            self.fight(actor, units, bounds, out);
        }
    }

    fn tend(healer: &UnitSnapshot, units: &UnitView, out: &mut Vec<Command>) {
        let patient = units
            .living(healer.side)
            .filter(|ally| ally.id != healer.id && ally.hp < ally.stats.max_hp)
            .filter(|ally| healer.in_range_of(ally))
            .min_by_key(|ally| Reverse(ally.stats.max_hp - ally.hp));

        match patient {
            Some(ally) => {
                debug!(healer = healer.id.get(), target = ally.id.get(), "autopilot heals");
                out.push(Command::Heal {
                    healer: healer.id,
                    target: ally.id,
                });
            }
            None => out.push(Command::Hold { unit: healer.id }),
        }
    }

    fn fight(
        &mut self,
        actor: &UnitSnapshot,
        units: &UnitView,
        bounds: GridBounds,
        out: &mut Vec<Command>,
    ) {
        let Some(target) = units
            .living(actor.side.opponent())
            .min_by_key(|enemy| actor.cell.manhattan_distance(enemy.cell))
        else {
            out.push(Command::Hold { unit: actor.id });
            return;
        };

        if let Some(engagement) = self.assist.engage(actor, target, units, bounds) {
            debug!(unit = actor.id.get(), ?engagement, "autopilot engages");
            engagement.push_commands(actor.id, out);
            return;
        }

        let occupied: HashSet<CellCoord> = units
            .occupied_cells()
            .filter(|cell| *cell != actor.cell)
            .collect();
        let reachable = reachable_cells(actor.cell, actor.stats.movement, bounds, &occupied);
        let destination = reachable.closest_to(actor.cell, target.cell);
        if destination == actor.cell {
            out.push(Command::Hold { unit: actor.id });
        } else {
            out.push(Command::Move {
                unit: actor.id,
                destination,
            });
        }
    }
}

impl Default for Autopilot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::UnitStats;

    fn snapshot(id: u32, side: Side, archetype: Archetype, column: u32, row: u32) -> UnitSnapshot {
        let stats = archetype.default_stats();
        UnitSnapshot {
            id: UnitId::new(id),
            side,
            archetype,
            cell: CellCoord::new(column, row),
            hp: stats.max_hp,
            stats,
            has_acted: false,
            has_moved: false,
            follow_up_open: false,
            dying: false,
        }
    }

    #[test]
    fn adjacent_target_is_struck_in_place() {
        let knight = snapshot(0, Side::Attacker, Archetype::Melee, 2, 2);
        let goblin = snapshot(1, Side::Defender, Archetype::Melee, 2, 3);
        let units = UnitView::from_snapshots(vec![knight.clone(), goblin.clone()]);

        assert_eq!(
            Assist::new().engage(&knight, &goblin, &units, GridBounds::new(5, 5)),
            Some(Engagement::Strike {
                target: UnitId::new(1)
            })
        );
    }

    #[test]
    fn melee_closes_in_using_first_cell_in_search_order() {
        let knight = snapshot(0, Side::Attacker, Archetype::Melee, 2, 2);
        let goblin = snapshot(1, Side::Defender, Archetype::Melee, 4, 3);
        let units = UnitView::from_snapshots(vec![knight.clone(), goblin.clone()]);

        let engagement = Assist::new().engage(&knight, &goblin, &units, GridBounds::new(6, 6));
        assert_eq!(
            engagement,
            Some(Engagement::Close {
                destination: CellCoord::new(4, 2),
                target: UnitId::new(1),
            })
        );

        let mut commands = Vec::new();
        engagement
            .expect("target reachable")
            .push_commands(UnitId::new(0), &mut commands);
        assert_eq!(
            commands,
            vec![
                Command::Move {
                    unit: UnitId::new(0),
                    destination: CellCoord::new(4, 2),
                },
                Command::Attack {
                    attacker: UnitId::new(0),
                    target: UnitId::new(1),
                },
            ]
        );
    }

    #[test]
    fn ranged_units_never_step_in() {
        let mut archer = snapshot(0, Side::Attacker, Archetype::Ranged, 0, 0);
        archer.stats = UnitStats {
            attack_range: 1,
            ..archer.stats
        };
        let goblin = snapshot(1, Side::Defender, Archetype::Melee, 2, 0);
        let units = UnitView::from_snapshots(vec![archer.clone(), goblin.clone()]);

        assert_eq!(
            Assist::new().engage(&archer, &goblin, &units, GridBounds::new(4, 1)),
            None
        );
    }

    #[test]
    fn unreachable_or_invalid_targets_yield_nothing() {
        let knight = snapshot(0, Side::Attacker, Archetype::Melee, 0, 0);
        let far = snapshot(1, Side::Defender, Archetype::Melee, 9, 0);
        let ally = snapshot(2, Side::Attacker, Archetype::Ranged, 0, 1);
        let units = UnitView::from_snapshots(vec![knight.clone(), far.clone(), ally.clone()]);
        let mut assist = Assist::new();
        let bounds = GridBounds::new(10, 2);

        assert_eq!(assist.engage(&knight, &far, &units, bounds), None);
        assert_eq!(assist.engage(&knight, &ally, &units, bounds), None);

        let mut moved = knight.clone();
        moved.has_moved = true;
        moved.has_acted = true;
        moved.follow_up_open = true;
        let near = snapshot(3, Side::Defender, Archetype::Melee, 2, 0);
        assert_eq!(assist.engage(&moved, &near, &units, bounds), None);
    }

    #[test]
    fn moved_unit_strikes_with_its_follow_up() {
        let mut knight = snapshot(0, Side::Attacker, Archetype::Melee, 1, 0);
        knight.has_moved = true;
        knight.has_acted = true;
        knight.follow_up_open = true;
        let goblin = snapshot(1, Side::Defender, Archetype::Melee, 2, 0);
        let units = UnitView::from_snapshots(vec![knight.clone(), goblin.clone()]);
        let mut assist = Assist::new();
        let bounds = GridBounds::new(4, 1);

        assert_eq!(
            assist.engage(&knight, &goblin, &units, bounds),
            Some(Engagement::Strike {
                target: UnitId::new(1)
            })
        );

        knight.follow_up_open = false;
        assert_eq!(assist.engage(&knight, &goblin, &units, bounds), None);
    }

    #[test]
    fn healer_tends_the_most_wounded_ally_in_reach() {
        let healer = snapshot(0, Side::Attacker, Archetype::Healer, 2, 2);
        let mut scratched = snapshot(1, Side::Attacker, Archetype::Melee, 2, 3);
        scratched.hp -= 2;
        let mut mauled = snapshot(2, Side::Attacker, Archetype::Melee, 3, 2);
        mauled.hp -= 9;
        let mut distant = snapshot(3, Side::Attacker, Archetype::Melee, 7, 2);
        distant.hp = 1;
        let units = UnitView::from_snapshots(vec![
            healer,
            scratched,
            mauled,
            distant,
            snapshot(4, Side::Defender, Archetype::Melee, 9, 5),
        ]);
        let mut out = Vec::new();

        Autopilot::new().handle(Side::Attacker, &units, GridBounds::new(10, 6), &mut out);
        assert_eq!(
            out,
            vec![Command::Heal {
                healer: UnitId::new(0),
                target: UnitId::new(2),
            }]
        );
    }

    #[test]
    fn fighter_out_of_reach_only_advances() {
        let units = UnitView::from_snapshots(vec![
            snapshot(0, Side::Attacker, Archetype::Ranged, 0, 0),
            snapshot(1, Side::Defender, Archetype::Melee, 9, 0),
        ]);
        let mut out = Vec::new();

        Autopilot::new().handle(Side::Attacker, &units, GridBounds::new(10, 1), &mut out);
        assert_eq!(
            out,
            vec![Command::Move {
                unit: UnitId::new(0),
                destination: CellCoord::new(3, 0),
            }],
            "the move alone spends the action"
        );
    }

    #[test]
    fn ends_the_turn_once_everyone_acted() {
        let mut spent = snapshot(0, Side::Attacker, Archetype::Melee, 0, 0);
        spent.has_acted = true;
        let units = UnitView::from_snapshots(vec![
            spent,
            snapshot(1, Side::Defender, Archetype::Melee, 5, 0),
        ]);
        let mut out = Vec::new();
        let mut autopilot = Autopilot::new();
        assert_eq!(autopilot.side(), Side::Attacker);

        autopilot.handle(Side::Defender, &units, GridBounds::new(6, 1), &mut out);
        assert!(out.is_empty());

        autopilot.handle(Side::Attacker, &units, GridBounds::new(6, 1), &mut out);
        assert_eq!(
            out,
            vec![Command::EndTurn {
                side: Side::Attacker
            }]
        );
    }
}

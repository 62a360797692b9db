//! Validation and execution of unit actions.
//!
//! Every resolver validates the full command against the current registry
//! before touching it, so a rejected command leaves no trace in either the
//! world or the effect stream.
//!
//! A completed move spends the unit's action but leaves one follow-up open:
//! an attack or heal issued next still resolves, and a hold closes it.

use rand::Rng;
use skirmish_core::{CellCoord, CommandError, Event, Heading, Side, Strike, UnitId, UnitStats};
use skirmish_system_reachability::{reachable_cells, step_path};
use tracing::debug;

use crate::World;

/// Copy of the actor fields the resolvers need after validation.
#[derive(Clone, Copy, Debug)]
struct Actor {
    side: Side,
    cell: CellCoord,
    stats: UnitStats,
    can_heal: bool,
}

impl World {
    fn ready_actor(&self, id: UnitId, follow_up: bool) -> Result<Actor, CommandError> {
        self.turn.ensure_open()?;
        let unit = self
            .registry
            .get(id)
            .ok_or(CommandError::UnknownUnit(id))?;
        if !unit.is_alive() {
            return Err(CommandError::Incapacitated(id));
        }
        self.turn.ensure_active(unit.side)?;
        if unit.has_acted && !(follow_up && unit.follow_up) {
            return Err(CommandError::ActionAlreadyUsed);
        }

        Ok(Actor {
            side: unit.side,
            cell: unit.cell,
            stats: unit.stats,
            can_heal: unit.archetype.can_heal(),
        })
    }

    /// Returns the target's cell once it passes the side and liveness checks.
    fn living_target(
        &self,
        actor: UnitId,
        target: UnitId,
        side: Side,
    ) -> Result<CellCoord, CommandError> {
        let unit = self
            .registry
            .get(target)
            .ok_or(CommandError::UnknownUnit(target))?;
        if unit.id == actor || unit.side != side || !unit.is_alive() {
            return Err(CommandError::InvalidTarget);
        }
        Ok(unit.cell)
    }

    pub(crate) fn resolve_move(
        &mut self,
        unit: UnitId,
        destination: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        let actor = self.ready_actor(unit, false)?;
        if !self.bounds.contains(destination) {
            return Err(CommandError::IllegalMove);
        }

        let occupied = self.registry.occupied_cells(Some(unit));
        let reachable = reachable_cells(actor.cell, actor.stats.movement, self.bounds, &occupied);
        if !reachable.contains(destination) {
            return Err(CommandError::IllegalMove);
        }
        let path = step_path(
            actor.cell,
            destination,
            actor.stats.movement,
            self.bounds,
            &occupied,
        )
        .ok_or(CommandError::IllegalMove)?;

        let record = self
            .registry
            .get_mut(unit)
            .ok_or(CommandError::UnknownUnit(unit))?;
        let mut from = actor.cell;
        for to in path {
            record.cell = to;
            out_events.push(Event::UnitStepped { unit, from, to });
            from = to;
        }
        record.has_moved = true;
        record.has_acted = true;
        record.follow_up = true;

        debug!(unit = unit.get(), ?destination, "unit moved");
        Ok(())
    }

    pub(crate) fn resolve_attack(
        &mut self,
        attacker: UnitId,
        target: UnitId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        let actor = self.ready_actor(attacker, true)?;
        let target_cell = self.living_target(attacker, target, actor.side.opponent())?;
        if actor.cell.manhattan_distance(target_cell) > actor.stats.attack_range {
            return Err(CommandError::OutOfRange);
        }

        let damage = self.rng.gen_range(0..=actor.stats.attack_power);
        let facing = Heading::between(actor.cell, target_cell);
        let now = self.clock;
        let died = self
            .registry
            .get_mut(target)
            .map_or(false, |unit| unit.take_damage(damage, now));
        self.mark_acted(attacker);

        let strike = Strike::from_damage(damage);
        out_events.push(Event::UnitAttacked {
            attacker,
            target,
            facing,
            strike,
        });
        debug!(attacker = attacker.get(), target = target.get(), ?strike, "attack resolved");

        if died {
            out_events.push(Event::UnitDied {
                unit: target,
                killer: attacker,
                knockback: facing,
            });
            debug!(unit = target.get(), "unit died");
        }
        Ok(())
    }

    pub(crate) fn resolve_heal(
        &mut self,
        healer: UnitId,
        target: UnitId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        let actor = self.ready_actor(healer, true)?;
        if !actor.can_heal {
            return Err(CommandError::NotAHealer);
        }
        let target_cell = self.living_target(healer, target, actor.side)?;
        if actor.cell.manhattan_distance(target_cell) > actor.stats.attack_range {
            return Err(CommandError::OutOfRange);
        }

        let roll = self.rng.gen_range(0..=actor.stats.effective_heal_power());
        let amount = self
            .registry
            .get_mut(target)
            .map_or(0, |unit| unit.restore(roll));
        self.mark_acted(healer);

        out_events.push(Event::UnitHealed {
            healer,
            target,
            amount,
        });
        debug!(healer = healer.get(), target = target.get(), amount, "heal resolved");
        Ok(())
    }

    pub(crate) fn resolve_hold(
        &mut self,
        unit: UnitId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        let _ = self.ready_actor(unit, true)?;
        self.mark_acted(unit);
        out_events.push(Event::UnitHeld { unit });
        debug!(unit = unit.get(), "unit held");
        Ok(())
    }

    fn mark_acted(&mut self, id: UnitId) {
        if let Some(unit) = self.registry.get_mut(id) {
            unit.has_acted = true;
            unit.follow_up = false;
        }
    }
}

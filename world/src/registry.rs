//! Canonical unit records and their lifecycle.

use std::{collections::HashSet, time::Duration};

use skirmish_core::{
    Archetype, CellCoord, Deployment, Event, GridBounds, Side, UnitId, UnitSnapshot, UnitStats,
};

use crate::SetupError;

#[derive(Clone, Debug)]
pub(crate) struct Unit {
    pub(crate) id: UnitId,
    pub(crate) side: Side,
    pub(crate) archetype: Archetype,
    pub(crate) cell: CellCoord,
    pub(crate) hp: u32,
    pub(crate) stats: UnitStats,
    pub(crate) has_acted: bool,
    pub(crate) has_moved: bool,
    /// Set by a completed move; cleared once the chained attack or heal is spent.
    pub(crate) follow_up: bool,
    died_at: Option<Duration>,
}

impl Unit {
    fn from_deployment(id: UnitId, deployment: &Deployment) -> Self {
        Self {
            id,
            side: deployment.side,
            archetype: deployment.archetype,
            cell: deployment.cell,
            hp: deployment.stats.max_hp,
            stats: deployment.stats,
            has_acted: false,
            has_moved: false,
            follow_up: false,
            died_at: None,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.died_at.is_none() && self.hp > 0
    }

    /// Applies damage and reports whether this blow started the unit's teardown.
    pub(crate) fn take_damage(&mut self, damage: u32, now: Duration) -> bool {
        self.hp = self.hp.saturating_sub(damage);
        if self.hp == 0 && self.died_at.is_none() {
            self.died_at = Some(now);
            return true;
        }
        false
    }

    /// Restores hit points up to the maximum and returns the amount applied.
    pub(crate) fn restore(&mut self, amount: u32) -> u32 {
        let healed = self.hp.saturating_add(amount).min(self.stats.max_hp);
        let applied = healed - self.hp;
        self.hp = healed;
        applied
    }

    fn reset_actions(&mut self) {
        self.has_acted = false;
        self.has_moved = false;
        self.follow_up = false;
    }

    fn teardown_elapsed(&self, now: Duration, teardown: Duration) -> bool {
        self.died_at
            .map_or(false, |died_at| now.saturating_sub(died_at) >= teardown)
    }

    pub(crate) fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            side: self.side,
            archetype: self.archetype,
            cell: self.cell,
            hp: self.hp,
            stats: self.stats,
            has_acted: self.has_acted,
            has_moved: self.has_moved,
            follow_up_open: self.follow_up && self.is_alive(),
            dying: self.died_at.is_some(),
        }
    }
}

/// Exclusive owner of every unit record, kept in deployment order.
#[derive(Clone, Debug, Default)]
pub(crate) struct UnitRegistry {
    units: Vec<Unit>,
}

impl UnitRegistry {
    pub(crate) fn from_deployments(
        bounds: GridBounds,
        deployments: &[Deployment],
    ) -> Result<Self, SetupError> {
        if bounds.cell_count() == 0 {
            return Err(SetupError::EmptyGrid);
        }

        let mut taken = HashSet::with_capacity(deployments.len());
        let mut units = Vec::with_capacity(deployments.len());
        for (index, deployment) in deployments.iter().enumerate() {
            if !bounds.contains(deployment.cell) {
                return Err(SetupError::OutOfBounds {
                    cell: deployment.cell,
                });
            }
            if !taken.insert(deployment.cell) {
                return Err(SetupError::CellTaken {
                    cell: deployment.cell,
                });
            }
            if deployment.stats.max_hp == 0 {
                return Err(SetupError::InvalidStats { index });
            }

            let id = UnitId::new(u32::try_from(index).map_err(|_| SetupError::RosterTooLarge)?);
            units.push(Unit::from_deployment(id, deployment));
        }

        let registry = Self { units };
        for side in [Side::Attacker, Side::Defender] {
            if !registry.has_living(side) {
                return Err(SetupError::MissingSide(side));
            }
        }
        Ok(registry)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub(crate) fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|unit| unit.id == id)
    }

    fn living(&self, side: Side) -> impl Iterator<Item = &Unit> {
        self.units
            .iter()
            .filter(move |unit| unit.side == side && unit.is_alive())
    }

    pub(crate) fn has_living(&self, side: Side) -> bool {
        self.living(side).next().is_some()
    }

    pub(crate) fn is_round_complete(&self, side: Side) -> bool {
        self.living(side).all(|unit| unit.has_acted)
    }

    /// Cells held by living units, optionally leaving out one unit's own cell.
    pub(crate) fn occupied_cells(&self, except: Option<UnitId>) -> HashSet<CellCoord> {
        self.units
            .iter()
            .filter(|unit| unit.is_alive() && Some(unit.id) != except)
            .map(|unit| unit.cell)
            .collect()
    }

    pub(crate) fn reset_actions(&mut self, side: Side) {
        self.units
            .iter_mut()
            .filter(|unit| unit.side == side && unit.is_alive())
            .for_each(Unit::reset_actions);
    }

    /// Erases every dead unit whose teardown window has elapsed.
    pub(crate) fn remove_expired(
        &mut self,
        now: Duration,
        teardown: Duration,
        out_events: &mut Vec<Event>,
    ) {
        self.units.retain(|unit| {
            if unit.teardown_elapsed(now, teardown) {
                out_events.push(Event::UnitRemoved { unit: unit.id });
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deploy(side: Side, column: u32, row: u32) -> Deployment {
        Deployment::stock(side, Archetype::Melee, CellCoord::new(column, row))
    }

    #[test]
    fn ids_follow_deployment_order() {
        let registry = UnitRegistry::from_deployments(
            GridBounds::new(4, 4),
            &[deploy(Side::Attacker, 0, 0), deploy(Side::Defender, 3, 3)],
        )
        .expect("valid roster");

        let ids: Vec<_> = registry.iter().map(|unit| unit.id.get()).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn setup_rejects_shared_cells() {
        let result = UnitRegistry::from_deployments(
            GridBounds::new(4, 4),
            &[deploy(Side::Attacker, 1, 1), deploy(Side::Defender, 1, 1)],
        );
        assert!(matches!(result, Err(SetupError::CellTaken { .. })));
    }

    #[test]
    fn setup_requires_both_sides() {
        let result =
            UnitRegistry::from_deployments(GridBounds::new(4, 4), &[deploy(Side::Attacker, 0, 0)]);
        assert!(matches!(result, Err(SetupError::MissingSide(Side::Defender))));
    }

    #[test]
    fn reset_reopens_moved_units() {
        let mut registry = UnitRegistry::from_deployments(
            GridBounds::new(4, 4),
            &[deploy(Side::Attacker, 0, 0), deploy(Side::Defender, 3, 3)],
        )
        .expect("valid roster");
        let mover = registry.get_mut(UnitId::new(0)).expect("deployed");
        mover.has_moved = true;
        mover.has_acted = true;
        mover.follow_up = true;
        assert!(registry.is_round_complete(Side::Attacker));
        assert!(!registry.is_round_complete(Side::Defender));

        registry.reset_actions(Side::Attacker);
        let snapshot = registry.get(UnitId::new(0)).expect("deployed").snapshot();
        assert!(snapshot.is_ready());
        assert!(!snapshot.has_moved && !snapshot.follow_up_open);
    }

    #[test]
    fn damage_triggers_teardown_once() {
        let mut unit = Unit::from_deployment(UnitId::new(0), &deploy(Side::Defender, 0, 0));
        assert!(!unit.take_damage(5, Duration::ZERO));
        assert!(unit.take_damage(100, Duration::from_millis(10)));
        assert_eq!(unit.hp, 0);
        assert!(!unit.take_damage(1, Duration::from_millis(20)));
        assert!(!unit.is_alive());
        assert!(!unit.teardown_elapsed(Duration::from_millis(500), Duration::from_secs(1)));
        assert!(unit.teardown_elapsed(Duration::from_millis(1010), Duration::from_secs(1)));
    }

    #[test]
    fn restore_clamps_to_maximum() {
        let mut unit = Unit::from_deployment(UnitId::new(0), &deploy(Side::Attacker, 0, 0));
        let _ = unit.take_damage(3, Duration::ZERO);
        assert_eq!(unit.restore(10), 3);
        assert_eq!(unit.hp, unit.stats.max_hp);
        assert_eq!(unit.restore(4), 0);
    }
}

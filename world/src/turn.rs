//! Turn state machine alternating control between the two sides.

use skirmish_core::{CommandError, Event, MatchOutcome, Side};
use tracing::info;

use crate::registry::UnitRegistry;

#[derive(Clone, Debug)]
pub(crate) struct TurnController {
    active: Side,
    round: u32,
    outcome: Option<MatchOutcome>,
}

impl TurnController {
    pub(crate) fn new() -> Self {
        Self {
            active: Side::Attacker,
            round: 1,
            outcome: None,
        }
    }

    pub(crate) fn active(&self) -> Side {
        self.active
    }

    pub(crate) fn round(&self) -> u32 {
        self.round
    }

    pub(crate) fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub(crate) fn ensure_open(&self) -> Result<(), CommandError> {
        if self.outcome.is_some() {
            return Err(CommandError::MatchOver);
        }
        Ok(())
    }

    pub(crate) fn ensure_active(&self, side: Side) -> Result<(), CommandError> {
        if side != self.active {
            return Err(CommandError::WrongTurn);
        }
        Ok(())
    }

    /// Hands control to the opposing side once every living unit of `side` acted.
    pub(crate) fn end_turn(
        &mut self,
        registry: &mut UnitRegistry,
        side: Side,
        out_events: &mut Vec<Event>,
    ) -> Result<(), CommandError> {
        self.ensure_open()?;
        self.ensure_active(side)?;
        if !registry.is_round_complete(side) {
            return Err(CommandError::RoundIncomplete);
        }

        self.flip(registry, out_events);
        Ok(())
    }

    /// Runs the terminal check and the automatic defender hand-back.
    ///
    /// Attacker-side defeat is evaluated first, so it wins when both sides are
    /// wiped out at once.
    pub(crate) fn settle(&mut self, registry: &mut UnitRegistry, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }

        let defeated = [Side::Attacker, Side::Defender]
            .into_iter()
            .find(|side| !registry.has_living(*side));
        if let Some(side) = defeated {
            let outcome = MatchOutcome::Defeated(side);
            self.outcome = Some(outcome);
            info!(loser = ?side, round = self.round, "match ended");
            out_events.push(Event::MatchEnded { outcome });
            return;
        }

        if self.active == Side::Defender && registry.is_round_complete(Side::Defender) {
            self.flip(registry, out_events);
        }
    }

    fn flip(&mut self, registry: &mut UnitRegistry, out_events: &mut Vec<Event>) {
        let next = self.active.opponent();
        registry.reset_actions(next);
        if next == Side::Attacker {
            self.round = self.round.saturating_add(1);
        }
        self.active = next;
        info!(side = ?next, round = self.round, "turn started");
        out_events.push(Event::TurnStarted {
            side: next,
            round: self.round,
        });
    }
}

//! Headless match driver pairing the autopilot with the opponent policy.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use skirmish_core::{Command, Event, MatchOutcome, Side};
use skirmish_system_assist::Autopilot;
use skirmish_system_opponent::OpponentPolicy;
use skirmish_system_sequencer::{Pacing, Sequencer};
use skirmish_world::{self as world, query, Config, World};
use tracing::{debug, info};

/// Simulated time advanced per presentation frame.
const FRAME: Duration = Duration::from_millis(50);

/// Summary of a finished or abandoned match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Report {
    /// Terminal result, or `None` when the round limit was hit first.
    pub(crate) outcome: Option<MatchOutcome>,
    /// Round the match stopped in.
    pub(crate) round: u32,
    /// Number of effects played back.
    pub(crate) effects: usize,
}

/// Owns the world together with both controllers and the playback queue.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    autopilot: Autopilot,
    opponent: OpponentPolicy,
    sequencer: Sequencer,
    commands: Vec<Command>,
    events: Vec<Event>,
    played: Vec<Event>,
}

impl Session {
    /// Sets up a match from `config`.
    pub(crate) fn new(config: Config, pacing: Pacing) -> Result<Self> {
        let world = World::new(config).context("scenario cannot be deployed")?;
        Ok(Self {
            world,
            autopilot: Autopilot::for_side(Side::Attacker),
            opponent: OpponentPolicy::for_side(Side::Defender),
            sequencer: Sequencer::new(pacing),
            commands: Vec::new(),
            events: Vec::new(),
            played: Vec::new(),
        })
    }

    /// Plays until the match ends or `max_rounds` rounds have been started.
    ///
    /// Every effect is handed to `observe` once its playback finished.
    pub(crate) fn run(
        &mut self,
        max_rounds: u32,
        mut observe: impl FnMut(&Event),
    ) -> Result<Report> {
        let mut effects = 0;

        while query::outcome(&self.world).is_none() && query::round(&self.world) <= max_rounds {
            effects += self.drain(&mut observe)?;

            let active = query::active_side(&self.world);
            let units = query::units(&self.world);
            let bounds = query::bounds(&self.world);
            self.commands.clear();
            match active {
                Side::Attacker => {
                    self.autopilot
                        .handle(active, &units, bounds, &mut self.commands);
                }
                Side::Defender => {
                    self.opponent
                        .handle(active, &units, bounds, &mut self.commands);
                }
            }
            if self.commands.is_empty() {
                bail!("no controller issued commands for the {active:?} side");
            }

            for command in self.commands.drain(..) {
                debug!(?command, "submitting");
                world::apply(&mut self.world, command.clone(), &mut self.events)
                    .with_context(|| format!("controller issued an illegal command {command:?}"))?;
            }
            self.sequencer.extend(&self.events);
            self.events.clear();
        }

        effects += self.drain(&mut observe)?;

        let report = Report {
            outcome: query::outcome(&self.world),
            round: query::round(&self.world),
            effects,
        };
        info!(outcome = ?report.outcome, round = report.round, effects, "session finished");
        Ok(report)
    }

    /// Plays back every queued effect while the world clock keeps pace.
    fn drain(&mut self, observe: &mut impl FnMut(&Event)) -> Result<usize> {
        let mut count = 0;
        while !self.sequencer.is_idle() {
            self.sequencer.advance(FRAME, &mut self.played);
            world::apply(&mut self.world, Command::Tick { dt: FRAME }, &mut self.events)
                .context("world rejected a clock tick")?;

            // Clock ticks carry no presentation of their own.
            self.events
                .retain(|event| !matches!(event, Event::TimeAdvanced { .. }));
            self.sequencer.extend(&self.events);
            self.events.clear();

            count += self.played.len();
            for event in self.played.drain(..) {
                observe(&event);
            }
        }
        Ok(count)
    }
}

/// One-line narration of an effect.
pub(crate) fn describe(event: &Event) -> String {
    match event {
        Event::TimeAdvanced { dt } => format!("clock advanced {}ms", dt.as_millis()),
        Event::UnitStepped { unit, from, to } => format!(
            "unit {} steps ({}, {}) -> ({}, {})",
            unit.get(),
            from.column(),
            from.row(),
            to.column(),
            to.row()
        ),
        Event::UnitAttacked {
            attacker,
            target,
            strike,
            ..
        } => match strike.damage() {
            0 => format!("unit {} misses unit {}", attacker.get(), target.get()),
            damage => format!(
                "unit {} hits unit {} for {damage}",
                attacker.get(),
                target.get()
            ),
        },
        Event::UnitHealed {
            healer,
            target,
            amount,
        } => format!(
            "unit {} heals unit {} for {amount}",
            healer.get(),
            target.get()
        ),
        Event::UnitHeld { unit } => format!("unit {} holds", unit.get()),
        Event::UnitDied { unit, killer, .. } => {
            format!("unit {} falls to unit {}", unit.get(), killer.get())
        }
        Event::UnitRemoved { unit } => format!("unit {} leaves the field", unit.get()),
        Event::TurnStarted { side, round } => format!("round {round}: {side:?} turn"),
        Event::MatchEnded { outcome } => format!("{:?} side wins", outcome.winner()),
    }
}

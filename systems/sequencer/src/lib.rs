#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Presentation queue that replays effects the world already resolved.
//!
//! The sequencer holds effects in the order they were emitted and releases
//! each one after its playback time has elapsed. It never inspects outcomes;
//! hosts use [`Sequencer::is_busy`] to withhold new commands from a unit
//! whose effects are still on screen.

use std::{collections::VecDeque, time::Duration};

use skirmish_core::{Event, UnitId};

/// Playback time for a single orthogonal step.
pub const DEFAULT_STEP: Duration = Duration::from_millis(200);
/// Playback time for a strike, including the hit or miss reaction.
pub const DEFAULT_ATTACK: Duration = Duration::from_millis(600);
/// Playback time for a heal.
pub const DEFAULT_HEAL: Duration = Duration::from_millis(500);
/// Playback time for the fall and fade of a dead unit.
pub const DEFAULT_DEATH: Duration = Duration::from_millis(1_500);

/// Playback time assigned to each kind of effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    /// Time spent on each `UnitStepped`.
    pub step: Duration,
    /// Time spent on each `UnitAttacked`.
    pub attack: Duration,
    /// Time spent on each `UnitHealed`.
    pub heal: Duration,
    /// Time spent on each `UnitDied`.
    pub death: Duration,
}

impl Pacing {
    /// Pacing that releases every effect immediately.
    pub const INSTANT: Self = Self {
        step: Duration::ZERO,
        attack: Duration::ZERO,
        heal: Duration::ZERO,
        death: Duration::ZERO,
    };

    /// Playback time for `event`. Bookkeeping effects take no time.
    #[must_use]
    pub const fn duration_of(&self, event: &Event) -> Duration {
        match event {
            Event::UnitStepped { .. } => self.step,
            Event::UnitAttacked { .. } => self.attack,
            Event::UnitHealed { .. } => self.heal,
            Event::UnitDied { .. } => self.death,
            Event::TimeAdvanced { .. }
            | Event::UnitHeld { .. }
            | Event::UnitRemoved { .. }
            | Event::TurnStarted { .. }
            | Event::MatchEnded { .. } => Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            attack: DEFAULT_ATTACK,
            heal: DEFAULT_HEAL,
            death: DEFAULT_DEATH,
        }
    }
}

/// Effect currently on screen together with how far it has played.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Playback<'a> {
    /// Effect being played.
    pub event: &'a Event,
    /// Time already spent on the effect.
    pub elapsed: Duration,
    /// Total playback time of the effect.
    pub duration: Duration,
}

impl Playback<'_> {
    /// Fraction of the effect already played, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }
}

/// FIFO of resolved effects awaiting playback.
#[derive(Debug, Default)]
pub struct Sequencer {
    pacing: Pacing,
    queue: VecDeque<Event>,
    elapsed: Duration,
}

impl Sequencer {
    /// Creates an empty sequencer using the provided pacing.
    #[must_use]
    pub fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            queue: VecDeque::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Pacing the sequencer plays effects with.
    #[must_use]
    pub const fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Appends effects behind everything already queued.
    pub fn extend(&mut self, events: &[Event]) {
        self.queue.extend(events.iter().cloned());
    }

    /// Advances playback by `dt`, moving every finished effect into `out` in order.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<Event>) {
        self.elapsed = self.elapsed.saturating_add(dt);

        while let Some(head) = self.queue.front() {
            let duration = self.pacing.duration_of(head);
            if self.elapsed < duration {
                return;
            }
            self.elapsed -= duration;
            if let Some(event) = self.queue.pop_front() {
                out.push(event);
            }
        }

        // Leftover time must not fast-forward effects queued later.
        self.elapsed = Duration::ZERO;
    }

    /// Effect at the head of the queue and its progress.
    #[must_use]
    pub fn current(&self) -> Option<Playback<'_>> {
        self.queue.front().map(|event| Playback {
            event,
            elapsed: self.elapsed,
            duration: self.pacing.duration_of(event),
        })
    }

    /// Reports whether any queued effect is acted out by `unit`.
    #[must_use]
    pub fn is_busy(&self, unit: UnitId) -> bool {
        self.queue.iter().any(|event| event.actor() == Some(unit))
    }

    /// Reports whether every queued effect finished playing.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of effects still queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Time left until every queued effect has played.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.queue
            .iter()
            .map(|event| self.pacing.duration_of(event))
            .sum::<Duration>()
            .saturating_sub(self.elapsed)
    }
}

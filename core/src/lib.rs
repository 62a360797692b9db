#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired actions, the world validates and
//! executes them via its `apply` entry point, and then broadcasts [`Event`]
//! values describing the effects that were decided. Presentation layers replay
//! those effects; they never re-interpret them. Rejected commands surface as
//! [`CommandError`] values and leave the world untouched.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Skirmish.";

/// Attack range assigned to melee units unless configured otherwise.
pub const DEFAULT_MELEE_RANGE: u32 = 1;

/// One of the two opposing factions on the battlefield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Side that opens every match and ends its turns explicitly.
    Attacker,
    /// Side driven by the opponent policy whose turns end automatically.
    Defender,
}

impl Side {
    /// Returns the side opposing `self`.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }
}

/// Combat archetype that determines a unit's role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    /// Close-quarters fighter that strikes adjacent cells.
    Melee,
    /// Fighter that strikes from a distance.
    Ranged,
    /// Caster and the only archetype allowed to heal allies.
    Healer,
}

impl Archetype {
    /// Reports whether units of this archetype may issue heal commands.
    #[must_use]
    pub const fn can_heal(self) -> bool {
        matches!(self, Self::Healer)
    }

    /// Stock stats used when a deployment does not specify its own.
    #[must_use]
    pub const fn default_stats(self) -> UnitStats {
        match self {
            Self::Melee => UnitStats {
                max_hp: 20,
                attack_power: 8,
                heal_power: None,
                movement: 3,
                attack_range: DEFAULT_MELEE_RANGE,
            },
            Self::Ranged => UnitStats {
                max_hp: 14,
                attack_power: 6,
                heal_power: None,
                movement: 3,
                attack_range: 3,
            },
            Self::Healer => UnitStats {
                max_hp: 12,
                attack_power: 3,
                heal_power: Some(6),
                movement: 3,
                attack_range: 2,
            },
        }
    }
}

/// Numeric attributes describing a unit's combat capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitStats {
    /// Hit points the unit starts with and can be healed back up to.
    pub max_hp: u32,
    /// Upper bound of the uniform damage roll.
    pub attack_power: u32,
    /// Upper bound of the uniform heal roll; falls back to `attack_power`.
    #[serde(default)]
    pub heal_power: Option<u32>,
    /// Number of orthogonal steps the unit may take per round.
    pub movement: u32,
    /// Maximum Manhattan distance at which the unit may attack or heal.
    pub attack_range: u32,
}

impl UnitStats {
    /// Heal roll bound, defaulting to the attack power.
    #[must_use]
    pub fn effective_heal_power(&self) -> u32 {
        self.heal_power.unwrap_or(self.attack_power)
    }
}

/// Placement of a single unit when a match is set up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Side the unit fights for.
    pub side: Side,
    /// Role assigned to the unit.
    pub archetype: Archetype,
    /// Cell the unit starts on.
    pub cell: CellCoord,
    /// Combat attributes of the unit.
    pub stats: UnitStats,
}

impl Deployment {
    /// Deploys a unit of the given archetype using its stock stats.
    #[must_use]
    pub const fn stock(side: Side, archetype: Archetype, cell: CellCoord) -> Self {
        Self {
            side,
            archetype,
            cell,
            stats: archetype.default_stats(),
        }
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Moves a unit to a destination inside its reachable set.
    Move {
        /// Unit attempting to move.
        unit: UnitId,
        /// Cell the unit should end on.
        destination: CellCoord,
    },
    /// Strikes an opposing unit within range.
    Attack {
        /// Unit delivering the strike.
        attacker: UnitId,
        /// Unit receiving the strike.
        target: UnitId,
    },
    /// Restores hit points to an allied unit within range.
    Heal {
        /// Healer casting the heal.
        healer: UnitId,
        /// Ally receiving the heal.
        target: UnitId,
    },
    /// Ends a unit's action without striking.
    Hold {
        /// Unit giving up the rest of its action.
        unit: UnitId,
    },
    /// Hands control to the opposing side once the round is complete.
    EndTurn {
        /// Side requesting to end its turn.
        side: Side,
    },
    /// Advances the world clock that drives death teardown.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Effects broadcast by the world after a command was accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Indicates that the world clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// A unit took one orthogonal step.
    UnitStepped {
        /// Unit that moved.
        unit: UnitId,
        /// Cell occupied before the step.
        from: CellCoord,
        /// Cell occupied after the step.
        to: CellCoord,
    },
    /// A unit struck another unit.
    UnitAttacked {
        /// Unit delivering the strike.
        attacker: UnitId,
        /// Unit receiving the strike.
        target: UnitId,
        /// Direction the attacker faces while striking.
        facing: Heading,
        /// Damage dealt, or a miss.
        strike: Strike,
    },
    /// A healer restored hit points to an ally.
    UnitHealed {
        /// Unit casting the heal.
        healer: UnitId,
        /// Unit receiving the heal.
        target: UnitId,
        /// Hit points actually restored after clamping.
        amount: u32,
    },
    /// A unit ended its action without striking.
    UnitHeld {
        /// Unit that held.
        unit: UnitId,
    },
    /// A unit was reduced to zero hit points and began its teardown.
    UnitDied {
        /// Unit that died.
        unit: UnitId,
        /// Unit that delivered the killing blow.
        killer: UnitId,
        /// Direction the body is knocked back in.
        knockback: Heading,
    },
    /// A dead unit finished its teardown and left the registry.
    UnitRemoved {
        /// Unit that was removed.
        unit: UnitId,
    },
    /// Control passed to a side.
    TurnStarted {
        /// Side that became active.
        side: Side,
        /// Round counter after the flip.
        round: u32,
    },
    /// The match reached a terminal state.
    MatchEnded {
        /// Final result of the match.
        outcome: MatchOutcome,
    },
}

impl Event {
    /// Unit acting in the effect, if any.
    #[must_use]
    pub const fn actor(&self) -> Option<UnitId> {
        match self {
            Self::UnitStepped { unit, .. }
            | Self::UnitHeld { unit }
            | Self::UnitDied { unit, .. }
            | Self::UnitRemoved { unit } => Some(*unit),
            Self::UnitAttacked { attacker, .. } => Some(*attacker),
            Self::UnitHealed { healer, .. } => Some(*healer),
            Self::TimeAdvanced { .. } | Self::TurnStarted { .. } | Self::MatchEnded { .. } => {
                None
            }
        }
    }
}

/// Terminal result of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// The named side has no living units left.
    Defeated(Side),
}

impl MatchOutcome {
    /// Side that won the match.
    #[must_use]
    pub const fn winner(self) -> Side {
        match self {
            Self::Defeated(side) => side.opponent(),
        }
    }
}

/// Reasons the world may reject a command. Rejections never mutate state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum CommandError {
    /// The destination is out of bounds, unreachable, or the unit already moved.
    #[error("destination is not reachable this action")]
    IllegalMove,
    /// The target lies beyond the actor's range.
    #[error("target is out of range")]
    OutOfRange,
    /// The target is on the wrong side, is the actor itself, or is not alive.
    #[error("target is not valid for this action")]
    InvalidTarget,
    /// The actor already acted this round.
    #[error("unit already used its action this round")]
    ActionAlreadyUsed,
    /// The command was issued for a side that is not active.
    #[error("it is not this side's turn")]
    WrongTurn,
    /// No unit with the identifier exists in the registry.
    #[error("unknown unit {0:?}")]
    UnknownUnit(UnitId),
    /// The actor is dying and may no longer act.
    #[error("unit {0:?} is incapacitated")]
    Incapacitated(UnitId),
    /// The actor's archetype cannot heal.
    #[error("only healers may heal")]
    NotAHealer,
    /// The side still has living units that have not acted.
    #[error("every living unit must act before the turn ends")]
    RoundIncomplete,
    /// The match already ended.
    #[error("the match is over")]
    MatchOver,
}

/// Damage outcome of a single strike.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strike {
    /// The damage roll came up zero.
    Miss,
    /// The strike dealt damage.
    Hit {
        /// Hit points removed from the target, before clamping at zero.
        damage: u32,
    },
}

impl Strike {
    /// Classifies a damage roll, treating zero as a miss.
    #[must_use]
    pub const fn from_damage(damage: u32) -> Self {
        if damage == 0 {
            Self::Miss
        } else {
            Self::Hit { damage }
        }
    }

    /// Damage carried by the strike, zero for a miss.
    #[must_use]
    pub const fn damage(self) -> u32 {
        match self {
            Self::Miss => 0,
            Self::Hit { damage } => damage,
        }
    }
}

/// Direction from one cell toward another, stored as the raw cell delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Heading {
    dx: i32,
    dy: i32,
}

impl Heading {
    /// Heading pointing from `from` toward `to`.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Self {
        Self {
            dx: signed_delta(from.column(), to.column()),
            dy: signed_delta(from.row(), to.row()),
        }
    }

    /// Column delta.
    #[must_use]
    pub const fn dx(&self) -> i32 {
        self.dx
    }

    /// Row delta.
    #[must_use]
    pub const fn dy(&self) -> i32 {
        self.dy
    }

    /// Normalised direction vector; zero when both cells coincide.
    #[must_use]
    pub fn unit_vector(&self) -> (f32, f32) {
        let x = self.dx as f32;
        let y = self.dy as f32;
        let length = x.hypot(y);
        if length == 0.0 {
            (0.0, 0.0)
        } else {
            (x / length, y / length)
        }
    }
}

fn signed_delta(from: u32, to: u32) -> i32 {
    let magnitude = i32::try_from(from.abs_diff(to)).unwrap_or(i32::MAX);
    if to >= from {
        magnitude
    } else {
        -magnitude
    }
}

/// Unique identifier assigned to a unit. Identifiers follow registry order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }
}

/// Dimensions of the battlefield measured in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridBounds {
    columns: u32,
    rows: u32,
}

impl GridBounds {
    /// Creates bounds spanning `columns` by `rows` cells.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// In-bounds orthogonal neighbours in the fixed order `+x, -x, +y, -y`.
    pub fn neighbors(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> {
        let candidates = [
            cell.column()
                .checked_add(1)
                .map(|column| CellCoord::new(column, cell.row())),
            cell.column()
                .checked_sub(1)
                .map(|column| CellCoord::new(column, cell.row())),
            cell.row()
                .checked_add(1)
                .map(|row| CellCoord::new(cell.column(), row)),
            cell.row()
                .checked_sub(1)
                .map(|row| CellCoord::new(cell.column(), row)),
        ];
        let bounds = *self;
        candidates
            .into_iter()
            .flatten()
            .filter(move |candidate| bounds.contains(*candidate))
    }
}

/// Immutable representation of a single unit's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitSnapshot {
    /// Unique identifier assigned to the unit.
    pub id: UnitId,
    /// Side the unit fights for.
    pub side: Side,
    /// Role of the unit.
    pub archetype: Archetype,
    /// Grid cell currently occupied by the unit.
    pub cell: CellCoord,
    /// Remaining hit points.
    pub hp: u32,
    /// Combat attributes of the unit.
    pub stats: UnitStats,
    /// Indicates whether the unit used its action this round.
    pub has_acted: bool,
    /// Indicates whether the unit already moved this round.
    pub has_moved: bool,
    /// Indicates whether the unit may still chain one attack or heal onto its move.
    pub follow_up_open: bool,
    /// Indicates whether the unit is in its death teardown.
    pub dying: bool,
}

impl UnitSnapshot {
    /// Reports whether the unit still has hit points.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.dying && self.hp > 0
    }

    /// Reports whether the unit may still be commanded this round.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.is_alive() && !self.has_acted
    }

    /// Reports whether the unit may still attack or heal this round.
    #[must_use]
    pub const fn can_engage(&self) -> bool {
        self.is_alive() && (!self.has_acted || self.follow_up_open)
    }

    /// Reports whether `other` lies within this unit's attack range.
    #[must_use]
    pub fn in_range_of(&self, other: &UnitSnapshot) -> bool {
        self.cell.manhattan_distance(other.cell) <= self.stats.attack_range
    }
}

/// Read-only snapshot describing all units in registry order.
#[derive(Clone, Debug, Default)]
pub struct UnitView {
    snapshots: Vec<UnitSnapshot>,
}

impl UnitView {
    /// Creates a new unit view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<UnitSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured unit snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots.iter()
    }

    /// Living units fighting for `side`, in registry order.
    pub fn living(&self, side: Side) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots
            .iter()
            .filter(move |snapshot| snapshot.side == side && snapshot.is_alive())
    }

    /// Looks up the snapshot captured for `id`.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&UnitSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Cells held by living units.
    pub fn occupied_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.is_alive())
            .map(|snapshot| snapshot.cell)
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<UnitSnapshot> {
        self.snapshots
    }
}

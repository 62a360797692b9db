//! TOML scenario files describing a battlefield and its roster.

use std::{fs, path::Path, time::Duration};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use skirmish_core::{Archetype, CellCoord, Deployment, GridBounds, Side, UnitStats};
use skirmish_world::{Config, DEFAULT_TEARDOWN};

/// Battlefield and roster as written in a scenario file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScenarioFile {
    /// Number of grid columns.
    pub(crate) columns: u32,
    /// Number of grid rows.
    pub(crate) rows: u32,
    /// Seed for combat rolls; the command line may override it.
    #[serde(default)]
    pub(crate) seed: Option<u64>,
    /// Milliseconds a dead unit lingers before removal.
    #[serde(default)]
    pub(crate) teardown_ms: Option<u64>,
    /// Units in registry order.
    #[serde(default)]
    pub(crate) units: Vec<ScenarioUnit>,
}

/// Single roster entry.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScenarioUnit {
    pub(crate) side: Side,
    pub(crate) archetype: Archetype,
    pub(crate) column: u32,
    pub(crate) row: u32,
    /// Overrides applied on top of the archetype's stock stats.
    #[serde(default)]
    pub(crate) stats: StatOverrides,
}

/// Optional per-unit replacements for stock stats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StatOverrides {
    pub(crate) max_hp: Option<u32>,
    pub(crate) attack_power: Option<u32>,
    pub(crate) heal_power: Option<u32>,
    pub(crate) movement: Option<u32>,
    pub(crate) attack_range: Option<u32>,
}

impl StatOverrides {
    fn apply(self, stock: UnitStats) -> UnitStats {
        UnitStats {
            max_hp: self.max_hp.unwrap_or(stock.max_hp),
            attack_power: self.attack_power.unwrap_or(stock.attack_power),
            heal_power: self.heal_power.or(stock.heal_power),
            movement: self.movement.unwrap_or(stock.movement),
            attack_range: self.attack_range.unwrap_or(stock.attack_range),
        }
    }
}

impl ScenarioFile {
    /// Parses a scenario from TOML text.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(text).context("scenario is not valid TOML")?;
        ensure!(!scenario.units.is_empty(), "scenario deploys no units");
        Ok(scenario)
    }

    /// Reads and parses the scenario stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed to load scenario {}", path.display()))
    }

    /// Converts the file into a world configuration.
    pub(crate) fn into_config(self) -> Config {
        let defaults = Config::default();
        Config {
            bounds: GridBounds::new(self.columns, self.rows),
            seed: self.seed.unwrap_or(defaults.seed),
            teardown: self
                .teardown_ms
                .map_or(DEFAULT_TEARDOWN, Duration::from_millis),
            deployments: self
                .units
                .into_iter()
                .map(|unit| Deployment {
                    side: unit.side,
                    archetype: unit.archetype,
                    cell: CellCoord::new(unit.column, unit.row),
                    stats: unit.stats.apply(unit.archetype.default_stats()),
                })
                .collect(),
        }
    }
}

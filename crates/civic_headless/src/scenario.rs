//! Sandbox scenario loading and configuration.
//!
//! A scenario describes an offline game: the map, the climate curve, the
//! blueprints and upgrades on offer, and the economy constants the sandbox
//! simulation runs on.

use std::path::Path;

use civic_core::snapshot::{Position, ResidenceBlueprint, TerrainGrid, Upgrade, UtilityBlueprint};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// Outdoor temperature curve.
///
/// A sine wave between `min_temp` and `max_temp` with one full cycle every
/// `period` turns, plus uniform noise of `noise` degrees either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Climate {
    /// Coldest point of the cycle.
    pub min_temp: f64,
    /// Warmest point of the cycle.
    pub max_temp: f64,
    /// Turns per cycle.
    pub period: u32,
    /// Cycle offset in turns.
    pub phase: u32,
    /// Maximum random deviation per turn.
    pub noise: f64,
}

impl Default for Climate {
    fn default() -> Self {
        Self {
            min_temp: -12.0,
            max_temp: 18.0,
            period: 350,
            phase: 0,
            noise: 1.0,
        }
    }
}

impl Climate {
    /// Noise-free reading for a turn.
    #[must_use]
    pub fn baseline(&self, turn: u32) -> f64 {
        let mid = (self.min_temp + self.max_temp) / 2.0;
        let amplitude = (self.max_temp - self.min_temp) / 2.0;
        let period = f64::from(self.period.max(1));
        let angle = std::f64::consts::TAU * f64::from(turn + self.phase) / period;
        // Start the year at its warmest.
        mid + amplitude * angle.cos()
    }
}

/// What an upgrade or utility does to a residence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSpec {
    /// Effect tag, as it appears on structures.
    pub name: String,
    /// Reach of a utility effect (Chebyshev distance). Unused for upgrades.
    pub radius: i32,
    /// Multiplier on heat loss.
    pub emissivity_multiplier: f64,
    /// Multiplier on health decay.
    pub decay_multiplier: f64,
    /// Extra income per resident.
    pub building_income_increase: f64,
    /// Extra happiness per resident.
    pub max_happiness_increase: f64,
    /// Energy produced on site, offsetting the bill.
    pub mwh_production: f64,
    /// Extra base energy need.
    pub base_energy_mwh_increase: f64,
    /// Extra CO2 per resident.
    pub co2_per_pop_increase: f64,
}

impl Default for EffectSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            radius: 0,
            emissivity_multiplier: 1.0,
            decay_multiplier: 1.0,
            building_income_increase: 0.0,
            max_happiness_increase: 0.0,
            mwh_production: 0.0,
            base_energy_mwh_increase: 0.0,
            co2_per_pop_increase: 0.0,
        }
    }
}

impl EffectSpec {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// Economy and population constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Economy {
    /// Money at turn zero.
    pub starting_funds: f64,
    /// Price of an energy adjustment.
    pub adjust_cost: f64,
    /// Price per MWh drawn.
    pub cost_per_mwh: f64,
    /// CO2 per MWh drawn.
    pub co2_per_mwh: f64,
    /// CO2 per resident per turn.
    pub co2_per_pop: f64,
    /// People waiting for housing at turn zero.
    pub initial_queue: u32,
    /// Queue growth per turn before utilities.
    pub queue_growth: f64,
    /// Residents a comfortable residence takes in per turn.
    pub move_in_rate: u32,
    /// Indoor temperature below which residents move out.
    pub comfort_min: f64,
    /// Indoor temperature above which residents move out.
    pub comfort_max: f64,
    /// Extra decay per degree outside the comfort band.
    pub discomfort_decay: f64,
    /// Indoor temperature of a fresh foundation.
    pub initial_indoor: f64,
}

impl Default for Economy {
    fn default() -> Self {
        Self {
            starting_funds: 25_000.0,
            adjust_cost: 150.0,
            cost_per_mwh: 15.0,
            co2_per_mwh: 0.1,
            co2_per_pop: 0.03,
            initial_queue: 20,
            queue_growth: 0.25,
            move_in_rate: 1,
            comfort_min: 16.0,
            comfort_max: 26.0,
            discomfort_decay: 0.05,
            initial_indoor: 18.0,
        }
    }
}

/// A complete sandbox scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name, reported as the map name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Map dimensions (width, height) in cells.
    pub map_size: (u32, u32),
    /// Cells that cannot be built on.
    pub blocked: Vec<(i32, i32)>,
    /// Turn limit.
    pub max_turns: u32,
    /// Outdoor temperature curve.
    pub climate: Climate,
    /// Economy constants.
    pub economy: Economy,
    /// Residence blueprints.
    pub residences: Vec<ResidenceBlueprint>,
    /// Utility blueprints.
    pub utilities: Vec<UtilityBlueprint>,
    /// Purchasable upgrades.
    pub upgrades: Vec<Upgrade>,
    /// Effects referenced by upgrades and utilities.
    pub effects: Vec<EffectSpec>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::riverside()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Terrain for this scenario.
    #[must_use]
    pub fn terrain(&self) -> TerrainGrid {
        let (width, height) = self.map_size;
        let mut grid = TerrainGrid::open(width as usize, height as usize);
        for &(x, y) in &self.blocked {
            grid.block(Position::new(x, y));
        }
        grid
    }

    /// Effect by tag.
    #[must_use]
    pub fn effect(&self, name: &str) -> Option<&EffectSpec> {
        self.effects.iter().find(|e| e.name == name)
    }

    /// The built-in scenario: a 16x16 town split by a river, a cold year
    /// and the usual blueprint catalogue.
    #[must_use]
    pub fn riverside() -> Self {
        // River running down column 7 with a ford at rows 4 and 11.
        let blocked = (0..16).filter(|y| *y != 4 && *y != 11).map(|y| (7, y)).collect();

        Self {
            name: "riverside".to_string(),
            description: "A cold river town with four residence types".to_string(),
            map_size: (16, 16),
            blocked,
            max_turns: 700,
            climate: Climate::default(),
            economy: Economy::default(),
            residences: vec![
                residence("Cabin", 4_000.0, 1.8, 20, 0, 8, 0.45, 950.0),
                residence("Apartments", 9_500.0, 4.5, 10, 0, 30, 0.32, 2_400.0),
                residence("ModernApartments", 15_000.0, 5.5, 8, 150, 40, 0.18, 3_100.0),
                residence("HighRise", 28_000.0, 9.0, 5, 300, 80, 0.22, 5_000.0),
            ],
            utilities: vec![
                utility("Park", 3_300.0, 0.0, 25, 0, "Park", 0.3),
                utility("Mall", 16_000.0, 4.0, 10, 100, "Mall", 0.6),
                utility("WindTurbine", 8_000.0, 0.0, 15, 50, "WindTurbine", 0.0),
            ],
            upgrades: vec![
                upgrade("Caretaker", 3_500.0),
                upgrade("SolarPanel", 6_800.0),
                upgrade("Insulation", 7_200.0),
                upgrade("Playground", 5_200.0),
                upgrade("Charger", 3_400.0),
            ],
            effects: vec![
                EffectSpec {
                    decay_multiplier: 0.5,
                    ..EffectSpec::named("Caretaker")
                },
                EffectSpec {
                    mwh_production: 1.5,
                    ..EffectSpec::named("SolarPanel")
                },
                EffectSpec {
                    emissivity_multiplier: 0.6,
                    ..EffectSpec::named("Insulation")
                },
                EffectSpec {
                    max_happiness_increase: 0.15,
                    ..EffectSpec::named("Playground")
                },
                EffectSpec {
                    building_income_increase: 2.0,
                    co2_per_pop_increase: 0.01,
                    ..EffectSpec::named("Charger")
                },
                EffectSpec {
                    radius: 3,
                    max_happiness_increase: 0.2,
                    ..EffectSpec::named("Park")
                },
                EffectSpec {
                    radius: 4,
                    building_income_increase: 3.0,
                    max_happiness_increase: 0.1,
                    ..EffectSpec::named("Mall")
                },
                EffectSpec {
                    radius: 2,
                    mwh_production: 3.0,
                    ..EffectSpec::named("WindTurbine")
                },
            ],
        }
    }
}

fn residence(
    name: &str,
    cost: f64,
    base_energy_need: f64,
    build_speed: u32,
    release_tick: u32,
    max_pop: u32,
    emissivity: f64,
    maintenance_cost: f64,
) -> ResidenceBlueprint {
    ResidenceBlueprint {
        name: name.to_string(),
        cost,
        co2_cost: cost / 20.0,
        base_energy_need,
        build_speed,
        release_tick,
        max_pop,
        income_per_pop: 14.0,
        emissivity,
        maintenance_cost,
        decay_rate: 0.12,
        max_happiness: 0.5,
    }
}

fn utility(
    name: &str,
    cost: f64,
    base_energy_need: f64,
    build_speed: u32,
    release_tick: u32,
    effect: &str,
    queue_increase: f64,
) -> UtilityBlueprint {
    UtilityBlueprint {
        name: name.to_string(),
        cost,
        co2_cost: cost / 25.0,
        base_energy_need,
        build_speed,
        release_tick,
        effects: vec![effect.to_string()],
        queue_increase,
    }
}

fn upgrade(name: &str, cost: f64) -> Upgrade {
    Upgrade {
        name: name.to_string(),
        effect: name.to_string(),
        cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert_eq!(scenario.name, "riverside");
        let grid = scenario.terrain();
        assert_eq!(grid.width(), 16);
        assert!(!grid.is_buildable(Position::new(7, 0)));
        assert!(grid.is_buildable(Position::new(7, 4)));
        for upgrade in &scenario.upgrades {
            assert!(scenario.effect(&upgrade.effect).is_some(), "{}", upgrade.name);
        }
        for utility in &scenario.utilities {
            for effect in &utility.effects {
                assert!(scenario.effect(effect).is_some(), "{effect}");
            }
        }
    }

    #[test]
    fn test_climate_cycle() {
        let climate = Climate {
            noise: 0.0,
            ..Climate::default()
        };
        assert!((climate.baseline(0) - climate.max_temp).abs() < 1e-9);
        assert!((climate.baseline(climate.period / 2) - climate.min_temp).abs() < 1e-9);
    }

    #[test]
    fn test_parse_partial_scenario() {
        let ron = r#"(
            name: "tiny",
            map_size: (3, 2),
            blocked: [(1, 1)],
            max_turns: 50,
            climate: (min_temp: 0.0, max_temp: 10.0),
        )"#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.max_turns, 50);
        assert_eq!(scenario.climate.period, 350);
        assert!(!scenario.terrain().is_buildable(Position::new(1, 1)));
        // Catalogue falls back to the built-in one.
        assert!(!scenario.residences.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Scenario::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }
}

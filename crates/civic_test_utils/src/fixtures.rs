//! Test fixtures and helpers.
//!
//! Blueprint presets loosely follow the host's stock buildings so numbers in
//! tests read naturally.

use civic_core::snapshot::{
    Position, ResidenceBlueprint, ResidenceState, Snapshot, Structure, StructureKind, TerrainGrid,
    Upgrade, UtilityBlueprint, BUILD_COMPLETE,
};

/// Small, cheap residence.
#[must_use]
pub fn cabin() -> ResidenceBlueprint {
    ResidenceBlueprint {
        name: "Cabin".into(),
        cost: 4000.0,
        co2_cost: 200.0,
        base_energy_need: 1.8,
        build_speed: 20,
        release_tick: 0,
        max_pop: 8,
        income_per_pop: 14.0,
        emissivity: 0.45,
        maintenance_cost: 950.0,
        decay_rate: 0.07,
        max_happiness: 0.5,
    }
}

/// Large residence.
#[must_use]
pub fn apartments() -> ResidenceBlueprint {
    ResidenceBlueprint {
        name: "Apartments".into(),
        cost: 8200.0,
        co2_cost: 400.0,
        base_energy_need: 5.4,
        build_speed: 10,
        release_tick: 0,
        max_pop: 50,
        income_per_pop: 6.0,
        emissivity: 0.29,
        maintenance_cost: 2100.0,
        decay_rate: 0.1,
        max_happiness: 0.3,
    }
}

/// Utility preset.
#[must_use]
pub fn park() -> UtilityBlueprint {
    UtilityBlueprint {
        name: "Park".into(),
        cost: 3300.0,
        co2_cost: 100.0,
        base_energy_need: 0.0,
        build_speed: 25,
        release_tick: 0,
        effects: vec!["Park".into()],
        queue_increase: 0.0,
    }
}

/// Utility preset.
#[must_use]
pub fn mall() -> UtilityBlueprint {
    UtilityBlueprint {
        name: "Mall".into(),
        cost: 16_000.0,
        co2_cost: 800.0,
        base_energy_need: 6.0,
        build_speed: 8,
        release_tick: 0,
        effects: vec!["Mall.1".into(), "Mall.2".into()],
        queue_increase: 0.3,
    }
}

/// The stock upgrades.
#[must_use]
pub fn upgrades() -> Vec<Upgrade> {
    [
        ("Insulation", 7200.0),
        ("Playground", 5200.0),
        ("Charger", 3400.0),
        ("SolarPanel", 6800.0),
    ]
    .into_iter()
    .map(|(name, cost)| Upgrade {
        name: name.into(),
        effect: name.into(),
        cost,
    })
    .collect()
}

/// A residence of the given blueprint, at 21 degrees with base energy.
#[must_use]
pub fn residence(blueprint: &ResidenceBlueprint, position: Position, progress: u32, pop: u32) -> Structure {
    Structure {
        name: blueprint.name.clone(),
        position,
        build_progress: progress,
        health: 100.0,
        effective_energy_in: blueprint.base_energy_need,
        effects: Vec::new(),
        kind: StructureKind::Residence(ResidenceState {
            current_pop: pop,
            temperature: 21.0,
            requested_energy_in: blueprint.base_energy_need,
            happiness_per_tick_per_pop: 0.0,
        }),
    }
}

/// Fluent builder for [`Snapshot`]s.
///
/// Starts from an open 10x10 map, turn 0 of 700, funds 20 000, 10 degrees
/// outdoors, and the preset blueprints and upgrades.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    /// Builder with the default scene.
    #[must_use]
    pub fn new() -> Self {
        let mut snapshot = Snapshot {
            game_id: "test-game".into(),
            map_name: "training1".into(),
            max_turns: 700,
            funds: 20_000.0,
            current_temp: 10.0,
            map: TerrainGrid::open(10, 10),
            residence_blueprints: vec![cabin(), apartments()],
            utility_blueprints: vec![park(), mall()],
            upgrades: upgrades(),
            ..Default::default()
        };
        snapshot.temperature_history.insert(0, 10.0);
        Self { snapshot }
    }

    /// Empty builder: no blueprints, no upgrades, 1x1 map.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            snapshot: Snapshot {
                map: TerrainGrid::open(1, 1),
                max_turns: 700,
                ..Default::default()
            },
        }
    }

    /// Current turn.
    #[must_use]
    pub fn turn(mut self, turn: u32) -> Self {
        self.snapshot.turn = turn;
        self
    }

    /// Turn limit.
    #[must_use]
    pub fn max_turns(mut self, max_turns: u32) -> Self {
        self.snapshot.max_turns = max_turns;
        self
    }

    /// Available money.
    #[must_use]
    pub fn funds(mut self, funds: f64) -> Self {
        self.snapshot.funds = funds;
        self
    }

    /// Replace the terrain.
    #[must_use]
    pub fn map(mut self, map: TerrainGrid) -> Self {
        self.snapshot.map = map;
        self
    }

    /// Open map of the given size.
    #[must_use]
    pub fn open_map(self, width: usize, height: usize) -> Self {
        self.map(TerrainGrid::open(width, height))
    }

    /// Outdoor readings, oldest first, ending at the current turn.
    ///
    /// The last reading becomes the current temperature.
    #[must_use]
    pub fn outdoor_history(mut self, readings: &[f64]) -> Self {
        self.snapshot.temperature_history.clear();
        let len = u32::try_from(readings.len()).unwrap_or(u32::MAX);
        let first = self.snapshot.turn.saturating_sub(len.saturating_sub(1));
        for (turn, reading) in (first..).zip(readings) {
            self.snapshot.temperature_history.insert(turn, *reading);
        }
        if let Some(last) = readings.last() {
            self.snapshot.current_temp = *last;
        }
        self
    }

    /// Replace the residence blueprints.
    #[must_use]
    pub fn residence_blueprints(mut self, blueprints: Vec<ResidenceBlueprint>) -> Self {
        self.snapshot.residence_blueprints = blueprints;
        self
    }

    /// Replace the utility blueprints.
    #[must_use]
    pub fn utility_blueprints(mut self, blueprints: Vec<UtilityBlueprint>) -> Self {
        self.snapshot.utility_blueprints = blueprints;
        self
    }

    /// Replace the upgrades.
    #[must_use]
    pub fn upgrades(mut self, upgrades: Vec<Upgrade>) -> Self {
        self.snapshot.upgrades = upgrades;
        self
    }

    /// Add any structure.
    #[must_use]
    pub fn structure(mut self, structure: Structure) -> Self {
        self.snapshot.structures.push(structure);
        self
    }

    /// Add a completed cabin.
    #[must_use]
    pub fn cabin(self, x: i32, y: i32, pop: u32) -> Self {
        self.structure(residence(&cabin(), Position::new(x, y), BUILD_COMPLETE, pop))
    }

    /// Add a cabin under construction.
    #[must_use]
    pub fn cabin_foundation(self, x: i32, y: i32, progress: u32) -> Self {
        self.structure(residence(&cabin(), Position::new(x, y), progress, 0))
    }

    /// Change the most recently added structure.
    #[must_use]
    pub fn with_last(mut self, edit: impl FnOnce(&mut Structure)) -> Self {
        if let Some(last) = self.snapshot.structures.last_mut() {
            edit(last);
        }
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}

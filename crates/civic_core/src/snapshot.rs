//! The per-turn view of the game world.
//!
//! A [`Snapshot`] is produced fresh by the gateway every turn and is read-only
//! to the engine. Blueprints and built structures live inside it and die with it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gateway::Action;

/// Build progress value at which a structure counts as complete.
pub const BUILD_COMPLETE: u32 = 100;

/// Integer grid coordinate. Used as an opaque key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Column index (first map index).
    pub x: i32,
    /// Row index (second map index).
    pub y: i32,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The eight surrounding cells, row by row. May include off-map cells.
    pub fn neighbors(self) -> impl Iterator<Item = Position> {
        (-1..=1).flat_map(move |dy| {
            (-1..=1)
                .filter(move |&dx| !(dx == 0 && dy == 0))
                .map(move |dx| Position::new(self.x + dx, self.y + dy))
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Classification of a single map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    /// A structure may be placed here.
    Buildable,
    /// Water, rock, road; nothing can be placed.
    Blocked,
}

impl Terrain {
    /// Decode the host's integer map code. Zero is buildable.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            Terrain::Buildable
        } else {
            Terrain::Blocked
        }
    }
}

/// 2D terrain map indexed as `cells[x][y]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    cells: Vec<Vec<Terrain>>,
}

impl TerrainGrid {
    /// A fully buildable `width` x `height` grid.
    #[must_use]
    pub fn open(width: usize, height: usize) -> Self {
        Self {
            cells: vec![vec![Terrain::Buildable; height]; width],
        }
    }

    /// Build from the host's integer codes (`codes[x][y]`).
    #[must_use]
    pub fn from_codes(codes: &[Vec<i32>]) -> Self {
        Self {
            cells: codes
                .iter()
                .map(|column| column.iter().copied().map(Terrain::from_code).collect())
                .collect(),
        }
    }

    /// Mark a cell as blocked. Off-map positions are ignored.
    pub fn block(&mut self, position: Position) {
        if let Some(cell) = self.cell_mut(position) {
            *cell = Terrain::Blocked;
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// Number of rows in the tallest column.
    #[must_use]
    pub fn height(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Terrain at a position, `None` when off the map.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<Terrain> {
        let x = usize::try_from(position.x).ok()?;
        let y = usize::try_from(position.y).ok()?;
        self.cells.get(x)?.get(y).copied()
    }

    fn cell_mut(&mut self, position: Position) -> Option<&mut Terrain> {
        let x = usize::try_from(position.x).ok()?;
        let y = usize::try_from(position.y).ok()?;
        self.cells.get_mut(x)?.get_mut(y)
    }

    /// Whether the terrain itself allows building (ignores structures).
    #[must_use]
    pub fn is_buildable(&self, position: Position) -> bool {
        self.get(position) == Some(Terrain::Buildable)
    }

    /// Every on-map position, column-major.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.iter().enumerate().flat_map(|(x, column)| {
            (0..column.len()).map(move |y| Position::new(x as i32, y as i32))
        })
    }

    /// Encode back into host integer codes (buildable = 0, blocked = 1).
    #[must_use]
    pub fn to_codes(&self) -> Vec<Vec<i32>> {
        self.cells
            .iter()
            .map(|column| {
                column
                    .iter()
                    .map(|t| match t {
                        Terrain::Buildable => 0,
                        Terrain::Blocked => 1,
                    })
                    .collect()
            })
            .collect()
    }
}

/// Template for a house-type building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidenceBlueprint {
    /// Unique building type name.
    pub name: String,
    /// Price to start construction.
    pub cost: f64,
    /// CO2 emitted by construction.
    pub co2_cost: f64,
    /// Energy (MWh) needed to hold temperature with no loss.
    pub base_energy_need: f64,
    /// Progress gained per continue-build action.
    pub build_speed: u32,
    /// Turn at which the blueprint unlocks.
    pub release_tick: u32,
    /// Maximum residents.
    pub max_pop: u32,
    /// Income per resident per turn.
    pub income_per_pop: f64,
    /// Fraction of the indoor/outdoor difference lost per turn.
    pub emissivity: f64,
    /// Price of one maintenance action.
    pub maintenance_cost: f64,
    /// Health lost per turn.
    pub decay_rate: f64,
    /// Happiness ceiling per resident.
    pub max_happiness: f64,
}

/// Template for a shared-service building (park, mall, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityBlueprint {
    /// Unique building type name.
    pub name: String,
    /// Price to start construction.
    pub cost: f64,
    /// CO2 emitted by construction.
    pub co2_cost: f64,
    /// Energy (MWh) the building draws.
    pub base_energy_need: f64,
    /// Progress gained per continue-build action.
    pub build_speed: u32,
    /// Turn at which the blueprint unlocks.
    pub release_tick: u32,
    /// Effect tags applied to nearby residences.
    pub effects: Vec<String>,
    /// Growth of the housing queue per turn.
    pub queue_increase: f64,
}

/// A purchasable upgrade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upgrade {
    /// Upgrade name, as sent to the host.
    pub name: String,
    /// Effect tag the upgrade applies to a building.
    pub effect: String,
    /// Purchase price.
    pub cost: f64,
}

/// Per-residence dynamic state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidenceState {
    /// Current residents.
    pub current_pop: u32,
    /// Current indoor temperature.
    pub temperature: f64,
    /// Energy the owner has asked for.
    pub requested_energy_in: f64,
    /// Last reported happiness rate.
    pub happiness_per_tick_per_pop: f64,
}

/// What kind of building a structure is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StructureKind {
    /// A residence with occupants and an indoor climate.
    Residence(ResidenceState),
    /// A utility building.
    Utility,
}

/// A building placed on the map, complete or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    /// Blueprint name.
    pub name: String,
    /// Grid cell.
    pub position: Position,
    /// Construction progress, 0..=100.
    pub build_progress: u32,
    /// Health, 0..=100.
    pub health: f64,
    /// Energy actually delivered this turn.
    pub effective_energy_in: f64,
    /// Applied upgrade / utility effect tags.
    pub effects: Vec<String>,
    /// Residence or utility data.
    pub kind: StructureKind,
}

impl Structure {
    /// Construction finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.build_progress >= BUILD_COMPLETE
    }

    /// Residence state, when this is a residence.
    #[must_use]
    pub fn residence(&self) -> Option<&ResidenceState> {
        match &self.kind {
            StructureKind::Residence(state) => Some(state),
            StructureKind::Utility => None,
        }
    }

    /// Whether an effect tag is already applied.
    #[must_use]
    pub fn has_effect(&self, effect: &str) -> bool {
        self.effects.iter().any(|e| e == effect)
    }
}

/// One issued action, as remembered in the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Turn on which the action was issued.
    pub turn: u32,
    /// The action itself.
    pub action: Action,
}

/// Current residents versus capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PopulationSummary {
    /// Residents in completed residences.
    pub current: u32,
    /// Capacity of completed residences.
    pub capacity: u32,
    /// Capacity still under construction.
    pub pending_capacity: u32,
}

impl PopulationSummary {
    /// Occupancy ratio; zero when there is no capacity.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            f64::from(self.current) / f64::from(self.capacity)
        }
    }
}

/// Authoritative, read-only view of the game for the current turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Host session identifier.
    pub game_id: String,
    /// Map name.
    pub map_name: String,
    /// Current turn index.
    pub turn: u32,
    /// Turn limit; the session ends when `turn >= max_turns`.
    pub max_turns: u32,
    /// Available money.
    pub funds: f64,
    /// Outdoor temperature this turn.
    pub current_temp: f64,
    /// Outdoor temperature by turn, including the current one.
    pub temperature_history: BTreeMap<u32, f64>,
    /// Terrain.
    pub map: TerrainGrid,
    /// Built structures, residences and utilities alike.
    pub structures: Vec<Structure>,
    /// Residence blueprints available on this map.
    pub residence_blueprints: Vec<ResidenceBlueprint>,
    /// Utility blueprints available on this map.
    pub utility_blueprints: Vec<UtilityBlueprint>,
    /// Upgrades available on this map.
    pub upgrades: Vec<Upgrade>,
    /// People waiting for housing.
    pub housing_queue: u32,
    /// CO2 released so far.
    pub total_co2: f64,
    /// Happiness generated so far.
    pub total_happiness: f64,
    /// Informational strings for the last turn.
    pub messages: Vec<String>,
    /// Error strings for the last turn.
    pub errors: Vec<String>,
    /// Actions issued this session.
    pub action_log: Vec<ActionRecord>,
}

impl Snapshot {
    /// The turn counter has reached the limit.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.turn >= self.max_turns
    }

    /// Whether paying `cost` keeps funds non-negative.
    #[must_use]
    pub fn can_afford(&self, cost: f64) -> bool {
        cost <= self.funds
    }

    /// Residence blueprint by name.
    #[must_use]
    pub fn residence_blueprint(&self, name: &str) -> Option<&ResidenceBlueprint> {
        self.residence_blueprints.iter().find(|b| b.name == name)
    }

    /// Utility blueprint by name.
    #[must_use]
    pub fn utility_blueprint(&self, name: &str) -> Option<&UtilityBlueprint> {
        self.utility_blueprints.iter().find(|b| b.name == name)
    }

    /// Costs of every blueprint, residences first.
    pub fn blueprint_costs(&self) -> impl Iterator<Item = f64> + '_ {
        self.residence_blueprints
            .iter()
            .map(|b| b.cost)
            .chain(self.utility_blueprints.iter().map(|b| b.cost))
    }

    /// Structure at a position.
    #[must_use]
    pub fn structure_at(&self, position: Position) -> Option<&Structure> {
        self.structures.iter().find(|s| s.position == position)
    }

    /// Whether any structure occupies the cell.
    #[must_use]
    pub fn is_occupied(&self, position: Position) -> bool {
        self.structure_at(position).is_some()
    }

    /// Buildable terrain, on the map, with no structure on it.
    #[must_use]
    pub fn is_buildable(&self, position: Position) -> bool {
        self.map.is_buildable(position) && !self.is_occupied(position)
    }

    /// Structures whose construction is finished.
    pub fn completed(&self) -> impl Iterator<Item = &Structure> {
        self.structures.iter().filter(|s| s.is_complete())
    }

    /// Structures still being built.
    pub fn under_construction(&self) -> impl Iterator<Item = &Structure> {
        self.structures.iter().filter(|s| !s.is_complete())
    }

    /// Residences (complete or not) paired with their state.
    pub fn residences(&self) -> impl Iterator<Item = (&Structure, &ResidenceState)> {
        self.structures
            .iter()
            .filter_map(|s| s.residence().map(|r| (s, r)))
    }

    /// Completed residences paired with their state.
    pub fn completed_residences(&self) -> impl Iterator<Item = (&Structure, &ResidenceState)> {
        self.residences().filter(|(s, _)| s.is_complete())
    }

    /// Residents versus capacity across residences.
    #[must_use]
    pub fn population(&self) -> PopulationSummary {
        let mut summary = PopulationSummary::default();
        for (structure, state) in self.residences() {
            let Some(blueprint) = self.residence_blueprint(&structure.name) else {
                continue;
            };
            if structure.is_complete() {
                summary.current += state.current_pop;
                summary.capacity += blueprint.max_pop;
            } else {
                summary.pending_capacity += blueprint.max_pop;
            }
        }
        summary
    }

    /// The last `n` outdoor readings, oldest first. Fewer when history is short.
    #[must_use]
    pub fn recent_temperatures(&self, n: usize) -> Vec<f64> {
        let mut recent: Vec<f64> = self.temperature_history.values().rev().take(n).copied().collect();
        recent.reverse();
        recent
    }

    /// Number of upgrade / effect tags applied to completed buildings.
    #[must_use]
    pub fn applied_effects(&self) -> usize {
        self.completed().map(|s| s.effects.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residence(name: &str, x: i32, y: i32, progress: u32, pop: u32) -> Structure {
        Structure {
            name: name.into(),
            position: Position::new(x, y),
            build_progress: progress,
            health: 100.0,
            effective_energy_in: 0.0,
            effects: Vec::new(),
            kind: StructureKind::Residence(ResidenceState {
                current_pop: pop,
                temperature: 21.0,
                requested_energy_in: 0.0,
                happiness_per_tick_per_pop: 0.0,
            }),
        }
    }

    fn cabin() -> ResidenceBlueprint {
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

    #[test]
    fn test_neighbors_excludes_center() {
        let center = Position::new(3, 3);
        let neighbors: Vec<_> = center.neighbors().collect();
        assert_eq!(neighbors.len(), 8);
        assert!(!neighbors.contains(&center));
        assert!(neighbors.contains(&Position::new(2, 2)));
        assert!(neighbors.contains(&Position::new(4, 4)));
    }

    #[test]
    fn test_terrain_codes() {
        let grid = TerrainGrid::from_codes(&[vec![0, 1], vec![2, 0]]);
        assert!(grid.is_buildable(Position::new(0, 0)));
        assert!(!grid.is_buildable(Position::new(0, 1)));
        assert!(!grid.is_buildable(Position::new(1, 0)));
        assert!(!grid.is_buildable(Position::new(-1, 0)));
        assert!(!grid.is_buildable(Position::new(5, 5)));
        assert_eq!(grid.positions().count(), 4);
    }

    #[test]
    fn test_population_ratio() {
        let snapshot = Snapshot {
            residence_blueprints: vec![cabin()],
            structures: vec![
                residence("Cabin", 0, 0, 100, 6),
                residence("Cabin", 1, 0, 100, 2),
                residence("Cabin", 2, 0, 40, 0),
            ],
            ..Default::default()
        };
        let population = snapshot.population();
        assert_eq!(population.current, 8);
        assert_eq!(population.capacity, 16);
        assert_eq!(population.pending_capacity, 8);
        assert!((population.ratio() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_population_ratio_is_zero() {
        assert_eq!(Snapshot::default().population().ratio(), 0.0);
    }

    #[test]
    fn test_recent_temperatures_oldest_first() {
        let mut snapshot = Snapshot::default();
        for (turn, temp) in [(0, 10.0), (1, 9.0), (2, 7.5), (3, 6.0)] {
            snapshot.temperature_history.insert(turn, temp);
        }
        assert_eq!(snapshot.recent_temperatures(3), vec![9.0, 7.5, 6.0]);
        assert_eq!(snapshot.recent_temperatures(10).len(), 4);
    }

    #[test]
    fn test_occupied_cell_is_not_buildable() {
        let snapshot = Snapshot {
            map: TerrainGrid::open(3, 3),
            structures: vec![residence("Cabin", 1, 1, 100, 0)],
            ..Default::default()
        };
        assert!(!snapshot.is_buildable(Position::new(1, 1)));
        assert!(snapshot.is_buildable(Position::new(0, 1)));
    }
}

//! JSON wire format of the game host.
//!
//! The host speaks camelCase JSON. Two state shapes exist:
//!
//! - **Game info** (`new`, `gameInfo`): static map data, blueprints and
//!   upgrades, plus the current turn state.
//! - **Game state** (`start`, `gameState`, every `action/*`): the per-turn
//!   update only.
//!
//! Both are decoded into DTOs here and folded into a core
//! [`Snapshot`](civic_core::snapshot::Snapshot).
//!
//! # Example
//!
//! ```text
//! -> POST action/AdjustEnergy?GameId=abc  {"position":{"x":3,"y":4},"value":5.2}
//! <- {"turn":12,"funds":18250.0,"currentTemp":4.5,"residenceBuildings":[...],...}
//! ```

use std::collections::BTreeMap;

use civic_core::snapshot::{
    Position, ResidenceBlueprint, ResidenceState, Snapshot, Structure, StructureKind, TerrainGrid,
    Upgrade, UtilityBlueprint,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Requests (bot -> host)
// ============================================================================

/// Grid coordinate as the host writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDto {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl From<Position> for PositionDto {
    fn from(p: Position) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<PositionDto> for Position {
    fn from(p: PositionDto) -> Self {
        Position::new(p.x, p.y)
    }
}

/// Body of `new`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameRequest<'a> {
    /// Map to play.
    pub map_name: &'a str,
}

/// Body of `action/startBuild`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBuildRequest<'a> {
    /// Target cell.
    pub position: PositionDto,
    /// Blueprint name.
    pub building_name: &'a str,
}

/// Body of `action/Build`, `action/Demolish` and `action/Maintenance`.
#[derive(Debug, Clone, Serialize)]
pub struct PositionRequest {
    /// Target cell.
    pub position: PositionDto,
}

/// Body of `action/AdjustEnergy`.
#[derive(Debug, Clone, Serialize)]
pub struct AdjustEnergyRequest {
    /// Residence cell.
    pub position: PositionDto,
    /// Requested energy in MWh.
    pub value: f64,
}

/// Body of `action/BuyUpgrade`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyUpgradeRequest<'a> {
    /// Building cell.
    pub position: PositionDto,
    /// Upgrade name.
    pub upgrade_action: &'a str,
}

// ============================================================================
// Responses (host -> bot)
// ============================================================================

/// A residence on the map.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidenceDto {
    /// Blueprint name.
    pub building_name: String,
    /// Cell.
    pub position: PositionDto,
    /// Energy delivered this turn.
    #[serde(default)]
    pub effective_energy_in: f64,
    /// Construction progress.
    pub build_progress: u32,
    /// Whether the host allows demolition.
    #[serde(default)]
    pub can_be_demolished: bool,
    /// Applied effects.
    #[serde(default)]
    pub effects: Vec<String>,
    /// Residents.
    #[serde(default)]
    pub current_pop: u32,
    /// Indoor temperature.
    #[serde(default)]
    pub temperature: f64,
    /// Energy asked for.
    #[serde(default)]
    pub requested_energy_in: f64,
    /// Happiness rate.
    #[serde(default)]
    pub happiness_per_tick_per_pop: f64,
    /// Health.
    #[serde(default)]
    pub health: f64,
}

/// A utility building on the map.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityDto {
    /// Blueprint name.
    pub building_name: String,
    /// Cell.
    pub position: PositionDto,
    /// Energy delivered this turn.
    #[serde(default)]
    pub effective_energy_in: f64,
    /// Construction progress.
    pub build_progress: u32,
    /// Applied effects.
    #[serde(default)]
    pub effects: Vec<String>,
}

/// Per-turn state update.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStateDto {
    /// Turn index.
    pub turn: u32,
    /// Residences.
    pub residence_buildings: Vec<ResidenceDto>,
    /// Utilities.
    pub utility_buildings: Vec<UtilityDto>,
    /// Money.
    pub funds: f64,
    /// CO2 so far.
    pub total_co2: f64,
    /// Happiness so far.
    pub total_happiness: f64,
    /// Outdoor temperature.
    pub current_temp: f64,
    /// People waiting for housing.
    pub housing_queue: u32,
    /// Happiness of the queue.
    pub queue_happiness: f64,
    /// Error strings for this turn.
    pub errors: Vec<String>,
    /// Messages for this turn.
    pub messages: Vec<String>,
}

/// Residence blueprint as the host describes it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidenceBlueprintDto {
    /// Name.
    pub building_name: String,
    /// Price.
    pub cost: f64,
    /// Construction CO2.
    #[serde(default)]
    pub co2_cost: f64,
    /// Base energy need.
    pub base_energy_need: f64,
    /// Progress per build action.
    pub build_speed: u32,
    /// Unlock turn.
    #[serde(default)]
    pub release_tick: u32,
    /// Capacity.
    pub max_pop: u32,
    /// Income per resident.
    #[serde(default)]
    pub income_per_pop: f64,
    /// Heat loss factor.
    pub emissivity: f64,
    /// Repair price.
    #[serde(default)]
    pub maintenance_cost: f64,
    /// Health lost per turn.
    #[serde(default)]
    pub decay_rate: f64,
    /// Happiness ceiling.
    #[serde(default)]
    pub max_happiness: f64,
}

impl From<ResidenceBlueprintDto> for ResidenceBlueprint {
    fn from(dto: ResidenceBlueprintDto) -> Self {
        Self {
            name: dto.building_name,
            cost: dto.cost,
            co2_cost: dto.co2_cost,
            base_energy_need: dto.base_energy_need,
            build_speed: dto.build_speed,
            release_tick: dto.release_tick,
            max_pop: dto.max_pop,
            income_per_pop: dto.income_per_pop,
            emissivity: dto.emissivity,
            maintenance_cost: dto.maintenance_cost,
            decay_rate: dto.decay_rate,
            max_happiness: dto.max_happiness,
        }
    }
}

/// Utility blueprint as the host describes it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityBlueprintDto {
    /// Name.
    pub building_name: String,
    /// Price.
    pub cost: f64,
    /// Construction CO2.
    #[serde(default)]
    pub co2_cost: f64,
    /// Energy draw.
    #[serde(default)]
    pub base_energy_need: f64,
    /// Progress per build action.
    pub build_speed: u32,
    /// Unlock turn.
    #[serde(default)]
    pub release_tick: u32,
    /// Effect names.
    #[serde(default)]
    pub effects: Vec<String>,
    /// Queue growth.
    #[serde(default)]
    pub queue_increase: f64,
}

impl From<UtilityBlueprintDto> for UtilityBlueprint {
    fn from(dto: UtilityBlueprintDto) -> Self {
        Self {
            name: dto.building_name,
            cost: dto.cost,
            co2_cost: dto.co2_cost,
            base_energy_need: dto.base_energy_need,
            build_speed: dto.build_speed,
            release_tick: dto.release_tick,
            effects: dto.effects,
            queue_increase: dto.queue_increase,
        }
    }
}

/// Purchasable upgrade.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeDto {
    /// Name.
    pub name: String,
    /// Effect it applies.
    #[serde(default)]
    pub effect: String,
    /// Price.
    pub cost: f64,
}

impl From<UpgradeDto> for Upgrade {
    fn from(dto: UpgradeDto) -> Self {
        let effect = if dto.effect.is_empty() {
            dto.name.clone()
        } else {
            dto.effect
        };
        Self {
            name: dto.name,
            effect,
            cost: dto.cost,
        }
    }
}

/// Full game description plus the current state.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfoDto {
    /// Session id.
    pub game_id: String,
    /// Map name.
    #[serde(default)]
    pub map_name: String,
    /// Turn limit.
    pub max_turns: u32,
    /// Warmest outdoor temperature on this map.
    #[serde(default)]
    pub max_temp: f64,
    /// Coldest outdoor temperature on this map.
    #[serde(default)]
    pub min_temp: f64,
    /// Terrain codes, `map[x][y]`; 0 is buildable.
    #[serde(default)]
    pub map: Vec<Vec<i32>>,
    /// Residence blueprints.
    #[serde(default)]
    pub available_residence_buildings: Vec<ResidenceBlueprintDto>,
    /// Utility blueprints.
    #[serde(default)]
    pub available_utility_buildings: Vec<UtilityBlueprintDto>,
    /// Upgrades.
    #[serde(default)]
    pub available_upgrades: Vec<UpgradeDto>,
    /// Current state.
    #[serde(flatten)]
    pub state: GameStateDto,
}

/// Final result of a session.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreDto {
    /// Session id.
    pub game_id: String,
    /// CO2 released.
    pub total_co2: f64,
    /// Happiness produced.
    pub total_happiness: f64,
    /// Residents at the end.
    pub final_population: f64,
    /// Score.
    pub final_score: f64,
}

// ============================================================================
// Conversion into the core snapshot
// ============================================================================

impl ResidenceDto {
    fn into_structure(self) -> Structure {
        Structure {
            name: self.building_name,
            position: self.position.into(),
            build_progress: self.build_progress,
            health: self.health,
            effective_energy_in: self.effective_energy_in,
            effects: self.effects,
            kind: StructureKind::Residence(ResidenceState {
                current_pop: self.current_pop,
                temperature: self.temperature,
                requested_energy_in: self.requested_energy_in,
                happiness_per_tick_per_pop: self.happiness_per_tick_per_pop,
            }),
        }
    }
}

impl UtilityDto {
    fn into_structure(self) -> Structure {
        Structure {
            name: self.building_name,
            position: self.position.into(),
            build_progress: self.build_progress,
            health: 100.0,
            effective_energy_in: self.effective_energy_in,
            effects: self.effects,
            kind: StructureKind::Utility,
        }
    }
}

impl GameStateDto {
    /// Fold a turn update into an existing snapshot.
    ///
    /// Static data (map, blueprints) is kept; the outdoor reading is added to
    /// the temperature history under the new turn.
    pub fn apply_to(self, snapshot: &mut Snapshot) {
        snapshot.turn = self.turn;
        snapshot.funds = self.funds;
        snapshot.total_co2 = self.total_co2;
        snapshot.total_happiness = self.total_happiness;
        snapshot.current_temp = self.current_temp;
        snapshot.housing_queue = self.housing_queue;
        snapshot.errors = self.errors;
        snapshot.messages = self.messages;
        snapshot.structures = self
            .residence_buildings
            .into_iter()
            .map(ResidenceDto::into_structure)
            .chain(self.utility_buildings.into_iter().map(UtilityDto::into_structure))
            .collect();
        snapshot
            .temperature_history
            .insert(snapshot.turn, snapshot.current_temp);
    }
}

impl GameInfoDto {
    /// Build a fresh snapshot from the full game description.
    #[must_use]
    pub fn into_snapshot(self) -> Snapshot {
        let mut snapshot = Snapshot {
            game_id: self.game_id,
            map_name: self.map_name,
            max_turns: self.max_turns,
            map: TerrainGrid::from_codes(&self.map),
            residence_blueprints: self
                .available_residence_buildings
                .into_iter()
                .map(Into::into)
                .collect(),
            utility_blueprints: self
                .available_utility_buildings
                .into_iter()
                .map(Into::into)
                .collect(),
            upgrades: self.available_upgrades.into_iter().map(Into::into).collect(),
            temperature_history: BTreeMap::new(),
            ..Snapshot::default()
        };
        self.state.apply_to(&mut snapshot);
        snapshot
    }
}

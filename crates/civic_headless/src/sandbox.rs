//! Offline game host.
//!
//! [`SandboxGame`] implements the same [`Gateway`] contract as the remote
//! host with a simplified turn model:
//!
//! - indoor temperature follows the same heat balance the thermal policy
//!   predicts with;
//! - comfortable residences take in residents from the housing queue,
//!   uncomfortable ones lose them;
//! - residences decay, faster when uncomfortable, and pay rent per resident;
//! - energy is billed per MWh drawn, minus on-site production;
//! - upgrades and nearby utilities modify all of the above through effects.
//!
//! Invalid actions do not fail the call. Like the real host, the turn is
//! consumed and an error string is attached to the returned snapshot.

use civic_core::error::GatewayError;
use civic_core::gateway::{Action, Gateway};
use civic_core::snapshot::{
    ActionRecord, Position, ResidenceState, Snapshot, Structure, StructureKind, BUILD_COMPLETE,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::protocol::ScoreDto;
use crate::scenario::{EffectSpec, Scenario};

/// Heat gained per MWh above the base need.
const DEGREES_PER_EXCESS_MWH: f64 = 0.75;
/// Heat gained per resident.
const DEGREES_PER_POP: f64 = 0.04;

/// Score weights.
const SCORE_PER_RESIDENT: f64 = 15.0;
const HAPPINESS_DIVISOR: f64 = 10.0;

/// Combined effect modifiers on one residence.
#[derive(Debug, Clone, Copy)]
struct Modifiers {
    emissivity: f64,
    decay: f64,
    income: f64,
    happiness: f64,
    production: f64,
    base_energy: f64,
    co2_per_pop: f64,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            emissivity: 1.0,
            decay: 1.0,
            income: 0.0,
            happiness: 0.0,
            production: 0.0,
            base_energy: 0.0,
            co2_per_pop: 0.0,
        }
    }
}

impl<'a> FromIterator<&'a EffectSpec> for Modifiers {
    fn from_iter<I: IntoIterator<Item = &'a EffectSpec>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |m, e| Self {
            emissivity: m.emissivity * e.emissivity_multiplier,
            decay: m.decay * e.decay_multiplier,
            income: m.income + e.building_income_increase,
            happiness: m.happiness + e.max_happiness_increase,
            production: m.production + e.mwh_production,
            base_energy: m.base_energy + e.base_energy_mwh_increase,
            co2_per_pop: m.co2_per_pop + e.co2_per_pop_increase,
        })
    }
}

fn within(a: Position, b: Position, radius: i32) -> bool {
    (a.x - b.x).abs().max((a.y - b.y).abs()) <= radius
}

/// In-process game session driven by a [`Scenario`].
#[derive(Debug, Clone)]
pub struct SandboxGame {
    scenario: Scenario,
    state: Snapshot,
    rng: ChaCha8Rng,
    queue_progress: f64,
}

impl SandboxGame {
    /// Start a session at turn zero. `seed` drives the weather noise.
    #[must_use]
    pub fn new(scenario: Scenario, seed: u64) -> Self {
        let mut game = Self {
            state: Snapshot {
                game_id: format!("sandbox-{seed}"),
                map_name: scenario.name.clone(),
                max_turns: scenario.max_turns,
                funds: scenario.economy.starting_funds,
                map: scenario.terrain(),
                residence_blueprints: scenario.residences.clone(),
                utility_blueprints: scenario.utilities.clone(),
                upgrades: scenario.upgrades.clone(),
                housing_queue: scenario.economy.initial_queue,
                ..Snapshot::default()
            },
            scenario,
            rng: ChaCha8Rng::seed_from_u64(seed),
            queue_progress: 0.0,
        };
        let outdoor = game.outdoor(0);
        game.state.current_temp = outdoor;
        game.state.temperature_history.insert(0, outdoor);
        game
    }

    /// Scenario in play.
    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Host-style score of the session so far:
    /// `15 * residents + happiness / 10 - co2`.
    #[must_use]
    pub fn score(&self) -> ScoreDto {
        let population: u32 = self.state.residences().map(|(_, r)| r.current_pop).sum();
        let population = f64::from(population);
        ScoreDto {
            game_id: self.state.game_id.clone(),
            total_co2: self.state.total_co2,
            total_happiness: self.state.total_happiness,
            final_population: population,
            final_score: SCORE_PER_RESIDENT * population
                + self.state.total_happiness / HAPPINESS_DIVISOR
                - self.state.total_co2,
        }
    }

    fn outdoor(&mut self, turn: u32) -> f64 {
        let climate = &self.scenario.climate;
        let noise = if climate.noise > 0.0 {
            self.rng.gen_range(-climate.noise..=climate.noise)
        } else {
            0.0
        };
        climate.baseline(turn) + noise
    }

    fn index_of(&self, position: Position) -> Result<usize, String> {
        self.state
            .structures
            .iter()
            .position(|s| s.position == position)
            .ok_or_else(|| format!("No building at {position}"))
    }

    fn build_speed(&self, name: &str) -> u32 {
        self.state
            .residence_blueprint(name)
            .map(|b| b.build_speed)
            .or_else(|| self.state.utility_blueprint(name).map(|b| b.build_speed))
            .unwrap_or(BUILD_COMPLETE)
    }

    fn pay(&mut self, cost: f64, what: &str) -> Result<(), String> {
        if !self.state.can_afford(cost) {
            return Err(format!("Not enough funds for {what}"));
        }
        self.state.funds -= cost;
        Ok(())
    }

    fn apply(&mut self, action: &Action) -> Result<(), String> {
        match action {
            Action::StartBuild { position, building } => self.place_foundation(*position, building),
            Action::ContinueBuild { position } => self.advance_construction(*position),
            Action::Demolish { position } => {
                let index = self.index_of(*position)?;
                let removed = self.state.structures.remove(index);
                self.state
                    .messages
                    .push(format!("Demolished {} at {position}", removed.name));
                Ok(())
            }
            Action::Maintain { position } => {
                let index = self.index_of(*position)?;
                let name = self.state.structures[index].name.clone();
                let cost = self
                    .state
                    .residence_blueprint(&name)
                    .map(|b| b.maintenance_cost)
                    .ok_or_else(|| format!("{name} at {position} needs no maintenance"))?;
                self.pay(cost, "maintenance")?;
                self.state.structures[index].health = 100.0;
                Ok(())
            }
            Action::AdjustEnergy { position, value } => {
                let index = self.index_of(*position)?;
                if *value < 0.0 || !value.is_finite() {
                    return Err(format!("Invalid energy value {value}"));
                }
                if !self.state.structures[index].is_complete() {
                    return Err(format!("Building at {position} is not complete"));
                }
                if self.state.structures[index].residence().is_none() {
                    return Err(format!("Building at {position} is not a residence"));
                }
                self.pay(self.scenario.economy.adjust_cost, "energy adjustment")?;
                if let StructureKind::Residence(state) = &mut self.state.structures[index].kind {
                    state.requested_energy_in = *value;
                }
                Ok(())
            }
            Action::PurchaseUpgrade { position, upgrade } => {
                let index = self.index_of(*position)?;
                let upgrade = self
                    .state
                    .upgrades
                    .iter()
                    .find(|u| &u.name == upgrade)
                    .cloned()
                    .ok_or_else(|| format!("Unknown upgrade {upgrade}"))?;
                let structure = &self.state.structures[index];
                if !structure.is_complete() {
                    return Err(format!("Building at {position} is not complete"));
                }
                if structure.has_effect(&upgrade.effect) {
                    return Err(format!("Building at {position} already has {}", upgrade.name));
                }
                self.pay(upgrade.cost, &upgrade.name)?;
                self.state.structures[index].effects.push(upgrade.effect);
                Ok(())
            }
            Action::Wait => Ok(()),
        }
    }

    fn place_foundation(&mut self, position: Position, building: &str) -> Result<(), String> {
        if !self.state.map.is_buildable(position) {
            return Err(format!("Position {position} is not buildable"));
        }
        if self.state.is_occupied(position) {
            return Err(format!("Position {position} is occupied"));
        }
        let (cost, co2_cost, release_tick, kind) =
            if let Some(bp) = self.state.residence_blueprint(building) {
                let state = ResidenceState {
                    current_pop: 0,
                    temperature: self.scenario.economy.initial_indoor,
                    requested_energy_in: 0.0,
                    happiness_per_tick_per_pop: 0.0,
                };
                (bp.cost, bp.co2_cost, bp.release_tick, StructureKind::Residence(state))
            } else if let Some(bp) = self.state.utility_blueprint(building) {
                (bp.cost, bp.co2_cost, bp.release_tick, StructureKind::Utility)
            } else {
                return Err(format!("Unknown building {building}"));
            };
        if release_tick > self.state.turn {
            return Err(format!("{building} is not available until turn {release_tick}"));
        }
        self.pay(cost, building)?;
        self.state.total_co2 += co2_cost;
        self.state.structures.push(Structure {
            name: building.to_string(),
            position,
            build_progress: 0,
            health: 100.0,
            effective_energy_in: 0.0,
            effects: Vec::new(),
            kind,
        });
        Ok(())
    }

    fn advance_construction(&mut self, position: Position) -> Result<(), String> {
        let index = self.index_of(position)?;
        if self.state.structures[index].is_complete() {
            return Err(format!("Building at {position} is already complete"));
        }
        let name = self.state.structures[index].name.clone();
        let speed = self.build_speed(&name);
        let base_need = self
            .state
            .residence_blueprint(&name)
            .map_or(0.0, |b| b.base_energy_need);

        let structure = &mut self.state.structures[index];
        structure.build_progress = (structure.build_progress + speed).min(BUILD_COMPLETE);
        if structure.is_complete() {
            if let StructureKind::Residence(state) = &mut structure.kind {
                state.requested_energy_in = base_need;
            }
            self.state
                .messages
                .push(format!("{name} at {position} completed"));
        }
        Ok(())
    }

    /// Advance the world by one turn.
    fn tick(&mut self) {
        let turn = self.state.turn + 1;
        let outdoor = self.outdoor(turn);
        let economy = self.scenario.economy.clone();

        let mut funds = 0.0;
        let mut co2 = 0.0;
        let mut happiness = 0.0;
        let mut queue_growth = economy.queue_growth;
        let mut reach: Vec<(Position, String, i32)> = Vec::new();

        for utility in self.state.completed().filter(|s| s.residence().is_none()) {
            let Some(bp) = self.state.utility_blueprint(&utility.name) else {
                continue;
            };
            queue_growth += bp.queue_increase;
            funds -= bp.base_energy_need * economy.cost_per_mwh;
            co2 += bp.base_energy_need * economy.co2_per_mwh;
            for effect in &bp.effects {
                let radius = self.scenario.effect(effect).map_or(0, |e| e.radius);
                reach.push((utility.position, effect.clone(), radius));
            }
        }

        self.queue_progress += queue_growth;
        let arrivals = self.queue_progress.floor();
        self.queue_progress -= arrivals;
        let mut queue = self.state.housing_queue + arrivals as u32;

        let blueprints = self.state.residence_blueprints.clone();
        for structure in &mut self.state.structures {
            if !structure.is_complete() {
                continue;
            }
            let Some(bp) = blueprints.iter().find(|b| b.name == structure.name) else {
                continue;
            };
            for (origin, effect, radius) in &reach {
                if within(*origin, structure.position, *radius) && !structure.has_effect(effect) {
                    structure.effects.push(effect.clone());
                }
            }
            let mods: Modifiers = structure
                .effects
                .iter()
                .filter_map(|e| self.scenario.effect(e))
                .collect();
            let StructureKind::Residence(state) = &mut structure.kind else {
                continue;
            };

            let energy_in = state.requested_energy_in;
            structure.effective_energy_in = energy_in;
            state.temperature += (energy_in - (bp.base_energy_need + mods.base_energy))
                * DEGREES_PER_EXCESS_MWH
                + DEGREES_PER_POP * f64::from(state.current_pop)
                - (state.temperature - outdoor) * bp.emissivity * mods.emissivity;

            let discomfort = if state.temperature < economy.comfort_min {
                economy.comfort_min - state.temperature
            } else if state.temperature > economy.comfort_max {
                state.temperature - economy.comfort_max
            } else {
                0.0
            };
            let usable = structure.health > 0.0;
            if discomfort == 0.0 && usable {
                let moving = (bp.max_pop - state.current_pop.min(bp.max_pop))
                    .min(economy.move_in_rate)
                    .min(queue);
                state.current_pop += moving;
                queue -= moving;
            } else if state.current_pop > 0 {
                state.current_pop -= 1;
            }

            let pop = f64::from(state.current_pop);
            let comfort = if discomfort == 0.0 { 1.0 } else { 0.25 };
            state.happiness_per_tick_per_pop = (bp.max_happiness + mods.happiness) * comfort;
            happiness += state.happiness_per_tick_per_pop * pop;
            funds += pop * (bp.income_per_pop + mods.income);

            let drawn = (energy_in - mods.production).max(0.0);
            funds -= drawn * economy.cost_per_mwh;
            co2 += drawn * economy.co2_per_mwh + pop * (economy.co2_per_pop + mods.co2_per_pop);

            if usable {
                structure.health -=
                    bp.decay_rate * mods.decay + discomfort * economy.discomfort_decay;
                if structure.health <= 0.0 {
                    structure.health = 0.0;
                    self.state.messages.push(format!(
                        "{} at {} is uninhabitable",
                        structure.name, structure.position
                    ));
                }
            }
        }

        self.state.housing_queue = queue;
        self.state.funds += funds;
        self.state.total_co2 += co2;
        self.state.total_happiness += happiness;
        self.state.turn = turn;
        self.state.current_temp = outdoor;
        self.state.temperature_history.insert(turn, outdoor);
        trace!(turn, outdoor, funds = self.state.funds, queue, "Sandbox tick");
    }
}

impl Gateway for SandboxGame {
    fn get_state(&mut self) -> Result<Snapshot, GatewayError> {
        Ok(self.state.clone())
    }

    fn execute(&mut self, action: Action) -> Result<Snapshot, GatewayError> {
        if self.state.is_over() {
            return Err(GatewayError::Rejected(format!(
                "Game {} is over",
                self.state.game_id
            )));
        }
        self.state.messages.clear();
        self.state.errors.clear();
        if let Err(message) = self.apply(&action) {
            self.state.errors.push(message);
        }
        self.state.action_log.push(ActionRecord {
            turn: self.state.turn,
            action,
        });
        self.tick();
        Ok(self.state.clone())
    }
}

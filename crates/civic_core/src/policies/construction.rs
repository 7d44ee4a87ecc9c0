//! Policies that start new residences.

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::gateway::Action;
use crate::placement::Placement;
use crate::policy::{Policy, TurnContext};
use crate::snapshot::{ResidenceBlueprint, Snapshot};

/// Resolve the residence to build.
///
/// A configured, non-blank name is looked up as-is (affordable or not). With no
/// name, a random affordable blueprint is drawn.
pub fn select_residence<'s>(
    snapshot: &'s Snapshot,
    building: Option<&str>,
    rng: &mut dyn RngCore,
) -> Option<&'s ResidenceBlueprint> {
    match building.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => snapshot.residence_blueprint(name),
        None => {
            let affordable: Vec<_> = snapshot
                .residence_blueprints
                .iter()
                .filter(|b| snapshot.can_afford(b.cost))
                .collect();
            affordable.choose(rng).copied()
        }
    }
}

/// Shared start-build path: position, blueprint, affordability, issue.
fn start_residence(
    policy: &str,
    snapshot: &Snapshot,
    ctx: &mut TurnContext<'_>,
    building: Option<&str>,
    placement: Placement,
) -> Result<bool> {
    let Some(position) = placement.choose(snapshot, ctx.rng()) else {
        warn!(policy, "No valid positions to build building");
        return Ok(false);
    };
    let Some(blueprint) = select_residence(snapshot, building, ctx.rng()) else {
        debug!(policy, ?building, "No valid building");
        return Ok(false);
    };
    if !snapshot.can_afford(blueprint.cost) {
        debug!(
            policy,
            building = %blueprint.name,
            cost = blueprint.cost,
            funds = snapshot.funds,
            "Wanted to build, but cannot afford it"
        );
        return Ok(false);
    }
    ctx.issue(
        policy,
        Action::StartBuild {
            position,
            building: blueprint.name.clone(),
        },
    )?;
    Ok(true)
}

fn default_first_building() -> Option<String> {
    Some("Cabin".to_string())
}

/// Settings for [`InitialConstruction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConfig {
    /// Blueprint to start with; `None` draws an affordable one.
    pub building: Option<String>,
    /// Cell selection.
    pub placement: Placement,
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            building: default_first_building(),
            placement: Placement::Random,
        }
    }
}

/// Starts the first building on turn zero.
#[derive(Debug, Clone, Default)]
pub struct InitialConstruction {
    config: InitialConfig,
}

impl InitialConstruction {
    /// Build with explicit settings.
    #[must_use]
    pub fn new(config: InitialConfig) -> Self {
        Self { config }
    }
}

impl Policy for InitialConstruction {
    fn name(&self) -> &str {
        "initial_construction"
    }

    fn try_execute(&self, snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<bool> {
        if snapshot.turn != 0 {
            return Ok(false);
        }
        start_residence(
            self.name(),
            snapshot,
            ctx,
            self.config.building.as_deref(),
            self.config.placement,
        )
    }
}

/// Starts a residence whenever the map holds no structure at all.
#[derive(Debug, Clone, Default)]
pub struct SingletonConstruction {
    config: InitialConfig,
}

impl SingletonConstruction {
    /// Build with explicit settings.
    #[must_use]
    pub fn new(config: InitialConfig) -> Self {
        Self { config }
    }
}

impl Policy for SingletonConstruction {
    fn name(&self) -> &str {
        "singleton_construction"
    }

    fn try_execute(&self, snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<bool> {
        if !snapshot.structures.is_empty() {
            return Ok(false);
        }
        start_residence(
            self.name(),
            snapshot,
            ctx,
            self.config.building.as_deref(),
            self.config.placement,
        )
    }
}

/// Settings for [`ThresholdConstruction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Blueprint to build; `None` draws an affordable one.
    pub building: Option<String>,
    /// Occupancy ratio that must be exceeded.
    pub population_threshold: f64,
    /// Cell selection.
    pub placement: Placement,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            building: None,
            population_threshold: 0.805,
            placement: Placement::NearResidences,
        }
    }
}

/// Expands housing once completed residences are nearly full.
#[derive(Debug, Clone, Default)]
pub struct ThresholdConstruction {
    config: ThresholdConfig,
}

impl ThresholdConstruction {
    /// Build with explicit settings.
    #[must_use]
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }
}

impl Policy for ThresholdConstruction {
    fn name(&self) -> &str {
        "threshold_construction"
    }

    fn try_execute(&self, snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<bool> {
        let population = snapshot.population();
        let ratio = population.ratio();
        debug!(
            current = population.current,
            capacity = population.capacity,
            pending = population.pending_capacity,
            ratio,
            "Population occupancy"
        );
        if ratio <= self.config.population_threshold {
            return Ok(false);
        }
        start_residence(
            self.name(),
            snapshot,
            ctx,
            self.config.building.as_deref(),
            self.config.placement,
        )
    }
}

/// Settings for [`IdleConstruction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Blueprint to build; `None` draws an affordable one.
    pub building: Option<String>,
    /// Funds must reach this multiple of the average blueprint cost.
    pub funds_multiple: f64,
    /// Residences below this health count as pending repairs.
    pub damage_threshold: f64,
    /// Cell selection.
    pub placement: Placement,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            building: default_first_building(),
            funds_multiple: 2.0,
            damage_threshold: 45.0,
            placement: Placement::Spacious,
        }
    }
}

/// Puts spare money to work when there is nothing else to do.
#[derive(Debug, Clone, Default)]
pub struct IdleConstruction {
    config: IdleConfig,
}

impl IdleConstruction {
    /// Build with explicit settings.
    #[must_use]
    pub fn new(config: IdleConfig) -> Self {
        Self { config }
    }

    fn is_idle(&self, snapshot: &Snapshot) -> bool {
        if snapshot.under_construction().next().is_some() {
            return false;
        }
        if snapshot
            .residences()
            .any(|(s, _)| s.health < self.config.damage_threshold)
        {
            return false;
        }
        let (total, count) = snapshot
            .blueprint_costs()
            .fold((0.0, 0_u32), |(sum, n), cost| (sum + cost, n + 1));
        if count == 0 {
            return false;
        }
        let average = total / f64::from(count);
        snapshot.funds >= average * self.config.funds_multiple
    }
}

impl Policy for IdleConstruction {
    fn name(&self) -> &str {
        "idle_construction"
    }

    fn try_execute(&self, snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<bool> {
        if !self.is_idle(snapshot) {
            return Ok(false);
        }
        start_residence(
            self.name(),
            snapshot,
            ctx,
            self.config.building.as_deref(),
            self.config.placement,
        )
    }
}

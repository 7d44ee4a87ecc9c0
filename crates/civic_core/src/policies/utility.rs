//! Placing shared-service buildings next to housing.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::gateway::Action;
use crate::placement::best_position_near_residences;
use crate::policy::{Policy, TurnContext};
use crate::snapshot::Snapshot;

/// Settings for [`UtilityPlacement`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityConfig {
    /// Utility blueprint to build; `None` draws an affordable one.
    pub building: Option<String>,
    /// Cap on structures of this type.
    pub max_count: usize,
}

impl Default for UtilityConfig {
    fn default() -> Self {
        Self {
            building: Some("Park".to_string()),
            max_count: 2,
        }
    }
}

/// Builds a capped number of one utility type near residences.
#[derive(Debug, Clone)]
pub struct UtilityPlacement {
    config: UtilityConfig,
    name: String,
}

impl UtilityPlacement {
    /// Build with explicit settings.
    #[must_use]
    pub fn new(config: UtilityConfig) -> Self {
        let name = match config.building.as_deref() {
            Some(building) => format!("utility_placement({building})"),
            None => "utility_placement".to_string(),
        };
        Self { config, name }
    }

    /// Shorthand for a named utility with a cap.
    #[must_use]
    pub fn with_building(building: &str, max_count: usize) -> Self {
        Self::new(UtilityConfig {
            building: Some(building.to_string()),
            max_count,
        })
    }
}

impl Default for UtilityPlacement {
    fn default() -> Self {
        Self::new(UtilityConfig::default())
    }
}

impl Policy for UtilityPlacement {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_execute(&self, snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<bool> {
        let blueprint = match self.config.building.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => snapshot.utility_blueprint(name),
            None => {
                let affordable: Vec<_> = snapshot
                    .utility_blueprints
                    .iter()
                    .filter(|b| snapshot.can_afford(b.cost))
                    .collect();
                affordable.choose(ctx.rng()).copied()
            }
        };
        let Some(blueprint) = blueprint else {
            debug!(building = ?self.config.building, "No valid utility building");
            return Ok(false);
        };

        let existing: Vec<_> = snapshot
            .structures
            .iter()
            .filter(|s| s.name == blueprint.name)
            .collect();
        if existing.len() >= self.config.max_count {
            return Ok(false);
        }
        if existing.iter().any(|s| !s.is_complete()) {
            debug!(building = %blueprint.name, "Already one under construction");
            return Ok(false);
        }
        if !snapshot.can_afford(blueprint.cost) {
            debug!(
                building = %blueprint.name,
                cost = blueprint.cost,
                funds = snapshot.funds,
                "Wanted to build utility, but cannot afford it"
            );
            return Ok(false);
        }

        let Some(position) = best_position_near_residences(snapshot) else {
            warn!(building = %blueprint.name, "No valid positions to build utility building");
            return Ok(false);
        };
        ctx.issue(
            self.name(),
            Action::StartBuild {
                position,
                building: blueprint.name.clone(),
            },
        )?;
        Ok(true)
    }
}

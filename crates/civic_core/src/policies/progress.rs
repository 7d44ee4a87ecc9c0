//! Finishing what has been started.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::gateway::Action;
use crate::policy::{Policy, TurnContext};
use crate::snapshot::{Position, Snapshot, Structure};

/// Settings for [`ProgressConstruction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Tune the energy of a residence on the turn it completes.
    pub adjust_heat_on_constructed: bool,
    /// Skip the follow-up when the requested energy is already this close.
    pub energy_margin: f64,
    /// Price of an energy adjustment.
    pub adjust_cost: f64,
    /// Heat gained per resident per turn.
    pub degrees_per_pop: f64,
    /// Constant subtracted from the energy estimate.
    pub energy_offset: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            adjust_heat_on_constructed: true,
            energy_margin: 0.5,
            adjust_cost: 150.0,
            degrees_per_pop: 0.04,
            energy_offset: 0.5,
        }
    }
}

/// Continues construction on the structure closest to completion.
#[derive(Debug, Clone, Default)]
pub struct ProgressConstruction {
    config: ProgressConfig,
}

impl ProgressConstruction {
    /// Build with explicit settings.
    #[must_use]
    pub fn new(config: ProgressConfig) -> Self {
        Self { config }
    }

    /// Unfinished structure with the highest progress; the first one wins ties.
    #[must_use]
    pub fn furthest_along(snapshot: &Snapshot) -> Option<&Structure> {
        snapshot
            .under_construction()
            .reduce(|best, s| if s.build_progress > best.build_progress { s } else { best })
    }

    /// Energy for a residence that just completed, if it differs enough from
    /// what is requested.
    #[must_use]
    pub fn initial_energy(&self, snapshot: &Snapshot, position: Position) -> Option<f64> {
        let structure = snapshot.structure_at(position).filter(|s| s.is_complete())?;
        let residence = structure.residence()?;
        let blueprint = snapshot.residence_blueprint(&structure.name)?;

        let energy = blueprint.base_energy_need
            + (residence.temperature - snapshot.current_temp) * blueprint.emissivity
            - self.config.energy_offset
            - f64::from(residence.current_pop) * self.config.degrees_per_pop;
        let energy = energy.max(blueprint.base_energy_need);

        let requested = residence.requested_energy_in;
        let close = requested - self.config.energy_margin < energy
            && energy < requested + self.config.energy_margin;
        (!close).then_some(energy)
    }
}

impl Policy for ProgressConstruction {
    fn name(&self) -> &str {
        "progress_construction"
    }

    fn try_execute(&self, snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<bool> {
        let Some(structure) = Self::furthest_along(snapshot) else {
            return Ok(false);
        };
        let position = structure.position;
        debug!(
            building = %structure.name,
            %position,
            progress = structure.build_progress,
            "Continuing construction"
        );
        ctx.issue(self.name(), Action::ContinueBuild { position })?;

        if !self.config.adjust_heat_on_constructed {
            return Ok(true);
        }
        let Some(after) = ctx.latest_snapshot().filter(|s| !s.is_over()) else {
            return Ok(true);
        };
        let Some(energy) = self.initial_energy(after, position) else {
            return Ok(true);
        };
        if !after.can_afford(self.config.adjust_cost) {
            warn!(%position, energy, funds = after.funds, "Completed residence left untuned, insufficient funds");
            return Ok(true);
        }
        info!(%position, energy, "Residence completed, setting initial energy");
        ctx.follow_up(self.name(), Action::AdjustEnergy { position, value: energy })?;
        Ok(true)
    }
}

//! Closed-loop indoor temperature regulation.
//!
//! Keeps completed residences near a target temperature by adjusting their
//! requested energy. The outdoor reading is extrapolated from the last two
//! deltas when they agree in sign, so sustained swings are met early instead
//! of chased.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::gateway::Action;
use crate::policy::{Policy, TurnContext};
use crate::snapshot::{ResidenceBlueprint, ResidenceState, Snapshot, Structure};

/// Tuning for [`ThermalRegulation`]. Defaults match the host's numeric model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Lower edge of the safety band.
    pub min_temperature: f64,
    /// Upper edge of the safety band.
    pub max_temperature: f64,
    /// Desired indoor temperature.
    pub target_temperature: f64,
    /// Predictions closer than this to the target need no action.
    pub temperature_margin: f64,
    /// Energy changes smaller than this are not worth an action.
    pub energy_margin: f64,
    /// Price the host charges per adjustment.
    pub adjust_cost: f64,
    /// Heat gained per resident per turn.
    pub degrees_per_pop: f64,
    /// Heat gained per MWh above the base need.
    pub degrees_per_excess_mwh: f64,
    /// Multiplier applied to the averaged outdoor delta.
    pub trend_gain: f64,
    /// Energy scale while the outdoors is warming.
    pub warming_scale: f64,
    /// Energy scale while the outdoors is cooling.
    pub cooling_scale: f64,
    /// Constant added to the energy estimate.
    pub energy_offset: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            min_temperature: 18.0,
            max_temperature: 24.0,
            target_temperature: 21.0,
            temperature_margin: 2.0,
            energy_margin: 0.2,
            adjust_cost: 150.0,
            degrees_per_pop: 0.04,
            degrees_per_excess_mwh: 0.75,
            trend_gain: 2.0,
            warming_scale: 0.9,
            cooling_scale: 1.1,
            energy_offset: 0.5,
        }
    }
}

/// Why a building was or was not adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalDecision {
    /// Issue the computed energy.
    Adjust,
    /// Predicted temperature is already close to the target.
    WithinBand,
    /// The change would push the temperature the wrong way.
    WrongDirection,
    /// The change is too small to pay for.
    NegligibleChange,
}

/// Per-building computation, exposed for inspection and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalPlan {
    /// Next-turn indoor temperature with the current energy.
    pub predicted_temperature: f64,
    /// Outdoor temperature used in the energy formula, after exaggeration.
    pub effective_outdoor: f64,
    /// Energy that would be requested.
    pub energy: f64,
    /// Outcome.
    pub decision: ThermalDecision,
}

/// Outdoor trend from the last three readings (oldest first).
///
/// Returns the averaged delta times `gain` when both deltas share a sign,
/// `None` otherwise or when fewer than three readings exist.
#[must_use]
pub fn outdoor_trend(recent: &[f64], gain: f64) -> Option<f64> {
    let [.., older, previous, current] = recent else {
        return None;
    };
    let first = previous - older;
    let second = current - previous;
    let same_sign = (first > 0.0 && second > 0.0) || (first < 0.0 && second < 0.0);
    same_sign.then(|| (first + second) / 2.0 * gain)
}

/// `lower < value < upper`.
fn strictly_between(value: f64, lower: f64, upper: f64) -> bool {
    lower < value && value < upper
}

/// Keeps every completed residence inside the comfort band.
#[derive(Debug, Clone, Default)]
pub struct ThermalRegulation {
    config: ThermalConfig,
}

impl ThermalRegulation {
    /// Build with explicit tuning.
    #[must_use]
    pub fn new(config: ThermalConfig) -> Self {
        Self { config }
    }

    /// Tuning in use.
    #[must_use]
    pub fn config(&self) -> &ThermalConfig {
        &self.config
    }

    /// Next-turn indoor temperature for a given energy input.
    #[must_use]
    pub fn predict_temperature(
        &self,
        residence: &ResidenceState,
        blueprint: &ResidenceBlueprint,
        energy_in: f64,
        outdoor: f64,
    ) -> f64 {
        let c = &self.config;
        residence.temperature + (energy_in - blueprint.base_energy_need) * c.degrees_per_excess_mwh
            + c.degrees_per_pop * f64::from(residence.current_pop)
            - (residence.temperature - outdoor) * blueprint.emissivity
    }

    /// Work out what, if anything, to request for one residence.
    ///
    /// `outdoor` is the (possibly trend-adjusted) outdoor temperature and
    /// `trend` the predicted trend, if any.
    #[must_use]
    pub fn plan(
        &self,
        structure: &Structure,
        residence: &ResidenceState,
        blueprint: &ResidenceBlueprint,
        outdoor: f64,
        trend: Option<f64>,
    ) -> ThermalPlan {
        let c = &self.config;
        let predicted =
            self.predict_temperature(residence, blueprint, structure.effective_energy_in, outdoor);

        let mut plan = ThermalPlan {
            predicted_temperature: predicted,
            effective_outdoor: outdoor,
            energy: residence.requested_energy_in,
            decision: ThermalDecision::WithinBand,
        };
        if strictly_between(
            predicted,
            c.target_temperature - c.temperature_margin,
            c.target_temperature + c.temperature_margin,
        ) {
            return plan;
        }

        // Outside the safety band: pretend the weather is harsher to recover faster.
        let push = (c.target_temperature - residence.temperature).abs();
        let mut effective = outdoor;
        if predicted < c.min_temperature {
            effective -= push;
        }
        if residence.temperature < c.min_temperature {
            effective -= push;
        }
        if predicted > c.max_temperature {
            effective += push;
        }
        if residence.temperature > c.max_temperature {
            effective += push;
        }
        plan.effective_outdoor = effective;

        let mut energy = blueprint.base_energy_need
            + (residence.temperature - effective) * blueprint.emissivity
            + c.energy_offset
            - f64::from(residence.current_pop) * c.degrees_per_pop;
        match trend {
            Some(t) if t > 0.0 => energy *= c.warming_scale,
            Some(t) if t < 0.0 => energy *= c.cooling_scale,
            _ => {}
        }
        if energy < blueprint.base_energy_need {
            warn!(
                position = %structure.position,
                wanted = energy,
                base = blueprint.base_energy_need,
                "Energy below base need, restoring to base"
            );
            energy = blueprint.base_energy_need;
        }
        plan.energy = energy;

        let requested = residence.requested_energy_in;
        let colder = predicted < c.target_temperature && energy < requested;
        let hotter = predicted > c.target_temperature && energy > requested;
        plan.decision = if colder || hotter {
            ThermalDecision::WrongDirection
        } else if strictly_between(energy, requested - c.energy_margin, requested + c.energy_margin)
        {
            ThermalDecision::NegligibleChange
        } else {
            ThermalDecision::Adjust
        };
        plan
    }
}

impl Policy for ThermalRegulation {
    fn name(&self) -> &str {
        "thermal_regulation"
    }

    fn try_execute(&self, snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<bool> {
        let trend = outdoor_trend(&snapshot.recent_temperatures(3), self.config.trend_gain);
        let outdoor = match trend {
            Some(t) => {
                let predicted = snapshot.current_temp + t;
                debug!(predicted, current = snapshot.current_temp, "Using outdoor prediction");
                predicted
            }
            None => snapshot.current_temp,
        };

        let mut residences: Vec<_> = snapshot.completed_residences().collect();
        residences.sort_by(|(_, a), (_, b)| a.temperature.total_cmp(&b.temperature));

        for (structure, residence) in residences {
            let Some(blueprint) = snapshot.residence_blueprint(&structure.name) else {
                debug!(building = %structure.name, "No blueprint for residence");
                continue;
            };
            let plan = self.plan(structure, residence, blueprint, outdoor, trend);
            debug!(
                position = %structure.position,
                current = residence.temperature,
                predicted = plan.predicted_temperature,
                energy = plan.energy,
                requested = residence.requested_energy_in,
                decision = ?plan.decision,
                "Thermal plan"
            );
            if plan.decision != ThermalDecision::Adjust {
                continue;
            }

            if !snapshot.can_afford(self.config.adjust_cost) {
                warn!(
                    position = %structure.position,
                    energy = plan.energy,
                    funds = snapshot.funds,
                    "Insufficient funds to adjust energy"
                );
                return Ok(false);
            }

            ctx.issue(
                self.name(),
                Action::AdjustEnergy {
                    position: structure.position,
                    value: plan.energy,
                },
            )?;
            return Ok(true);
        }
        Ok(false)
    }
}

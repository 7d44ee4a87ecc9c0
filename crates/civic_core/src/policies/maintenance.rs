//! Repairing damaged residences.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::gateway::Action;
use crate::policy::{Policy, TurnContext};
use crate::snapshot::{Snapshot, Structure};

/// Settings for [`Maintenance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Residences below this health need repair.
    pub threshold_health: f64,
    /// Only ever repair the weakest; save money if it is unaffordable.
    /// Otherwise the cheapest affordable repair is made, weakest first on ties.
    pub prioritize_weakest: bool,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            threshold_health: 45.0,
            prioritize_weakest: false,
        }
    }
}

/// Keeps residence health above a threshold.
#[derive(Debug, Clone, Default)]
pub struct Maintenance {
    config: MaintenanceConfig,
}

impl Maintenance {
    /// Build with explicit settings.
    #[must_use]
    pub fn new(config: MaintenanceConfig) -> Self {
        Self { config }
    }

    /// Damaged residences with their maintenance cost, weakest first.
    #[must_use]
    pub fn damaged<'s>(&self, snapshot: &'s Snapshot) -> Vec<(&'s Structure, f64)> {
        let mut damaged: Vec<_> = snapshot
            .residences()
            .filter(|(s, _)| s.health < self.config.threshold_health)
            .filter_map(|(s, _)| {
                snapshot
                    .residence_blueprint(&s.name)
                    .map(|b| (s, b.maintenance_cost))
            })
            .collect();
        damaged.sort_by(|(a, _), (b, _)| a.health.total_cmp(&b.health));
        damaged
    }
}

impl Policy for Maintenance {
    fn name(&self) -> &str {
        "maintenance"
    }

    fn try_execute(&self, snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<bool> {
        let damaged = self.damaged(snapshot);
        let Some(&(weakest, weakest_cost)) = damaged.first() else {
            return Ok(false);
        };

        let target = if self.config.prioritize_weakest {
            if !snapshot.can_afford(weakest_cost) {
                debug!(
                    position = %weakest.position,
                    health = weakest.health,
                    cost = weakest_cost,
                    "Saving up to repair weakest building"
                );
                return Ok(false);
            }
            weakest
        } else {
            let cheapest = damaged
                .iter()
                .filter(|(_, cost)| snapshot.can_afford(*cost))
                .min_by(|(_, a), (_, b)| a.total_cmp(b));
            match cheapest {
                Some(&(structure, _)) => structure,
                None => {
                    debug!(damaged = damaged.len(), funds = snapshot.funds, "Cannot afford any repair");
                    return Ok(false);
                }
            }
        };

        ctx.issue(
            self.name(),
            Action::Maintain {
                position: target.position,
            },
        )?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::Gateway;
    use crate::snapshot::{Position, ResidenceBlueprint, ResidenceState, StructureKind};
    use rand::rngs::mock::StepRng;

    #[derive(Default)]
    struct Sink(Vec<Action>);

    impl Gateway for Sink {
        fn get_state(&mut self) -> std::result::Result<Snapshot, GatewayError> {
            Ok(Snapshot::default())
        }

        fn execute(&mut self, action: Action) -> std::result::Result<Snapshot, GatewayError> {
            self.0.push(action);
            Ok(Snapshot::default())
        }
    }

    fn blueprint(name: &str, maintenance_cost: f64) -> ResidenceBlueprint {
        ResidenceBlueprint {
            name: name.into(),
            cost: 1000.0,
            co2_cost: 0.0,
            base_energy_need: 1.8,
            build_speed: 20,
            release_tick: 0,
            max_pop: 8,
            income_per_pop: 10.0,
            emissivity: 0.45,
            maintenance_cost,
            decay_rate: 0.1,
            max_happiness: 0.5,
        }
    }

    fn house(name: &str, x: i32, health: f64) -> Structure {
        Structure {
            name: name.into(),
            position: Position::new(x, 0),
            build_progress: 100,
            health,
            effective_energy_in: 1.8,
            effects: Vec::new(),
            kind: StructureKind::Residence(ResidenceState {
                current_pop: 4,
                temperature: 21.0,
                requested_energy_in: 1.8,
                happiness_per_tick_per_pop: 0.0,
            }),
        }
    }

    fn snapshot(funds: f64) -> Snapshot {
        Snapshot {
            funds,
            structures: vec![house("Villa", 0, 20.0), house("Cabin", 1, 40.0), house("Cabin", 2, 90.0)],
            residence_blueprints: vec![blueprint("Cabin", 100.0), blueprint("Villa", 800.0)],
            ..Default::default()
        }
    }

    fn run(policy: &Maintenance, snap: &Snapshot) -> Vec<Action> {
        let mut gateway = Sink::default();
        let mut rng = StepRng::new(0, 1);
        {
            let mut ctx = TurnContext::new(&mut gateway, &mut rng);
            policy.try_execute(snap, &mut ctx).unwrap();
        }
        gateway.0
    }

    #[test]
    fn test_damaged_sorted_weakest_first() {
        let policy = Maintenance::default();
        let snap = snapshot(1000.0);
        let damaged: Vec<_> = policy.damaged(&snap).iter().map(|(s, _)| s.position.x).collect();
        assert_eq!(damaged, vec![0, 1]);
    }

    #[test]
    fn test_repairs_cheapest_affordable() {
        let actions = run(&Maintenance::default(), &snapshot(1000.0));
        assert_eq!(actions, vec![Action::Maintain { position: Position::new(1, 0) }]);
    }

    #[test]
    fn test_cost_ties_go_to_weakest() {
        let mut snap = snapshot(1000.0);
        snap.structures[0].name = "Cabin".into();
        let actions = run(&Maintenance::default(), &snap);
        assert_eq!(actions, vec![Action::Maintain { position: Position::new(0, 0) }]);
    }

    #[test]
    fn test_prioritize_weakest_repairs_weakest() {
        let policy = Maintenance::new(MaintenanceConfig {
            prioritize_weakest: true,
            ..MaintenanceConfig::default()
        });
        let actions = run(&policy, &snapshot(1000.0));
        assert_eq!(actions, vec![Action::Maintain { position: Position::new(0, 0) }]);
    }

    #[test]
    fn test_prioritize_weakest_saves_money() {
        let policy = Maintenance::new(MaintenanceConfig {
            prioritize_weakest: true,
            ..MaintenanceConfig::default()
        });
        assert!(run(&policy, &snapshot(500.0)).is_empty());
    }

    #[test]
    fn test_no_damage_no_action() {
        let mut snap = snapshot(1000.0);
        for s in &mut snap.structures {
            s.health = 100.0;
        }
        assert!(run(&Maintenance::default(), &snap).is_empty());
    }
}

//! Buying upgrades for completed residences.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::gateway::Action;
use crate::policy::{Policy, TurnContext};
use crate::snapshot::{Snapshot, Upgrade};

/// Settings for [`UpgradePurchase`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Only these upgrades may be bought; `None` allows all.
    pub included: Option<Vec<String>>,
}

/// Buys a random affordable upgrade for a residence that lacks it.
#[derive(Debug, Clone, Default)]
pub struct UpgradePurchase {
    config: UpgradeConfig,
}

impl UpgradePurchase {
    /// Build with explicit settings.
    #[must_use]
    pub fn new(config: UpgradeConfig) -> Self {
        Self { config }
    }

    fn is_allowed(&self, upgrade: &Upgrade) -> bool {
        self.config
            .included
            .as_ref()
            .map_or(true, |names| names.iter().any(|n| *n == upgrade.name))
    }
}

impl Policy for UpgradePurchase {
    fn name(&self) -> &str {
        "upgrade_purchase"
    }

    fn try_execute(&self, snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<bool> {
        let candidates: Vec<_> = snapshot
            .upgrades
            .iter()
            .filter(|u| self.is_allowed(u))
            .filter(|u| snapshot.can_afford(u.cost))
            .collect();
        let Some(upgrade) = candidates.choose(ctx.rng()).copied() else {
            debug!(available = snapshot.upgrades.len(), "No allowed upgrade is affordable");
            return Ok(false);
        };

        let eligible: Vec<_> = snapshot
            .completed_residences()
            .map(|(s, _)| s)
            .filter(|s| !s.has_effect(&upgrade.effect))
            .collect();
        let Some(target) = eligible.choose(ctx.rng()).copied() else {
            debug!(upgrade = %upgrade.name, "No residence without this upgrade");
            return Ok(false);
        };

        ctx.issue(
            self.name(),
            Action::PurchaseUpgrade {
                position: target.position,
                upgrade: upgrade.name.clone(),
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
    use crate::snapshot::{Position, ResidenceState, Structure, StructureKind};
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

    fn house(x: i32, progress: u32, effects: &[&str]) -> Structure {
        Structure {
            name: "Cabin".into(),
            position: Position::new(x, 0),
            build_progress: progress,
            health: 100.0,
            effective_energy_in: 1.8,
            effects: effects.iter().map(|e| (*e).to_string()).collect(),
            kind: StructureKind::Residence(ResidenceState {
                current_pop: 4,
                temperature: 21.0,
                requested_energy_in: 1.8,
                happiness_per_tick_per_pop: 0.0,
            }),
        }
    }

    fn upgrade(name: &str, cost: f64) -> Upgrade {
        Upgrade {
            name: name.into(),
            effect: name.into(),
            cost,
        }
    }

    fn snapshot(funds: f64, structures: Vec<Structure>) -> Snapshot {
        Snapshot {
            funds,
            structures,
            upgrades: vec![upgrade("Insulation", 500.0), upgrade("SolarPanel", 6800.0)],
            ..Default::default()
        }
    }

    fn run(policy: &UpgradePurchase, snap: &Snapshot) -> Vec<Action> {
        let mut gateway = Sink::default();
        let mut rng = StepRng::new(0, 1);
        {
            let mut ctx = TurnContext::new(&mut gateway, &mut rng);
            policy.try_execute(snap, &mut ctx).unwrap();
        }
        gateway.0
    }

    #[test]
    fn test_buys_affordable_upgrade_for_bare_residence() {
        let snap = snapshot(1000.0, vec![house(0, 100, &["Insulation"]), house(1, 100, &[])]);
        let actions = run(&UpgradePurchase::default(), &snap);
        assert_eq!(
            actions,
            vec![Action::PurchaseUpgrade {
                position: Position::new(1, 0),
                upgrade: "Insulation".into()
            }]
        );
    }

    #[test]
    fn test_unfinished_residences_are_not_eligible() {
        let snap = snapshot(1000.0, vec![house(0, 60, &[])]);
        assert!(run(&UpgradePurchase::default(), &snap).is_empty());
    }

    #[test]
    fn test_allow_list_filters() {
        let policy = UpgradePurchase::new(UpgradeConfig {
            included: Some(vec!["SolarPanel".into()]),
        });
        let snap = snapshot(1000.0, vec![house(0, 100, &[])]);
        assert!(run(&policy, &snap).is_empty());
    }

    #[test]
    fn test_everyone_upgraded() {
        let snap = snapshot(1000.0, vec![house(0, 100, &["Insulation"])]);
        assert!(run(&UpgradePurchase::default(), &snap).is_empty());
    }
}

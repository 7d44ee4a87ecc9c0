//! End-to-end decision scenarios against recorded gateways.

use std::sync::{Arc, Mutex};

use civic_core::policies::{
    Maintenance, ThermalDecision, ThermalRegulation, ThresholdConstruction, UpgradePurchase,
};
use civic_core::prelude::*;
use civic_core::snapshot::TerrainGrid;
use civic_test_utils::fixtures::{self, SnapshotBuilder};
use civic_test_utils::RecordingGateway;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(7)
}

#[test]
fn threshold_builds_on_the_only_free_cell() {
    let mut blueprint = fixtures::cabin();
    blueprint.cost = 800.0;
    blueprint.max_pop = 10;

    // 2x1 map: the residence and a single free cell.
    let snapshot = SnapshotBuilder::new()
        .turn(40)
        .funds(1000.0)
        .open_map(2, 1)
        .residence_blueprints(vec![blueprint.clone()])
        .structure(fixtures::residence(&blueprint, Position::new(0, 0), 100, 9))
        .build();
    assert!((snapshot.population().ratio() - 0.9).abs() < 1e-9);

    let mut gateway = RecordingGateway::new(snapshot.clone());
    let mut rng = rng();
    let acted = {
        let mut ctx = TurnContext::new(&mut gateway, &mut rng);
        ThresholdConstruction::default()
            .try_execute(&snapshot, &mut ctx)
            .unwrap()
    };

    assert!(acted);
    assert_eq!(
        gateway.actions(),
        &[Action::StartBuild {
            position: Position::new(1, 0),
            building: "Cabin".into(),
        }]
    );
}

#[test]
fn cold_residence_with_falling_outdoor_gets_more_energy() {
    let snapshot = SnapshotBuilder::new()
        .turn(12)
        .outdoor_history(&[12.0, 10.0, 7.0])
        .cabin(4, 4, 4)
        .with_last(|s| {
            if let StructureKind::Residence(state) = &mut s.kind {
                state.temperature = 15.0;
            }
        })
        .build();
    let cabin = fixtures::cabin();
    let policy = ThermalRegulation::default();

    let trend = civic_core::policies::outdoor_trend(&snapshot.recent_temperatures(3), 2.0);
    assert_eq!(trend, Some(-5.0));
    let predicted_outdoor = 7.0 - 5.0;

    let structure = &snapshot.structures[0];
    let state = structure.residence().unwrap();
    let plan = policy.plan(structure, state, &cabin, predicted_outdoor, trend);
    assert_eq!(plan.decision, ThermalDecision::Adjust);
    assert!(plan.effective_outdoor < 7.0);

    let unscaled = cabin.base_energy_need + (15.0 - plan.effective_outdoor) * cabin.emissivity + 0.5
        - 4.0 * 0.04;
    let expected = unscaled * 1.1;
    assert!((plan.energy - expected).abs() < 1e-9);
    assert!(plan.energy > cabin.base_energy_need);

    let mut gateway = RecordingGateway::new(snapshot.clone());
    let mut rng = rng();
    {
        let mut ctx = TurnContext::new(&mut gateway, &mut rng);
        assert!(policy.try_execute(&snapshot, &mut ctx).unwrap());
    }
    match gateway.actions() {
        [Action::AdjustEnergy { position, value }] => {
            assert_eq!(*position, Position::new(4, 4));
            assert!((value - expected).abs() < 1e-9);
        }
        other => panic!("unexpected actions {other:?}"),
    }
}

#[test]
fn thermal_targets_coldest_building_first() {
    let snapshot = SnapshotBuilder::new()
        .turn(5)
        .outdoor_history(&[0.0])
        .cabin(1, 1, 0)
        .with_last(|s| {
            if let StructureKind::Residence(state) = &mut s.kind {
                state.temperature = 16.0;
            }
        })
        .cabin(3, 3, 0)
        .with_last(|s| {
            if let StructureKind::Residence(state) = &mut s.kind {
                state.temperature = 12.0;
            }
        })
        .build();

    let mut gateway = RecordingGateway::new(snapshot.clone());
    let mut rng = rng();
    {
        let mut ctx = TurnContext::new(&mut gateway, &mut rng);
        ThermalRegulation::default()
            .try_execute(&snapshot, &mut ctx)
            .unwrap();
    }
    assert_eq!(gateway.actions().len(), 1);
    assert_eq!(gateway.actions()[0].position(), Some(Position::new(3, 3)));
}

#[test]
fn thermal_gives_up_when_adjustment_is_unaffordable() {
    let snapshot = SnapshotBuilder::new()
        .funds(100.0)
        .cabin(1, 1, 0)
        .with_last(|s| {
            if let StructureKind::Residence(state) = &mut s.kind {
                state.temperature = 10.0;
            }
        })
        .build();
    let mut gateway = RecordingGateway::new(snapshot.clone());
    let mut rng = rng();
    let acted = {
        let mut ctx = TurnContext::new(&mut gateway, &mut rng);
        ThermalRegulation::default()
            .try_execute(&snapshot, &mut ctx)
            .unwrap()
    };
    assert!(!acted);
    assert!(gateway.actions().is_empty());
}

#[test]
fn maintenance_without_damage_falls_through() {
    let snapshot = SnapshotBuilder::new()
        .cabin(1, 1, 4)
        .upgrades(vec![fixtures::upgrades().remove(2)])
        .build();
    let hooks = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&hooks);
    let chain = PolicyChain::new()
        .append(UpgradePurchase::default())
        .append_entry(
            ChainEntry::new(Maintenance::default())
                .on_complete(move |_, c| recorded.lock().unwrap().push(c)),
        );

    let mut gateway = RecordingGateway::new(snapshot.clone());
    let mut rng = rng();
    let outcome = {
        let mut ctx = TurnContext::new(&mut gateway, &mut rng);
        chain.evaluate(&snapshot, &mut ctx).unwrap()
    };

    assert_eq!(outcome.policy.as_deref(), Some("upgrade_purchase"));
    assert!(matches!(&gateway.actions()[0], Action::PurchaseUpgrade { upgrade, .. } if upgrade == "Charger"));
    assert_eq!(
        hooks.lock().unwrap().as_slice(),
        &[Completion {
            local: false,
            chain: true
        }]
    );
}

#[derive(Debug)]
struct AlwaysFails;

impl Policy for AlwaysFails {
    fn name(&self) -> &str {
        "always_fails"
    }

    fn try_execute(&self, _snapshot: &Snapshot, _ctx: &mut TurnContext<'_>) -> Result<bool> {
        Ok(false)
    }
}

#[test]
fn failing_chain_waits_and_turn_advances() {
    let snapshot = SnapshotBuilder::new().turn(3).build();
    let chain = PolicyChain::new().append(AlwaysFails);
    let mut gateway = RecordingGateway::new(snapshot.clone());
    let mut rng = rng();

    let outcome = {
        let mut ctx = TurnContext::new(&mut gateway, &mut rng);
        chain.evaluate(&snapshot, &mut ctx).unwrap()
    };

    assert!(!outcome.executed());
    assert_eq!(outcome.action, Action::Wait);
    assert_eq!(gateway.actions(), &[Action::Wait]);
    assert_eq!(gateway.state().turn, 4);
}

#[test]
fn standard_chain_starts_a_building_on_an_empty_map() {
    let snapshot = SnapshotBuilder::new().map(TerrainGrid::open(6, 6)).build();
    let chain = standard_chain();
    let mut gateway = RecordingGateway::new(snapshot.clone());
    let mut rng = rng();

    let outcome = {
        let mut ctx = TurnContext::new(&mut gateway, &mut rng);
        chain.evaluate(&snapshot, &mut ctx).unwrap()
    };

    assert_eq!(outcome.policy.as_deref(), Some("singleton_construction"));
    assert!(matches!(outcome.action, Action::StartBuild { .. }));
}

#[test]
fn gateway_failure_stops_the_turn() {
    let snapshot = SnapshotBuilder::new().build();
    let chain = standard_chain();
    let mut gateway = RecordingGateway::new(snapshot.clone()).failing_on(0);
    let mut rng = rng();

    let err = {
        let mut ctx = TurnContext::new(&mut gateway, &mut rng);
        chain.evaluate(&snapshot, &mut ctx).unwrap_err()
    };
    assert!(err.is_retryable());
    assert!(gateway.actions().is_empty());
}

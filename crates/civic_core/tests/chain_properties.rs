//! Property tests for chain ordering and thermal safety.

use std::sync::{Arc, Mutex};

use civic_core::policies::ThermalRegulation;
use civic_core::prelude::*;
use civic_test_utils::fixtures::SnapshotBuilder;
use civic_test_utils::props;
use civic_test_utils::RecordingGateway;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Succeeds or not as scripted, recording its index when invoked.
#[derive(Debug)]
struct Scripted {
    index: usize,
    succeeds: bool,
    calls: Arc<Mutex<Vec<usize>>>,
}

impl Policy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn try_execute(&self, _snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<bool> {
        self.calls.lock().unwrap().push(self.index);
        if self.succeeds {
            ctx.issue(self.name(), Action::Maintain { position: Position::new(0, 0) })?;
        }
        Ok(self.succeeds)
    }
}

fn scripted_chain(script: &[bool], guards: &[bool], calls: &Arc<Mutex<Vec<usize>>>) -> PolicyChain {
    let mut chain = PolicyChain::new();
    for (index, (&succeeds, &open)) in script.iter().zip(guards).enumerate() {
        let entry = ChainEntry::new(Scripted {
            index,
            succeeds,
            calls: Arc::clone(calls),
        })
        .with_guard(move |_| open);
        chain.push(entry);
    }
    chain
}

proptest! {
    #[test]
    fn chain_runs_in_reverse_append_order(
        script in prop::collection::vec(any::<bool>(), 0..12),
    ) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let guards = vec![true; script.len()];
        let chain = scripted_chain(&script, &guards, &calls);
        let snapshot = SnapshotBuilder::bare().build();
        let mut gateway = RecordingGateway::new(snapshot.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = {
            let mut ctx = TurnContext::new(&mut gateway, &mut rng);
            chain.evaluate(&snapshot, &mut ctx).unwrap()
        };

        let first_success = (0..script.len()).rev().find(|&i| script[i]);
        let expected: Vec<usize> = match first_success {
            Some(k) => (k..script.len()).rev().collect(),
            None => (0..script.len()).rev().collect(),
        };
        prop_assert_eq!(calls.lock().unwrap().clone(), expected);
        prop_assert_eq!(gateway.actions().len(), 1);
        prop_assert_eq!(outcome.executed(), first_success.is_some());
        if first_success.is_none() {
            prop_assert_eq!(&gateway.actions()[0], &Action::Wait);
        }
    }

    #[test]
    fn closed_guard_never_runs_policy(
        entries in prop::collection::vec((any::<bool>(), any::<bool>()), 1..12),
    ) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let script: Vec<bool> = entries.iter().map(|(s, _)| *s).collect();
        let guards: Vec<bool> = entries.iter().map(|(_, g)| *g).collect();
        let chain = scripted_chain(&script, &guards, &calls);
        let snapshot = SnapshotBuilder::bare().build();
        let mut gateway = RecordingGateway::new(snapshot.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        {
            let mut ctx = TurnContext::new(&mut gateway, &mut rng);
            chain.evaluate(&snapshot, &mut ctx).unwrap();
        }

        let effective: Vec<bool> = script.iter().zip(&guards).map(|(s, g)| *s && *g).collect();
        let first_success = (0..effective.len()).rev().find(|&i| effective[i]);
        let lowest = first_success.unwrap_or(0);
        let expected: Vec<usize> = (lowest..script.len()).rev().filter(|&i| guards[i]).collect();
        prop_assert_eq!(calls.lock().unwrap().clone(), expected);
        prop_assert_eq!(gateway.actions().len(), 1);
    }

    #[test]
    fn thermal_never_requests_below_base(
        (blueprint, residences) in props::residence_blueprint().prop_flat_map(|bp| {
            let residences = prop::collection::vec(props::completed_residence(&bp), 1..4);
            (Just(bp), residences)
        }),
        history in props::outdoor_history(),
        seed in any::<u64>(),
    ) {
        let structures = residences.into_iter().zip(0..).map(|(mut s, x)| {
            s.position = Position::new(x, 0);
            s
        });

        let mut builder = SnapshotBuilder::new()
            .turn(u32::try_from(history.len()).unwrap())
            .outdoor_history(&history)
            .residence_blueprints(vec![blueprint.clone()]);
        for s in structures {
            builder = builder.structure(s);
        }
        let snapshot = builder.build();

        let mut gateway = RecordingGateway::new(snapshot.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        {
            let mut ctx = TurnContext::new(&mut gateway, &mut rng);
            ThermalRegulation::default().try_execute(&snapshot, &mut ctx).unwrap();
        }

        prop_assert!(gateway.actions().len() <= 1);
        for action in gateway.actions() {
            if let Action::AdjustEnergy { value, .. } = action {
                prop_assert!(*value >= blueprint.base_energy_need);
            }
        }
    }
}

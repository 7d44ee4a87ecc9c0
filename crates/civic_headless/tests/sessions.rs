//! Whole-session tests against the sandbox and a recording gateway.

use std::path::PathBuf;

use civic_core::gateway::Gateway;
use civic_core::policies::standard_chain;
use civic_headless::runner::{RunError, TurnRunner};
use civic_headless::sandbox::SandboxGame;
use civic_headless::scenario::Scenario;
use civic_headless::strategies::Strategy;
use civic_test_utils::fixtures::SnapshotBuilder;
use civic_test_utils::RecordingGateway;

fn asset(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(path)
}

#[test]
fn default_strategy_builds_a_town() {
    let scenario = Scenario {
        max_turns: 120,
        ..Scenario::default()
    };
    let mut runner = TurnRunner::new(SandboxGame::new(scenario, 11), standard_chain(), 11);
    let report = runner.run().unwrap();

    assert_eq!(report.turns, 120);
    assert!(report.completed_buildings >= 1);
    assert!(report.actions["start_build"] >= 1);
    assert!(report.actions["continue_build"] >= 1);
    assert_eq!(report.map, "riverside");
}

#[test]
fn shipped_strategy_plays_shipped_scenario() {
    let scenario = Scenario::load(asset("scenarios/cold_snap.ron")).unwrap();
    let strategy = Strategy::load(asset("strategies/cabins.ron")).unwrap();
    let scenario = Scenario {
        max_turns: 80,
        ..scenario
    };

    let mut runner = TurnRunner::new(SandboxGame::new(scenario, 5), strategy.build_chain(), 5)
        .with_strategy_name(strategy.name.clone());
    let report = runner.run().unwrap();

    assert_eq!(report.strategy, "cabins");
    assert_eq!(report.turns, 80);
    let log = runner.into_gateway().get_state().unwrap().action_log;
    assert!(log.iter().any(|r| r.action.kind() == "start_build"));
}

#[test]
fn idle_growth_strategy_runs_to_the_end() {
    let strategy = Strategy::load(asset("strategies/idle_growth.ron")).unwrap();
    let scenario = Scenario {
        max_turns: 60,
        ..Scenario::default()
    };
    let mut runner = TurnRunner::new(SandboxGame::new(scenario, 2), strategy.build_chain(), 2);
    let report = runner.run().unwrap();
    assert_eq!(report.turns, 60);
}

#[test]
fn recording_gateway_sees_one_action_per_turn() {
    let snapshot = SnapshotBuilder::new().max_turns(6).build();
    let mut runner = TurnRunner::new(RecordingGateway::new(snapshot), standard_chain(), 1);
    let report = runner.run().unwrap();

    assert_eq!(report.turns, 6);
    assert_eq!(runner.gateway().actions().len(), report.turns as usize);
}

#[test]
fn gateway_failure_stops_the_session_with_its_turn() {
    let snapshot = SnapshotBuilder::new().build();
    let gateway = RecordingGateway::new(snapshot).failing_on(2);
    let mut runner = TurnRunner::new(gateway, standard_chain(), 1);

    match runner.run() {
        Err(err @ RunError::Turn { .. }) => assert!(err.is_retryable()),
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(runner.gateway().actions().len(), 2);
    assert_eq!(runner.gateway().state().turn, 2);
}

#[test]
fn same_seed_same_actions() {
    let play = |seed| {
        let scenario = Scenario {
            max_turns: 50,
            ..Scenario::default()
        };
        let mut runner = TurnRunner::new(SandboxGame::new(scenario, seed), standard_chain(), seed);
        runner.run().unwrap();
        runner.into_gateway().get_state().unwrap().action_log
    };
    assert_eq!(play(4), play(4));
}

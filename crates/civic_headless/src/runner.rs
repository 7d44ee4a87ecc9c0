//! Session driver: one chain evaluation per turn until the game ends.

use std::collections::BTreeMap;

use civic_core::chain::{PolicyChain, TurnOutcome};
use civic_core::error::{EngineError, GatewayError};
use civic_core::gateway::Gateway;
use civic_core::policy::TurnContext;
use civic_core::snapshot::Snapshot;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::protocol::ScoreDto;

/// Turns between progress lines at info level.
const PROGRESS_LOG_INTERVAL: u32 = 50;

/// A session that stopped early.
#[derive(Debug, Error)]
pub enum RunError {
    /// A turn failed while the chain was acting.
    #[error("Turn {turn} failed: {source}")]
    Turn {
        /// Turn on which the failure happened.
        turn: u32,
        /// Underlying engine error.
        #[source]
        source: EngineError,
    },
    /// The state could not be read between turns.
    #[error("Failed to read game state: {0}")]
    State(#[from] GatewayError),
}

impl RunError {
    /// Whether the failure is worth retrying by the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            RunError::Turn { source, .. } => source.is_retryable(),
            RunError::State(err) => err.is_retryable(),
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Host session id.
    pub game_id: String,
    /// Map or scenario name.
    pub map: String,
    /// Strategy name.
    pub strategy: String,
    /// RNG seed.
    pub seed: u64,
    /// Turns played.
    pub turns: u32,
    /// Money at the end.
    pub funds: f64,
    /// Residents at the end.
    pub population: u32,
    /// Capacity of completed residences.
    pub capacity: u32,
    /// Completed buildings of any kind.
    pub completed_buildings: usize,
    /// Effect tags on completed buildings.
    pub applied_effects: usize,
    /// Turns on which no policy acted.
    pub idle_turns: u32,
    /// Issued actions by kind.
    pub actions: BTreeMap<String, u32>,
    /// Host or sandbox score, when available.
    pub score: Option<ScoreDto>,
}

impl SessionReport {
    /// Final figures from the last snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let population = snapshot.population();
        let mut actions = BTreeMap::new();
        for record in &snapshot.action_log {
            *actions.entry(record.action.kind().to_string()).or_insert(0) += 1;
        }
        Self {
            game_id: snapshot.game_id.clone(),
            map: snapshot.map_name.clone(),
            turns: snapshot.turn,
            funds: snapshot.funds,
            population: population.current,
            capacity: population.capacity,
            completed_buildings: snapshot.completed().count(),
            applied_effects: snapshot.applied_effects(),
            actions,
            ..Self::default()
        }
    }
}

/// Drives a [`PolicyChain`] against a [`Gateway`] until the game is over.
#[derive(Debug)]
pub struct TurnRunner<G: Gateway> {
    gateway: G,
    chain: PolicyChain,
    rng: ChaCha8Rng,
    seed: u64,
    strategy: String,
    idle_turns: u32,
}

impl<G: Gateway> TurnRunner<G> {
    /// Create a runner with a seeded RNG.
    pub fn new(gateway: G, chain: PolicyChain, seed: u64) -> Self {
        Self {
            gateway,
            chain,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            strategy: "custom".to_string(),
            idle_turns: 0,
        }
    }

    /// Name reported in the session report.
    #[must_use]
    pub fn with_strategy_name(mut self, name: impl Into<String>) -> Self {
        self.strategy = name.into();
        self
    }

    /// The gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Give the gateway back.
    pub fn into_gateway(self) -> G {
        self.gateway
    }

    /// Evaluate the chain once and log what the host said about it.
    pub fn play_turn(&mut self) -> Result<TurnOutcome, RunError> {
        let snapshot = self.gateway.get_state()?;
        let turn = snapshot.turn;
        let outcome = {
            let mut ctx = TurnContext::new(&mut self.gateway, &mut self.rng);
            self.chain
                .evaluate(&snapshot, &mut ctx)
                .map_err(|source| RunError::Turn { turn, source })?
        };
        if !outcome.executed() {
            self.idle_turns += 1;
        }
        debug!(turn, policy = ?outcome.policy, action = %outcome.action, "Turn complete");

        let after = self.gateway.get_state()?;
        for message in &after.messages {
            info!(turn, "{message}");
        }
        for error in &after.errors {
            warn!(turn, "Host error: {error}");
        }
        Ok(outcome)
    }

    /// Play until the turn limit and summarise.
    pub fn run(&mut self) -> Result<SessionReport, RunError> {
        let start = self.gateway.get_state()?;
        info!(
            game_id = %start.game_id,
            map = %start.map_name,
            seed = self.seed,
            max_turns = start.max_turns,
            strategy = %self.strategy,
            "Starting session"
        );
        info!("Policy chain:\n{}", self.chain);

        let mut turn = start.turn;
        let mut over = start.is_over();
        while !over {
            self.play_turn()?;
            let snapshot = self.gateway.get_state()?;
            if snapshot.turn / PROGRESS_LOG_INTERVAL != turn / PROGRESS_LOG_INTERVAL {
                let population = snapshot.population();
                info!(
                    turn = snapshot.turn,
                    funds = snapshot.funds,
                    population = population.current,
                    capacity = population.capacity,
                    outdoor = snapshot.current_temp,
                    "Progress"
                );
            }
            turn = snapshot.turn;
            over = snapshot.is_over();
        }

        let last = self.gateway.get_state()?;
        let mut report = SessionReport::from_snapshot(&last);
        report.strategy = self.strategy.clone();
        report.seed = self.seed;
        report.idle_turns = self.idle_turns;
        info!(
            game_id = %report.game_id,
            turns = report.turns,
            funds = report.funds,
            population = report.population,
            buildings = report.completed_buildings,
            effects = report.applied_effects,
            "Session complete"
        );
        Ok(report)
    }
}

//! Batch sandbox runner for strategy tuning.
//!
//! Runs many sandbox sessions in parallel using rayon, one per seed, and
//! aggregates their reports.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::runner::{SessionReport, TurnRunner};
use crate::sandbox::SandboxGame;
use crate::scenario::Scenario;
use crate::strategies::Strategy;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario every session plays
    pub scenario: Scenario,
    /// Strategy every session uses
    pub strategy: Strategy,
    /// Number of sessions to run
    pub game_count: u32,
    /// Maximum parallel sessions (0 = use rayon default)
    pub parallel_games: u32,
    /// Seed of the first session; the rest follow consecutively
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::default(),
            strategy: Strategy::default(),
            game_count: 20,
            parallel_games: 0,
            seed_start: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a scenario and strategy
    pub fn new(scenario: Scenario, strategy: Strategy, game_count: u32) -> Self {
        Self {
            scenario,
            strategy,
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set parallelism
    pub fn with_parallelism(mut self, threads: u32) -> Self {
        self.parallel_games = threads;
        self
    }
}

/// Aggregate figures over finished sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Finished sessions
    pub games: usize,
    /// Mean final score
    pub mean_score: f64,
    /// Lowest final score
    pub min_score: f64,
    /// Highest final score
    pub max_score: f64,
    /// Mean final population
    pub mean_population: f64,
    /// Mean final funds
    pub mean_funds: f64,
}

impl BatchSummary {
    /// Summarise session reports
    pub fn from_games(games: &[SessionReport]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let count = games.len() as f64;
        let scores: Vec<f64> = games
            .iter()
            .map(|g| g.score.as_ref().map_or(0.0, |s| s.final_score))
            .collect();
        Self {
            games: games.len(),
            mean_score: scores.iter().sum::<f64>() / count,
            min_score: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max_score: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean_population: games.iter().map(|g| f64::from(g.population)).sum::<f64>() / count,
            mean_funds: games.iter().map(|g| g.funds).sum::<f64>() / count,
        }
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual session reports
    pub games: Vec<SessionReport>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Session index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Play one sandbox session to the end.
pub fn run_single_game(config: &BatchConfig, seed: u64) -> Result<SessionReport, String> {
    let game = SandboxGame::new(config.scenario.clone(), seed);
    let mut runner = TurnRunner::new(game, config.strategy.build_chain(), seed)
        .with_strategy_name(config.strategy.name.clone());
    let mut report = runner.run().map_err(|e| e.to_string())?;
    report.score = Some(runner.gateway().score());
    Ok(report)
}

/// Run a batch of sessions
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        games = config.game_count,
        scenario = %config.scenario.name,
        strategy = %config.strategy.name,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<SessionReport, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match run_single_game(&config, seed) {
                Ok(report) => {
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 10 == 0 {
                        debug!("Progress: {}/{}", done, config.game_count);
                    }
                    Ok(report)
                }
                Err(e) => {
                    warn!(game = i, seed, "Session failed: {e}");
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message: e,
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<SessionReport> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        games = games.len(),
        errors = errors.len(),
        mean_score = summary.mean_score,
        "Batch complete in {:.1}s",
        duration_seconds
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Whether the same seed yields the same report every time.
pub fn verify_determinism(config: &BatchConfig, seed: u64, runs: u32) -> bool {
    let reports: Vec<Result<SessionReport, String>> =
        (0..runs).map(|_| run_single_game(config, seed)).collect();
    match reports.split_first() {
        Some((first, rest)) => rest.iter().all(|r| r == first),
        None => true,
    }
}

//! City-building bot runner.
//!
//! Plays the remote game host, or the in-process sandbox, with a policy
//! chain described by a strategy preset or RON file.
//!
//! # Usage
//!
//! ```bash
//! # Play a new remote game
//! cargo run -p civic_headless -- play --map training1 --api-key $KEY
//!
//! # Resume a remote game
//! cargo run -p civic_headless -- play --game-id 1b2c... --strategy no_turn_zero
//!
//! # One sandbox session, report to stdout
//! cargo run -p civic_headless -- simulate --seed 7 --strategy singleton:Apartments
//!
//! # Sandbox batch
//! cargo run -p civic_headless -- batch --count 200 --parallel 8 --output results/
//!
//! # Show a strategy's chain in priority order
//! cargo run -p civic_headless -- strategy strategies/cabins.ron
//! ```
//!
//! Logs go to stderr; reports go to stdout unless `--output` is given.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use civic_headless::{
    batch::{run_batch, BatchConfig},
    http::{HttpGateway, DEFAULT_BASE_URL},
    runner::{SessionReport, TurnRunner},
    sandbox::SandboxGame,
    scenario::Scenario,
    strategies::Strategy,
};

type CmdResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "civic_headless")]
#[command(about = "Turn-based city-building bot")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Seed for the policy RNG (and sandbox weather)
    #[arg(long, global = true, default_value = "0")]
    seed: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game on the remote host
    Play {
        /// API key for the host
        #[arg(long, env = "CONSIDITION_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Map to create a new game on
        #[arg(short, long, default_value = "training1")]
        map: String,

        /// Resume this game instead of creating one
        #[arg(long)]
        game_id: Option<String>,

        /// Strategy preset or RON file
        #[arg(short, long, default_value = "default")]
        strategy: String,

        /// Host base URL
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Write the session report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Play one sandbox session
    Simulate {
        /// Scenario RON file (built-in scenario when omitted)
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Strategy preset or RON file
        #[arg(short, long, default_value = "default")]
        strategy: String,

        /// Write the session report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Play many sandbox sessions in parallel
    Batch {
        /// Scenario RON file (built-in scenario when omitted)
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Strategy preset or RON file
        #[arg(short, long, default_value = "default")]
        strategy: String,

        /// Number of sessions
        #[arg(short, long, default_value = "20")]
        count: u32,

        /// Maximum parallel sessions (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Print a strategy's policy chain in priority order
    Strategy {
        /// Strategy preset or RON file
        #[arg(default_value = "default")]
        strategy: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; RUST_LOG overrides --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let seed = cli.seed;
    let result = match cli.command {
        Commands::Play {
            api_key,
            map,
            game_id,
            strategy,
            base_url,
            output,
        } => cmd_play(&api_key, &base_url, &map, game_id.as_deref(), &strategy, seed, output.as_deref()),
        Commands::Simulate {
            scenario,
            strategy,
            output,
        } => cmd_simulate(scenario.as_deref(), &strategy, seed, output.as_deref()),
        Commands::Batch {
            scenario,
            strategy,
            count,
            parallel,
            output,
        } => cmd_batch(scenario.as_deref(), &strategy, count, parallel, seed, &output),
        Commands::Strategy { strategy } => cmd_strategy(&strategy),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }
}

fn load_scenario(path: Option<&Path>) -> Result<Scenario, Box<dyn Error>> {
    match path {
        Some(path) => {
            let scenario = Scenario::load(path)?;
            tracing::info!("Loaded scenario: {}", scenario.name);
            Ok(scenario)
        }
        None => Ok(Scenario::default()),
    }
}

fn write_report(report: &SessionReport, output: Option<&Path>) -> CmdResult {
    let json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Play on the remote host
fn cmd_play(
    api_key: &str,
    base_url: &str,
    map: &str,
    game_id: Option<&str>,
    strategy: &str,
    seed: u64,
    output: Option<&Path>,
) -> CmdResult {
    let strategy = Strategy::resolve(strategy)?;
    let mut gateway = HttpGateway::new(api_key, base_url)?;
    match game_id {
        Some(id) => {
            gateway.resume(id)?;
        }
        None => {
            gateway.new_game(map)?;
            gateway.start()?;
        }
    }

    let mut runner =
        TurnRunner::new(gateway, strategy.build_chain(), seed).with_strategy_name(&strategy.name);
    let mut report = match runner.run() {
        Ok(report) => report,
        Err(e) if e.is_retryable() => {
            if let Some(id) = runner.gateway().game_id() {
                tracing::warn!(game_id = id, "Session interrupted; resume with --game-id");
            }
            return Err(e.into());
        }
        Err(e) => {
            let mut gateway = runner.into_gateway();
            match gateway.end() {
                Ok(()) => tracing::warn!("Game ended prematurely"),
                Err(end_err) => tracing::warn!(error = %end_err, "Could not end game"),
            }
            return Err(e.into());
        }
    };
    match runner.gateway().score() {
        Ok(score) => {
            tracing::info!(final_score = score.final_score, "Final score");
            report.score = Some(score);
        }
        Err(e) => tracing::warn!(error = %e, "Could not fetch score"),
    }
    write_report(&report, output)
}

/// One sandbox session
fn cmd_simulate(
    scenario: Option<&Path>,
    strategy: &str,
    seed: u64,
    output: Option<&Path>,
) -> CmdResult {
    let scenario = load_scenario(scenario)?;
    let strategy = Strategy::resolve(strategy)?;

    let game = SandboxGame::new(scenario, seed);
    let mut runner =
        TurnRunner::new(game, strategy.build_chain(), seed).with_strategy_name(&strategy.name);
    let mut report = runner.run()?;
    let score = runner.gateway().score();
    tracing::info!(final_score = score.final_score, "Sandbox score");
    report.score = Some(score);
    write_report(&report, output)
}

/// Sandbox batch
fn cmd_batch(
    scenario: Option<&Path>,
    strategy: &str,
    count: u32,
    parallel: u32,
    seed: u64,
    output: &Path,
) -> CmdResult {
    let config = BatchConfig::new(load_scenario(scenario)?, Strategy::resolve(strategy)?, count)
        .with_seed(seed)
        .with_parallelism(parallel);
    let results = run_batch(config);

    let results_path = output.join("batch_results.json");
    results.save(&results_path)?;

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Sessions played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Sessions FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Score: mean {:.1}, min {:.1}, max {:.1}",
        results.summary.mean_score, results.summary.min_score, results.summary.max_score
    );
    eprintln!("Mean population: {:.1}", results.summary.mean_population);

    if !results.errors.is_empty() {
        eprintln!("\nFAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Session {} (seed {}): {}",
                error.game_index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
    Ok(())
}

/// Print the chain
fn cmd_strategy(strategy: &str) -> CmdResult {
    let strategy = Strategy::resolve(strategy)?;
    println!("{}", strategy.name);
    if !strategy.description.is_empty() {
        println!("{}", strategy.description);
    }
    println!();
    println!("{}", strategy.build_chain());
    Ok(())
}

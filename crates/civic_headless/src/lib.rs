//! Session runner for the city-building bot.
//!
//! This crate connects the decision engine in `civic_core` to a game:
//!
//! - **Remote play**: [`http::HttpGateway`] talks to the game host over HTTPS
//! - **Offline play**: [`sandbox::SandboxGame`] simulates a host in process
//! - **Strategies**: [`strategies::Strategy`] describes a policy chain in RON
//! - **Batch runs**: [`batch::run_batch`] plays many sandbox sessions in parallel
//!
//! # Logging
//!
//! Everything logs through `tracing`. Per-policy reasoning is at `debug`,
//! issued actions and host messages at `info`, host errors at `warn`.
//!
//! # Example
//!
//! ```bash
//! # Play the public host
//! CONSIDITION_API_KEY=... cargo run -p civic_headless -- play --map training1
//!
//! # One offline session with a strategy file
//! cargo run -p civic_headless -- simulate --strategy strategies/cabins.ron
//!
//! # Fifty offline sessions in parallel
//! cargo run -p civic_headless -- batch --count 50 --output results/
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod http;
pub mod protocol;
pub mod runner;
pub mod sandbox;
pub mod scenario;
pub mod strategies;

pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary};
pub use http::HttpGateway;
pub use runner::{RunError, SessionReport, TurnRunner};
pub use sandbox::SandboxGame;
pub use scenario::{Scenario, ScenarioError};
pub use strategies::{PolicyKind, PolicySpec, Strategy, StrategyError};

//! # Civic Core
//!
//! Per-turn decision engine for the city-building bot.
//!
//! This crate holds **only** decision logic:
//! - No HTTP
//! - No file or console IO
//! - No ambient randomness (callers pass a seeded RNG)
//!
//! Each turn the caller fetches a [`Snapshot`](snapshot::Snapshot), hands it to
//! a [`PolicyChain`](chain::PolicyChain) together with a
//! [`TurnContext`](policy::TurnContext), and the chain issues exactly one
//! action through the [`Gateway`](gateway::Gateway), falling back to `wait`.
//!
//! ## Crate Structure
//!
//! - [`snapshot`] - Read-only game state for one turn
//! - [`gateway`] - Actions and the host contract
//! - [`policy`] - Policy trait and turn context
//! - [`chain`] - Priority chain with guards and completion hooks
//! - [`placement`] - Buildable-cell scoring
//! - [`policies`] - Thermal, construction, maintenance, upgrade and utility policies

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod chain;
pub mod error;
pub mod gateway;
pub mod placement;
pub mod policies;
pub mod policy;
pub mod snapshot;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::chain::{ChainEntry, Completion, PolicyChain, TurnOutcome};
    pub use crate::error::{EngineError, GatewayError, Result};
    pub use crate::gateway::{Action, Gateway};
    pub use crate::placement::Placement;
    pub use crate::policies::standard_chain;
    pub use crate::policy::{Policy, TurnContext};
    pub use crate::snapshot::{
        ActionRecord, Position, ResidenceBlueprint, ResidenceState, Snapshot, Structure,
        StructureKind, TerrainGrid, Upgrade, UtilityBlueprint,
    };
}

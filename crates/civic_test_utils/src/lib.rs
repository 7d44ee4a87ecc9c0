//! # Civic Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Snapshot builder and blueprint presets
//! - A gateway that records actions instead of playing them
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod props;
pub mod recording;

pub use fixtures::SnapshotBuilder;
pub use recording::RecordingGateway;

/// Re-export proptest for convenience.
pub use proptest;

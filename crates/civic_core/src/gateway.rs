//! Contract between the decision engine and the game host.
//!
//! The engine never speaks HTTP. It issues [`Action`]s through a [`Gateway`],
//! and every action consumes exactly one simulated turn.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::snapshot::{Position, Snapshot};

/// One turn's worth of work submitted to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Place a foundation for a blueprint.
    StartBuild {
        /// Target cell.
        position: Position,
        /// Blueprint name.
        building: String,
    },
    /// Advance construction of an unfinished structure.
    ContinueBuild {
        /// Structure cell.
        position: Position,
    },
    /// Remove a structure.
    Demolish {
        /// Structure cell.
        position: Position,
    },
    /// Restore a structure's health.
    Maintain {
        /// Structure cell.
        position: Position,
    },
    /// Set the requested energy of a residence.
    AdjustEnergy {
        /// Residence cell.
        position: Position,
        /// New requested energy in MWh.
        value: f64,
    },
    /// Buy an upgrade for a structure.
    PurchaseUpgrade {
        /// Structure cell.
        position: Position,
        /// Upgrade name.
        upgrade: String,
    },
    /// Do nothing this turn.
    Wait,
}

impl Action {
    /// Short kind label, used for logging and per-kind counters.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Action::StartBuild { .. } => "start_build",
            Action::ContinueBuild { .. } => "continue_build",
            Action::Demolish { .. } => "demolish",
            Action::Maintain { .. } => "maintain",
            Action::AdjustEnergy { .. } => "adjust_energy",
            Action::PurchaseUpgrade { .. } => "purchase_upgrade",
            Action::Wait => "wait",
        }
    }

    /// Target cell, if the action has one.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        match self {
            Action::StartBuild { position, .. }
            | Action::ContinueBuild { position }
            | Action::Demolish { position }
            | Action::Maintain { position }
            | Action::AdjustEnergy { position, .. }
            | Action::PurchaseUpgrade { position, .. } => Some(*position),
            Action::Wait => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::StartBuild { position, building } => {
                write!(f, "start_build {building} at {position}")
            }
            Action::AdjustEnergy { position, value } => {
                write!(f, "adjust_energy {value:.3} MWh at {position}")
            }
            Action::PurchaseUpgrade { position, upgrade } => {
                write!(f, "purchase_upgrade {upgrade} at {position}")
            }
            Action::Wait => write!(f, "wait"),
            other => match other.position() {
                Some(position) => write!(f, "{} at {position}", other.kind()),
                None => write!(f, "{}", other.kind()),
            },
        }
    }
}

/// Access to the remote (or simulated) game.
///
/// Implementations own the session. `get_state` always returns the latest
/// authoritative snapshot; `execute` submits one action, consumes one turn
/// and returns the resulting snapshot, including the host's messages and
/// error strings for that turn.
pub trait Gateway {
    /// Latest snapshot.
    fn get_state(&mut self) -> Result<Snapshot, GatewayError>;

    /// Submit one action and return the updated snapshot.
    fn execute(&mut self, action: Action) -> Result<Snapshot, GatewayError>;

    /// Place a foundation.
    fn start_build(&mut self, position: Position, building: &str) -> Result<Snapshot, GatewayError> {
        self.execute(Action::StartBuild {
            position,
            building: building.to_string(),
        })
    }

    /// Advance construction.
    fn continue_build(&mut self, position: Position) -> Result<Snapshot, GatewayError> {
        self.execute(Action::ContinueBuild { position })
    }

    /// Remove a structure.
    fn demolish(&mut self, position: Position) -> Result<Snapshot, GatewayError> {
        self.execute(Action::Demolish { position })
    }

    /// Restore health.
    fn maintain(&mut self, position: Position) -> Result<Snapshot, GatewayError> {
        self.execute(Action::Maintain { position })
    }

    /// Set requested energy.
    fn adjust_energy(&mut self, position: Position, value: f64) -> Result<Snapshot, GatewayError> {
        self.execute(Action::AdjustEnergy { position, value })
    }

    /// Buy an upgrade.
    fn purchase_upgrade(
        &mut self,
        position: Position,
        upgrade: &str,
    ) -> Result<Snapshot, GatewayError> {
        self.execute(Action::PurchaseUpgrade {
            position,
            upgrade: upgrade.to_string(),
        })
    }

    /// Pass the turn.
    fn wait(&mut self) -> Result<Snapshot, GatewayError> {
        self.execute(Action::Wait)
    }
}

impl<G: Gateway + ?Sized> Gateway for &mut G {
    fn get_state(&mut self) -> Result<Snapshot, GatewayError> {
        (**self).get_state()
    }

    fn execute(&mut self, action: Action) -> Result<Snapshot, GatewayError> {
        (**self).execute(action)
    }
}

impl<G: Gateway + ?Sized> Gateway for Box<G> {
    fn get_state(&mut self) -> Result<Snapshot, GatewayError> {
        (**self).get_state()
    }

    fn execute(&mut self, action: Action) -> Result<Snapshot, GatewayError> {
        (**self).execute(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        let action = Action::AdjustEnergy {
            position: Position::new(2, 3),
            value: 4.25,
        };
        assert_eq!(action.to_string(), "adjust_energy 4.250 MWh at 2,3");
        assert_eq!(
            Action::Maintain {
                position: Position::new(1, 1)
            }
            .to_string(),
            "maintain at 1,1"
        );
        assert_eq!(Action::Wait.to_string(), "wait");
    }

    #[test]
    fn test_action_position() {
        assert_eq!(Action::Wait.position(), None);
        assert_eq!(
            Action::ContinueBuild {
                position: Position::new(4, 5)
            }
            .position(),
            Some(Position::new(4, 5))
        );
    }
}

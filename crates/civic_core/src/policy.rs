//! The decision-unit abstraction and the per-turn context it acts through.

use std::fmt;

use rand::RngCore;
use tracing::info;

use crate::error::{EngineError, Result};
use crate::gateway::{Action, Gateway};
use crate::snapshot::Snapshot;

/// A single decision heuristic.
///
/// Policies hold configuration only. They inspect the snapshot and, when they
/// can act, issue exactly one action through the [`TurnContext`] and return
/// `Ok(true)`. Returning `Ok(false)` hands the turn to the next policy.
pub trait Policy: Send + Sync + fmt::Debug {
    /// Stable name used in logs and chain listings.
    fn name(&self) -> &str;

    /// Decide, and act if applicable.
    fn try_execute(&self, snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<bool>;
}

/// Everything a policy may touch during one turn besides the snapshot.
///
/// Enforces the one-action-per-turn rule: a second [`TurnContext::issue`]
/// fails. A single [`TurnContext::follow_up`] is allowed after the primary
/// action; it consumes the next simulated turn.
pub struct TurnContext<'a> {
    gateway: &'a mut dyn Gateway,
    rng: &'a mut dyn RngCore,
    issued: Option<Action>,
    follow_up: Option<Action>,
    latest: Option<Snapshot>,
}

impl<'a> TurnContext<'a> {
    /// Wrap a gateway and the session RNG.
    pub fn new(gateway: &'a mut dyn Gateway, rng: &'a mut dyn RngCore) -> Self {
        Self {
            gateway,
            rng,
            issued: None,
            follow_up: None,
            latest: None,
        }
    }

    /// Session random source.
    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }

    /// Submit the turn's action on behalf of `policy`.
    pub fn issue(&mut self, policy: &str, action: Action) -> Result<()> {
        if self.issued.is_some() {
            return Err(EngineError::ActionAlreadyIssued {
                policy: policy.to_string(),
            });
        }
        info!(policy, action = %action, "Issuing action");
        let snapshot = self.gateway.execute(action.clone())?;
        self.issued = Some(action);
        self.latest = Some(snapshot);
        Ok(())
    }

    /// Submit one extra action right after the primary one.
    pub fn follow_up(&mut self, policy: &str, action: Action) -> Result<()> {
        if self.issued.is_none() || self.follow_up.is_some() {
            return Err(EngineError::InvalidFollowUp {
                policy: policy.to_string(),
            });
        }
        info!(policy, action = %action, "Issuing follow-up action");
        let snapshot = self.gateway.execute(action.clone())?;
        self.follow_up = Some(action);
        self.latest = Some(snapshot);
        Ok(())
    }

    /// The primary action issued this turn.
    #[must_use]
    pub fn issued(&self) -> Option<&Action> {
        self.issued.as_ref()
    }

    /// The follow-up action, if any.
    #[must_use]
    pub fn follow_up_action(&self) -> Option<&Action> {
        self.follow_up.as_ref()
    }

    /// Snapshot returned by the most recent action.
    #[must_use]
    pub fn latest_snapshot(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }
}

impl fmt::Debug for TurnContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnContext")
            .field("issued", &self.issued)
            .field("follow_up", &self.follow_up)
            .finish_non_exhaustive()
    }
}

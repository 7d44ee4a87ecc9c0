//! A gateway that remembers instead of playing.

use civic_core::error::GatewayError;
use civic_core::gateway::{Action, Gateway};
use civic_core::snapshot::{ActionRecord, Snapshot};
use tracing::trace;

/// Records every action and advances the turn, leaving everything else as is.
///
/// Handy for asserting exactly what a policy or chain issued. A failure can be
/// scheduled for the n-th call to [`Gateway::execute`].
#[derive(Debug, Clone)]
pub struct RecordingGateway {
    state: Snapshot,
    actions: Vec<Action>,
    fail_on_call: Option<usize>,
}

impl RecordingGateway {
    /// Wrap a starting snapshot.
    #[must_use]
    pub fn new(state: Snapshot) -> Self {
        Self {
            state,
            actions: Vec::new(),
            fail_on_call: None,
        }
    }

    /// Make the `call`-th execute (0-based) fail with a transport error.
    #[must_use]
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Actions received so far.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &Snapshot {
        &self.state
    }
}

impl Gateway for RecordingGateway {
    fn get_state(&mut self) -> Result<Snapshot, GatewayError> {
        Ok(self.state.clone())
    }

    fn execute(&mut self, action: Action) -> Result<Snapshot, GatewayError> {
        if self.fail_on_call == Some(self.actions.len()) {
            return Err(GatewayError::Transport("scheduled failure".into()));
        }
        trace!(turn = self.state.turn, action = %action, "Recorded action");
        self.state.action_log.push(ActionRecord {
            turn: self.state.turn,
            action: action.clone(),
        });
        self.actions.push(action);
        self.state.turn += 1;
        Ok(self.state.clone())
    }
}

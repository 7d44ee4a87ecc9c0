//! Error types for the decision engine and its gateway.

use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure talking to the game host.
///
/// Inapplicable policies never produce one of these; only the gateway does.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection, TLS or timeout failure before a response arrived.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The host answered with a non-success status code.
    #[error("Game host returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The response could not be decoded into a snapshot.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The gateway refused the action locally (sandbox rules, missing game).
    #[error("Action rejected: {0}")]
    Rejected(String),

    /// No game session has been created or resumed yet.
    #[error("No active game session")]
    GameNotStarted,
}

impl GatewayError {
    /// Whether a caller could reasonably try the same call again.
    ///
    /// Transport hiccups, throttling and 5xx responses are retryable.
    /// Everything else ends the session.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_) => true,
            GatewayError::Status { status, .. } => *status == 429 || *status >= 500,
            GatewayError::Decode(_) | GatewayError::Rejected(_) | GatewayError::GameNotStarted => {
                false
            }
        }
    }
}

/// Top-level error type for one turn of decision making.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The gateway failed while a policy was issuing its action.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A policy tried to issue a second primary action in the same turn.
    #[error("Policy '{policy}' issued more than one action this turn")]
    ActionAlreadyIssued {
        /// Name of the offending policy.
        policy: String,
    },

    /// A follow-up action was requested without a primary action, or twice.
    #[error("Policy '{policy}' requested an invalid follow-up action")]
    InvalidFollowUp {
        /// Name of the offending policy.
        policy: String,
    },
}

impl EngineError {
    /// Whether the underlying failure is retryable (see [`GatewayError::is_retryable`]).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Gateway(err) => err.is_retryable(),
            EngineError::ActionAlreadyIssued { .. } | EngineError::InvalidFollowUp { .. } => false,
        }
    }
}

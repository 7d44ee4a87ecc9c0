//! Gateway to the remote game host over HTTPS.
//!
//! Every call is a blocking request authenticated with the `x-api-key`
//! header. The host returns the full turn state after each action; the
//! gateway folds it into a cached [`Snapshot`] and keeps the temperature
//! history and action log that the host does not track for us.

use std::time::Duration;

use civic_core::error::GatewayError;
use civic_core::gateway::{Action, Gateway};
use civic_core::snapshot::{ActionRecord, Snapshot};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::protocol::{
    AdjustEnergyRequest, BuyUpgradeRequest, GameInfoDto, GameStateDto, NewGameRequest,
    PositionRequest, ScoreDto, StartBuildRequest,
};

/// Public host endpoint.
pub const DEFAULT_BASE_URL: &str = "https://game.considition.com/api/game/";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

/// Remote gateway holding one game session.
pub struct HttpGateway {
    client: Client,
    base_url: String,
    api_key: String,
    game_id: Option<String>,
    snapshot: Option<Snapshot>,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url)
            .field("game_id", &self.game_id)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    /// Create a gateway without a session.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport)?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            game_id: None,
            snapshot: None,
        })
    }

    /// Current session id.
    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn session(&self) -> Result<&str, GatewayError> {
        self.game_id.as_deref().ok_or(GatewayError::GameNotStarted)
    }

    fn get(&self, path: &str) -> Result<RequestBuilder, GatewayError> {
        let game_id = self.session()?;
        Ok(self.client.get(self.url(path)).query(&[("GameId", game_id)]))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder, GatewayError> {
        let game_id = self.session()?;
        Ok(self.client.post(self.url(path)).query(&[("GameId", game_id)]))
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response = request
            .header("x-api-key", &self.api_key)
            .send()
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().map_err(transport)?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Create a game on `map` and load its description.
    pub fn new_game(&mut self, map: &str) -> Result<Snapshot, GatewayError> {
        let request = self
            .client
            .post(self.url("new"))
            .json(&NewGameRequest { map_name: map });
        let info: GameInfoDto = self.send(request)?;
        info!(game_id = %info.game_id, map, "Created game");
        self.adopt(info)
    }

    /// Attach to an existing game and load its description and state.
    pub fn resume(&mut self, game_id: &str) -> Result<Snapshot, GatewayError> {
        self.game_id = Some(game_id.to_string());
        let info: GameInfoDto = self.send(self.get("gameInfo")?)?;
        self.adopt(info)?;
        let snapshot = self.refresh()?;
        info!(game_id, turn = snapshot.turn, "Resumed game");
        Ok(snapshot)
    }

    fn adopt(&mut self, info: GameInfoDto) -> Result<Snapshot, GatewayError> {
        self.game_id = Some(info.game_id.clone());
        let snapshot = info.into_snapshot();
        self.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Start the created game; turn zero begins.
    pub fn start(&mut self) -> Result<Snapshot, GatewayError> {
        let state: GameStateDto = self.send(self.get("start")?)?;
        self.merge(state, None)
    }

    /// Re-read the turn state from the host.
    pub fn refresh(&mut self) -> Result<Snapshot, GatewayError> {
        let state: GameStateDto = self.send(self.get("gameState")?)?;
        self.merge(state, None)
    }

    /// Score of the session so far.
    pub fn score(&self) -> Result<ScoreDto, GatewayError> {
        self.send(self.get("score")?)
    }

    /// End the session early. The host keeps the score.
    pub fn end(&mut self) -> Result<(), GatewayError> {
        let request = self.get("end")?.header("x-api-key", &self.api_key);
        let response = request.send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        info!(game_id = ?self.game_id, "Ended game");
        self.game_id = None;
        Ok(())
    }

    fn merge(&mut self, state: GameStateDto, action: Option<Action>) -> Result<Snapshot, GatewayError> {
        let snapshot = self.snapshot.as_mut().ok_or(GatewayError::GameNotStarted)?;
        if let Some(action) = action {
            snapshot.action_log.push(ActionRecord {
                turn: snapshot.turn,
                action,
            });
        }
        state.apply_to(snapshot);
        Ok(snapshot.clone())
    }

    fn request_for(&self, action: &Action) -> Result<RequestBuilder, GatewayError> {
        let request = match action {
            Action::StartBuild { position, building } => {
                self.post("action/startBuild")?.json(&StartBuildRequest {
                    position: (*position).into(),
                    building_name: building,
                })
            }
            Action::ContinueBuild { position } => self.post("action/Build")?.json(&PositionRequest {
                position: (*position).into(),
            }),
            Action::Demolish { position } => self.post("action/Demolish")?.json(&PositionRequest {
                position: (*position).into(),
            }),
            Action::Maintain { position } => {
                self.post("action/Maintenance")?.json(&PositionRequest {
                    position: (*position).into(),
                })
            }
            Action::AdjustEnergy { position, value } => {
                self.post("action/AdjustEnergy")?.json(&AdjustEnergyRequest {
                    position: (*position).into(),
                    value: *value,
                })
            }
            Action::PurchaseUpgrade { position, upgrade } => {
                self.post("action/BuyUpgrade")?.json(&BuyUpgradeRequest {
                    position: (*position).into(),
                    upgrade_action: upgrade,
                })
            }
            Action::Wait => self.post("action/Wait")?,
        };
        Ok(request)
    }
}

impl Gateway for HttpGateway {
    fn get_state(&mut self) -> Result<Snapshot, GatewayError> {
        self.snapshot.clone().ok_or(GatewayError::GameNotStarted)
    }

    fn execute(&mut self, action: Action) -> Result<Snapshot, GatewayError> {
        let request = self.request_for(&action)?;
        debug!(%action, "Sending action");
        let state: GameStateDto = self.send(request)?;
        self.merge(state, Some(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_core::snapshot::Position;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let gateway = HttpGateway::new("key", "http://localhost:8080/api/game").unwrap();
        assert_eq!(gateway.url("start"), "http://localhost:8080/api/game/start");
    }

    #[test]
    fn test_session_calls_need_a_game() {
        let mut gateway = HttpGateway::new("key", DEFAULT_BASE_URL).unwrap();
        assert!(matches!(gateway.refresh(), Err(GatewayError::GameNotStarted)));
        assert!(matches!(gateway.end(), Err(GatewayError::GameNotStarted)));
        assert!(matches!(gateway.score(), Err(GatewayError::GameNotStarted)));
    }

    #[test]
    fn test_actions_need_a_session() {
        let mut gateway = HttpGateway::new("key", DEFAULT_BASE_URL).unwrap();
        assert!(matches!(gateway.get_state(), Err(GatewayError::GameNotStarted)));
        let err = gateway
            .continue_build(Position::new(1, 1))
            .unwrap_err();
        assert!(matches!(err, GatewayError::GameNotStarted));
        assert!(!err.is_retryable());
    }
}

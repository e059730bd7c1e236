use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type GameResult<T> = Result<T, GameError>;

/// Every rejection a lobby, round or game can produce.
///
/// All of these are recoverable. The operation that returned one has left its
/// state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("At least 2 players are needed to start the game")]
    InsufficientPlayers,
    #[error("You have already used the maximum number of passes")]
    PassLimitExceeded,
    #[error("Please enter a task")]
    EmptyTask,
    #[error("Task cannot exceed {max} characters")]
    TaskTooLong { max: usize },
    #[error("Cannot {operation} while {state}")]
    InvalidStateTransition {
        operation: &'static str,
        state: &'static str,
    },
    #[error("A target player is required in \"anyone\" mode")]
    TargetRequired,
    #[error("Target player is not in this game")]
    InvalidTarget,
    #[error("Please enter your name")]
    EmptyName,
    #[error("Name cannot exceed {max} characters")]
    NameTooLong { max: usize },
    #[error("Please enter a valid 6-character lobby code")]
    InvalidLobbyCode,
    #[error("Lobby is full")]
    LobbyFull,
    #[error("Lobby not found")]
    LobbyNotFound,
    #[error("Game not found")]
    GameNotFound,
    #[error("{0}")]
    BadRequest(String),
}

impl GameError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::LobbyNotFound | Self::GameNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

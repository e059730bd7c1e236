use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type PlayerId = String;

/// A player in a lobby or round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
}

impl Player {
    pub fn new(name: impl Into<String>, is_host: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            is_host,
        }
    }
}

/// How the target of a task is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// The next player in turn order is always the target.
    #[default]
    Clockwise,
    /// The current player names any other player.
    Anyone,
}

/// Whether the pass limit applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulesMode {
    #[default]
    With,
    Without,
}

impl RulesMode {
    pub fn pass_limit(self, passes_with_rules: u32) -> PassLimit {
        match self {
            Self::With => PassLimit::Limited(passes_with_rules),
            Self::Without => PassLimit::Unlimited,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    All,
    Safe,
    Spicy,
    Risky,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all levels"),
            Self::Safe => write!(f, "safe"),
            Self::Spicy => write!(f, "spicy"),
            Self::Risky => write!(f, "risky"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Truth,
    Dare,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truth => write!(f, "truth"),
            Self::Dare => write!(f, "dare"),
        }
    }
}

/// What the current player does with their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Truth,
    Dare,
    Random,
    Pass,
}

/// Maximum number of passes per player for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassLimit {
    Limited(u32),
    Unlimited,
}

impl PassLimit {
    pub fn allows(self, used: u32) -> bool {
        match self {
            Self::Limited(max) => used < max,
            Self::Unlimited => true,
        }
    }
}

/// Settings picked when a lobby is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub game_mode: GameMode,
    pub rules_mode: RulesMode,
    pub difficulty: Difficulty,
}

/// A task handed from one player to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub from_player_id: PlayerId,
    pub to_player_id: PlayerId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub content: String,
    pub delivered_at: chrono::DateTime<chrono::Utc>,
}

// ─── HTTP payloads ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLobbyRequest {
    pub player_name: String,
    pub game_mode: GameMode,
    pub rules_mode: RulesMode,
    #[serde(rename = "difficulty_setting")]
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLobbyResponse {
    pub lobby_id: String,
    pub lobby_code: String,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinLobbyRequest {
    pub player_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinLobbyResponse {
    pub player_id: PlayerId,
    pub lobby_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartGameResponse {
    pub game_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeChoiceRequest {
    pub choice_type: Choice,
    #[serde(default)]
    pub target_player_id: Option<PlayerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTaskRequest {
    pub text: String,
}

/// Public view of a lobby.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyView {
    pub id: String,
    pub code: String,
    pub game_mode: GameMode,
    pub rules_mode: RulesMode,
    #[serde(rename = "difficulty_setting")]
    pub difficulty: Difficulty,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub players: Vec<Player>,
    pub player_count: usize,
    pub max_players: usize,
}

/// Whose turn it is after an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnView {
    pub message: String,
    pub current_player: String,
    pub current_player_id: PlayerId,
}

/// Round state as exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameView {
    pub id: String,
    pub lobby_id: String,
    pub settings: GameSettings,
    pub started_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    pub round: crate::round::RoundSnapshot,
}

pub type PassCounts = HashMap<PlayerId, u32>;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::content::ContentLibrary;
use crate::error::{GameError, GameResult};
use crate::lobby::{create_lobby_code, normalize_code, Lobby};
use crate::round::{ChoiceOutcome, RoundRules, RoundStateMachine};
use crate::types::*;

/// Commands sent from HTTP handlers to a game task.
#[derive(Debug)]
pub enum GameCommand {
    View {
        respond_to: oneshot::Sender<GameView>,
    },
    NextTurn {
        respond_to: oneshot::Sender<GameResult<TurnView>>,
    },
    MakeChoice {
        respond_to: oneshot::Sender<GameResult<serde_json::Value>>,
        choice: Choice,
        target: Option<PlayerId>,
    },
    SubmitTask {
        respond_to: oneshot::Sender<GameResult<serde_json::Value>>,
        text: String,
    },
    End {
        respond_to: oneshot::Sender<()>,
    },
}

/// The internal state of a running game. Owned by exactly one task.
struct GameState {
    game_id: String,
    lobby_id: String,
    settings: GameSettings,
    started_at: chrono::DateTime<chrono::Utc>,
    round: RoundStateMachine,
    content: Arc<ContentLibrary>,
    rng: StdRng,
}

impl GameState {
    fn view(&self) -> GameView {
        GameView {
            id: self.game_id.clone(),
            lobby_id: self.lobby_id.clone(),
            settings: self.settings,
            started_at: self.started_at,
            round: self.round.snapshot(),
        }
    }

    fn player_name(&self, id: &str) -> String {
        self.round
            .players()
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    fn turn_view(&self, message: impl Into<String>) -> TurnView {
        let (current_player, current_player_id) = self
            .round
            .current_player()
            .map(|p| (p.name.clone(), p.id.clone()))
            .unwrap_or_default();
        TurnView {
            message: message.into(),
            current_player,
            current_player_id,
        }
    }

    fn task_json(&self, message: &str, record: &TaskRecord) -> serde_json::Value {
        serde_json::json!({
            "message": message,
            "type": record.task_type,
            "content": record.content,
            "from_player": self.player_name(&record.from_player_id),
            "to_player": self.player_name(&record.to_player_id),
            "current_player_id": self.turn_view("").current_player_id,
        })
    }

    fn make_choice(&mut self, choice: Choice, target: Option<&str>) -> GameResult<serde_json::Value> {
        let content = self.content.with_difficulty(self.settings.difficulty);
        let outcome = self.round.choose(choice, target, &mut self.rng, &content)?;
        let body = match outcome {
            ChoiceOutcome::Passed { passes_used, .. } => {
                let mut body = serde_json::to_value(
                    self.turn_view("Pass used, turn passed to next player"),
                )
                .unwrap_or_default();
                body["passes_used"] = serde_json::json!(passes_used);
                body
            }
            ChoiceOutcome::Delivered(record) => self.task_json("Random task delivered", &record),
            ChoiceOutcome::AwaitingTask { task_type, target } => serde_json::json!({
                "message": format!("{task_type} selected, waiting for the task text"),
                "type": task_type,
                "to_player": self.player_name(&target),
                "to_player_id": target,
            }),
        };
        Ok(body)
    }

    fn submit_task(&mut self, text: &str) -> GameResult<serde_json::Value> {
        let record = self.round.submit_task(text)?;
        Ok(self.task_json("Task sent", &record))
    }
}

#[derive(Debug, Clone)]
pub struct GameHandle {
    pub game_id: String,
    cmd_tx: mpsc::Sender<GameCommand>,
}

impl GameHandle {
    async fn execute<T>(
        &self,
        cmd: GameCommand,
        rx: oneshot::Receiver<T>,
    ) -> GameResult<T> {
        // A closed channel also fails rx.await, so the send result can be ignored
        let _ = self.cmd_tx.send(cmd).await;
        rx.await.map_err(|_| GameError::GameNotFound)
    }

    pub async fn view(&self) -> GameResult<GameView> {
        let (tx, rx) = oneshot::channel();
        self.execute(GameCommand::View { respond_to: tx }, rx).await
    }

    pub async fn next_turn(&self) -> GameResult<TurnView> {
        let (tx, rx) = oneshot::channel();
        self.execute(GameCommand::NextTurn { respond_to: tx }, rx).await?
    }

    pub async fn make_choice(
        &self,
        choice: Choice,
        target: Option<PlayerId>,
    ) -> GameResult<serde_json::Value> {
        let (tx, rx) = oneshot::channel();
        let cmd = GameCommand::MakeChoice {
            respond_to: tx,
            choice,
            target,
        };
        self.execute(cmd, rx).await?
    }

    pub async fn submit_task(&self, text: String) -> GameResult<serde_json::Value> {
        let (tx, rx) = oneshot::channel();
        let cmd = GameCommand::SubmitTask {
            respond_to: tx,
            text,
        };
        self.execute(cmd, rx).await?
    }

    pub async fn end(&self) -> GameResult<()> {
        let (tx, rx) = oneshot::channel();
        self.execute(GameCommand::End { respond_to: tx }, rx).await
    }
}

/// Registry holds all open lobbies and running games.
pub struct Registry {
    /// lobby_id -> lobby
    pub lobbies: dashmap::DashMap<String, Lobby>,
    /// lobby_code -> lobby_id
    pub lobby_codes: dashmap::DashMap<String, String>,
    /// game_id -> command sender
    pub games: dashmap::DashMap<String, GameHandle>,
    config: ServerConfig,
    content: Arc<ContentLibrary>,
}

impl Registry {
    pub fn new(config: ServerConfig, content: ContentLibrary) -> Arc<Self> {
        Arc::new(Self {
            lobbies: dashmap::DashMap::new(),
            lobby_codes: dashmap::DashMap::new(),
            games: dashmap::DashMap::new(),
            config,
            content: Arc::new(content),
        })
    }

    fn unique_code(&self) -> String {
        let mut rng = rand::rng();
        loop {
            let code = create_lobby_code(&mut rng);
            if !self.lobby_codes.contains_key(&code) {
                return code;
            }
        }
    }

    pub fn create_lobby(&self, req: CreateLobbyRequest) -> GameResult<CreateLobbyResponse> {
        let settings = GameSettings {
            game_mode: req.game_mode,
            rules_mode: req.rules_mode,
            difficulty: req.difficulty,
        };
        let code = self.unique_code();
        let lobby = Lobby::new(code, &req.player_name, settings, self.config.max_players)?;

        let response = CreateLobbyResponse {
            lobby_id: lobby.id.clone(),
            lobby_code: lobby.code.clone(),
            player_id: lobby.players[0].id.clone(),
        };
        self.lobby_codes
            .insert(lobby.code.clone(), lobby.id.clone());
        self.lobbies.insert(lobby.id.clone(), lobby);

        tracing::info!("Lobby created: {} code: {}", response.lobby_id, response.lobby_code);
        Ok(response)
    }

    pub fn join_lobby(&self, code: &str, player_name: &str) -> GameResult<JoinLobbyResponse> {
        let code = normalize_code(code).map_err(|_| GameError::LobbyNotFound)?;
        let lobby_id = self
            .lobby_codes
            .get(&code)
            .map(|id| id.value().clone())
            .ok_or(GameError::LobbyNotFound)?;
        let mut lobby = self
            .lobbies
            .get_mut(&lobby_id)
            .ok_or(GameError::LobbyNotFound)?;

        let player = lobby.join(player_name)?;
        Ok(JoinLobbyResponse {
            player_id: player.id.clone(),
            lobby_id,
        })
    }

    pub fn lobby(&self, lobby_id: &str) -> GameResult<LobbyView> {
        self.lobbies
            .get(lobby_id)
            .map(|l| l.view())
            .ok_or(GameError::LobbyNotFound)
    }

    /// Turns a lobby into a running game. The lobby is closed on success.
    pub fn start_game(self: &Arc<Self>, lobby_id: &str) -> GameResult<GameHandle> {
        let lobby = {
            let lobby = self.lobbies.get(lobby_id).ok_or(GameError::LobbyNotFound)?;
            if !lobby.can_start() {
                return Err(GameError::InsufficientPlayers);
            }
            lobby.clone()
        };

        let mut round = RoundStateMachine::new();
        let rules = RoundRules {
            max_passes: lobby
                .settings
                .rules_mode
                .pass_limit(self.config.max_passes_with_rules),
            targeting: lobby.settings.game_mode,
        };
        round.start_round(lobby.players.clone(), rules)?;

        self.remove_lobby(lobby_id);

        let game_id = Uuid::new_v4().to_string();
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let handle = GameHandle {
            game_id: game_id.clone(),
            cmd_tx,
        };
        self.games.insert(game_id.clone(), handle.clone());

        let state = GameState {
            game_id: game_id.clone(),
            lobby_id: lobby.id,
            settings: lobby.settings,
            started_at: chrono::Utc::now(),
            round,
            content: self.content.clone(),
            rng: StdRng::from_os_rng(),
        };
        tokio::spawn(game_task(state, cmd_rx, self.clone()));

        tracing::info!("Game created: {} from lobby {}", game_id, lobby.code);
        Ok(handle)
    }

    pub fn game(&self, game_id: &str) -> GameResult<GameHandle> {
        self.games
            .get(game_id)
            .map(|h| h.value().clone())
            .ok_or(GameError::GameNotFound)
    }

    pub fn remove_lobby(&self, lobby_id: &str) {
        if let Some((_, lobby)) = self.lobbies.remove(lobby_id) {
            self.lobby_codes.remove(&lobby.code);
        }
    }

    pub fn remove_game(&self, game_id: &str) {
        self.games.remove(game_id);
    }
}

async fn game_task(
    mut state: GameState,
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    registry: Arc<Registry>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            GameCommand::View { respond_to } => {
                let _ = respond_to.send(state.view());
            }
            GameCommand::NextTurn { respond_to } => {
                let result = state
                    .round
                    .advance_turn()
                    .map(|_| state.turn_view("Turn passed successfully"));
                let _ = respond_to.send(result);
            }
            GameCommand::MakeChoice {
                respond_to,
                choice,
                target,
            } => {
                let result = state.make_choice(choice, target.as_deref());
                if let Err(e) = &result {
                    tracing::debug!(game = %state.game_id, ?choice, "Choice rejected: {}", e);
                }
                let _ = respond_to.send(result);
            }
            GameCommand::SubmitTask { respond_to, text } => {
                let _ = respond_to.send(state.submit_task(&text));
            }
            GameCommand::End { respond_to } => {
                state.round.end_round();
                registry.remove_game(&state.game_id);
                let _ = respond_to.send(());
                break;
            }
        }
    }

    registry.remove_game(&state.game_id);
    tracing::info!(
        "Game {} task ended after {} tasks",
        state.game_id,
        state.round.history().len()
    );
}

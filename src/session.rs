//! Single-device game session.
//!
//! Drives the mini-app flow (welcome, lobby, game, task input) through an
//! explicit [`Command`] dispatch. Everything happens in local memory: joining a
//! lobby does not contact anyone, it seats a placeholder host next to the
//! local player. Screens and notifications go through an injected [`Host`].

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::content::ContentLibrary;
use crate::error::{GameError, GameResult};
use crate::lobby::{create_lobby_code, normalize_code, validate_name};
use crate::round::{ChoiceOutcome, RoundRules, RoundStateMachine, DEFAULT_PASSES_WITH_RULES};
use crate::types::{Choice, Difficulty, GameMode, GameSettings, Player, PlayerId, RulesMode, TaskType};

pub const QUICK_GAME_NAME: &str = "Player";
pub const PLACEHOLDER_HOST_NAME: &str = "Player 2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Welcome,
    CreateLobby,
    JoinLobby,
    Lobby,
    Game,
    TaskSelection,
}

/// Capabilities provided by the embedding app.
pub trait Host {
    fn display_screen(&mut self, screen: Screen);
    fn notify(&mut self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    ShowWelcome,
    ShowCreateLobby,
    ShowJoinLobby,
    CreateLobby {
        player_name: String,
        game_mode: GameMode,
        rules_mode: RulesMode,
        difficulty: Difficulty,
    },
    QuickGame,
    JoinLobby {
        player_name: String,
        lobby_code: String,
    },
    StartGame,
    Choose {
        choice: Choice,
        #[serde(default)]
        target: Option<PlayerId>,
    },
    SubmitTask {
        text: String,
    },
    SetDifficulty {
        difficulty: Difficulty,
    },
    Back,
    EndGame,
    LeaveLobby,
}

/// The task most recently handed out, for the task card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCard {
    pub task_type: TaskType,
    pub content: String,
}

pub struct Session<H> {
    host: H,
    content: Arc<ContentLibrary>,
    rng: StdRng,

    screen: Screen,
    player_name: String,
    lobby_code: String,
    settings: GameSettings,
    players: Vec<Player>,
    round: RoundStateMachine,
    last_task: Option<TaskCard>,
}

impl<H: Host> Session<H> {
    pub fn new(host: H, content: Arc<ContentLibrary>) -> Self {
        Self::with_rng(host, content, StdRng::from_os_rng())
    }

    pub fn with_rng(host: H, content: Arc<ContentLibrary>, rng: StdRng) -> Self {
        let mut session = Self {
            host,
            content,
            rng,
            screen: Screen::Welcome,
            player_name: String::new(),
            lobby_code: String::new(),
            settings: GameSettings::default(),
            players: Vec::new(),
            round: RoundStateMachine::new(),
            last_task: None,
        };
        session.show(Screen::Welcome);
        session
    }

    /// Runs one command. Failures are shown to the user and returned.
    pub fn handle(&mut self, command: Command) -> GameResult<()> {
        tracing::debug!(?command, screen = ?self.screen, "Handling command");
        let result = self.dispatch(command);
        if let Err(e) = &result {
            self.host.notify(&e.to_string());
        }
        result
    }

    fn dispatch(&mut self, command: Command) -> GameResult<()> {
        match command {
            Command::ShowWelcome => self.show(Screen::Welcome),
            Command::ShowCreateLobby => self.show(Screen::CreateLobby),
            Command::ShowJoinLobby => self.show(Screen::JoinLobby),
            Command::CreateLobby {
                player_name,
                game_mode,
                rules_mode,
                difficulty,
            } => {
                let name = validate_name(&player_name)?;
                self.open_lobby(
                    name,
                    GameSettings {
                        game_mode,
                        rules_mode,
                        difficulty,
                    },
                );
                self.host
                    .notify(&format!("Lobby created! Code: {}", self.lobby_code));
                self.show(Screen::Lobby);
            }
            Command::QuickGame => {
                self.open_lobby(QUICK_GAME_NAME.to_string(), GameSettings::default());
                self.host
                    .notify(&format!("Quick game created! Code: {}", self.lobby_code));
                self.show(Screen::Lobby);
            }
            Command::JoinLobby {
                player_name,
                lobby_code,
            } => self.join_lobby(&player_name, &lobby_code)?,
            Command::StartGame => self.start_game()?,
            Command::Choose { choice, target } => self.choose(choice, target.as_deref())?,
            Command::SubmitTask { text } => {
                let record = self.round.submit_task(&text)?;
                self.last_task = Some(TaskCard {
                    task_type: record.task_type,
                    content: record.content,
                });
                self.host.notify("Task sent!");
                self.announce_turn();
                self.show(Screen::Game);
            }
            Command::SetDifficulty { difficulty } => {
                self.settings.difficulty = difficulty;
                self.host
                    .notify(&format!("Difficulty set to {difficulty}"));
            }
            Command::Back => self.back(),
            Command::EndGame => self.end_game(),
            Command::LeaveLobby => self.leave_lobby(),
        }
        Ok(())
    }

    fn show(&mut self, screen: Screen) {
        self.screen = screen;
        self.host.display_screen(screen);
    }

    fn open_lobby(&mut self, name: String, settings: GameSettings) {
        self.round.end_round();
        self.lobby_code = create_lobby_code(&mut self.rng);
        self.settings = settings;
        self.players = vec![Player::new(name.clone(), true)];
        self.player_name = name;
        self.last_task = None;
        tracing::info!(code = %self.lobby_code, "Local lobby opened");
    }

    fn join_lobby(&mut self, player_name: &str, lobby_code: &str) -> GameResult<()> {
        let name = validate_name(player_name)?;
        let code = normalize_code(lobby_code)?;

        self.round.end_round();
        self.lobby_code = code;
        self.settings = GameSettings::default();
        self.players = vec![
            Player::new(name.clone(), false),
            Player::new(PLACEHOLDER_HOST_NAME, true),
        ];
        self.player_name = name;
        self.last_task = None;

        self.host.notify("You joined the lobby!");
        self.show(Screen::Lobby);
        Ok(())
    }

    fn start_game(&mut self) -> GameResult<()> {
        if self.screen != Screen::Lobby {
            return Err(GameError::InvalidStateTransition {
                operation: "start the game",
                state: "outside the lobby",
            });
        }
        let rules = RoundRules {
            max_passes: self.settings.rules_mode.pass_limit(DEFAULT_PASSES_WITH_RULES),
            targeting: self.settings.game_mode,
        };
        self.round.start_round(self.players.clone(), rules)?;
        self.last_task = None;
        self.host.notify("The game has started!");
        self.show(Screen::Game);
        Ok(())
    }

    fn choose(&mut self, choice: Choice, target: Option<&str>) -> GameResult<()> {
        let content = self.content.with_difficulty(self.settings.difficulty);
        match self.round.choose(choice, target, &mut self.rng, &content)? {
            ChoiceOutcome::Passed { .. } => {
                self.host.notify("You used a pass!");
                self.announce_turn();
            }
            ChoiceOutcome::Delivered(record) => {
                self.host
                    .notify(&format!("Random task: {}", record.content));
                self.last_task = Some(TaskCard {
                    task_type: record.task_type,
                    content: record.content,
                });
                self.announce_turn();
            }
            ChoiceOutcome::AwaitingTask { .. } => self.show(Screen::TaskSelection),
        }
        Ok(())
    }

    fn announce_turn(&mut self) {
        if let Some(player) = self.round.current_player() {
            let message = format!("Turn passes to {}", player.name);
            self.host.notify(&message);
        }
    }

    fn back(&mut self) {
        match self.screen {
            Screen::CreateLobby | Screen::JoinLobby | Screen::Welcome => self.show(Screen::Welcome),
            Screen::TaskSelection => {
                // Phase may already be InTurn if the task was delivered elsewhere.
                let _ = self.round.cancel_task();
                self.show(Screen::Game);
            }
            Screen::Game => self.end_game(),
            Screen::Lobby => self.leave_lobby(),
        }
    }

    fn end_game(&mut self) {
        let was_active = self.round.is_active();
        self.round.end_round();
        if self.players.is_empty() {
            self.show(Screen::Welcome);
        } else {
            self.show(Screen::Lobby);
        }
        if was_active {
            self.host.notify("Game over");
        }
    }

    fn leave_lobby(&mut self) {
        self.round.end_round();
        self.players.clear();
        self.lobby_code.clear();
        self.last_task = None;
        self.show(Screen::Welcome);
        self.host.notify("You left the lobby");
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn lobby_code(&self) -> &str {
        &self.lobby_code
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn settings(&self) -> GameSettings {
        self.settings
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn round(&self) -> &RoundStateMachine {
        &self.round
    }

    pub fn last_task(&self) -> Option<&TaskCard> {
        self.last_task.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

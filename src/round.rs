//! Turn, task and pass progression for one round of play.
//!
//! A round moves between three phases:
//!
//! ```text
//! Idle --start_round--> InTurn --choose(truth|dare)--> AwaitingTaskInput
//!                         ^  |                               |
//!                         |  +--choose(pass|random)--+       |
//!                         |                          |       |
//!                         +--------------------------+-------+ submit_task
//! ```
//!
//! `end_round` returns to `Idle` from anywhere. Every operation either
//! applies completely or returns an error and leaves the round as it was.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::content::ContentSource;
use crate::error::{GameError, GameResult};
use crate::types::{Choice, GameMode, PassCounts, PassLimit, Player, PlayerId, TaskRecord, TaskType};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_TASK_LEN: usize = 200;
pub const DEFAULT_PASSES_WITH_RULES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Idle,
    InTurn,
    AwaitingTaskInput,
}

impl RoundPhase {
    fn describe(self) -> &'static str {
        match self {
            Self::Idle => "no round is running",
            Self::InTurn => "waiting for a choice",
            Self::AwaitingTaskInput => "waiting for a task",
        }
    }
}

/// Rules fixed for the lifetime of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRules {
    pub max_passes: PassLimit,
    pub targeting: GameMode,
}

/// Result of a successful [`RoundStateMachine::choose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceOutcome {
    Passed { player_id: PlayerId, passes_used: u32 },
    Delivered(TaskRecord),
    AwaitingTask { task_type: TaskType, target: PlayerId },
}

/// Read-only copy of the round for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub players: Vec<Player>,
    pub current_player_index: usize,
    pub current_player: Option<Player>,
    pub phase: RoundPhase,
    pub task_type: Option<TaskType>,
    pub target_player_index: Option<usize>,
    pub passes_used: PassCounts,
    pub max_passes: PassLimit,
    pub active: bool,
    pub history: Vec<TaskRecord>,
}

#[derive(Debug, Clone)]
pub struct RoundStateMachine {
    players: Vec<Player>,
    current_player_index: usize,
    phase: RoundPhase,
    task_type: Option<TaskType>,
    target_player_index: Option<usize>,
    passes_used: PassCounts,
    rules: RoundRules,
    history: Vec<TaskRecord>,
}

impl Default for RoundStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundStateMachine {
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
            current_player_index: 0,
            phase: RoundPhase::Idle,
            task_type: None,
            target_player_index: None,
            passes_used: PassCounts::new(),
            rules: RoundRules {
                max_passes: PassLimit::Limited(DEFAULT_PASSES_WITH_RULES),
                targeting: GameMode::Clockwise,
            },
            history: Vec::new(),
        }
    }

    pub fn start_round(&mut self, players: Vec<Player>, rules: RoundRules) -> GameResult<()> {
        self.expect_phase(RoundPhase::Idle, "start a round")?;
        if players.len() < MIN_PLAYERS {
            return Err(GameError::InsufficientPlayers);
        }

        self.passes_used = players.iter().map(|p| (p.id.clone(), 0)).collect();
        self.players = players;
        self.current_player_index = 0;
        self.task_type = None;
        self.target_player_index = None;
        self.rules = rules;
        self.history.clear();
        self.phase = RoundPhase::InTurn;

        tracing::debug!(players = self.players.len(), ?rules, "Round started");
        Ok(())
    }

    /// Applies the current player's choice.
    ///
    /// `target` is only consulted in [`GameMode::Anyone`] and only for choices
    /// that produce a task.
    pub fn choose<R: Rng>(
        &mut self,
        choice: Choice,
        target: Option<&str>,
        rng: &mut R,
        content: &dyn ContentSource,
    ) -> GameResult<ChoiceOutcome> {
        self.expect_phase(RoundPhase::InTurn, "choose")?;

        match choice {
            Choice::Pass => {
                let player_id = self.players[self.current_player_index].id.clone();
                let used = self.passes_used.get(&player_id).copied().unwrap_or(0);
                if !self.rules.max_passes.allows(used) {
                    return Err(GameError::PassLimitExceeded);
                }
                self.passes_used.insert(player_id.clone(), used + 1);
                self.step();
                Ok(ChoiceOutcome::Passed {
                    player_id,
                    passes_used: used + 1,
                })
            }
            Choice::Random => {
                let target = self.resolve_target(target)?;
                let task_type = if rng.random_bool(0.5) {
                    TaskType::Truth
                } else {
                    TaskType::Dare
                };
                let text = content.random_content(task_type, rng as &mut dyn RngCore);
                let record = self.deliver(task_type, target, text);
                Ok(ChoiceOutcome::Delivered(record))
            }
            Choice::Truth | Choice::Dare => {
                let target = self.resolve_target(target)?;
                let task_type = if choice == Choice::Truth {
                    TaskType::Truth
                } else {
                    TaskType::Dare
                };
                self.task_type = Some(task_type);
                self.target_player_index = Some(target);
                self.phase = RoundPhase::AwaitingTaskInput;
                Ok(ChoiceOutcome::AwaitingTask {
                    task_type,
                    target: self.players[target].id.clone(),
                })
            }
        }
    }

    pub fn submit_task(&mut self, text: &str) -> GameResult<TaskRecord> {
        self.expect_phase(RoundPhase::AwaitingTaskInput, "submit a task")?;

        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::EmptyTask);
        }
        if text.chars().count() > MAX_TASK_LEN {
            return Err(GameError::TaskTooLong { max: MAX_TASK_LEN });
        }

        let (Some(task_type), Some(target)) = (self.task_type, self.target_player_index) else {
            return Err(GameError::InvalidStateTransition {
                operation: "submit a task",
                state: "no task was chosen",
            });
        };
        Ok(self.deliver(task_type, target, text.to_string()))
    }

    /// Drops a pending truth/dare selection without using up the turn.
    pub fn cancel_task(&mut self) -> GameResult<()> {
        self.expect_phase(RoundPhase::AwaitingTaskInput, "cancel a task")?;
        self.clear_task();
        self.phase = RoundPhase::InTurn;
        Ok(())
    }

    /// Moves the turn to the next player, discarding any pending task.
    pub fn advance_turn(&mut self) -> GameResult<()> {
        if !self.is_active() {
            return Err(GameError::InvalidStateTransition {
                operation: "advance the turn",
                state: RoundPhase::Idle.describe(),
            });
        }
        self.step();
        Ok(())
    }

    pub fn end_round(&mut self) {
        if self.phase != RoundPhase::Idle {
            tracing::debug!(tasks = self.history.len(), "Round ended");
        }
        self.phase = RoundPhase::Idle;
        self.clear_task();
    }

    pub fn is_active(&self) -> bool {
        self.phase != RoundPhase::Idle
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn current_player_index(&self) -> usize {
        self.current_player_index
    }

    pub fn current_player(&self) -> Option<&Player> {
        if self.is_active() {
            self.players.get(self.current_player_index)
        } else {
            None
        }
    }

    pub fn task_type(&self) -> Option<TaskType> {
        self.task_type
    }

    pub fn target_player_index(&self) -> Option<usize> {
        self.target_player_index
    }

    pub fn passes_used(&self) -> &PassCounts {
        &self.passes_used
    }

    pub fn max_passes(&self) -> PassLimit {
        self.rules.max_passes
    }

    pub fn history(&self) -> &[TaskRecord] {
        &self.history
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            players: self.players.clone(),
            current_player_index: self.current_player_index,
            current_player: self.current_player().cloned(),
            phase: self.phase,
            task_type: self.task_type,
            target_player_index: self.target_player_index,
            passes_used: self.passes_used.clone(),
            max_passes: self.rules.max_passes,
            active: self.is_active(),
            history: self.history.clone(),
        }
    }

    fn expect_phase(&self, phase: RoundPhase, operation: &'static str) -> GameResult<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(GameError::InvalidStateTransition {
                operation,
                state: self.phase.describe(),
            })
        }
    }

    fn resolve_target(&self, requested: Option<&str>) -> GameResult<usize> {
        match self.rules.targeting {
            GameMode::Clockwise => Ok((self.current_player_index + 1) % self.players.len()),
            GameMode::Anyone => {
                let id = requested.ok_or(GameError::TargetRequired)?;
                self.players
                    .iter()
                    .position(|p| p.id == id)
                    .filter(|&i| i != self.current_player_index)
                    .ok_or(GameError::InvalidTarget)
            }
        }
    }

    fn deliver(&mut self, task_type: TaskType, target: usize, content: String) -> TaskRecord {
        let record = TaskRecord {
            from_player_id: self.players[self.current_player_index].id.clone(),
            to_player_id: self.players[target].id.clone(),
            task_type,
            content,
            delivered_at: chrono::Utc::now(),
        };
        self.history.push(record.clone());
        self.step();
        record
    }

    fn step(&mut self) {
        self.current_player_index = (self.current_player_index + 1) % self.players.len();
        self.clear_task();
        self.phase = RoundPhase::InTurn;
    }

    fn clear_task(&mut self) {
        self.task_type = None;
        self.target_player_index = None;
    }
}

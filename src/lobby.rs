use rand::Rng;

use crate::error::{GameError, GameResult};
use crate::types::{GameSettings, LobbyView, Player, PlayerId};

pub const LOBBY_CODE_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 30;
pub const DEFAULT_MAX_PLAYERS: usize = 8;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn create_lobby_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..LOBBY_CODE_LEN)
        .map(|_| char::from(CODE_CHARS[rng.random_range(0..CODE_CHARS.len())]))
        .collect()
}

/// Trims a player name and checks its length.
pub fn validate_name(name: &str) -> GameResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::NameTooLong { max: MAX_NAME_LEN });
    }
    Ok(name.to_string())
}

/// Normalizes user-typed lobby codes to the generated form.
pub fn normalize_code(code: &str) -> GameResult<String> {
    let code = code.trim().to_uppercase();
    if code.chars().count() != LOBBY_CODE_LEN || !code.bytes().all(|b| CODE_CHARS.contains(&b)) {
        return Err(GameError::InvalidLobbyCode);
    }
    Ok(code)
}

/// Players gathering before a game starts.
#[derive(Debug, Clone)]
pub struct Lobby {
    pub id: String,
    pub code: String,
    pub settings: GameSettings,
    pub players: Vec<Player>,
    pub max_players: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Lobby {
    /// Creates a lobby with `host_name` as its first player.
    pub fn new(
        code: String,
        host_name: &str,
        settings: GameSettings,
        max_players: usize,
    ) -> GameResult<Self> {
        let host = Player::new(validate_name(host_name)?, true);
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            settings,
            players: vec![host],
            max_players,
            created_at: chrono::Utc::now(),
        })
    }

    pub fn host_id(&self) -> Option<&PlayerId> {
        self.players.iter().find(|p| p.is_host).map(|p| &p.id)
    }

    pub fn join(&mut self, name: &str) -> GameResult<&Player> {
        if self.is_full() {
            return Err(GameError::LobbyFull);
        }
        let name = validate_name(name)?;
        self.players.push(Player::new(name, false));
        tracing::info!(lobby = %self.code, players = self.players.len(), "Player joined lobby");
        Ok(&self.players[self.players.len() - 1])
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn can_start(&self) -> bool {
        self.players.len() >= crate::round::MIN_PLAYERS
    }

    pub fn view(&self) -> LobbyView {
        LobbyView {
            id: self.id.clone(),
            code: self.code.clone(),
            game_mode: self.settings.game_mode,
            rules_mode: self.settings.rules_mode,
            difficulty: self.settings.difficulty,
            created_at: self.created_at,
            players: self.players.clone(),
            player_count: self.players.len(),
            max_players: self.max_players,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn lobby(max_players: usize) -> Lobby {
        Lobby::new("ABC123".into(), "Alice", GameSettings::default(), max_players).unwrap()
    }

    #[test]
    fn lobby_codes_use_the_code_alphabet() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let code = create_lobby_code(&mut rng);
            assert_eq!(code.len(), LOBBY_CODE_LEN);
            assert!(code.bytes().all(|b| CODE_CHARS.contains(&b)));
            assert_eq!(normalize_code(&code), Ok(code));
        }
    }

    #[test]
    fn typed_codes_are_normalized() {
        assert_eq!(normalize_code(" abc12z "), Ok("ABC12Z".to_string()));
        assert_eq!(normalize_code("abc"), Err(GameError::InvalidLobbyCode));
        assert_eq!(normalize_code("abc-12"), Err(GameError::InvalidLobbyCode));
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("  Bob "), Ok("Bob".to_string()));
        assert_eq!(validate_name("   "), Err(GameError::EmptyName));
        assert_eq!(
            validate_name(&"n".repeat(MAX_NAME_LEN + 1)),
            Err(GameError::NameTooLong { max: MAX_NAME_LEN })
        );
        assert!(validate_name(&"n".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn creator_is_host() {
        let lobby = lobby(8);
        assert_eq!(lobby.players.len(), 1);
        assert!(lobby.players[0].is_host);
        assert_eq!(lobby.host_id(), Some(&lobby.players[0].id));
        assert!(!lobby.can_start());
    }

    #[test]
    fn join_adds_guests_until_full() {
        let mut lobby = lobby(3);
        let bob = lobby.join("Bob").unwrap().clone();
        assert!(!bob.is_host);
        assert!(lobby.can_start());
        lobby.join("Carol").unwrap();
        assert_eq!(lobby.join("Dave").unwrap_err(), GameError::LobbyFull);
        assert_eq!(lobby.players.len(), 3);
    }

    #[test]
    fn join_rejects_bad_names_without_adding() {
        let mut lobby = lobby(8);
        assert_eq!(lobby.join("").unwrap_err(), GameError::EmptyName);
        assert_eq!(lobby.players.len(), 1);
    }

    #[test]
    fn view_counts_players() {
        let mut lobby = lobby(8);
        lobby.join("Bob").unwrap();
        let view = lobby.view();
        assert_eq!(view.player_count, 2);
        assert_eq!(view.max_players, 8);
        assert_eq!(view.code, "ABC123");
    }
}

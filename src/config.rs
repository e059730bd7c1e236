use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::ContentLibrary;
use crate::lobby::DEFAULT_MAX_PLAYERS;
use crate::round::DEFAULT_PASSES_WITH_RULES;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Server settings loaded from game.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    #[serde(default = "default_passes")]
    pub max_passes_with_rules: u32,
}

fn default_max_players() -> usize {
    DEFAULT_MAX_PLAYERS
}

fn default_passes() -> u32 {
    DEFAULT_PASSES_WITH_RULES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_players: default_max_players(),
            max_passes_with_rules: default_passes(),
        }
    }
}

/// Config directory, from `CONFIG_PATH` or `./config`.
pub fn config_dir() -> PathBuf {
    PathBuf::from(std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string()))
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let data = serde_json::to_string_pretty(value).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, data).map_err(io_err(path))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let data = fs::read_to_string(path).map_err(io_err(path))?;
    serde_json::from_str(&data).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Initialize the config directory with defaults if missing.
pub fn init(base: &Path) -> Result<(), ConfigError> {
    if !base.exists() {
        fs::create_dir_all(base).map_err(io_err(base))?;
    }

    let game_path = base.join("game.json");
    if !game_path.exists() {
        write_json(&game_path, &ServerConfig::default())?;
        tracing::info!("Wrote default {}", game_path.display());
    }

    let content_path = base.join("content.json");
    if !content_path.exists() {
        write_json(&content_path, &ContentLibrary::default())?;
        tracing::info!("Wrote default {}", content_path.display());
    }

    Ok(())
}

pub fn load_server_config(base: &Path) -> Result<ServerConfig, ConfigError> {
    read_json(&base.join("game.json"))
}

/// Load the content library, falling back to the built-in one when the file
/// is absent.
pub fn load_content(base: &Path) -> Result<ContentLibrary, ConfigError> {
    let path = base.join("content.json");
    if !path.exists() {
        tracing::warn!("{} not found, using built-in content", path.display());
        return Ok(ContentLibrary::default());
    }
    read_json(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tod-config-{name}-{}", uuid::Uuid::new_v4()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn init_writes_loadable_defaults() {
        let dir = scratch_dir("init");
        init(&dir).unwrap();

        assert_eq!(load_server_config(&dir).unwrap(), ServerConfig::default());
        assert_eq!(load_content(&dir).unwrap(), ContentLibrary::default());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn init_keeps_existing_files() {
        let dir = scratch_dir("keep");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("game.json"), r#"{"maxPlayers": 4}"#).unwrap();
        init(&dir).unwrap();

        let config = load_server_config(&dir).unwrap();
        assert_eq!(config.max_players, 4);
        assert_eq!(config.max_passes_with_rules, 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_content_uses_builtin() {
        let dir = scratch_dir("missing");
        assert_eq!(load_content(&dir).unwrap(), ContentLibrary::default());
    }

    #[test]
    fn malformed_json_is_reported() {
        let dir = scratch_dir("bad");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("game.json"), "{not json").unwrap();
        assert!(matches!(
            load_server_config(&dir),
            Err(ConfigError::Json { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}

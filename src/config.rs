use crate::game::{
    default_forbidden_words, CompletionMode, EngineConfig, FragmentPolicy, DEFAULT_TOPIC,
};
use crate::ledger::LedgerFormat;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "storychain.toml";

/// Contents of `storychain.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorychainConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub game: GameConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LedgerConfig {
    /// Ledger file; relative paths resolve against the data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub format: LedgerFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub fragment_policy: FragmentPolicy,
    #[serde(default)]
    pub completion: CompletionMode,
    #[serde(default)]
    pub seed_text: Option<String>,
    /// Round numbers that may be loaded; any round when absent
    #[serde(default)]
    pub allowed_rounds: Option<Vec<u32>>,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_forbidden_words")]
    pub forbidden_words: Vec<String>,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            fragment_policy: FragmentPolicy::default(),
            completion: CompletionMode::default(),
            seed_text: None,
            allowed_rounds: None,
            topic: default_topic(),
            forbidden_words: default_forbidden_words(),
        }
    }
}

impl GameConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            fragment_policy: self.fragment_policy.clone(),
            completion: self.completion,
            seed_text: self.seed_text.clone(),
            allowed_rounds: self.allowed_rounds.clone().into(),
            default_topic: self.topic.clone(),
            default_forbidden_words: self.forbidden_words.clone(),
        }
    }
}

impl StorychainConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    /// Where the ledger lives, given the data directory
    pub fn ledger_path(&self, data_dir: &Path) -> PathBuf {
        let default_name = match self.ledger.format {
            LedgerFormat::Jsonl => "rounds.jsonl",
            LedgerFormat::Legacy => "game_log.txt",
        };
        match &self.ledger.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => data_dir.join(path),
            None => data_dir.join(default_name),
        }
    }
}

/// `$STORYCHAIN_DIR`, falling back to `~/.storychain`
pub fn data_dir() -> PathBuf {
    std::env::var("STORYCHAIN_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".storychain")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::AllowedRounds;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorychainConfig::load(&temp_dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.game.engine_config(), EngineConfig::default());
        assert_eq!(config.ledger.format, LedgerFormat::Jsonl);
    }

    #[test]
    fn test_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
[ledger]
path = "logs/game_log.txt"
format = "legacy"

[game]
topic = "fantasy novel"
forbidden_words = ["그리고", "하지만"]
seed_text = "Long ago"
allowed_rounds = [1, 2, 3]
fragment_policy = { kind = "first_tokens", count = 3 }
completion = { mode = "count_threshold", limit = 15 }
"#,
        )
        .unwrap();

        let config = StorychainConfig::load(&path).unwrap();
        let engine = config.game.engine_config();
        assert_eq!(engine.default_topic, "fantasy novel");
        assert_eq!(engine.fragment_policy, FragmentPolicy::FirstTokens { count: 3 });
        assert_eq!(engine.completion, CompletionMode::CountThreshold { limit: 15 });
        assert_eq!(engine.seed_text.as_deref(), Some("Long ago"));
        assert!(matches!(engine.allowed_rounds, AllowedRounds::Only(ref r) if r.len() == 3));
        assert_eq!(
            config.ledger_path(temp_dir.path()),
            temp_dir.path().join("logs/game_log.txt")
        );
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[game]\ncompletion = { mode = \"forever\" }\n").unwrap();
        assert!(StorychainConfig::load(&path).is_err());
    }
}

//! Game state and the knobs that shape a round
//!
//! A round is one play-through of the story game: contributors take turns
//! adding a fragment until the completion rule fires. Everything here is plain
//! data; the rules that mutate it live in [`crate::engine`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a fragment is cut out of a submitted message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FragmentPolicy {
    /// First whitespace-delimited token only
    #[default]
    FirstToken,
    /// Up to `count` leading tokens, joined by a single space
    FirstTokens { count: usize },
    /// The whole message, trimmed
    Verbatim,
}

impl FragmentPolicy {
    /// Extract the fragment, or `None` when nothing usable remains
    pub fn extract(&self, text: &str) -> Option<String> {
        let fragment = match self {
            FragmentPolicy::FirstToken => text.split_whitespace().next()?.to_string(),
            FragmentPolicy::FirstTokens { count } => {
                let tokens: Vec<&str> = text.split_whitespace().take((*count).max(1)).collect();
                tokens.join(" ")
            }
            FragmentPolicy::Verbatim => text.trim().to_string(),
        };

        if fragment.is_empty() {
            None
        } else {
            Some(fragment)
        }
    }
}

/// When a round is considered finished
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompletionMode {
    /// Finish once the story holds `limit` fragments
    CountThreshold { limit: usize },
    /// Finish after exactly one accepted contribution
    SingleContribution,
}

impl Default for CompletionMode {
    fn default() -> Self {
        CompletionMode::CountThreshold {
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Round numbers that may be loaded and listed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AllowedRounds {
    #[default]
    Unbounded,
    Only(BTreeSet<u32>),
}

impl AllowedRounds {
    pub fn contains(&self, round: u32) -> bool {
        match self {
            AllowedRounds::Unbounded => true,
            AllowedRounds::Only(rounds) => rounds.contains(&round),
        }
    }
}

impl From<Option<Vec<u32>>> for AllowedRounds {
    fn from(rounds: Option<Vec<u32>>) -> Self {
        match rounds {
            Some(rounds) => AllowedRounds::Only(rounds.into_iter().collect()),
            None => AllowedRounds::Unbounded,
        }
    }
}

pub const DEFAULT_LIMIT: usize = 3;
pub const DEFAULT_TOPIC: &str = "free topic";

pub fn default_forbidden_words() -> Vec<String> {
    vec!["and".to_string(), "but".to_string()]
}

/// Everything that distinguishes one game variant from another
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub fragment_policy: FragmentPolicy,
    pub completion: CompletionMode,
    pub seed_text: Option<String>,
    pub allowed_rounds: AllowedRounds,
    pub default_topic: String,
    pub default_forbidden_words: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fragment_policy: FragmentPolicy::default(),
            completion: CompletionMode::default(),
            seed_text: None,
            allowed_rounds: AllowedRounds::default(),
            default_topic: DEFAULT_TOPIC.to_string(),
            default_forbidden_words: default_forbidden_words(),
        }
    }
}

/// Per-round overrides for `start` and `load_round`
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub topic: Option<String>,
    pub limit: Option<usize>,
    pub forbidden: Option<Vec<String>>,
    pub seed_text: Option<String>,
    pub round_number: Option<u32>,
}

/// Split a comma-separated word list, dropping blanks
pub fn parse_word_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
}

/// The mutable record of the round being played
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameState {
    pub active: bool,
    pub contributions: Vec<String>,
    pub last_contributor: Option<String>,
    pub forbidden_words: Vec<String>,
    pub contribution_limit: Option<usize>,
    /// Distinct contributors, first-seen order
    pub participants: Vec<String>,
    pub round_number: Option<u32>,
    pub topic: String,
    /// Set when the round completed but its ledger write failed
    pub unsaved: bool,
}

impl GameState {
    pub fn phase(&self) -> Phase {
        if self.active {
            Phase::Active
        } else {
            Phase::Idle
        }
    }

    /// The story so far, fragments joined by single spaces
    pub fn text(&self) -> String {
        self.contributions.join(" ")
    }

    /// First forbidden entry found inside `fragment`, ignoring case
    pub fn forbidden_match(&self, fragment: &str) -> Option<&str> {
        let haystack = fragment.to_lowercase();
        self.forbidden_words
            .iter()
            .find(|word| haystack.contains(&word.to_lowercase()))
            .map(String::as_str)
    }

    pub(crate) fn add_participant(&mut self, contributor: &str) {
        if !self.participants.iter().any(|p| p == contributor) {
            self.participants.push(contributor.to_string());
        }
    }

    pub fn board(&self) -> Board {
        Board {
            topic: self.topic.clone(),
            text: self.text(),
            count: self.contributions.len(),
            limit: self.contribution_limit,
            completed: !self.active && !self.contributions.is_empty(),
            active: self.active,
            round_number: self.round_number,
            participants: self.participants.clone(),
            last_contributor: self.last_contributor.clone(),
            forbidden_words: self.forbidden_words.clone(),
            unsaved: self.unsaved,
        }
    }
}

/// Snapshot of a round, rendered for the host
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub topic: String,
    pub text: String,
    pub count: usize,
    pub limit: Option<usize>,
    pub completed: bool,
    pub active: bool,
    pub round_number: Option<u32>,
    pub participants: Vec<String>,
    pub last_contributor: Option<String>,
    pub forbidden_words: Vec<String>,
    pub unsaved: bool,
}

impl Board {
    /// Progress indicator such as `2/3`, or just the count without a limit
    pub fn progress(&self) -> String {
        match self.limit {
            Some(limit) => format!("{}/{}", self.count, limit),
            None => self.count.to_string(),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.completed {
            writeln!(f, "🏁 **Story complete!**")?;
            writeln!(f, "\"{}\"", self.text)?;
            writeln!(f)?;
            write!(f, "Participants: {}", self.participants.join(", "))?;
            if self.unsaved {
                write!(f, "\n⚠️ This story could not be saved to the round ledger.")?;
            }
            return Ok(());
        }

        let state = if self.active { "in progress" } else { "idle" };
        writeln!(f, "📖 Story ({}) - {}", state, self.progress())?;
        writeln!(f, "📍 Topic: [{}]", self.topic)?;
        if let Some(round) = self.round_number {
            writeln!(f, "🔢 Round: {}", round)?;
        }
        if self.text.is_empty() {
            writeln!(f, "(no words yet)")?;
        } else {
            writeln!(f, "\"{}\"", self.text)?;
        }
        if let Some(last) = &self.last_contributor {
            writeln!(f, "⏭️ Last turn: {}", last)?;
        }
        write!(f, "🚫 Forbidden: {}", self.forbidden_words.join(", "))
    }
}

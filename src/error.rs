//! Error taxonomy for the story game and its ledger

use thiserror::Error;

/// Failures of the round ledger store
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode ledger entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Every way a game operation can be refused
#[derive(Debug, Error)]
pub enum GameError {
    #[error("no round is in progress")]
    InactiveRound,

    #[error("{contributor} contributed last; someone else has to go next")]
    RepeatedTurn { contributor: String },

    #[error("'{fragment}' contains the forbidden word '{word}'")]
    ForbiddenWord { fragment: String, word: String },

    #[error("round {round} not found")]
    RoundNotFound { round: u32 },

    #[error("round ledger is unavailable: {0}")]
    LedgerUnavailable(#[source] LedgerError),

    /// The round completed in memory, but the ledger write failed.
    #[error("round completed but was not saved: {source}")]
    Persistence {
        final_text: String,
        #[source]
        source: LedgerError,
    },

    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl GameError {
    /// Short machine-friendly label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::InactiveRound => "inactive_round",
            GameError::RepeatedTurn { .. } => "repeated_turn",
            GameError::ForbiddenWord { .. } => "forbidden_word",
            GameError::RoundNotFound { .. } => "round_not_found",
            GameError::LedgerUnavailable(_) => "ledger_unavailable",
            GameError::Persistence { .. } => "persistence_error",
            GameError::MalformedInput(_) => "malformed_input",
        }
    }
}

pub type GameResult<T> = std::result::Result<T, GameError>;

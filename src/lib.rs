//! Storychain - a one-word story building game served over MCP
//!
//! Players take turns adding a word (or short phrase) to a shared story.
//! Nobody may play twice in a row, forbidden words are rejected, and every
//! completed story is appended to a durable round ledger that later rounds
//! can be continued from.

pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod history;
pub mod ledger;
pub mod session;

pub use engine::{StoryEngine, SubmitOutcome};
pub use error::{GameError, LedgerError};
pub use game::{EngineConfig, StartOptions};
pub use session::GameSession;

//! Game session - the tool boundary
//!
//! Every operation locks the whole engine, so concurrent tool calls are
//! applied one at a time. Results and errors alike come back as text for the
//! host to relay.

use crate::engine::StoryEngine;
use crate::error::GameError;
use crate::game::{Board, StartOptions};
use crate::ledger::RoundLedger;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct GameSession {
    engine: Arc<Mutex<StoryEngine>>,
}

impl GameSession {
    pub fn new(engine: StoryEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    pub async fn ledger(&self) -> Arc<dyn RoundLedger> {
        self.engine.lock().await.ledger().clone()
    }

    pub async fn start_game(&self, options: StartOptions) -> String {
        let mut engine = self.engine.lock().await;
        let board = engine.start(options);
        render_start(&board)
    }

    pub async fn add_word(&self, user_name: &str, word: &str) -> String {
        let mut engine = self.engine.lock().await;
        match engine.submit(user_name, word) {
            Ok(outcome) if outcome.completed() => outcome.board.to_string(),
            Ok(outcome) => format!(
                "✅ ({}) {}: {}",
                outcome.board.progress(),
                user_name,
                outcome.board.text
            ),
            Err(e) => {
                tracing::debug!(kind = e.kind(), user_name, "Contribution rejected");
                render_error(&e)
            }
        }
    }

    pub async fn load_round(&self, round: u32, options: StartOptions) -> String {
        let mut engine = self.engine.lock().await;
        match engine.load_round(round, options) {
            Ok(board) => render_start(&board),
            Err(e) => render_error(&e),
        }
    }

    pub async fn list_rounds(&self) -> String {
        self.engine.lock().await.list_rounds().to_string()
    }

    pub async fn status(&self) -> String {
        self.engine.lock().await.board().to_string()
    }
}

fn render_start(board: &Board) -> String {
    let mut output = String::from("🎮 **One-word story started!**\n");
    output.push_str(&format!("📍 Topic: [{}]\n", board.topic));
    if let Some(round) = board.round_number {
        output.push_str(&format!("🔢 Round: {}\n", round));
    }
    output.push_str(&format!(
        "🚫 Forbidden: {}\n",
        if board.forbidden_words.is_empty() {
            "(none)".to_string()
        } else {
            board.forbidden_words.join(", ")
        }
    ));
    match board.limit {
        Some(limit) => output.push_str(&format!("🏁 Goal: {} words\n", limit)),
        None => output.push_str("🏁 Goal: one contribution finishes the story\n"),
    }
    if !board.text.is_empty() {
        output.push_str(&format!("📜 Continuing from: \"{}\"\n", board.text));
    }
    output.push_str("--------------------------------\n");
    output.push_str("Send the next word in 'name: word' form!");
    output
}

/// Render an operation failure for the host
pub fn render_error(error: &GameError) -> String {
    match error {
        GameError::InactiveRound => {
            "There is no game in progress. Call start_game or load_round first.".to_string()
        }
        GameError::RepeatedTurn { contributor } => format!(
            "🚫 {}, you cannot play twice in a row! Wait for someone else's turn.",
            contributor
        ),
        GameError::ForbiddenWord { word, .. } => {
            format!("❌ The forbidden word '{}' cannot be used.", word)
        }
        GameError::RoundNotFound { round } => {
            format!("🔍 Round {} has no recorded story.", round)
        }
        GameError::LedgerUnavailable(e) => {
            format!("⚠️ The round ledger could not be read: {}", e)
        }
        GameError::Persistence { final_text, source } => format!(
            "⚠️ PERSISTENCE ERROR: the story is complete but could not be saved ({}).\n\
             It exists only in memory:\n\"{}\"",
            source, final_text
        ),
        GameError::MalformedInput(reason) => format!("❓ Invalid input: {}", reason),
    }
}

//! Turn engine - applies contributions to the game state
//!
//! The engine owns one [`GameState`] and the ledger completed rounds are
//! written to. Callers are expected to serialize access (see
//! [`crate::session::GameSession`]).

use crate::error::{GameError, GameResult, LedgerError};
use crate::game::{Board, CompletionMode, EngineConfig, GameState, StartOptions};
use crate::history::{RoundIndex, RoundListing};
use crate::ledger::{LedgerEntry, RoundLedger};
use std::sync::Arc;

/// Result of an accepted contribution
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub board: Board,
    /// The fragment that was appended
    pub fragment: String,
    /// Ledger entry written when this contribution finished the round
    pub entry: Option<LedgerEntry>,
}

impl SubmitOutcome {
    pub fn completed(&self) -> bool {
        self.entry.is_some()
    }
}

pub struct StoryEngine {
    config: EngineConfig,
    state: GameState,
    ledger: Arc<dyn RoundLedger>,
}

impl StoryEngine {
    pub fn new(config: EngineConfig, ledger: Arc<dyn RoundLedger>) -> Self {
        Self {
            config,
            state: GameState::default(),
            ledger,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn ledger(&self) -> &Arc<dyn RoundLedger> {
        &self.ledger
    }

    /// Begin a fresh round, discarding any unfinished one
    pub fn start(&mut self, options: StartOptions) -> Board {
        let seed = options
            .seed_text
            .clone()
            .or_else(|| self.config.seed_text.clone());
        self.reseed(options, seed, None)
    }

    /// Validate and apply one contribution
    ///
    /// Checks run in a fixed order and nothing is mutated unless all pass.
    /// When the contribution completes the round, the round is closed before
    /// the ledger write, so a failed write still leaves the round finished.
    pub fn submit(&mut self, contributor: &str, text: &str) -> GameResult<SubmitOutcome> {
        if !self.state.active {
            return Err(GameError::InactiveRound);
        }

        if self.state.last_contributor.as_deref() == Some(contributor) {
            return Err(GameError::RepeatedTurn {
                contributor: contributor.to_string(),
            });
        }

        if contributor.trim().is_empty() {
            return Err(GameError::MalformedInput(
                "contributor name is empty".to_string(),
            ));
        }

        let fragment = self
            .config
            .fragment_policy
            .extract(text)
            .ok_or_else(|| GameError::MalformedInput("contribution is empty".to_string()))?;

        if let Some(word) = self.state.forbidden_match(&fragment) {
            return Err(GameError::ForbiddenWord {
                word: word.to_string(),
                fragment,
            });
        }

        self.state.contributions.push(fragment.clone());
        self.state.last_contributor = Some(contributor.to_string());
        self.state.add_participant(contributor);

        tracing::debug!(
            contributor,
            fragment = %fragment,
            count = self.state.contributions.len(),
            "Accepted contribution"
        );

        if !self.completion_reached() {
            return Ok(SubmitOutcome {
                board: self.state.board(),
                fragment,
                entry: None,
            });
        }

        self.state.active = false;
        match self.persist() {
            Ok(entry) => Ok(SubmitOutcome {
                board: self.state.board(),
                fragment,
                entry: Some(entry),
            }),
            Err(source) => {
                self.state.unsaved = true;
                tracing::error!(
                    ledger = %self.ledger.location().display(),
                    "Failed to record completed round: {}",
                    source
                );
                Err(GameError::Persistence {
                    final_text: self.state.text(),
                    source,
                })
            }
        }
    }

    fn completion_reached(&self) -> bool {
        match self.config.completion {
            CompletionMode::SingleContribution => true,
            CompletionMode::CountThreshold { .. } => self
                .state
                .contribution_limit
                .is_some_and(|limit| self.state.contributions.len() >= limit),
        }
    }

    fn persist(&self) -> Result<LedgerEntry, LedgerError> {
        let entry = LedgerEntry::new(
            self.state.round_number,
            self.state.text(),
            self.state.participants.clone(),
            Some(self.state.topic.clone()),
        );
        self.ledger.append(&entry)?;

        tracing::info!(
            round = ?entry.round_number,
            participants = entry.participants.len(),
            "Round completed and recorded"
        );
        Ok(entry)
    }

    /// Re-seed a round from the latest ledger entry for `round`
    pub fn load_round(&mut self, round: u32, options: StartOptions) -> GameResult<Board> {
        if !self.config.allowed_rounds.contains(round) {
            return Err(GameError::RoundNotFound { round });
        }

        let entries = self
            .ledger
            .entries()
            .map_err(GameError::LedgerUnavailable)?;
        let index = RoundIndex::from_entries(entries);
        let entry = index
            .latest(round)
            .ok_or(GameError::RoundNotFound { round })?;

        let topic = entry.topic.clone();
        let seed = Some(entry.final_text.clone());
        let options = StartOptions {
            round_number: Some(round),
            ..options
        };
        Ok(self.reseed(options, seed, topic))
    }

    /// Latest text per allowed round; never fails
    pub fn list_rounds(&self) -> RoundListing {
        match self.ledger.entries() {
            Ok(entries) => {
                let index = RoundIndex::from_entries(entries);
                RoundListing {
                    rounds: index.summarize(&self.config.allowed_rounds),
                    total_entries: index.total_entries(),
                    note: None,
                }
            }
            Err(e) => {
                tracing::warn!("Could not read round ledger: {}", e);
                RoundListing {
                    rounds: RoundIndex::default().summarize(&self.config.allowed_rounds),
                    total_entries: 0,
                    note: Some(format!("ledger could not be read: {}", e)),
                }
            }
        }
    }

    pub fn board(&self) -> Board {
        self.state.board()
    }

    fn reseed(
        &mut self,
        options: StartOptions,
        seed: Option<String>,
        fallback_topic: Option<String>,
    ) -> Board {
        if self.state.active {
            tracing::info!(
                words = self.state.contributions.len(),
                "Discarding unfinished round"
            );
        }

        let contribution_limit = match self.config.completion {
            CompletionMode::SingleContribution => None,
            CompletionMode::CountThreshold { limit } => Some(options.limit.unwrap_or(limit).max(1)),
        };

        let forbidden_words = options
            .forbidden
            .unwrap_or_else(|| self.config.default_forbidden_words.clone())
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();

        let topic = options
            .topic
            .filter(|t| !t.trim().is_empty())
            .or(fallback_topic)
            .unwrap_or_else(|| self.config.default_topic.clone());

        self.state = GameState {
            active: true,
            contributions: seed.filter(|s| !s.is_empty()).into_iter().collect(),
            last_contributor: None,
            forbidden_words,
            contribution_limit,
            participants: Vec::new(),
            round_number: options.round_number,
            topic,
            unsaved: false,
        };

        tracing::info!(
            round = ?self.state.round_number,
            limit = ?self.state.contribution_limit,
            topic = %self.state.topic,
            "Round started"
        );
        self.state.board()
    }
}

//! Common test utilities

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use storychain::game::EngineConfig;
use storychain::ledger::{JsonLinesLedger, LegacyTextLedger, RoundLedger};
use storychain::StoryEngine;
use tempfile::TempDir;

/// Engine backed by a JSON Lines ledger inside a fresh temp dir
pub fn jsonl_engine(config: EngineConfig) -> (TempDir, StoryEngine) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let ledger: Arc<dyn RoundLedger> =
        Arc::new(JsonLinesLedger::new(temp_dir.path().join("rounds.jsonl")));
    (temp_dir, StoryEngine::new(config, ledger))
}

/// Engine backed by a legacy text ledger inside a fresh temp dir
pub fn legacy_engine(config: EngineConfig) -> (TempDir, StoryEngine) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let ledger: Arc<dyn RoundLedger> =
        Arc::new(LegacyTextLedger::new(legacy_path(&temp_dir)));
    (temp_dir, StoryEngine::new(config, ledger))
}

pub fn legacy_path(dir: &TempDir) -> PathBuf {
    dir.path().join("game_log.txt")
}

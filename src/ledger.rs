//! Round ledger - durable, append-only record of completed rounds
//!
//! Two on-disk formats share the [`RoundLedger`] trait:
//! - JSON Lines, one entry per line (the default)
//! - the legacy plain-text block format, kept so existing ledger files stay
//!   readable and so rounds can be exported back to it
//!
//! A missing ledger file is an empty history, never an error.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Timestamp layout, second precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One completed round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_number: Option<u32>,
    pub final_text: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl LedgerEntry {
    /// Build an entry stamped with the current local time
    pub fn new(
        round_number: Option<u32>,
        final_text: String,
        participants: Vec<String>,
        topic: Option<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            round_number,
            final_text,
            participants,
            topic,
        }
    }
}

/// Storage backend for completed rounds
pub trait RoundLedger: Send + Sync {
    /// Append one entry; the write is complete when this returns
    fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerError>;

    /// Append a batch with a single write; nothing is written if any entry
    /// cannot be encoded
    fn append_all(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError>;

    /// Every entry in write order
    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError>;

    fn location(&self) -> &Path;
}

/// On-disk format selector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerFormat {
    #[default]
    Jsonl,
    Legacy,
}

/// Open a ledger of the given format at `path`
pub fn open_ledger(format: LedgerFormat, path: PathBuf) -> Arc<dyn RoundLedger> {
    match format {
        LedgerFormat::Jsonl => Arc::new(JsonLinesLedger::new(path)),
        LedgerFormat::Legacy => Arc::new(LegacyTextLedger::new(path)),
    }
}

/// Copy every entry of `from` into `to`, returning how many were written
///
/// The target is left untouched when any entry cannot be written to it.
pub fn migrate(from: &dyn RoundLedger, to: &dyn RoundLedger) -> Result<usize, LedgerError> {
    let entries = from.entries()?;
    to.append_all(&entries)?;
    tracing::info!(
        count = entries.len(),
        from = %from.location().display(),
        to = %to.location().display(),
        "Migrated ledger entries"
    );
    Ok(entries.len())
}

fn read_optional(path: &Path) -> Result<Option<String>, LedgerError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn append_raw(path: &Path, data: &str) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

// ==================== JSON Lines ====================

/// One JSON object per line
#[derive(Debug, Clone)]
pub struct JsonLinesLedger {
    path: PathBuf,
}

impl JsonLinesLedger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RoundLedger for JsonLinesLedger {
    fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        self.append_all(std::slice::from_ref(entry))
    }

    fn append_all(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        let mut lines = String::new();
        for entry in entries {
            lines.push_str(&serde_json::to_string(entry)?);
            lines.push('\n');
        }
        if lines.is_empty() {
            return Ok(());
        }
        append_raw(&self.path, &lines)
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let Some(content) = read_optional(&self.path)? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(
                    line = index + 1,
                    path = %self.path.display(),
                    "Skipping unreadable ledger line: {}",
                    e
                ),
            }
        }
        Ok(entries)
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

// ==================== Legacy text blocks ====================

pub const LEGACY_SEPARATOR: &str = "========================================";
const ROUND_PREFIX: &str = "game ";
const ROUND_SUFFIX: &str = "회차";
const TEXT_LABEL: &str = "완성된 문장: ";
const PARTICIPANTS_LABEL: &str = "참여자: ";

/// Human-readable blocks:
///
/// ```text
/// [2026-10-16 12:00:00]
/// game 5회차
/// 완성된 문장: hello there friend
/// 참여자: alice, bob
/// ========================================
/// ```
///
/// The round line is omitted for rounds without a number.
#[derive(Debug, Clone)]
pub struct LegacyTextLedger {
    path: PathBuf,
}

impl LegacyTextLedger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read a legacy file that must exist, as opposed to a live ledger
    pub fn read_existing(path: &Path) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Render one entry as a block, separator included
    ///
    /// Texts must fit on one line. Participant names are comma separated, so
    /// a name may not contain a comma or start or end with whitespace.
    pub fn render_block(entry: &LedgerEntry) -> io::Result<String> {
        let single_line = |s: &str| !s.contains(['\n', '\r']);
        if !single_line(entry.final_text.as_str()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "legacy ledger texts must fit on a single line",
            ));
        }
        if let Some(name) = entry
            .participants
            .iter()
            .find(|p| !single_line(p.as_str()) || p.contains(',') || p.trim() != p.as_str())
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("participant {:?} cannot be written to a legacy ledger", name),
            ));
        }

        let mut block = format!("[{}]\n", entry.timestamp);
        if let Some(round) = entry.round_number {
            block.push_str(&format!("{}{}{}\n", ROUND_PREFIX, round, ROUND_SUFFIX));
        }
        block.push_str(&format!("{}{}\n", TEXT_LABEL, entry.final_text));
        block.push_str(&format!(
            "{}{}\n",
            PARTICIPANTS_LABEL,
            entry.participants.join(", ")
        ));
        block.push_str(LEGACY_SEPARATOR);
        block.push('\n');
        Ok(block)
    }

    /// Parse every complete block; blocks without a text line are dropped
    pub fn parse(content: &str) -> Vec<LedgerEntry> {
        let mut entries = Vec::new();
        let mut block = PartialBlock::default();

        for line in content.lines() {
            if is_separator(line) {
                if let Some(entry) = std::mem::take(&mut block).finish() {
                    entries.push(entry);
                }
                continue;
            }
            block.feed(line);
        }

        // tolerate a missing trailing separator
        if let Some(entry) = block.finish() {
            entries.push(entry);
        }
        entries
    }
}

fn is_separator(line: &str) -> bool {
    let line = line.trim();
    line.chars().count() >= 3 && line.chars().all(|c| matches!(c, '=' | '─' | '━'))
}

fn parse_round_header(line: &str) -> Option<u32> {
    line.trim()
        .strip_prefix(ROUND_PREFIX)?
        .strip_suffix(ROUND_SUFFIX)?
        .trim()
        .trim_matches('`')
        .parse()
        .ok()
}

#[derive(Default)]
struct PartialBlock {
    timestamp: Option<String>,
    round_number: Option<u32>,
    final_text: Option<String>,
    participants: Vec<String>,
}

impl PartialBlock {
    fn feed(&mut self, line: &str) {
        if let Some(text) = line.strip_prefix(TEXT_LABEL) {
            self.final_text = Some(text.to_string());
        } else if let Some(list) = line.strip_prefix(PARTICIPANTS_LABEL) {
            self.participants = list
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        } else if let Some(round) = parse_round_header(line) {
            self.round_number = Some(round);
        } else if let Some(ts) = line
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            self.timestamp = Some(ts.to_string());
        }
    }

    fn finish(self) -> Option<LedgerEntry> {
        Some(LedgerEntry {
            timestamp: self.timestamp.unwrap_or_default(),
            round_number: self.round_number,
            final_text: self.final_text?,
            participants: self.participants,
            topic: None,
        })
    }
}

impl RoundLedger for LegacyTextLedger {
    fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let block = Self::render_block(entry)?;
        append_raw(&self.path, &block)
    }

    fn append_all(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        let blocks = entries
            .iter()
            .map(Self::render_block)
            .collect::<io::Result<String>>()?;
        if blocks.is_empty() {
            return Ok(());
        }
        append_raw(&self.path, &blocks)
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(read_optional(&self.path)?
            .map(|content| Self::parse(&content))
            .unwrap_or_default())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(round: Option<u32>, text: &str) -> LedgerEntry {
        LedgerEntry {
            timestamp: "2026-10-16 12:00:00".to_string(),
            round_number: round,
            final_text: text.to_string(),
            participants: vec!["alice".to_string(), "bob".to_string()],
            topic: None,
        }
    }

    #[test]
    fn test_jsonl_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = JsonLinesLedger::new(temp_dir.path().join("none.jsonl"));
        assert!(ledger.entries().unwrap().is_empty());
    }

    #[test]
    fn test_jsonl_append_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = JsonLinesLedger::new(temp_dir.path().join("nested/rounds.jsonl"));

        ledger.append(&entry(Some(1), "first story")).unwrap();
        ledger.append(&entry(None, "second story")).unwrap();

        let entries = ledger.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], entry(Some(1), "first story"));
        assert_eq!(entries[1].round_number, None);
    }

    #[test]
    fn test_jsonl_skips_garbage_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rounds.jsonl");
        let good = serde_json::to_string(&entry(Some(2), "kept")).unwrap();
        fs::write(&path, format!("not json\n\n{}\n", good)).unwrap();

        let entries = JsonLinesLedger::new(path).entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].final_text, "kept");
    }

    #[test]
    fn test_legacy_block_shape() {
        let block = LegacyTextLedger::render_block(&entry(Some(5), "hello there friend")).unwrap();
        assert_eq!(
            block,
            "[2026-10-16 12:00:00]\ngame 5회차\n완성된 문장: hello there friend\n참여자: alice, bob\n========================================\n"
        );
    }

    #[test]
    fn test_legacy_parse_handwritten_file() {
        let content = "[2025-01-02 03:04:05]\n\
                       game `3`회차\n\
                       완성된 문장:  spaced  text\n\
                       참여자: kim, lee\n\
                       ━━━━━━━━━━━━━━━━━━━━\n\
                       [2025-01-03 00:00:00]\n\
                       완성된 문장: no round here\n\
                       참여자: \n\
                       ====\n\
                       stray line without text\n\
                       ====\n";

        let entries = LegacyTextLedger::parse(content);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].round_number, Some(3));
        assert_eq!(entries[0].final_text, " spaced  text");
        assert_eq!(entries[0].participants, vec!["kim", "lee"]);
        assert_eq!(entries[0].timestamp, "2025-01-02 03:04:05");
        assert_eq!(entries[1].round_number, None);
        assert!(entries[1].participants.is_empty());
    }

    #[test]
    fn test_legacy_roundtrip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = LegacyTextLedger::new(temp_dir.path().join("game_log.txt"));

        let written = entry(Some(7), "한 단어 이야기");
        ledger.append(&written).unwrap();
        ledger.append(&entry(Some(8), "another")).unwrap();

        let entries = ledger.entries().unwrap();
        assert_eq!(entries, vec![written, entry(Some(8), "another")]);
    }

    #[test]
    fn test_legacy_rejects_multiline_text() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = LegacyTextLedger::new(temp_dir.path().join("game_log.txt"));

        let err = ledger.append(&entry(None, "two\nlines")).unwrap_err();
        assert!(matches!(err, LedgerError::Io(e) if e.kind() == io::ErrorKind::InvalidData));
        assert!(ledger.entries().unwrap().is_empty());
    }

    #[test]
    fn test_legacy_rejects_names_that_break_the_participant_list() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = LegacyTextLedger::new(temp_dir.path().join("game_log.txt"));

        for name in ["kim, jr", " padded", "trailing "] {
            let mut written = entry(Some(1), "story");
            written.participants = vec![name.to_string()];
            let err = ledger.append(&written).unwrap_err();
            assert!(matches!(err, LedgerError::Io(e) if e.kind() == io::ErrorKind::InvalidData));
        }
        assert!(ledger.entries().unwrap().is_empty());
    }

    #[test]
    fn test_read_existing_requires_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("typo.txt");

        let err = LegacyTextLedger::read_existing(&missing).unwrap_err();
        assert!(matches!(err, LedgerError::Io(e) if e.kind() == io::ErrorKind::NotFound));
        assert!(LegacyTextLedger::new(missing).entries().unwrap().is_empty());
    }

    #[test]
    fn test_migrate_writes_nothing_when_an_entry_does_not_fit() {
        let temp_dir = TempDir::new().unwrap();
        let jsonl = JsonLinesLedger::new(temp_dir.path().join("rounds.jsonl"));
        let legacy = LegacyTextLedger::new(temp_dir.path().join("game_log.txt"));

        jsonl.append(&entry(Some(1), "fits")).unwrap();
        jsonl.append(&entry(Some(2), "two\nlines")).unwrap();

        assert!(migrate(&jsonl, &legacy).is_err());
        assert!(!legacy.location().exists());
    }

    #[test]
    fn test_migrate_jsonl_to_legacy() {
        let temp_dir = TempDir::new().unwrap();
        let jsonl = JsonLinesLedger::new(temp_dir.path().join("rounds.jsonl"));
        let legacy = LegacyTextLedger::new(temp_dir.path().join("game_log.txt"));

        jsonl.append(&entry(Some(1), "one")).unwrap();
        jsonl.append(&entry(Some(2), "two")).unwrap();

        assert_eq!(migrate(&jsonl, &legacy).unwrap(), 2);
        let texts: Vec<_> = legacy
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.final_text)
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
    }
}

//! History loader - addresses ledger entries by round number

use crate::game::AllowedRounds;
use crate::ledger::LedgerEntry;
use std::collections::BTreeMap;
use std::fmt;

/// Latest entry per round number, built from a full ledger scan
#[derive(Debug, Clone, Default)]
pub struct RoundIndex {
    latest: BTreeMap<u32, LedgerEntry>,
    total_entries: usize,
}

impl RoundIndex {
    /// Later entries for the same round replace earlier ones
    pub fn from_entries(entries: Vec<LedgerEntry>) -> Self {
        let total_entries = entries.len();
        let mut latest = BTreeMap::new();
        for entry in entries {
            if let Some(round) = entry.round_number {
                latest.insert(round, entry);
            }
        }
        Self {
            latest,
            total_entries,
        }
    }

    pub fn latest(&self, round: u32) -> Option<&LedgerEntry> {
        self.latest.get(&round)
    }

    /// Known round numbers, ascending
    pub fn rounds(&self) -> Vec<u32> {
        self.latest.keys().copied().collect()
    }

    pub fn total_entries(&self) -> usize {
        self.total_entries
    }

    pub fn summarize(&self, allowed: &AllowedRounds) -> Vec<RoundSummary> {
        let rounds = match allowed {
            AllowedRounds::Unbounded => self.rounds(),
            AllowedRounds::Only(rounds) => rounds.iter().copied().collect(),
        };

        rounds
            .into_iter()
            .map(|round| RoundSummary {
                round,
                record: self.latest(round).cloned(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub round: u32,
    /// `None` when the ledger holds nothing for this round
    pub record: Option<LedgerEntry>,
}

/// Result of `list_rounds`; a read failure is carried as a note
#[derive(Debug, Clone, PartialEq)]
pub struct RoundListing {
    pub rounds: Vec<RoundSummary>,
    /// Every entry in the ledger, superseded and unnumbered ones included
    pub total_entries: usize,
    pub note: Option<String>,
}

impl fmt::Display for RoundListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📚 Story rounds")?;
        if let Some(note) = &self.note {
            writeln!(f, "⚠️ {}", note)?;
        }
        if self.rounds.is_empty() {
            return write!(f, "\nNo rounds recorded yet.");
        }

        for summary in &self.rounds {
            match &summary.record {
                Some(entry) => write!(
                    f,
                    "\n• Round {}: \"{}\" ({}; {})",
                    summary.round,
                    entry.final_text,
                    entry.participants.join(", "),
                    entry.timestamp
                )?,
                None => write!(f, "\n• Round {}: no record", summary.round)?,
            }
        }
        if self.total_entries > 0 {
            write!(f, "\n\n{} stories recorded in total", self.total_entries)?;
        }
        Ok(())
    }
}

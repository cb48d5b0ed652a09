//! Property-based tests for the turn engine using proptest
//!
//! These tests verify invariants that should hold for any sequence of turns.

mod common;

use proptest::prelude::*;
use storychain::game::{EngineConfig, FragmentPolicy, StartOptions};
use storychain::GameError;

fn player() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["alice", "bob", "carol"]).prop_map(str::to_string)
}

fn message() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}",
        "[a-z]{1,5} [a-z]{1,5}",
        Just("and".to_string()),
        Just("BUTTER".to_string()),
        Just("   ".to_string()),
    ]
}

proptest! {
    /// Property: the story grows by exactly one fragment per accepted word
    /// and nothing else changes it
    #[test]
    fn test_contributions_grow_by_one(
        turns in prop::collection::vec((player(), message()), 1..40)
    ) {
        let (_dir, mut engine) = common::jsonl_engine(EngineConfig::default());
        engine.start(StartOptions { limit: Some(1000), ..Default::default() });

        for (who, text) in turns {
            let before = engine.state().contributions.clone();
            match engine.submit(&who, &text) {
                Ok(outcome) => {
                    prop_assert_eq!(engine.state().contributions.len(), before.len() + 1);
                    prop_assert_eq!(&engine.state().contributions[..before.len()], &before[..]);
                    prop_assert_eq!(engine.state().contributions.last(), Some(&outcome.fragment));
                }
                Err(_) => prop_assert_eq!(&engine.state().contributions, &before),
            }
        }
    }

    /// Property: the same contributor is never accepted twice in a row
    #[test]
    fn test_no_consecutive_turns(
        turns in prop::collection::vec((player(), "[a-z]{1,6}"), 1..40)
    ) {
        let (_dir, mut engine) = common::jsonl_engine(EngineConfig {
            default_forbidden_words: vec![],
            ..Default::default()
        });
        engine.start(StartOptions { limit: Some(1000), ..Default::default() });

        let mut last: Option<String> = None;
        for (who, text) in turns {
            let result = engine.submit(&who, &text);
            if last.as_deref() == Some(who.as_str()) {
                let is_repeated = matches!(result, Err(GameError::RepeatedTurn { .. }));
                prop_assert!(is_repeated);
            } else {
                prop_assert!(result.is_ok());
                last = Some(who);
            }
        }
    }

    /// Property: a fragment containing a forbidden substring is always rejected
    #[test]
    fn test_forbidden_substring_rejected(
        prefix in "[a-z]{0,4}",
        suffix in "[a-z]{0,4}",
        upper in any::<bool>(),
        padding in "[ \t]{0,3}",
    ) {
        let (_dir, mut engine) = common::jsonl_engine(EngineConfig {
            fragment_policy: FragmentPolicy::Verbatim,
            ..Default::default()
        });
        engine.start(StartOptions::default());

        let word = if upper { "BUT" } else { "but" };
        let text = format!("{padding}{prefix}{word}{suffix}{padding}");
        let is_forbidden = matches!(
            engine.submit("alice", &text),
            Err(GameError::ForbiddenWord { .. })
        );
        prop_assert!(is_forbidden);
        prop_assert!(engine.state().contributions.is_empty());
    }

    /// Property: completion fires exactly once and writes exactly one entry
    #[test]
    fn test_completion_happens_once(limit in 1usize..6, extra in 0usize..5) {
        let (_dir, mut engine) = common::jsonl_engine(EngineConfig::default());
        engine.start(StartOptions { limit: Some(limit), ..Default::default() });

        let players = ["alice", "bob"];
        let mut completions = 0;
        for i in 0..(limit + extra) {
            match engine.submit(players[i % 2], "word") {
                Ok(outcome) if outcome.completed() => completions += 1,
                Ok(_) => {}
                Err(e) => prop_assert!(matches!(e, GameError::InactiveRound)),
            }
        }

        prop_assert_eq!(completions, 1);
        prop_assert_eq!(engine.ledger().entries().unwrap().len(), 1);
    }
}

// src/miner/classifier.rs
//! Worker output classification
//!
//! Maps one trimmed, non-empty line of worker stdout to a [`WorkerEvent`].
//! Matching is case-insensitive and the first matching rule wins:
//!
//! 1. `accepted` → [`WorkerEvent::ShareAccepted`]
//! 2. `invalid` or `stale` → [`WorkerEvent::ShareRejected`]
//! 3. `(\d+)\s*khash/s` → [`WorkerEvent::HashRate`]
//! 4. `checking \d+` → [`WorkerEvent::SoloCheck`]
//! 5. anything else → [`WorkerEvent::StatusText`]

use crate::types::WorkerEvent;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ACCEPTED: Regex = Regex::new(r"(?i)accepted").unwrap();
    static ref REJECTED: Regex = Regex::new(r"(?i)invalid|stale").unwrap();
    static ref HASH_RATE: Regex = Regex::new(r"(?i)(\d+)\s*khash/s").unwrap();
    static ref SOLO_CHECK: Regex = Regex::new(r"(?i)checking \d+").unwrap();
}

/// Classifies one line of worker output
///
/// The caller skips empty lines. A rate whose digits overflow `u64`
/// does not count as a rate line and falls through to the later rules.
pub fn classify(line: &str) -> WorkerEvent {
    if ACCEPTED.is_match(line) {
        return WorkerEvent::ShareAccepted;
    }
    if REJECTED.is_match(line) {
        return WorkerEvent::ShareRejected;
    }
    if let Some(rate) = parse_rate(line) {
        return WorkerEvent::HashRate(rate);
    }
    if SOLO_CHECK.is_match(line) {
        return WorkerEvent::SoloCheck;
    }
    WorkerEvent::StatusText(line.to_string())
}

fn parse_rate(line: &str) -> Option<u64> {
    HASH_RATE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

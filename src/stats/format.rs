// src/stats/format.rs
//! Status text formatting
//!
//! The exact strings here are what operators see in status bars, the
//! summary grid and the taskbar tooltip.

use chrono::{DateTime, Local};

/// Formats a rate given in khash/s
///
/// A rate of 0 means the worker just connected and has no throughput yet.
pub fn format_khash(rate: u64) -> String {
    if rate > 1_000_000 {
        format!("{:.1} Ghash/s", rate as f64 / 1_000_000.0)
    } else if rate > 1_000 {
        format!("{:.1} Mhash/s", rate as f64 / 1_000.0)
    } else if rate == 0 {
        "Connected".to_string()
    } else {
        format!("{} khash/s", rate)
    }
}

/// Formats the time of the last share-like update, e.g. `- last at 09:41:05PM`
pub fn format_last_update(time: Option<&DateTime<Local>>) -> Option<String> {
    time.map(|t| format!("- last at {}", t.format("%I:%M:%S%p")))
}

/// Pool status line: `Shares: 3 accepted, 1 stale/invalid - last at ...`
pub fn shares_text(accepted: u64, invalid: u64, last_update: Option<&DateTime<Local>>) -> String {
    let mut text = format!("Shares: {} accepted", accepted);
    if invalid > 0 {
        text.push_str(&format!(", {} stale/invalid", invalid));
    }
    append_time(text, last_update)
}

/// Solo status line: `Difficulty 1 hashes: 7 - last at ...`
pub fn solo_text(diff1_hashes: u64, last_update: Option<&DateTime<Local>>) -> String {
    append_time(format!("Difficulty 1 hashes: {}", diff1_hashes), last_update)
}

fn append_time(mut text: String, last_update: Option<&DateTime<Local>>) -> String {
    if let Some(suffix) = format_last_update(last_update) {
        text.push(' ');
        text.push_str(&suffix);
    }
    text
}

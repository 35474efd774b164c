//! Shared helpers for progress reporting, date formatting, and log hygiene.

use chrono::Local;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Counts completed units of work across concurrent tasks and logs a
/// milestone every `every` completions.
///
/// The counter is atomic so classification tasks can increment it from a
/// `buffer_unordered` fan-out without coordination. Milestone logs are for
/// operational visibility only; nothing reads the counter back.
#[derive(Debug)]
pub struct ProgressMeter {
    label: &'static str,
    total: usize,
    done: AtomicUsize,
    every: usize,
}

impl ProgressMeter {
    pub fn new(total: usize, label: &'static str) -> Self {
        Self {
            label,
            total,
            done: AtomicUsize::new(0),
            every: 10,
        }
    }

    /// Record one completed unit, successful or not.
    pub fn increment(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.every == 0 {
            let percent = if self.total == 0 {
                100
            } else {
                (done * 100 + self.total / 2) / self.total
            };
            info!(done, total = self.total, percent, "{}", self.label);
        }
    }
}

/// Human-readable date used in the digest prompt and the Slack fallback
/// text, e.g. `Friday, August 29, 2026`.
pub fn digest_date() -> String {
    Local::now().format("%A, %B %-d, %Y").to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` bytes with an ellipsis and a byte count
/// indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

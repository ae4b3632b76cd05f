//! Log domain types
//!
//! Backend log lines arrive as raw strings over both transports. They are
//! normalized here into leveled, timestamped records: noise characters
//! (emoji, control codes) are stripped and a level is chosen by keyword
//! heuristics so the dashboard can color them.

use serde::{Deserialize, Serialize};

/// Severity/kind of a log record.
///
/// `System` is reserved for lines the monitor itself generates (transport
/// switches, timeouts, dropped frames) and for backend polling chatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Processing,
    System,
}

/// A classified log line belonging to one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Monotonically increasing id, unique within one job.
    pub id: u64,
    /// Wall-clock capture time.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub raw_message: String,
    pub cleaned_message: String,
    pub level: LogLevel,
}

// Keyword tiers checked in order; the first tier containing a match wins.
const SUCCESS_WORDS: &[&str] = &["success", "completed", "finished", "done", "ready"];
const WARNING_WORDS: &[&str] = &["warning", "warn", "failed to", "unable to", "skipped"];
const ERROR_WORDS: &[&str] = &["error", "failure", "failed", "exception", "fatal"];
const PROCESSING_WORDS: &[&str] = &["processing", "analyzing", "generating", "computing", "parsing"];
const STARTING_WORDS: &[&str] = &["starting", "started", "initializing", "uploading", "launching"];
const POLLING_WORDS: &[&str] = &["polling", "status check", "waiting for status"];

impl LogRecord {
    /// Classifies a raw backend message into a leveled record.
    ///
    /// Total: every input (including the empty string) maps to a level,
    /// defaulting to `Info` when no keyword matches.
    pub fn classify(id: u64, raw_message: &str) -> Self {
        let cleaned_message = clean_message(raw_message);
        let level = classify_level(&cleaned_message);
        Self {
            id,
            timestamp: chrono::Utc::now(),
            raw_message: raw_message.to_string(),
            cleaned_message,
            level,
        }
    }

    /// Builds a monitor-generated record at `System` level, bypassing the
    /// keyword heuristics.
    pub fn system(id: u64, message: impl Into<String>) -> Self {
        let raw_message = message.into();
        let cleaned_message = clean_message(&raw_message);
        Self {
            id,
            timestamp: chrono::Utc::now(),
            raw_message,
            cleaned_message,
            level: LogLevel::System,
        }
    }
}

/// Strips emoji, symbols and control characters, keeping letters, digits,
/// ASCII punctuation and spaces.
fn clean_message(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ' || c.is_alphanumeric())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Picks a level by case-insensitive substring match, first tier wins.
fn classify_level(cleaned: &str) -> LogLevel {
    let lower = cleaned.to_lowercase();
    let matches = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if matches(SUCCESS_WORDS) {
        LogLevel::Success
    } else if matches(WARNING_WORDS) {
        LogLevel::Warning
    } else if matches(ERROR_WORDS) {
        LogLevel::Error
    } else if matches(PROCESSING_WORDS) {
        LogLevel::Processing
    } else if matches(STARTING_WORDS) {
        LogLevel::Processing
    } else if matches(POLLING_WORDS) {
        LogLevel::System
    } else {
        LogLevel::Info
    }
}

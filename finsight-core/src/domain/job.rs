//! Job domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::log::LogRecord;

/// Analysis stage a job moves through, derived from reported percentage.
///
/// The order is total: `Upload < Analyze < Generate < Complete`. A job's
/// stage never moves backward even if the backend reports a lower
/// percentage than one already observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Upload,
    Analyze,
    Generate,
    Complete,
}

impl Stage {
    /// Maps a completion percentage to a stage.
    ///
    /// Thresholds: below 25 is `Upload`, 25–84 is `Analyze`, 85–99 is
    /// `Generate`, 100 and above is `Complete`.
    pub fn from_percentage(pct: u8) -> Self {
        match pct {
            0..=24 => Stage::Upload,
            25..=84 => Stage::Analyze,
            85..=99 => Stage::Generate,
            _ => Stage::Complete,
        }
    }
}

/// A monitored analysis job.
///
/// Created when monitoring starts (after submission has returned an id)
/// and mutated only by the monitor task. Once `terminal` is true every
/// mutator becomes a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub stage: Stage,
    /// Last reported completion percentage, clamped to be non-decreasing.
    pub percentage: u8,
    /// Last human-readable status message, if any was reported.
    pub status_text: Option<String>,
    /// Set when the job finished with a failure; mutually exclusive with
    /// a successful terminal state.
    pub error: Option<String>,
    pub terminal: bool,
    pub logs: Vec<LogRecord>,
}

impl Job {
    /// Creates a fresh job in `Upload` stage at 0%.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            stage: Stage::Upload,
            percentage: 0,
            status_text: None,
            error: None,
            terminal: false,
            logs: Vec::new(),
        }
    }

    /// Applies a progress report.
    ///
    /// The percentage is clamped so it never decreases, and the stage is
    /// taken as the max of the current stage and the mapped one.
    pub fn record_progress(&mut self, percentage: u8, message: Option<String>) {
        if self.terminal {
            return;
        }
        let percentage = percentage.min(100);
        if percentage > self.percentage {
            self.percentage = percentage;
        }
        self.stage = self.stage.max(Stage::from_percentage(self.percentage));
        if message.is_some() {
            self.status_text = message;
        }
    }

    /// Appends a classified log record for a raw backend message.
    pub fn record_log(&mut self, raw_message: &str) {
        if self.terminal {
            return;
        }
        let id = self.next_log_id();
        self.logs.push(LogRecord::classify(id, raw_message));
    }

    /// Appends a monitor-generated system log (transport switches,
    /// timeouts, dropped frames).
    pub fn record_system_log(&mut self, message: impl Into<String>) {
        if self.terminal {
            return;
        }
        let id = self.next_log_id();
        self.logs.push(LogRecord::system(id, message));
    }

    /// Marks the job successfully finished.
    ///
    /// The stage jumps to `Complete` but the percentage keeps the last
    /// explicitly reported value.
    pub fn complete(&mut self) {
        if self.terminal {
            return;
        }
        self.stage = Stage::Complete;
        self.terminal = true;
    }

    /// Marks the job failed with the given error description.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.terminal {
            return;
        }
        self.error = Some(error.into());
        self.terminal = true;
    }

    /// Marks the job terminal without an error. A cancellation is not a
    /// failure.
    pub fn cancel(&mut self) {
        if self.terminal {
            return;
        }
        self.terminal = true;
    }

    fn next_log_id(&self) -> u64 {
        self.logs.len() as u64
    }
}

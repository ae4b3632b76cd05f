//! Normalized job event union
//!
//! Both transports deliver this shape to the monitor: the push stream
//! sends it verbatim as JSON frames discriminated on `"type"`, and the
//! poll channel synthesizes the same variants from status responses.

use serde::{Deserialize, Serialize};

/// One event observed for a monitored job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// One raw log line.
    Log { message: String },
    /// Updated completion percentage with an optional status message.
    Progress {
        percentage: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Job finished successfully.
    Complete,
    /// Job finished with a failure.
    Error { message: String },
    /// Keep-alive frame on the push stream; swallowed before the monitor.
    Heartbeat,
}

impl MonitorEvent {
    /// True for `Complete` and `Error`, the two events after which a job
    /// accepts no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MonitorEvent::Complete | MonitorEvent::Error { .. })
    }
}

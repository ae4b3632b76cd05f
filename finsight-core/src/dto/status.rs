//! Status endpoint DTOs

use serde::{Deserialize, Serialize};

/// Coarse job state reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Processing,
    Completed,
    Failed,
}

/// Response of `GET /api/status/{job_id}`.
///
/// `recent_logs` is a cumulative tail, not a delta: the backend re-sends
/// every line it has surfaced so far on each poll, and the caller is
/// responsible for diffing against lines already seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,
    #[serde(default)]
    pub recent_logs: Vec<String>,
    pub file_ready: bool,
    pub status: PollStatus,
}

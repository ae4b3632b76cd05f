//! Status-polling endpoint

use crate::DashboardClient;
use crate::error::Result;
use finsight_core::dto::status::JobStatusResponse;
use uuid::Uuid;

impl DashboardClient {
    /// Fetch the current status of a job
    ///
    /// The returned `recent_logs` is a cumulative tail: every poll
    /// re-sends all lines surfaced so far, and the caller must diff them
    /// against lines it has already recorded.
    ///
    /// # Arguments
    /// * `job_id` - The job UUID assigned at submission time
    pub async fn job_status(&self, job_id: Uuid) -> Result<JobStatusResponse> {
        let url = self.status_url(job_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}

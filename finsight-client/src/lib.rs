//! Finsight HTTP Client
//!
//! A type-safe HTTP client for the finance-operations dashboard backend.
//!
//! This crate covers the two endpoints the job monitor depends on: the
//! status-polling endpoint and the server-sent-event stream of job
//! events. Submission, authentication and artifact download live in
//! their own request wrappers elsewhere.
//!
//! # Example
//!
//! ```no_run
//! use finsight_client::DashboardClient;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), finsight_client::ClientError> {
//!     let client = DashboardClient::new("http://localhost:8080");
//!     let status = client.job_status(Uuid::new_v4()).await?;
//!     println!("progress: {}%", status.progress);
//!     Ok(())
//! }
//! ```

pub mod error;
mod events;
mod status;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use events::EventFrameStream;

use reqwest::Client;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// HTTP client for the dashboard backend API
///
/// Provides the endpoints the job monitor consumes:
/// - Job status polling (cumulative log tail + progress)
/// - The live job event stream (server-sent events)
#[derive(Debug, Clone)]
pub struct DashboardClient {
    /// Base URL of the backend (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl DashboardClient {
    /// Create a new dashboard client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the backend API (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Create a new dashboard client with a preconfigured HTTP client,
    /// e.g. one with a request timeout suited to a slow backend.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn status_url(&self, job_id: Uuid) -> String {
        format!("{}/api/status/{}", self.base_url, job_id)
    }

    pub(crate) fn events_url(&self, job_id: Uuid) -> String {
        format!("{}/api/events/{}", self.base_url, job_id)
    }

    /// Deserialize a JSON response body, or turn a non-2xx status or an
    /// unexpected payload into a typed error. The body is read once so a
    /// parse failure can carry a snippet of what the backend actually sent.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ClientError::api_error(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            ClientError::ParseError(format!("Unexpected status payload: {} (body: {})", e, preview))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_endpoint_urls_share_one_normalized_base() {
        let job_id = Uuid::new_v4();
        let client = DashboardClient::new("http://localhost:8080/");

        // The trailing slash on the base must not produce "//api/...".
        assert_eq!(
            client.status_url(job_id),
            format!("http://localhost:8080/api/status/{job_id}")
        );
        assert_eq!(
            client.events_url(job_id),
            format!("http://localhost:8080/api/events/{job_id}")
        );
    }

    #[test]
    fn test_preconfigured_http_client_builds_the_same_urls() {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        let job_id = Uuid::new_v4();
        let client = DashboardClient::with_client("http://localhost:8080", http_client);

        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(
            client.status_url(job_id),
            format!("http://localhost:8080/api/status/{job_id}")
        );
    }
}

//! Error types for the dashboard client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the dashboard backend
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse a response body or an event frame
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The event stream broke at the transport level
    #[error("Event stream failed: {0}")]
    StreamFailed(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// True for frame-level parse failures, which callers may drop and
    /// keep reading, as opposed to transport failures that end a stream.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::ParseError(_))
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_predicates() {
        let err = ClientError::api_error(404, "no such job");
        assert!(err.is_not_found());
        assert!(!err.is_server_error());

        let err = ClientError::api_error(502, "bad gateway");
        assert!(err.is_server_error());
    }

    #[test]
    fn test_parse_error_predicate() {
        let err = ClientError::ParseError("bad frame".to_string());
        assert!(err.is_parse_error());
        assert!(!ClientError::StreamFailed("reset".to_string()).is_parse_error());
    }
}

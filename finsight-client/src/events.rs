//! Live job event stream
//!
//! Converts the backend's server-sent-event response into typed
//! `MonitorEvent` values. Handles partial lines, buffering and `data:`
//! framing; non-data SSE lines (`event:`, `id:`, `retry:`, comments) are
//! skipped.

use bytes::{Bytes, BytesMut};
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::warn;
use uuid::Uuid;

use crate::DashboardClient;
use crate::error::{ClientError, Result};
use finsight_core::dto::event::MonitorEvent;

impl DashboardClient {
    /// Open the live event stream for a job
    ///
    /// Returns a stream of typed events. A malformed frame surfaces as a
    /// `ParseError` item and the stream keeps going; a transport failure
    /// surfaces as a `StreamFailed`/`RequestFailed` item and ends it.
    ///
    /// # Arguments
    /// * `job_id` - The job UUID assigned at submission time
    pub async fn job_events(&self, job_id: Uuid) -> Result<EventFrameStream> {
        use reqwest::header;

        let url = self.events_url(job_id);
        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, %job_id, "event stream request rejected");
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(EventFrameStream::new(response.bytes_stream()))
    }
}

/// Stream adapter that converts raw SSE bytes into `MonitorEvent` values.
///
/// Buffers raw bytes and only decodes text per complete line, so chunk
/// boundaries may fall anywhere, including inside a multi-byte character.
pub struct EventFrameStream {
    inner: Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>,
    buffer: BytesMut,
}

impl EventFrameStream {
    pub(crate) fn new(
        byte_stream: impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: BytesMut::new(),
        }
    }
}

impl Stream for EventFrameStream {
    type Item = Result<MonitorEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            // Try to parse a complete frame from the buffer
            if let Some(event) = try_parse_line(&mut this.buffer) {
                return Poll::Ready(Some(event));
            }

            // Need more data from the byte stream
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    // Raw bytes only; decoding waits for a complete line.
                    this.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(ClientError::StreamFailed(e.to_string()))));
                }
                Poll::Ready(None) => {
                    // Stream ended; drain whatever complete line remains
                    if this.buffer.iter().all(|b| b.is_ascii_whitespace()) {
                        return Poll::Ready(None);
                    }
                    this.buffer.extend_from_slice(b"\n");
                    if let Some(event) = try_parse_line(&mut this.buffer) {
                        return Poll::Ready(Some(event));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Try to extract and parse one complete SSE data line from the buffer.
/// Returns `None` if no complete frame is available yet.
///
/// A line is complete once its `\n` byte arrived; `\n` never appears
/// inside a multi-byte UTF-8 sequence, so every character on a complete
/// line is fully buffered.
fn try_parse_line(buffer: &mut BytesMut) -> Option<Result<MonitorEvent>> {
    loop {
        let newline_pos = buffer.iter().position(|b| *b == b'\n')?;
        let line_bytes = buffer.split_to(newline_pos + 1);
        let line = match std::str::from_utf8(&line_bytes[..newline_pos]) {
            Ok(text) => text.trim(),
            Err(e) => {
                return Some(Err(ClientError::ParseError(format!(
                    "Invalid UTF-8 in event frame: {}",
                    e
                ))));
            }
        };

        // Blank lines are SSE event separators; ":" starts a comment.
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            match serde_json::from_str::<MonitorEvent>(data) {
                Ok(event) => return Some(Ok(event)),
                Err(e) => {
                    let preview: String = data.chars().take(200).collect();
                    return Some(Err(ClientError::ParseError(format!(
                        "Failed to parse event frame: {} (data: {})",
                        e, preview
                    ))));
                }
            }
        }

        // Skip non-data lines (e.g., "event:", "id:", "retry:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn byte_chunks(chunks: &[&str]) -> Vec<std::result::Result<Bytes, reqwest::Error>> {
        chunks
            .iter()
            .map(|c| Ok(Bytes::copy_from_slice(c.as_bytes())))
            .collect()
    }

    async fn collect(chunks: &[&str]) -> Vec<Result<MonitorEvent>> {
        let stream = EventFrameStream::new(futures::stream::iter(byte_chunks(chunks)));
        stream.collect().await
    }

    #[tokio::test]
    async fn test_parses_data_frames() {
        let items = collect(&[
            "data: {\"type\":\"progress\",\"percentage\":25}\n\n",
            "data: {\"type\":\"complete\"}\n\n",
        ])
        .await;

        assert_eq!(items.len(), 2);
        assert_eq!(
            *items[0].as_ref().unwrap(),
            MonitorEvent::Progress {
                percentage: 25,
                message: None
            }
        );
        assert_eq!(*items[1].as_ref().unwrap(), MonitorEvent::Complete);
    }

    #[tokio::test]
    async fn test_buffers_partial_lines_across_chunks() {
        let items = collect(&[
            "data: {\"type\":\"log\",\"mes",
            "sage\":\"Starting analysis\"}\n\n",
        ])
        .await;

        assert_eq!(items.len(), 1);
        assert_eq!(
            *items[0].as_ref().unwrap(),
            MonitorEvent::Log {
                message: "Starting analysis".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_skips_comments_and_non_data_lines() {
        let items = collect(&[
            ": keep-alive\n",
            "event: job\n",
            "id: 7\n",
            "data: {\"type\":\"heartbeat\"}\n\n",
        ])
        .await;

        assert_eq!(items.len(), 1);
        assert_eq!(*items[0].as_ref().unwrap(), MonitorEvent::Heartbeat);
    }

    #[tokio::test]
    async fn test_malformed_frame_yields_parse_error_and_stream_continues() {
        let items = collect(&[
            "data: {not json}\n",
            "data: {\"type\":\"complete\"}\n",
        ])
        .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].as_ref().unwrap_err().is_parse_error());
        assert_eq!(*items[1].as_ref().unwrap(), MonitorEvent::Complete);
    }

    #[tokio::test]
    async fn test_multibyte_char_torn_across_chunks_is_reassembled() {
        let frame = "data: {\"type\":\"log\",\"message\":\"✅ ledger reconciled\"}\n\n";
        let split = frame.find('✅').unwrap() + 1; // inside the codepoint
        let bytes = frame.as_bytes();
        let chunks = vec![
            Ok(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..])),
        ];

        let items: Vec<_> = EventFrameStream::new(futures::stream::iter(chunks))
            .collect()
            .await;

        assert_eq!(items.len(), 1);
        assert_eq!(
            *items[0].as_ref().unwrap(),
            MonitorEvent::Log {
                message: "✅ ledger reconciled".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_long_multibyte_malformed_frame_is_reported_not_fatal() {
        let junk = format!("data: {}\n", "✓".repeat(100));
        let items = collect(&[junk.as_str(), "data: {\"type\":\"complete\"}\n"]).await;

        assert_eq!(items.len(), 2);
        assert!(items[0].as_ref().unwrap_err().is_parse_error());
        assert_eq!(*items[1].as_ref().unwrap(), MonitorEvent::Complete);
    }

    #[tokio::test]
    async fn test_final_unterminated_line_is_drained() {
        let items = collect(&["data: {\"type\":\"complete\"}"]).await;
        assert_eq!(items.len(), 1);
        assert_eq!(*items[0].as_ref().unwrap(), MonitorEvent::Complete);
    }
}

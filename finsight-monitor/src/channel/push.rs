//! Push channel
//!
//! Wraps one opened event stream for one job. Heartbeat frames are
//! swallowed here and never reach the monitor; a transport-level error is
//! reported exactly once, after which the channel only reports `Ended`.

use futures::StreamExt;
use tracing::debug;
use uuid::Uuid;

use finsight_core::dto::event::MonitorEvent;

use super::{ChannelState, EventFrames, PushSource};

/// What one call to [`PushChannel::next_event`] produced.
#[derive(Debug)]
pub enum PushOutcome {
    /// A normalized event (never a heartbeat).
    Event(MonitorEvent),
    /// A frame that could not be parsed; the frame is dropped but the
    /// stream stays open.
    Malformed { detail: String },
    /// The transport broke. Delivered exactly once per channel.
    Failed { detail: String },
    /// Clean end of stream, or the channel was already failed/closed.
    Ended,
}

/// One live server-initiated event stream for one job.
pub struct PushChannel {
    job_id: Uuid,
    stream: Option<EventFrames>,
    state: ChannelState,
}

impl PushChannel {
    /// Opens the push stream for a job.
    pub async fn open(source: &dyn PushSource, job_id: Uuid) -> anyhow::Result<Self> {
        let stream = source.open_events(job_id).await?;
        debug!(%job_id, "push channel open");
        Ok(Self {
            job_id,
            stream: Some(stream),
            state: ChannelState::Open,
        })
    }

    /// Waits for the next deliverable outcome.
    ///
    /// Heartbeats are consumed invisibly. Once the stream has failed or
    /// ended the underlying connection is released and every further call
    /// returns `Ended`.
    pub async fn next_event(&mut self) -> PushOutcome {
        loop {
            let Some(stream) = self.stream.as_mut() else {
                return PushOutcome::Ended;
            };

            match stream.next().await {
                Some(Ok(MonitorEvent::Heartbeat)) => {
                    debug!(job_id = %self.job_id, "heartbeat");
                }
                Some(Ok(event)) => return PushOutcome::Event(event),
                Some(Err(e)) if e.is_parse_error() => {
                    return PushOutcome::Malformed {
                        detail: e.to_string(),
                    };
                }
                Some(Err(e)) => {
                    self.stream = None;
                    self.state = ChannelState::Failed;
                    return PushOutcome::Failed {
                        detail: e.to_string(),
                    };
                }
                None => {
                    self.stream = None;
                    self.state = ChannelState::Closed;
                    return PushOutcome::Ended;
                }
            }
        }
    }

    /// Releases the underlying connection. Idempotent; safe after the
    /// stream has already failed or completed.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!(job_id = %self.job_id, "push channel closed");
        }
        if self.state == ChannelState::Open {
            self.state = ChannelState::Closed;
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }
}

//! Transport channels
//!
//! Two ways of observing one job, behind the same normalized event shape:
//! a push channel over the live event stream and a poll channel over the
//! status endpoint. The monitor owns exactly one of them at a time.
//!
//! The transports themselves sit behind small traits so tests can script
//! them without a live backend.

pub mod poll;
pub mod push;

pub use poll::{PollChannel, PollOutcome};
pub use push::{PushChannel, PushOutcome};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use uuid::Uuid;

use finsight_client::DashboardClient;
use finsight_core::dto::event::MonitorEvent;
use finsight_core::dto::status::JobStatusResponse;

/// Lifecycle of one transport channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Open,
    Failed,
    Closed,
}

/// Frames delivered by an opened push stream.
///
/// Parse failures arrive as `ParseError` items (the frame is dropped and
/// the stream continues); transport failures arrive as any other error
/// and end the stream.
pub type EventFrames = BoxStream<'static, finsight_client::Result<MonitorEvent>>;

/// Source of the live event stream for a job.
#[async_trait]
pub trait PushSource: Send + Sync {
    /// Opens the event stream. Errors here are treated like a transport
    /// failure: the monitor falls back to polling.
    async fn open_events(&self, job_id: Uuid) -> anyhow::Result<EventFrames>;
}

/// Source of status snapshots for a job.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetches the current status. Errors are swallowed by the poll
    /// channel and retried on the next tick.
    async fn job_status(&self, job_id: Uuid) -> anyhow::Result<JobStatusResponse>;
}

#[async_trait]
impl PushSource for DashboardClient {
    async fn open_events(&self, job_id: Uuid) -> anyhow::Result<EventFrames> {
        let stream = DashboardClient::job_events(self, job_id).await?;
        Ok(stream.boxed())
    }
}

#[async_trait]
impl StatusSource for DashboardClient {
    async fn job_status(&self, job_id: Uuid) -> anyhow::Result<JobStatusResponse> {
        Ok(DashboardClient::job_status(self, job_id).await?)
    }
}

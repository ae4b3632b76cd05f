//! Poll channel
//!
//! Fallback transport: one status request per tick, with an independent
//! watchdog bounding total elapsed time. The backend re-sends a
//! cumulative log tail on every poll, so responses are diffed through a
//! per-channel [`EventDeduplicator`] before anything is emitted.
//!
//! Individual request failures are swallowed and retried on the next
//! tick; only the watchdog ends an unfinished poll phase.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use finsight_core::dto::event::MonitorEvent;
use finsight_core::dto::status::{JobStatusResponse, PollStatus};

use super::{ChannelState, StatusSource};
use crate::dedup::EventDeduplicator;

/// What one call to [`PollChannel::next_event`] produced.
#[derive(Debug)]
pub enum PollOutcome {
    /// A normalized event synthesized from a status response.
    Event(MonitorEvent),
    /// The watchdog fired: elapsed time reached the configured bound with
    /// no terminal status. The channel has closed itself. The job's true
    /// outcome is unknown, so no error event is synthesized.
    TimedOut,
    /// The channel is closed (terminal status already delivered, or
    /// `close()` was called).
    Closed,
}

/// Recurring pull against the status endpoint for one job.
pub struct PollChannel {
    job_id: Uuid,
    source: Arc<dyn StatusSource>,
    ticker: Interval,
    deadline: Instant,
    dedup: EventDeduplicator,
    last_progress: u8,
    pending: VecDeque<MonitorEvent>,
    state: ChannelState,
}

impl PollChannel {
    /// Opens a poll channel.
    ///
    /// The first request goes out one full `interval` after open; the
    /// watchdog deadline is `max_duration` from open.
    pub fn open(
        source: Arc<dyn StatusSource>,
        job_id: Uuid,
        interval: Duration,
        max_duration: Duration,
    ) -> Self {
        let now = Instant::now();
        let mut ticker = tokio::time::interval_at(now + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(%job_id, ?interval, ?max_duration, "poll channel open");
        Self {
            job_id,
            source,
            ticker,
            deadline: now + max_duration,
            dedup: EventDeduplicator::new(),
            last_progress: 0,
            pending: VecDeque::new(),
            state: ChannelState::Open,
        }
    }

    /// Waits for the next deliverable outcome.
    ///
    /// Events synthesized from one response drain in order (new logs,
    /// then progress, then a terminal event) before the next request is
    /// issued.
    ///
    /// The watchdog deadline applies both between ticks and across a
    /// request in flight; a request that outlives the deadline is dropped.
    pub async fn next_event(&mut self) -> PollOutcome {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return PollOutcome::Event(event);
            }
            if self.state != ChannelState::Open {
                return PollOutcome::Closed;
            }

            let ticked = tokio::select! {
                _ = tokio::time::sleep_until(self.deadline) => false,
                _ = self.ticker.tick() => true,
            };

            if !ticked {
                warn!(job_id = %self.job_id, "poll watchdog fired, giving up");
                self.close();
                return PollOutcome::TimedOut;
            }

            debug!(job_id = %self.job_id, "polling job status");

            // The request itself races the same deadline: a hung backend
            // must not stall the watchdog.
            let result = tokio::select! {
                _ = tokio::time::sleep_until(self.deadline) => None,
                result = self.source.job_status(self.job_id) => Some(result),
            };

            let Some(result) = result else {
                warn!(job_id = %self.job_id, "poll watchdog fired mid-request, giving up");
                self.close();
                return PollOutcome::TimedOut;
            };

            match result {
                Ok(response) => self.ingest(response),
                Err(e) => {
                    // Transient blip: retry on the next tick.
                    warn!(job_id = %self.job_id, "status poll failed: {:#}", e);
                }
            }
        }
    }

    /// Closes the channel. Idempotent. The ticker and the watchdog are
    /// owned by the channel and are only polled from `next_event`, so a
    /// closed channel can never fire either of them again.
    pub fn close(&mut self) {
        if self.state == ChannelState::Open {
            debug!(job_id = %self.job_id, "poll channel closed");
        }
        self.state = ChannelState::Closed;
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Folds one status response into pending events: unseen log lines
    /// first, then a progress increase, then a terminal status.
    fn ingest(&mut self, response: JobStatusResponse) {
        for line in &response.recent_logs {
            if self.dedup.should_emit(line) {
                self.pending.push_back(MonitorEvent::Log {
                    message: line.clone(),
                });
            }
        }

        if response.progress > self.last_progress {
            self.last_progress = response.progress;
            self.pending.push_back(MonitorEvent::Progress {
                percentage: response.progress,
                message: response.progress_message.clone(),
            });
        }

        match response.status {
            PollStatus::Processing => {}
            PollStatus::Completed => {
                self.pending.push_back(MonitorEvent::Complete);
                self.close();
            }
            PollStatus::Failed => {
                let message = response
                    .progress_message
                    .unwrap_or_else(|| "analysis job failed".to_string());
                self.pending.push_back(MonitorEvent::Error { message });
                self.close();
            }
        }
    }
}

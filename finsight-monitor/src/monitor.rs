//! Job monitor orchestrator
//!
//! Owns the [`Job`] and exactly one live transport. Runs as a single
//! spawned task: push phase first, then at most one failover into the
//! poll phase. All progress is published as full job snapshots on a
//! watch channel; callers never touch the job directly.
//!
//! The caller who starts a monitor must cancel it (or drop the handle)
//! when it is no longer needed. `cancel()` and `close()` run on every
//! exit path, so no timer or connection outlives the task.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use finsight_client::DashboardClient;
use finsight_core::domain::job::Job;
use finsight_core::dto::event::MonitorEvent;

use crate::channel::{PollChannel, PollOutcome, PushChannel, PushOutcome, PushSource, StatusSource};
use crate::config::MonitorConfig;

/// Phase of the monitor itself, distinct from the job's stage.
///
/// `Pushing -> Polling` is the only recovery edge and runs at most once;
/// nothing leaves `Terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Idle,
    Pushing,
    Polling,
    Terminal,
}

/// Handle to a running job monitor.
///
/// Cheap to observe: `snapshot()` clones the current job, `subscribe()`
/// hands out a watch receiver for await-style observation. Dropping the
/// handle cancels the monitor task.
pub struct JobMonitor {
    job_id: Uuid,
    cancel: CancellationToken,
    job_rx: watch::Receiver<Job>,
    phase_rx: watch::Receiver<MonitorPhase>,
    task: Option<JoinHandle<()>>,
}

impl JobMonitor {
    /// Starts monitoring a submitted job. Returns immediately; all
    /// progress is delivered through the published snapshots.
    ///
    /// Never returns an error: a push stream that cannot even be opened
    /// goes down the normal failure path (one system log, then polling).
    pub fn start(
        push_source: Arc<dyn PushSource>,
        status_source: Arc<dyn StatusSource>,
        job_id: Uuid,
        config: MonitorConfig,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (job_tx, job_rx) = watch::channel(Job::new(job_id));
        let (phase_tx, phase_rx) = watch::channel(MonitorPhase::Idle);

        let task = MonitorTask {
            job_id,
            push_source,
            status_source,
            config,
            cancel: cancel.clone(),
            job_tx,
            phase_tx,
        };
        let task = tokio::spawn(task.run());

        Self {
            job_id,
            cancel,
            job_rx,
            phase_rx,
            task: Some(task),
        }
    }

    /// Starts monitoring against a live backend, using the client for
    /// both transports.
    pub fn with_client(client: DashboardClient, job_id: Uuid, config: MonitorConfig) -> Self {
        let client = Arc::new(client);
        Self::start(client.clone(), client, job_id, config)
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Clones the current job snapshot.
    pub fn snapshot(&self) -> Job {
        self.job_rx.borrow().clone()
    }

    /// Watch receiver over job snapshots; one value per applied event.
    pub fn subscribe(&self) -> watch::Receiver<Job> {
        self.job_rx.clone()
    }

    /// Current monitor phase.
    pub fn phase(&self) -> MonitorPhase {
        *self.phase_rx.borrow()
    }

    /// True once the job reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.job_rx.borrow().terminal
    }

    /// Stops monitoring. Safe to call multiple times and on an already
    /// terminal job; the task tears down whatever transport it owns and
    /// marks the job terminal with no error.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the monitor task to finish and returns the final job.
    pub async fn join(mut self) -> Job {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(job_id = %self.job_id, "monitor task panicked: {}", e);
            }
        }
        self.job_rx.borrow().clone()
    }
}

impl Drop for JobMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// How the push phase ended.
enum PushEnd {
    /// The job reached `Complete` or `error`.
    Terminal,
    /// The caller cancelled.
    Cancelled,
    /// The push transport broke; the poll phase takes over.
    Failover,
}

/// How the poll phase ended.
enum PollEnd {
    Terminal,
    Cancelled,
    /// The watchdog gave up with the job still running.
    Exhausted,
}

/// State owned by the spawned monitor task.
struct MonitorTask {
    job_id: Uuid,
    push_source: Arc<dyn PushSource>,
    status_source: Arc<dyn StatusSource>,
    config: MonitorConfig,
    cancel: CancellationToken,
    job_tx: watch::Sender<Job>,
    phase_tx: watch::Sender<MonitorPhase>,
}

impl MonitorTask {
    async fn run(self) {
        info!(job_id = %self.job_id, "monitoring started");
        self.set_phase(MonitorPhase::Pushing);

        match self.run_push_phase().await {
            PushEnd::Terminal => {
                self.finish_terminal();
                return;
            }
            PushEnd::Cancelled => {
                self.finish_cancelled();
                return;
            }
            PushEnd::Failover => {}
        }

        self.set_phase(MonitorPhase::Polling);

        match self.run_poll_phase().await {
            PollEnd::Terminal => self.finish_terminal(),
            PollEnd::Cancelled => self.finish_cancelled(),
            PollEnd::Exhausted => {
                // Outcome unknown: the job stays non-terminal and the
                // caller decides what to do with the last snapshot.
                info!(job_id = %self.job_id, "monitoring gave up without a terminal event");
            }
        }
    }

    /// Drives the push channel until a terminal event, cancellation, or a
    /// transport failure. The failover edge is taken at most once because
    /// this method runs at most once.
    async fn run_push_phase(&self) -> PushEnd {
        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return PushEnd::Cancelled,
            opened = PushChannel::open(self.push_source.as_ref(), self.job_id) => opened,
        };

        let mut channel = match opened {
            Ok(channel) => channel,
            Err(e) => {
                warn!(job_id = %self.job_id, "failed to open push stream: {:#}", e);
                self.record_failover_log();
                return PushEnd::Failover;
            }
        };

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                outcome = channel.next_event() => Some(outcome),
            };

            let Some(outcome) = outcome else {
                channel.close();
                return PushEnd::Cancelled;
            };

            match outcome {
                PushOutcome::Event(event) => {
                    if self.apply_event(event) {
                        channel.close();
                        return PushEnd::Terminal;
                    }
                }
                PushOutcome::Malformed { detail } => {
                    debug!(job_id = %self.job_id, "dropped malformed frame: {}", detail);
                    self.job_tx.send_modify(|job| {
                        job.record_system_log(format!("Dropped a malformed event frame: {detail}"));
                    });
                }
                PushOutcome::Failed { detail } => {
                    warn!(job_id = %self.job_id, "push stream failed: {}", detail);
                    channel.close();
                    self.record_failover_log();
                    return PushEnd::Failover;
                }
                PushOutcome::Ended => {
                    // A clean end should follow a terminal event. If the
                    // job is still running the stream state is unknown,
                    // so keep observing over the poll channel.
                    warn!(job_id = %self.job_id, "push stream ended with job still running");
                    channel.close();
                    self.record_failover_log();
                    return PushEnd::Failover;
                }
            }
        }
    }

    /// Drives the poll channel until a terminal event, cancellation, or
    /// its watchdog.
    async fn run_poll_phase(&self) -> PollEnd {
        info!(job_id = %self.job_id, "polling for job status");
        let mut channel = PollChannel::open(
            Arc::clone(&self.status_source),
            self.job_id,
            self.config.poll_interval,
            self.config.poll_max_duration,
        );

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                outcome = channel.next_event() => Some(outcome),
            };

            let Some(outcome) = outcome else {
                channel.close();
                return PollEnd::Cancelled;
            };

            match outcome {
                PollOutcome::Event(event) => {
                    if self.apply_event(event) {
                        channel.close();
                        return PollEnd::Terminal;
                    }
                }
                PollOutcome::TimedOut => {
                    self.job_tx.send_modify(|job| {
                        job.record_system_log(
                            "Polling timed out without a result, check the job status manually",
                        );
                    });
                    return PollEnd::Exhausted;
                }
                PollOutcome::Closed => {
                    debug!(job_id = %self.job_id, "poll channel closed without terminal event");
                    return PollEnd::Exhausted;
                }
            }
        }
    }

    /// Applies one normalized event to the job and publishes the new
    /// snapshot. Returns true once the job is terminal.
    fn apply_event(&self, event: MonitorEvent) -> bool {
        let mut terminal = false;
        self.job_tx.send_modify(|job| {
            match event {
                MonitorEvent::Log { ref message } => job.record_log(message),
                MonitorEvent::Progress {
                    percentage,
                    ref message,
                } => job.record_progress(percentage, message.clone()),
                MonitorEvent::Complete => job.complete(),
                MonitorEvent::Error { ref message } => job.fail(message.clone()),
                // Heartbeats are swallowed by the push channel.
                MonitorEvent::Heartbeat => {}
            }
            terminal = job.terminal;
        });
        terminal
    }

    fn record_failover_log(&self) {
        self.job_tx.send_modify(|job| {
            job.record_system_log("Connection interrupted, switching to polling");
        });
    }

    fn finish_terminal(&self) {
        info!(job_id = %self.job_id, "job reached a terminal state");
        self.set_phase(MonitorPhase::Terminal);
    }

    fn finish_cancelled(&self) {
        debug!(job_id = %self.job_id, "monitoring cancelled");
        self.job_tx.send_modify(|job| job.cancel());
        self.set_phase(MonitorPhase::Terminal);
    }

    fn set_phase(&self, phase: MonitorPhase) {
        self.phase_tx.send_replace(phase);
    }
}

//! End-to-end monitor scenarios against scripted transports.
//!
//! All timing runs under paused tokio time, so intervals and watchdogs
//! fire deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use uuid::Uuid;

use finsight_client::ClientError;
use finsight_core::domain::job::Stage;
use finsight_core::domain::log::LogLevel;
use finsight_core::dto::event::MonitorEvent;
use finsight_core::dto::status::{JobStatusResponse, PollStatus};
use finsight_monitor::{
    EventFrames, JobMonitor, MonitorConfig, MonitorPhase, PushSource, StatusSource,
};

const SWITCH_LOG: &str = "Connection interrupted, switching to polling";

/// What the scripted push source hands to the channel on open.
enum PushScript {
    /// Yield these frames, then end the stream.
    Frames(Vec<finsight_client::Result<MonitorEvent>>),
    /// A stream that never yields anything.
    Silent,
    /// Opening the stream itself fails.
    OpenError,
}

struct ScriptedPush {
    script: Mutex<Option<PushScript>>,
    opens: AtomicUsize,
}

impl ScriptedPush {
    fn new(script: PushScript) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Some(script)),
            opens: AtomicUsize::new(0),
        })
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushSource for ScriptedPush {
    async fn open_events(&self, _job_id: Uuid) -> anyhow::Result<EventFrames> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().take() {
            Some(PushScript::Frames(frames)) => Ok(futures::stream::iter(frames).boxed()),
            Some(PushScript::Silent) => Ok(futures::stream::pending().boxed()),
            Some(PushScript::OpenError) | None => Err(anyhow::anyhow!("event stream unavailable")),
        }
    }
}

/// Scripted status source: pops queued responses, then repeats the last
/// one forever.
struct ScriptedStatus {
    responses: Mutex<VecDeque<JobStatusResponse>>,
    last: Mutex<Option<JobStatusResponse>>,
    calls: AtomicUsize,
}

impl ScriptedStatus {
    fn new(responses: Vec<JobStatusResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedStatus {
    async fn job_status(&self, _job_id: Uuid) -> anyhow::Result<JobStatusResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            *self.last.lock().unwrap() = Some(response.clone());
            return Ok(response);
        }
        self.last
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no status available"))
    }
}

fn processing(progress: u8, logs: &[&str]) -> JobStatusResponse {
    JobStatusResponse {
        progress,
        progress_message: None,
        recent_logs: logs.iter().map(|s| s.to_string()).collect(),
        file_ready: false,
        status: PollStatus::Processing,
    }
}

fn config() -> MonitorConfig {
    MonitorConfig::new()
        .with_poll_interval(Duration::from_secs(2))
        .with_poll_max_duration(Duration::from_secs(300))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    while !condition() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_push_stream_runs_to_completion() {
    let push = ScriptedPush::new(PushScript::Frames(vec![
        Ok(MonitorEvent::Progress {
            percentage: 25,
            message: None,
        }),
        Ok(MonitorEvent::Log {
            message: "Starting analysis".to_string(),
        }),
        Ok(MonitorEvent::Heartbeat),
        Ok(MonitorEvent::Progress {
            percentage: 90,
            message: Some("Generating report".to_string()),
        }),
        Ok(MonitorEvent::Complete),
    ]));
    let status = ScriptedStatus::new(vec![]);

    let monitor = JobMonitor::start(push.clone(), status.clone(), Uuid::new_v4(), config());
    let job = monitor.join().await;

    assert!(job.terminal);
    assert!(job.error.is_none());
    assert_eq!(job.stage, Stage::Complete);
    // Percentage keeps the last reported value; complete does not force 100.
    assert_eq!(job.percentage, 90);
    assert_eq!(job.status_text.as_deref(), Some("Generating report"));

    assert_eq!(job.logs.len(), 1);
    assert_eq!(job.logs[0].cleaned_message, "Starting analysis");
    assert_eq!(job.logs[0].level, LogLevel::Processing);

    // The poll fallback never ran.
    assert_eq!(status.calls(), 0);
    assert_eq!(push.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_failover_deduplicates_polled_log_tail() {
    let push = ScriptedPush::new(PushScript::Frames(vec![
        Ok(MonitorEvent::Progress {
            percentage: 25,
            message: None,
        }),
        Err(ClientError::StreamFailed("connection reset".to_string())),
    ]));
    let status = ScriptedStatus::new(vec![
        processing(40, &["a", "b"]),
        processing(40, &["a", "b"]),
    ]);

    let monitor = JobMonitor::start(push.clone(), status.clone(), Uuid::new_v4(), config());

    // Let three polls land: the first delivers the tail, the rest repeat it.
    wait_until(|| status.calls() >= 3).await;
    monitor.cancel();
    let job = monitor.join().await;

    assert_eq!(job.percentage, 40);

    let switch_logs: Vec<_> = job
        .logs
        .iter()
        .filter(|l| l.raw_message == SWITCH_LOG)
        .collect();
    assert_eq!(switch_logs.len(), 1, "failover must be logged exactly once");
    assert_eq!(switch_logs[0].level, LogLevel::System);

    // The repeated tail produced no duplicate records.
    let raw: Vec<&str> = job
        .logs
        .iter()
        .filter(|l| l.level != LogLevel::System)
        .map(|l| l.raw_message.as_str())
        .collect();
    assert_eq!(raw, vec!["a", "b"]);

    // One push stream, one failover.
    assert_eq!(push.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_watchdog_closes_unfinished_poll_phase() {
    let push = ScriptedPush::new(PushScript::Frames(vec![Err(ClientError::StreamFailed(
        "gone".to_string(),
    ))]));
    let status = ScriptedStatus::new(vec![processing(10, &[])]);

    let monitor = JobMonitor::start(
        push.clone(),
        status.clone(),
        Uuid::new_v4(),
        MonitorConfig::new()
            .with_poll_interval(Duration::from_secs(2))
            .with_poll_max_duration(Duration::from_secs(5)),
    );

    // Run until the monitor task finishes on its own.
    let mut rx = monitor.subscribe();
    while rx.changed().await.is_ok() {}

    // Watchdog fired between the 2nd and 3rd tick, leaving the job
    // non-terminal with its outcome unknown.
    assert_eq!(monitor.phase(), MonitorPhase::Polling);
    assert_eq!(status.calls(), 2);

    let job = monitor.join().await;
    assert!(!job.terminal);
    assert!(job.error.is_none());
    let last = job.logs.last().expect("timeout must be logged");
    assert_eq!(last.level, LogLevel::System);
    assert!(last.raw_message.contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn scenario_error_event_sets_job_error() {
    let push = ScriptedPush::new(PushScript::Frames(vec![
        Ok(MonitorEvent::Progress {
            percentage: 50,
            message: None,
        }),
        Ok(MonitorEvent::Error {
            message: "ledger export crashed".to_string(),
        }),
    ]));
    let status = ScriptedStatus::new(vec![]);

    let monitor = JobMonitor::start(push, status, Uuid::new_v4(), config());
    let job = monitor.join().await;

    assert!(job.terminal);
    assert_eq!(job.error.as_deref(), Some("ledger export crashed"));
    assert_ne!(job.stage, Stage::Complete);
}

#[tokio::test(start_paused = true)]
async fn scenario_open_failure_falls_back_to_polling() {
    let push = ScriptedPush::new(PushScript::OpenError);
    let status = ScriptedStatus::new(vec![JobStatusResponse {
        progress: 100,
        progress_message: None,
        recent_logs: vec!["Report ready".to_string()],
        file_ready: true,
        status: PollStatus::Completed,
    }]);

    let monitor = JobMonitor::start(push, status, Uuid::new_v4(), config());
    let job = monitor.join().await;

    assert!(job.terminal);
    assert!(job.error.is_none());
    assert_eq!(job.stage, Stage::Complete);
    assert_eq!(job.percentage, 100);
    assert!(job.logs.iter().any(|l| l.raw_message == SWITCH_LOG));
    assert!(job.logs.iter().any(|l| l.raw_message == "Report ready"));
}

#[tokio::test(start_paused = true)]
async fn scenario_malformed_frames_are_dropped_not_fatal() {
    let push = ScriptedPush::new(PushScript::Frames(vec![
        Err(ClientError::ParseError("garbage frame".to_string())),
        Ok(MonitorEvent::Complete),
    ]));
    let status = ScriptedStatus::new(vec![]);

    let monitor = JobMonitor::start(push, status.clone(), Uuid::new_v4(), config());
    let job = monitor.join().await;

    assert!(job.terminal);
    assert!(job.error.is_none());
    assert!(
        job.logs
            .iter()
            .any(|l| l.level == LogLevel::System && l.raw_message.contains("malformed"))
    );
    // No failover happened.
    assert_eq!(status.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_push_phase_releases_everything() {
    let push = ScriptedPush::new(PushScript::Silent);
    let status = ScriptedStatus::new(vec![]);

    let monitor = JobMonitor::start(push, status.clone(), Uuid::new_v4(), config());
    tokio::task::yield_now().await;
    monitor.cancel();
    // Cancelling again is a no-op.
    monitor.cancel();

    let job = monitor.join().await;
    assert!(job.terminal);
    assert!(job.error.is_none(), "cancellation is not a failure");
    assert_eq!(status.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_poll_phase_releases_everything() {
    let push = ScriptedPush::new(PushScript::OpenError);
    let status = ScriptedStatus::new(vec![processing(10, &[])]);

    let monitor = JobMonitor::start(push, status.clone(), Uuid::new_v4(), config());
    wait_until(|| status.calls() >= 1).await;

    monitor.cancel();
    let job = monitor.join().await;

    assert!(job.terminal);
    assert!(job.error.is_none());
    let calls_after_cancel = status.calls();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(status.calls(), calls_after_cancel, "polling must stop");
}

#[tokio::test(start_paused = true)]
async fn cancel_after_terminal_is_a_noop() {
    let push = ScriptedPush::new(PushScript::Frames(vec![Ok(MonitorEvent::Complete)]));
    let status = ScriptedStatus::new(vec![]);

    let monitor = JobMonitor::start(push, status, Uuid::new_v4(), config());
    let mut rx = monitor.subscribe();
    while rx.changed().await.is_ok() {}
    assert_eq!(monitor.phase(), MonitorPhase::Terminal);

    let before = monitor.snapshot();
    monitor.cancel();
    monitor.cancel();
    let job = monitor.join().await;

    assert!(job.terminal);
    assert!(job.error.is_none());
    assert_eq!(job.logs.len(), before.logs.len());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_cancels_the_task() {
    let push = ScriptedPush::new(PushScript::Silent);
    let status = ScriptedStatus::new(vec![]);

    let monitor = JobMonitor::start(push, status.clone(), Uuid::new_v4(), config());
    let mut rx = monitor.subscribe();
    drop(monitor);

    // The task observes the cancellation and exits, dropping the sender.
    while rx.changed().await.is_ok() {}
    assert!(rx.borrow().terminal);
}

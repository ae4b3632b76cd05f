//! Finsight Job Monitor
//!
//! Client-side monitor for long-running backend analysis jobs.
//!
//! A caller submits a job (elsewhere), gets back a job id and starts a
//! [`JobMonitor`]. The monitor opens a live push channel for job events;
//! if that stream breaks it fails over, once, to interval polling of the
//! status endpoint, bounded by an independent watchdog. Either way the
//! caller observes the same thing: a [`finsight_core::domain::job::Job`]
//! snapshot published after every applied event.
//!
//! Architecture:
//! - Channels: [`channel::PushChannel`] and [`channel::PollChannel`] wrap
//!   the two transports behind one normalized event shape
//! - Dedup: the poll channel diffs the backend's cumulative log tail
//!   through a per-channel [`dedup::EventDeduplicator`]
//! - Orchestration: [`JobMonitor`] owns the job, exactly one live
//!   transport, and the teardown of whatever is active
//!
//! Whoever starts a monitor must call [`JobMonitor::cancel`] (or drop the
//! handle) when it is no longer needed; the monitor does not infer
//! abandonment.

pub mod channel;
pub mod config;
pub mod dedup;
pub mod monitor;

pub use channel::{ChannelState, EventFrames, PushSource, StatusSource};
pub use config::MonitorConfig;
pub use dedup::EventDeduplicator;
pub use monitor::{JobMonitor, MonitorPhase};

//! Core domain types
//!
//! This module contains the domain structures the monitor mutates and
//! publishes. They are owned by the monitor task; callers only ever see
//! cloned snapshots.

pub mod job;
pub mod log;

//! Finsight Core
//!
//! Core types for the Finsight analysis-job monitor.
//!
//! This crate contains:
//! - Domain types: the monitored entities (Job, Stage, LogRecord)
//! - DTOs: wire shapes exchanged with the dashboard backend

pub mod domain;
pub mod dto;

//! Live execution log aggregation for scheduled job runs.
//!
//! This crate consumes the jobs REST API (`/api/jobs`, `/api/logs/jobs`)
//! of an external scheduling service and maintains a live, deduplicated,
//! hierarchical view of one run's execution logs: it polls the log store
//! for new entries while the run is in a non-terminal state, merges each
//! incremental fetch into a growing ordered log, reconstructs the
//! task/subtask tree from the flat records, and stops itself once the
//! run finishes.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod processing;
pub mod viewer;

pub use client::{HttpJobsApi, JobsApi, LogBatch};
pub use config::Config;
pub use error::{AppError, Result};
pub use viewer::{spawn_poller, PollerPhase, RunLogViewer, ViewerInit};

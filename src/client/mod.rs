pub mod http;

pub use http::HttpJobsApi;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{FetchCursor, JobDetails, RawLogRecord, RunSnapshot};

/// One page of log records returned by the store
#[derive(Debug, Clone, Default)]
pub struct LogBatch {
    /// Raw records after the requested cursor position, in store order
    pub records: Vec<RawLogRecord>,

    /// New search-after cursor, when the store returned one
    pub cursor: Option<FetchCursor>,
}

/// Client abstraction over the jobs and log-store REST API.
///
/// The HTTP implementation lives in [`http::HttpJobsApi`]; tests drive
/// the viewer against in-memory implementations.
#[async_trait]
pub trait JobsApi: Send + Sync {
    /// Fetch job metadata
    async fn get_job(&self, job_id: Uuid) -> Result<JobDetails>;

    /// Trigger a new manual run of a job
    async fn create_run(&self, job_id: Uuid) -> Result<RunSnapshot>;

    /// Fetch the current snapshot of a run
    async fn get_run(&self, job_id: Uuid, run_id: Uuid) -> Result<RunSnapshot>;

    /// Fetch log records for a run after the given cursor position.
    /// An empty cursor requests a full replay from the start.
    async fn fetch_logs(&self, run_id: Uuid, cursor: &FetchCursor) -> Result<LogBatch>;

    /// Request cancellation of a running execution via the stop URL
    /// supplied by the run resource
    async fn stop_run(&self, stop_url: &str) -> Result<()>;
}

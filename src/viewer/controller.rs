use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::JobsApi;
use crate::error::AppError;
use crate::models::{FetchCursor, LogRecord, LogWarning, RawLogRecord, RunSnapshot, RunStatus};
use crate::processing::{build_log_tree, merge, normalize_batch, RootTaskGroup};
use crate::viewer::poller::PollerPhase;
use crate::viewer::reporter::{ErrorReporter, TracingErrorReporter};

/// Default fixed poll period
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Inputs required to open a log viewer on a run
#[derive(Debug, Clone)]
pub struct ViewerInit {
    /// Initial run snapshot
    pub run: RunSnapshot,

    /// Initial log batch, raw; normalized on entry
    pub logs: Vec<RawLogRecord>,

    /// Initial search-after cursor, possibly empty
    pub cursor: FetchCursor,

    /// Store-reported notices shipped with the initial payload
    pub warnings: Vec<LogWarning>,
}

/// Counters exposed for display and tests
#[derive(Debug, Clone, serde::Serialize)]
pub struct ViewerStats {
    pub log_count: usize,
    pub error_log_count: usize,
    pub poll_ticks: u64,
    pub fetch_errors: u64,
    pub malformed_records: u64,
    pub tree_rebuilds: u64,
}

/// Authoritative viewer state. Every write replaces a value wholesale;
/// the log sequence in particular is swapped, never mutated in place,
/// so the tree cache can rely on identity comparison.
struct ViewerState {
    logs: Arc<Vec<LogRecord>>,
    run: RunSnapshot,
    cursor: FetchCursor,
    warnings: Vec<LogWarning>,
    last_error: Option<String>,
    phase: PollerPhase,
    run_duration_minutes: i64,
    formatted_started_at: Option<String>,
    poll_ticks: u64,
    fetch_errors: u64,
    malformed_records: u64,
}

/// Single-entry cache of the last built task tree, keyed on the
/// identity of the log sequence it was built from
struct TreeCache {
    logs: Option<Arc<Vec<LogRecord>>>,
    tree: Option<Arc<Vec<RootTaskGroup>>>,
    rebuilds: u64,
}

/// Orchestrates log aggregation for one open run view: owns the
/// accumulated log sequence, the current run snapshot and fetch cursor,
/// and drives the normalizer, merger and tree builder.
///
/// One instance per open viewer; state is never shared across instances.
pub struct RunLogViewer {
    api: Arc<dyn JobsApi>,
    reporter: Arc<dyn ErrorReporter>,
    poll_interval: Duration,
    shutdown: CancellationToken,
    state: RwLock<ViewerState>,
    tree_cache: Mutex<TreeCache>,
}

impl RunLogViewer {
    /// Create a viewer over an initial payload.
    ///
    /// The initial batch is normalized and the run duration computed
    /// here, synchronously, before any poll tick runs.
    pub fn new(api: Arc<dyn JobsApi>, init: ViewerInit) -> Self {
        let batch = normalize_batch(init.logs);
        let run_duration_minutes = init.run.duration_in_minutes(Utc::now());
        let formatted_started_at = init.run.formatted_started_at();

        Self {
            api,
            reporter: Arc::new(TracingErrorReporter),
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown: CancellationToken::new(),
            state: RwLock::new(ViewerState {
                logs: Arc::new(batch.records),
                run: init.run,
                cursor: init.cursor,
                warnings: init.warnings,
                last_error: None,
                phase: PollerPhase::Idle,
                run_duration_minutes,
                formatted_started_at,
                poll_ticks: 0,
                fetch_errors: 0,
                malformed_records: batch.malformed,
            }),
            tree_cache: Mutex::new(TreeCache {
                logs: None,
                tree: None,
                rebuilds: 0,
            }),
        }
    }

    /// Replace the default tracing reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Override the fixed poll period
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.state.read().run.id
    }

    pub fn job_id(&self) -> Uuid {
        self.state.read().run.job_id
    }

    pub fn run_status(&self) -> RunStatus {
        self.state.read().run.status
    }

    /// Current run snapshot
    pub fn run(&self) -> RunSnapshot {
        self.state.read().run.clone()
    }

    /// Accumulated log sequence
    pub fn logs(&self) -> Arc<Vec<LogRecord>> {
        self.state.read().logs.clone()
    }

    pub fn warnings(&self) -> Vec<LogWarning> {
        self.state.read().warnings.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    pub fn phase(&self) -> PollerPhase {
        self.state.read().phase
    }

    /// Run duration in whole minutes; refreshed at construction and on
    /// each status replacement
    pub fn run_duration_minutes(&self) -> i64 {
        self.state.read().run_duration_minutes
    }

    /// Display start time, `None` while the run has not started
    pub fn formatted_started_at(&self) -> Option<String> {
        self.state.read().formatted_started_at.clone()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The task hierarchy reconstructed from the accumulated log.
    ///
    /// Cached against the identity of the log sequence: queries between
    /// merges return the cached tree without rebuilding.
    pub fn log_tree(&self) -> Arc<Vec<RootTaskGroup>> {
        let logs = self.state.read().logs.clone();

        let mut cache = self.tree_cache.lock();
        if let (Some(cached_logs), Some(tree)) = (&cache.logs, &cache.tree) {
            if Arc::ptr_eq(cached_logs, &logs) {
                return tree.clone();
            }
        }

        let tree = Arc::new(build_log_tree(&logs));
        cache.rebuilds += 1;
        cache.logs = Some(logs);
        cache.tree = Some(tree.clone());
        tree
    }

    pub fn stats(&self) -> ViewerStats {
        let state = self.state.read();
        ViewerStats {
            log_count: state.logs.len(),
            error_log_count: state
                .logs
                .iter()
                .filter(|record| record.level == crate::models::LogLevel::Error)
                .count(),
            poll_ticks: state.poll_ticks,
            fetch_errors: state.fetch_errors,
            malformed_records: state.malformed_records,
            tree_rebuilds: self.tree_cache.lock().rebuilds,
        }
    }

    /// Perform one poll tick: catch up on logs, then refresh the run
    /// snapshot. Returns the phase after the tick.
    ///
    /// Log fetch and status fetch each record their own failure and
    /// leave the loop running; a tick entered with a terminal run is a
    /// no-op.
    pub async fn poll_once(&self) -> PollerPhase {
        let (run_id, job_id, status, cursor) = {
            let state = self.state.read();
            (
                state.run.id,
                state.run.job_id,
                state.run.status,
                state.cursor.clone(),
            )
        };

        if status.is_terminal() {
            let mut state = self.state.write();
            state.phase = PollerPhase::Stopped;
            return state.phase;
        }

        match self.api.fetch_logs(run_id, &cursor).await {
            Ok(batch) => {
                let normalized = normalize_batch(batch.records);
                let mut state = self.state.write();
                let merged = merge(&state.logs, normalized.records);
                debug!(
                    run_id = %run_id,
                    total = merged.len(),
                    "Merged fetched log records"
                );
                state.logs = Arc::new(merged);
                state.malformed_records += normalized.malformed;
                state.last_error = None;
                if let Some(cursor) = batch.cursor {
                    if !cursor.is_empty() {
                        state.cursor = cursor;
                    }
                }
            }
            Err(e) => self.record_error(e),
        }

        match self.api.get_run(job_id, run_id).await {
            Ok(run) => {
                let terminal = run.status.is_terminal();
                let mut state = self.state.write();
                state.run_duration_minutes = run.duration_in_minutes(Utc::now());
                state.formatted_started_at = run.formatted_started_at();
                state.run = run;
                if terminal {
                    state.phase = PollerPhase::Stopped;
                    info!(
                        run_id = %run_id,
                        status = %state.run.status,
                        duration_minutes = state.run_duration_minutes,
                        "Run reached terminal state; polling stops"
                    );
                }
            }
            Err(e) => self.record_error(e),
        }

        let mut state = self.state.write();
        state.poll_ticks += 1;
        state.phase
    }

    /// Tear the viewer down: cancels the poll loop and any in-flight
    /// fetch so a late response cannot touch discarded state
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let mut state = self.state.write();
        state.phase = PollerPhase::Stopped;
    }

    pub(crate) fn mark_polling(&self) {
        let mut state = self.state.write();
        if state.phase == PollerPhase::Idle {
            state.phase = PollerPhase::Polling;
        }
    }

    pub(crate) fn mark_stopped(&self) {
        let mut state = self.state.write();
        state.phase = PollerPhase::Stopped;
    }

    fn record_error(&self, error: AppError) {
        {
            let mut state = self.state.write();
            state.last_error = Some(error.to_string());
            state.fetch_errors += 1;
        }
        self.reporter.report(&error);
    }
}

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Display format for log timestamps (minute precision)
pub const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Opaque search-after position in the log store, as returned in the
/// `hits.sort` field of a log query response. Replaced wholesale whenever
/// a fetch returns a non-empty new cursor; otherwise retained.
pub type FetchCursor = Vec<serde_json::Value>;

/// Log severity levels as emitted by the job execution backend
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Task-hierarchy context attached to a log record.
///
/// `root_task_id` is the top-level task of the whole execution chain and
/// never changes down the hierarchy; `parent_task_id` is the immediate
/// spawner; `task_id` identifies the emitting task itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogContext {
    /// Identifier of the emitting task
    pub task_id: Option<String>,

    /// Immediate parent task, unset for the root task
    pub parent_task_id: Option<String>,

    /// Top-level task of the execution chain
    pub root_task_id: Option<String>,

    /// Human-readable task name
    pub task_name: Option<String>,
}

/// One log entry as received from the log store, before normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLogRecord {
    /// ISO instant; the store is trusted to always supply one
    pub timestamp: Option<String>,

    /// Severity name (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    pub level: Option<String>,

    /// Log message; absent messages dedup as the empty string
    #[serde(default)]
    pub message: String,

    /// Hierarchy context, when the backend attached one
    #[serde(default)]
    pub context: Option<LogContext>,
}

/// One normalized log line emitted during a job run.
///
/// Immutable after normalization; owned exclusively by the accumulated
/// log sequence inside the viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    /// Instant the line was emitted
    pub timestamp: DateTime<Utc>,

    /// Severity level
    pub level: LogLevel,

    /// Log message
    pub message: String,

    /// Hierarchy context, when present
    pub context: Option<LogContext>,

    /// Display timestamp, computed once at normalization
    pub formatted_timestamp: String,
}

impl LogRecord {
    /// Identity key for deduplication: two records are the same iff
    /// timestamp, level and message all match, regardless of context.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.level,
            self.message
        )
    }
}

/// Informational notice reported by the log store, e.g. a truncation
/// warning when the query hit the result window limit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogWarning {
    pub message: String,
}

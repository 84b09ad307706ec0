use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::log_record::TIMESTAMP_DISPLAY_FORMAT;

/// Lifecycle states of a job run.
///
/// PENDING and RUNNING are non-terminal; every other state is terminal
/// and the viewer never resumes polling after observing one.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
    PartialSuccess,
    Cancelled,
}

impl RunStatus {
    /// Whether the run has reached a final state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Pending | RunStatus::Running)
    }
}

/// Links supplied by the run resource; `stop` is the cancellation
/// endpoint and is never constructed client-side
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunLinks {
    #[serde(rename = "self", default)]
    pub self_url: Option<String>,

    #[serde(default)]
    pub stop: Option<String>,

    #[serde(default)]
    pub logs: Option<String>,
}

/// Current known state of one job execution.
///
/// Supplied initially by the caller, then replaced wholesale on each
/// successful status poll; never partially mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Run identifier
    pub id: Uuid,

    /// Owning job identifier
    pub job_id: Uuid,

    /// Current lifecycle state
    pub status: RunStatus,

    /// Unset until the run starts executing
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    /// Unset while the run is non-terminal
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,

    /// Outcome message reported by the executor
    #[serde(default)]
    pub message: Option<String>,

    /// Display title of the run
    #[serde(default)]
    pub title: String,

    /// Resource links (self, stop, logs)
    #[serde(default)]
    pub links: Option<RunLinks>,
}

impl RunSnapshot {
    /// Run duration in whole minutes, floor-rounded.
    ///
    /// Measured from `started_at` to `finished_at`, or to `now` while the
    /// run is still executing. Zero when the run has not started.
    pub fn duration_in_minutes(&self, now: DateTime<Utc>) -> i64 {
        let Some(started) = self.started_at else {
            return 0;
        };
        let end = self.finished_at.unwrap_or(now);
        (end - started).num_minutes()
    }

    /// Display-formatted start time, `None` until the run starts
    pub fn formatted_started_at(&self) -> Option<String> {
        self.started_at
            .map(|ts| ts.format(TIMESTAMP_DISPLAY_FORMAT).to_string())
    }

    /// Cancellation URL from the run resource, when one was supplied
    pub fn stop_url(&self) -> Option<&str> {
        self.links.as_ref().and_then(|links| links.stop.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(status: RunStatus) -> RunSnapshot {
        RunSnapshot {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            status,
            started_at: None,
            finished_at: None,
            message: None,
            title: "Nightly harvest".to_string(),
            links: None,
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Success.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::PartialSuccess.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_wire_names() {
        let status: RunStatus = serde_json::from_str("\"PARTIAL_SUCCESS\"").unwrap();
        assert_eq!(status, RunStatus::PartialSuccess);
        assert_eq!(
            serde_json::to_string(&RunStatus::Cancelled).unwrap(),
            "\"CANCELLED\""
        );
        assert_eq!(RunStatus::PartialSuccess.to_string(), "PARTIAL_SUCCESS");
    }

    #[test]
    fn test_duration_not_started() {
        let run = snapshot(RunStatus::Pending);
        assert_eq!(run.duration_in_minutes(Utc::now()), 0);
        assert!(run.formatted_started_at().is_none());
    }

    #[test]
    fn test_duration_running_uses_now() {
        let mut run = snapshot(RunStatus::Running);
        run.started_at = Some(Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap());

        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 7, 59).unwrap();
        assert_eq!(run.duration_in_minutes(now), 7);
    }

    #[test]
    fn test_duration_finished_ignores_now() {
        let mut run = snapshot(RunStatus::Success);
        run.started_at = Some(Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap());
        run.finished_at = Some(Utc.with_ymd_and_hms(2025, 3, 14, 9, 31, 2).unwrap());

        let much_later = Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(run.duration_in_minutes(much_later), 31);
    }

    #[test]
    fn test_formatted_started_at_minute_precision() {
        let mut run = snapshot(RunStatus::Running);
        run.started_at = Some(Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap());
        assert_eq!(run.formatted_started_at().as_deref(), Some("2025-03-14 09:26"));
    }

    #[test]
    fn test_snapshot_deserializes_with_links() {
        let run: RunSnapshot = serde_json::from_str(
            r#"{
                "id": "11111111-2222-3333-4444-555555555555",
                "job_id": "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee",
                "status": "RUNNING",
                "started_at": "2025-03-14T09:26:53Z",
                "title": "Harvest run",
                "links": {"self": "http://x/api/jobs/a/runs/1", "stop": "http://x/api/jobs/a/runs/1/actions/stop"}
            }"#,
        )
        .unwrap();

        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());
        assert_eq!(
            run.stop_url(),
            Some("http://x/api/jobs/a/runs/1/actions/stop")
        );
    }
}

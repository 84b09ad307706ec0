use std::collections::HashSet;

use crate::models::LogRecord;

/// Merge a batch of newly fetched records into the accumulated log.
///
/// Builds the set of identity fingerprints already present, drops
/// incoming records whose fingerprint is known, and appends the
/// survivors in their original relative order. Always returns a fresh
/// sequence so downstream identity-based change detection keeps working;
/// `existing` is never mutated.
///
/// Two genuinely distinct records that share timestamp, level and
/// message are treated as duplicates. Known limitation.
pub fn merge(existing: &[LogRecord], incoming: Vec<LogRecord>) -> Vec<LogRecord> {
    let seen: HashSet<String> = existing.iter().map(LogRecord::fingerprint).collect();

    let mut merged = Vec::with_capacity(existing.len() + incoming.len());
    merged.extend_from_slice(existing);
    merged.extend(
        incoming
            .into_iter()
            .filter(|record| !seen.contains(&record.fingerprint())),
    );

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LogLevel, TIMESTAMP_DISPLAY_FORMAT};
    use chrono::{TimeZone, Utc};

    fn record(secs: u32, level: LogLevel, message: &str) -> LogRecord {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, secs).unwrap();
        LogRecord {
            timestamp: ts,
            level,
            message: message.to_string(),
            context: None,
            formatted_timestamp: ts.format(TIMESTAMP_DISPLAY_FORMAT).to_string(),
        }
    }

    #[test]
    fn test_merge_appends_new_records() {
        let existing = vec![record(1, LogLevel::Info, "start")];
        let merged = merge(&existing, vec![record(2, LogLevel::Info, "step")]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].message, "start");
        assert_eq!(merged[1].message, "step");
    }

    #[test]
    fn test_merge_suppresses_duplicates() {
        let existing = vec![record(1, LogLevel::Info, "start")];
        let merged = merge(
            &existing,
            vec![
                record(1, LogLevel::Info, "start"),
                record(2, LogLevel::Error, "fail"),
            ],
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].level, LogLevel::Error);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = vec![record(1, LogLevel::Info, "start")];
        let batch = vec![
            record(2, LogLevel::Info, "step"),
            record(3, LogLevel::Warning, "slow"),
        ];

        let once = merge(&existing, batch.clone());
        let twice = merge(&once, batch);

        assert_eq!(once.len(), twice.len());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_preserves_relative_order() {
        let existing = vec![
            record(5, LogLevel::Info, "e1"),
            record(1, LogLevel::Info, "e2"),
        ];
        let merged = merge(
            &existing,
            vec![
                record(9, LogLevel::Info, "i1"),
                record(2, LogLevel::Info, "i2"),
            ],
        );

        // Existing records first, both inputs in their own order; no
        // re-sorting by timestamp.
        let messages: Vec<&str> = merged.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["e1", "e2", "i1", "i2"]);
    }

    #[test]
    fn test_merge_returns_fresh_sequence_when_all_duplicate() {
        let existing = vec![record(1, LogLevel::Info, "start")];
        let merged = merge(&existing, vec![record(1, LogLevel::Info, "start")]);

        assert_eq!(merged.len(), 1);
        // New sequence, same contents
        assert_eq!(merged, existing);
        assert_ne!(merged.as_ptr(), existing.as_ptr());
    }

    #[test]
    fn test_merge_keeps_within_batch_duplicates() {
        let merged = merge(
            &[],
            vec![
                record(1, LogLevel::Info, "start"),
                record(1, LogLevel::Info, "start"),
            ],
        );

        // Dedup is only against the accumulated log; duplicates inside a
        // single incoming batch pass through untouched.
        assert_eq!(merged.len(), 2);
    }
}

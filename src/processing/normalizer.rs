use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{AppError, Result};
use crate::models::{LogLevel, LogRecord, RawLogRecord, TIMESTAMP_DISPLAY_FORMAT};

/// Result of normalizing a batch of raw records
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    /// Records that normalized cleanly, in input order
    pub records: Vec<LogRecord>,

    /// Records skipped because they could not be normalized
    pub malformed: u64,
}

/// Normalize one raw log record into its canonical representation.
///
/// Parses the wire timestamp and derives the display timestamp at minute
/// precision. The store is trusted to supply well-formed records; a
/// missing or unparseable timestamp (or an unknown level name) is
/// reported as `MalformedRecord`.
pub fn normalize(raw: RawLogRecord) -> Result<LogRecord> {
    let timestamp = raw
        .timestamp
        .as_deref()
        .ok_or_else(|| AppError::MalformedRecord("missing timestamp".to_string()))?;
    let timestamp = timestamp
        .parse::<DateTime<Utc>>()
        .map_err(|e| AppError::MalformedRecord(format!("bad timestamp {timestamp:?}: {e}")))?;

    let level = raw
        .level
        .as_deref()
        .ok_or_else(|| AppError::MalformedRecord("missing level".to_string()))?;
    let level = level
        .parse::<LogLevel>()
        .map_err(|_| AppError::MalformedRecord(format!("unknown level {level:?}")))?;

    Ok(LogRecord {
        timestamp,
        level,
        message: raw.message,
        context: raw.context,
        formatted_timestamp: timestamp.format(TIMESTAMP_DISPLAY_FORMAT).to_string(),
    })
}

/// Normalize a batch, skipping and counting malformed records.
///
/// A single bad line does not discard the batch; the skip count is
/// surfaced so the viewer can report it.
pub fn normalize_batch(raw: Vec<RawLogRecord>) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for record in raw {
        match normalize(record) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                batch.malformed += 1;
                warn!(error = %e, "Skipping malformed log record");
            }
        }
    }

    batch
}

//! Ingestion layer for external feed exports
//!
//! This module validates raw feed data into the records of
//! [`crate::types`] before any analytics run.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  Feed exports   │ ──► │    FeedParser    │ ──► │  RawVisitRow /  │
//! │ (JSON, grids)   │     │  ├─ VisitRow     │     │  directory /    │
//! └─────────────────┘     │  ├─ Directory    │     │  org units      │
//!                         │  └─ OrgUnit      │     └─────────────────┘
//!                         └──────────────────┘              │
//!                                                           ▼
//!                                              ┌──────────────────────┐
//!                                              │  normalize_visits    │
//!                                              │  (drops bad rows)    │
//!                                              └──────────────────────┘
//! ```

mod parser;
pub mod parsers;

pub use parser::{Feed, FeedParser, ParseResult};
pub use parsers::{DirectoryParser, OrgUnitParser, VisitRowParser};

use crate::error::DataIssue;
use crate::types::VisitEvent;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

/// Naive (offset-less) timestamp layouts seen in visit exports.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp string into an instant.
///
/// Values without an offset are read as wall-clock time in `offset`.
/// Returns `None` for anything unparseable.
pub fn parse_timestamp(raw: &str, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(ts.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
}

/// A visit row as it arrives from the feed, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawVisitRow {
    pub timestamp: Option<String>,
    pub username: Option<String>,
}

impl RawVisitRow {
    pub fn new(timestamp: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            username: Some(username.into()),
        }
    }

    fn validate(&self, offset: &FixedOffset) -> std::result::Result<VisitEvent, String> {
        let username = self
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "empty username".to_string())?;

        let raw_ts = self
            .timestamp
            .as_deref()
            .ok_or_else(|| "missing timestamp".to_string())?;
        let timestamp = parse_timestamp(raw_ts, offset)
            .ok_or_else(|| format!("unparseable timestamp '{}'", raw_ts))?;

        Ok(VisitEvent::new(username, timestamp))
    }
}

/// Output of the visit normalizer.
#[derive(Debug, Clone, Default)]
pub struct NormalizedVisits {
    /// Valid events, in input order
    pub events: Vec<VisitEvent>,
    /// Number of rows dropped
    pub skipped: usize,
    /// One [`DataIssue::MalformedEvent`] per dropped row
    pub issues: Vec<DataIssue>,
}

/// Validate raw visit rows.
///
/// Rows with an empty username or an unparseable timestamp are dropped and
/// counted. This never fails.
pub fn normalize_visits(rows: &[RawVisitRow], offset: &FixedOffset) -> NormalizedVisits {
    let mut normalized = NormalizedVisits {
        events: Vec::with_capacity(rows.len()),
        ..Default::default()
    };

    for (row, raw) in rows.iter().enumerate() {
        match raw.validate(offset) {
            Ok(event) => normalized.events.push(event),
            Err(reason) => {
                normalized.skipped += 1;
                normalized
                    .issues
                    .push(DataIssue::MalformedEvent { row, reason });
            }
        }
    }

    if normalized.skipped > 0 {
        tracing::warn!(
            skipped = normalized.skipped,
            total = rows.len(),
            "Dropped malformed visit rows"
        );
    }
    tracing::debug!(events = normalized.events.len(), "Normalized visit rows");

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::utc_offset;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        let utc = utc_offset();
        let expected = ts(2024, 1, 1, 10, 0);

        assert_eq!(parse_timestamp("2024-01-01T10:00", &utc), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T10:00:00", &utc), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T10:00:00.000", &utc), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01 10:00:00.123", &utc).map(|t| t.timestamp()), Some(expected.timestamp()));
        assert_eq!(parse_timestamp("2024-01-01T10:00:00Z", &utc), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T12:00:00+02:00", &utc), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01", &utc), Some(ts(2024, 1, 1, 0, 0)));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let utc = utc_offset();
        assert_eq!(parse_timestamp("", &utc), None);
        assert_eq!(parse_timestamp("   ", &utc), None);
        assert_eq!(parse_timestamp("yesterday", &utc), None);
        assert_eq!(parse_timestamp("2024-13-45T10:00", &utc), None);
    }

    #[test]
    fn test_naive_timestamps_use_reporting_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            parse_timestamp("2024-01-01T12:00:00", &plus_two),
            Some(ts(2024, 1, 1, 10, 0))
        );
        // An explicit offset wins over the reporting offset
        assert_eq!(
            parse_timestamp("2024-01-01T12:00:00Z", &plus_two),
            Some(ts(2024, 1, 1, 12, 0))
        );
    }

    #[test]
    fn test_normalize_drops_and_counts_bad_rows() {
        let rows = vec![
            RawVisitRow::new("2024-01-01T10:00", "alice"),
            RawVisitRow::new("not a date", "bob"),
            RawVisitRow::new("2024-01-01T11:00", "   "),
            RawVisitRow {
                timestamp: None,
                username: Some("carol".to_string()),
            },
            RawVisitRow::new("2024-01-02T09:00", " bob "),
        ];

        let normalized = normalize_visits(&rows, &utc_offset());

        assert_eq!(normalized.events.len(), 2);
        assert_eq!(normalized.skipped, 3);
        assert_eq!(normalized.events[1].username, "bob");
        assert_eq!(
            normalized.issues[0],
            DataIssue::MalformedEvent {
                row: 1,
                reason: "unparseable timestamp 'not a date'".to_string()
            }
        );
        assert!(matches!(
            normalized.issues[1],
            DataIssue::MalformedEvent { row: 2, .. }
        ));
    }

    #[test]
    fn test_normalize_empty() {
        let normalized = normalize_visits(&[], &utc_offset());
        assert!(normalized.events.is_empty());
        assert_eq!(normalized.skipped, 0);
    }
}

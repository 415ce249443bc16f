//! Error types for dashpulse-core
//!
//! Two families live here:
//! - [`Error`]: failures returned to the caller (I/O, configuration, a feed
//!   with the wrong top-level shape, invalid arguments).
//! - [`DataIssue`]: data-quality notes collected while the pipeline runs.
//!   These never abort a run; the pipeline degrades and keeps going.

use serde::Serialize;
use thiserror::Error;

/// Main error type for the dashpulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A feed export whose overall shape could not be understood
    #[error("parse error in {feed} feed: {message}")]
    Parse { feed: String, message: String },

    /// Caller passed arguments that can never be valid
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for dashpulse-core
pub type Result<T> = std::result::Result<T, Error>;

/// Data-quality problems the pipeline absorbed instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DataIssue {
    /// No start/end date was supplied; the report is empty.
    MissingWindow,
    /// A visit row was dropped during normalization.
    MalformedEvent {
        /// Zero-based index of the row in the raw feed
        row: usize,
        reason: String,
    },
    /// A visiting username had no directory entry.
    UnresolvedUser { username: String },
    /// No org units were available at the requested level.
    EmptyOrgUnitSet,
}

impl std::fmt::Display for DataIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataIssue::MissingWindow => write!(f, "no reporting window supplied"),
            DataIssue::MalformedEvent { row, reason } => {
                write!(f, "visit row {} skipped: {}", row, reason)
            }
            DataIssue::UnresolvedUser { username } => {
                write!(f, "user '{}' not found in directory", username)
            }
            DataIssue::EmptyOrgUnitSet => write!(f, "no org units at requested level"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display() {
        let issue = DataIssue::MalformedEvent {
            row: 3,
            reason: "empty username".to_string(),
        };
        assert_eq!(issue.to_string(), "visit row 3 skipped: empty username");
        assert_eq!(
            DataIssue::UnresolvedUser {
                username: "ghost".to_string()
            }
            .to_string(),
            "user 'ghost' not found in directory"
        );
    }

    #[test]
    fn test_issue_serializes_with_kind_tag() {
        let json = serde_json::to_value(DataIssue::EmptyOrgUnitSet).unwrap();
        assert_eq!(json["kind"], "emptyOrgUnitSet");
    }
}

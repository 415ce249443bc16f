//! Feed parser trait abstraction
//!
//! Each external feed (visit rows, user directory, org units) has a parser
//! implementing [`FeedParser`], turning a loosely-typed JSON export into
//! explicit records before anything reaches the analytics stages.
//!
//! ## Design Principles
//!
//! 1. **Resilience**: a bad record becomes a warning and is skipped; the rest of the feed still parses
//! 2. **Strict shape**: only an export whose overall structure is unrecognisable returns `Err`
//! 3. **No clock**: parsers never read the current time

use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;

/// The three external feeds consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Visits,
    Directory,
    OrgUnits,
}

impl Feed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::Visits => "visits",
            Feed::Directory => "directory",
            Feed::OrgUnits => "org_units",
        }
    }
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Records extracted from one feed export.
#[derive(Debug)]
pub struct ParseResult<T> {
    /// Parsed records, in feed order
    pub records: Vec<T>,
    /// Number of records dropped
    pub skipped: usize,
    /// Warnings encountered during parsing (non-fatal)
    pub warnings: Vec<String>,
}

impl<T> Default for ParseResult<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
            warnings: Vec::new(),
        }
    }
}

impl<T> ParseResult<T> {
    /// Record a skipped item with its reason.
    pub(crate) fn skip(&mut self, feed: Feed, index: usize, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(feed = %feed, index, reason = %reason, "Skipping feed record");
        self.skipped += 1;
        self.warnings.push(format!("{} record {}: {}", feed, index, reason));
    }
}

/// Trait implemented by all feed parsers.
///
/// ## Example
///
/// ```rust
/// use dashpulse_core::ingest::{FeedParser, VisitRowParser};
///
/// let export = r#"{"listGrid": {"rows": [["2024-01-01T10:00:00", "alice"]]}}"#;
/// let parsed = VisitRowParser::new().parse_str(export).unwrap();
/// assert_eq!(parsed.records.len(), 1);
/// ```
pub trait FeedParser {
    /// The validated record this feed produces
    type Record;

    /// Which feed this parser handles
    fn feed(&self) -> Feed;

    /// Parse an already-decoded JSON export.
    ///
    /// ## Error Handling
    ///
    /// - Individual record failures are added to `ParseResult::warnings`
    ///   and counted in `ParseResult::skipped`, not returned as errors
    /// - Only an unrecognised top-level shape returns `Err(Error::Parse)`
    fn parse(&self, value: &Value) -> Result<ParseResult<Self::Record>>;

    /// Parse a JSON export held in a string.
    fn parse_str(&self, input: &str) -> Result<ParseResult<Self::Record>> {
        let value: Value = serde_json::from_str(input)?;
        self.parse(&value)
    }

    /// Read and parse a JSON export from disk.
    fn parse_file(&self, path: &Path) -> Result<ParseResult<Self::Record>> {
        let content = std::fs::read_to_string(path)?;
        let result = self.parse_str(&content)?;
        tracing::debug!(
            feed = %self.feed(),
            path = %path.display(),
            records = result.records.len(),
            skipped = result.skipped,
            "Parsed feed file"
        );
        Ok(result)
    }

    /// Build the error for an unrecognised export shape.
    fn shape_error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            feed: self.feed().to_string(),
            message: message.into(),
        }
    }
}

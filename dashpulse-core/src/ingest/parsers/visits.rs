//! Visit row feed.
//!
//! The visit export is a SQL-view grid of `[timestamp, username, ...]`
//! rows. When the grid carries headers, the `timestamp` and `username`
//! columns are located by name; otherwise positions 0 and 1 are used.
//! Arrays of `{timestamp, username}` objects are accepted as well.

use serde_json::Value;

use super::{cell_text, find_grid};
use crate::error::Result;
use crate::ingest::parser::{Feed, FeedParser, ParseResult};
use crate::ingest::RawVisitRow;

/// Parser for the visit row feed.
///
/// Produces unvalidated [`RawVisitRow`]s; validation happens in
/// [`normalize_visits`](crate::ingest::normalize_visits) so that dropped
/// rows are counted in one place.
#[derive(Debug, Default, Clone)]
pub struct VisitRowParser;

impl VisitRowParser {
    pub fn new() -> Self {
        Self
    }
}

impl FeedParser for VisitRowParser {
    type Record = RawVisitRow;

    fn feed(&self) -> Feed {
        Feed::Visits
    }

    fn parse(&self, value: &Value) -> Result<ParseResult<RawVisitRow>> {
        let grid = find_grid(value)
            .ok_or_else(|| self.shape_error("expected a row grid or an array of rows"))?;

        let ts_col = grid.column(&["timestamp", "lastvisit"], 0);
        let user_col = grid.column(&["username", "user"], 1);

        let mut result = ParseResult::default();
        result.records.reserve(grid.rows.len());

        for row in grid.rows {
            let raw = match row {
                Value::Array(cells) => RawVisitRow {
                    timestamp: cell_text(cells.get(ts_col)),
                    username: cell_text(cells.get(user_col)),
                },
                Value::Object(map) => RawVisitRow {
                    timestamp: cell_text(map.get("timestamp")),
                    username: cell_text(map.get("username")),
                },
                // Keep the slot so the normalizer counts it as malformed
                _ => RawVisitRow::default(),
            };
            result.records.push(raw);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sql_view_grid() {
        let export = json!({
            "listGrid": {
                "headers": [
                    {"name": "username"},
                    {"name": "favoriteuid"},
                    {"name": "timestamp"}
                ],
                "rows": [
                    ["alice", "dash1", "2024-01-01T10:00:00.000"],
                    ["bob", "dash1", "2024-01-02T09:00:00.000"]
                ]
            }
        });

        let result = VisitRowParser::new().parse(&export).unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(
            result.records[0],
            RawVisitRow::new("2024-01-01T10:00:00.000", "alice")
        );
    }

    #[test]
    fn test_parse_positional_rows() {
        let export = json!([
            ["2024-01-01T10:00", "alice"],
            ["2024-01-01T11:00"],
            [null, "carol"]
        ]);

        let result = VisitRowParser::new().parse(&export).unwrap();
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.records[1].username, None);
        assert_eq!(result.records[2].timestamp, None);
        assert_eq!(result.skipped, 0);
    }

    #[test]
    fn test_parse_object_rows() {
        let export = json!([
            {"timestamp": "2024-01-01T10:00", "username": "alice"},
            42
        ]);
        let result = VisitRowParser::new().parse(&export).unwrap();
        assert_eq!(result.records[0], RawVisitRow::new("2024-01-01T10:00", "alice"));
        assert_eq!(result.records[1], RawVisitRow::default());
    }

    #[test]
    fn test_parse_wrong_shape() {
        let err = VisitRowParser::new().parse(&json!({"users": []})).unwrap_err();
        assert!(err.to_string().contains("visits"));
    }
}

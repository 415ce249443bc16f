//! Feed-specific parsers
//!
//! Each external feed has a parser module that implements
//! the [`FeedParser`](super::FeedParser) trait.
//!
//! | Feed | Module | Accepted shapes |
//! |------|--------|-----------------|
//! | Visits | [`visits`] | SQL-view grid, array of rows, array of objects |
//! | Directory | [`directory`] | `{"users": [...]}`, array of user objects |
//! | Org units | [`org_units`] | `{"organisationUnits": [...]}`, array of objects, SQL-view grid |

mod directory;
mod org_units;
mod visits;

pub use directory::DirectoryParser;
pub use org_units::OrgUnitParser;
pub use visits::VisitRowParser;

use serde_json::Value;

/// Tabular export: optional column names plus the rows.
pub(crate) struct Grid<'a> {
    pub headers: Vec<String>,
    pub rows: &'a [Value],
}

impl Grid<'_> {
    /// Index of the first header matching one of `names`, else `fallback`.
    pub fn column(&self, names: &[&str], fallback: usize) -> usize {
        self.headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
            .unwrap_or(fallback)
    }
}

/// Locate the row array of a SQL-view style export.
///
/// Accepts `{"sqlViewData": ...}`, `{"listGrid": ...}`,
/// `{"headers": [...], "rows": [...]}` or a bare array.
pub(crate) fn find_grid(value: &Value) -> Option<Grid<'_>> {
    match value {
        Value::Array(rows) => Some(Grid {
            headers: Vec::new(),
            rows,
        }),
        Value::Object(map) => {
            if let Some(inner) = map.get("sqlViewData").or_else(|| map.get("listGrid")) {
                return find_grid(inner);
            }
            let rows = map.get("rows")?.as_array()?;
            let headers = map
                .get("headers")
                .and_then(Value::as_array)
                .map(|hs| {
                    hs.iter()
                        .map(|h| match h {
                            Value::String(s) => s.clone(),
                            other => other
                                .get("name")
                                .or_else(|| other.get("column"))
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            Some(Grid { headers, rows })
        }
        _ => None,
    }
}

/// Text content of a grid cell; numbers are stringified, null and
/// structured values are treated as missing.
pub(crate) fn cell_text(cell: Option<&Value>) -> Option<String> {
    match cell? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

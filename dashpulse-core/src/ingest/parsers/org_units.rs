//! Org unit feed.
//!
//! Two export styles exist: the metadata listing (objects with `id`,
//! `displayName`, `path`, `level` and optional nested `children`) and the
//! SQL-view grid used for level listings (`[name, path, uid?, level?]`).

use serde_json::Value;

use super::{cell_text, find_grid, Grid};
use crate::error::Result;
use crate::ingest::parser::{Feed, FeedParser, ParseResult};
use crate::types::{path_ids, OrgUnit};

/// Parser for the org unit feed.
#[derive(Debug, Default, Clone)]
pub struct OrgUnitParser;

impl OrgUnitParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_objects(&self, items: &[Value]) -> ParseResult<OrgUnit> {
        let mut result = ParseResult::default();
        for (index, item) in items.iter().enumerate() {
            match serde_json::from_value::<OrgUnit>(item.clone()) {
                Ok(mut unit) if !unit.id.is_empty() => {
                    fill_derived_fields(&mut unit, None);
                    result.records.push(unit);
                }
                Ok(_) => result.skip(Feed::OrgUnits, index, "org unit without id"),
                Err(e) => result.skip(Feed::OrgUnits, index, e.to_string()),
            }
        }
        result
    }

    fn parse_grid(&self, grid: &Grid<'_>) -> ParseResult<OrgUnit> {
        let name_col = grid.column(&["name", "displayname"], 0);
        let path_col = grid.column(&["path"], 1);
        let id_col = grid.column(&["uid", "id"], 2);
        let level_col = grid.column(&["level", "hierarchylevel"], 3);

        let mut result = ParseResult::default();
        for (index, row) in grid.rows.iter().enumerate() {
            let Some(cells) = row.as_array() else {
                result.skip(Feed::OrgUnits, index, "grid row is not an array");
                continue;
            };
            let Some(path) = cell_text(cells.get(path_col)).filter(|p| !p.is_empty()) else {
                result.skip(Feed::OrgUnits, index, "grid row without path");
                continue;
            };
            let Some(id) = cell_text(cells.get(id_col))
                .filter(|id| !id.is_empty())
                .or_else(|| path_ids(&path).last().map(str::to_string))
            else {
                result.skip(Feed::OrgUnits, index, "grid row without id");
                continue;
            };
            let level = cell_text(cells.get(level_col))
                .and_then(|l| l.parse::<u32>().ok())
                .unwrap_or(0);
            let name = cell_text(cells.get(name_col)).unwrap_or_else(|| id.clone());

            let mut unit = OrgUnit::new(id, name, path, level);
            fill_derived_fields(&mut unit, None);
            result.records.push(unit);
        }
        result
    }
}

/// Derive a missing path and level, from the parent when there is one,
/// else from the id and the path.
fn fill_derived_fields(unit: &mut OrgUnit, parent: Option<(&str, u32)>) {
    let derived_path = unit.path.is_empty();
    if derived_path {
        unit.path = match parent {
            Some((parent_path, _)) => {
                format!("{}/{}", parent_path.trim_end_matches('/'), unit.id)
            }
            None => format!("/{}", unit.id),
        };
    }
    if unit.level == 0 {
        unit.level = match parent {
            Some((_, parent_level)) if derived_path && parent_level > 0 => parent_level + 1,
            _ => path_ids(&unit.path).count() as u32,
        };
    }
    if unit.display_name.is_empty() {
        unit.display_name = unit.id.clone();
    }

    let path = unit.path.clone();
    let level = unit.level;
    for child in &mut unit.children {
        fill_derived_fields(child, Some((&path, level)));
    }
}

impl FeedParser for OrgUnitParser {
    type Record = OrgUnit;

    fn feed(&self) -> Feed {
        Feed::OrgUnits
    }

    fn parse(&self, value: &Value) -> Result<ParseResult<OrgUnit>> {
        if let Some(items) = value.get("organisationUnits").and_then(Value::as_array) {
            return Ok(self.parse_objects(items));
        }

        let grid = find_grid(value)
            .ok_or_else(|| self.shape_error("expected organisationUnits or a row grid"))?;

        // A bare array may hold either objects or grid rows
        if grid.rows.first().map(Value::is_object).unwrap_or(false) {
            Ok(self.parse_objects(grid.rows))
        } else {
            Ok(self.parse_grid(&grid))
        }
    }
}

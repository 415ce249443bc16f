//! Core domain types for dashpulse
//!
//! These types are the validated form of the three external feeds the
//! engine consumes. The raw feed exports are parsed into them by the
//! [`crate::ingest`] parsers before any analytics run.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Visit** | One recorded opening of a dashboard by a user |
//! | **Directory entry** | A user account with roles, groups, org-unit assignments and last login |
//! | **Org unit** | A node of the organisational hierarchy (country, region, district, ...) |
//! | **Path** | `/`-delimited chain of ancestor org-unit ids, ending with the unit itself |
//! | **Level** | Depth of an org unit in the hierarchy, 1 = root |
//! | **Window** | Inclusive range of calendar dates a report covers |

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================
// Visits
// ============================================

/// A single dashboard open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitEvent {
    /// When the dashboard was opened
    pub timestamp: DateTime<Utc>,
    /// Who opened it
    pub username: String,
}

impl VisitEvent {
    pub fn new(username: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            username: username.into(),
        }
    }
}

// ============================================
// Directory
// ============================================

/// An `{id, displayName}` pair, used for roles and user groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRef {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

impl NamedRef {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// A user's assignment to an org unit.
///
/// The path is only present when the directory export includes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgUnitRef {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl OrgUnitRef {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            path: None,
        }
    }

    /// Attach the ancestor path of this assignment.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// A user account from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDirectoryEntry {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Most recent login, absent if the user never logged in
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub user_roles: Vec<NamedRef>,
    #[serde(default)]
    pub user_groups: Vec<NamedRef>,
    #[serde(default)]
    pub organisation_units: Vec<OrgUnitRef>,
}

impl UserDirectoryEntry {
    /// Minimal entry with only an id and username.
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            first_name: None,
            surname: None,
            display_name: None,
            last_login: None,
            disabled: false,
            user_roles: Vec::new(),
            user_groups: Vec::new(),
            organisation_units: Vec::new(),
        }
    }

    /// "First Surname" when either part is known.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Best label for display: display name, then full name, then username.
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.full_name())
            .unwrap_or_else(|| self.username.clone())
    }

    pub fn has_logged_in(&self) -> bool {
        self.last_login.is_some()
    }
}

// ============================================
// Org units
// ============================================

/// Split an org-unit path into its id segments.
pub fn path_ids(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// A node of the org-unit hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgUnit {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OrgUnit>,
}

impl OrgUnit {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        path: impl Into<String>,
        level: u32,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            path: path.into(),
            level,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<OrgUnit>) -> Self {
        self.children = children;
        self
    }

    /// Whether a user assignment falls under this unit.
    ///
    /// True when the assignment is this unit, when its path runs through
    /// this unit, or when it is one of the known descendants.
    pub fn covers(&self, assignment: &OrgUnitRef) -> bool {
        if assignment.id == self.id {
            return true;
        }
        if let Some(path) = &assignment.path {
            if path_ids(path).any(|id| id == self.id) {
                return true;
            }
        }
        self.has_descendant(&assignment.id)
    }

    fn has_descendant(&self, id: &str) -> bool {
        self.children
            .iter()
            .any(|child| child.id == id || child.has_descendant(id))
    }

    /// Flatten trees of org units to the units at `level`, in pre-order.
    ///
    /// Units found at the level keep their own children so subtree
    /// membership still works on the result.
    pub fn units_at_level(roots: &[OrgUnit], level: u32) -> Vec<OrgUnit> {
        let mut found = Vec::new();
        for root in roots {
            root.collect_at_level(level, &mut found);
        }
        found
    }

    fn collect_at_level(&self, level: u32, found: &mut Vec<OrgUnit>) {
        if self.level == level {
            found.push(self.clone());
            return;
        }
        if self.level > level {
            return;
        }
        for child in &self.children {
            child.collect_at_level(level, found);
        }
    }
}

// ============================================
// Reporting window
// ============================================

/// Calendar date of an instant in the reporting offset.
pub fn local_date(ts: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    ts.with_timezone(offset).date_naive()
}

/// Inclusive range of calendar dates covered by a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl ReportWindow {
    /// Create a window; `start` after `end` is a caller bug.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidArgument(format!(
                "window start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` calendar days ending with `end` (inclusive).
    pub fn trailing_days(end: NaiveDate, days: u32) -> Result<Self> {
        let span = i64::from(days.max(1)) - 1;
        let start = end
            .checked_sub_signed(chrono::Duration::days(span))
            .ok_or_else(|| Error::InvalidArgument(format!("window of {} days underflows", days)))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether an instant falls on one of the window's dates.
    pub fn contains(&self, ts: DateTime<Utc>, offset: &FixedOffset) -> bool {
        self.contains_date(local_date(ts, offset))
    }

    /// Number of calendar days covered.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

//! Joins visit summaries to the user directory.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::aggregate::VisitSummary;
use super::ranking::TopUser;
use crate::format::join_names;
use crate::types::{NamedRef, OrgUnitRef, UserDirectoryEntry};

/// A visit summary merged with the matching directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedUser {
    pub username: String,
    pub display_name: String,
    /// Directory id, absent for fallback records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    pub roles: Vec<NamedRef>,
    pub groups: Vec<NamedRef>,
    pub org_units: Vec<OrgUnitRef>,
    pub last_login: Option<DateTime<Utc>>,
    pub visits: u64,
    pub last_visit: DateTime<Utc>,
    /// False when the username was not found in the directory
    pub matched: bool,
}

impl LinkedUser {
    fn from_entry(summary: &VisitSummary, entry: &UserDirectoryEntry) -> Self {
        Self {
            username: summary.username.clone(),
            display_name: entry.label(),
            id: Some(entry.id.clone()),
            first_name: entry.first_name.clone(),
            surname: entry.surname.clone(),
            roles: entry.user_roles.clone(),
            groups: entry.user_groups.clone(),
            org_units: entry.organisation_units.clone(),
            last_login: entry.last_login,
            visits: summary.visit_count,
            last_visit: summary.last_visit,
            matched: true,
        }
    }

    /// Placeholder for a username the directory does not know.
    pub fn fallback(summary: &VisitSummary) -> Self {
        Self {
            username: summary.username.clone(),
            display_name: summary.username.clone(),
            id: None,
            first_name: None,
            surname: None,
            roles: Vec::new(),
            groups: Vec::new(),
            org_units: Vec::new(),
            last_login: None,
            visits: summary.visit_count,
            last_visit: summary.last_visit,
            matched: false,
        }
    }

    pub fn roles_display(&self) -> String {
        join_names(&self.roles)
    }

    pub fn groups_display(&self) -> String {
        join_names(&self.groups)
    }

    pub fn org_units_display(&self) -> String {
        self.org_units
            .iter()
            .map(|u| {
                if u.display_name.is_empty() {
                    u.id.as_str()
                } else {
                    u.display_name.as_str()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Link each summary to its directory entry by exact username.
///
/// Returns one record per summary, in summary order. The first directory
/// entry wins when usernames repeat.
pub fn link_users(
    summaries: &[VisitSummary],
    directory: &[UserDirectoryEntry],
) -> Vec<LinkedUser> {
    let mut by_username: HashMap<&str, &UserDirectoryEntry> =
        HashMap::with_capacity(directory.len());
    for entry in directory {
        by_username.entry(entry.username.as_str()).or_insert(entry);
    }

    let linked: Vec<LinkedUser> = summaries
        .iter()
        .map(|summary| match by_username.get(summary.username.as_str()) {
            Some(entry) => LinkedUser::from_entry(summary, entry),
            None => LinkedUser::fallback(summary),
        })
        .collect();

    let unresolved = linked.iter().filter(|u| !u.matched).count();
    if unresolved > 0 {
        tracing::warn!(
            unresolved,
            total = linked.len(),
            "Usernames missing from the user directory"
        );
    }
    tracing::debug!(linked = linked.len(), "Linked users");

    linked
}

/// Copy names from linked users onto the top-users list.
pub fn enrich_top_users(top_users: &mut [TopUser], linked: &[LinkedUser]) {
    let by_username: HashMap<&str, &LinkedUser> = linked
        .iter()
        .filter(|u| u.matched)
        .map(|u| (u.username.as_str(), u))
        .collect();

    for top in top_users.iter_mut() {
        if let Some(user) = by_username.get(top.username.as_str()) {
            top.first_name = user.first_name.clone();
            top.surname = user.surname.clone();
        }
    }
}

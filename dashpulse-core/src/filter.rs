//! Directory filtering.
//!
//! Narrows a full user directory to the users a report is about, the same
//! way the platform's user query narrows by username, org unit and group.

use std::collections::BTreeSet;

use crate::types::{path_ids, UserDirectoryEntry};

/// Criteria for selecting directory users.
///
/// Every non-empty criterion must match. Empty criteria match everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFilter {
    /// Only these usernames
    pub usernames: BTreeSet<String>,
    /// Users assigned to (or below) any of these org units
    pub org_unit_ids: BTreeSet<String>,
    /// Users in any of these groups
    pub user_group_ids: BTreeSet<String>,
    /// Keep disabled accounts
    pub include_disabled: bool,
}

impl DirectoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_usernames<I, S>(mut self, usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.usernames.extend(usernames.into_iter().map(Into::into));
        self
    }

    pub fn with_org_units<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.org_unit_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_user_groups<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_group_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn include_disabled(mut self, include: bool) -> Self {
        self.include_disabled = include;
        self
    }

    pub fn matches(&self, user: &UserDirectoryEntry) -> bool {
        if user.disabled && !self.include_disabled {
            return false;
        }
        if !self.usernames.is_empty() && !self.usernames.contains(&user.username) {
            return false;
        }
        if !self.org_unit_ids.is_empty() && !self.matches_org_unit(user) {
            return false;
        }
        if !self.user_group_ids.is_empty()
            && !user
                .user_groups
                .iter()
                .any(|g| self.user_group_ids.contains(&g.id))
        {
            return false;
        }
        true
    }

    fn matches_org_unit(&self, user: &UserDirectoryEntry) -> bool {
        user.organisation_units.iter().any(|assignment| {
            self.org_unit_ids.contains(&assignment.id)
                || assignment
                    .path
                    .as_deref()
                    .map(|path| path_ids(path).any(|id| self.org_unit_ids.contains(id)))
                    .unwrap_or(false)
        })
    }

    /// Matching users, cloned, in directory order.
    pub fn apply(&self, directory: &[UserDirectoryEntry]) -> Vec<UserDirectoryEntry> {
        let kept: Vec<UserDirectoryEntry> = directory
            .iter()
            .filter(|user| self.matches(user))
            .cloned()
            .collect();
        tracing::debug!(
            before = directory.len(),
            after = kept.len(),
            "Filtered user directory"
        );
        kept
    }
}

//! User directory feed.
//!
//! The platform's user listing nests some fields under `userCredentials`
//! depending on the server version, so `username`, `lastLogin`,
//! `userRoles` and `disabled` are read from either place, top level first.

use chrono::FixedOffset;
use serde::Deserialize;
use serde_json::Value;

use crate::config::utc_offset;
use crate::error::Result;
use crate::ingest::parse_timestamp;
use crate::ingest::parser::{Feed, FeedParser, ParseResult};
use crate::types::{NamedRef, OrgUnitRef, UserDirectoryEntry};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredentials {
    username: Option<String>,
    last_login: Option<String>,
    disabled: Option<bool>,
    #[serde(default)]
    user_roles: Vec<NamedRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    id: Option<String>,
    username: Option<String>,
    first_name: Option<String>,
    surname: Option<String>,
    display_name: Option<String>,
    name: Option<String>,
    last_login: Option<String>,
    disabled: Option<bool>,
    user_credentials: Option<RawCredentials>,
    #[serde(default)]
    user_roles: Vec<NamedRef>,
    #[serde(default)]
    user_groups: Vec<NamedRef>,
    #[serde(default)]
    organisation_units: Vec<OrgUnitRef>,
}

/// Parser for the user directory feed.
#[derive(Debug, Clone)]
pub struct DirectoryParser {
    /// Offset applied to `lastLogin` values that carry none
    offset: FixedOffset,
}

impl Default for DirectoryParser {
    fn default() -> Self {
        Self::new(utc_offset())
    }
}

impl DirectoryParser {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    fn convert(
        &self,
        raw: RawUser,
        index: usize,
        result: &mut ParseResult<UserDirectoryEntry>,
    ) -> Option<UserDirectoryEntry> {
        let credentials = raw.user_credentials;

        let username = raw
            .username
            .or_else(|| credentials.as_ref().and_then(|c| c.username.clone()))
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        let id = raw.id.filter(|id| !id.is_empty());

        let (id, username) = match (id, username) {
            (Some(id), Some(username)) => (id, username),
            (None, _) => {
                result.skip(Feed::Directory, index, "user without id");
                return None;
            }
            (Some(id), None) => {
                result.skip(Feed::Directory, index, format!("user {} without username", id));
                return None;
            }
        };

        let raw_login = raw
            .last_login
            .or_else(|| credentials.as_ref().and_then(|c| c.last_login.clone()))
            .filter(|l| !l.trim().is_empty());
        let last_login = match raw_login {
            Some(text) => {
                let parsed = parse_timestamp(&text, &self.offset);
                if parsed.is_none() {
                    result.warnings.push(format!(
                        "directory record {}: unparseable lastLogin '{}' for {}, treated as never",
                        index, text, username
                    ));
                }
                parsed
            }
            None => None,
        };

        let disabled = raw
            .disabled
            .or_else(|| credentials.as_ref().and_then(|c| c.disabled))
            .unwrap_or(false);

        let user_roles = if raw.user_roles.is_empty() {
            credentials.map(|c| c.user_roles).unwrap_or_default()
        } else {
            raw.user_roles
        };

        Some(UserDirectoryEntry {
            id,
            username,
            first_name: raw.first_name.filter(|s| !s.is_empty()),
            surname: raw.surname.filter(|s| !s.is_empty()),
            display_name: raw.display_name.or(raw.name).filter(|s| !s.is_empty()),
            last_login,
            disabled,
            user_roles,
            user_groups: raw.user_groups,
            organisation_units: raw.organisation_units,
        })
    }
}

/// Find the user array: `{"users": [...]}`, `{"users": {"users": [...]}}`
/// or a bare array.
fn find_users(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => find_users(map.get("users")?),
        _ => None,
    }
}

impl FeedParser for DirectoryParser {
    type Record = UserDirectoryEntry;

    fn feed(&self) -> Feed {
        Feed::Directory
    }

    fn parse(&self, value: &Value) -> Result<ParseResult<UserDirectoryEntry>> {
        let items =
            find_users(value).ok_or_else(|| self.shape_error("expected a list of users"))?;

        let mut result = ParseResult::default();
        for (index, item) in items.iter().enumerate() {
            let raw: RawUser = match serde_json::from_value(item.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    result.skip(Feed::Directory, index, e.to_string());
                    continue;
                }
            };
            if let Some(entry) = self.convert(raw, index, &mut result) {
                result.records.push(entry);
            }
        }

        Ok(result)
    }
}

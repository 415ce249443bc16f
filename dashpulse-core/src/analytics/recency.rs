//! Login recency classification.
//!
//! Every classification is relative to a single `as_of` instant supplied
//! by the caller. Nothing here reads the clock.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::rounded_percentage;
use crate::config::{RecencyConfig, MAX_THRESHOLD_DAYS};
use crate::types::UserDirectoryEntry;

/// How recently a user last logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessRecency {
    LastWeek,
    LastMonth,
    OverMonth,
    Never,
}

impl AccessRecency {
    pub const ALL: [AccessRecency; 4] = [
        AccessRecency::LastWeek,
        AccessRecency::LastMonth,
        AccessRecency::OverMonth,
        AccessRecency::Never,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessRecency::LastWeek => "lastWeek",
            AccessRecency::LastMonth => "lastMonth",
            AccessRecency::OverMonth => "overMonth",
            AccessRecency::Never => "never",
        }
    }

    /// Human label for tables.
    pub fn label(&self) -> &'static str {
        match self {
            AccessRecency::LastWeek => "Last 7 days",
            AccessRecency::LastMonth => "Last 30 days",
            AccessRecency::OverMonth => "Over a month ago",
            AccessRecency::Never => "Never logged in",
        }
    }
}

impl fmt::Display for AccessRecency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day thresholds for [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyThresholds {
    pub last_week: Duration,
    pub last_month: Duration,
}

impl Default for RecencyThresholds {
    fn default() -> Self {
        Self::from(&RecencyConfig::default())
    }
}

impl From<&RecencyConfig> for RecencyThresholds {
    /// Out-of-range day counts are clamped to `0..=MAX_THRESHOLD_DAYS`.
    fn from(config: &RecencyConfig) -> Self {
        let days = |n: i64| Duration::days(n.clamp(0, MAX_THRESHOLD_DAYS));
        Self {
            last_week: days(config.last_week_days),
            last_month: days(config.last_month_days),
        }
    }
}

/// Classify one last-login instant. Both boundaries are inclusive.
pub fn classify(
    last_login: Option<DateTime<Utc>>,
    as_of: DateTime<Utc>,
    thresholds: &RecencyThresholds,
) -> AccessRecency {
    let Some(last_login) = last_login else {
        return AccessRecency::Never;
    };
    // A login after as_of yields a negative span and lands in LastWeek
    let elapsed = as_of.signed_duration_since(last_login);
    if elapsed <= thresholds.last_week {
        AccessRecency::LastWeek
    } else if elapsed <= thresholds.last_month {
        AccessRecency::LastMonth
    } else {
        AccessRecency::OverMonth
    }
}

/// Whole days between the last login and `as_of`, never negative.
pub fn days_since_last_login(
    last_login: Option<DateTime<Utc>>,
    as_of: DateTime<Utc>,
) -> Option<i64> {
    last_login.map(|ts| as_of.signed_duration_since(ts).num_days().max(0))
}

/// Inactivity tier, by whole days since the last login.
///
/// | Tier | Days since login |
/// |------|------------------|
/// | `Active` | 0-30 |
/// | `Warning` | 31-60 |
/// | `Inactive` | 61-90 |
/// | `Critical` | over 90, or never logged in |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityStatus {
    Active,
    Warning,
    Inactive,
    Critical,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Active => "active",
            ActivityStatus::Warning => "warning",
            ActivityStatus::Inactive => "inactive",
            ActivityStatus::Critical => "critical",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityStatus::Active => "Active",
            ActivityStatus::Warning => "Warning",
            ActivityStatus::Inactive => "Inactive",
            ActivityStatus::Critical => "Critical",
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tier a last-login instant. Day counts are floored, so exactly 30
/// days is still `Active`.
pub fn classify_activity(
    last_login: Option<DateTime<Utc>>,
    as_of: DateTime<Utc>,
) -> ActivityStatus {
    match days_since_last_login(last_login, as_of) {
        None => ActivityStatus::Critical,
        Some(days) if days > 90 => ActivityStatus::Critical,
        Some(days) if days > 60 => ActivityStatus::Inactive,
        Some(days) if days > 30 => ActivityStatus::Warning,
        Some(_) => ActivityStatus::Active,
    }
}

/// Recency of one directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecency {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub last_login: Option<DateTime<Utc>>,
    pub days_since_last_login: Option<i64>,
    pub recency: AccessRecency,
    pub activity_status: ActivityStatus,
}

impl UserRecency {
    pub fn from_entry(
        entry: &UserDirectoryEntry,
        as_of: DateTime<Utc>,
        thresholds: &RecencyThresholds,
    ) -> Self {
        Self {
            id: entry.id.clone(),
            username: entry.username.clone(),
            display_name: entry.label(),
            last_login: entry.last_login,
            days_since_last_login: days_since_last_login(entry.last_login, as_of),
            recency: classify(entry.last_login, as_of, thresholds),
            activity_status: classify_activity(entry.last_login, as_of),
        }
    }
}

/// Classify every entry, in directory order.
pub fn classify_users(
    directory: &[UserDirectoryEntry],
    as_of: DateTime<Utc>,
    thresholds: &RecencyThresholds,
) -> Vec<UserRecency> {
    directory
        .iter()
        .map(|entry| UserRecency::from_entry(entry, as_of, thresholds))
        .collect()
}

/// Counts and rounded percentages per recency bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecencySummary {
    pub total: usize,
    pub last_week: usize,
    pub last_month: usize,
    pub over_month: usize,
    pub never: usize,
    pub last_week_percent: u8,
    pub last_month_percent: u8,
    pub over_month_percent: u8,
    pub never_percent: u8,
}

impl RecencySummary {
    pub fn from_labels(labels: impl IntoIterator<Item = AccessRecency>) -> Self {
        let mut summary = Self::default();
        for label in labels {
            summary.total += 1;
            match label {
                AccessRecency::LastWeek => summary.last_week += 1,
                AccessRecency::LastMonth => summary.last_month += 1,
                AccessRecency::OverMonth => summary.over_month += 1,
                AccessRecency::Never => summary.never += 1,
            }
        }
        summary.last_week_percent = rounded_percentage(summary.last_week, summary.total);
        summary.last_month_percent = rounded_percentage(summary.last_month, summary.total);
        summary.over_month_percent = rounded_percentage(summary.over_month, summary.total);
        summary.never_percent = rounded_percentage(summary.never, summary.total);
        summary
    }

    pub fn count(&self, recency: AccessRecency) -> usize {
        match recency {
            AccessRecency::LastWeek => self.last_week,
            AccessRecency::LastMonth => self.last_month,
            AccessRecency::OverMonth => self.over_month,
            AccessRecency::Never => self.never,
        }
    }

    pub fn percent(&self, recency: AccessRecency) -> u8 {
        match recency {
            AccessRecency::LastWeek => self.last_week_percent,
            AccessRecency::LastMonth => self.last_month_percent,
            AccessRecency::OverMonth => self.over_month_percent,
            AccessRecency::Never => self.never_percent,
        }
    }
}

/// Login-status criteria for inactivity tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoginStatus {
    /// No recorded login
    NeverLoggedIn,
    /// Last login older than the month threshold
    Inactive,
}

impl LoginStatus {
    fn matches(&self, recency: AccessRecency) -> bool {
        match self {
            LoginStatus::NeverLoggedIn => recency == AccessRecency::Never,
            LoginStatus::Inactive => recency == AccessRecency::OverMonth,
        }
    }
}

/// Entries matching any of `statuses`, in directory order, one per user id.
///
/// An empty status set applies no filter.
pub fn filter_by_login_status<'a>(
    directory: &'a [UserDirectoryEntry],
    statuses: &[LoginStatus],
    as_of: DateTime<Utc>,
    thresholds: &RecencyThresholds,
) -> Vec<&'a UserDirectoryEntry> {
    if statuses.is_empty() {
        return directory.iter().collect();
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut matched = Vec::new();
    for entry in directory {
        let recency = classify(entry.last_login, as_of, thresholds);
        if statuses.iter().any(|s| s.matches(recency)) && seen.insert(entry.id.as_str()) {
            matched.push(entry);
        }
    }
    matched
}

/// Users matching any of `statuses`, longest since login first.
///
/// Users who never logged in sort ahead of everyone else; ties keep
/// directory order.
pub fn flagged_users(
    directory: &[UserDirectoryEntry],
    statuses: &[LoginStatus],
    as_of: DateTime<Utc>,
    thresholds: &RecencyThresholds,
) -> Vec<UserRecency> {
    let mut flagged: Vec<UserRecency> =
        filter_by_login_status(directory, statuses, as_of, thresholds)
            .into_iter()
            .map(|entry| UserRecency::from_entry(entry, as_of, thresholds))
            .collect();
    flagged.sort_by_key(|u| Reverse(u.days_since_last_login.unwrap_or(i64::MAX)));
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap()
    }

    fn day(m: u32, d: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, m, d, 0, 0, 0).unwrap())
    }

    fn user(id: &str, last_login: Option<DateTime<Utc>>) -> UserDirectoryEntry {
        let mut entry = UserDirectoryEntry::new(id, format!("user_{}", id));
        entry.last_login = last_login;
        entry
    }

    #[test]
    fn test_classify_examples() {
        let t = RecencyThresholds::default();
        assert_eq!(classify(day(6, 5), as_of(), &t), AccessRecency::LastWeek);
        assert_eq!(classify(day(5, 20), as_of(), &t), AccessRecency::LastMonth);
        assert_eq!(classify(day(1, 1), as_of(), &t), AccessRecency::OverMonth);
        assert_eq!(classify(None, as_of(), &t), AccessRecency::Never);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let t = RecencyThresholds::default();
        let now = as_of();
        let exactly = |days| Some(now - Duration::days(days));
        let just_over = |days| Some(now - Duration::days(days) - Duration::seconds(1));

        assert_eq!(classify(exactly(7), now, &t), AccessRecency::LastWeek);
        assert_eq!(classify(just_over(7), now, &t), AccessRecency::LastMonth);
        assert_eq!(classify(exactly(30), now, &t), AccessRecency::LastMonth);
        assert_eq!(classify(just_over(30), now, &t), AccessRecency::OverMonth);
    }

    #[test]
    fn test_future_login_is_last_week() {
        let t = RecencyThresholds::default();
        assert_eq!(classify(day(7, 1), as_of(), &t), AccessRecency::LastWeek);
        assert_eq!(days_since_last_login(day(7, 1), as_of()), Some(0));
    }

    #[test]
    fn test_custom_thresholds() {
        let config = RecencyConfig {
            last_week_days: 1,
            last_month_days: 3,
        };
        let t = RecencyThresholds::from(&config);
        assert_eq!(classify(day(6, 8), as_of(), &t), AccessRecency::LastMonth);
        assert_eq!(classify(day(6, 5), as_of(), &t), AccessRecency::OverMonth);
    }

    #[test]
    fn test_thresholds_clamp_unvalidated_config() {
        let config = RecencyConfig {
            last_week_days: -3,
            last_month_days: 9_000_000_000_000_000,
        };
        let t = RecencyThresholds::from(&config);
        assert_eq!(t.last_week, Duration::zero());
        assert_eq!(t.last_month, Duration::days(MAX_THRESHOLD_DAYS));
        assert_eq!(classify(day(1, 1), as_of(), &t), AccessRecency::LastMonth);
    }

    #[test]
    fn test_days_since_last_login_floors() {
        let login = Utc.with_ymd_and_hms(2024, 6, 8, 12, 0, 0).unwrap();
        assert_eq!(days_since_last_login(Some(login), as_of()), Some(1));
        assert_eq!(days_since_last_login(None, as_of()), None);
    }

    #[test]
    fn test_classify_users_keeps_directory_order() {
        let directory = vec![user("b", None), user("a", day(6, 9))];
        let records = classify_users(&directory, as_of(), &RecencyThresholds::default());
        assert_eq!(records[0].id, "b");
        assert_eq!(records[0].recency, AccessRecency::Never);
        assert_eq!(records[1].recency, AccessRecency::LastWeek);
        assert_eq!(records[1].days_since_last_login, Some(1));
    }

    #[test]
    fn test_summary_percentages() {
        let summary = RecencySummary::from_labels([
            AccessRecency::LastWeek,
            AccessRecency::LastWeek,
            AccessRecency::Never,
        ]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.count(AccessRecency::LastWeek), 2);
        assert_eq!(summary.percent(AccessRecency::LastWeek), 67);
        assert_eq!(summary.percent(AccessRecency::Never), 33);
        assert_eq!(summary.percent(AccessRecency::OverMonth), 0);

        assert_eq!(
            RecencySummary::from_labels(std::iter::empty()),
            RecencySummary::default()
        );
    }

    #[test]
    fn test_filter_by_login_status() {
        let directory = vec![
            user("a", None),
            user("b", day(6, 9)),
            user("c", day(1, 1)),
            user("a", None),
        ];
        let t = RecencyThresholds::default();

        let never =
            filter_by_login_status(&directory, &[LoginStatus::NeverLoggedIn], as_of(), &t);
        let ids: Vec<_> = never.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);

        let either = filter_by_login_status(
            &directory,
            &[LoginStatus::Inactive, LoginStatus::NeverLoggedIn],
            as_of(),
            &t,
        );
        let ids: Vec<_> = either.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        assert_eq!(filter_by_login_status(&directory, &[], as_of(), &t).len(), 4);
    }

    #[test]
    fn test_activity_tiers_at_boundaries() {
        let now = as_of();
        let ago = |days| Some(now - Duration::days(days));

        assert_eq!(classify_activity(ago(0), now), ActivityStatus::Active);
        assert_eq!(classify_activity(ago(30), now), ActivityStatus::Active);
        assert_eq!(classify_activity(ago(31), now), ActivityStatus::Warning);
        assert_eq!(classify_activity(ago(60), now), ActivityStatus::Warning);
        assert_eq!(classify_activity(ago(61), now), ActivityStatus::Inactive);
        assert_eq!(classify_activity(ago(90), now), ActivityStatus::Inactive);
        assert_eq!(classify_activity(ago(91), now), ActivityStatus::Critical);
        assert_eq!(classify_activity(None, now), ActivityStatus::Critical);
        // Partial days are floored
        let almost_31 = now - Duration::days(31) + Duration::seconds(1);
        assert_eq!(classify_activity(Some(almost_31), now), ActivityStatus::Active);
    }

    #[test]
    fn test_classify_users_carries_activity_status() {
        let directory = vec![user("a", day(6, 9)), user("b", day(1, 1))];
        let records = classify_users(&directory, as_of(), &RecencyThresholds::default());
        assert_eq!(records[0].activity_status, ActivityStatus::Active);
        assert_eq!(records[1].activity_status, ActivityStatus::Critical);
    }

    #[test]
    fn test_flagged_users_sort_by_days_descending() {
        let now = as_of();
        let ago = |days| Some(now - Duration::days(days));
        let directory = vec![
            user("w", ago(45)),
            user("c", ago(120)),
            user("n", None),
            user("i", ago(75)),
            user("ok", ago(2)),
        ];
        let t = RecencyThresholds::default();

        let flagged = flagged_users(
            &directory,
            &[LoginStatus::Inactive, LoginStatus::NeverLoggedIn],
            now,
            &t,
        );
        let ids: Vec<_> = flagged.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["n", "c", "i", "w"]);

        let tiers: Vec<_> = flagged.iter().map(|u| u.activity_status).collect();
        assert_eq!(
            tiers,
            vec![
                ActivityStatus::Critical,
                ActivityStatus::Critical,
                ActivityStatus::Inactive,
                ActivityStatus::Warning
            ]
        );
        assert!(flagged_users(&directory[4..], &[LoginStatus::Inactive], now, &t).is_empty());
    }

    #[test]
    fn test_serialized_labels() {
        let json = serde_json::to_string(&AccessRecency::OverMonth).unwrap();
        assert_eq!(json, "\"overMonth\"");
        assert_eq!(AccessRecency::LastWeek.to_string(), "lastWeek");
        let json = serde_json::to_string(&ActivityStatus::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}

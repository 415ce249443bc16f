//! Per-org-unit engagement coverage.
//!
//! For each org unit: how many directory users sit under it, how many of
//! them have ever logged in, when the latest login happened, and whether
//! the unit showed activity in every one of the trailing calendar weeks.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use super::aggregate::VisitAggregate;
use super::buckets::{week_end, week_start};
use super::rounded_percentage;
use crate::config::{utc_offset, EngagementConfig};
use crate::format::{format_date, format_percentage, NEVER};
use crate::types::{local_date, OrgUnit, UserDirectoryEntry};

/// Engagement figures for one org unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictEngagement {
    pub org_unit_id: String,
    pub org_unit_name: String,
    pub total_users: usize,
    /// Users who have ever logged in
    pub active_users: usize,
    /// Latest login as `YYYY-MM-DD`, or "Never"
    pub last_activity: String,
    /// e.g. "50%"
    pub access_percentage: String,
    pub is_consistently_active: bool,
    /// Trailing weeks that saw activity
    pub active_weeks: u32,
    /// Rough estimate only, not a measured view count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_views: Option<u64>,
}

/// A Sunday-Saturday calendar week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarWeek {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CalendarWeek {
    pub fn containing(date: NaiveDate) -> Self {
        let start = week_start(date);
        Self {
            start,
            end: week_end(start),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The `count` complete weeks before the week containing `as_of_date`,
/// oldest first.
pub fn trailing_weeks(as_of_date: NaiveDate, count: u32) -> Vec<CalendarWeek> {
    let current = week_start(as_of_date);
    (1..=i64::from(count))
        .rev()
        .filter_map(|back| current.checked_sub_signed(Duration::weeks(back)))
        .map(CalendarWeek::containing)
        .collect()
}

/// Access percentage as displayed, e.g. "67%".
pub fn access_percentage(active_users: usize, total_users: usize) -> String {
    format_percentage(rounded_percentage(active_users, total_users))
}

/// Computes [`DistrictEngagement`] rows relative to one `as_of` instant.
#[derive(Debug, Clone)]
pub struct EngagementCalculator<'a> {
    config: &'a EngagementConfig,
    as_of: DateTime<Utc>,
    offset: FixedOffset,
}

impl<'a> EngagementCalculator<'a> {
    pub fn new(config: &'a EngagementConfig, as_of: DateTime<Utc>) -> Self {
        Self {
            config,
            as_of,
            offset: utc_offset(),
        }
    }

    /// Use `offset` for calendar dates instead of UTC.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// The weeks checked for consistent activity, oldest first.
    pub fn weeks(&self) -> Vec<CalendarWeek> {
        trailing_weeks(
            local_date(self.as_of, &self.offset),
            self.config.consistency_weeks,
        )
    }

    /// One row per unit, in unit order.
    ///
    /// `directory` should already be narrowed to users under `units`;
    /// users outside every unit are simply not counted. When `visits` is
    /// given, a user's last visit counts as activity alongside their last
    /// login.
    pub fn compute(
        &self,
        units: &[OrgUnit],
        directory: &[UserDirectoryEntry],
        visits: Option<&VisitAggregate>,
    ) -> Vec<DistrictEngagement> {
        if units.is_empty() {
            tracing::warn!("No org units to compute engagement for");
            return Vec::new();
        }

        let weeks = self.weeks();
        let rows: Vec<DistrictEngagement> = units
            .iter()
            .map(|unit| self.unit_engagement(unit, directory, visits, &weeks))
            .collect();

        tracing::debug!(
            units = rows.len(),
            consistent = rows.iter().filter(|r| r.is_consistently_active).count(),
            "Computed district engagement"
        );
        rows
    }

    fn unit_engagement(
        &self,
        unit: &OrgUnit,
        directory: &[UserDirectoryEntry],
        visits: Option<&VisitAggregate>,
        weeks: &[CalendarWeek],
    ) -> DistrictEngagement {
        let members: Vec<&UserDirectoryEntry> = directory
            .iter()
            .filter(|user| user.organisation_units.iter().any(|a| unit.covers(a)))
            .collect();

        let total_users = members.len();
        let active_users = members.iter().filter(|u| u.has_logged_in()).count();

        let last_activity = members
            .iter()
            .filter_map(|u| u.last_login)
            .max()
            .map(|ts| format_date(local_date(ts, &self.offset)))
            .unwrap_or_else(|| NEVER.to_string());

        let activity_dates: Vec<NaiveDate> = members
            .iter()
            .flat_map(|user| {
                let last_visit = visits
                    .and_then(|v| v.get(&user.username))
                    .map(|s| s.last_visit);
                [user.last_login, last_visit]
            })
            .flatten()
            .map(|ts| local_date(ts, &self.offset))
            .collect();

        let active_weeks = weeks
            .iter()
            .filter(|week| activity_dates.iter().any(|d| week.contains(*d)))
            .count() as u32;
        let is_consistently_active =
            total_users > 0 && !weeks.is_empty() && active_weeks as usize == weeks.len();

        let per_user = self.config.views_per_active_user;
        let dashboard_views = self
            .config
            .estimate_views
            .then(|| (active_users as u64).saturating_mul(per_user));

        DistrictEngagement {
            org_unit_id: unit.id.clone(),
            org_unit_name: unit.display_name.clone(),
            total_users,
            active_users,
            last_activity,
            access_percentage: access_percentage(active_users, total_users),
            is_consistently_active,
            active_weeks,
            dashboard_views,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrgUnitRef, VisitEvent};
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Wednesday
    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap()
    }

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 9, 0, 0).unwrap()
    }

    fn member(id: &str, unit: &str, last_login: Option<DateTime<Utc>>) -> UserDirectoryEntry {
        let mut entry = UserDirectoryEntry::new(id, id);
        entry.organisation_units = vec![OrgUnitRef::new(unit, unit)];
        entry.last_login = last_login;
        entry
    }

    fn district(id: &str) -> OrgUnit {
        OrgUnit::new(id, format!("District {}", id), format!("/root/{}", id), 2)
    }

    fn compute(
        units: &[OrgUnit],
        directory: &[UserDirectoryEntry],
        visits: Option<&VisitAggregate>,
    ) -> Vec<DistrictEngagement> {
        let config = EngagementConfig::default();
        EngagementCalculator::new(&config, as_of()).compute(units, directory, visits)
    }

    #[test]
    fn test_trailing_weeks() {
        let weeks = trailing_weeks(date(2024, 6, 12), 4);
        let starts: Vec<_> = weeks.iter().map(|w| w.start).collect();
        assert_eq!(
            starts,
            vec![
                date(2024, 5, 12),
                date(2024, 5, 19),
                date(2024, 5, 26),
                date(2024, 6, 2)
            ]
        );
        assert_eq!(weeks[3].end, date(2024, 6, 8));
        // A Sunday as_of excludes its own week
        assert_eq!(trailing_weeks(date(2024, 6, 9), 1)[0].start, date(2024, 6, 2));
    }

    #[test]
    fn test_half_of_users_active() {
        let directory = vec![
            member("u1", "A", Some(as_of() - Duration::days(2))),
            member("u2", "A", None),
        ];
        let rows = compute(&[district("A")], &directory, None);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.total_users, 2);
        assert_eq!(row.active_users, 1);
        assert_eq!(row.access_percentage, "50%");
        assert_eq!(row.last_activity, "2024-06-10");
        assert_eq!(row.dashboard_views, Some(3));
    }

    #[test]
    fn test_empty_unit() {
        let rows = compute(&[district("B")], &[member("u1", "A", Some(at(6, 1)))], None);
        let row = &rows[0];
        assert_eq!(row.total_users, 0);
        assert_eq!(row.access_percentage, "0%");
        assert_eq!(row.last_activity, "Never");
        assert!(!row.is_consistently_active);
        assert_eq!(row.active_weeks, 0);
    }

    #[test]
    fn test_no_units() {
        assert!(compute(&[], &[member("u1", "A", None)], None).is_empty());
    }

    #[test]
    fn test_consistency_needs_every_week() {
        // One login per trailing week, spread over three users
        let directory = vec![
            member("u1", "A", Some(at(5, 14))),
            member("u2", "A", Some(at(5, 27))),
            member("u3", "A", Some(at(6, 4))),
        ];
        let rows = compute(&[district("A")], &directory, None);
        assert_eq!(rows[0].active_weeks, 3);
        assert!(!rows[0].is_consistently_active);

        // Visits fill the missing week of May 19
        let events = vec![VisitEvent::new("u1", at(5, 21))];
        let visits = VisitAggregate::from_events(&events);
        let rows = compute(&[district("A")], &directory, Some(&visits));
        assert_eq!(rows[0].active_weeks, 4);
        assert!(rows[0].is_consistently_active);
    }

    #[test]
    fn test_current_week_does_not_count() {
        let directory = vec![member("u1", "A", Some(at(6, 11)))];
        let rows = compute(&[district("A")], &directory, None);
        assert_eq!(rows[0].active_weeks, 0);
    }

    #[test]
    fn test_membership_through_path_and_subtree() {
        let region = OrgUnit::new("reg", "Region", "/root/reg", 2)
            .with_children(vec![OrgUnit::new("d1", "District 1", "/root/reg/d1", 3)]);

        let mut by_path = UserDirectoryEntry::new("u1", "u1");
        by_path.organisation_units =
            vec![OrgUnitRef::new("f1", "Facility").with_path("/root/reg/d1/f1")];
        let by_child = member("u2", "d1", None);
        // Two assignments under the same unit still count once
        let mut twice = member("u3", "reg", Some(at(6, 1)));
        twice.organisation_units.push(OrgUnitRef::new("d1", "District 1"));

        let rows = compute(&[region], &[by_path, by_child, twice], None);
        assert_eq!(rows[0].total_users, 3);
        assert_eq!(rows[0].active_users, 1);
        assert_eq!(rows[0].access_percentage, "33%");
    }

    #[test]
    fn test_views_estimate_can_be_disabled() {
        let config = EngagementConfig {
            estimate_views: false,
            ..EngagementConfig::default()
        };
        let rows = EngagementCalculator::new(&config, as_of()).compute(
            &[district("A")],
            &[member("u1", "A", Some(at(6, 1)))],
            None,
        );
        assert_eq!(rows[0].dashboard_views, None);
    }

    #[test]
    fn test_views_estimate_saturates() {
        let config = EngagementConfig {
            views_per_active_user: u64::MAX,
            ..EngagementConfig::default()
        };
        let directory = vec![
            member("u1", "A", Some(at(6, 1))),
            member("u2", "A", Some(at(6, 2))),
        ];
        let rows =
            EngagementCalculator::new(&config, as_of()).compute(&[district("A")], &directory, None);
        assert_eq!(rows[0].dashboard_views, Some(u64::MAX));
    }

    #[test]
    fn test_access_percentage_rounding() {
        assert_eq!(access_percentage(1, 3), "33%");
        assert_eq!(access_percentage(2, 3), "67%");
        assert_eq!(access_percentage(1, 8), "13%");
        assert_eq!(access_percentage(5, 5), "100%");
        assert_eq!(access_percentage(0, 0), "0%");
    }
}

//! Dashboard usage statistics.
//!
//! Provides the headline numbers for one dashboard over one window:
//! total visits, the most active users and the busiest day, week and
//! month.

use chrono::FixedOffset;
use serde::Serialize;

use super::aggregate::{aggregate_visits, VisitAggregate};
use super::buckets::{bucket_visits, DayBucket, MonthBucket, PeakActivity, WeekBucket};
use super::ranking::{top_n, TopUser};
use crate::format::day_name;
use crate::types::VisitEvent;

/// Dashboard statistics for the report header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    // Totals
    /// Number of visits in the window
    pub total_visits: u64,
    /// Number of distinct usernames in the window
    pub unique_users: usize,

    // Ranking
    /// Most active users, highest first
    pub top_users: Vec<TopUser>,

    // Peaks
    pub top_day: Option<DayBucket>,
    pub top_week: Option<WeekBucket>,
    pub top_month: Option<MonthBucket>,

    // Patterns
    /// Visits per day, ascending, days without visits omitted
    pub daily: Vec<DayBucket>,
    /// Busiest day of week (0=Sunday, 1=Monday, ..., 6=Saturday)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub busiest_day: Option<u8>,
}

impl DashboardStats {
    /// Compute stats for already window-filtered events.
    pub fn from_events(events: &[VisitEvent], top_users: usize, offset: &FixedOffset) -> Self {
        let aggregate = aggregate_visits(events);
        let peaks = bucket_visits(events, offset);
        Self::from_parts(&aggregate, peaks, top_users)
    }

    /// Assemble stats from an aggregate and its bucketed peaks.
    pub fn from_parts(aggregate: &VisitAggregate, peaks: PeakActivity, top_users: usize) -> Self {
        let ranked = top_n(&aggregate.to_vec(), top_users);
        let busiest_day = peaks.busiest_weekday();

        Self {
            total_visits: aggregate.total_visits(),
            unique_users: aggregate.len(),
            top_users: ranked.iter().map(TopUser::from).collect(),
            top_day: peaks.top_day,
            top_week: peaks.top_week,
            top_month: peaks.top_month,
            daily: peaks.daily,
            busiest_day,
        }
    }

    /// Number of days with at least one visit.
    pub fn active_days(&self) -> usize {
        self.daily.len()
    }

    /// Format the busiest day (e.g., "2024-01-01 (12 visits)").
    pub fn format_top_day(&self) -> String {
        match &self.top_day {
            Some(day) => format!("{} ({})", day.label(), visits_label(day.count)),
            None => "-".to_string(),
        }
    }

    pub fn format_top_week(&self) -> String {
        match &self.top_week {
            Some(week) => format!("{} ({})", week.label(), visits_label(week.count)),
            None => "-".to_string(),
        }
    }

    pub fn format_top_month(&self) -> String {
        match &self.top_month {
            Some(month) => format!("{} ({})", month.label(), visits_label(month.count)),
            None => "-".to_string(),
        }
    }

    /// Format the busiest day of week for display.
    pub fn format_busiest_day(&self) -> &'static str {
        self.busiest_day.map(day_name).unwrap_or("-")
    }
}

fn visits_label(count: u64) -> String {
    if count == 1 {
        "1 visit".to_string()
    } else {
        format!("{} visits", count)
    }
}

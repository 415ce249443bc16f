//! Analytics stages for dashpulse
//!
//! Each stage is a pure function over in-memory records:
//! - [`aggregate`]: per-user visit counts and last visit
//! - [`ranking`]: top-N users by visits
//! - [`buckets`]: busiest day, week and month
//! - [`linker`]: visit summaries joined to the user directory
//! - [`recency`]: last-login recency labels
//! - [`engagement`]: per-org-unit coverage and weekly consistency
//!
//! [`pipeline`] runs them in order for one [`ReportQuery`].

pub mod aggregate;
pub mod buckets;
pub mod dashboard;
pub mod engagement;
pub mod linker;
pub mod pipeline;
pub mod ranking;
pub mod recency;

pub use aggregate::{aggregate_visits, VisitAggregate, VisitSummary};
pub use buckets::{bucket_visits, week_start, DayBucket, MonthBucket, PeakActivity, WeekBucket};
pub use dashboard::DashboardStats;
pub use engagement::{
    access_percentage, trailing_weeks, CalendarWeek, DistrictEngagement, EngagementCalculator,
};
pub use linker::{enrich_top_users, link_users, LinkedUser};
pub use pipeline::{generate_report, Report, ReportInputs, ReportQuery};
pub use ranking::{top_n, TopUser, DEFAULT_TOP_USERS};
pub use recency::{
    classify, classify_activity, classify_users, days_since_last_login, filter_by_login_status,
    flagged_users, AccessRecency, ActivityStatus, LoginStatus, RecencySummary, RecencyThresholds,
    UserRecency,
};

/// `part / total` as a whole percentage, rounded half up, in `[0, 100]`.
///
/// Zero when `total` is zero.
pub fn rounded_percentage(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let part = part.min(total) as u128;
    let total = total as u128;
    ((part * 200 + total) / (total * 2)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_percentage() {
        assert_eq!(rounded_percentage(1, 2), 50);
        assert_eq!(rounded_percentage(1, 3), 33);
        assert_eq!(rounded_percentage(2, 3), 67);
        assert_eq!(rounded_percentage(1, 200), 1);
        assert_eq!(rounded_percentage(0, 7), 0);
        assert_eq!(rounded_percentage(3, 0), 0);
        // Clamped even for inconsistent inputs
        assert_eq!(rounded_percentage(9, 4), 100);
    }
}

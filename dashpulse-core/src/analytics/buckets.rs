//! Calendar bucketing of visits.
//!
//! Events are grouped by local calendar day, Sunday-start week and month
//! in the reporting offset. For each granularity the bucket with the most
//! visits is reported; ties go to the chronologically earliest bucket.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::format::{day_name, format_date, month_name};
use crate::types::{local_date, VisitEvent};

/// Visits on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub date: NaiveDate,
    pub count: u64,
}

impl DayBucket {
    pub fn label(&self) -> String {
        format_date(self.date)
    }
}

/// Visits in one Sunday-Saturday week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekBucket {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub count: u64,
}

impl WeekBucket {
    pub fn label(&self) -> String {
        format!("{} to {}", format_date(self.start), format_date(self.end))
    }
}

/// Visits in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    pub year: i32,
    /// 1-12
    pub month: u32,
    pub count: u64,
}

impl MonthBucket {
    /// Display name (e.g., "January 2024").
    pub fn label(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }
}

/// The Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = i64::from(date.weekday().num_days_from_sunday());
    date.checked_sub_signed(Duration::days(back))
        .unwrap_or(NaiveDate::MIN)
}

/// The Saturday closing the week that starts on `start`.
pub fn week_end(start: NaiveDate) -> NaiveDate {
    start
        .checked_add_signed(Duration::days(6))
        .unwrap_or(NaiveDate::MAX)
}

/// Peak buckets plus the per-day and per-weekday distributions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakActivity {
    pub top_day: Option<DayBucket>,
    pub top_week: Option<WeekBucket>,
    pub top_month: Option<MonthBucket>,
    /// Every day with at least one visit, ascending
    pub daily: Vec<DayBucket>,
    /// Visits by day of week (0=Sunday, 6=Saturday)
    pub weekday_counts: [u64; 7],
}

impl PeakActivity {
    /// Busiest day of week (0=Sunday), earliest weekday on ties.
    pub fn busiest_weekday(&self) -> Option<u8> {
        peak(self.weekday_counts.iter().enumerate().map(|(day, count)| (day as u8, *count)))
            .map(|(day, _)| day)
    }

    pub fn busiest_weekday_name(&self) -> Option<&'static str> {
        self.busiest_weekday().map(day_name)
    }
}

/// First entry with the strictly highest count; `None` if all are zero.
///
/// Callers iterate in chronological order, so the first maximum is the
/// earliest bucket.
fn peak<K>(counts: impl IntoIterator<Item = (K, u64)>) -> Option<(K, u64)> {
    let mut best: Option<(K, u64)> = None;
    for (key, count) in counts {
        let better = match &best {
            Some((_, top)) => count > *top,
            None => count > 0,
        };
        if better {
            best = Some((key, count));
        }
    }
    best
}

/// Group events into day, week and month buckets in `offset`.
pub fn bucket_visits(events: &[VisitEvent], offset: &FixedOffset) -> PeakActivity {
    let mut days: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut weeks: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut months: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    let mut weekday_counts = [0u64; 7];

    for event in events {
        let date = local_date(event.timestamp, offset);
        *days.entry(date).or_insert(0) += 1;
        *weeks.entry(week_start(date)).or_insert(0) += 1;
        *months.entry((date.year(), date.month())).or_insert(0) += 1;
        weekday_counts[date.weekday().num_days_from_sunday() as usize] += 1;
    }

    let top_day = peak(days.iter().map(|(d, c)| (*d, *c)))
        .map(|(date, count)| DayBucket { date, count });
    let top_week = peak(weeks.iter().map(|(d, c)| (*d, *c))).map(|(start, count)| WeekBucket {
        start,
        end: week_end(start),
        count,
    });
    let top_month = peak(months.iter().map(|(k, c)| (*k, *c)))
        .map(|((year, month), count)| MonthBucket { year, month, count });

    tracing::debug!(
        days = days.len(),
        weeks = weeks.len(),
        months = months.len(),
        "Bucketed visits"
    );

    PeakActivity {
        top_day,
        top_week,
        top_month,
        daily: days
            .into_iter()
            .map(|(date, count)| DayBucket { date, count })
            .collect(),
        weekday_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn visit(m: u32, d: u32, h: u32) -> VisitEvent {
        VisitEvent::new("u", Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap())
    }

    fn utc() -> FixedOffset {
        crate::config::utc_offset()
    }

    #[test]
    fn test_week_start_is_sunday() {
        // 2024-01-07 is a Sunday
        assert_eq!(week_start(date(2024, 1, 7)), date(2024, 1, 7));
        assert_eq!(week_start(date(2024, 1, 10)), date(2024, 1, 7));
        assert_eq!(week_start(date(2024, 1, 13)), date(2024, 1, 7));
        assert_eq!(week_start(date(2024, 1, 6)), date(2023, 12, 31));
        assert_eq!(week_end(date(2024, 1, 7)), date(2024, 1, 13));
    }

    #[test]
    fn test_peak_buckets() {
        let events = vec![
            visit(1, 1, 10),
            visit(1, 1, 11),
            visit(1, 2, 9),
            visit(2, 5, 9),
        ];
        let peaks = bucket_visits(&events, &utc());

        assert_eq!(
            peaks.top_day,
            Some(DayBucket {
                date: date(2024, 1, 1),
                count: 2
            })
        );
        // Jan 1 and 2 2024 share the week starting Sunday Dec 31
        assert_eq!(
            peaks.top_week,
            Some(WeekBucket {
                start: date(2023, 12, 31),
                end: date(2024, 1, 6),
                count: 3
            })
        );
        assert_eq!(
            peaks.top_month,
            Some(MonthBucket {
                year: 2024,
                month: 1,
                count: 3
            })
        );
        assert_eq!(peaks.daily.len(), 3);
    }

    #[test]
    fn test_ties_pick_earliest_bucket() {
        let events = vec![
            visit(3, 20, 9),
            visit(3, 5, 9),
            visit(4, 1, 9),
            visit(3, 20, 10),
            visit(3, 5, 10),
        ];
        let peaks = bucket_visits(&events, &utc());

        assert_eq!(peaks.top_day.map(|d| d.date), Some(date(2024, 3, 5)));
        assert_eq!(peaks.top_week.map(|w| w.start), Some(date(2024, 3, 3)));
        assert_eq!(peaks.top_month.map(|m| m.month), Some(3));
    }

    #[test]
    fn test_offset_moves_bucket() {
        // 23:30 UTC on Saturday Jan 6 is Sunday Jan 7 at +01:00
        let event = VisitEvent::new("u", Utc.with_ymd_and_hms(2024, 1, 6, 23, 30, 0).unwrap());
        let plus_one = FixedOffset::east_opt(3600).unwrap();

        let peaks = bucket_visits(&[event.clone()], &plus_one);
        assert_eq!(peaks.top_week.map(|w| w.start), Some(date(2024, 1, 7)));

        let peaks = bucket_visits(&[event], &utc());
        assert_eq!(peaks.top_week.map(|w| w.start), Some(date(2023, 12, 31)));
    }

    #[test]
    fn test_empty_has_no_peaks() {
        let peaks = bucket_visits(&[], &utc());
        assert_eq!(peaks, PeakActivity::default());
        assert_eq!(peaks.busiest_weekday(), None);
    }

    #[test]
    fn test_busiest_weekday() {
        // Jan 1 2024 is a Monday, Jan 3 a Wednesday
        let events = vec![visit(1, 1, 9), visit(1, 3, 9), visit(1, 3, 10)];
        let peaks = bucket_visits(&events, &utc());
        assert_eq!(peaks.weekday_counts, [0, 1, 0, 2, 0, 0, 0]);
        assert_eq!(peaks.busiest_weekday(), Some(3));
        assert_eq!(peaks.busiest_weekday_name(), Some("Wednesday"));
    }

    #[test]
    fn test_labels() {
        let month = MonthBucket {
            year: 2024,
            month: 2,
            count: 1,
        };
        assert_eq!(month.label(), "February 2024");
        let week = WeekBucket {
            start: date(2024, 1, 7),
            end: date(2024, 1, 13),
            count: 1,
        };
        assert_eq!(week.label(), "2024-01-07 to 2024-01-13");
    }
}

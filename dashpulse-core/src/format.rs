//! Formatting helpers shared by the report renderers.

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::NamedRef;

/// Placeholder for a user or unit with no recorded activity.
pub const NEVER: &str = "Never";

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Format an integer percentage (e.g., "67%").
pub fn format_percentage(percent: u8) -> String {
    format!("{}%", percent)
}

/// Format a timestamp relative to `as_of` (e.g., "2m ago").
pub fn format_relative_time(ts: DateTime<Utc>, as_of: DateTime<Utc>) -> String {
    let duration = as_of.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}

/// Format an optional timestamp as relative time, or "Never" if missing.
pub fn format_relative_time_opt(ts: Option<DateTime<Utc>>, as_of: DateTime<Utc>) -> String {
    match ts {
        Some(ts) => format_relative_time(ts, as_of),
        None => NEVER.to_string(),
    }
}

/// Full English month name for 1-12.
pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

/// Day name for 0=Sunday through 6=Saturday.
pub fn day_name(day: u8) -> &'static str {
    match day {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "Unknown",
    }
}

/// Comma-separated display names, falling back to ids for unnamed refs.
pub fn join_names(refs: &[NamedRef]) -> String {
    refs.iter()
        .map(|r| {
            if r.display_name.is_empty() {
                r.id.as_str()
            } else {
                r.display_name.as_str()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

//! Report generation.
//!
//! Wires the stages into one run: normalize, window, aggregate, rank,
//! bucket, link, classify recency, compute engagement. Every input is an
//! explicit value; the only notion of "now" is [`ReportQuery::as_of`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::aggregate::aggregate_visits;
use super::buckets::bucket_visits;
use super::dashboard::DashboardStats;
use super::engagement::{DistrictEngagement, EngagementCalculator};
use super::linker::{enrich_top_users, link_users, LinkedUser};
use super::recency::{classify_users, RecencySummary, RecencyThresholds, UserRecency};
use crate::config::Config;
use crate::error::DataIssue;
use crate::ingest::{normalize_visits, RawVisitRow};
use crate::types::{OrgUnit, ReportWindow, UserDirectoryEntry, VisitEvent};

/// Parameters of one report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    /// Dashboard the visits belong to, carried through for labelling
    pub dashboard_id: Option<String>,
    /// Dates to report on; `None` yields an empty report
    pub window: Option<ReportWindow>,
    /// Reduce the org-unit tree to this level before computing engagement
    pub org_unit_level: Option<u32>,
    /// Reference instant for recency and consistency
    pub as_of: DateTime<Utc>,
    /// Overrides `report.top_users`
    pub top_users: Option<usize>,
}

impl ReportQuery {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            dashboard_id: None,
            window: None,
            org_unit_level: None,
            as_of,
            top_users: None,
        }
    }

    pub fn with_window(mut self, window: ReportWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_dashboard(mut self, dashboard_id: impl Into<String>) -> Self {
        self.dashboard_id = Some(dashboard_id.into());
        self
    }

    pub fn with_org_unit_level(mut self, level: u32) -> Self {
        self.org_unit_level = Some(level);
        self
    }

    pub fn with_top_users(mut self, top_users: usize) -> Self {
        self.top_users = Some(top_users);
        self
    }
}

/// Data a report is computed from, already fetched by the caller.
#[derive(Debug, Clone, Default)]
pub struct ReportInputs {
    /// Raw visit rows for the dashboard
    pub visit_rows: Vec<RawVisitRow>,
    /// Directory subset the report is about
    pub directory: Vec<UserDirectoryEntry>,
    /// Org units, either a tree or a listing at the wanted level
    pub org_units: Vec<OrgUnit>,
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub as_of: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_id: Option<String>,
    pub window: Option<ReportWindow>,
    pub dashboard: DashboardStats,
    pub linked_users: Vec<LinkedUser>,
    pub recency: Vec<UserRecency>,
    pub recency_summary: RecencySummary,
    pub districts: Vec<DistrictEngagement>,
    /// Visit rows dropped as malformed
    pub skipped_rows: usize,
    pub issues: Vec<DataIssue>,
}

impl Report {
    /// A report with no data, for runs that cannot proceed.
    pub fn empty(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            dashboard_id: None,
            window: None,
            dashboard: DashboardStats::default(),
            linked_users: Vec::new(),
            recency: Vec::new(),
            recency_summary: RecencySummary::default(),
            districts: Vec::new(),
            skipped_rows: 0,
            issues: Vec::new(),
        }
    }

    /// Linked users that had no directory entry.
    pub fn unresolved_users(&self) -> impl Iterator<Item = &LinkedUser> {
        self.linked_users.iter().filter(|u| !u.matched)
    }
}

/// Run every stage over `inputs`.
///
/// Never fails: data problems are recorded in [`Report::issues`].
pub fn generate_report(query: &ReportQuery, inputs: &ReportInputs, config: &Config) -> Report {
    let mut report = Report::empty(query.as_of);
    report.dashboard_id = query.dashboard_id.clone();

    let Some(window) = query.window else {
        tracing::warn!("Report requested without a window");
        report.issues.push(DataIssue::MissingWindow);
        return report;
    };
    report.window = Some(window);

    let offset = config.report.offset();

    // Normalize and window
    let normalized = normalize_visits(&inputs.visit_rows, &offset);
    report.skipped_rows = normalized.skipped;
    report.issues.extend(normalized.issues);

    let events: Vec<VisitEvent> = normalized
        .events
        .into_iter()
        .filter(|event| window.contains(event.timestamp, &offset))
        .collect();

    // Dashboard stats
    let aggregate = aggregate_visits(&events);
    let peaks = bucket_visits(&events, &offset);
    let top_users = query.top_users.unwrap_or(config.report.top_users);
    report.dashboard = DashboardStats::from_parts(&aggregate, peaks, top_users);

    // Link users
    report.linked_users = link_users(&aggregate.to_vec(), &inputs.directory);
    enrich_top_users(&mut report.dashboard.top_users, &report.linked_users);
    let unresolved: Vec<DataIssue> = report
        .unresolved_users()
        .map(|u| DataIssue::UnresolvedUser {
            username: u.username.clone(),
        })
        .collect();
    report.issues.extend(unresolved);

    // Recency
    let thresholds = RecencyThresholds::from(&config.recency);
    report.recency = classify_users(&inputs.directory, query.as_of, &thresholds);
    report.recency_summary =
        RecencySummary::from_labels(report.recency.iter().map(|r| r.recency));

    // Engagement
    let units = match query.org_unit_level {
        Some(level) => OrgUnit::units_at_level(&inputs.org_units, level),
        None => inputs.org_units.clone(),
    };
    if units.is_empty() {
        report.issues.push(DataIssue::EmptyOrgUnitSet);
    } else {
        report.districts = EngagementCalculator::new(&config.engagement, query.as_of)
            .with_offset(offset)
            .compute(&units, &inputs.directory, Some(&aggregate));
    }

    tracing::info!(
        window_start = %window.start(),
        window_end = %window.end(),
        visits = report.dashboard.total_visits,
        users = report.linked_users.len(),
        districts = report.districts.len(),
        issues = report.issues.len(),
        "Generated report"
    );

    report
}

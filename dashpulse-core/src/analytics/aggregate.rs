//! Per-user visit aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::VisitEvent;

/// Visit count and most recent visit for one username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSummary {
    pub username: String,
    pub visit_count: u64,
    pub last_visit: DateTime<Utc>,
}

/// Visit summaries keyed by username.
///
/// Iteration is in ascending username order, which makes every
/// downstream ordering independent of the order events arrived in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitAggregate {
    by_user: BTreeMap<String, VisitSummary>,
}

impl VisitAggregate {
    /// Aggregate events in a single pass.
    pub fn from_events(events: &[VisitEvent]) -> Self {
        let mut by_user: BTreeMap<String, VisitSummary> = BTreeMap::new();

        for event in events {
            by_user
                .entry(event.username.clone())
                .and_modify(|summary| {
                    summary.visit_count += 1;
                    summary.last_visit = summary.last_visit.max(event.timestamp);
                })
                .or_insert_with(|| VisitSummary {
                    username: event.username.clone(),
                    visit_count: 1,
                    last_visit: event.timestamp,
                });
        }

        tracing::debug!(
            events = events.len(),
            users = by_user.len(),
            "Aggregated visits"
        );

        Self { by_user }
    }

    pub fn get(&self, username: &str) -> Option<&VisitSummary> {
        self.by_user.get(username)
    }

    /// Number of distinct usernames.
    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }

    /// Sum of all visit counts.
    pub fn total_visits(&self) -> u64 {
        self.by_user.values().map(|s| s.visit_count).sum()
    }

    /// Summaries in ascending username order.
    pub fn summaries(&self) -> impl Iterator<Item = &VisitSummary> {
        self.by_user.values()
    }

    pub fn to_vec(&self) -> Vec<VisitSummary> {
        self.summaries().cloned().collect()
    }
}

/// Group normalized visits by username.
pub fn aggregate_visits(events: &[VisitEvent]) -> VisitAggregate {
    VisitAggregate::from_events(events)
}

//! Top-N user ranking.

use serde::Serialize;

use super::aggregate::VisitSummary;

/// Default size of the top-users list.
pub const DEFAULT_TOP_USERS: usize = 5;

/// One row of the top-users list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub username: String,
    pub visits: u64,
    /// Filled in once the directory has been linked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
}

impl From<&VisitSummary> for TopUser {
    fn from(summary: &VisitSummary) -> Self {
        Self {
            username: summary.username.clone(),
            visits: summary.visit_count,
            first_name: None,
            surname: None,
        }
    }
}

/// The `k` summaries with the most visits, highest first.
///
/// The sort is stable: summaries with equal counts keep the order they
/// were given in. Fed from [`VisitAggregate`](super::VisitAggregate), that
/// means ascending username.
pub fn top_n(summaries: &[VisitSummary], k: usize) -> Vec<VisitSummary> {
    let mut ranked: Vec<VisitSummary> = summaries.to_vec();
    ranked.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    ranked.truncate(k);
    ranked
}

//! Aggregation of per-source results.
//!
//! This module builds the ordered per-query report from the source agents'
//! results and provides the views the analyzer and presentation layer need.

use crate::models::{Focus, Payload, Query, SourceId, SourceResult, SourceStatus};
use serde::Serialize;
use std::collections::BTreeSet;

/// Merged, ordered result of all source agents for one query.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    query: Query,
    results: Vec<SourceResult>,
    successful: usize,
    total: usize,
}

impl AggregateReport {
    /// Build a report, ordering results by source identity.
    pub fn from_results(query: Query, mut results: Vec<SourceResult>) -> Self {
        results.sort_by_key(SourceResult::source);
        let successful = results.iter().filter(|r| r.status().is_success()).count();
        let total = results.len();

        Self {
            query,
            results,
            successful,
            total,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// All results in source order.
    pub fn results(&self) -> &[SourceResult] {
        &self.results
    }

    /// Number of Live or Fallback results.
    pub fn successful(&self) -> usize {
        self.successful
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether any source produced usable data.
    pub fn has_data(&self) -> bool {
        self.successful > 0
    }

    /// Live and Fallback results, in source order.
    pub fn successful_results(&self) -> impl Iterator<Item = &SourceResult> {
        self.results.iter().filter(|r| r.status().is_success())
    }

    /// Failed results, in source order.
    pub fn failed_results(&self) -> impl Iterator<Item = &SourceResult> {
        self.results.iter().filter(|r| !r.status().is_success())
    }

    pub fn count_by_status(&self, status: SourceStatus) -> usize {
        self.results.iter().filter(|r| r.status() == status).count()
    }

    /// Sources whose data is usable.
    pub fn sources_used(&self) -> BTreeSet<SourceId> {
        self.successful_results().map(SourceResult::source).collect()
    }

    /// "3/4 sources succeeded".
    pub fn summary_line(&self) -> String {
        format!("{}/{} sources succeeded", self.successful, self.total)
    }

    /// The stat sheet to present for the player: the first Live result,
    /// else the first Fallback result.
    pub fn primary(&self) -> Option<&SourceResult> {
        self.results
            .iter()
            .find(|r| r.status() == SourceStatus::Live)
            .or_else(|| {
                self.results
                    .iter()
                    .find(|r| r.status() == SourceStatus::Fallback)
            })
    }
}

/// The part of a payload relevant to a focus.
pub fn filter_payload(payload: &Payload, focus: Focus) -> Payload {
    payload
        .iter()
        .filter(|(stat, _)| focus.matches_stat(stat))
        .map(|(stat, value)| (stat.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Format;
    use crate::testing::payload;

    fn query() -> Query {
        Query::new("Virat Kohli", Format::Test).unwrap()
    }

    fn mixed_results() -> Vec<SourceResult> {
        vec![
            SourceResult::failed(SourceId::Wikipedia, "404".to_string()),
            SourceResult::fallback(
                SourceId::EspnSearch,
                payload(&[("runs", "8848")]),
                "timeout".to_string(),
            ),
            SourceResult::live(SourceId::Cricbuzz, payload(&[("runs", "9230")])),
            SourceResult::fallback(
                SourceId::EspnDirect,
                payload(&[("runs", "8848")]),
                "blocked".to_string(),
            ),
        ]
    }

    #[test]
    fn test_results_are_ordered_by_source() {
        let report = AggregateReport::from_results(query(), mixed_results());
        let order: Vec<SourceId> = report.results().iter().map(SourceResult::source).collect();
        assert_eq!(order, SourceId::ALL.to_vec());
    }

    #[test]
    fn test_counts() {
        let report = AggregateReport::from_results(query(), mixed_results());
        assert_eq!(report.successful(), 3);
        assert_eq!(report.total(), 4);
        assert!(report.successful() <= report.total());
        assert_eq!(report.count_by_status(SourceStatus::Fallback), 2);
        assert_eq!(report.failed_results().count(), 1);
        assert_eq!(report.summary_line(), "3/4 sources succeeded");
        assert!(!report.sources_used().contains(&SourceId::Wikipedia));
    }

    #[test]
    fn test_primary_prefers_live() {
        let report = AggregateReport::from_results(query(), mixed_results());
        assert_eq!(report.primary().map(SourceResult::source), Some(SourceId::Cricbuzz));

        let fallback_only: Vec<SourceResult> = mixed_results()
            .into_iter()
            .filter(|r| r.status() != SourceStatus::Live)
            .collect();
        let report = AggregateReport::from_results(query(), fallback_only);
        assert_eq!(report.primary().map(SourceResult::source), Some(SourceId::EspnDirect));
    }

    #[test]
    fn test_empty_report() {
        let report = AggregateReport::from_results(query(), Vec::new());
        assert!(!report.has_data());
        assert!(report.primary().is_none());
        assert_eq!(report.summary_line(), "0/0 sources succeeded");
    }

    #[test]
    fn test_filter_payload() {
        let stats = payload(&[
            ("matches", "113"),
            ("runs", "8848"),
            ("wickets", "0"),
            ("catches", "121"),
        ]);
        let batting = filter_payload(&stats, Focus::Batting);
        assert_eq!(batting.len(), 2);
        assert!(batting.contains_key("runs"));

        let fielding = filter_payload(&stats, Focus::Fielding);
        assert_eq!(
            fielding.keys().cloned().collect::<Vec<_>>(),
            vec!["catches", "matches"]
        );
        assert_eq!(filter_payload(&stats, Focus::Overall), stats);
    }
}

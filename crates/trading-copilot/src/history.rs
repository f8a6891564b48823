//! Insight history with a fixed retention window

use chrono::{DateTime, Duration, Utc};

use crate::insights::Insight;

/// Default retention, in hours
pub const RETENTION_HOURS: i64 = 24;

#[derive(Debug)]
pub struct InsightHistory {
    insights: Vec<Insight>,
    retention: Duration,
}

impl Default for InsightHistory {
    fn default() -> Self {
        Self::new(Duration::hours(RETENTION_HOURS))
    }
}

impl InsightHistory {
    pub const fn new(retention: Duration) -> Self {
        Self { insights: Vec::new(), retention }
    }

    /// Append new insights and drop everything older than the retention window
    pub fn record(&mut self, insights: impl IntoIterator<Item = Insight>, now: DateTime<Utc>) {
        self.insights.extend(insights);
        let cutoff = now - self.retention;
        self.insights.retain(|i| i.timestamp > cutoff);
    }

    /// Insights newer than `hours` before `now`, oldest first. A window
    /// reaching past the representable range returns everything held.
    pub fn recent(&self, hours: u32, now: DateTime<Utc>) -> Vec<Insight> {
        let cutoff = Duration::try_hours(i64::from(hours))
            .and_then(|window| now.checked_sub_signed(window));
        self.insights
            .iter()
            .filter(|i| cutoff.is_none_or(|cutoff| i.timestamp > cutoff))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.insights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::InsightKind;

    fn insight(id: &str, at: DateTime<Utc>) -> Insight {
        Insight::new(id, InsightKind::Technical, id, "").at(at)
    }

    #[test]
    fn test_record_prunes_expired() {
        let now = Utc::now();
        let mut history = InsightHistory::default();

        history.record([insight("old", now - Duration::hours(30))], now);
        assert!(history.is_empty());

        history.record(
            [insight("a", now - Duration::hours(3)), insight("b", now - Duration::minutes(5))],
            now,
        );
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_recent_window() {
        let now = Utc::now();
        let mut history = InsightHistory::default();
        history.record(
            [insight("a", now - Duration::hours(5)), insight("b", now - Duration::minutes(30))],
            now,
        );

        let ids: Vec<_> = history.recent(1, now).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(history.recent(24, now).len(), 2);
        assert!(history.recent(0, now).is_empty());
    }

    #[test]
    fn test_recent_with_huge_window_returns_everything() {
        let now = Utc::now();
        let mut history = InsightHistory::default();
        history.record(
            [insight("a", now - Duration::hours(20)), insight("b", now - Duration::minutes(1))],
            now,
        );

        assert_eq!(history.recent(u32::MAX, now).len(), 2);
    }
}

//! Daily energy series

use chrono::Duration;
use futures::future::try_join_all;

use crate::error::Result;
use crate::models::{DateRange, Scope};

use super::AggregationEngine;

/// Summed daily energy for the `days` calendar days ending at `range.end`'s
/// day, oldest first.
///
/// Each day is one aggregation query; the queries run concurrently and the
/// series fails as a whole if any of them does.
pub async fn daily_series(
    engine: &AggregationEngine,
    scope: &Scope,
    range: DateRange,
    days: u32,
) -> Result<Vec<f64>> {
    let last_day = range.end.date_naive();

    let queries = (0..days).rev().map(move |offset| {
        let day = DateRange::day(last_day - Duration::days(i64::from(offset)));
        engine.total_energy(scope, day)
    });

    try_join_all(queries).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{ApiFilter, MetricRecord, TimeFrame};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_series_is_oldest_first_with_zero_gaps() {
        let at = |day, hour| Utc.with_ymd_and_hms(2025, 5, day, hour, 0, 0).unwrap();
        let store = InMemoryStore::with_records(vec![
            MetricRecord::new(at(14, 1), "ns", "c").with_energy(5.0, 0.0),
            MetricRecord::new(at(14, 23), "ns", "c").with_energy(1.5, 0.0),
            MetricRecord::new(at(20, 0), "ns", "c").with_energy(7.0, 0.0),
            MetricRecord::new(at(13, 12), "ns", "c").with_energy(100.0, 0.0),
        ]);
        let engine = AggregationEngine::new(Arc::new(store));
        let range = crate::analytics::resolve(TimeFrame::Monthly, at(20, 15));

        let series = daily_series(&engine, &Scope::container("ns", "c"), range, 7)
            .await
            .unwrap();

        assert_eq!(series, vec![6.5, 0.0, 0.0, 0.0, 0.0, 0.0, 7.0]);
    }

    #[tokio::test]
    async fn test_series_respects_api_scope() {
        let at = |hour| Utc.with_ymd_and_hms(2025, 5, 20, hour, 0, 0).unwrap();
        let store = InMemoryStore::with_records(vec![
            MetricRecord::new(at(1), "ns", "c").with_api("a", "GET").with_energy(2.0, 0.0),
            MetricRecord::new(at(2), "ns", "c").with_api("b", "GET").with_energy(3.0, 0.0),
            MetricRecord::new(at(3), "ns", "c").with_energy(4.0, 0.0),
        ]);
        let engine = AggregationEngine::new(Arc::new(store));
        let range = crate::analytics::resolve(TimeFrame::Weekly, at(12));

        let named = Scope::container("ns", "c").with_api(ApiFilter::Named("a".into()));
        let unnamed = Scope::container("ns", "c").with_api(ApiFilter::Unnamed);

        let named_series = daily_series(&engine, &named, range, 8).await.unwrap();
        let unnamed_series = daily_series(&engine, &unnamed, range, 8).await.unwrap();

        assert_eq!(named_series.len(), 8);
        assert_eq!(named_series[7], 2.0);
        assert_eq!(unnamed_series[7], 4.0);
        assert!(named_series[..7].iter().all(|v| *v == 0.0));
    }
}

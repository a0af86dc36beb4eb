//! Period-over-period comparison

use crate::error::Result;
use crate::models::{DateRange, Scope};

use super::AggregationEngine;

/// Percent change from `previous` to `current`; `0` when there is no baseline
#[allow(clippy::float_cmp)]
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Percent change of `current_total` against the window of equal length that
/// ends right before `current_range` starts
pub async fn percent_delta(
    engine: &AggregationEngine,
    scope: &Scope,
    current_total: f64,
    current_range: DateRange,
) -> Result<f64> {
    let previous_total = engine
        .total_energy(scope, current_range.preceding())
        .await?;
    Ok(percent_change(current_total, previous_total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{MetricRecord, TimeFrame};
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(150.0, 100.0), 50.0);
        assert_eq!(percent_change(50.0, 100.0), -50.0);
        assert_eq!(percent_change(0.0, 0.0), 0.0);
    }

    proptest! {
        #[test]
        fn no_baseline_means_no_change(current in 0.0f64..1.0e9) {
            prop_assert_eq!(percent_change(current, 0.0), 0.0);
        }
    }

    #[tokio::test]
    async fn test_delta_uses_preceding_window() {
        let now = Utc.with_ymd_and_hms(2025, 5, 20, 10, 0, 0).unwrap();
        let range = crate::analytics::resolve(TimeFrame::Weekly, now);
        let store = InMemoryStore::with_records(vec![
            // Previous window: 2025-05-05 .. 2025-05-12
            MetricRecord::new(range.start - Duration::days(3), "ns", "c").with_energy(80.0, 0.0),
            // Just before the previous window, ignored
            MetricRecord::new(range.start - Duration::days(9), "ns", "c").with_energy(500.0, 0.0),
        ]);
        let engine = AggregationEngine::new(Arc::new(store));

        let delta = percent_delta(&engine, &Scope::container("ns", "c"), 100.0, range)
            .await
            .unwrap();

        assert_eq!(delta, 25.0);
    }
}

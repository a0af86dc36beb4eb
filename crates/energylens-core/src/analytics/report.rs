//! Report assembly
//!
//! Both reports are all-or-nothing: the first failing store query fails the
//! whole report and nothing partial is returned.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::db::MetricStore;
use crate::error::Result;
use crate::models::{
    ApiDetails, ApiFilter, ApiGroup, ApiPerformance, DateRange, PerformanceReport, RecordsPage,
    Scope, SummaryReport, TimeFrame,
};
use crate::telemetry;

use super::suggestions::{suggest, ApiMetrics};
use super::{
    co2, dedupe_dependents, percent_delta, resolve, round2, round_half_up, trend,
    AggregationEngine,
};

/// Days in the summary report's trend, whatever the time frame
pub const SUMMARY_TREND_DAYS: u32 = 7;

/// Days in each API's trend of the performance report
pub const PERFORMANCE_TREND_DAYS: u32 = 8;

/// APIs of one performance report built at the same time; each issues
/// [`PERFORMANCE_TREND_DAYS`] concurrent day queries
pub const API_CONCURRENCY: usize = 8;

/// Key used for records that carry no API name
pub const UNKNOWN_API: &str = "unknown";

/// Source of the reference instant windows are resolved against
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Builds the summary and performance reports over one store handle
#[derive(Clone)]
pub struct ReportBuilder {
    engine: AggregationEngine,
    clock: Clock,
}

impl ReportBuilder {
    /// Create a builder reading from `store` with the system clock
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self {
            engine: AggregationEngine::new(store),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the clock, e.g. to pin reports to a fixed day
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The aggregation engine backing this builder
    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    /// Energy summary of one container over `time_frame`
    pub async fn summary_report(
        &self,
        namespace: &str,
        container: &str,
        time_frame: TimeFrame,
    ) -> Result<SummaryReport> {
        let started = Instant::now();
        let result = self.build_summary(namespace, container, time_frame).await;
        telemetry::record_report("summary", started.elapsed(), result.is_ok());
        result
    }

    /// Per-API performance of one container over `time_frame`
    pub async fn performance_report(
        &self,
        namespace: &str,
        container: &str,
        time_frame: TimeFrame,
    ) -> Result<PerformanceReport> {
        let started = Instant::now();
        let result = self.build_performance(namespace, container, time_frame).await;
        telemetry::record_report("performance", started.elapsed(), result.is_ok());
        result
    }

    /// Raw records of one container inside `range`, newest first
    pub async fn filtered_records(
        &self,
        namespace: &str,
        container: &str,
        range: DateRange,
    ) -> Result<RecordsPage> {
        let scope = Scope::container(namespace, container);
        let records = self.engine.records(&scope, range).await?;
        debug!(namespace, container, count = records.len(), "Fetched filtered records");
        Ok(RecordsPage::from(records))
    }

    async fn build_summary(
        &self,
        namespace: &str,
        container: &str,
        time_frame: TimeFrame,
    ) -> Result<SummaryReport> {
        let window = resolve(time_frame, (self.clock)());
        let scope = Scope::container(namespace, container);

        info!(
            namespace,
            container,
            time_frame = %time_frame,
            start = %window.start,
            end = %window.end,
            "Building summary report"
        );

        let (current, daily) = tokio::try_join!(
            self.engine.summarize(&scope, window),
            trend::daily_series(&self.engine, &scope, window, SUMMARY_TREND_DAYS),
        )?;
        let comparison = percent_delta(&self.engine, &scope, current.total_energy, window).await?;

        Ok(SummaryReport {
            total_energy: round_half_up(current.total_energy) as i64,
            cpu_energy: round_half_up(current.cpu_energy) as i64,
            ram_energy: round_half_up(current.ram_energy) as i64,
            avg_execution_time: round_half_up(current.avg_execution_time) as i64,
            memory_used: round2(current.memory_used),
            last_week_trend: daily.into_iter().map(round2).collect(),
            comparison: round2(comparison),
            record_count: current.count,
        })
    }

    async fn build_performance(
        &self,
        namespace: &str,
        container: &str,
        time_frame: TimeFrame,
    ) -> Result<PerformanceReport> {
        let window = resolve(time_frame, (self.clock)());
        let scope = Scope::container(namespace, container);

        let groups = self.engine.summarize_by_api(&scope, window).await?;
        info!(
            namespace,
            container,
            time_frame = %time_frame,
            apis = groups.len(),
            "Building performance report"
        );

        let scope = &scope;
        let entries: Vec<_> = stream::iter(groups)
            .map(move |group| self.api_performance(scope, window, group))
            .buffered(API_CONCURRENCY)
            .try_collect()
            .await?;

        // The total only counts groups that made it into `apis`
        let mut total_energy = 0.0;
        let mut apis = BTreeMap::new();
        for (name, energy, performance) in entries {
            let key = name.unwrap_or_else(|| UNKNOWN_API.to_string());
            match apis.entry(key) {
                Entry::Vacant(slot) => {
                    total_energy += energy;
                    slot.insert(performance);
                }
                Entry::Occupied(slot) => {
                    warn!(
                        api = %slot.key(),
                        dropped_energy = energy,
                        "Unnamed records share a key with a named API; keeping the named one"
                    );
                }
            }
        }

        Ok(PerformanceReport {
            total_energy: round2(total_energy),
            time_frame: time_frame.to_string(),
            apis,
        })
    }

    /// Returns the group's name, its unrounded energy and its report entry
    async fn api_performance(
        &self,
        scope: &Scope,
        window: DateRange,
        group: ApiGroup,
    ) -> Result<(Option<String>, f64, ApiPerformance)> {
        let api_scope = scope
            .clone()
            .with_api(ApiFilter::for_group(group.api_name.as_deref()));
        let perf_trends =
            trend::daily_series(&self.engine, &api_scope, window, PERFORMANCE_TREND_DAYS).await?;

        let dependents = dedupe_dependents(&group.traces);
        let energy = group.summary.total_energy;
        let co2_emission = co2(energy);

        let suggestions = suggest(&ApiMetrics {
            avg_execution_time: group.summary.avg_execution_time,
            avg_memory_used: group.avg_memory_used,
            total_energy: energy,
            dependent_count: dependents.len(),
            co2_emission,
        });

        let performance = ApiPerformance {
            energy: round2(energy),
            avg_time: round2(group.summary.avg_execution_time),
            co2_emission: round2(co2_emission),
            memory_used: round2(group.avg_memory_used),
            method: group.method,
            details: ApiDetails {
                suggestions: suggestions.iter().map(ToString::to_string).collect(),
                perf_trends: perf_trends.into_iter().map(round2).collect(),
                dependents,
            },
        };

        Ok((group.api_name, energy, performance))
    }
}

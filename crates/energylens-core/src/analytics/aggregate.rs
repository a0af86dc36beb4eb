//! Sum/average summaries over a filtered window

use std::sync::Arc;

use tracing::debug;

use crate::db::MetricStore;
use crate::error::Result;
use crate::models::{ApiGroup, DateRange, EnergySummary, GroupKey, MetricRecord, Scope};

/// Runs filter and group-reduce queries against a [`MetricStore`]
#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn MetricStore>,
}

impl AggregationEngine {
    /// Create an engine over an explicit store handle
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// The store this engine queries
    pub fn store(&self) -> &Arc<dyn MetricStore> {
        &self.store
    }

    /// Summarize every record of `scope` inside `range`.
    ///
    /// Energy and memory are summed, execution time averaged. No matching
    /// records gives an all-zero summary.
    pub async fn summarize(&self, scope: &Scope, range: DateRange) -> Result<EnergySummary> {
        metrics::counter!("energylens_store_queries_total", "op" => "summarize").increment(1);

        let groups = self
            .store
            .group_reduce(&scope.during(range), GroupKey::None)
            .await?;

        Ok(groups.first().map(EnergySummary::from).unwrap_or_default())
    }

    /// Summed `totalEnergy_J` of `scope` inside `range`
    pub async fn total_energy(&self, scope: &Scope, range: DateRange) -> Result<f64> {
        Ok(self.summarize(scope, range).await?.total_energy)
    }

    /// Summarize per `apiName`, keeping each group's first method and traces
    pub async fn summarize_by_api(&self, scope: &Scope, range: DateRange) -> Result<Vec<ApiGroup>> {
        metrics::counter!("energylens_store_queries_total", "op" => "summarize_by_api")
            .increment(1);

        let groups = self
            .store
            .group_reduce(&scope.during(range), GroupKey::ApiName)
            .await?;

        debug!(
            namespace = %scope.namespace,
            container = %scope.container,
            groups = groups.len(),
            "Grouped records by API"
        );

        Ok(groups.into_iter().map(ApiGroup::from).collect())
    }

    /// Raw records of `scope` inside `range`, newest first
    pub async fn records(&self, scope: &Scope, range: DateRange) -> Result<Vec<MetricRecord>> {
        metrics::counter!("energylens_store_queries_total", "op" => "query").increment(1);
        self.store.query(&scope.during(range)).await
    }
}

//! PostgreSQL connection and queries
//!
//! Records live in the `energy_metrics` table, one column per scalar field
//! and the trace as a JSONB array. Filters are built with bound parameters.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{ApiFilter, GroupKey, GroupReduction, MetricRecord, RecordFilter, TraceEntry};

use super::MetricStore;

const RECORD_COLUMNS: &str = "timestamp, namespace, container, api_name, method_name, path, \
     total_execution_time_ms, cpu_time_ms, memory_used_mb, cpu_energy_j, ram_energy_j, \
     total_energy_j, trace";

/// PostgreSQL connection pool
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Create a new PostgreSQL connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Read-only repository over the `energy_metrics` table
#[derive(Clone)]
pub struct MetricRepository {
    pool: PgPool,
}

impl MetricRepository {
    /// Create a new metric repository
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool.clone(),
        }
    }
}

#[async_trait]
impl MetricStore for MetricRepository {
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<MetricRecord>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(RECORD_COLUMNS).push(" FROM energy_metrics");
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY timestamp DESC, id DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        debug!(rows = rows.len(), "Fetched energy records");

        rows.iter().map(row_to_record).collect()
    }

    async fn group_reduce(
        &self,
        filter: &RecordFilter,
        key: GroupKey,
    ) -> Result<Vec<GroupReduction>> {
        let mut builder = group_reduce_query(filter, key);
        let rows = builder.build().fetch_all(&self.pool).await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            let group = row_to_group(row, key)?;
            // An ungrouped aggregate yields one row even when nothing matched
            if group.count > 0 {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RecordFilter) {
    builder
        .push(" WHERE timestamp >= ")
        .push_bind(filter.range.start)
        .push(" AND timestamp <= ")
        .push_bind(filter.range.end)
        .push(" AND namespace = ")
        .push_bind(filter.scope.namespace.clone())
        .push(" AND container = ")
        .push_bind(filter.scope.container.clone());

    match &filter.scope.api {
        ApiFilter::Any => {}
        ApiFilter::Named(name) => {
            builder.push(" AND api_name = ").push_bind(name.clone());
        }
        ApiFilter::Unnamed => {
            builder.push(" AND api_name IS NULL");
        }
    }
}

fn group_reduce_query(filter: &RecordFilter, key: GroupKey) -> QueryBuilder<'static, Postgres> {
    let group_column = match key {
        GroupKey::None => "NULL::text",
        GroupKey::ApiName => "api_name",
    };

    let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
    builder.push(group_column).push(
        r#" AS api_name,
            COUNT(*) AS record_count,
            COALESCE(SUM(total_energy_j), 0) AS total_energy,
            COALESCE(SUM(cpu_energy_j), 0) AS cpu_energy,
            COALESCE(SUM(ram_energy_j), 0) AS ram_energy,
            COALESCE(AVG(total_execution_time_ms), 0) AS avg_execution_time,
            COALESCE(SUM(memory_used_mb), 0) AS memory_sum,
            COALESCE(AVG(memory_used_mb), 0) AS memory_avg,
            (ARRAY_AGG(method_name ORDER BY timestamp, id))[1] AS first_method"#,
    );
    if key == GroupKey::ApiName {
        builder.push(", JSONB_AGG(trace ORDER BY timestamp, id) AS traces");
    }
    builder.push(" FROM energy_metrics");
    push_filter(&mut builder, filter);
    if key == GroupKey::ApiName {
        builder.push(" GROUP BY api_name ORDER BY api_name ASC NULLS LAST");
    }
    builder
}

fn row_to_record(row: &PgRow) -> Result<MetricRecord> {
    let Json(trace): Json<Option<Vec<TraceEntry>>> = row.try_get("trace")?;

    Ok(MetricRecord {
        timestamp: row.try_get("timestamp")?,
        namespace: row.try_get("namespace")?,
        container: row.try_get("container")?,
        api_name: row.try_get("api_name")?,
        method_name: row.try_get("method_name")?,
        path: row.try_get("path")?,
        total_execution_time_ms: row.try_get("total_execution_time_ms")?,
        cpu_time_ms: row.try_get("cpu_time_ms")?,
        memory_used_mb: row.try_get("memory_used_mb")?,
        cpu_energy_j: row.try_get("cpu_energy_j")?,
        ram_energy_j: row.try_get("ram_energy_j")?,
        total_energy_j: row.try_get("total_energy_j")?,
        trace: trace.unwrap_or_default(),
    })
}

fn row_to_group(row: &PgRow, key: GroupKey) -> Result<GroupReduction> {
    let count: i64 = row.try_get("record_count")?;
    let traces = match key {
        GroupKey::None => Vec::new(),
        GroupKey::ApiName => {
            // A JSON `null` trace counts as no downstream calls
            let Json(traces): Json<Vec<Option<Vec<TraceEntry>>>> = row.try_get("traces")?;
            traces.into_iter().map(Option::unwrap_or_default).collect()
        }
    };

    Ok(GroupReduction {
        api_name: row.try_get("api_name")?,
        count: u64::try_from(count).unwrap_or_default(),
        total_energy: row.try_get("total_energy")?,
        cpu_energy: row.try_get("cpu_energy")?,
        ram_energy: row.try_get("ram_energy")?,
        avg_execution_time: row.try_get("avg_execution_time")?,
        memory_sum: row.try_get("memory_sum")?,
        memory_avg: row.try_get("memory_avg")?,
        first_method: row.try_get("first_method")?,
        traces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, Scope};
    use chrono::NaiveDate;

    fn filter(api: ApiFilter) -> RecordFilter {
        Scope::container("contactcenterservices", "skills-financial")
            .with_api(api)
            .during(DateRange::day(NaiveDate::from_ymd_opt(2025, 5, 3).unwrap()))
    }

    #[test]
    fn test_filter_binds_every_value() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM energy_metrics");
        push_filter(&mut builder, &filter(ApiFilter::Named("getLoans".into())));

        let sql = builder.sql();
        assert!(sql.contains("timestamp >= $1 AND timestamp <= $2"));
        assert!(sql.contains("namespace = $3 AND container = $4"));
        assert!(sql.contains("api_name = $5"));
        assert!(!sql.contains("skills-financial"));
    }

    #[test]
    fn test_unnamed_filter_checks_null() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM energy_metrics");
        push_filter(&mut builder, &filter(ApiFilter::Unnamed));
        assert!(builder.sql().ends_with("AND api_name IS NULL"));
    }

    #[test]
    fn test_group_by_api_collects_traces() {
        let builder = group_reduce_query(&filter(ApiFilter::Any), GroupKey::ApiName);
        let sql = builder.sql();
        assert!(sql.starts_with("SELECT api_name AS api_name"));
        assert!(sql.contains("JSONB_AGG(trace ORDER BY timestamp, id) AS traces"));
        assert!(sql.ends_with("GROUP BY api_name ORDER BY api_name ASC NULLS LAST"));
    }

    #[test]
    fn test_single_group_has_no_group_by() {
        let builder = group_reduce_query(&filter(ApiFilter::Any), GroupKey::None);
        let sql = builder.sql();
        assert!(sql.starts_with("SELECT NULL::text AS api_name"));
        assert!(!sql.contains("GROUP BY"));
        assert!(!sql.contains("JSONB_AGG"));
    }
}

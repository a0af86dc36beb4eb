//! Record store access for EnergyLens
//!
//! The analytics engine talks to a [`MetricStore`] handle that the caller
//! creates at startup and passes in. Two adapters exist: Postgres for
//! deployments and an in-memory store for tests and local runs.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::{MetricRepository, PostgresPool};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{GroupKey, GroupReduction, MetricRecord, RecordFilter};

/// Filter and group-reduce primitives over stored [`MetricRecord`]s
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Records matching `filter`, newest first
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<MetricRecord>>;

    /// Sum/average/first/push reductions over the records matching `filter`.
    ///
    /// Returns no groups when nothing matches. With [`GroupKey::ApiName`],
    /// named groups come first ordered by name and the unnamed group last.
    async fn group_reduce(&self, filter: &RecordFilter, key: GroupKey)
        -> Result<Vec<GroupReduction>>;

    /// Check that the store answers queries
    async fn health_check(&self) -> Result<()>;
}

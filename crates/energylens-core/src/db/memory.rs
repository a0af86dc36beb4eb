//! Process-local record store

use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::models::{GroupKey, GroupReduction, MetricRecord, RecordFilter};

use super::MetricStore;

/// Record store held in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<MetricRecord>>,
}

impl InMemoryStore {
    /// Create a store holding `records`
    pub fn with_records(records: impl IntoIterator<Item = MetricRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Decode a JSON array of stored records
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let records: Vec<MetricRecord> = serde_json::from_slice(bytes)?;
        Ok(Self::with_records(records))
    }

    /// Load a JSON fixture file of stored records
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Matching records, oldest first; ties keep insertion order
    fn matching(&self, filter: &RecordFilter) -> Vec<MetricRecord> {
        let mut matching: Vec<MetricRecord> = self
            .records
            .read()
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matching.sort_by_key(|record| record.timestamp);
        matching
    }
}

#[async_trait]
impl MetricStore for InMemoryStore {
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<MetricRecord>> {
        let mut records = self.matching(filter);
        records.reverse();
        Ok(records)
    }

    async fn group_reduce(
        &self,
        filter: &RecordFilter,
        key: GroupKey,
    ) -> Result<Vec<GroupReduction>> {
        let records = self.matching(filter);
        if records.is_empty() {
            return Ok(Vec::new());
        }

        match key {
            GroupKey::None => Ok(vec![reduce(None, &records, false)]),
            GroupKey::ApiName => {
                let mut names: Vec<Option<String>> = Vec::new();
                for record in &records {
                    if !names.contains(&record.api_name) {
                        names.push(record.api_name.clone());
                    }
                }
                names.sort_by(|a, b| match (a, b) {
                    (Some(a), Some(b)) => a.cmp(b),
                    (a, b) => a.is_none().cmp(&b.is_none()),
                });

                Ok(names
                    .into_iter()
                    .map(|name| {
                        let group: Vec<MetricRecord> = records
                            .iter()
                            .filter(|record| record.api_name == name)
                            .cloned()
                            .collect();
                        reduce(name, &group, true)
                    })
                    .collect())
            }
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Reduce a non-empty, oldest-first group
fn reduce(api_name: Option<String>, records: &[MetricRecord], push_traces: bool) -> GroupReduction {
    let count = records.len() as f64;
    let sum = |field: fn(&MetricRecord) -> f64| records.iter().map(field).sum::<f64>();

    let memory_sum = sum(|r| r.memory_used_mb);

    GroupReduction {
        api_name,
        count: records.len() as u64,
        total_energy: sum(|r| r.total_energy_j),
        cpu_energy: sum(|r| r.cpu_energy_j),
        ram_energy: sum(|r| r.ram_energy_j),
        avg_execution_time: sum(|r| r.total_execution_time_ms) / count,
        memory_sum,
        memory_avg: memory_sum / count,
        first_method: records.first().and_then(|r| r.method_name.clone()),
        traces: if push_traces {
            records.iter().map(|r| r.trace.clone()).collect()
        } else {
            Vec::new()
        },
    }
}

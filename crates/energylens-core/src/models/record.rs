//! Stored telemetry records
//!
//! Field names on the wire follow the stored document shape
//! (`totalEnergy_J`, `memoryUsed_MB`, ...). Missing or `null` numbers decode as zero
//! and missing strings as `None`, so shape coercion stays at the store boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One measured top-level API invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// When the invocation was measured
    pub timestamp: DateTime<Utc>,

    /// Namespace of the deployed service unit
    pub namespace: String,

    /// Container that served the invocation
    pub container: String,

    /// API that was invoked
    #[serde(rename = "apiName", default)]
    pub api_name: Option<String>,

    /// HTTP method of the invocation
    #[serde(rename = "methodName", default)]
    pub method_name: Option<String>,

    /// Request path
    #[serde(default)]
    pub path: Option<String>,

    /// Wall-clock execution time in milliseconds
    #[serde(rename = "total_executionTime_MS", default, deserialize_with = "null_as_default")]
    pub total_execution_time_ms: f64,

    /// CPU time in milliseconds
    #[serde(rename = "cpuTime_MS", default, deserialize_with = "null_as_default")]
    pub cpu_time_ms: f64,

    /// Memory used in megabytes
    #[serde(rename = "memoryUsed_MB", default, deserialize_with = "null_as_default")]
    pub memory_used_mb: f64,

    /// CPU energy in joules
    #[serde(rename = "cpuEnergy_J", default, deserialize_with = "null_as_default")]
    pub cpu_energy_j: f64,

    /// RAM energy in joules
    #[serde(rename = "ramEnergy_J", default, deserialize_with = "null_as_default")]
    pub ram_energy_j: f64,

    /// Total energy in joules, normally `cpu_energy_j + ram_energy_j`
    #[serde(rename = "totalEnergy_J", default, deserialize_with = "null_as_default")]
    pub total_energy_j: f64,

    /// Downstream calls triggered by this invocation
    #[serde(default, deserialize_with = "null_as_default")]
    pub trace: Vec<TraceEntry>,
}

/// One downstream call recorded inside a [`MetricRecord`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Container that served the downstream call
    #[serde(default, deserialize_with = "null_as_default")]
    pub container: String,

    /// Namespace of the downstream container, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// API called downstream
    #[serde(rename = "apiName", default)]
    pub api_name: Option<String>,

    /// HTTP method of the downstream call
    #[serde(rename = "methodName", default)]
    pub method_name: Option<String>,

    /// Request path of the downstream call
    #[serde(default)]
    pub path: Option<String>,

    /// Execution time in milliseconds
    #[serde(rename = "total_executionTime_MS", default, deserialize_with = "null_as_default")]
    pub total_execution_time_ms: f64,

    /// CPU time in milliseconds
    #[serde(rename = "cpuTime_MS", default, deserialize_with = "null_as_default")]
    pub cpu_time_ms: f64,

    /// Memory used in megabytes
    #[serde(rename = "memoryUsed_MB", default, deserialize_with = "null_as_default")]
    pub memory_used_mb: f64,

    /// CPU energy in joules
    #[serde(rename = "cpuEnergy_J", default, deserialize_with = "null_as_default")]
    pub cpu_energy_j: f64,

    /// RAM energy in joules
    #[serde(rename = "ramEnergy_J", default, deserialize_with = "null_as_default")]
    pub ram_energy_j: f64,

    /// Total energy in joules
    #[serde(rename = "totalEnergy_J", default, deserialize_with = "null_as_default")]
    pub total_energy_j: f64,
}

/// Decode `null` as the type's default value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl MetricRecord {
    /// Create a record with zeroed measurements and no trace
    pub fn new(
        timestamp: DateTime<Utc>,
        namespace: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            namespace: namespace.into(),
            container: container.into(),
            api_name: None,
            method_name: None,
            path: None,
            total_execution_time_ms: 0.0,
            cpu_time_ms: 0.0,
            memory_used_mb: 0.0,
            cpu_energy_j: 0.0,
            ram_energy_j: 0.0,
            total_energy_j: 0.0,
            trace: Vec::new(),
        }
    }

    /// Set the API and method name
    #[must_use]
    pub fn with_api(mut self, api_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        self.api_name = Some(api_name.into());
        self.method_name = Some(method_name.into());
        self
    }

    /// Set the energy split; the total is their sum
    #[must_use]
    pub fn with_energy(mut self, cpu_energy_j: f64, ram_energy_j: f64) -> Self {
        self.cpu_energy_j = cpu_energy_j;
        self.ram_energy_j = ram_energy_j;
        self.total_energy_j = cpu_energy_j + ram_energy_j;
        self
    }

    /// Set execution time and memory
    #[must_use]
    pub fn with_usage(mut self, total_execution_time_ms: f64, memory_used_mb: f64) -> Self {
        self.total_execution_time_ms = total_execution_time_ms;
        self.memory_used_mb = memory_used_mb;
        self
    }

    /// Append a downstream call
    #[must_use]
    pub fn with_trace(mut self, entry: TraceEntry) -> Self {
        self.trace.push(entry);
        self
    }
}

impl TraceEntry {
    /// Create a trace entry for a downstream call
    pub fn new(
        container: impl Into<String>,
        api_name: impl Into<String>,
        total_energy_j: f64,
    ) -> Self {
        Self {
            container: container.into(),
            api_name: Some(api_name.into()),
            total_energy_j,
            ..Self::default()
        }
    }

    /// Set the HTTP method
    #[must_use]
    pub fn with_method(mut self, method_name: impl Into<String>) -> Self {
        self.method_name = Some(method_name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_document_shape() {
        let record: MetricRecord = serde_json::from_value(serde_json::json!({
            "timestamp": "2025-05-03T10:15:00Z",
            "namespace": "contactcenterservices",
            "container": "skills-financial",
            "apiName": "getLoans",
            "methodName": "GET",
            "path": "/bawaba/loans/v1",
            "total_executionTime_MS": 1830.5,
            "cpuTime_MS": 910.2,
            "memoryUsed_MB": 12.5,
            "cpuEnergy_J": 609.8,
            "ramEnergy_J": 0.003,
            "totalEnergy_J": 609.803,
            "trace": [{
                "container": "skills-loan",
                "namespace": "contactcenterservices",
                "path": "/bawaba/loans/v1",
                "totalEnergy_J": 420.0
            }]
        }))
        .unwrap();

        assert_eq!(record.api_name.as_deref(), Some("getLoans"));
        assert_eq!(record.total_energy_j, 609.803);
        assert_eq!(record.trace.len(), 1);
        assert_eq!(record.trace[0].container, "skills-loan");
        assert_eq!(record.trace[0].api_name, None);
        assert_eq!(record.trace[0].cpu_energy_j, 0.0);
    }

    #[test]
    fn test_missing_fields_are_coerced() {
        let record: MetricRecord = serde_json::from_value(serde_json::json!({
            "timestamp": "2025-05-03T10:15:00Z",
            "namespace": "ns",
            "container": "c"
        }))
        .unwrap();

        assert_eq!(record, MetricRecord::new(record.timestamp, "ns", "c"));
    }

    #[test]
    fn test_null_numbers_decode_as_zero() {
        let record: MetricRecord = serde_json::from_value(serde_json::json!({
            "timestamp": "2025-05-03T10:15:00Z",
            "namespace": "ns",
            "container": "c",
            "totalEnergy_J": null,
            "memoryUsed_MB": null,
            "trace": [
                { "container": "dep", "totalEnergy_J": null },
                { "container": null, "apiName": "x", "cpuEnergy_J": 2.5 }
            ]
        }))
        .unwrap();

        assert_eq!(record.total_energy_j, 0.0);
        assert_eq!(record.memory_used_mb, 0.0);
        assert_eq!(record.trace[0].container, "dep");
        assert_eq!(record.trace[0].total_energy_j, 0.0);
        assert_eq!(record.trace[1].container, "");
        assert_eq!(record.trace[1].cpu_energy_j, 2.5);
    }

    #[test]
    fn test_null_trace_decodes_as_empty() {
        let record: MetricRecord = serde_json::from_value(serde_json::json!({
            "timestamp": "2025-05-03T10:15:00Z",
            "namespace": "ns",
            "container": "c",
            "trace": null
        }))
        .unwrap();

        assert!(record.trace.is_empty());
    }

    #[test]
    fn test_null_trace_entry_decodes_as_stored_group() {
        let traces: Vec<Vec<TraceEntry>> = serde_json::from_value(serde_json::json!([
            [{ "container": "dep", "totalEnergy_J": null, "ramEnergy_J": null }]
        ]))
        .unwrap();

        assert_eq!(traces[0][0], TraceEntry { container: "dep".into(), ..TraceEntry::default() });
    }

    #[test]
    fn test_builders() {
        let record = MetricRecord::new(Utc::now(), "ns", "c")
            .with_api("api", "POST")
            .with_energy(10.0, 0.5)
            .with_trace(TraceEntry::new("dep", "depApi", 3.0).with_method("PUT"));

        assert_eq!(record.total_energy_j, 10.5);
        assert_eq!(record.trace[0].method_name.as_deref(), Some("PUT"));
    }
}

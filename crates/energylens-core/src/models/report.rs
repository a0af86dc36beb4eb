//! Report payloads returned to callers

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Energy summary of one container over a time frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    /// Total energy (J), whole number
    pub total_energy: i64,
    /// CPU energy (J), whole number
    pub cpu_energy: i64,
    /// RAM energy (J), whole number
    pub ram_energy: i64,
    /// Average execution time (ms), whole number
    pub avg_execution_time: i64,
    /// Memory summed over the window (MB)
    pub memory_used: f64,
    /// Daily total energy for the trailing 7 days, oldest first
    pub last_week_trend: Vec<f64>,
    /// Percent change against the preceding window
    pub comparison: f64,
    /// Records matching the window
    pub record_count: u64,
}

/// Per-API performance of one container over a time frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Energy summed over every API (J)
    pub total_energy: f64,
    /// Resolved time frame label
    pub time_frame: String,
    /// Per-API breakdown keyed by API name
    pub apis: BTreeMap<String, ApiPerformance>,
}

/// One API's entry in a [`PerformanceReport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiPerformance {
    /// Energy (J)
    pub energy: f64,
    /// Average execution time (ms)
    pub avg_time: f64,
    /// Estimated CO2
    pub co2_emission: f64,
    /// Average memory per request (MB)
    pub memory_used: f64,
    /// First observed HTTP method
    pub method: Option<String>,
    /// Suggestions, trend and dependents
    pub details: ApiDetails,
}

/// Drill-down section of an [`ApiPerformance`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDetails {
    /// Exactly five recommendations
    pub suggestions: Vec<String>,
    /// Daily energy for the trailing 8 days, oldest first
    pub perf_trends: Vec<f64>,
    /// Unique downstream services called by this API
    pub dependents: Vec<Dependent>,
}

/// A unique downstream `(container, apiName)` observed in traces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependent {
    /// Downstream container
    pub service: String,
    /// HTTP method of the call
    #[serde(rename = "type")]
    pub kind: String,
    /// Estimated CO2 of the first observed call
    pub co2: f64,
    /// Energy of the first observed call (J)
    pub energy: f64,
}

//! Threshold rules turning per-API aggregates into recommendations

use std::fmt;

use serde::Serialize;

/// Number of suggestions every API receives
pub const SUGGESTION_COUNT: usize = 5;

/// A recommendation attached to an API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Suggestion {
    /// Slow responses
    ResponseTime,
    /// Heavy memory use
    MemoryOptimization,
    /// High energy consumption
    CodeOptimization,
    /// Too many downstream services
    ServiceConsolidation,
    /// High emissions
    GreenComputing,
    /// Filler used when fewer rules fired
    Monitor,
}

impl Suggestion {
    /// Human-readable text
    pub fn message(self) -> &'static str {
        match self {
            Self::ResponseTime => "Consider optimizing API response time",
            Self::MemoryOptimization => "High memory usage detected, consider memory optimization",
            Self::CodeOptimization => {
                "High energy consumption detected, consider code optimization"
            }
            Self::ServiceConsolidation => {
                "Large number of dependencies, consider service consolidation"
            }
            Self::GreenComputing => {
                "High CO2 emissions detected, consider green computing practices"
            }
            Self::Monitor => "Monitor API performance regularly",
        }
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Unrounded aggregates of one API the rules evaluate
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ApiMetrics {
    /// Average execution time (ms)
    pub avg_execution_time: f64,
    /// Average memory per request (MB)
    pub avg_memory_used: f64,
    /// Summed energy (J)
    pub total_energy: f64,
    /// Unique downstream dependencies
    pub dependent_count: usize,
    /// Estimated CO2
    pub co2_emission: f64,
}

type Rule = (Suggestion, fn(&ApiMetrics) -> bool);

const RULES: [Rule; 5] = [
    (Suggestion::ResponseTime, |m: &ApiMetrics| m.avg_execution_time > 1000.0),
    (Suggestion::MemoryOptimization, |m: &ApiMetrics| m.avg_memory_used > 100.0),
    (Suggestion::CodeOptimization, |m: &ApiMetrics| m.total_energy > 1000.0),
    (Suggestion::ServiceConsolidation, |m: &ApiMetrics| m.dependent_count > 5),
    (Suggestion::GreenComputing, |m: &ApiMetrics| m.co2_emission > 100.0),
];

/// Triggered rules in evaluation order, padded with [`Suggestion::Monitor`]
/// to exactly [`SUGGESTION_COUNT`] entries
pub fn suggest(metrics: &ApiMetrics) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = RULES
        .iter()
        .filter(|(_, fires)| fires(metrics))
        .map(|(suggestion, _)| *suggestion)
        .collect();

    suggestions.resize(SUGGESTION_COUNT, Suggestion::Monitor);
    suggestions.truncate(SUGGESTION_COUNT);
    suggestions
}

//! Telemetry aggregation and analytics engine
//!
//! Leaf modules are pure or issue store queries through
//! [`AggregationEngine`]; [`ReportBuilder`] joins them into the two public
//! reports.

pub mod aggregate;
pub mod co2;
pub mod comparison;
pub mod dependents;
pub mod report;
pub mod suggestions;
pub mod trend;
pub mod window;

pub use aggregate::AggregationEngine;
pub use co2::co2;
pub use comparison::{percent_change, percent_delta};
pub use dependents::dedupe_dependents;
pub use report::ReportBuilder;
pub use suggestions::{suggest, ApiMetrics, Suggestion};
pub use trend::daily_series;
pub use window::resolve;

/// Round to the nearest integer, ties toward positive infinity
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Round to two decimals for presentation, ties toward positive infinity
pub fn round2(value: f64) -> f64 {
    round_half_up(value * 100.0) / 100.0
}

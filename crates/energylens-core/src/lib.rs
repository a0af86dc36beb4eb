//! # EnergyLens
//!
//! Energy and carbon analytics for microservice request telemetry.
//!
//! Every top-level API invocation is stored as one record carrying its
//! measured CPU/RAM energy and a shallow trace of the downstream calls it
//! triggered. EnergyLens answers questions such as "how much energy did this
//! container use last week, and how does that compare to the week before,
//! per API and per downstream dependency?"
//!
//! ## Architecture
//!
//! - **Analytics**: time windows, aggregation, trends, comparison,
//!   dependency deduplication and suggestions
//! - **Storage**: PostgreSQL (JSONB traces) or an in-memory store
//! - **API**: REST endpoints for the summary, performance and raw-record queries
//!
//! ## Quick Start
//!
//! ```bash
//! # Create the schema
//! energylens db migrate
//!
//! # Start the API server
//! energylens serve
//!
//! # Weekly summary of one container
//! energylens summary --namespace contactcenterservices --container skills-financial
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod analytics;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod telemetry;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::analytics::{AggregationEngine, ReportBuilder};
    pub use crate::config::Config;
    pub use crate::db::{InMemoryStore, MetricRepository, MetricStore, PostgresPool};
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
}

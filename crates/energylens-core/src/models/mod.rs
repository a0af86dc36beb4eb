//! Data models for EnergyLens

mod query;
mod record;
mod report;

pub use query::*;
pub use record::*;
pub use report::*;

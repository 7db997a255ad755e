//! Ingestion of the Juiz de Fora municipal budget spreadsheets into DuckDB
//! staging tables.

pub mod config;
pub mod dataset;
pub mod duck;
pub mod error;
pub mod fetch;
pub mod history;
pub mod normalize;
pub mod partition;
pub mod pipeline;
pub mod sheet;
pub mod store;

pub use config::Config;
pub use dataset::Variant;
pub use error::{Error, Result};
pub use normalize::Table;
pub use partition::PartitionKey;

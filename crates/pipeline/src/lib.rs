//! Batch drivers for the two tagtally stages.
//!
//! - [`ingest`]: images -> oracle -> one annotation JSON file per image,
//!   with per-file failure isolation.
//! - [`aggregate`]: annotation JSON files -> frequency tables -> console
//!   and CSV.
//! - [`config`]: environment-backed settings for both stages.

pub mod aggregate;
pub mod config;
pub mod ingest;

pub use aggregate::{run_aggregation, AggregateError, FrequencyReport};
pub use config::{AggregateConfig, IngestConfig};
pub use ingest::{run_ingestion, IngestError, IngestReport};

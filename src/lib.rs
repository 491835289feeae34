pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod types;

// Application use cases and their infrastructure adapters
pub mod app;
pub mod infra;

pub use pipeline::processing::partition::{CleanRecord, PartitionedDataset, QuarantineRecord};
pub use pipeline::processing::quality_gate::{QuarantineReason, ReasonCode, RuleSet};
pub use pipeline::{clean_data, CleanedBatch, CleaningStats, SurveyCleaner};
pub use types::{RawDataset, SurveyRecord};

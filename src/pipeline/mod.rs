// Survey pipeline: ingestion, cleaning, and report aggregates

pub mod ingestion;
pub mod processing;
pub mod report;

pub use processing::{clean_data, CleanedBatch, CleaningStats, SurveyCleaner};

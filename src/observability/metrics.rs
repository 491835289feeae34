//! Metrics for the survey pipeline
//!
//! Metric names follow Prometheus conventions and are only ever referenced
//! through [`MetricName`]. Without an installed recorder every call is a
//! no-op, which is what the library tests rely on.

use std::fmt;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Ingestion
    IngestFilesRead,
    IngestRowsRead,

    // Normalize
    NormalizeRecordsProcessed,

    // Dedupe
    DedupeRecordsRemoved,

    // Quality gate / partition
    QualityGateRecordsClean,
    QualityGateRecordsQuarantined,
    QualityGateReasonsDetected,

    // Batch
    CleaningBatchesProcessed,
    CleaningBatchSize,
    CleaningDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::IngestFilesRead => "survey_ingest_files_read_total",
            MetricName::IngestRowsRead => "survey_ingest_rows_read_total",
            MetricName::NormalizeRecordsProcessed => "survey_normalize_records_processed_total",
            MetricName::DedupeRecordsRemoved => "survey_dedupe_records_removed_total",
            MetricName::QualityGateRecordsClean => "survey_quality_gate_records_clean_total",
            MetricName::QualityGateRecordsQuarantined => {
                "survey_quality_gate_records_quarantined_total"
            }
            MetricName::QualityGateReasonsDetected => "survey_quality_gate_reasons_detected_total",
            MetricName::CleaningBatchesProcessed => "survey_cleaning_batches_processed_total",
            MetricName::CleaningBatchSize => "survey_cleaning_batch_size",
            MetricName::CleaningDuration => "survey_cleaning_duration_seconds",
        }
    }

    /// Get all metric names as an iterator
    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            IngestFilesRead,
            IngestRowsRead,
            NormalizeRecordsProcessed,
            DedupeRecordsRemoved,
            QualityGateRecordsClean,
            QualityGateRecordsQuarantined,
            QualityGateReasonsDetected,
            CleaningBatchesProcessed,
            CleaningBatchSize,
            CleaningDuration,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    HANDLE.set(handle).ok();
    info!("Metrics recorder installed");
    Ok(())
}

/// Prometheus text snapshot of everything recorded so far, if a recorder is
/// installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(PrometheusHandle::render)
}

// ============================================================================
// Ingestion
// ============================================================================

pub mod ingest {
    use super::MetricName;

    pub fn file_read(rows: usize) {
        ::metrics::counter!(MetricName::IngestFilesRead.as_str()).increment(1);
        ::metrics::counter!(MetricName::IngestRowsRead.as_str()).increment(rows as u64);
    }
}

// ============================================================================
// Normalize
// ============================================================================

pub mod normalize {
    use super::MetricName;

    pub fn records_processed(count: usize) {
        ::metrics::counter!(MetricName::NormalizeRecordsProcessed.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Dedupe
// ============================================================================

pub mod dedupe {
    use super::MetricName;

    pub fn duplicates_removed(count: usize) {
        ::metrics::counter!(MetricName::DedupeRecordsRemoved.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Quality gate
// ============================================================================

pub mod quality_gate {
    use super::MetricName;

    pub fn record_clean() {
        ::metrics::counter!(MetricName::QualityGateRecordsClean.as_str()).increment(1);
    }

    pub fn record_quarantined() {
        ::metrics::counter!(MetricName::QualityGateRecordsQuarantined.as_str()).increment(1);
    }

    pub fn reason_detected(reason: &str) {
        ::metrics::counter!(
            MetricName::QualityGateReasonsDetected.as_str(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    pub fn batch_processed(size: usize, secs: f64) {
        ::metrics::counter!(MetricName::CleaningBatchesProcessed.as_str()).increment(1);
        ::metrics::histogram!(MetricName::CleaningBatchSize.as_str()).record(size as f64);
        ::metrics::histogram!(MetricName::CleaningDuration.as_str()).record(secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names: HashSet<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), MetricName::all_metrics().count());
        assert!(names.iter().all(|n| n.starts_with("survey_")));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        ingest::file_read(3);
        quality_gate::reason_detected("fecha_invalida");
        quality_gate::batch_processed(3, 0.01);
    }
}

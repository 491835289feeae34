// Cleaning core: normalize -> deduplicate -> validate -> partition

pub mod dedupe;
pub mod normalize;
pub mod partition;
pub mod quality_gate;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::config::CleaningConfig;
use crate::types::RawDataset;
use normalize::{Normalizer, SurveyNormalizer};
use partition::{partition, PartitionedDataset};
use quality_gate::{ReasonCode, RuleSet};

/// Pure, synchronous cleaning stage. Holds no state between calls, so one
/// instance can clean any number of independent batches.
#[derive(Debug, Clone)]
pub struct SurveyCleaner {
    normalizer: SurveyNormalizer,
    rules: RuleSet,
}

/// Result of cleaning one raw batch.
#[derive(Debug, Clone, Default)]
pub struct CleanedBatch {
    pub output: PartitionedDataset,
    pub stats: CleaningStats,
}

/// Counters for one cleaning run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningStats {
    pub raw_records: usize,
    pub deduplicated_records: usize,
    pub duplicates_removed: usize,
    pub clean_records: usize,
    pub quarantined_records: usize,
    /// Occurrences of each code across quarantine rows
    pub reason_counts: BTreeMap<String, usize>,
}

impl CleaningStats {
    /// Clean rows as a percentage of the deduplicated rows
    pub fn clean_rate(&self) -> f64 {
        if self.deduplicated_records == 0 {
            return 0.0;
        }
        self.clean_records as f64 / self.deduplicated_records as f64 * 100.0
    }

    /// Quarantined rows as a percentage of the deduplicated rows
    pub fn quarantine_rate(&self) -> f64 {
        if self.deduplicated_records == 0 {
            return 0.0;
        }
        self.quarantined_records as f64 / self.deduplicated_records as f64 * 100.0
    }

    pub fn reason_count(&self, code: ReasonCode) -> usize {
        self.reason_counts.get(code.as_str()).copied().unwrap_or(0)
    }
}

impl SurveyCleaner {
    pub fn new(config: &CleaningConfig) -> Self {
        Self {
            normalizer: SurveyNormalizer::new(config),
            rules: RuleSet::from_config(config),
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Run the four stages over `raw`. Never fails: parse anomalies become
    /// nulls and quality violations become quarantine rows.
    pub fn clean(&self, raw: &RawDataset) -> CleanedBatch {
        let normalized = self.normalizer.normalize(raw);
        let deduplicated = dedupe::deduplicate(normalized.records, normalized.presence);
        let deduplicated_records = deduplicated.len();

        // Validation only ever sees deduplicated records
        let output = partition(deduplicated, &self.rules);

        let mut reason_counts = BTreeMap::new();
        for row in &output.quarantine {
            for code in row.reason.codes() {
                *reason_counts.entry(code.as_str().to_string()).or_insert(0) += 1;
            }
        }

        let stats = CleaningStats {
            raw_records: raw.len(),
            deduplicated_records,
            duplicates_removed: raw.len() - deduplicated_records,
            clean_records: output.clean.len(),
            quarantined_records: output.quarantine.len(),
            reason_counts,
        };

        info!(
            raw = stats.raw_records,
            duplicates = stats.duplicates_removed,
            clean = stats.clean_records,
            quarantined = stats.quarantined_records,
            "Cleaned survey batch"
        );

        CleanedBatch { output, stats }
    }
}

impl Default for SurveyCleaner {
    fn default() -> Self {
        Self::new(&CleaningConfig::default())
    }
}

/// Clean a raw dataset with the given configuration.
pub fn clean_data(raw: &RawDataset, config: &CleaningConfig) -> CleanedBatch {
    SurveyCleaner::new(config).clean(raw)
}

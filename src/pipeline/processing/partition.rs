use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{SATISFACTION_MAX, SATISFACTION_MIN};
use crate::pipeline::processing::normalize::normalize_categorical;
use crate::pipeline::processing::quality_gate::{QuarantineReason, RuleSet};
use crate::types::{Provenance, SurveyRecord};

/// A record that passed every quality rule, with final field types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub fecha: NaiveDate,
    pub id_respuesta: String,
    pub canal: Option<String>,
    pub producto: Option<String>,
    /// 1..=10, or `None` for NS/NC and unparseable ratings
    pub satisfaccion: Option<u8>,
    pub comentario: Option<String>,
    pub tienda: Option<String>,
    pub agente: Option<String>,
    #[serde(flatten)]
    pub provenance: Provenance,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Option<String>>,
}

/// A record that failed at least one rule. Field values are the
/// deduplicated-stage ones; nothing is finalized or text-normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    #[serde(flatten)]
    pub record: SurveyRecord,
    #[serde(rename = "_quarantine_reason")]
    pub reason: QuarantineReason,
}

impl CleanRecord {
    /// Finalize `record` if it passes `rules`; otherwise hand it back as a
    /// quarantine row with its reasons.
    pub fn finalize(record: SurveyRecord, rules: &RuleSet) -> Result<Self, QuarantineRecord> {
        let reason = rules.evaluate(&record);
        if !reason.is_empty() {
            return Err(QuarantineRecord { record, reason });
        }

        // Every rule set carries the standard rules, so these only fail for
        // records the evaluation above already rejected.
        let (Some(fecha), Some(id_respuesta), Ok(satisfaccion)) = (
            record.fecha,
            record.business_key().map(str::to_string),
            finalize_rating(record.satisfaccion_num),
        ) else {
            let reason = RuleSet::standard().evaluate(&record);
            return Err(QuarantineRecord { record, reason });
        };

        Ok(Self {
            fecha,
            id_respuesta,
            canal: normalize_categorical(record.canal),
            producto: normalize_categorical(record.producto),
            satisfaccion,
            comentario: record.comentario,
            tienda: normalize_categorical(record.tienda),
            agente: normalize_categorical(record.agente),
            provenance: record.provenance,
            extra: record.extra,
        })
    }
}

fn finalize_rating(value: Option<i64>) -> Result<Option<u8>, i64> {
    match value {
        None => Ok(None),
        Some(n) if (SATISFACTION_MIN..=SATISFACTION_MAX).contains(&n) => {
            u8::try_from(n).map(Some).map_err(|_| n)
        }
        Some(n) => Err(n),
    }
}

/// The two output datasets. Together they hold every deduplicated record
/// exactly once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionedDataset {
    pub clean: Vec<CleanRecord>,
    pub quarantine: Vec<QuarantineRecord>,
}

impl PartitionedDataset {
    pub fn len(&self) -> usize {
        self.clean.len() + self.quarantine.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clean.is_empty() && self.quarantine.is_empty()
    }
}

/// Split deduplicated records into clean and quarantine, preserving order
/// within each side.
pub fn partition(records: Vec<SurveyRecord>, rules: &RuleSet) -> PartitionedDataset {
    let mut out = PartitionedDataset::default();
    for record in records {
        match CleanRecord::finalize(record, rules) {
            Ok(clean) => out.clean.push(clean),
            Err(quarantined) => out.quarantine.push(quarantined),
        }
    }
    out
}

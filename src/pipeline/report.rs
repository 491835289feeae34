//! Aggregates handed to the reporting collaborator.
//!
//! Only the numbers are computed here; rendering them as Markdown or a
//! spreadsheet is someone else's job. The binary serializes the whole
//! [`SurveyReport`] as JSON.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::constants::{
    COL_AGENTE, COL_BATCH_ID, COL_CANAL, COL_COMENTARIO, COL_FECHA, COL_ID_RESPUESTA,
    COL_INGEST_TS, COL_PRODUCTO, COL_SATISFACCION, COL_SOURCE_FILE, COL_TIENDA, NSNC_LABEL,
};
use crate::pipeline::processing::partition::{CleanRecord, QuarantineRecord};

#[derive(Debug, Clone, Serialize)]
pub struct SurveyReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub kpis: Kpis,
    pub distribution: Vec<RatingBucket>,
    pub monthly: Vec<MonthlyStat>,
    pub quarantine_summary: Vec<ReasonCount>,
    pub nulls_per_field: Vec<NullCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub clean_surveys: usize,
    pub nsnc: usize,
    pub nsnc_pct: f64,
    pub mean_satisfaction: Option<f64>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingBucket {
    /// "1".."10" or "NS/NC"
    pub rating: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStat {
    /// First day of the month
    pub month: NaiveDate,
    pub surveys: usize,
    pub mean_satisfaction: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NullCount {
    pub field: String,
    pub nulls: usize,
}

fn mean(values: &[u8]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|v| f64::from(*v)).sum::<f64>() / values.len() as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn kpis(clean: &[CleanRecord]) -> Kpis {
    let ratings: Vec<u8> = clean.iter().filter_map(|r| r.satisfaccion).collect();
    let nsnc = clean.len() - ratings.len();
    let nsnc_pct = if clean.is_empty() {
        0.0
    } else {
        nsnc as f64 / clean.len() as f64 * 100.0
    };

    Kpis {
        clean_surveys: clean.len(),
        nsnc,
        nsnc_pct,
        mean_satisfaction: mean(&ratings),
        period_start: clean.iter().map(|r| r.fecha).min(),
        period_end: clean.iter().map(|r| r.fecha).max(),
    }
}

/// Ratings 1..10 that occur, in numeric order, then the NS/NC bucket.
pub fn rating_distribution(clean: &[CleanRecord]) -> Vec<RatingBucket> {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    let mut nsnc = 0;
    for record in clean {
        match record.satisfaccion {
            Some(rating) => *counts.entry(rating).or_insert(0) += 1,
            None => nsnc += 1,
        }
    }

    let mut buckets: Vec<RatingBucket> = counts
        .into_iter()
        .map(|(rating, count)| RatingBucket {
            rating: rating.to_string(),
            count,
        })
        .collect();
    if nsnc > 0 {
        buckets.push(RatingBucket {
            rating: NSNC_LABEL.to_string(),
            count: nsnc,
        });
    }
    buckets
}

/// Survey count (every clean row) and mean rating per calendar month.
pub fn monthly_evolution(clean: &[CleanRecord]) -> Vec<MonthlyStat> {
    let mut months: BTreeMap<NaiveDate, (usize, Vec<u8>)> = BTreeMap::new();
    for record in clean {
        let Some(month) = NaiveDate::from_ymd_opt(record.fecha.year(), record.fecha.month(), 1)
        else {
            continue;
        };
        let entry = months.entry(month).or_default();
        entry.0 += 1;
        entry.1.extend(record.satisfaccion);
    }

    months
        .into_iter()
        .map(|(month, (surveys, ratings))| MonthlyStat {
            month,
            surveys,
            mean_satisfaction: mean(&ratings).map(round2),
        })
        .collect()
}

/// Count per full reason string, most frequent first.
pub fn quarantine_summary(quarantine: &[QuarantineRecord]) -> Vec<ReasonCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in quarantine {
        *counts.entry(record.reason.to_string()).or_insert(0) += 1;
    }

    let mut summary: Vec<ReasonCount> = counts
        .into_iter()
        .map(|(reason, count)| ReasonCount { reason, count })
        .collect();
    // BTreeMap order already breaks ties by reason; the sort is stable
    summary.sort_by(|a, b| b.count.cmp(&a.count));
    summary
}

/// Nulls per field of the clean dataset, in output column order.
pub fn nulls_per_field(clean: &[CleanRecord]) -> Vec<NullCount> {
    fn count<F: Fn(&CleanRecord) -> bool>(clean: &[CleanRecord], field: &str, is_null: F) -> NullCount {
        NullCount {
            field: field.to_string(),
            nulls: clean.iter().filter(|r| is_null(r)).count(),
        }
    }

    let mut out = vec![
        // finalized, never null in a clean row
        count(clean, COL_FECHA, |_| false),
        count(clean, COL_ID_RESPUESTA, |_| false),
        count(clean, COL_CANAL, |r| r.canal.is_none()),
        count(clean, COL_PRODUCTO, |r| r.producto.is_none()),
        count(clean, COL_SATISFACCION, |r| r.satisfaccion.is_none()),
        count(clean, COL_COMENTARIO, |r| r.comentario.is_none()),
        count(clean, COL_TIENDA, |r| r.tienda.is_none()),
        count(clean, COL_AGENTE, |r| r.agente.is_none()),
        count(clean, COL_SOURCE_FILE, |r| r.provenance.source_file.is_none()),
        count(clean, COL_INGEST_TS, |r| r.provenance.ingest_ts.is_none()),
        count(clean, COL_BATCH_ID, |r| r.provenance.batch_id.is_none()),
    ];

    let extra_fields: BTreeSet<&String> = clean.iter().flat_map(|r| r.extra.keys()).collect();
    for field in extra_fields {
        out.push(count(clean, field, |r| {
            r.extra.get(field).map_or(true, Option::is_none)
        }));
    }
    out
}

impl SurveyReport {
    pub fn build(clean: &[CleanRecord], quarantine: &[QuarantineRecord]) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            kpis: kpis(clean),
            distribution: rating_distribution(clean),
            monthly: monthly_evolution(clean),
            quarantine_summary: quarantine_summary(quarantine),
            nulls_per_field: nulls_per_field(clean),
        }
    }
}

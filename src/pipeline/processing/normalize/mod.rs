use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::CleaningConfig;
use crate::constants::{
    is_known_column, COL_AGENTE, COL_BATCH_ID, COL_CANAL, COL_COMENTARIO, COL_FECHA,
    COL_ID_RESPUESTA, COL_INGEST_TS, COL_PRODUCTO, COL_SATISFACCION, COL_SOURCE_FILE, COL_TIENDA,
    NSNC_PHRASES,
};
use crate::types::{Provenance, RawCell, RawDataset, SchemaPresence, SurveyRecord};

/// NS/NC phrasings in their comparison form.
static NSNC_NORMALIZED: Lazy<HashSet<String>> =
    Lazy::new(|| NSNC_PHRASES.iter().map(|p| normalize_text(p)).collect());

/// Remove diacritics: canonical decomposition, then drop combining marks.
pub fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Comparison form of free text: trimmed, accent-stripped, lower-cased.
pub fn normalize_text(text: &str) -> String {
    strip_accents(text.trim()).to_lowercase()
}

pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Whether `text` is one of the "don't know / no answer" phrasings.
pub fn is_nsnc(text: &str) -> bool {
    NSNC_NORMALIZED.contains(&normalize_text(text))
}

/// Integer coercion of a rating. Integral floats (`"7.0"`, `"1e1"`) are
/// accepted; anything else is `None`.
pub fn coerce_rating(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    let value = text.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Lenient date parser: date formats, then date-time formats, then RFC 3339.
#[derive(Debug, Clone)]
pub struct DateParser {
    date_formats: Vec<String>,
    datetime_formats: Vec<String>,
}

impl DateParser {
    pub fn new(config: &CleaningConfig) -> Self {
        Self {
            date_formats: config.date_formats.clone(),
            datetime_formats: config.datetime_formats.clone(),
        }
    }

    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
            .or_else(|| {
                self.datetime_formats
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                    .map(|dt| dt.date())
            })
            .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
    }
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(&CleaningConfig::default())
    }
}

/// Output of the Normalizer: records plus what the input schema carried.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<SurveyRecord>,
    pub presence: SchemaPresence,
}

/// Trait for turning a raw tabular dataset into normalized survey records
pub trait Normalizer {
    /// Never fails: unparseable values degrade to `None`.
    fn normalize(&self, raw: &RawDataset) -> NormalizedBatch;
}

/// Field-by-field normalization of monthly survey exports
#[derive(Debug, Clone, Default)]
pub struct SurveyNormalizer {
    dates: DateParser,
}

/// Column positions resolved once per dataset, after identifier normalization.
struct ColumnLayout {
    positions: HashMap<String, usize>,
    extras: Vec<(String, usize)>,
}

impl ColumnLayout {
    fn resolve(columns: &[String]) -> Self {
        let mut positions = HashMap::new();
        let mut extras = Vec::new();
        for (idx, column) in columns.iter().enumerate() {
            let name = normalize_column_name(column);
            // First occurrence wins for duplicated identifiers
            if positions.contains_key(&name) {
                continue;
            }
            if !is_known_column(&name) {
                extras.push((name.clone(), idx));
            }
            positions.insert(name, idx);
        }
        Self { positions, extras }
    }

    fn has(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Trimmed text of `column` in `row`; `None` for null cells or absent columns.
    fn text(&self, row: &[RawCell], column: &str) -> Option<String> {
        let idx = *self.positions.get(column)?;
        trimmed(&row[idx])
    }
}

fn trimmed(cell: &RawCell) -> Option<String> {
    cell.as_deref().map(|value| value.trim().to_string())
}

impl SurveyNormalizer {
    pub fn new(config: &CleaningConfig) -> Self {
        Self {
            dates: DateParser::new(config),
        }
    }

    fn normalize_row(&self, layout: &ColumnLayout, row: &[RawCell]) -> SurveyRecord {
        let fecha = layout
            .text(row, COL_FECHA)
            .and_then(|text| self.dates.parse(&text));

        // NS/NC rewrite happens before numeric coercion; blank text is null
        let satisfaccion = layout
            .text(row, COL_SATISFACCION)
            .filter(|text| !text.is_empty() && !is_nsnc(text));
        let satisfaccion_num = satisfaccion.as_deref().and_then(coerce_rating);

        let extra: BTreeMap<String, Option<String>> = layout
            .extras
            .iter()
            .map(|(name, idx)| (name.clone(), trimmed(&row[*idx])))
            .collect();

        SurveyRecord {
            fecha,
            id_respuesta: layout.text(row, COL_ID_RESPUESTA),
            canal: layout.text(row, COL_CANAL),
            producto: layout.text(row, COL_PRODUCTO),
            satisfaccion,
            satisfaccion_num,
            comentario: layout.text(row, COL_COMENTARIO),
            tienda: layout.text(row, COL_TIENDA),
            agente: layout.text(row, COL_AGENTE),
            provenance: Provenance {
                source_file: layout.text(row, COL_SOURCE_FILE),
                ingest_ts: layout.text(row, COL_INGEST_TS),
                batch_id: layout.text(row, COL_BATCH_ID),
            },
            extra,
        }
    }
}

impl Normalizer for SurveyNormalizer {
    fn normalize(&self, raw: &RawDataset) -> NormalizedBatch {
        let layout = ColumnLayout::resolve(raw.columns());
        let presence = SchemaPresence {
            business_key: layout.has(COL_ID_RESPUESTA),
            satisfaction: layout.has(COL_SATISFACCION),
            ingest_ts: layout.has(COL_INGEST_TS),
        };

        if !presence.business_key {
            warn!("Input has no '{}' column: every record will be quarantined", COL_ID_RESPUESTA);
        }
        if !presence.satisfaction {
            warn!("Input has no '{}' column: ratings default to null", COL_SATISFACCION);
        }
        if !presence.ingest_ts {
            debug!("Input has no '{}' column: duplicates keep the last row", COL_INGEST_TS);
        }

        let records: Vec<SurveyRecord> = raw
            .rows()
            .iter()
            .map(|row| self.normalize_row(&layout, row))
            .collect();

        crate::observability::metrics::normalize::records_processed(records.len());
        debug!(records = records.len(), "Normalized batch");

        NormalizedBatch { records, presence }
    }
}

/// Categorical normalization applied to a clean record's free-text fields.
pub fn normalize_categorical(value: Option<String>) -> Option<String> {
    value.map(|v| normalize_text(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(columns: &[&str], row: Vec<&str>) -> NormalizedBatch {
        let raw = RawDataset::from_rows(columns, vec![row]).unwrap();
        SurveyNormalizer::default().normalize(&raw)
    }

    #[test]
    fn test_normalize_text_strips_accents_and_case() {
        assert_eq!(normalize_text("  TIÉNDA Online "), "tienda online");
        assert_eq!(normalize_text("Atención Telefónica"), "atencion telefonica");
        assert_eq!(normalize_text("Pingüino"), "pinguino");
    }

    #[test]
    fn test_nsnc_phrasings_match_in_any_case_and_accent() {
        assert!(is_nsnc("No Sabe/No Contesta "));
        assert!(is_nsnc("NS/NC"));
        assert!(is_nsnc("nsnc"));
        assert!(is_nsnc("No sé/no contesta"));
        assert!(is_nsnc("no se/no contesta"));
        assert!(!is_nsnc("ns / nc"));
        assert!(!is_nsnc("7"));
    }

    #[test]
    fn test_coerce_rating() {
        assert_eq!(coerce_rating("7"), Some(7));
        assert_eq!(coerce_rating(" 15 "), Some(15));
        assert_eq!(coerce_rating("-3"), Some(-3));
        assert_eq!(coerce_rating("8.0"), Some(8));
        assert_eq!(coerce_rating("7.5"), None);
        assert_eq!(coerce_rating("abc"), None);
        assert_eq!(coerce_rating("NaN"), None);
        assert_eq!(coerce_rating(""), None);
    }

    #[test]
    fn test_date_parser_formats() {
        let parser = DateParser::default();
        let expected = NaiveDate::from_ymd_opt(2025, 11, 3);
        assert_eq!(parser.parse("2025-11-03"), expected);
        assert_eq!(parser.parse("2025/11/03"), expected);
        assert_eq!(parser.parse("03/11/2025"), expected);
        assert_eq!(parser.parse("2025-11-03 14:30:00"), expected);
        assert_eq!(parser.parse("2025-11-03T14:30:00+01:00"), expected);
        assert_eq!(parser.parse(""), None);
        assert_eq!(parser.parse("ayer"), None);
        assert_eq!(parser.parse("2025-13-45"), None);
    }

    #[test]
    fn test_month_first_formats_take_precedence_when_listed_first() {
        let mut config = CleaningConfig::default();
        config.date_formats.insert(0, "%m/%d/%Y".to_string());
        let parser = DateParser::new(&config);
        assert_eq!(parser.parse("03/11/2025"), NaiveDate::from_ymd_opt(2025, 3, 11));
        // day values above 12 still fall through to the day-first format
        assert_eq!(parser.parse("25/11/2025"), NaiveDate::from_ymd_opt(2025, 11, 25));
    }

    #[test]
    fn test_column_identifiers_are_trimmed_and_lowercased() {
        let batch = normalize(
            &[" FECHA ", "Id_Respuesta", "Satisfaccion "],
            vec!["2025-01-15", " R1 ", " 9 "],
        );
        let record = &batch.records[0];
        assert_eq!(record.fecha, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(record.id_respuesta.as_deref(), Some("R1"));
        assert_eq!(record.satisfaccion_num, Some(9));
        assert!(batch.presence.business_key);
        assert!(batch.presence.satisfaction);
        assert!(!batch.presence.ingest_ts);
    }

    #[test]
    fn test_nsnc_rating_becomes_null_before_coercion() {
        let batch = normalize(&["satisfaccion"], vec!["No Sabe/No Contesta "]);
        assert_eq!(batch.records[0].satisfaccion, None);
        assert_eq!(batch.records[0].satisfaccion_num, None);
    }

    #[test]
    fn test_non_numeric_rating_keeps_text_but_no_number() {
        let batch = normalize(&["satisfaccion"], vec!["abc"]);
        assert_eq!(batch.records[0].satisfaccion.as_deref(), Some("abc"));
        assert_eq!(batch.records[0].satisfaccion_num, None);
    }

    #[test]
    fn test_categorical_fields_only_trimmed_at_this_stage() {
        let batch = normalize(&["canal", "comentario"], vec!["TIÉNDA Online ", "  Muy bien "]);
        assert_eq!(batch.records[0].canal.as_deref(), Some("TIÉNDA Online"));
        assert_eq!(batch.records[0].comentario.as_deref(), Some("Muy bien"));
    }

    #[test]
    fn test_unknown_columns_are_carried_as_extras() {
        let batch = normalize(&["fecha", " Region "], vec!["2025-01-01", " Norte "]);
        assert_eq!(
            batch.records[0].extra.get("region"),
            Some(&Some("Norte".to_string()))
        );
    }

    #[test]
    fn test_output_only_column_names_are_not_carried() {
        let batch = normalize(
            &["satisfaccion", "Satisfaccion_Num", "_quarantine_reason", "region"],
            vec!["7", "99", "manual", "sur"],
        );
        let record = &batch.records[0];
        assert_eq!(record.satisfaccion_num, Some(7));
        assert!(!record.extra.contains_key("satisfaccion_num"));
        assert!(!record.extra.contains_key("_quarantine_reason"));
        assert_eq!(record.extra.get("region"), Some(&Some("sur".to_string())));
    }

    #[test]
    fn test_absent_columns_degrade_to_null() {
        let batch = normalize(&["comentario"], vec!["hola"]);
        let record = &batch.records[0];
        assert_eq!(record.fecha, None);
        assert_eq!(record.id_respuesta, None);
        assert_eq!(record.satisfaccion_num, None);
        assert!(!batch.presence.business_key);
        assert!(!batch.presence.satisfaction);
    }
}

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// One raw cell: `None` is a null/empty cell.
pub type RawCell = Option<String>;

/// Tabular dataset as handed over by the ingestion collaborator. Every row
/// has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    columns: Vec<String>,
    rows: Vec<Vec<RawCell>>,
}

impl RawDataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a dataset from string literals; empty cells stay empty strings.
    pub fn from_rows(columns: &[&str], rows: Vec<Vec<&str>>) -> Result<Self> {
        let mut dataset = Self::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            dataset.push_row(row.into_iter().map(|cell| Some(cell.to_string())).collect())?;
        }
        Ok(dataset)
    }

    pub fn push_row(&mut self, row: Vec<RawCell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::Schema(format!(
                "row {} has {} cells but the header has {} columns",
                self.rows.len() + 1,
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<RawCell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a column filled with one value for every existing row.
    pub fn add_constant_column(&mut self, name: &str, value: RawCell) {
        if let Some(idx) = self.column_index(name) {
            for row in &mut self.rows {
                row[idx] = value.clone();
            }
            return;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.clone());
        }
    }

    /// Reorder columns so that `leading` come first (missing ones are created
    /// as all-null), followed by the rest in their current order.
    pub fn with_leading_columns(self, leading: &[&str]) -> Self {
        let mut columns: Vec<String> = leading.iter().map(|c| c.to_string()).collect();
        columns.extend(
            self.columns
                .iter()
                .filter(|c| !leading.contains(&c.as_str()))
                .cloned(),
        );
        self.project(columns)
    }

    /// Stack datasets vertically. Columns are the union in first-seen order;
    /// cells of columns a dataset lacks are null.
    pub fn concat(datasets: Vec<RawDataset>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for dataset in &datasets {
            for column in &dataset.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(datasets.iter().map(RawDataset::len).sum());
        for dataset in datasets {
            rows.extend(dataset.project(columns.clone()).rows);
        }
        Self { columns, rows }
    }

    fn project(self, columns: Vec<String>) -> Self {
        let mapping: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                mapping
                    .iter()
                    .map(|idx| idx.and_then(|i| row[i].clone()))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }
}

/// Provenance attached by ingestion. Opaque to the core except for
/// `_ingest_ts`, which orders versions of a duplicated response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(rename = "_source_file")]
    pub source_file: Option<String>,
    #[serde(rename = "_ingest_ts")]
    pub ingest_ts: Option<String>,
    #[serde(rename = "_batch_id")]
    pub batch_id: Option<String>,
}

/// A survey response after normalization, as seen by the Deduplicator and
/// the Validator.
///
/// `id_respuesta` and `satisfaccion` are `None` both for null cells and when
/// the column is absent from the input; [`SchemaPresence`] records which of
/// the two happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyRecord {
    pub fecha: Option<NaiveDate>,
    pub id_respuesta: Option<String>,
    pub canal: Option<String>,
    pub producto: Option<String>,
    /// Trimmed text with NS/NC phrasings already rewritten to `None`
    pub satisfaccion: Option<String>,
    /// Integer coercion of `satisfaccion` (working column)
    pub satisfaccion_num: Option<i64>,
    pub comentario: Option<String>,
    pub tienda: Option<String>,
    pub agente: Option<String>,
    #[serde(flatten)]
    pub provenance: Provenance,
    /// Columns the core does not know by name, carried through trimmed
    #[serde(flatten)]
    pub extra: BTreeMap<String, Option<String>>,
}

impl SurveyRecord {
    /// Business key used for deduplication: trimmed and non-empty.
    pub fn business_key(&self) -> Option<&str> {
        self.id_respuesta
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Which optional columns the input schema carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchemaPresence {
    /// Absent: no deduplication, every record fails `id_respuesta_vacio`
    pub business_key: bool,
    /// Absent: every rating is null
    pub satisfaction: bool,
    /// Absent: duplicates resolve to the last record in input order
    pub ingest_ts: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_rejects_wrong_arity() {
        let mut dataset = RawDataset::new(vec!["a".to_string(), "b".to_string()]);
        let err = dataset.push_row(vec![Some("1".to_string())]).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_concat_unions_columns_and_fills_nulls() {
        let first = RawDataset::from_rows(&["a", "b"], vec![vec!["1", "2"]]).unwrap();
        let second = RawDataset::from_rows(&["b", "c"], vec![vec!["3", "4"]]).unwrap();

        let merged = RawDataset::concat(vec![first, second]);
        assert_eq!(merged.columns(), &["a", "b", "c"]);
        assert_eq!(
            merged.rows()[0],
            vec![Some("1".to_string()), Some("2".to_string()), None]
        );
        assert_eq!(
            merged.rows()[1],
            vec![None, Some("3".to_string()), Some("4".to_string())]
        );
    }

    #[test]
    fn test_leading_columns_are_created_and_ordered_first() {
        let dataset = RawDataset::from_rows(&["extra", "fecha"], vec![vec!["x", "2025-01-01"]])
            .unwrap()
            .with_leading_columns(&["fecha", "id_respuesta"]);

        assert_eq!(dataset.columns(), &["fecha", "id_respuesta", "extra"]);
        assert_eq!(
            dataset.rows()[0],
            vec![Some("2025-01-01".to_string()), None, Some("x".to_string())]
        );
    }

    #[test]
    fn test_business_key_ignores_blank_ids() {
        let mut record = SurveyRecord {
            id_respuesta: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.business_key(), None);

        record.id_respuesta = Some(" R1 ".to_string());
        assert_eq!(record.business_key(), Some("R1"));
    }
}

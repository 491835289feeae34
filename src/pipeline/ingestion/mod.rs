// Pipeline ingestion: reads survey exports and tags provenance

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Local;
use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::constants::{COL_BATCH_ID, COL_INGEST_TS, COL_SOURCE_FILE, RAW_COLUMNS};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::normalize::normalize_column_name;
use crate::types::RawDataset;

/// Timestamp shared by every file ingested in one run.
pub fn ingest_timestamp() -> String {
    Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Read one CSV export from any reader.
///
/// Header identifiers are trimmed and lower-cased, empty cells become null,
/// the canonical raw columns are guaranteed (all-null when missing) and
/// placed first, and the provenance columns are appended.
pub fn read_survey_csv<R: Read>(reader: R, source_name: &str, ingest_ts: &str) -> Result<RawDataset> {
    // Arity is checked by RawDataset so ragged rows surface as Schema errors
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr.headers()?.iter().map(normalize_column_name).collect();
    let mut dataset = RawDataset::new(columns);

    for record in rdr.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|cell| {
                if cell.trim().is_empty() {
                    None
                } else {
                    Some(cell.to_string())
                }
            })
            .collect();
        dataset.push_row(row)?;
    }

    let mut dataset = dataset.with_leading_columns(&RAW_COLUMNS);
    dataset.add_constant_column(COL_SOURCE_FILE, Some(source_name.to_string()));
    dataset.add_constant_column(COL_INGEST_TS, Some(ingest_ts.to_string()));
    dataset.add_constant_column(COL_BATCH_ID, Some(batch_id_for(source_name)));

    debug!(source = source_name, rows = dataset.len(), "Read survey export");
    Ok(dataset)
}

/// Batch identifier: the file name without its extension
/// (`encuestas_202511.csv` -> `encuestas_202511`).
pub fn batch_id_for(source_name: &str) -> String {
    Path::new(source_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_name.to_string())
}

/// Read and concatenate explicitly listed CSV files.
pub fn read_survey_files(paths: &[PathBuf]) -> Result<RawDataset> {
    if paths.is_empty() {
        return Err(PipelineError::Config("no input files given".to_string()));
    }

    let ingest_ts = ingest_timestamp();
    let mut datasets = Vec::with_capacity(paths.len());
    for path in paths {
        let file = std::fs::File::open(path).map_err(|e| {
            PipelineError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to open '{}': {}", path.display(), e),
            ))
        })?;
        let source_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let dataset = read_survey_csv(file, &source_name, &ingest_ts)?;
        crate::observability::metrics::ingest::file_read(dataset.len());
        datasets.push(dataset);
    }

    let raw = RawDataset::concat(datasets);
    info!(files = paths.len(), rows = raw.len(), "Ingested survey exports");
    Ok(raw)
}

// Column identifiers shared by ingestion, the cleaning core and the report.
// Identifiers are always trimmed and lower-cased.

pub const COL_FECHA: &str = "fecha";
pub const COL_ID_RESPUESTA: &str = "id_respuesta";
pub const COL_CANAL: &str = "canal";
pub const COL_PRODUCTO: &str = "producto";
pub const COL_SATISFACCION: &str = "satisfaccion";
pub const COL_COMENTARIO: &str = "comentario";
pub const COL_TIENDA: &str = "tienda";
pub const COL_AGENTE: &str = "agente";

// Provenance columns attached at ingestion
pub const COL_SOURCE_FILE: &str = "_source_file";
pub const COL_INGEST_TS: &str = "_ingest_ts";
pub const COL_BATCH_ID: &str = "_batch_id";

// Output-only columns written by the cleaning core
pub const COL_SATISFACCION_NUM: &str = "satisfaccion_num";
pub const COL_QUARANTINE_REASON: &str = "_quarantine_reason";

/// Names the cleaning core writes itself; input columns carrying them are
/// dropped.
pub const RESERVED_COLUMNS: [&str; 2] = [COL_SATISFACCION_NUM, COL_QUARANTINE_REASON];

/// Canonical raw columns, in the order ingestion places them.
pub const RAW_COLUMNS: [&str; 8] = [
    COL_FECHA,
    COL_ID_RESPUESTA,
    COL_CANAL,
    COL_PRODUCTO,
    COL_SATISFACCION,
    COL_COMENTARIO,
    COL_TIENDA,
    COL_AGENTE,
];

pub const PROVENANCE_COLUMNS: [&str; 3] = [COL_SOURCE_FILE, COL_INGEST_TS, COL_BATCH_ID];

/// Categorical free-text columns normalized for the clean dataset only.
pub const CATEGORICAL_COLUMNS: [&str; 4] = [COL_CANAL, COL_PRODUCTO, COL_TIENDA, COL_AGENTE];

/// "Don't know / no answer" phrasings mapped to a null rating. Compared after
/// trimming, accent stripping and lower-casing.
pub const NSNC_PHRASES: [&str; 7] = [
    "no sabe/no contesta",
    "ns/nc",
    "nsnc",
    "no sabe",
    "no contesta",
    "no se/no contesta",
    "no sé/no contesta",
];

/// Label used by the report for null ratings.
pub const NSNC_LABEL: &str = "NS/NC";

pub const SATISFACTION_MIN: i64 = 1;
pub const SATISFACTION_MAX: i64 = 10;

/// Every column the cleaning core knows by name; anything else is carried
/// through untouched as an extra column.
pub fn is_known_column(name: &str) -> bool {
    RAW_COLUMNS.contains(&name)
        || PROVENANCE_COLUMNS.contains(&name)
        || RESERVED_COLUMNS.contains(&name)
}

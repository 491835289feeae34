use std::fs;
use std::path::Path;

use anyhow::Result;
use serde_json::Value;
use survey_pipeline::app::clean_use_case::CleanUseCase;
use survey_pipeline::config::{CleaningConfig, Config};
use survey_pipeline::error::PipelineError;
use survey_pipeline::infra::NdjsonOutputAdapter;
use survey_pipeline::pipeline::ingestion::read_survey_files;
use survey_pipeline::pipeline::report::SurveyReport;
use tempfile::tempdir;

const OCTOBER: &str = "\
FECHA,ID_Respuesta,Canal,Producto,Satisfaccion,Comentario,Tienda,Agente
2025-10-02,R1,Web,Cuenta,8,ok,,A1
02/10/2025,R2,Teléfono ,Tarjeta,NS/NC,,,A2
,R3,Web,Cuenta,5,,,
";

const NOVEMBER: &str = "\
fecha,id_respuesta,canal,producto,satisfaccion,comentario,tienda,agente,region
2025-11-03,R1,Web,Cuenta,10,actualizado,,A1,norte
2025-11-04,,App,Cuenta,7,,,,sur
2025-11-05,R4, TIÉNDA Online ,Seguro,15,,Centro,,norte
";

fn read_ndjson(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_csv_exports_to_clean_and_quarantine_files() -> Result<()> {
    let temp_dir = tempdir()?;
    let october = temp_dir.path().join("encuestas_202510.csv");
    let november = temp_dir.path().join("encuestas_202511.csv");
    fs::write(&october, OCTOBER)?;
    fs::write(&november, NOVEMBER)?;

    let raw = read_survey_files(&[october, november])?;
    assert_eq!(raw.len(), 6);

    let mut config = Config::default();
    config.output.dir = temp_dir.path().join("output");

    let use_case = CleanUseCase::with_config(
        &config.cleaning,
        Box::new(NdjsonOutputAdapter::new(config.output.clean_path())?),
        Box::new(NdjsonOutputAdapter::new(config.output.quarantine_path())?),
    );
    let batch = use_case.run(&raw).await?;

    assert_eq!(batch.stats.duplicates_removed, 1);
    assert_eq!(batch.stats.clean_records, 2);
    assert_eq!(batch.stats.quarantined_records, 3);

    let clean = read_ndjson(&config.output.clean_path());
    assert_eq!(clean.len(), 2);

    // Both files share one ingest timestamp, so the later file wins the tie
    let r1 = clean.iter().find(|v| v["id_respuesta"] == "R1").unwrap();
    assert_eq!(r1["satisfaccion"], 10);
    assert_eq!(r1["fecha"], "2025-11-03");
    assert_eq!(r1["_source_file"], "encuestas_202511.csv");
    assert_eq!(r1["_batch_id"], "encuestas_202511");
    assert_eq!(r1["region"], "norte");

    let r2 = clean.iter().find(|v| v["id_respuesta"] == "R2").unwrap();
    assert!(r2["satisfaccion"].is_null());
    assert_eq!(r2["canal"], "telefono");
    assert!(r2["region"].is_null());

    let quarantine = read_ndjson(&config.output.quarantine_path());
    let mut reasons: Vec<&str> = quarantine
        .iter()
        .map(|v| v["_quarantine_reason"].as_str().unwrap())
        .collect();
    reasons.sort();
    assert_eq!(
        reasons,
        vec!["fecha_invalida", "id_respuesta_vacio", "satisf_fuera_rango"]
    );

    let r4 = quarantine.iter().find(|v| v["id_respuesta"] == "R4").unwrap();
    assert_eq!(r4["satisfaccion_num"], 15);
    // Quarantine keeps categorical text as trimmed, not case-folded
    assert_eq!(r4["canal"], "TIÉNDA Online");

    Ok(())
}

#[tokio::test]
async fn test_report_aggregates_from_cleaned_batch() -> Result<()> {
    let temp_dir = tempdir()?;
    let november = temp_dir.path().join("encuestas_202511.csv");
    fs::write(&november, NOVEMBER)?;
    let october = temp_dir.path().join("encuestas_202510.csv");
    fs::write(&october, OCTOBER)?;

    let raw = read_survey_files(&[october, november])?;
    let batch = survey_pipeline::clean_data(&raw, &CleaningConfig::default());
    let report = SurveyReport::build(&batch.output.clean, &batch.output.quarantine);

    assert_eq!(report.kpis.clean_surveys, 2);
    assert_eq!(report.kpis.nsnc, 1);
    assert_eq!(report.kpis.mean_satisfaction, Some(10.0));
    assert_eq!(report.monthly.len(), 2);

    let json = serde_json::to_value(&report)?;
    assert!(json["quarantine_summary"].is_array());
    assert!(json["nulls_per_field"].is_array());

    Ok(())
}

#[test]
fn test_ragged_export_is_a_schema_error() {
    let temp_dir = tempdir().unwrap();
    let broken = temp_dir.path().join("broken.csv");
    fs::write(&broken, "fecha,id_respuesta\n2025-11-03,R1,extra\n").unwrap();

    let err = read_survey_files(&[broken]).unwrap_err();
    assert!(matches!(err, PipelineError::Schema(_)), "{:?}", err);
}

use std::time::Instant;

use anyhow::Result;
use tracing::{info, info_span};

use crate::app::ports::{CleanOutputPort, QuarantineOutputPort};
use crate::config::CleaningConfig;
use crate::pipeline::processing::{CleanedBatch, SurveyCleaner};
use crate::types::RawDataset;

/// Use case for cleaning a raw survey batch and routing both partitions
pub struct CleanUseCase {
    cleaner: SurveyCleaner,
    clean_output: Box<dyn CleanOutputPort>,
    quarantine_output: Box<dyn QuarantineOutputPort>,
}

impl CleanUseCase {
    pub fn new(
        cleaner: SurveyCleaner,
        clean_output: Box<dyn CleanOutputPort>,
        quarantine_output: Box<dyn QuarantineOutputPort>,
    ) -> Self {
        Self {
            cleaner,
            clean_output,
            quarantine_output,
        }
    }

    /// Create a use case with a cleaner built from `config`
    pub fn with_config(
        config: &CleaningConfig,
        clean_output: Box<dyn CleanOutputPort>,
        quarantine_output: Box<dyn QuarantineOutputPort>,
    ) -> Self {
        Self::new(SurveyCleaner::new(config), clean_output, quarantine_output)
    }

    /// Clean `raw`, write every clean and quarantine row to its port, and
    /// return the batch.
    pub async fn run(&self, raw: &RawDataset) -> Result<CleanedBatch> {
        let span = info_span!("clean_batch", rows = raw.len());
        let started = Instant::now();

        // The core is synchronous; only the writes below suspend
        let batch = span.in_scope(|| self.cleaner.clean(raw));

        for record in &batch.output.clean {
            self.clean_output.write_clean_record(record).await?;
            crate::observability::metrics::quality_gate::record_clean();
        }

        for record in &batch.output.quarantine {
            self.quarantine_output.write_quarantine_record(record).await?;
            crate::observability::metrics::quality_gate::record_quarantined();
            for code in record.reason.codes() {
                crate::observability::metrics::quality_gate::reason_detected(code.as_str());
            }
        }

        crate::observability::metrics::quality_gate::batch_processed(
            raw.len(),
            started.elapsed().as_secs_f64(),
        );

        info!(
            clean = batch.stats.clean_records,
            quarantined = batch.stats.quarantined_records,
            clean_rate = %format!("{:.1}%", batch.stats.clean_rate()),
            "Routed cleaned batch"
        );

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::partition::{CleanRecord, QuarantineRecord};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockOutput {
        clean: Arc<Mutex<Vec<CleanRecord>>>,
        quarantine: Arc<Mutex<Vec<QuarantineRecord>>>,
    }

    #[async_trait]
    impl CleanOutputPort for MockOutput {
        async fn write_clean_record(&self, record: &CleanRecord) -> Result<()> {
            self.clean.lock().await.push(record.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl QuarantineOutputPort for MockOutput {
        async fn write_quarantine_record(&self, record: &QuarantineRecord) -> Result<()> {
            self.quarantine.lock().await.push(record.clone());
            Ok(())
        }
    }

    struct FailingOutput;

    #[async_trait]
    impl CleanOutputPort for FailingOutput {
        async fn write_clean_record(&self, _record: &CleanRecord) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn raw() -> RawDataset {
        RawDataset::from_rows(
            &["fecha", "id_respuesta", "satisfaccion"],
            vec![
                vec!["2025-11-03", "R1", "9"],
                vec!["2025-11-03", "R2", "15"],
                vec!["", "", "NS/NC"],
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_clean_use_case_routes_partitions() {
        let output = MockOutput::default();
        let use_case = CleanUseCase::with_config(
            &CleaningConfig::default(),
            Box::new(output.clone()),
            Box::new(output.clone()),
        );

        let batch = use_case.run(&raw()).await.unwrap();
        assert_eq!(batch.stats.clean_records, 1);
        assert_eq!(batch.stats.quarantined_records, 2);

        let clean = output.clean.lock().await;
        assert_eq!(clean.len(), 1);
        assert_eq!(clean[0].id_respuesta, "R1");

        let quarantine = output.quarantine.lock().await;
        let reasons: Vec<String> = quarantine.iter().map(|q| q.reason.to_string()).collect();
        assert_eq!(
            reasons,
            vec!["satisf_fuera_rango", "fecha_invalida;id_respuesta_vacio"]
        );
    }

    #[tokio::test]
    async fn test_output_failure_propagates() {
        let use_case = CleanUseCase::with_config(
            &CleaningConfig::default(),
            Box::new(FailingOutput),
            Box::new(MockOutput::default()),
        );
        assert!(use_case.run(&raw()).await.is_err());
    }
}

use async_trait::async_trait;

use crate::pipeline::processing::partition::{CleanRecord, QuarantineRecord};

/// Destination for records that passed every quality rule
#[async_trait]
pub trait CleanOutputPort: Send + Sync {
    async fn write_clean_record(&self, record: &CleanRecord) -> anyhow::Result<()>;
}

/// Destination for records that failed at least one quality rule
#[async_trait]
pub trait QuarantineOutputPort: Send + Sync {
    async fn write_quarantine_record(&self, record: &QuarantineRecord) -> anyhow::Result<()>;
}

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

use crate::app::ports::{CleanOutputPort, QuarantineOutputPort};
use crate::error::Result;
use crate::pipeline::processing::partition::{CleanRecord, QuarantineRecord};

/// File-backed output port writing one JSON object per line
pub struct NdjsonOutputAdapter {
    file_writer: Mutex<BufWriter<File>>,
    file_path: PathBuf,
}

impl NdjsonOutputAdapter {
    /// Create (or truncate) the file, creating parent directories as needed.
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        info!("Creating output file: {}", path.display());

        let file_writer = BufWriter::new(
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?,
        );

        Ok(Self {
            file_writer: Mutex::new(file_writer),
            file_path: path.to_path_buf(),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn write_line<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let json_line = serde_json::to_string(value)?;

        let mut writer = self
            .file_writer
            .lock()
            .map_err(|_| anyhow::anyhow!("output writer for {} poisoned", self.file_path.display()))?;
        writeln!(writer, "{}", json_line)?;
        writer.flush()?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CleanOutputPort for NdjsonOutputAdapter {
    async fn write_clean_record(&self, record: &CleanRecord) -> anyhow::Result<()> {
        self.write_line(record)
    }
}

#[async_trait::async_trait]
impl QuarantineOutputPort for NdjsonOutputAdapter {
    async fn write_quarantine_record(&self, record: &QuarantineRecord) -> anyhow::Result<()> {
        self.write_line(record)
    }
}

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_ENV_VAR: &str = "SURVEY_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cleaning: CleaningConfig,
    pub output: OutputConfig,
}

/// Knobs for the cleaning core. Defaults reproduce the documented behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// chrono formats tried in order for date-only `fecha` values
    pub date_formats: Vec<String>,
    /// chrono formats for date-time `fecha` values; the time part is dropped
    pub datetime_formats: Vec<String>,
    /// Quarantine satisfaction text that is neither NS/NC nor numeric
    pub strict_satisfaction: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            date_formats: vec![
                "%Y-%m-%d".to_string(),
                "%Y/%m/%d".to_string(),
                "%d/%m/%Y".to_string(),
                "%d-%m-%Y".to_string(),
            ],
            datetime_formats: vec![
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y-%m-%dT%H:%M:%S%.f".to_string(),
                "%Y-%m-%d %H:%M:%S%.f".to_string(),
                "%d/%m/%Y %H:%M".to_string(),
                "%d/%m/%Y %H:%M:%S".to_string(),
            ],
            strict_satisfaction: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub clean_file: String,
    pub quarantine_file: String,
    pub report_file: String,
    pub metrics_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            clean_file: "clean_encuestas.ndjson".to_string(),
            quarantine_file: "quarantine_encuestas.ndjson".to_string(),
            report_file: "reporte.json".to_string(),
            metrics_file: "metrics.prom".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn clean_path(&self) -> PathBuf {
        self.dir.join(&self.clean_file)
    }

    pub fn quarantine_path(&self) -> PathBuf {
        self.dir.join(&self.quarantine_file)
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(&self.report_file)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.dir.join(&self.metrics_file)
    }
}

impl Config {
    /// Resolve the configuration: explicit path, then `SURVEY_CONFIG`, then
    /// `config.toml` in the working directory, then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        dotenv::dotenv().ok();
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => return Self::load_from(Path::new(&path)),
            Err(std::env::VarError::NotPresent) => {}
            Err(e) => return Err(e.into()),
        }

        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            Self::load_from(default_path)
        } else {
            debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.cleaning.date_formats.is_empty() && config.cleaning.datetime_formats.is_empty() {
            return Err(PipelineError::Config(
                "at least one date or datetime format is required".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert!(!config.cleaning.strict_satisfaction);
        assert_eq!(config.cleaning.date_formats[0], "%Y-%m-%d");
        assert_eq!(config.output.dir, PathBuf::from("output"));
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let config = Config::from_toml(
            r#"
            [cleaning]
            strict_satisfaction = true

            [output]
            dir = "/tmp/encuestas"
            "#,
        )
        .unwrap();
        assert!(config.cleaning.strict_satisfaction);
        assert!(!config.cleaning.datetime_formats.is_empty());
        assert_eq!(
            config.output.clean_path(),
            PathBuf::from("/tmp/encuestas/clean_encuestas.ndjson")
        );
    }

    #[test]
    fn test_rejects_config_without_any_date_format() {
        let err = Config::from_toml(
            r#"
            [cleaning]
            date_formats = []
            datetime_formats = []
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config = Config::from_toml(include_str!("../config.example.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(config.cleaning.date_formats, defaults.cleaning.date_formats);
        assert_eq!(config.cleaning.datetime_formats, defaults.cleaning.datetime_formats);
        assert_eq!(config.output.report_path(), defaults.output.report_path());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}

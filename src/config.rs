use crate::domains::imodel::DEFAULT_MASS_PROPERTIES_TABLE;
use crate::errors::{ExportResult, ExporterError};
use crate::logging::LogSettings;
use log::LevelFilter;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_OUTPUT_ROOT: &str = "EXPORTER_OUTPUT_ROOT";
pub const ENV_BRIEFCASE_DIR: &str = "EXPORTER_BRIEFCASE_DIR";
pub const ENV_MASS_PROPERTIES_TABLE: &str = "EXPORTER_MASS_PROPERTIES_TABLE";
pub const ENV_CHECKPOINT_URL: &str = "EXPORTER_CHECKPOINT_URL";
pub const ENV_ACCESS_TOKEN: &str = "EXPORTER_ACCESS_TOKEN";
pub const ENV_LOG_LEVEL: &str = "EXPORTER_LOG_LEVEL";
pub const ENV_DEFAULT_LOG_LEVEL: &str = "EXPORTER_DEFAULT_LOG_LEVEL";

/// Process-wide settings of the export tools.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    pub output_root: PathBuf,
    pub briefcase_dir: PathBuf,
    pub mass_properties_table: String,
    pub checkpoint_url: Option<String>,
    pub access_token: Option<String>,
    pub log: LogSettings,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("out"),
            briefcase_dir: PathBuf::from("briefcases"),
            mass_properties_table: DEFAULT_MASS_PROPERTIES_TABLE.to_string(),
            checkpoint_url: None,
            access_token: None,
            log: LogSettings::default(),
        }
    }
}

impl ExporterConfig {
    /// Load settings from the environment, reading a `.env` file first if present.
    pub fn from_env() -> ExportResult<Self> {
        let _ = dotenv::dotenv();
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(|key| vars.get(key).cloned())
    }

    /// Build settings from a variable lookup; unset or empty values keep their defaults.
    pub fn from_vars<F>(lookup: F) -> ExportResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let log = LogSettings {
            default_level: match get(ENV_DEFAULT_LOG_LEVEL) {
                Some(level) => parse_level(ENV_DEFAULT_LOG_LEVEL, &level)?,
                None => defaults.log.default_level,
            },
            exporter_level: match get(ENV_LOG_LEVEL) {
                Some(level) => parse_level(ENV_LOG_LEVEL, &level)?,
                None => defaults.log.exporter_level,
            },
        };

        Ok(Self {
            output_root: get(ENV_OUTPUT_ROOT).map(PathBuf::from).unwrap_or(defaults.output_root),
            briefcase_dir: get(ENV_BRIEFCASE_DIR).map(PathBuf::from).unwrap_or(defaults.briefcase_dir),
            mass_properties_table: get(ENV_MASS_PROPERTIES_TABLE).unwrap_or(defaults.mass_properties_table),
            checkpoint_url: get(ENV_CHECKPOINT_URL),
            access_token: get(ENV_ACCESS_TOKEN),
            log,
        })
    }

    /// Checkpoint URL template, required by the briefcase driver.
    pub fn require_checkpoint_url(&self) -> ExportResult<&str> {
        self.checkpoint_url
            .as_deref()
            .ok_or_else(|| ExporterError::Config(format!("{} is not set", ENV_CHECKPOINT_URL)))
    }
}

fn parse_level(key: &str, value: &str) -> ExportResult<LevelFilter> {
    LevelFilter::from_str(value.trim())
        .map_err(|_| ExporterError::Config(format!("{} has an invalid log level '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, ExporterConfig::default());
        assert_eq!(config.output_root, PathBuf::from("out"));
        assert_eq!(config.mass_properties_table, "mass_properties");
        assert!(config.require_checkpoint_url().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = ExporterConfig::from_vars(vars(&[
            (ENV_OUTPUT_ROOT, "/tmp/export"),
            (ENV_CHECKPOINT_URL, "https://hub/{iModelId}"),
            (ENV_ACCESS_TOKEN, "secret"),
            (ENV_LOG_LEVEL, "debug"),
            (ENV_DEFAULT_LOG_LEVEL, "WARN"),
            (ENV_BRIEFCASE_DIR, ""),
        ]))
        .unwrap();

        assert_eq!(config.output_root, PathBuf::from("/tmp/export"));
        assert_eq!(config.briefcase_dir, PathBuf::from("briefcases"));
        assert_eq!(config.require_checkpoint_url().unwrap(), "https://hub/{iModelId}");
        assert_eq!(config.access_token.as_deref(), Some("secret"));
        assert_eq!(config.log.exporter_level, LevelFilter::Debug);
        assert_eq!(config.log.default_level, LevelFilter::Warn);
    }

    #[test]
    fn test_invalid_log_level() {
        let result = ExporterConfig::from_vars(vars(&[(ENV_LOG_LEVEL, "loud")]));
        let err = result.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains(ENV_LOG_LEVEL));
    }
}

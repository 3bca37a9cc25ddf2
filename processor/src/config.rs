//! Processor configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a processor instance.
///
/// Can be loaded from a TOML file via [`ProcessorConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Directory of the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Newline-delimited JSON blocks to read. Stdin when absent or `-`.
    #[serde(default)]
    pub input: Option<PathBuf>,

    /// Blocks buffered between the reader and the processor.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics and dump them on exit.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./zonemap_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_channel_capacity() -> usize {
    64
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ProcessorConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.map_size_mb == 0 {
            return Err(ConfigError::Invalid(
                "map_size_mb must be at least 1".to_string(),
            ));
        }
        self.log_format()?;
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, ConfigError> {
        self.log_format.parse().map_err(ConfigError::Invalid)
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    /// The input file, or `None` for stdin.
    pub fn input_path(&self) -> Option<&Path> {
        self.input
            .as_deref()
            .filter(|p| p.as_os_str() != "-")
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            input: None,
            channel_capacity: default_channel_capacity(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ProcessorConfig::default();
        let toml_str = config.to_toml_string().expect("should serialize");
        let parsed = ProcessorConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.channel_capacity, config.channel_capacity);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ProcessorConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.map_size_mb, 1024);
        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.log_format, "human");
        assert!(config.input_path().is_none());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            data_dir = "/var/lib/zonemap"
            input = "blocks.ndjson"
            log_format = "json"
        "#;
        let config = ProcessorConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/zonemap"));
        assert_eq!(config.input_path(), Some(Path::new("blocks.ndjson")));
        assert_eq!(config.log_format().unwrap(), LogFormat::Json);
        assert_eq!(config.log_level, "info"); // default
    }

    #[test]
    fn dash_input_means_stdin() {
        let config = ProcessorConfig::from_toml_str(r#"input = "-""#).expect("should parse");
        assert!(config.input_path().is_none());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = ProcessorConfig::from_toml_str("channel_capacity = 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let result = ProcessorConfig::from_toml_str(r#"log_format = "xml""#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_returns_read_error() {
        let result = ProcessorConfig::from_toml_file("/nonexistent/zonemap.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}

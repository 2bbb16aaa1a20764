use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur in configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidEnvVar(String, String),

    #[error("Failed to read file: {0}")]
    FileReadError(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for flagship_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidEnvVar(..) | ConfigError::Invalid(_) => {
                flagship_common::Error::validation(err.to_string())
            }
            ConfigError::FileReadError(_) | ConfigError::YamlParseError(_) => {
                flagship_common::Error::internal(err.to_string())
            }
        }
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Environment variable naming the YAML file to load
pub const CONFIG_FILE_ENV: &str = "FLAGSHIP_CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "flagship.yaml";

/// Longest voting round accepted, ten years
pub const MAX_VOTE_DURATION_DAYS: i64 = 3650;

/// Voting and reactivation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceSettings {
    /// Length of a voting round in days
    #[serde(default = "default_vote_duration_days")]
    pub vote_duration_days: i64,
    /// Share of approve votes needed to pass (0.0 to 1.0)
    #[serde(default = "default_approval_threshold")]
    pub approval_threshold: Decimal,
    /// Share of table votes above which a flagship is tabled (0.0 to 1.0)
    #[serde(default = "default_table_threshold")]
    pub table_threshold: Decimal,
    /// Share of eligible voters whose sponsorship reopens a tabled flagship
    #[serde(default = "default_reactivation_threshold")]
    pub reactivation_threshold: Decimal,
}

fn default_vote_duration_days() -> i64 {
    14
}

fn default_approval_threshold() -> Decimal {
    Decimal::new(66, 2)
}

fn default_table_threshold() -> Decimal {
    Decimal::new(5, 1)
}

fn default_reactivation_threshold() -> Decimal {
    Decimal::new(10, 2)
}

impl Default for GovernanceSettings {
    fn default() -> Self {
        Self {
            vote_duration_days: default_vote_duration_days(),
            approval_threshold: default_approval_threshold(),
            table_threshold: default_table_threshold(),
            reactivation_threshold: default_reactivation_threshold(),
        }
    }
}

/// Where committed state is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundConfig {
    #[serde(default)]
    pub governance: GovernanceSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl FundConfig {
    /// Load from the file named by `FLAGSHIP_CONFIG_FILE` (or `./flagship.yaml`),
    /// falling back to `FLAGSHIP_*` environment variables when no file exists.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        if Path::new(&config_path).exists() {
            debug!("Loading configuration from {}", config_path);
            return Self::from_file(&config_path);
        }

        Self::from_env()
    }

    /// Build configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup, using defaults for absent keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = FundConfig::default();

        if let Some(days) = parse_var(&lookup, "FLAGSHIP_VOTE_DURATION_DAYS")? {
            config.governance.vote_duration_days = days;
        }
        if let Some(rate) = parse_var(&lookup, "FLAGSHIP_APPROVAL_THRESHOLD")? {
            config.governance.approval_threshold = rate;
        }
        if let Some(rate) = parse_var(&lookup, "FLAGSHIP_TABLE_THRESHOLD")? {
            config.governance.table_threshold = rate;
        }
        if let Some(rate) = parse_var(&lookup, "FLAGSHIP_REACTIVATION_THRESHOLD")? {
            config.governance.reactivation_threshold = rate;
        }
        if let Some(dir) = lookup("FLAGSHIP_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("FLAGSHIP_LOG_LEVEL") {
            config.logging.log_level = level;
        }
        if let Some(dir) = lookup("FLAGSHIP_LOG_DIR") {
            config.logging.log_dir = Some(PathBuf::from(dir));
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::FileReadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: FundConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check thresholds and durations are usable
    pub fn validate(&self) -> Result<()> {
        let g = &self.governance;
        if g.vote_duration_days <= 0 || g.vote_duration_days > MAX_VOTE_DURATION_DAYS {
            return Err(ConfigError::Invalid(format!(
                "vote_duration_days must be between 1 and {}, got {}",
                MAX_VOTE_DURATION_DAYS, g.vote_duration_days
            )));
        }
        for (name, value) in [
            ("approval_threshold", g.approval_threshold),
            ("table_threshold", g.table_threshold),
            ("reactivation_threshold", g.reactivation_threshold),
        ] {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(ConfigError::Invalid(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = FundConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.governance.vote_duration_days, 14);
        assert_eq!(config.governance.approval_threshold, Decimal::new(66, 2));
        assert_eq!(config.governance.table_threshold, Decimal::new(5, 1));
        assert_eq!(config.governance.reactivation_threshold, Decimal::new(1, 1));
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
        assert_eq!(config.logging.log_level, "info");
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = FundConfig::from_lookup(lookup_from(&[
            ("FLAGSHIP_VOTE_DURATION_DAYS", "7"),
            ("FLAGSHIP_APPROVAL_THRESHOLD", "0.75"),
            ("FLAGSHIP_DATA_DIR", "/tmp/flagship"),
            ("FLAGSHIP_LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.governance.vote_duration_days, 7);
        assert_eq!(config.governance.approval_threshold, Decimal::new(75, 2));
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/flagship"));
        assert_eq!(config.logging.log_level, "debug");
    }

    #[test]
    fn test_bad_env_value() {
        let result = FundConfig::from_lookup(lookup_from(&[(
            "FLAGSHIP_REACTIVATION_THRESHOLD",
            "ten percent",
        )]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "FLAGSHIP_REACTIVATION_THRESHOLD"));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let result = FundConfig::from_lookup(lookup_from(&[("FLAGSHIP_APPROVAL_THRESHOLD", "1.5")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = FundConfig::from_lookup(lookup_from(&[("FLAGSHIP_VOTE_DURATION_DAYS", "0")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_vote_duration_upper_bound() {
        let result = FundConfig::from_yaml("governance:\n  vote_duration_days: 1000000000\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let config = FundConfig::from_yaml("governance:\n  vote_duration_days: 3650\n").unwrap();
        assert_eq!(config.governance.vote_duration_days, MAX_VOTE_DURATION_DAYS);
    }

    #[test]
    fn test_yaml_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "governance:\n  vote_duration_days: 21\n  reactivation_threshold: \"0.2\"\nlogging:\n  log_level: warn\n"
        )
        .unwrap();

        let config = FundConfig::from_file(file.path()).unwrap();
        assert_eq!(config.governance.vote_duration_days, 21);
        assert_eq!(config.governance.reactivation_threshold, Decimal::new(2, 1));
        assert_eq!(config.governance.approval_threshold, Decimal::new(66, 2));
        assert_eq!(config.logging.log_level, "warn");
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_missing_file() {
        let result = FundConfig::from_file("/nonexistent/flagship.yaml");
        assert!(matches!(result, Err(ConfigError::FileReadError(_))));
    }
}

//! Configuration module
//!
//! Loads the application configuration from a JSON or YAML file and applies
//! environment overrides on top.

pub mod env;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;
use crate::runner::RunnerConfig;
use crate::utils::LogLevel;
use env::EnvConfig;

/// Configuration file locations, in order of precedence
const CONFIG_LOCATIONS: &[&str] = &[
    "./allure-suite.yaml",
    "./allure-suite.yml",
    "./allure-suite.json",
    "./.allure-suite/config.yaml",
];

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory the allure results are written to
    pub results_dir: PathBuf,

    /// Maximum parallel tests running at once
    pub max_concurrent: usize,

    /// Remove previous result files before writing
    pub clean_results: bool,

    /// Terminal output format
    pub output_format: OutputFormat,

    /// Log level name (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("allure-results"),
            max_concurrent: RunnerConfig::default().max_concurrent,
            clean_results: true,
            output_format: OutputFormat::Table,
            log_level: "info".to_string(),
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = if is_yaml(path) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Find a configuration file in the standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path wins over the config file named by the environment,
    /// which wins over the standard locations. Environment values are
    /// applied last.
    pub fn resolve(explicit: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.config_file.clone().map(PathBuf::from))
            .or_else(Self::find);

        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    /// Override fields with values set in the environment
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(dir) = env.results_dir() {
            self.results_dir = dir;
        }
        if let Some(max) = env.max_concurrent {
            self.max_concurrent = max;
        }
        if let Some(clean) = env.clean_results {
            self.clean_results = clean;
        }
        if let Some(format) = env.format {
            self.output_format = format;
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            bail!("max_concurrent must be at least 1");
        }
        if LogLevel::parse(&self.log_level).is_none() {
            bail!("unknown log level: {}", self.log_level);
        }
        Ok(())
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.log_level).unwrap_or_default()
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            max_concurrent: self.max_concurrent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.results_dir, PathBuf::from("allure-results"));
        assert_eq!(config.max_concurrent, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            max_concurrent: 8,
            output_format: OutputFormat::Summary,
            ..Default::default()
        };

        for name in ["config.yaml", "config.json"] {
            let path = dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(AppConfig::load(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.yml");
        std::fs::write(&path, "max_concurrent: 2\noutput_format: json-pretty\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.output_format, OutputFormat::JsonPretty);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"max_concurrent": 0}"#).unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env = EnvConfig {
            max_concurrent: Some(16),
            format: Some(OutputFormat::Csv),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        let mut config = AppConfig::default();
        config.apply_env(&env);

        assert_eq!(config.runner_config().max_concurrent, 16);
        assert_eq!(config.output_format, OutputFormat::Csv);
        assert_eq!(config.log_level(), LogLevel::Debug);
    }
}

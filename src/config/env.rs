//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Prefix of the variables owned by this tool
const ENV_PREFIX: &str = "ALLURE_SUITE";

/// Base directory of the results folder, shared with other allure tools
const OUTPUT_PATH: &str = "ALLURE_OUTPUT_PATH";

/// Name of the results folder under the base directory
const OUTPUT_FOLDER: &str = "ALLURE_OUTPUT_FOLDER";

const DEFAULT_OUTPUT_FOLDER: &str = "allure-results";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// ALLURE_OUTPUT_PATH
    pub output_path: Option<String>,
    /// ALLURE_OUTPUT_FOLDER
    pub output_folder: Option<String>,
    /// ALLURE_SUITE_MAX_CONCURRENT
    pub max_concurrent: Option<usize>,
    /// ALLURE_SUITE_CLEAN
    pub clean_results: Option<bool>,
    /// ALLURE_SUITE_FORMAT
    pub format: Option<OutputFormat>,
    /// ALLURE_SUITE_LOG
    pub log_level: Option<String>,
    /// ALLURE_SUITE_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            output_path: env::var(OUTPUT_PATH).ok(),
            output_folder: env::var(OUTPUT_FOLDER).ok(),
            max_concurrent: get_env_parse("MAX_CONCURRENT"),
            clean_results: get_env_bool("CLEAN"),
            format: get_env_parse("FORMAT"),
            log_level: get_env("LOG"),
            config_file: get_env("CONFIG"),
        }
    }

    /// Results directory, if either output variable is set
    pub fn results_dir(&self) -> Option<PathBuf> {
        if self.output_path.is_none() && self.output_folder.is_none() {
            return None;
        }
        let base = PathBuf::from(self.output_path.as_deref().unwrap_or("."));
        Some(base.join(
            self.output_folder
                .as_deref()
                .unwrap_or(DEFAULT_OUTPUT_FOLDER),
        ))
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.output_path.is_some()
            || self.output_folder.is_some()
            || self.max_concurrent.is_some()
            || self.clean_results.is_some()
            || self.format.is_some()
            || self.log_level.is_some()
            || self.config_file.is_some()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {OUTPUT_PATH}:            {:?}", self.output_path);
        println!("  {OUTPUT_FOLDER}:          {:?}", self.output_folder);
        println!("  {ENV_PREFIX}_MAX_CONCURRENT: {:?}", self.max_concurrent);
        println!("  {ENV_PREFIX}_CLEAN:          {:?}", self.clean_results);
        println!("  {ENV_PREFIX}_FORMAT:         {:?}", self.format);
        println!("  {ENV_PREFIX}_LOG:            {:?}", self.log_level);
        println!("  {ENV_PREFIX}_CONFIG:         {:?}", self.config_file);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Print the variables this tool reads
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {OUTPUT_PATH}              Base directory of the results folder");
    println!("  {OUTPUT_FOLDER}            Results folder name (default: {DEFAULT_OUTPUT_FOLDER})");
    println!("  {ENV_PREFIX}_MAX_CONCURRENT   Maximum parallel tests");
    println!("  {ENV_PREFIX}_CLEAN            Remove old results first (true/false)");
    println!("  {ENV_PREFIX}_FORMAT           Output format (table, json, json-pretty, csv, summary)");
    println!("  {ENV_PREFIX}_LOG              Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_CONFIG           Path to configuration file");
}

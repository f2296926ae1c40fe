//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Suite execution engine with Allure-style reports
#[derive(Parser, Debug)]
#[command(name = "allure-suite")]
#[command(version)]
#[command(about = "Run test suites and inspect Allure results directories")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (JSON or YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bundled demonstration suites
    Demo(DemoArgs),

    /// Print the results stored in a results directory
    Show(ShowArgs),

    /// Inspect and manage configuration
    Config(ConfigArgs),
}

/// Arguments for demo command
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Results directory to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum parallel tests
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// Keep files of earlier runs in the results directory
    #[arg(long)]
    pub no_clean: bool,

    /// Do not write a results directory
    #[arg(long)]
    pub dry_run: bool,

    /// Print the step tree of every test
    #[arg(short, long)]
    pub steps: bool,
}

/// Arguments for show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Results directory to read
    pub dir: Option<PathBuf>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Print the step tree of every test
    #[arg(short, long)]
    pub steps: bool,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show {
        /// Show the environment variables instead
        #[arg(short, long)]
        env: bool,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Write a configuration file with default values
    Init {
        /// Output path
        #[arg(default_value = "allure-suite.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check a configuration file
    Validate {
        /// Configuration file
        file: Option<PathBuf>,
    },
}

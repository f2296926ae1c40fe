//! allure-suite - run test suites and inspect Allure results
//!
//! ## Usage
//!
//! ```bash
//! # Run the demonstration suites and write ./allure-results
//! allure-suite demo
//!
//! # Print a results directory as a table with step trees
//! allure-suite show allure-results --steps
//!
//! # Show the effective configuration
//! allure-suite config show
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::info;

mod cli;
mod demo;

use allure_suite::config::{env::EnvConfig, AppConfig};
use allure_suite::output::{OutputFormat, ResultFormatter};
use allure_suite::results::{load_results, ResultsWriter};
use allure_suite::utils::{init_logger, LogLevel};
use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env = EnvConfig::load();
    let config = AppConfig::resolve(args.config.as_deref(), &env)?;

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.log_level()
    };
    init_logger(level);

    match args.command {
        cli::Command::Demo(demo_args) => run_demo(demo_args, config).await,
        cli::Command::Show(show_args) => show_results(show_args, &config),
        cli::Command::Config(config_args) => manage_config(config_args, config, &env),
    }
}

fn output_format(flag: Option<&str>, config: &AppConfig) -> Result<OutputFormat> {
    match flag {
        Some(format) => format.parse().map_err(anyhow::Error::msg),
        None => Ok(config.output_format),
    }
}

async fn run_demo(args: cli::DemoArgs, mut config: AppConfig) -> Result<()> {
    if let Some(concurrent) = args.concurrent {
        config.max_concurrent = concurrent;
    }
    if let Some(output) = args.output {
        config.results_dir = output;
    }
    if args.no_clean {
        config.clean_results = false;
    }
    config.validate()?;

    let mut formatter = ResultFormatter::new(output_format(args.format.as_deref(), &config)?);
    if args.steps {
        formatter = formatter.with_steps();
    }

    let suites = demo::run_all(config.runner_config()).await?;

    for suite in &suites {
        println!("{}", formatter.format_suite(suite));
    }

    if args.dry_run {
        return Ok(());
    }

    let writer = ResultsWriter::new(&config.results_dir);
    if config.clean_results {
        writer.clean()?;
    }
    for suite in &suites {
        writer.write_suite(suite)?;
    }
    println!("Results written to {}", config.results_dir.display());

    Ok(())
}

fn show_results(args: cli::ShowArgs, config: &AppConfig) -> Result<()> {
    let dir = args.dir.as_deref().unwrap_or(config.results_dir.as_path());
    info!("Loading results from {}", dir.display());

    let results = load_results(dir)?;
    if results.is_empty() {
        println!("\nNo results found in {}.", dir.display());
        println!("   Run the demo with: allure-suite demo");
        return Ok(());
    }

    let mut formatter = ResultFormatter::new(output_format(args.format.as_deref(), config)?);
    if args.steps {
        formatter = formatter.with_steps();
    }
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.display().to_string());
    println!("{}", formatter.format_results(&name, &results));

    Ok(())
}

fn manage_config(args: cli::ConfigArgs, config: AppConfig, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Show { env: show_env, format } => {
            if show_env {
                env.print_summary();
                println!();
                allure_suite::config::env::print_env_help();
            } else {
                let output = if format == "json" {
                    serde_json::to_string_pretty(&config)?
                } else {
                    serde_yaml::to_string(&config)?
                };
                println!("{output}");
            }
        }

        cli::ConfigAction::Init { output, force } => {
            if output.exists() && !force {
                bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    output.display()
                );
            }
            AppConfig::default().save(&output)?;
            println!("✓ Configuration file created: {}", output.display());
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .or_else(AppConfig::find)
                .context("No configuration file found")?;
            validate_file(&path)?;
        }
    }

    Ok(())
}

fn validate_file(path: &Path) -> Result<()> {
    match AppConfig::load(path) {
        Ok(config) => {
            println!("✓ {} is valid", path.display());
            println!("  results_dir:    {}", config.results_dir.display());
            println!("  max_concurrent: {}", config.max_concurrent);
            println!("  output_format:  {}", config.output_format);
            Ok(())
        }
        Err(e) => bail!("✗ {} is invalid: {e:#}", path.display()),
    }
}

//! Output formatters for suite results
//!
//! Provides table, JSON, CSV and summary output formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{Status, Step, TestResult};
use crate::results::{SuiteResult, SuiteSummary};

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::JsonPretty => "json-pretty",
            OutputFormat::Csv => "csv",
            OutputFormat::Summary => "summary",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "csv" => Ok(OutputFormat::Csv),
            "summary" => Ok(OutputFormat::Summary),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
    show_steps: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
            show_steps: false,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Print the step tree under each table row
    pub fn with_steps(mut self) -> Self {
        self.show_steps = true;
        self
    }

    fn status_label(&self, status: Status) -> String {
        let plain = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return plain;
        }
        let color = match status {
            Status::Passed => "32",
            Status::Failed => "31",
            Status::Broken => "33",
            Status::Skipped => "90",
        };
        format!("\x1b[{color}m{plain}\x1b[0m")
    }

    /// Format a single test result
    pub fn format_result(&self, result: &TestResult) -> String {
        match self.format {
            OutputFormat::Table => self.format_result_table(result),
            OutputFormat::Json => serde_json::to_string(result).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Csv => self.format_result_csv(result),
            OutputFormat::Summary => result.to_string(),
        }
    }

    fn format_result_table(&self, result: &TestResult) -> String {
        let mut line = format!(
            "{:40} {} [{:>6}ms]",
            result.name,
            self.status_label(result.status),
            result.duration_ms()
        );
        if let Some(message) = result.message() {
            line.push_str(&format!("\n    {}", message.lines().next().unwrap_or("")));
        }
        if self.show_steps {
            for step in &result.steps {
                self.push_step(&mut line, step, 1);
            }
        }
        line
    }

    fn push_step(&self, output: &mut String, step: &Step, depth: usize) {
        output.push_str(&format!(
            "\n{}{} {}",
            "  ".repeat(depth + 1),
            step.status.symbol(),
            step.name
        ));
        for attachment in &step.attachments {
            output.push_str(&format!(
                "\n{}@ {} ({})",
                "  ".repeat(depth + 2),
                attachment.name,
                attachment.source
            ));
        }
        for nested in &step.steps {
            self.push_step(output, nested, depth + 1);
        }
    }

    fn format_result_csv(&self, result: &TestResult) -> String {
        format!(
            "\"{}\",{},{},\"{}\"",
            result.name.replace('"', "\"\""),
            result.status,
            result.duration_ms(),
            result.message().unwrap_or("").replace('"', "\"\"")
        )
    }

    /// Format a list of results of one suite
    pub fn format_results(&self, suite: &str, results: &[TestResult]) -> String {
        let summary = SuiteSummary::new(suite, results);
        match self.format {
            OutputFormat::Table => self.format_table(&summary, results),
            OutputFormat::Json => serde_json::to_string(results).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(results).unwrap_or_default(),
            OutputFormat::Csv => {
                let mut output = String::from("name,status,duration_ms,message\n");
                for result in results {
                    output.push_str(&self.format_result_csv(result));
                    output.push('\n');
                }
                output
            }
            OutputFormat::Summary => self.format_summary(&summary),
        }
    }

    /// Format every record of a suite run
    pub fn format_suite(&self, suite: &SuiteResult) -> String {
        let results: Vec<TestResult> = suite
            .get_all_test_results()
            .into_iter()
            .map(|record| record.result)
            .collect();
        self.format_results(suite.name(), &results)
    }

    pub fn format_summary(&self, summary: &SuiteSummary) -> String {
        format!(
            "{}: {}/{} passed, {} failed, {} broken, {} skipped ({:.1}%) in {}ms",
            summary.suite,
            summary.passed,
            summary.total,
            summary.failed,
            summary.broken,
            summary.skipped,
            summary.pass_rate(),
            summary.total_duration_ms
        )
    }

    fn format_table(&self, summary: &SuiteSummary, results: &[TestResult]) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!("║  Suite: {:52} ║\n", summary.suite));
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        for result in results {
            output.push_str(&format!("  {}\n", self.format_result_table(result)));
        }

        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        output.push_str(&format!(
            "║  Total: {:3} | Passed: {:3} | Failed: {:3} | Broken: {:3} | Skipped: {:3}\n",
            summary.total, summary.passed, summary.failed, summary.broken, summary.skipped
        ));
        output.push_str(&format!(
            "║  Pass Rate: {:5.1}% | Duration: {:6}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

//! allure-suite - suite execution engine with Allure-style reports
//!
//! Runs a suite of tests through ordered lifecycle hooks, isolates failures
//! per test and aggregates a hierarchical, machine-readable report.
//!
//! ## Example
//!
//! ```no_run
//! use allure_suite::runner::SuiteRunner;
//!
//! # async fn run() -> allure_suite::Result<()> {
//! let mut runner = SuiteRunner::new("billing", "InvoiceSuite");
//! runner.before_each(|t| t.new_step("Reset fixtures", vec![]));
//! runner
//!     .new_test("totals_add_up", |t| {
//!         t.assert().equal(&10, &(4 + 6));
//!     })?
//!     .tags(["smoke"]);
//!
//! let results = runner.run_tests().await;
//! println!("{}", results.summary());
//! # Ok(())
//! # }
//! ```

pub mod asserts;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod output;
pub mod results;
pub mod runner;
pub mod utils;

pub use context::{ExecutionContext, Phase};
pub use error::{Result, SuiteError};
pub use models::{Attachment, Container, MimeType, Parameter, Status, Step, TestResult};
pub use results::{SuiteResult, TestRecord};
pub use runner::{run_suite, RunnerConfig, SuiteRunner, TestContext, TestDef, TestSuite};

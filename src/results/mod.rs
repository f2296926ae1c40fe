//! Result aggregation and storage
//!
//! Collects per-test records during a run and persists them as an allure
//! results directory.

mod storage;
mod suite_result;

pub use storage::{load_containers, load_results, ResultsWriter, WriteStats};
pub use suite_result::{SuiteReport, SuiteResult, SuiteSummary, TestRecord};

//! Suite result aggregation
//!
//! [`SuiteResult`] collects the frozen record of every test unit plus the
//! suite-level container. Units insert concurrently; readers get clones.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::error::{Result, SuiteError};
use crate::models::{Container, Status, TestResult};

/// Result of one test together with its BeforeEach/AfterEach container
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    /// Registered test name; the result may carry a different title
    pub name: String,
    pub result: TestResult,
    pub container: Container,
}

impl TestRecord {
    pub fn new(result: TestResult, container: Container) -> Self {
        Self {
            name: result.name.clone(),
            result,
            container,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uuid(&self) -> Uuid {
        self.result.uuid
    }

    pub fn status(&self) -> Status {
        self.result.status
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Serialized form of a whole suite run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub name: String,
    pub container: Container,
    pub results: Vec<TestRecord>,
}

impl SuiteReport {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Debug)]
struct State {
    by_name: BTreeMap<String, TestRecord>,
    by_uuid: HashMap<Uuid, String>,
    container: Container,
}

/// Thread-safe collector for a suite run
#[derive(Debug)]
pub struct SuiteResult {
    name: String,
    state: RwLock<State>,
    finished: AtomicBool,
}

impl SuiteResult {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            state: RwLock::new(State {
                by_name: BTreeMap::new(),
                by_uuid: HashMap::new(),
                container: Container::new(name.clone()),
            }),
            name,
            finished: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace the record of a test
    pub fn new_result(&self, record: TestRecord) {
        let name = record.name().to_string();
        let uuid = record.uuid();

        let mut state = self.state.write();
        if let Some(previous) = state.by_name.insert(name.clone(), record) {
            state.by_uuid.remove(&previous.uuid());
        }
        state.by_uuid.insert(uuid, name);
    }

    pub fn get_result_by_name(&self, name: &str) -> Option<TestRecord> {
        self.state.read().by_name.get(name).cloned()
    }

    pub fn get_result_by_uuid(&self, uuid: &Uuid) -> Option<TestRecord> {
        let state = self.state.read();
        state
            .by_uuid
            .get(uuid)
            .and_then(|name| state.by_name.get(name))
            .cloned()
    }

    /// All records, ordered by test name
    pub fn get_all_test_results(&self) -> Vec<TestRecord> {
        self.state.read().by_name.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Suite-level BeforeAll/AfterAll container
    pub fn container(&self) -> Container {
        self.state.read().container.clone()
    }

    /// Store the final suite container and mark the run done.
    pub(crate) fn finish(&self, container: Container) {
        self.state.write().container = container;
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn summary(&self) -> SuiteSummary {
        let state = self.state.read();
        SuiteSummary::new(&self.name, state.by_name.values().map(|r| &r.result))
    }

    /// Snapshot of the finished run
    pub fn report(&self) -> Result<SuiteReport> {
        if !self.is_finished() {
            return Err(SuiteError::NotFinished);
        }
        let state = self.state.read();
        Ok(SuiteReport {
            name: self.name.clone(),
            container: state.container.clone(),
            results: state.by_name.values().cloned().collect(),
        })
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.report()?)?)
    }
}

/// Status counts of a suite run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub suite: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub broken: usize,
    pub skipped: usize,
    pub total_duration_ms: u64,
}

impl SuiteSummary {
    pub fn new<'a>(suite: &str, results: impl IntoIterator<Item = &'a TestResult>) -> Self {
        let mut summary = Self {
            suite: suite.to_string(),
            ..Default::default()
        };

        for result in results {
            summary.total += 1;
            summary.total_duration_ms += result.duration_ms();
            match result.status {
                Status::Passed => summary.passed += 1,
                Status::Failed => summary.failed += 1,
                Status::Broken => summary.broken += 1,
                Status::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.passed == self.total
    }
}

impl fmt::Display for SuiteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Total: {} | Passed: {} | Failed: {} | Broken: {} | Skipped: {} | Pass Rate: {:.1}%",
            self.suite,
            self.total,
            self.passed,
            self.failed,
            self.broken,
            self.skipped,
            self.pass_rate()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn record(name: &str, status: Status) -> TestRecord {
        let mut result = TestResult::new(name, format!("suite/{name}"));
        result.finish(status, None);
        TestRecord::new(result, Container::new(name))
    }

    #[test]
    fn test_lookup_by_name_and_uuid() {
        let suite = SuiteResult::new("suite");
        let rec = record("login", Status::Passed);
        let uuid = rec.uuid();
        suite.new_result(rec);

        assert_eq!(suite.get_result_by_name("login").unwrap().uuid(), uuid);
        assert_eq!(suite.get_result_by_uuid(&uuid).unwrap().name(), "login");
        assert!(suite.get_result_by_name("logout").is_none());
        assert!(suite.get_result_by_uuid(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_replace_drops_stale_uuid() {
        let suite = SuiteResult::new("suite");
        let first = record("login", Status::Failed);
        let stale = first.uuid();
        suite.new_result(first);
        suite.new_result(record("login", Status::Passed));

        assert_eq!(suite.len(), 1);
        assert!(suite.get_result_by_uuid(&stale).is_none());
        assert_eq!(
            suite.get_result_by_name("login").unwrap().status(),
            Status::Passed
        );
    }

    #[test]
    fn test_concurrent_inserts() {
        let suite = Arc::new(SuiteResult::new("suite"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let suite = Arc::clone(&suite);
                thread::spawn(move || {
                    for j in 0..25 {
                        suite.new_result(record(&format!("t{i}-{j}"), Status::Passed));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(suite.len(), 200);
        let names: Vec<_> = suite
            .get_all_test_results()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_to_json_requires_finished_run() {
        let suite = SuiteResult::new("suite");
        suite.new_result(record("a", Status::Passed));
        assert!(matches!(suite.to_json(), Err(SuiteError::NotFinished)));

        suite.finish(Container::new("suite"));
        let report = SuiteReport::from_json(&suite.to_json().unwrap()).unwrap();
        assert_eq!(report.name, "suite");
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].status(), Status::Passed);
    }

    #[test]
    fn test_summary_counts() {
        let suite = SuiteResult::new("suite");
        suite.new_result(record("a", Status::Passed));
        suite.new_result(record("b", Status::Failed));
        suite.new_result(record("c", Status::Broken));
        suite.new_result(record("d", Status::Skipped));

        let summary = suite.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.broken, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.is_all_passed());
        assert_eq!(summary.pass_rate(), 25.0);
    }
}

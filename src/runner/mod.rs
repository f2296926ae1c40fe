//! Suite lifecycle orchestration
//!
//! [`SuiteRunner`] drives BeforeAll, then BeforeEach/body/AfterEach for every
//! registered test, then AfterAll, and hands back the aggregated
//! [`SuiteResult`].

mod launcher;
pub(crate) mod outcome;
mod suite;
mod test_context;

pub use outcome::{Outcome, PhaseEnd};
pub use suite::{run_suite, run_suite_with, TestDef, TestSuite};
pub use test_context::{StepContext, TestBody, TestContext, TestMeta};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::context::Phase;
use crate::error::{Result, SuiteError};
use crate::models::{labels, Container, Label, Status, StatusDetails, Step, TestResult};
use crate::results::SuiteResult;
use crate::utils::Timer;
use launcher::TestLauncher;

/// Tuning knobs of a suite run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Upper bound on parallel tests running at once
    pub max_concurrent: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// Identity of a suite, shared by every unit
#[derive(Clone, Debug)]
pub(crate) struct SuiteMeta {
    pub(crate) package: String,
    pub(crate) suite_name: String,
    pub(crate) parent_suite: Option<String>,
}

impl SuiteMeta {
    pub(crate) fn new(package: impl Into<String>, suite_name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            suite_name: suite_name.into(),
            parent_suite: None,
        }
    }

    pub(crate) fn full_name(&self, test: &str) -> String {
        format!("{}/{}/{}", self.package, self.suite_name, test)
    }

    pub(crate) fn labels(&self) -> Vec<Label> {
        let mut labels = vec![
            Label::new(labels::SUITE, &self.suite_name),
            Label::new(labels::PACKAGE, &self.package),
            Label::new(labels::FRAMEWORK, env!("CARGO_PKG_NAME")),
            Label::new(labels::LANGUAGE, "rust"),
        ];
        if let Some(parent) = &self.parent_suite {
            labels.push(Label::new(labels::PARENT_SUITE, parent));
        }
        labels
    }
}

/// A registered test
pub struct TestEntry {
    pub(crate) name: String,
    pub(crate) body: TestBody,
    pub(crate) tags: Vec<String>,
    pub(crate) parallel: bool,
    pub(crate) allure_id: Option<String>,
}

impl TestEntry {
    pub(crate) fn new(name: impl Into<String>, body: TestBody) -> Self {
        Self {
            name: name.into(),
            body,
            tags: Vec::new(),
            parallel: false,
            allure_id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Run this test concurrently with the other parallel tests
    pub fn parallel(&mut self) -> &mut Self {
        self.parallel = true;
        self
    }

    pub fn allure_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.allure_id = Some(id.into());
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub(crate) fn apply_labels(&self, result: &mut TestResult) {
        for tag in &self.tags {
            result.add_label(Label::new(labels::TAG, tag));
        }
        if let Some(id) = &self.allure_id {
            result.add_label(Label::new(labels::ALLURE_ID, id));
        }
    }
}

/// Registers tests and hooks, then runs them as one suite
pub struct SuiteRunner {
    suite: SuiteMeta,
    config: RunnerConfig,
    tests: Vec<TestEntry>,
    before_all: Option<TestBody>,
    after_all: Option<TestBody>,
    before_each: Option<TestBody>,
    after_each: Option<TestBody>,
}

impl SuiteRunner {
    pub fn new(package: impl Into<String>, suite_name: impl Into<String>) -> Self {
        Self {
            suite: SuiteMeta::new(package, suite_name),
            config: RunnerConfig::default(),
            tests: Vec::new(),
            before_all: None,
            after_all: None,
            before_each: None,
            after_each: None,
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_parent_suite(mut self, parent: impl Into<String>) -> Self {
        self.suite.parent_suite = Some(parent.into());
        self
    }

    pub fn suite_name(&self) -> &str {
        &self.suite.suite_name
    }

    /// Register a test body under a name unique within the suite
    pub fn new_test<F>(&mut self, name: impl Into<String>, body: F) -> Result<&mut TestEntry>
    where
        F: Fn(&mut TestContext) + Send + Sync + 'static,
    {
        let name = name.into();
        if self.tests.iter().any(|t| t.name == name) {
            return Err(SuiteError::DuplicateTest(name));
        }
        self.tests.push(TestEntry::new(name, Arc::new(body)));
        let index = self.tests.len() - 1;
        Ok(&mut self.tests[index])
    }

    pub fn before_all<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut TestContext) + Send + Sync + 'static,
    {
        self.before_all = Some(Arc::new(hook));
        self
    }

    pub fn after_all<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut TestContext) + Send + Sync + 'static,
    {
        self.after_all = Some(Arc::new(hook));
        self
    }

    pub fn before_each<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut TestContext) + Send + Sync + 'static,
    {
        self.before_each = Some(Arc::new(hook));
        self
    }

    pub fn after_each<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut TestContext) + Send + Sync + 'static,
    {
        self.after_each = Some(Arc::new(hook));
        self
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Run the whole lifecycle and return the aggregated results.
    pub async fn run_tests(self) -> Arc<SuiteResult> {
        let SuiteRunner {
            suite,
            config,
            tests,
            before_all,
            after_all,
            before_each,
            after_each,
        } = self;

        let suite = Arc::new(suite);
        let results = Arc::new(SuiteResult::new(suite.suite_name.clone()));
        let timer = Timer::start(format!("Suite {}", suite.suite_name));

        info!(
            "Running suite {} ({} tests, max {} concurrent)",
            suite.suite_name,
            tests.len(),
            config.max_concurrent
        );

        let mut container = Container::new(&suite.suite_name);
        container.begin();

        let noop: TestBody = Arc::new(|_: &mut TestContext| {});
        let before_all = before_all.unwrap_or(noop);
        let (c, before) = run_suite_hook(Phase::BeforeAll, before_all, container, &suite).await;
        container = c;

        if !before.is_clean() {
            let details = launcher::hook_failure(Phase::BeforeAll, &before);
            warn!(
                "Suite {} is broken, {} tests not run: {}",
                suite.suite_name,
                tests.len(),
                details.message
            );
            for entry in &tests {
                let record = launcher::broken_record(&suite, entry, details.clone());
                container.add_child(record.uuid());
                results.new_result(record);
            }
            container.finish();
            results.finish(container);
            timer.stop();
            return results;
        }

        let launcher = TestLauncher::new(
            Arc::clone(&suite),
            before_each,
            after_each,
            Arc::clone(&results),
            config.max_concurrent,
        );
        for uuid in launcher.launch(tests).await {
            container.add_child(uuid);
        }

        if let Some(hook) = after_all {
            let (c, end) = run_suite_hook(Phase::AfterAll, hook, container, &suite).await;
            container = c;
            if !end.is_clean() {
                warn!(
                    "Suite {}: {}",
                    suite.suite_name,
                    launcher::hook_failure(Phase::AfterAll, &end).message
                );
            }
        }

        container.finish();
        results.finish(container);
        info!("{} in {}ms", results.summary(), timer.stop().as_millis());
        results
    }
}

/// Run a suite-level hook on a blocking task.
///
/// The hook's container comes back even if the task itself is lost, in which
/// case the phase counts as panicked.
async fn run_suite_hook(
    phase: Phase,
    body: TestBody,
    container: Container,
    suite: &SuiteMeta,
) -> (Container, PhaseEnd) {
    let name = container.name.clone();
    let uuid = container.uuid;
    let start = container.start;
    let meta = TestMeta::new(&suite.suite_name);

    let joined = tokio::task::spawn_blocking(move || {
        launcher::run_hook(phase, &body, container, meta)
    })
    .await;

    let failure = match joined {
        Ok(Ok((container, _, end))) => return (container, end),
        Ok(Err(e)) => e.to_string(),
        Err(e) => e.to_string(),
    };

    error!("{} hook of {} was lost: {}", phase, suite.suite_name, failure);
    let mut container = Container::new(name);
    container.uuid = uuid;
    container.start = start;
    let details = StatusDetails::from_error(failure);
    let mut step = Step::new(format!("{phase} hook"));
    step.finish(Status::Broken);
    step.status_details = Some(details.clone());
    if phase.is_setup() {
        container.befores.push(step);
    } else {
        container.afters.push(step);
    }
    (container, PhaseEnd::Panicked(details))
}

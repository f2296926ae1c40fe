//! Concurrent test launcher
//!
//! Every test unit runs on a blocking task of the tokio runtime. Sequential
//! units run one after another in registration order, then parallel units
//! run together bounded by a semaphore. The launcher returns only after every
//! unit it started has reported to the aggregator.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::outcome::{Outcome, PhaseEnd};
use super::test_context::{TestBody, TestContext, TestMeta};
use super::{SuiteMeta, TestEntry};
use crate::context::{ExecutionContext, Phase};
use crate::error::Result;
use crate::models::{Container, Status, StatusDetails, Step, TestResult};
use crate::results::{SuiteResult, TestRecord};

/// Run one hook body against `container` and take the container back.
///
/// Any hook that does not end cleanly leaves a "<Phase> hook" step in its
/// scope carrying the status and details of the failure.
pub(crate) fn run_hook(
    phase: Phase,
    body: &TestBody,
    container: Container,
    meta: TestMeta,
) -> Result<(Container, TestMeta, PhaseEnd)> {
    let mut ctx = TestContext::new(ExecutionContext::hook(phase, container)?, meta);
    let end = ctx.run(body);
    let (mut context, meta) = ctx.into_parts();

    if let Some(details) = end.details() {
        let mut step = Step::new(format!("{phase} hook"));
        step.finish(end.status());
        step.status_details = Some(details);
        context.add_step(step);
    }
    Ok((context.into_container()?, meta, end))
}

/// Prefix the message of a hook failure with the hook that produced it
pub(crate) fn hook_failure(phase: Phase, end: &PhaseEnd) -> StatusDetails {
    let details = end
        .details()
        .unwrap_or_else(|| StatusDetails::from_error("no details"));
    let message = format!("{phase} hook failed: {}", details.message);
    StatusDetails::with_trace(message, details.trace)
}

/// Fresh result of a registered test carrying the suite labels
fn labelled_result(suite: &SuiteMeta, name: &str) -> TestResult {
    let mut result = TestResult::new(name, suite.full_name(name));
    for label in suite.labels() {
        result.add_label(label);
    }
    result
}

/// Result for a test that never ran because the suite setup failed
pub(crate) fn broken_record(
    suite: &SuiteMeta,
    entry: &TestEntry,
    details: StatusDetails,
) -> TestRecord {
    let mut result = labelled_result(suite, &entry.name);
    entry.apply_labels(&mut result);
    result.finish(Status::Broken, Some(details));

    let mut container = Container::new(&entry.name);
    container.add_child(result.uuid);
    container.finish();
    TestRecord::new(result, container)
}

/// One test with everything it needs to run on its own thread
pub(crate) struct TestUnit {
    before_each: Option<TestBody>,
    after_each: Option<TestBody>,
    entry: TestEntry,
    result: TestResult,
}

impl TestUnit {
    pub(crate) fn uuid(&self) -> Uuid {
        self.result.uuid
    }

    /// Run BeforeEach, the body and AfterEach, then freeze the record.
    pub(crate) fn run(self) -> Result<TestRecord> {
        let TestUnit {
            before_each,
            after_each,
            entry,
            mut result,
        } = self;

        debug!("Starting {}", entry.name);
        result.begin();
        let mut container = Container::new(&entry.name);
        container.begin();
        container.add_child(result.uuid);
        let mut meta = TestMeta::new(&entry.name);

        let before = match &before_each {
            Some(hook) => {
                let (c, m, end) = run_hook(Phase::BeforeEach, hook, container, meta)?;
                container = c;
                meta = m;
                end
            }
            None => PhaseEnd::Clean,
        };

        let (outcome, run_after) = match before {
            PhaseEnd::Clean => {
                let mut ctx = TestContext::new(ExecutionContext::test(result), meta);
                let end = ctx.run(&entry.body);
                let (context, m) = ctx.into_parts();
                result = context.into_result()?;
                meta = m;

                let outcome = match end {
                    PhaseEnd::Clean => Outcome::Passed,
                    PhaseEnd::Failed(details) | PhaseEnd::Panicked(details) => {
                        Outcome::Failed(details)
                    }
                    PhaseEnd::Broken(details) => Outcome::Broken(details),
                    PhaseEnd::Skipped(reason) => {
                        Outcome::Skipped(StatusDetails::from_error(reason))
                    }
                };
                (outcome, true)
            }
            PhaseEnd::Skipped(reason) => {
                (Outcome::Skipped(StatusDetails::from_error(reason)), true)
            }
            PhaseEnd::Panicked(_) => {
                let details = hook_failure(Phase::BeforeEach, &before);
                warn!("{}: {}", entry.name, details.message);
                (Outcome::Broken(details), false)
            }
            PhaseEnd::Failed(_) | PhaseEnd::Broken(_) => {
                let details = hook_failure(Phase::BeforeEach, &before);
                warn!("{}: {}", entry.name, details.message);
                (Outcome::Broken(details), true)
            }
        };

        if run_after {
            if let Some(hook) = &after_each {
                let (c, m, end) = run_hook(Phase::AfterEach, hook, container, meta)?;
                container = c;
                meta = m;
                if !end.is_clean() {
                    warn!(
                        "{}: {}",
                        entry.name,
                        hook_failure(Phase::AfterEach, &end).message
                    );
                }
            }
        }

        entry.apply_labels(&mut result);
        for label in meta.labels {
            result.add_label(label);
        }
        if meta.description.is_some() {
            result.description = meta.description;
        }

        let (status, details) = outcome.into_parts();
        result.finish(status, details);
        container.finish();

        let mut record = TestRecord::new(result, container);
        if let Some(title) = meta.title {
            record.result.name = title;
        }

        info!(
            "{} {} ({}ms)",
            record.status().symbol(),
            record.name(),
            record.result.duration_ms()
        );
        Ok(record)
    }
}

/// Launches test units and feeds their records to the aggregator
pub(crate) struct TestLauncher {
    suite: Arc<SuiteMeta>,
    before_each: Option<TestBody>,
    after_each: Option<TestBody>,
    results: Arc<SuiteResult>,
    semaphore: Arc<Semaphore>,
}

impl TestLauncher {
    pub(crate) fn new(
        suite: Arc<SuiteMeta>,
        before_each: Option<TestBody>,
        after_each: Option<TestBody>,
        results: Arc<SuiteResult>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            suite,
            before_each,
            after_each,
            results,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    fn unit(&self, entry: TestEntry) -> TestUnit {
        let result = labelled_result(&self.suite, &entry.name);
        TestUnit {
            before_each: self.before_each.clone(),
            after_each: self.after_each.clone(),
            entry,
            result,
        }
    }

    /// Run every test and return the uuids of the recorded results.
    pub(crate) async fn launch(&self, tests: Vec<TestEntry>) -> Vec<Uuid> {
        let (parallel, sequential): (Vec<_>, Vec<_>) =
            tests.into_iter().partition(|entry| entry.parallel);

        debug!(
            "Launching {} sequential and {} parallel tests",
            sequential.len(),
            parallel.len()
        );

        let mut children = Vec::new();

        for entry in sequential {
            let name = entry.name.clone();
            let unit = self.unit(entry);
            let uuid = unit.uuid();
            let joined = tokio::task::spawn_blocking(move || unit.run()).await;
            children.push(self.collect(&name, uuid, joined));
        }

        let handles = parallel.into_iter().map(|entry| {
            let semaphore = Arc::clone(&self.semaphore);
            let name = entry.name.clone();
            let unit = self.unit(entry);
            let uuid = unit.uuid();

            async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let joined = tokio::task::spawn_blocking(move || unit.run()).await;
                (name, uuid, joined)
            }
        });

        for (name, uuid, joined) in join_all(handles).await {
            children.push(self.collect(&name, uuid, joined));
        }

        children
    }

    /// Hand a unit's record to the aggregator, replacing lost units with a
    /// Broken result.
    fn collect(
        &self,
        name: &str,
        uuid: Uuid,
        joined: std::result::Result<Result<TestRecord>, JoinError>,
    ) -> Uuid {
        let record = match joined {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                error!("Test {} could not be recorded: {}", name, e);
                self.lost_record(name, uuid, e.to_string())
            }
            Err(e) => {
                error!("Test {} escaped its unit: {}", name, e);
                let message = if e.is_panic() {
                    "test unit panicked outside of a phase".to_string()
                } else {
                    e.to_string()
                };
                self.lost_record(name, uuid, message)
            }
        };

        let uuid = record.uuid();
        self.results.new_result(record);
        uuid
    }

    fn lost_record(&self, name: &str, uuid: Uuid, message: String) -> TestRecord {
        let mut result = labelled_result(&self.suite, name);
        result.uuid = uuid;
        result.finish(Status::Broken, Some(StatusDetails::from_error(message)));

        let mut container = Container::new(name);
        container.add_child(uuid);
        container.finish();
        TestRecord::new(result, container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{labels, MimeType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn suite() -> Arc<SuiteMeta> {
        Arc::new(SuiteMeta::new("pkg", "LauncherSuite"))
    }

    fn body(f: impl Fn(&mut TestContext) + Send + Sync + 'static) -> TestBody {
        Arc::new(f)
    }

    fn unit(
        entry: TestEntry,
        before_each: Option<TestBody>,
        after_each: Option<TestBody>,
    ) -> TestUnit {
        let launcher = TestLauncher::new(
            suite(),
            before_each,
            after_each,
            Arc::new(SuiteResult::new("LauncherSuite")),
            2,
        );
        launcher.unit(entry)
    }

    #[test]
    fn test_unit_passes_and_carries_labels() {
        let mut entry = TestEntry::new("ok", body(|t| t.new_step("work", vec![])));
        entry.tags(["smoke"]).allure_id("42");

        let record = unit(entry, None, None).run().unwrap();
        assert_eq!(record.status(), Status::Passed);
        assert_eq!(record.result.steps.len(), 1);
        assert_eq!(record.result.get_labels(labels::SUITE), vec!["LauncherSuite"]);
        assert_eq!(record.result.get_labels(labels::PACKAGE), vec!["pkg"]);
        assert_eq!(record.result.get_labels(labels::TAG), vec!["smoke"]);
        assert_eq!(record.result.get_labels(labels::ALLURE_ID), vec!["42"]);
        assert_eq!(record.container.children, vec![record.uuid()]);
    }

    #[test]
    fn test_before_each_failure_skips_body_but_runs_after_each() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let entry = TestEntry::new(
            "guarded",
            body(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let record = unit(
            entry,
            Some(body(|t| {
                t.require().is_true(false);
            })),
            Some(body(|t| t.new_step("cleanup", vec![]))),
        )
        .run()
        .unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(record.status(), Status::Broken);
        assert!(record
            .result
            .message()
            .unwrap()
            .starts_with("BeforeEach hook failed"));
        assert_eq!(record.container.befores[0].name, "REQUIRE: True");
        assert_eq!(record.container.befores[1].name, "BeforeEach hook");
        assert_eq!(record.container.befores[1].status, Status::Failed);
        assert_eq!(record.container.afters[0].name, "cleanup");
    }

    #[test]
    fn test_before_each_skip_skips_body_but_runs_after_each() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let entry = TestEntry::new(
            "needs_network",
            body(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let record = unit(
            entry,
            Some(body(|t| t.skip("network disabled"))),
            Some(body(|t| t.new_step("cleanup", vec![]))),
        )
        .run()
        .unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(record.status(), Status::Skipped);
        assert_eq!(record.result.message(), Some("network disabled"));
        assert_eq!(record.container.befores.len(), 1);
        assert_eq!(record.container.befores[0].name, "BeforeEach hook");
        assert_eq!(record.container.befores[0].status, Status::Skipped);
        assert_eq!(record.container.afters[0].name, "cleanup");
    }

    #[test]
    fn test_after_each_fatal_is_recorded_without_changing_status() {
        let entry = TestEntry::new("fine", body(|_| {}));
        let record = unit(
            entry,
            None,
            Some(body(|t| t.fatal("connection leaked"))),
        )
        .run()
        .unwrap();

        assert_eq!(record.status(), Status::Passed);
        assert!(record.result.status_details.is_none());
        let afters = &record.container.afters;
        assert_eq!(afters.len(), 1);
        assert_eq!(afters[0].name, "AfterEach hook");
        assert_eq!(afters[0].status, Status::Failed);
        assert_eq!(
            afters[0].status_details.as_ref().unwrap().message,
            "connection leaked"
        );
    }

    #[test]
    fn test_after_each_soft_error_is_recorded() {
        let entry = TestEntry::new("fine", body(|_| {}));
        let record = unit(
            entry,
            None,
            Some(body(|t| {
                t.errorf("socket still open");
                t.new_step("closed anyway", vec![]);
            })),
        )
        .run()
        .unwrap();

        assert_eq!(record.status(), Status::Passed);
        let names: Vec<_> = record.container.afters.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["closed anyway", "AfterEach hook"]);
        assert_eq!(record.container.afters[1].status, Status::Failed);
    }

    #[test]
    fn test_before_each_panic_skips_after_each() {
        let entry = TestEntry::new("doomed", body(|_| {}));
        let record = unit(
            entry,
            Some(body(|_| panic!("fixture exploded"))),
            Some(body(|t| t.new_step("cleanup", vec![]))),
        )
        .run()
        .unwrap();

        assert_eq!(record.status(), Status::Broken);
        assert_eq!(record.container.befores.len(), 1);
        assert_eq!(record.container.befores[0].name, "BeforeEach hook");
        assert_eq!(record.container.befores[0].status, Status::Broken);
        assert!(record.container.afters.is_empty());
    }

    #[test]
    fn test_body_panic_is_failed_with_trace() {
        let entry = TestEntry::new("explodes", body(|_| panic!("boom")));
        let record = unit(entry, None, None).run().unwrap();

        assert_eq!(record.status(), Status::Failed);
        let details = record.result.status_details.unwrap();
        assert_eq!(details.message, "boom");
        assert!(details.trace.contains("launcher.rs"));
    }

    #[test]
    fn test_skip_and_broken_outcomes() {
        let record = unit(TestEntry::new("s", body(|t| t.skip("not ready"))), None, None)
            .run()
            .unwrap();
        assert_eq!(record.status(), Status::Skipped);
        assert_eq!(record.result.message(), Some("not ready"));

        let record = unit(TestEntry::new("b", body(|t| t.broken("no db"))), None, None)
            .run()
            .unwrap();
        assert_eq!(record.status(), Status::Broken);
    }

    #[test]
    fn test_after_each_failure_keeps_status() {
        let entry = TestEntry::new("fine", body(|_| {}));
        let record = unit(
            entry,
            None,
            Some(body(|t| {
                t.with_new_attachment("log", MimeType::Text, "teardown");
                panic!("teardown broke");
            })),
        )
        .run()
        .unwrap();

        assert_eq!(record.status(), Status::Passed);
        assert_eq!(record.container.afters.len(), 2);
        assert_eq!(record.container.afters[0].name, "log");
        assert_eq!(record.container.afters[1].name, "AfterEach hook");
        assert!(record.result.attachments.is_empty());
    }

    #[test]
    fn test_title_keeps_registered_name() {
        let entry = TestEntry::new("registered", body(|t| t.title("Pretty title")));
        let record = unit(entry, None, None).run().unwrap();
        assert_eq!(record.name(), "registered");
        assert_eq!(record.result.name, "Pretty title");
    }

    #[tokio::test]
    async fn test_launch_records_every_test() {
        let results = Arc::new(SuiteResult::new("LauncherSuite"));
        let launcher = TestLauncher::new(suite(), None, None, Arc::clone(&results), 2);

        let mut tests = Vec::new();
        for i in 0..3 {
            tests.push(TestEntry::new(format!("seq{i}"), body(|_| {})));
            let mut entry = TestEntry::new(format!("par{i}"), body(|_| {}));
            entry.parallel();
            tests.push(entry);
        }

        let children = launcher.launch(tests).await;
        assert_eq!(children.len(), 6);
        assert_eq!(results.len(), 6);
        assert!(results
            .get_all_test_results()
            .iter()
            .all(|r| r.status() == Status::Passed));
    }
}

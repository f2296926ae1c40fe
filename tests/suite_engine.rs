//! End-to-end behaviour of the suite engine through its public API

use parking_lot::Mutex;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use allure_suite::models::labels;
use allure_suite::results::SuiteReport;
use allure_suite::runner::{run_suite, RunnerConfig, SuiteRunner, TestContext, TestDef, TestSuite};
use allure_suite::{MimeType, Status, SuiteError};

#[tokio::test]
async fn every_registered_test_gets_a_result() {
    let mut runner = SuiteRunner::new("it", "Counting");
    runner.new_test("passes", |_| {}).unwrap();
    runner.new_test("fails", |t| t.errorf("nope")).unwrap();
    runner.new_test("panics", |_| {
        panic!("unexpected");
    })
    .unwrap();
    runner.new_test("skips", |t| {
        t.skip("later");
    })
    .unwrap()
    .parallel();
    runner.new_test("requires", |t| {
        t.require().is_true(false);
    })
    .unwrap()
    .parallel();

    let results = runner.run_tests().await;
    let all = results.get_all_test_results();
    assert_eq!(all.len(), 5);

    let status = |name: &str| results.get_result_by_name(name).unwrap().status();
    assert_eq!(status("passes"), Status::Passed);
    assert_eq!(status("fails"), Status::Failed);
    assert_eq!(status("panics"), Status::Failed);
    assert_eq!(status("skips"), Status::Skipped);
    assert_eq!(status("requires"), Status::Failed);

    let names: Vec<_> = all.iter().map(|r| r.name().to_string()).collect();
    assert_eq!(names, ["fails", "panics", "passes", "requires", "skips"]);
}

#[tokio::test]
async fn before_all_failure_runs_no_test_body() {
    let bodies = Arc::new(AtomicUsize::new(0));
    let mut runner = SuiteRunner::new("it", "BrokenSetup");
    runner.before_all(|_| {
        panic!("database unreachable");
    });

    for i in 0..3 {
        let bodies = Arc::clone(&bodies);
        let entry = runner
            .new_test(format!("t{i}"), move |_| {
                bodies.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        if i % 2 == 0 {
            entry.parallel();
        }
    }

    let results = runner.run_tests().await;
    assert_eq!(bodies.load(Ordering::SeqCst), 0);
    assert_eq!(results.len(), 3);
    assert!(results
        .get_all_test_results()
        .iter()
        .all(|r| r.status() == Status::Broken));

    let befores = results.container().befores;
    assert_eq!(befores.len(), 1);
    assert_eq!(befores[0].status, Status::Broken);
}

#[tokio::test]
async fn panicking_test_does_not_affect_sibling() {
    let mut runner = SuiteRunner::new("it", "Isolation").with_config(RunnerConfig {
        max_concurrent: 2,
    });
    runner
        .new_test("explodes", |_| {
            let empty: Vec<u8> = Vec::new();
            let _ = empty[3];
        })
        .unwrap()
        .parallel();
    runner
        .new_test("sibling", |t| {
            std::thread::sleep(Duration::from_millis(20));
            t.assert().equal(&2, &(1 + 1));
        })
        .unwrap()
        .parallel();

    let results = runner.run_tests().await;
    let exploded = results.get_result_by_name("explodes").unwrap();
    assert_eq!(exploded.status(), Status::Failed);
    assert!(exploded.result.message().unwrap().contains("index out of bounds"));
    assert_eq!(
        results.get_result_by_name("sibling").unwrap().status(),
        Status::Passed
    );
}

#[tokio::test]
async fn steps_route_to_their_phase_scope() {
    let mut runner = SuiteRunner::new("it", "Routing");
    runner.before_each(|t| t.new_step("prepare", vec![]));
    runner.new_test("work", |t| t.new_step("do work", vec![])).unwrap();

    let results = runner.run_tests().await;
    let record = results.get_result_by_name("work").unwrap();

    assert_eq!(record.container.befores.len(), 1);
    assert_eq!(record.container.befores[0].name, "prepare");
    assert!(record.container.afters.is_empty());
    assert_eq!(record.result.steps.len(), 1);
    assert_eq!(record.result.steps[0].name, "do work");
}

#[tokio::test]
async fn json_report_parses_back() {
    let mut runner = SuiteRunner::new("it", "Json");
    runner.new_test("ok", |_| {}).unwrap().tags(["smoke"]);
    runner.new_test("ko", |t| {
        t.assert().contains("abc", "z");
    })
    .unwrap();

    let results = runner.run_tests().await;
    let report = SuiteReport::from_json(&results.to_json().unwrap()).unwrap();

    assert_eq!(report.name, "Json");
    let parsed: Vec<_> = report
        .results
        .iter()
        .map(|r| (r.name().to_string(), r.status()))
        .collect();
    assert_eq!(
        parsed,
        [
            ("ko".to_string(), Status::Failed),
            ("ok".to_string(), Status::Passed)
        ]
    );
    assert_eq!(report.results[1].result.get_labels(labels::TAG), ["smoke"]);
    assert_eq!(report.container.children.len(), 2);
}

#[test]
fn report_is_not_available_before_the_run() {
    let results = allure_suite::SuiteResult::new("pending");
    assert!(matches!(results.to_json(), Err(SuiteError::NotFinished)));
}

#[derive(Default)]
struct SharedFieldSuite {
    value: AtomicI32,
}

impl SharedFieldSuite {
    fn reads_value(&self, t: &mut TestContext) {
        t.require().equal(&5, &self.value.load(Ordering::SeqCst));
    }
}

impl TestSuite for SharedFieldSuite {
    fn tests(&self) -> Vec<TestDef<Self>> {
        vec![TestDef::new("reads_value", Self::reads_value)]
    }

    fn before_all(&self, t: &mut TestContext) {
        self.value.store(5, Ordering::SeqCst);
        t.new_step("set value", vec![]);
    }
}

#[tokio::test]
async fn before_all_state_is_visible_to_tests() {
    let results = run_suite(SharedFieldSuite::default()).await.unwrap();

    let all = results.get_all_test_results();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status(), Status::Passed);

    let suite = results.container();
    assert_eq!(suite.befores.len(), 1);
    assert_eq!(suite.befores[0].name, "set value");
    assert_eq!(suite.children, vec![all[0].uuid()]);
}

#[tokio::test]
async fn after_each_attachment_lands_in_every_container() {
    let mut runner = SuiteRunner::new("it", "Attachments");
    runner.after_each(|t| t.with_new_attachment("log", MimeType::Text, t.name().to_string()));
    for name in ["first", "second"] {
        runner.new_test(name, |_| {}).unwrap();
    }

    let results = runner.run_tests().await;
    for record in results.get_all_test_results() {
        assert!(record.result.attachments.is_empty());
        assert_eq!(record.container.afters.len(), 1);
        let attachment = &record.container.afters[0].attachments[0];
        assert_eq!(attachment.name, "log");
        assert_eq!(attachment.content, record.name().as_bytes());
    }
}

#[tokio::test]
async fn parallel_tests_overlap_within_the_limit() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(Mutex::new(0usize));

    let mut runner = SuiteRunner::new("it", "Parallel").with_config(RunnerConfig {
        max_concurrent: 3,
    });
    for i in 0..6 {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        runner
            .new_test(format!("p{i}"), move |_| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                {
                    let mut peak = peak.lock();
                    *peak = (*peak).max(now);
                }
                std::thread::sleep(Duration::from_millis(50));
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap()
            .parallel();
    }

    let results = runner.run_tests().await;
    assert_eq!(results.summary().passed, 6);
    let peak = *peak.lock();
    assert!(peak > 1, "parallel tests never overlapped");
    assert!(peak <= 3, "concurrency limit exceeded: {peak}");
}

#[tokio::test]
async fn sequential_tests_keep_registration_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut runner = SuiteRunner::new("it", "Sequential");
    for name in ["zeta", "alpha", "mid"] {
        let order = Arc::clone(&order);
        runner
            .new_test(name, move |t| order.lock().push(t.name().to_string()))
            .unwrap();
    }

    runner.run_tests().await;
    assert_eq!(*order.lock(), ["zeta", "alpha", "mid"]);
}

#[test]
fn runs_on_a_plain_blocking_executor() {
    let results = tokio_test::block_on(async {
        let mut runner = SuiteRunner::new("it", "Blocking");
        runner.new_test("only", |t| t.new_step("hello", vec![])).unwrap();
        runner.run_tests().await
    });
    assert!(results.is_finished());
    assert_eq!(results.summary().total, 1);
}

#[tokio::test]
async fn finished_suite_writes_a_results_directory() {
    let mut runner = SuiteRunner::new("it", "Written");
    runner.after_each(|t| t.with_new_attachment("trace", MimeType::Text, "done"));
    runner.new_test("one", |_| {}).unwrap();
    runner.new_test("two", |t| t.errorf("broken math")).unwrap();
    let results = runner.run_tests().await;

    let dir = tempfile::tempdir().unwrap();
    let writer = allure_suite::results::ResultsWriter::new(dir.path());
    let stats = writer.write_suite(&results).unwrap();
    assert_eq!(stats.results, 2);
    assert_eq!(stats.containers, 3);
    assert_eq!(stats.attachments, 2);

    let loaded = allure_suite::results::load_results(dir.path()).unwrap();
    let statuses: Vec<_> = loaded.iter().map(|r| (r.name.as_str(), r.status)).collect();
    assert_eq!(statuses, [("one", Status::Passed), ("two", Status::Failed)]);
}

#[tokio::test]
async fn teardown_failures_stay_in_the_report() {
    let mut runner = SuiteRunner::new("it", "Teardown");
    runner.after_each(|t| t.fatal("connection leaked"));
    runner.after_all(|t| t.errorf("temp dir not removed"));
    runner.new_test("empty", |_| {}).unwrap();

    let results = runner.run_tests().await;
    let record = results.get_result_by_name("empty").unwrap();
    assert_eq!(record.status(), Status::Passed);

    let test_afters = &record.container.afters;
    assert_eq!(test_afters.len(), 1);
    assert_eq!(test_afters[0].status, Status::Failed);
    assert_eq!(
        test_afters[0].status_details.as_ref().unwrap().message,
        "connection leaked"
    );

    let suite_afters = results.container().afters;
    assert_eq!(suite_afters.len(), 1);
    assert_eq!(suite_afters[0].name, "AfterAll hook");
    assert_eq!(
        suite_afters[0].status_details.as_ref().unwrap().message,
        "temp dir not removed"
    );
}

#[tokio::test]
async fn nested_suite_carries_parent_label() {
    let mut runner = SuiteRunner::new("it", "Child").with_parent_suite("Parent");
    runner.new_test("labelled", |_| {}).unwrap();

    let results = runner.run_tests().await;
    let record = results.get_result_by_name("labelled").unwrap();
    assert_eq!(record.result.get_labels(labels::PARENT_SUITE), ["Parent"]);
    assert_eq!(record.result.get_labels(labels::SUITE), ["Child"]);
}

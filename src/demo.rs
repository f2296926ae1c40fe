//! Demonstration suites run by `allure-suite demo`

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use allure_suite::models::{MimeType, Parameter};
use allure_suite::results::SuiteResult;
use allure_suite::runner::{
    run_suite_with, RunnerConfig, SuiteRunner, TestContext, TestDef, TestSuite,
};

/// In-memory account store shared by the tests of [`AccountSuite`]
#[derive(Default)]
pub struct AccountSuite {
    balances: Mutex<HashMap<String, i64>>,
}

impl AccountSuite {
    fn balance(&self, name: &str) -> Option<i64> {
        self.balances.lock().get(name).copied()
    }

    fn test_open_account(&self, t: &mut TestContext) {
        t.epic("Accounts");
        t.feature("Opening");
        t.title("Open a new account");
        t.severity("critical");

        t.with_new_step("Open account for carol", |s| {
            s.with_parameters(vec![Parameter::new("owner", "carol")]);
            self.balances.lock().insert("carol".to_string(), 0);
            s.assert().is_some(&self.balance("carol"));
        });
        t.assert().equal(&Some(0), &self.balance("carol"));
    }

    fn test_transfer(&self, t: &mut TestContext) {
        t.epic("Accounts");
        t.feature("Transfers");
        t.description("Moves funds between two seeded accounts");

        t.with_new_step("Transfer 30 from alice to bob", |s| {
            let mut balances = self.balances.lock();
            for (owner, delta) in [("alice", -30), ("bob", 30)] {
                if let Some(balance) = balances.get_mut(owner) {
                    *balance += delta;
                }
            }
            s.new_step("Ledger updated", vec![Parameter::rendered("amount", &30)]);
        });
        t.require().equal(&Some(70), &self.balance("alice"));
        t.assert().equal(&Some(80), &self.balance("bob"));
    }

    fn test_overdraft_rejected(&self, t: &mut TestContext) {
        t.feature("Transfers");
        let requested = 500;
        let available = self.balance("alice").unwrap_or_default();
        t.with_new_attachment(
            "request",
            MimeType::Json,
            format!(r#"{{"from":"alice","amount":{requested}}}"#),
        );
        t.assert().less(&available, &requested);
    }

    fn test_statement_export(&self, t: &mut TestContext) {
        t.feature("Statements");
        t.skip("Statement export is not available in the demo store");
    }

    fn test_known_rounding_bug(&self, t: &mut TestContext) {
        t.feature("Interest");
        let interest = 100.0_f64 * 0.035;
        t.assert().equal(&"3.5".to_string(), &format!("{interest:.0}"));
    }
}

impl TestSuite for AccountSuite {
    fn suite_name(&self) -> String {
        "AccountSuite".to_string()
    }

    fn package_name(&self) -> String {
        "demo".to_string()
    }

    fn tests(&self) -> Vec<TestDef<Self>> {
        vec![
            TestDef::new("open_account", Self::test_open_account).allure_id("1001"),
            TestDef::new("transfer", Self::test_transfer)
                .allure_id("1002")
                .tags(["smoke", "money"]),
            TestDef::new("overdraft_rejected", Self::test_overdraft_rejected).tags(["money"]),
            TestDef::new("statement_export", Self::test_statement_export),
            TestDef::new("known_rounding_bug", Self::test_known_rounding_bug),
        ]
    }

    fn before_all(&self, t: &mut TestContext) {
        let mut balances = self.balances.lock();
        balances.insert("alice".to_string(), 100);
        balances.insert("bob".to_string(), 50);
        t.new_step(
            "Seed accounts",
            vec![
                Parameter::rendered("alice", &100),
                Parameter::rendered("bob", &50),
            ],
        );
    }

    fn after_each(&self, t: &mut TestContext) {
        let snapshot = format!("{:?}", self.balances.lock());
        t.with_new_attachment("balances", MimeType::Text, snapshot);
    }

    fn after_all(&self, t: &mut TestContext) {
        self.balances.lock().clear();
        t.new_step("Drop accounts", vec![]);
    }
}

/// A closure-registered suite with independent parallel checks
fn parsing_suite() -> allure_suite::Result<SuiteRunner> {
    let mut runner = SuiteRunner::new("demo", "ParsingSuite").with_parent_suite("Demo");

    runner.before_each(|t| {
        t.new_step("Reset parser", vec![]);
    });

    let cases = [
        ("parse_integer", "42", true),
        ("parse_negative", "-7", true),
        ("parse_garbage", "4x2", false),
    ];
    for (name, input, valid) in cases {
        runner
            .new_test(name, move |t| {
                t.tags(["parser"]);
                let parsed = input.parse::<i64>();
                if valid {
                    t.assert().is_ok(&parsed);
                } else {
                    t.assert().is_err(&parsed);
                }
            })?
            .parallel();
    }

    runner
        .new_test("parse_empty_panics", |t| {
            t.new_step("Parse empty input", vec![]);
            let digits: Vec<u32> = "".chars().filter_map(|c| c.to_digit(10)).collect();
            let first = digits[0];
            t.assert().equal(&0, &first);
        })?
        .parallel();

    Ok(runner)
}

/// Run every demonstration suite
pub async fn run_all(config: RunnerConfig) -> anyhow::Result<Vec<Arc<SuiteResult>>> {
    let accounts = run_suite_with(Arc::new(AccountSuite::default()), config.clone()).await?;
    let parsing = parsing_suite()?.with_config(config).run_tests().await;
    Ok(vec![accounts, parsing])
}

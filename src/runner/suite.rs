//! Table-driven suites
//!
//! A [`TestSuite`] lists its tests explicitly through [`TestSuite::tests`]
//! and overrides the hooks it needs. [`run_suite`] registers everything on a
//! [`SuiteRunner`] and runs it.

use std::sync::Arc;

use super::{RunnerConfig, SuiteRunner, TestContext};
use crate::error::Result;
use crate::results::SuiteResult;

/// Test method of a suite type
pub type TestFn<S> = fn(&S, &mut TestContext);

/// One row of a suite's registration table
pub struct TestDef<S> {
    name: String,
    body: TestFn<S>,
    tags: Vec<String>,
    parallel: bool,
    allure_id: Option<String>,
}

impl<S> TestDef<S> {
    pub fn new(name: impl Into<String>, body: TestFn<S>) -> Self {
        Self {
            name: name.into(),
            body,
            tags: Vec::new(),
            parallel: false,
            allure_id: None,
        }
    }

    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn allure_id(mut self, id: impl Into<String>) -> Self {
        self.allure_id = Some(id.into());
        self
    }
}

/// A suite type with its own state, hooks and test table
pub trait TestSuite: Send + Sync + Sized + 'static {
    /// Defaults to the type name
    fn suite_name(&self) -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_string()
    }

    /// Defaults to the module path of the type
    fn package_name(&self) -> String {
        let full = std::any::type_name::<Self>();
        match full.rsplit_once("::") {
            Some((package, _)) => package.to_string(),
            None => full.to_string(),
        }
    }

    fn tests(&self) -> Vec<TestDef<Self>>;

    fn before_all(&self, _t: &mut TestContext) {}

    fn after_all(&self, _t: &mut TestContext) {}

    fn before_each(&self, _t: &mut TestContext) {}

    fn after_each(&self, _t: &mut TestContext) {}
}

impl SuiteRunner {
    /// Build a runner from a suite's registration table
    pub fn from_suite<S: TestSuite>(suite: Arc<S>) -> Result<Self> {
        let mut runner = SuiteRunner::new(suite.package_name(), suite.suite_name());

        let s = Arc::clone(&suite);
        runner.before_all(move |t| s.before_all(t));
        let s = Arc::clone(&suite);
        runner.after_all(move |t| s.after_all(t));
        let s = Arc::clone(&suite);
        runner.before_each(move |t| s.before_each(t));
        let s = Arc::clone(&suite);
        runner.after_each(move |t| s.after_each(t));

        for def in suite.tests() {
            let s = Arc::clone(&suite);
            let body = def.body;
            let entry = runner.new_test(def.name, move |t| body(&s, t))?;
            entry.tags(def.tags);
            if def.parallel {
                entry.parallel();
            }
            if let Some(id) = def.allure_id {
                entry.allure_id(id);
            }
        }
        Ok(runner)
    }
}

/// Run a suite with the default runner configuration
pub async fn run_suite<S: TestSuite>(suite: S) -> Result<Arc<SuiteResult>> {
    run_suite_with(Arc::new(suite), RunnerConfig::default()).await
}

pub async fn run_suite_with<S: TestSuite>(
    suite: Arc<S>,
    config: RunnerConfig,
) -> Result<Arc<SuiteResult>> {
    let runner = SuiteRunner::from_suite(suite)?.with_config(config);
    Ok(runner.run_tests().await)
}

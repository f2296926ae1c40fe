//! Handle passed to hook and test bodies
//!
//! A [`TestContext`] wraps the execution context of the running phase plus
//! the metadata of the unit it belongs to. Bodies record through it; the
//! orchestrator dismantles it after the phase to take the report data back.

use std::sync::Arc;
use tracing::debug;

use super::outcome::{self, catch_phase, Caught, PhaseEnd};
use crate::asserts::{Asserts, Recorder};
use crate::context::{ExecutionContext, Phase};
use crate::models::{labels, Attachment, Label, MimeType, Parameter, Status, StatusDetails, Step};

/// Body of a test or hook
pub type TestBody = Arc<dyn Fn(&mut TestContext) + Send + Sync>;

/// Per-unit state that outlives a single phase
#[derive(Debug, Default)]
pub struct TestMeta {
    pub(crate) name: String,
    pub(crate) errors: Vec<String>,
    pub(crate) labels: Vec<Label>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
}

impl TestMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn error(&mut self, message: String) {
        debug!("{}: {}", self.name, message);
        self.errors.push(message);
    }
}

/// Recording handle for the running phase
pub struct TestContext {
    context: ExecutionContext,
    meta: TestMeta,
    phase_errors: usize,
}

impl TestContext {
    pub(crate) fn new(context: ExecutionContext, meta: TestMeta) -> Self {
        let phase_errors = meta.errors.len();
        Self {
            context,
            meta,
            phase_errors,
        }
    }

    pub(crate) fn into_parts(self) -> (ExecutionContext, TestMeta) {
        (self.context, self.meta)
    }

    /// Run one body under panic isolation and classify how it ended.
    pub(crate) fn run(&mut self, body: &TestBody) -> PhaseEnd {
        self.phase_errors = self.meta.errors.len();
        let body = &**body;
        let caught = catch_phase(|| body(self));
        let new_errors = &self.meta.errors[self.phase_errors..];

        let failure = || {
            if new_errors.is_empty() {
                StatusDetails::from_error(format!("{} stopped with fail_now", self.context.name()))
            } else {
                StatusDetails::from_error(new_errors.join("\n"))
            }
        };

        match caught {
            None if new_errors.is_empty() => PhaseEnd::Clean,
            None | Some(Caught::FailNow) => PhaseEnd::Failed(failure()),
            Some(Caught::Skip(reason)) => PhaseEnd::Skipped(reason),
            Some(Caught::Broken(reason)) => PhaseEnd::Broken(StatusDetails::from_error(reason)),
            Some(Caught::Panic(details)) => PhaseEnd::Panicked(details),
        }
    }

    /// Name of the test, or of the suite for suite-level hooks
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn phase(&self) -> Phase {
        self.context.name()
    }

    /// Whether the running phase recorded a failure so far
    pub fn failed(&self) -> bool {
        self.meta.errors.len() > self.phase_errors
    }

    pub fn step(&mut self, step: Step) {
        self.context.add_step(step);
    }

    pub fn new_step(&mut self, name: impl Into<String>, parameters: Vec<Parameter>) {
        self.context.add_step(Step::simple(name, parameters));
    }

    /// Record a step whose nested steps are produced by `f`
    pub fn with_new_step<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: FnOnce(&mut StepContext<'_>),
    {
        let (step, caught) = run_nested_step(&mut self.meta, name.into(), f);
        self.context.add_step(step);
        if let Some(caught) = caught {
            caught.resume();
        }
    }

    pub fn with_attachments(&mut self, attachments: Vec<Attachment>) {
        self.context.add_attachments(attachments);
    }

    pub fn with_new_attachment(
        &mut self,
        name: impl Into<String>,
        mime_type: MimeType,
        content: impl Into<Vec<u8>>,
    ) {
        self.context
            .add_attachments(vec![Attachment::new(name, mime_type, content)]);
    }

    /// Mark the unit failed and keep going
    pub fn errorf(&mut self, message: impl Into<String>) {
        self.meta.error(message.into());
    }

    /// Stop the unit as failed
    pub fn fail_now(&mut self) -> ! {
        outcome::fail_now()
    }

    /// Record `message` and stop the unit as failed
    pub fn fatal(&mut self, message: impl Into<String>) -> ! {
        self.meta.error(message.into());
        outcome::fail_now()
    }

    /// Stop the unit as skipped
    pub fn skip(&mut self, reason: impl Into<String>) -> ! {
        outcome::skip_now(reason.into())
    }

    /// Stop the unit as broken, for failures outside the code under test
    pub fn broken(&mut self, reason: impl Into<String>) -> ! {
        outcome::broken_now(reason.into())
    }

    pub fn assert(&mut self) -> Asserts<'_, Self> {
        Asserts::soft(self)
    }

    pub fn require(&mut self) -> Asserts<'_, Self> {
        Asserts::fatal(self)
    }

    pub fn label(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.meta.labels.push(Label::new(name, value));
    }

    pub fn tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.label(labels::TAG, tag);
        }
    }

    pub fn epic(&mut self, value: impl Into<String>) {
        self.label(labels::EPIC, value);
    }

    pub fn feature(&mut self, value: impl Into<String>) {
        self.label(labels::FEATURE, value);
    }

    pub fn story(&mut self, value: impl Into<String>) {
        self.label(labels::STORY, value);
    }

    pub fn severity(&mut self, value: impl Into<String>) {
        self.label(labels::SEVERITY, value);
    }

    pub fn owner(&mut self, value: impl Into<String>) {
        self.label(labels::OWNER, value);
    }

    pub fn allure_id(&mut self, value: impl Into<String>) {
        self.label(labels::ALLURE_ID, value);
    }

    /// Display name of the result; lookups still use the registered name.
    pub fn title(&mut self, value: impl Into<String>) {
        self.meta.title = Some(value.into());
    }

    pub fn description(&mut self, value: impl Into<String>) {
        self.meta.description = Some(value.into());
    }
}

impl Recorder for TestContext {
    fn step(&mut self, step: Step) {
        TestContext::step(self, step);
    }

    fn errorf(&mut self, message: String) {
        self.meta.error(message);
    }

    fn fail_now(&mut self) -> ! {
        outcome::fail_now()
    }
}

/// Recording handle inside a [`TestContext::with_new_step`] block
pub struct StepContext<'m> {
    step: Step,
    failed: bool,
    meta: &'m mut TestMeta,
}

impl StepContext<'_> {
    pub fn name(&self) -> &str {
        &self.step.name
    }

    pub fn step(&mut self, step: Step) {
        self.step.add_step(step);
    }

    pub fn new_step(&mut self, name: impl Into<String>, parameters: Vec<Parameter>) {
        self.step.add_step(Step::simple(name, parameters));
    }

    pub fn with_new_step<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: FnOnce(&mut StepContext<'_>),
    {
        let (step, caught) = run_nested_step(self.meta, name.into(), f);
        if !step.is_passed() {
            self.failed = true;
        }
        self.step.add_step(step);
        if let Some(caught) = caught {
            caught.resume();
        }
    }

    pub fn with_parameters(&mut self, parameters: Vec<Parameter>) {
        self.step.parameters.extend(parameters);
    }

    pub fn with_attachments(&mut self, attachments: Vec<Attachment>) {
        self.step.attachments.extend(attachments);
    }

    pub fn with_new_attachment(
        &mut self,
        name: impl Into<String>,
        mime_type: MimeType,
        content: impl Into<Vec<u8>>,
    ) {
        self.step
            .attachments
            .push(Attachment::new(name, mime_type, content));
    }

    pub fn errorf(&mut self, message: impl Into<String>) {
        self.failed = true;
        self.meta.error(message.into());
    }

    pub fn assert(&mut self) -> Asserts<'_, Self> {
        Asserts::soft(self)
    }

    pub fn require(&mut self) -> Asserts<'_, Self> {
        Asserts::fatal(self)
    }
}

impl Recorder for StepContext<'_> {
    fn step(&mut self, step: Step) {
        StepContext::step(self, step);
    }

    fn errorf(&mut self, message: String) {
        StepContext::errorf(self, message);
    }

    fn fail_now(&mut self) -> ! {
        outcome::fail_now()
    }
}

/// Run a step block, returning the finished step and any interruption that
/// must keep unwinding once the step is recorded.
fn run_nested_step<F>(meta: &mut TestMeta, name: String, f: F) -> (Step, Option<Caught>)
where
    F: FnOnce(&mut StepContext<'_>),
{
    let mut ctx = StepContext {
        step: Step::new(name),
        failed: false,
        meta,
    };
    let caught = catch_phase(|| f(&mut ctx));

    let StepContext {
        mut step, failed, ..
    } = ctx;

    let status = match &caught {
        Some(caught) => caught.step_status(),
        None if failed => Status::Failed,
        None => Status::Passed,
    };
    step.finish(status);

    if let Some(Caught::Panic(details)) = &caught {
        step.status_details = Some(details.clone());
    }
    (step, caught)
}

//! Execution context routing
//!
//! An [`ExecutionContext`] is built for exactly one phase of one unit of
//! execution. It owns the append target of that phase (the test result, or
//! the container collecting hook output) and decides where recorded steps and
//! attachments go. The orchestrator builds a new context before every hook or
//! test invocation and takes the target back out afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SuiteError};
use crate::models::{Attachment, Container, Step, TestResult};

/// Lifecycle phase of a suite
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    BeforeAll,
    BeforeEach,
    Test,
    AfterEach,
    AfterAll,
}

impl Phase {
    pub fn all() -> [Phase; 5] {
        [
            Phase::BeforeAll,
            Phase::BeforeEach,
            Phase::Test,
            Phase::AfterEach,
            Phase::AfterAll,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::BeforeAll => "BeforeAll",
            Phase::BeforeEach => "BeforeEach",
            Phase::Test => "Test",
            Phase::AfterEach => "AfterEach",
            Phase::AfterAll => "AfterAll",
        }
    }

    /// Phases whose output lands in a container's befores
    pub fn is_setup(&self) -> bool {
        matches!(self, Phase::BeforeAll | Phase::BeforeEach)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Phase {
    type Err = SuiteError;

    /// Accepts `BeforeEach`, `beforeEach`, `before_each` and `before-each`.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "beforeall" => Ok(Phase::BeforeAll),
            "beforeeach" => Ok(Phase::BeforeEach),
            "test" => Ok(Phase::Test),
            "aftereach" => Ok(Phase::AfterEach),
            "afterall" => Ok(Phase::AfterAll),
            _ => Err(SuiteError::UnknownPhase(s.to_string())),
        }
    }
}

#[derive(Debug)]
enum Target {
    Result(Box<TestResult>),
    Container(Container),
}

/// Routes recordings of the active phase to its append target
#[derive(Debug)]
pub struct ExecutionContext {
    phase: Phase,
    target: Target,
}

impl ExecutionContext {
    /// Context of a test body, appending to the test's own result
    pub fn test(result: TestResult) -> Self {
        Self {
            phase: Phase::Test,
            target: Target::Result(Box::new(result)),
        }
    }

    /// Context of a hook, appending to `container`
    pub fn hook(phase: Phase, container: Container) -> Result<Self> {
        if phase == Phase::Test {
            return Err(SuiteError::WrongContext {
                expected: "hook context",
                actual: phase,
            });
        }
        Ok(Self {
            phase,
            target: Target::Container(container),
        })
    }

    pub fn before_all(container: Container) -> Self {
        Self {
            phase: Phase::BeforeAll,
            target: Target::Container(container),
        }
    }

    pub fn after_all(container: Container) -> Self {
        Self {
            phase: Phase::AfterAll,
            target: Target::Container(container),
        }
    }

    pub fn before_each(container: Container) -> Self {
        Self {
            phase: Phase::BeforeEach,
            target: Target::Container(container),
        }
    }

    pub fn after_each(container: Container) -> Self {
        Self {
            phase: Phase::AfterEach,
            target: Target::Container(container),
        }
    }

    /// Active phase, used by callers to pick a failure policy
    pub fn name(&self) -> Phase {
        self.phase
    }

    /// Append a step to the scope of the active phase
    pub fn add_step(&mut self, step: Step) {
        self.scope_steps().push(step);
    }

    /// Append attachments to the most recent step of the active scope.
    ///
    /// With no step yet, test attachments go to the result itself and hook
    /// attachments get a step of their own, since a container has no
    /// attachment list.
    pub fn add_attachments(&mut self, attachments: Vec<Attachment>) {
        for attachment in attachments {
            if let Target::Result(result) = &mut self.target {
                if result.steps.is_empty() {
                    result.attachments.push(attachment);
                    continue;
                }
            }

            let steps = self.scope_steps();
            match steps.last_mut() {
                Some(step) => step.attachments.push(attachment),
                None => steps.push(Step::new(attachment.name.clone()).with_attachment(attachment)),
            }
        }
    }

    /// Steps recorded so far in the active scope
    pub fn steps(&self) -> &[Step] {
        match &self.target {
            Target::Result(result) => &result.steps,
            Target::Container(container) if self.phase.is_setup() => &container.befores,
            Target::Container(container) => &container.afters,
        }
    }

    /// Take the test result back out of a test context
    pub fn into_result(self) -> Result<TestResult> {
        match self.target {
            Target::Result(result) => Ok(*result),
            Target::Container(_) => Err(SuiteError::WrongContext {
                expected: "test result",
                actual: self.phase,
            }),
        }
    }

    /// Take the container back out of a hook context
    pub fn into_container(self) -> Result<Container> {
        match self.target {
            Target::Container(container) => Ok(container),
            Target::Result(_) => Err(SuiteError::WrongContext {
                expected: "container",
                actual: self.phase,
            }),
        }
    }

    fn scope_steps(&mut self) -> &mut Vec<Step> {
        let setup = self.phase.is_setup();
        match &mut self.target {
            Target::Result(result) => &mut result.steps,
            Target::Container(container) => {
                if setup {
                    &mut container.befores
                } else {
                    &mut container.afters
                }
            }
        }
    }
}

//! Error types for the suite engine
//!
//! Assertion failures and panics inside user code are never surfaced through
//! these errors; they are contained and recorded in the report. `SuiteError`
//! covers programmer mistakes and report serialization.

use thiserror::Error;

use crate::context::Phase;

/// Suite engine errors
#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Unknown execution phase: {0}")]
    UnknownPhase(String),

    #[error("Test '{0}' is already registered in this suite")]
    DuplicateTest(String),

    #[error("Suite result requested before the run finished")]
    NotFinished,

    #[error("Execution context for {actual} cannot be used as {expected}")]
    WrongContext { expected: &'static str, actual: Phase },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SuiteError>;

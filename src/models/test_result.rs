//! Test result models
//!
//! Defines the per-test result record, its status and labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::step::{Attachment, Step};
use crate::utils::timer::now_millis;

/// Longest status message kept on a result; the full text goes to the trace.
const SHORT_MESSAGE_LEN: usize = 100;

/// Well-known label names
pub mod labels {
    pub const SUITE: &str = "suite";
    pub const PARENT_SUITE: &str = "parentSuite";
    pub const PACKAGE: &str = "package";
    pub const TAG: &str = "tag";
    pub const ALLURE_ID: &str = "AS_ID";
    pub const EPIC: &str = "epic";
    pub const FEATURE: &str = "feature";
    pub const STORY: &str = "story";
    pub const SEVERITY: &str = "severity";
    pub const OWNER: &str = "owner";
    pub const FRAMEWORK: &str = "framework";
    pub const LANGUAGE: &str = "language";
}

/// Execution status of a test or step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Passed,
    Failed,
    Broken,
    Skipped,
}

impl Status {
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Passed => "✓",
            Status::Failed => "✗",
            Status::Broken => "!",
            Status::Skipped => "○",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Passed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Passed => write!(f, "PASSED"),
            Status::Failed => write!(f, "FAILED"),
            Status::Broken => write!(f, "BROKEN"),
            Status::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Short message plus full trace explaining a non-passed status
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trace: String,
}

impl StatusDetails {
    /// Build details from a full error text, shortening the message.
    pub fn from_error(text: impl Into<String>) -> Self {
        let trace = text.into();
        let message = trace.chars().take(SHORT_MESSAGE_LEN).collect();
        Self { message, trace }
    }

    pub fn with_trace(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: trace.into(),
        }
    }
}

/// Name/value label attached to a result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Recorded outcome and step history of one test
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub uuid: Uuid,
    pub history_id: String,
    pub name: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    pub start: i64,
    pub stop: i64,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl TestResult {
    /// Create a pending result for a registered test
    pub fn new(name: impl Into<String>, full_name: impl Into<String>) -> Self {
        let name = name.into();
        let full_name = full_name.into();
        let history_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, full_name.as_bytes())
            .simple()
            .to_string();

        Self {
            uuid: Uuid::new_v4(),
            history_id,
            name,
            full_name,
            description: None,
            status: Status::Passed,
            status_details: None,
            start: 0,
            stop: 0,
            steps: Vec::new(),
            attachments: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push(Label::new(name, value));
        self
    }

    pub fn add_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    /// Values of every label with the given name, in insertion order
    pub fn get_labels(&self, name: &str) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|l| l.name == name)
            .map(|l| l.value.as_str())
            .collect()
    }

    pub fn begin(&mut self) {
        self.start = now_millis();
    }

    /// Freeze the result with its final status.
    pub fn finish(&mut self, status: Status, details: Option<StatusDetails>) {
        if self.start == 0 {
            self.start = now_millis();
        }
        self.stop = now_millis();
        self.status = status;
        self.status_details = details;
    }

    pub fn duration_ms(&self) -> u64 {
        (self.stop - self.start).max(0) as u64
    }

    pub fn message(&self) -> Option<&str> {
        self.status_details.as_ref().map(|d| d.message.as_str())
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.name,
            self.duration_ms()
        )?;
        if let Some(msg) = self.message() {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_names() {
        let json = serde_json::to_string(&Status::Broken).unwrap();
        assert_eq!(json, "\"broken\"");
        let parsed: Status = serde_json::from_str("\"skipped\"").unwrap();
        assert_eq!(parsed, Status::Skipped);
    }

    #[test]
    fn test_history_id_is_stable_per_full_name() {
        let a = TestResult::new("login", "auth/AuthSuite/login");
        let b = TestResult::new("login", "auth/AuthSuite/login");
        assert_eq!(a.history_id, b.history_id);
        assert_ne!(a.uuid, b.uuid);
    }

    #[test]
    fn test_get_labels() {
        let result = TestResult::new("t", "s/t")
            .with_label(labels::TAG, "smoke")
            .with_label(labels::SUITE, "s")
            .with_label(labels::TAG, "fast");

        assert_eq!(result.get_labels(labels::TAG), vec!["smoke", "fast"]);
        assert!(result.get_labels(labels::EPIC).is_empty());
    }

    #[test]
    fn test_status_details_shortens_message() {
        let long = "x".repeat(250);
        let details = StatusDetails::from_error(long.clone());
        assert_eq!(details.message.len(), 100);
        assert_eq!(details.trace, long);
    }

    #[test]
    fn test_finish_sets_timestamps() {
        let mut result = TestResult::new("t", "s/t");
        result.finish(Status::Failed, Some(StatusDetails::from_error("boom")));
        assert!(result.start > 0);
        assert!(result.stop >= result.start);
        assert_eq!(result.message(), Some("boom"));
    }
}

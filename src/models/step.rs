//! Step, parameter and attachment records

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

use super::test_result::{Status, StatusDetails};
use crate::utils::timer::now_millis;

/// Render a value for display in a step parameter.
pub fn render<V: Debug + ?Sized>(value: &V) -> String {
    format!("{value:?}")
}

/// Name/value pair shown on a step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parameter whose value is the rendered form of `value`
    pub fn rendered<V: Debug + ?Sized>(name: impl Into<String>, value: &V) -> Self {
        Self::new(name, render(value))
    }
}

/// Attachment content type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MimeType {
    #[serde(rename = "text/plain")]
    Text,
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "text/html")]
    Html,
    #[serde(rename = "application/xml")]
    Xml,
    #[serde(rename = "text/csv")]
    Csv,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
}

impl MimeType {
    pub fn extension(&self) -> &'static str {
        match self {
            MimeType::Text => "txt",
            MimeType::Json => "json",
            MimeType::Html => "html",
            MimeType::Xml => "xml",
            MimeType::Csv => "csv",
            MimeType::Png => "png",
            MimeType::Jpeg => "jpg",
        }
    }
}

/// Named blob recorded alongside a step or result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: MimeType,
    /// File name the content is written under in the results directory
    pub source: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, mime_type: MimeType, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime_type,
            source: format!("{}-attachment.{}", Uuid::new_v4(), mime_type.extension()),
            content: content.into(),
        }
    }

    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name, MimeType::Text, content.into().into_bytes())
    }
}

/// A single recorded verification or note
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub start: i64,
    pub stop: i64,
}

impl Step {
    /// A passed step starting now
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            name: name.into(),
            status: Status::Passed,
            status_details: None,
            parameters: Vec::new(),
            steps: Vec::new(),
            attachments: Vec::new(),
            start: now,
            stop: now,
        }
    }

    /// A finished passed step with parameters
    pub fn simple(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self::new(name).with_parameters(parameters)
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_details(mut self, details: StatusDetails) -> Self {
        self.status_details = Some(details);
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn finish(&mut self, status: Status) {
        self.stop = now_millis();
        self.status = status;
    }

    pub fn is_passed(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_uses_debug() {
        assert_eq!(render(&1), "1");
        assert_eq!(render("abc"), "\"abc\"");
        assert_eq!(render(&Some(vec![1, 2])), "Some([1, 2])");
    }

    #[test]
    fn test_attachment_source_uses_extension() {
        let a = Attachment::new("payload", MimeType::Json, b"{}".to_vec());
        assert!(a.source.ends_with("-attachment.json"));
        let b = Attachment::text("log", "line");
        assert_ne!(a.source, b.source);
        assert_eq!(b.content, b"line");
    }

    #[test]
    fn test_attachment_content_not_serialized() {
        let a = Attachment::text("log", "secret body");
        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains("\"type\":\"text/plain\""));
        assert!(!json.contains("secret body"));
    }

    #[test]
    fn test_step_builders() {
        let step = Step::simple("check", vec![Parameter::rendered("Expected", &5)])
            .with_status(Status::Failed)
            .with_attachment(Attachment::text("note", "n"));

        assert_eq!(step.parameters[0].value, "5");
        assert!(!step.is_passed());
        assert_eq!(step.attachments.len(), 1);
    }
}

//! Report data models
//!
//! Steps, attachments, containers and per-test results that make up the
//! execution report.

mod container;
mod step;
mod test_result;

pub use container::Container;
pub use step::{render, Attachment, MimeType, Parameter, Step};
pub use test_result::{labels, Label, Status, StatusDetails, TestResult};

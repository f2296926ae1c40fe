//! Assertion helpers
//!
//! Every check records one step named `ASSERT: <Check>` or `REQUIRE: <Check>`
//! with the rendered operands as parameters. A failed `ASSERT` marks the unit
//! failed and carries on; a failed `REQUIRE` stops the unit immediately.

use std::fmt::Debug;

use crate::models::{render, Parameter, Status, StatusDetails, Step};

/// Sink for assertion output
pub trait Recorder {
    /// Record a finished step in the current scope
    fn step(&mut self, step: Step);

    /// Mark the current unit failed without stopping it
    fn errorf(&mut self, message: String);

    /// Stop the current unit as failed
    fn fail_now(&mut self) -> !;
}

/// Assertion set bound to a recorder
pub struct Asserts<'r, R: Recorder + ?Sized> {
    recorder: &'r mut R,
    fatal: bool,
}

impl<'r, R: Recorder + ?Sized> Asserts<'r, R> {
    /// Non-fatal assertions
    pub fn soft(recorder: &'r mut R) -> Self {
        Self {
            recorder,
            fatal: false,
        }
    }

    /// Assertions that stop the unit on failure
    pub fn fatal(recorder: &'r mut R) -> Self {
        Self {
            recorder,
            fatal: true,
        }
    }

    fn prefix(&self) -> &'static str {
        if self.fatal {
            "REQUIRE"
        } else {
            "ASSERT"
        }
    }

    fn check(
        &mut self,
        check: &str,
        passed: bool,
        parameters: Vec<Parameter>,
        message: impl FnOnce() -> String,
    ) -> bool {
        let name = format!("{}: {}", self.prefix(), check);

        if passed {
            self.recorder.step(Step::simple(name, parameters));
            return true;
        }

        let message = message();
        let step = Step::simple(name, parameters)
            .with_status(Status::Failed)
            .with_details(StatusDetails::from_error(message.clone()));
        self.recorder.step(step);
        self.recorder.errorf(message);

        if self.fatal {
            self.recorder.fail_now();
        }
        false
    }

    pub fn equal<T: PartialEq + Debug + ?Sized>(&mut self, expected: &T, actual: &T) -> bool {
        self.check(
            "Equal",
            expected == actual,
            vec![
                Parameter::rendered("Expected", expected),
                Parameter::rendered("Actual", actual),
            ],
            || {
                format!(
                    "Not equal:\nexpected: {}\nactual  : {}",
                    render(expected),
                    render(actual)
                )
            },
        )
    }

    pub fn not_equal<T: PartialEq + Debug + ?Sized>(&mut self, expected: &T, actual: &T) -> bool {
        self.check(
            "Not Equal",
            expected != actual,
            vec![
                Parameter::rendered("Expected", expected),
                Parameter::rendered("Actual", actual),
            ],
            || format!("Should not be: {}", render(actual)),
        )
    }

    pub fn is_true(&mut self, value: bool) -> bool {
        self.check(
            "True",
            value,
            vec![Parameter::rendered("Actual", &value)],
            || "Should be true".to_string(),
        )
    }

    pub fn is_false(&mut self, value: bool) -> bool {
        self.check(
            "False",
            !value,
            vec![Parameter::rendered("Actual", &value)],
            || "Should be false".to_string(),
        )
    }

    /// Substring check
    pub fn contains(&mut self, target: &str, element: &str) -> bool {
        self.check(
            "Contains",
            target.contains(element),
            vec![
                Parameter::rendered("Target", target),
                Parameter::rendered("Element", element),
            ],
            || format!("{} does not contain {}", render(target), render(element)),
        )
    }

    /// Membership check over a slice
    pub fn contains_item<T: PartialEq + Debug>(&mut self, items: &[T], item: &T) -> bool {
        self.check(
            "Contains",
            items.contains(item),
            vec![
                Parameter::rendered("Target", items),
                Parameter::rendered("Element", item),
            ],
            || format!("{} does not contain {}", render(items), render(item)),
        )
    }

    pub fn greater<T: PartialOrd + Debug + ?Sized>(&mut self, first: &T, second: &T) -> bool {
        self.check(
            "Greater",
            first > second,
            vec![
                Parameter::rendered("First", first),
                Parameter::rendered("Second", second),
            ],
            || format!("{} is not greater than {}", render(first), render(second)),
        )
    }

    pub fn less<T: PartialOrd + Debug + ?Sized>(&mut self, first: &T, second: &T) -> bool {
        self.check(
            "Less",
            first < second,
            vec![
                Parameter::rendered("First", first),
                Parameter::rendered("Second", second),
            ],
            || format!("{} is not less than {}", render(first), render(second)),
        )
    }

    pub fn len<T: Debug>(&mut self, items: &[T], expected: usize) -> bool {
        self.check(
            "Len",
            items.len() == expected,
            vec![
                Parameter::rendered("Expected", &expected),
                Parameter::rendered("Actual", &items.len()),
            ],
            || {
                format!(
                    "{} should have {} item(s), but has {}",
                    render(items),
                    expected,
                    items.len()
                )
            },
        )
    }

    pub fn is_some<T: Debug>(&mut self, value: &Option<T>) -> bool {
        self.check(
            "Some",
            value.is_some(),
            vec![Parameter::rendered("Actual", value)],
            || "Expected Some, got None".to_string(),
        )
    }

    pub fn is_none<T: Debug>(&mut self, value: &Option<T>) -> bool {
        self.check(
            "None",
            value.is_none(),
            vec![Parameter::rendered("Actual", value)],
            || format!("Expected None, got {}", render(value)),
        )
    }

    pub fn is_ok<T: Debug, E: Debug>(&mut self, value: &Result<T, E>) -> bool {
        self.check(
            "Ok",
            value.is_ok(),
            vec![Parameter::rendered("Actual", value)],
            || format!("Received unexpected error: {}", render(value)),
        )
    }

    pub fn is_err<T: Debug, E: Debug>(&mut self, value: &Result<T, E>) -> bool {
        self.check(
            "Error",
            value.is_err(),
            vec![Parameter::rendered("Actual", value)],
            || format!("An error is expected but got {}", render(value)),
        )
    }
}

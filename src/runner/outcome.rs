//! Phase and unit outcomes
//!
//! User code stops a unit early by unwinding with an [`Interrupt`] payload.
//! Every phase runs under [`catch_phase`], which turns that payload, or any
//! other panic, into a typed value at the phase boundary.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use crate::models::{Status, StatusDetails};

/// Unwind payloads raised by the framework itself
#[derive(Debug)]
pub(crate) enum Interrupt {
    FailNow,
    Skip(String),
    Broken(String),
    /// A panic already caught by a nested step, re-raised with its trace
    Rethrown(StatusDetails),
}

/// Stop the current unit as failed.
pub(crate) fn fail_now() -> ! {
    panic::resume_unwind(Box::new(Interrupt::FailNow))
}

/// Stop the current unit as skipped.
pub(crate) fn skip_now(reason: String) -> ! {
    panic::resume_unwind(Box::new(Interrupt::Skip(reason)))
}

/// Stop the current unit as broken.
pub(crate) fn broken_now(reason: String) -> ! {
    panic::resume_unwind(Box::new(Interrupt::Broken(reason)))
}

/// What stopped a phase before it returned normally
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Caught {
    FailNow,
    Skip(String),
    Broken(String),
    Panic(StatusDetails),
}

impl Caught {
    /// Status a step gets when this interruption passes through it
    pub(crate) fn step_status(&self) -> Status {
        match self {
            Caught::FailNow => Status::Failed,
            Caught::Skip(_) => Status::Skipped,
            Caught::Broken(_) | Caught::Panic(_) => Status::Broken,
        }
    }

    /// Continue unwinding towards the enclosing phase boundary.
    pub(crate) fn resume(self) -> ! {
        match self {
            Caught::FailNow => fail_now(),
            Caught::Skip(reason) => skip_now(reason),
            Caught::Broken(reason) => broken_now(reason),
            Caught::Panic(details) => panic::resume_unwind(Box::new(Interrupt::Rethrown(details))),
        }
    }
}

/// How one phase of a unit ended, after combining recorded failures
#[derive(Clone, Debug, PartialEq)]
pub enum PhaseEnd {
    Clean,
    Failed(StatusDetails),
    Skipped(String),
    Broken(StatusDetails),
    Panicked(StatusDetails),
}

impl PhaseEnd {
    pub fn is_clean(&self) -> bool {
        matches!(self, PhaseEnd::Clean)
    }

    pub fn details(&self) -> Option<StatusDetails> {
        match self {
            PhaseEnd::Clean => None,
            PhaseEnd::Failed(details) | PhaseEnd::Broken(details) | PhaseEnd::Panicked(details) => {
                Some(details.clone())
            }
            PhaseEnd::Skipped(reason) => Some(StatusDetails::from_error(reason.clone())),
        }
    }

    /// Status of the step that records this ending in a hook scope
    pub fn status(&self) -> Status {
        match self {
            PhaseEnd::Clean => Status::Passed,
            PhaseEnd::Failed(_) => Status::Failed,
            PhaseEnd::Skipped(_) => Status::Skipped,
            PhaseEnd::Broken(_) | PhaseEnd::Panicked(_) => Status::Broken,
        }
    }
}

/// Final outcome of a test unit
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Passed,
    Failed(StatusDetails),
    Broken(StatusDetails),
    Skipped(StatusDetails),
}

impl Outcome {
    pub fn status(&self) -> Status {
        match self {
            Outcome::Passed => Status::Passed,
            Outcome::Failed(_) => Status::Failed,
            Outcome::Broken(_) => Status::Broken,
            Outcome::Skipped(_) => Status::Skipped,
        }
    }

    pub fn into_parts(self) -> (Status, Option<StatusDetails>) {
        let status = self.status();
        match self {
            Outcome::Passed => (status, None),
            Outcome::Failed(d) | Outcome::Broken(d) | Outcome::Skipped(d) => (status, Some(d)),
        }
    }
}

thread_local! {
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chain a panic hook that remembers where the last panic on this thread
/// happened, so the trace can be attached to the result.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let mut trace = match info.location() {
                Some(location) => format!("panicked at {location}"),
                None => "panicked".to_string(),
            };
            let backtrace = Backtrace::capture();
            if backtrace.status() == BacktraceStatus::Captured {
                trace.push('\n');
                trace.push_str(&backtrace.to_string());
            }
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn take_last_panic() -> Option<String> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(non-string panic)".to_string()
    }
}

/// Run `f`, converting any unwind into a [`Caught`] value.
pub(crate) fn catch_phase<F: FnOnce()>(f: F) -> Option<Caught> {
    install_panic_hook();
    take_last_panic();

    let payload = panic::catch_unwind(AssertUnwindSafe(f)).err()?;

    let payload = match payload.downcast::<Interrupt>() {
        Ok(interrupt) => {
            return Some(match *interrupt {
                Interrupt::FailNow => Caught::FailNow,
                Interrupt::Skip(reason) => Caught::Skip(reason),
                Interrupt::Broken(reason) => Caught::Broken(reason),
                Interrupt::Rethrown(details) => Caught::Panic(details),
            })
        }
        Err(payload) => payload,
    };

    let message = panic_message(payload.as_ref());
    let trace = match take_last_panic() {
        Some(location) => format!("{message}\n{location}"),
        None => message.clone(),
    };
    Some(Caught::Panic(StatusDetails::with_trace(message, trace)))
}

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Write as _;
use std::panic::PanicHookInfo;
use tracing::Level;

/// Report a panic as a `tracing` error event.
///
/// Falls back to stderr when no subscriber is interested in `ERROR` events,
/// e.g. before logging is initialized.
pub fn tracing_panic_hook(panic_info: &PanicHookInfo) {
    let payload = payload_str(panic_info.payload());
    let location = panic_info.location().map(ToString::to_string);
    let backtrace = Backtrace::capture();
    let backtrace = (backtrace.status() == BacktraceStatus::Captured).then_some(backtrace);
    if tracing::enabled!(Level::ERROR) {
        if let Some(backtrace) = backtrace {
            tracing::error!(
                panic.payload = payload,
                panic.location = location,
                "A panic occurred: {backtrace}"
            );
        } else {
            tracing::error!(
                panic.payload = payload,
                panic.location = location,
                "A panic occurred"
            );
        }
    } else {
        eprintln!(
            "{}",
            render(payload, location.as_deref(), backtrace.as_ref())
        );
    }
}

fn payload_str(payload: &(dyn Any + Send)) -> Option<&str> {
    if let Some(s) = payload.downcast_ref::<&str>() {
        Some(s)
    } else {
        payload.downcast_ref::<String>().map(String::as_str)
    }
}

fn render(payload: Option<&str>, location: Option<&str>, backtrace: Option<&Backtrace>) -> String {
    let mut msg = String::from("A panic occurred");
    if let Some(location) = location {
        let _ = write!(msg, " at {location}");
    }
    if let Some(payload) = payload {
        let _ = write!(msg, ": {payload}");
    }
    if let Some(backtrace) = backtrace {
        let _ = write!(msg, "\n{backtrace}");
    }
    msg
}

#![deny(missing_docs)]
//! Logging for the reply-assist workspace.
//!
//! Every crate logs through the `assist_*` macros. While a reconciliation
//! pass is running on the current thread its lines carry a `[pass N]`
//! prefix, so the lines of one pass can be pulled out of a busy log.

use std::cell::Cell;

#[doc(hidden)]
pub use log;

thread_local! {
    static PASS_ID: Cell<u64> = const { Cell::new(0) };
}

/// Marks the current thread as running pass `pass` until dropped.
///
/// Scopes nest: dropping restores whatever pass was active before.
#[must_use = "the pass id is cleared again when the scope is dropped"]
pub struct PassScope {
    previous: u64,
}

/// Enters the scope of reconciliation pass `pass`.
pub fn enter_pass(pass: u64) -> PassScope {
    PassScope {
        previous: PASS_ID.with(|v| v.replace(pass)),
    }
}

impl Drop for PassScope {
    fn drop(&mut self) {
        PASS_ID.with(|v| v.set(self.previous));
    }
}

/// The pass running on this thread, or 0 outside of any pass.
pub fn current_pass_id() -> u64 {
    PASS_ID.with(|v| v.get())
}

#[doc(hidden)]
#[macro_export]
macro_rules! __assist_log {
    ($level:expr, $($arg:tt)*) => {{
        match $crate::current_pass_id() {
            0 => $crate::log::log!($level, $($arg)*),
            pass => $crate::log::log!($level, "[pass {}] {}", pass, format_args!($($arg)*)),
        }
    }};
}

/// Logs at trace level.
#[macro_export]
macro_rules! assist_trace {
    ($($arg:tt)*) => { $crate::__assist_log!($crate::log::Level::Trace, $($arg)*) };
}

/// Logs at debug level.
#[macro_export]
macro_rules! assist_debug {
    ($($arg:tt)*) => { $crate::__assist_log!($crate::log::Level::Debug, $($arg)*) };
}

/// Logs at info level.
#[macro_export]
macro_rules! assist_info {
    ($($arg:tt)*) => { $crate::__assist_log!($crate::log::Level::Info, $($arg)*) };
}

/// Logs at warn level.
#[macro_export]
macro_rules! assist_warn {
    ($($arg:tt)*) => { $crate::__assist_log!($crate::log::Level::Warn, $($arg)*) };
}

/// Logs at error level.
#[macro_export]
macro_rules! assist_error {
    ($($arg:tt)*) => { $crate::__assist_log!($crate::log::Level::Error, $($arg)*) };
}

/// Installs a terminal logger for tests; a second call is a no-op.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Never);
}

#[cfg(test)]
mod tests {
    use super::{current_pass_id, enter_pass};

    #[test]
    fn scopes_nest_and_restore() {
        assert_eq!(current_pass_id(), 0);
        {
            let _outer = enter_pass(3);
            {
                let _inner = enter_pass(4);
                assert_eq!(current_pass_id(), 4);
            }
            assert_eq!(current_pass_id(), 3);
        }
        assert_eq!(current_pass_id(), 0);
    }

    #[test]
    fn pass_id_is_thread_local() {
        let _scope = enter_pass(7);
        let other = std::thread::spawn(current_pass_id).join().unwrap();
        assert_eq!(other, 0);
        assert_eq!(current_pass_id(), 7);
    }
}

//! Stderr tracing of roster generation, gated by `RosterConfig.verbosity`.
//!
//! Arguments are only formatted when the level is enabled, so a silent run
//! costs a comparison per call site.
//!
//! | level | name    | what is printed                                        |
//! |-------|---------|--------------------------------------------------------|
//! | 0     | silent  | nothing, the report carries the outcome                |
//! | 1     | changes | assignments, releases, displacements, day-off changes  |
//! | 2     | checks  | phase progress, shortfalls, rejected candidates        |
//! | 3     | debug   | impact breakdowns, forced-candidate scores, costs      |
//!
//! Levels above 3 behave like debug.

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Whether a message at `level` is printed under `verbosity`.
#[inline]
pub fn enabled(verbosity: u8, level: u8) -> bool {
    level != VERBOSITY_SILENT && verbosity >= level
}

/// Display name of a verbosity setting.
pub fn level_name(verbosity: u8) -> &'static str {
    match verbosity {
        VERBOSITY_SILENT => "silent",
        VERBOSITY_CHANGES => "changes",
        VERBOSITY_CHECKS => "checks",
        _ => "debug",
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_at {
    ($level:expr, $verbosity:expr, $($arg:tt)*) => {
        if $crate::logging::enabled($verbosity, $level) {
            eprintln!($($arg)*);
        }
    };
}

/// Roster mutations: assignments, releases, displacements, days off.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_CHANGES, $verbosity, $($arg)*)
    };
}

/// Phase progress, shortfalls and why a candidate or move was skipped.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_CHECKS, $verbosity, $($arg)*)
    };
}

/// Scores: impact terms, forced-candidate ranking, liberation costs.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_DEBUG, $verbosity, $($arg)*)
    };
}

//! Fatal assertion sink shared by every module in this crate.
//!
//! Every invariant in this crate is a contract: there is no recoverable
//! error path for a violated precondition, postcondition, or internal
//! invariant. The caller is expected to have validated its inputs against
//! [`GridParameters`](crate::grid::GridParameters) before calling in; once
//! inside, a failing assertion means the caller (or this crate) has a bug,
//! and the only sane response is to log the location and abort.

#[doc(hidden)]
pub fn handle_failure(kind: &str, condition: &str, file: &str, line: u32, column: u32) -> ! {
    tracing::error!(
        target: "tilecut::contract",
        "F ({file}:{line}.{column}) Assertion failed: {kind}({condition})"
    );
    std::process::abort()
}

/// Asserts an internal invariant. Aborts the process on failure.
#[macro_export]
macro_rules! ar_assert {
    ($cond:expr) => {
        if !($cond) {
            $crate::contract::handle_failure(
                "Assertion",
                stringify!($cond),
                file!(),
                line!(),
                column!(),
            );
        }
    };
}

/// Asserts a precondition on the arguments to a function. Aborts the process on failure.
#[macro_export]
macro_rules! ar_pre {
    ($cond:expr) => {
        if !($cond) {
            $crate::contract::handle_failure(
                "Precondition",
                stringify!($cond),
                file!(),
                line!(),
                column!(),
            );
        }
    };
}

/// Asserts a postcondition on the result of a function. Aborts the process on failure.
#[macro_export]
macro_rules! ar_post {
    ($cond:expr) => {
        if !($cond) {
            $crate::contract::handle_failure(
                "Postcondition",
                stringify!($cond),
                file!(),
                line!(),
                column!(),
            );
        }
    };
}

/// Marks a branch that must never be reached. Aborts the process if it is.
#[macro_export]
macro_rules! ar_unreachable {
    () => {{
        $crate::contract::handle_failure("Unreachable", "unreachable", file!(), line!(), column!());
    }};
}

//! Exit codes of the `sunset` binary.

pub const SUCCESS: i32 = 0;
/// Validation found errors, or at least one package did not fully succeed.
pub const FAILED: i32 = 1;
/// Could not load the plan, authenticate, or reach the registry.
pub const FATAL: i32 = 2;
/// The user declined a confirmation.
pub const ABORTED: i32 = 3;

//! Stable exit codes for `envboot`.

/// Every gate passed.
pub const OK: i32 = 0;
/// A gate failed, or configuration could not be loaded. The printed message
/// names the failure.
pub const FAILED: i32 = 1;

//! Stable exit codes for `fde` commands.

/// The command ran. For `fde run` this holds whatever the validation outcome was;
/// check `validation_ok` in the manifest.
pub const OK: i32 = 0;
/// Invalid invocation, config, plan or ticket, or an infrastructure error.
pub const INVALID: i32 = 1;

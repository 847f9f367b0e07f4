//! Exit codes for `coagent` CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid event log, invalid config, or any other error.
pub const INVALID: i32 = 1;

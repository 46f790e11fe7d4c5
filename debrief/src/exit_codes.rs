//! Stable exit codes for debrief CLI commands.

/// Command succeeded; for `walk`/`run` a report was produced.
pub const OK: i32 = 0;
/// Invalid tree, config or answers, or any other error.
pub const INVALID: i32 = 1;
/// `debrief walk` stopped at a node that still needs input.
pub const SUSPENDED: i32 = 2;

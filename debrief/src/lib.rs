//! Decision-tree questionnaire engine with stateless replay.
//!
//! A tree is a table of rows linked by `parentId`. Each row is a `Leaf`, a
//! `Selectbox` (pick one child by its `option` label) or a `Textarea` (free
//! text, then continue to the single child). Walking the tree to a leaf yields
//! a report of every answer given on the way.
//!
//! The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (validation, replay, report
//!   rendering). No I/O, fully testable in isolation.
//! - **[`io`]**: Reading tree files, answers and configuration.
//!
//! Orchestration modules ([`validate`], [`walk`], [`session`]) coordinate core
//! logic with I/O to implement CLI commands. Every walk starts at the root and
//! re-derives its position from the answers already known, so callers can
//! rerun it after each new answer without keeping a path around.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tree;
pub mod validate;
pub mod walk;

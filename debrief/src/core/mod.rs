//! Deterministic, pure logic shared by the debrief core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! row sets and answer providers and return deterministic outputs suitable for
//! tests.

pub mod invariants;
pub mod replay;
pub mod report;
pub mod types;

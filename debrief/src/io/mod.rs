//! I/O helpers for debrief commands.

pub mod answers;
pub mod config;
pub mod rows;

//! Diagnostics for tree loads and walks, written to stderr.
//!
//! What gets logged, by level:
//!
//! - `warn`: a tree file failed validation (with the violation count).
//! - `info`: a tree loaded clean, a walk completed or suspended, a session
//!   finished.
//! - `debug`: config and answers files read, row parse totals, every node
//!   visited, every validation finding and every committed answer.
//!
//! Nothing here reaches stdout, which carries only reports and prompts.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber.
///
/// Reads `RUST_LOG`; defaults to `warn`, so a clean run prints nothing.
///
/// # Example
/// ```bash
/// RUST_LOG=debrief=debug cargo run -- walk tree.csv --answers answers.json
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

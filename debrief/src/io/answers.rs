//! Read-only answers file for replaying a walk from the command line.
//!
//! The file is a JSON object keyed by node id:
//!
//! ```json
//! { "0": { "selected": "Outage" }, "1": { "text": "api down" } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::Answer;
use crate::tree::NodeId;

/// Answers keyed by node id; usable directly as an answer provider.
pub type AnswerMap = BTreeMap<NodeId, Answer>;

/// Load answers from disk.
pub fn load_answers(path: &Path) -> Result<AnswerMap> {
    debug!(path = %path.display(), "loading answers");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read answers {}", path.display()))?;
    let answers = parse_answers(&contents)
        .with_context(|| format!("parse answers {}", path.display()))?;
    debug!(count = answers.len(), "answers loaded");
    Ok(answers)
}

pub fn parse_answers(contents: &str) -> Result<AnswerMap> {
    let answers: AnswerMap = serde_json::from_str(contents)?;
    Ok(answers)
}

//! One replay step for `debrief walk`.

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::replay::{TraversalOutcome, step_with_limit};
use crate::io::answers::{AnswerMap, load_answers};
use crate::io::config::DebriefConfig;
use crate::tree::NodeId;
use crate::validate::load_valid_tree;

/// Load and validate the tree, then replay stored answers from the root once.
///
/// Without an answers file the walk suspends at the root (unless the root is a
/// leaf).
pub fn walk_from_files(
    tree_path: &Path,
    answers_path: Option<&Path>,
    root_override: Option<NodeId>,
    config: &DebriefConfig,
) -> Result<TraversalOutcome> {
    let tree = load_valid_tree(tree_path, root_override, config)?;
    let answers = match answers_path {
        Some(path) => load_answers(path)?,
        None => AnswerMap::new(),
    };
    step_with_limit(&tree.nodes, tree.root_id, &answers, config.max_iterations)
        .with_context(|| format!("walk {}", tree_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::replay::TraversalError;
    use crate::core::types::InputKind;
    use crate::test_support::{REFERENCE_CSV, Workspace};

    #[test]
    fn walk_without_answers_suspends_at_root() {
        let workspace = Workspace::new().expect("workspace");
        let tree = workspace.write("tree.csv", REFERENCE_CSV).expect("write");
        let outcome =
            walk_from_files(&tree, None, None, &DebriefConfig::default()).expect("walk");
        let TraversalOutcome::Suspended(pending) = outcome else {
            panic!("expected suspension");
        };
        assert_eq!(pending.node_id, 0);
        assert_eq!(
            pending.input,
            InputKind::Choice {
                options: vec!["Outage".to_string(), "Near miss".to_string()]
            }
        );
    }

    #[test]
    fn walk_with_answers_completes() {
        let workspace = Workspace::new().expect("workspace");
        let tree = workspace.write("tree.csv", REFERENCE_CSV).expect("write");
        let answers = workspace
            .write(
                "answers.json",
                r#"{"0": {"selected": "Outage"}, "1": {"text": "api down"}}"#,
            )
            .expect("write");
        let outcome = walk_from_files(&tree, Some(&answers), None, &DebriefConfig::default())
            .expect("walk");
        let TraversalOutcome::Completed(report) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(
            report.as_str(),
            "selected_option: Outage\nteam: ops\ntext: What kind of incident occurred?\n\n\n\
             response: api down\ntext: Describe the impact\n\n\n\
             severity: high\ntext: Escalate to the on-call engineer\n"
        );
    }

    #[test]
    fn stale_answer_is_reported_with_context() {
        let workspace = Workspace::new().expect("workspace");
        let tree = workspace.write("tree.csv", REFERENCE_CSV).expect("write");
        let answers = workspace
            .write("answers.json", r#"{"0": {"selected": "Fire"}}"#)
            .expect("write");
        let err = walk_from_files(&tree, Some(&answers), None, &DebriefConfig::default())
            .expect_err("stale");
        assert!(err.downcast_ref::<TraversalError>().is_some());
        assert!(format!("{err:#}").contains("answer 'Fire' for node 0 matches none"));
    }
}

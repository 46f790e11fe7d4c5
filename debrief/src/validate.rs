//! Load-and-validate helpers for `debrief validate` and the walk commands.

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::invariants::validate;
use crate::core::types::ValidationReport;
use crate::io::config::DebriefConfig;
use crate::io::rows::load_rows;
use crate::tree::{Node, NodeId, RowSet};

/// A tree file after parsing and validation, valid or not.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTree {
    pub rows: RowSet,
    pub report: ValidationReport,
}

/// A tree that passed every structural check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidTree {
    pub nodes: Vec<Node>,
    pub root_id: NodeId,
}

/// Raised when a command needs a valid tree and the file is not one.
#[derive(Debug, Error)]
#[error("tree {} failed validation:\n- {}", .path.display(), .messages.join("\n- "))]
pub struct InvalidTreeError {
    pub path: PathBuf,
    pub messages: Vec<String>,
}

/// Load a tree file and run every structural check.
///
/// The root is `root_override`, else `config.root_id`, else the minimum id.
/// Only I/O and missing required columns are errors; rule violations are
/// returned in the report.
pub fn load_and_validate(
    path: &Path,
    root_override: Option<NodeId>,
    config: &DebriefConfig,
) -> Result<LoadedTree> {
    let rows = load_rows(path, &config.empty_markers)?;
    let report = validate(&rows, root_override.or(config.root_id));
    if report.is_valid() {
        info!(path = %path.display(), nodes = rows.nodes.len(), root_id = ?report.root_id, "tree is valid");
    } else {
        warn!(path = %path.display(), violations = report.violations.len(), "tree failed validation");
    }
    Ok(LoadedTree { rows, report })
}

/// Load a tree file and require it to be valid.
pub fn load_valid_tree(
    path: &Path,
    root_override: Option<NodeId>,
    config: &DebriefConfig,
) -> Result<ValidTree> {
    let loaded = load_and_validate(path, root_override, config)?;
    let root_id = match loaded.report.root_id {
        Some(root_id) if loaded.report.is_valid() => root_id,
        _ => {
            return Err(InvalidTreeError {
                path: path.to_path_buf(),
                messages: loaded.report.messages(),
            }
            .into());
        }
    };
    Ok(ValidTree {
        nodes: loaded.rows.nodes,
        root_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Rule;
    use crate::test_support::{REFERENCE_CSV, Workspace};

    #[test]
    fn reference_tree_loads_as_valid() {
        let workspace = Workspace::new().expect("workspace");
        let path = workspace.write("tree.csv", REFERENCE_CSV).expect("write");
        let tree = load_valid_tree(&path, None, &DebriefConfig::default()).expect("load");
        assert_eq!(tree.root_id, 0);
        assert_eq!(tree.nodes.len(), 7);
    }

    #[test]
    fn root_override_beats_config() {
        let workspace = Workspace::new().expect("workspace");
        let path = workspace.write("tree.csv", REFERENCE_CSV).expect("write");
        let config = DebriefConfig {
            root_id: Some(5),
            ..DebriefConfig::default()
        };
        let loaded = load_and_validate(&path, Some(2), &config).expect("load");
        assert_eq!(loaded.report.root_id, Some(2));
        // Node 2 has a parent, and node 0 is now a second parentless node.
        assert!(
            loaded
                .report
                .violations
                .iter()
                .any(|violation| violation.rule == Rule::RootHasParent { parent_id: 0 })
        );
    }

    #[test]
    fn invalid_tree_error_lists_violations() {
        let workspace = Workspace::new().expect("workspace");
        let path = workspace
            .write(
                "tree.csv",
                "id,parentId,type,text\n0,,Selectbox,pick\n1,0,Leaf,end\n",
            )
            .expect("write");
        let err = load_valid_tree(&path, None, &DebriefConfig::default()).expect_err("invalid");
        let invalid = err
            .downcast_ref::<InvalidTreeError>()
            .expect("invalid tree error");
        assert_eq!(
            invalid.messages,
            vec!["node 1: child of Selectbox 0 has no option label".to_string()]
        );
    }

    #[test]
    fn missing_columns_fail_the_load() {
        let workspace = Workspace::new().expect("workspace");
        let path = workspace.write("tree.csv", "id,text\n0,hi\n").expect("write");
        let err = load_and_validate(&path, None, &DebriefConfig::default()).expect_err("schema");
        assert!(format!("{err:#}").contains("missing required column(s): type, parentId"));
    }
}

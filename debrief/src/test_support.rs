//! Test-only helpers for constructing decision-tree rows.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::tree::{Attributes, Node, NodeId, NodeType, Scalar};

/// Reference tree in CSV form; [`reference_rows`] builds the same rows.
pub const REFERENCE_CSV: &str = "\
id,parentId,type,text,option,severity,team
0,,Selectbox,What kind of incident occurred?,,,ops
1,0,Textarea,Describe the impact,Outage,,
2,0,Selectbox,Was anyone notified?,Near miss,,
3,1,Leaf,Escalate to the on-call engineer,,high,
4,2,Leaf,Record closed,Yes,low,
5,2,Textarea,Who should be notified?,No,,
6,5,Leaf,Notification queued,,medium,
";

/// Create a node with no option and no extra attributes.
pub fn node(id: NodeId, parent_id: Option<NodeId>, node_type: NodeType, text: &str) -> Node {
    Node {
        id,
        parent_id,
        node_type,
        text: text.to_string(),
        option: None,
        attributes: Attributes::new(),
    }
}

pub fn leaf(id: NodeId, parent_id: Option<NodeId>, text: &str) -> Node {
    node(id, parent_id, NodeType::Leaf, text)
}

pub fn selectbox(id: NodeId, parent_id: Option<NodeId>, text: &str) -> Node {
    node(id, parent_id, NodeType::Selectbox, text)
}

pub fn textarea(id: NodeId, parent_id: Option<NodeId>, text: &str) -> Node {
    node(id, parent_id, NodeType::Textarea, text)
}

/// Leaf reached from `parent_id` by choosing `option`.
pub fn option_leaf(id: NodeId, parent_id: NodeId, option: &str, text: &str) -> Node {
    with_option(leaf(id, Some(parent_id), text), option)
}

pub fn with_option(mut node: Node, option: &str) -> Node {
    node.option = Some(option.to_string());
    node
}

pub fn with_attribute(mut node: Node, key: &str, value: Scalar) -> Node {
    node.attributes.insert(key.to_string(), value);
    node
}

/// Incident debrief questionnaire used across tests.
///
/// ```text
/// 0 Selectbox ─ Outage ──▶ 1 Textarea ─▶ 3 Leaf
///             └ Near miss ▶ 2 Selectbox ─ Yes ─▶ 4 Leaf
///                                       └ No ──▶ 5 Textarea ─▶ 6 Leaf
/// ```
pub fn reference_rows() -> Vec<Node> {
    vec![
        with_attribute(
            selectbox(0, None, "What kind of incident occurred?"),
            "team",
            Scalar::from("ops"),
        ),
        with_option(textarea(1, Some(0), "Describe the impact"), "Outage"),
        with_option(selectbox(2, Some(0), "Was anyone notified?"), "Near miss"),
        with_attribute(
            leaf(3, Some(1), "Escalate to the on-call engineer"),
            "severity",
            Scalar::from("high"),
        ),
        with_attribute(
            option_leaf(4, 2, "Yes", "Record closed"),
            "severity",
            Scalar::from("low"),
        ),
        with_option(textarea(5, Some(2), "Who should be notified?"), "No"),
        with_attribute(
            leaf(6, Some(5), "Notification queued"),
            "severity",
            Scalar::from("medium"),
        ),
    ]
}

/// Scratch directory holding fixture files for a test.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `name` inside the workspace and return its path.
    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

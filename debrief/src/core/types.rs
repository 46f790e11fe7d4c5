//! Shared deterministic types for validation and replay.
//!
//! These types define stable contracts between the core and its callers. They
//! hold no I/O handles and render the same way on every run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::NodeId;

/// An answer previously committed for a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    /// Option label chosen at a `Selectbox`.
    Selected(String),
    /// Free text entered at a `Textarea`.
    Text(String),
}

impl Answer {
    pub fn kind(&self) -> &'static str {
        match self {
            Answer::Selected(_) => "a selection",
            Answer::Text(_) => "free text",
        }
    }
}

/// What the presentation layer has to collect before the walk can continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// Pick one of these labels, in the order the tree defines them.
    Choice { options: Vec<String> },
    Text,
}

/// The node a suspended walk is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInput {
    pub node_id: NodeId,
    pub prompt: String,
    pub input: InputKind,
    /// Ids visited from the root up to and including `node_id`.
    pub path: Vec<NodeId>,
}

impl PendingInput {
    pub fn path_label(&self) -> String {
        self.path
            .iter()
            .map(NodeId::to_string)
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// A data row that could not be turned into a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    /// 1-based data row number (the header is not counted).
    pub row: usize,
    pub column: String,
    pub value: String,
}

/// What a finding is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Node(NodeId),
    Row(usize),
    Tree,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Node(id) => write!(f, "node {id}"),
            Subject::Row(row) => write!(f, "row {row}"),
            Subject::Tree => f.write_str("tree"),
        }
    }
}

/// Structural rule broken by a row set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    EmptyTree,
    MalformedRow { column: String, value: String },
    DuplicateId,
    RootNotFound,
    RootHasParent { parent_id: NodeId },
    MissingParentId,
    UnknownParent { parent_id: NodeId },
    Cycle { members: Vec<NodeId> },
    UnknownType { value: String },
    ChildlessNonLeaf { node_type: String },
    LeafWithChildren { count: usize },
    SelectboxWithoutChildren,
    MissingOption { parent_id: NodeId },
    DuplicateOption { label: String },
    TextareaChildCount { count: usize },
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::EmptyTree => f.write_str("row set has no nodes"),
            Rule::MalformedRow { column, value } => {
                write!(f, "column '{column}' has unusable value '{value}'")
            }
            Rule::DuplicateId => f.write_str("id is not unique"),
            Rule::RootNotFound => f.write_str("designated root does not exist"),
            Rule::RootHasParent { parent_id } => {
                write!(f, "root must not have a parent (parentId {parent_id})")
            }
            Rule::MissingParentId => f.write_str("non-root node has no parentId"),
            Rule::UnknownParent { parent_id } => {
                write!(f, "parentId {parent_id} does not match any id")
            }
            Rule::Cycle { members } => {
                let ids = members
                    .iter()
                    .map(NodeId::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                write!(f, "parentId chain forms a cycle ({ids})")
            }
            Rule::UnknownType { value } => write!(f, "unrecognized type '{value}'"),
            Rule::ChildlessNonLeaf { node_type } => {
                write!(f, "{node_type} node has no children; only Leaf nodes may")
            }
            Rule::LeafWithChildren { count } => write!(f, "Leaf node has {count} children"),
            Rule::SelectboxWithoutChildren => f.write_str("Selectbox node offers no options"),
            Rule::MissingOption { parent_id } => {
                write!(f, "child of Selectbox {parent_id} has no option label")
            }
            Rule::DuplicateOption { label } => {
                write!(f, "option '{label}' is offered more than once")
            }
            Rule::TextareaChildCount { count } => {
                write!(f, "Textarea node must have exactly one child, found {count}")
            }
        }
    }
}

/// One finding of the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub subject: Subject,
    pub rule: Rule,
}

impl Violation {
    pub fn node(id: NodeId, rule: Rule) -> Self {
        Self {
            subject: Subject::Node(id),
            rule,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.rule)
    }
}

/// Result of validating a row set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Root the checks were run against.
    pub root_id: Option<NodeId>,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Stable one-line-per-finding rendering.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(Violation::to_string).collect()
    }
}

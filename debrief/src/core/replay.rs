//! Stateless replay traversal.
//!
//! Every call walks from the root and re-derives the current node from the
//! answers the provider already holds. No path is persisted between calls; the
//! provider is only read, never written.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, info};

use crate::core::report::Report;
use crate::core::types::{Answer, InputKind, PendingInput};
use crate::tree::{Attributes, Node, NodeId, NodeType, Scalar, Tree};

/// Iteration cap applied when none is configured.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Report key holding the label chosen at a `Selectbox`.
pub const SELECTED_OPTION_KEY: &str = "selected_option";
/// Report key holding the text entered at a `Textarea`.
pub const RESPONSE_KEY: &str = "response";

/// Source of previously committed answers, keyed by node id.
pub trait AnswerProvider {
    fn answer(&self, node_id: NodeId) -> Option<Answer>;
}

impl AnswerProvider for BTreeMap<NodeId, Answer> {
    fn answer(&self, node_id: NodeId) -> Option<Answer> {
        self.get(&node_id).cloned()
    }
}

impl AnswerProvider for HashMap<NodeId, Answer> {
    fn answer(&self, node_id: NodeId) -> Option<Answer> {
        self.get(&node_id).cloned()
    }
}

impl<P: AnswerProvider + ?Sized> AnswerProvider for &P {
    fn answer(&self, node_id: NodeId) -> Option<Answer> {
        (**self).answer(node_id)
    }
}

/// Result of one replay call.
#[derive(Debug, Clone, PartialEq)]
pub enum TraversalOutcome {
    /// Input is still needed at the given node.
    Suspended(PendingInput),
    /// A leaf was reached.
    Completed(Report),
}

/// Consistency failures that abort a replay call.
///
/// These indicate the tree or the stored answers changed or were corrupted
/// after validation.
#[derive(Debug, Error)]
pub enum TraversalError {
    #[error("node {0} not found in tree")]
    NodeNotFound(NodeId),
    #[error("node {node_id} has unrecognized type '{node_type}'")]
    UnknownNodeType { node_id: NodeId, node_type: String },
    #[error("selectbox node {node_id} offers no options")]
    NoOptions { node_id: NodeId },
    #[error("answer '{selected}' for node {node_id} matches none of its options ({})", .options.join(", "))]
    UnknownOption {
        node_id: NodeId,
        selected: String,
        options: Vec<String>,
    },
    #[error("textarea node {node_id} has no child to continue to")]
    MissingChild { node_id: NodeId },
    #[error("answer for node {node_id} is {found} but the node expects {expected}")]
    AnswerKindMismatch {
        node_id: NodeId,
        expected: &'static str,
        found: &'static str,
    },
    #[error("traversal exceeded {limit} iterations without reaching a leaf")]
    IterationLimitExceeded { limit: usize },
}

/// Walk from `root_id` with the default iteration cap.
pub fn step<P: AnswerProvider + ?Sized>(
    nodes: &[Node],
    root_id: NodeId,
    answers: &P,
) -> Result<TraversalOutcome, TraversalError> {
    step_with_limit(nodes, root_id, answers, DEFAULT_MAX_ITERATIONS)
}

/// Walk from `root_id` until a leaf is reached or input is missing.
///
/// Records with no surviving attributes are omitted from the report.
pub fn step_with_limit<P: AnswerProvider + ?Sized>(
    nodes: &[Node],
    root_id: NodeId,
    answers: &P,
    max_iterations: usize,
) -> Result<TraversalOutcome, TraversalError> {
    let tree = Tree::new(nodes);
    let mut records: Vec<Attributes> = Vec::new();
    let mut path: Vec<NodeId> = Vec::new();
    let mut current = root_id;

    for _ in 0..max_iterations {
        let node = tree
            .node(current)
            .ok_or(TraversalError::NodeNotFound(current))?;
        let children = tree.children(current);
        let mut record = node.report_attributes();
        path.push(current);
        debug!(node_id = current, node_type = %node.node_type, children = children.len(), "visiting node");

        let next = match &node.node_type {
            NodeType::Leaf => {
                push_record(&mut records, record);
                let report = Report::from_records(records);
                info!(leaf_id = current, records = report.records().len(), "walk completed");
                return Ok(TraversalOutcome::Completed(report));
            }
            NodeType::Selectbox => {
                let options = offered_options(children);
                if options.is_empty() {
                    return Err(TraversalError::NoOptions { node_id: current });
                }
                let selected = match answers.answer(current) {
                    Some(Answer::Selected(label)) if !label.is_empty() => label,
                    Some(Answer::Selected(_)) | None => {
                        let labels = options
                            .iter()
                            .map(|(label, _)| label.to_string())
                            .collect();
                        return Ok(suspend(node, InputKind::Choice { options: labels }, path));
                    }
                    Some(other) => return Err(kind_mismatch(current, "a selection", &other)),
                };
                let Some(&(_, child_id)) = options.iter().find(|(label, _)| *label == selected)
                else {
                    return Err(TraversalError::UnknownOption {
                        node_id: current,
                        options: options.iter().map(|(label, _)| label.to_string()).collect(),
                        selected,
                    });
                };
                record.insert(SELECTED_OPTION_KEY.to_string(), Scalar::Text(selected));
                child_id
            }
            NodeType::Textarea => {
                let response = match answers.answer(current) {
                    Some(Answer::Text(text)) if !text.is_empty() => text,
                    Some(Answer::Text(_)) | None => {
                        return Ok(suspend(node, InputKind::Text, path));
                    }
                    Some(other) => return Err(kind_mismatch(current, "free text", &other)),
                };
                let child = children
                    .first()
                    .ok_or(TraversalError::MissingChild { node_id: current })?;
                record.insert(RESPONSE_KEY.to_string(), Scalar::Text(response));
                child.id
            }
            NodeType::Unknown(raw) => {
                return Err(TraversalError::UnknownNodeType {
                    node_id: current,
                    node_type: raw.clone(),
                });
            }
        };

        push_record(&mut records, record);
        current = next;
    }

    Err(TraversalError::IterationLimitExceeded {
        limit: max_iterations,
    })
}

/// Option label to child id, in row order. Children without a label are skipped.
fn offered_options<'a>(children: &[&'a Node]) -> Vec<(&'a str, NodeId)> {
    children
        .iter()
        .filter_map(|child| child.option_label().map(|label| (label, child.id)))
        .collect()
}

fn push_record(records: &mut Vec<Attributes>, record: Attributes) {
    if !record.is_empty() {
        records.push(record);
    }
}

fn suspend(node: &Node, input: InputKind, path: Vec<NodeId>) -> TraversalOutcome {
    info!(node_id = node.id, depth = path.len(), "walk suspended awaiting input");
    TraversalOutcome::Suspended(PendingInput {
        node_id: node.id,
        prompt: node.text.clone(),
        input,
        path,
    })
}

fn kind_mismatch(node_id: NodeId, expected: &'static str, found: &Answer) -> TraversalError {
    TraversalError::AnswerKindMismatch {
        node_id,
        expected,
        found: found.kind(),
    }
}

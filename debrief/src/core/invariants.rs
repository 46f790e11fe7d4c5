//! Structural invariants of a decision tree.
//!
//! Every rule is checked independently and all findings are collected; the
//! validator never stops at the first violation and never errors on bad data.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::core::types::{Rule, Subject, ValidationReport, Violation};
use crate::tree::{Node, NodeId, NodeType, RowSet, Tree};

/// Check a parsed row set against every structural rule.
///
/// `root_id` defaults to the minimum `id` present. Row issues found while
/// parsing come first in the report, followed by tree-level and per-node
/// findings in row order.
pub fn validate(rows: &RowSet, root_id: Option<NodeId>) -> ValidationReport {
    let root_id = root_id.or_else(|| rows.default_root());
    let mut violations: Vec<Violation> = rows
        .issues
        .iter()
        .map(|issue| Violation {
            subject: Subject::Row(issue.row),
            rule: Rule::MalformedRow {
                column: issue.column.clone(),
                value: issue.value.clone(),
            },
        })
        .collect();

    match root_id {
        Some(root_id) => violations.extend(validate_nodes(&rows.nodes, root_id)),
        None => violations.push(Violation {
            subject: Subject::Tree,
            rule: Rule::EmptyTree,
        }),
    }

    for violation in &violations {
        debug!(%violation, "tree invariant violated");
    }
    ValidationReport {
        root_id,
        violations,
    }
}

/// Check typed nodes against every structural rule for the given root.
pub fn validate_nodes(nodes: &[Node], root_id: NodeId) -> Vec<Violation> {
    let tree = Tree::new(nodes);
    let mut errors = Vec::new();

    check_unique_ids(nodes, &mut errors);
    check_root(&tree, root_id, &mut errors);
    check_parents(&tree, root_id, &mut errors);
    check_cycles(&tree, &mut errors);

    let mut seen = HashSet::new();
    for node in nodes {
        // Duplicates are already reported; shape rules apply to the first row.
        if seen.insert(node.id) {
            check_shape(&tree, node, &mut errors);
        }
    }
    errors
}

fn check_unique_ids(nodes: &[Node], errors: &mut Vec<Violation>) {
    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(node.id) {
            errors.push(Violation::node(node.id, Rule::DuplicateId));
        }
    }
}

fn check_root(tree: &Tree<'_>, root_id: NodeId, errors: &mut Vec<Violation>) {
    match tree.node(root_id) {
        None => errors.push(Violation::node(root_id, Rule::RootNotFound)),
        Some(root) => {
            if let Some(parent_id) = root.parent_id {
                errors.push(Violation::node(root_id, Rule::RootHasParent { parent_id }));
            }
        }
    }
}

fn check_parents(tree: &Tree<'_>, root_id: NodeId, errors: &mut Vec<Violation>) {
    for node in tree.nodes() {
        if node.id == root_id {
            continue;
        }
        match node.parent_id {
            None => errors.push(Violation::node(node.id, Rule::MissingParentId)),
            Some(parent_id) if !tree.contains(parent_id) => {
                errors.push(Violation::node(node.id, Rule::UnknownParent { parent_id }));
            }
            Some(_) => {}
        }
    }
}

/// Report each `parentId` cycle once, tagged with its smallest member.
fn check_cycles(tree: &Tree<'_>, errors: &mut Vec<Violation>) {
    let mut settled: HashSet<NodeId> = HashSet::new();
    for node in tree.nodes() {
        let mut path: Vec<NodeId> = Vec::new();
        let mut position: HashMap<NodeId, usize> = HashMap::new();
        let mut cursor = Some(node.id);
        while let Some(id) = cursor {
            if settled.contains(&id) {
                break;
            }
            if let Some(&start) = position.get(&id) {
                let mut members = path[start..].to_vec();
                members.sort_unstable();
                errors.push(Violation::node(members[0], Rule::Cycle { members }));
                break;
            }
            position.insert(id, path.len());
            path.push(id);
            cursor = tree.node(id).and_then(|node| node.parent_id);
        }
        settled.extend(path);
    }
}

fn check_shape(tree: &Tree<'_>, node: &Node, errors: &mut Vec<Violation>) {
    let children = tree.children(node.id);

    if let NodeType::Unknown(value) = &node.node_type {
        errors.push(Violation::node(
            node.id,
            Rule::UnknownType {
                value: value.clone(),
            },
        ));
    }

    if children.is_empty() && node.node_type != NodeType::Leaf {
        errors.push(Violation::node(
            node.id,
            Rule::ChildlessNonLeaf {
                node_type: node.node_type.to_string(),
            },
        ));
    }

    match node.node_type {
        NodeType::Leaf if !children.is_empty() => errors.push(Violation::node(
            node.id,
            Rule::LeafWithChildren {
                count: children.len(),
            },
        )),
        NodeType::Selectbox => {
            if children.is_empty() {
                errors.push(Violation::node(node.id, Rule::SelectboxWithoutChildren));
            }
            let mut labels = HashSet::new();
            for child in children {
                match child.option_label() {
                    None => errors.push(Violation::node(
                        child.id,
                        Rule::MissingOption { parent_id: node.id },
                    )),
                    Some(label) if !labels.insert(label) => errors.push(Violation::node(
                        node.id,
                        Rule::DuplicateOption {
                            label: label.to_string(),
                        },
                    )),
                    Some(_) => {}
                }
            }
        }
        NodeType::Textarea if children.len() != 1 => errors.push(Violation::node(
            node.id,
            Rule::TextareaChildCount {
                count: children.len(),
            },
        )),
        _ => {}
    }
}

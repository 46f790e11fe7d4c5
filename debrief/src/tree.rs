//! Typed decision-tree rows and a read-only index over them.
//!
//! Rows are parsed once (see [`crate::io::rows`]) into [`Node`] records before
//! validation or traversal runs. Everything that is not a structural column is
//! kept as a typed [`Scalar`] in the node's attribute map.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::core::types::RowIssue;

/// Integer identifier of a tree row.
pub type NodeId = i64;

/// Report attributes of a node, ordered by key.
pub type Attributes = BTreeMap<String, Scalar>;

/// Attribute key under which a node's prompt is carried into the report.
pub const TEXT_KEY: &str = "text";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Leaf,
    Selectbox,
    Textarea,
    /// A `type` cell outside the closed set; kept so it can be reported.
    Unknown(String),
}

impl NodeType {
    /// Parse a `type` cell. Matching is case-insensitive.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "leaf" => NodeType::Leaf,
            "selectbox" => NodeType::Selectbox,
            "textarea" => NodeType::Textarea,
            _ => NodeType::Unknown(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            NodeType::Leaf => "Leaf",
            NodeType::Selectbox => "Selectbox",
            NodeType::Textarea => "Textarea",
            NodeType::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Infer the scalar type of a non-empty cell.
    ///
    /// Integers win over floats; non-finite floats stay text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return Scalar::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Scalar::Bool(false);
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Scalar::Int(value);
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Scalar::Float(value),
            _ => Scalar::Text(trimmed.to_string()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub node_type: NodeType,
    pub text: String,
    /// Label of the choice leading here from a `Selectbox` parent.
    pub option: Option<String>,
    /// Free-form columns with empty cells already dropped.
    pub attributes: Attributes,
}

impl Node {
    /// Attribute map carried into the report: extra columns plus non-empty `text`.
    pub fn report_attributes(&self) -> Attributes {
        let mut attributes = self.attributes.clone();
        if !self.text.trim().is_empty() {
            attributes.insert(TEXT_KEY.to_string(), Scalar::Text(self.text.clone()));
        }
        attributes
    }

    /// Non-empty option label, if any.
    pub fn option_label(&self) -> Option<&str> {
        self.option
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }
}

/// Parsed row set: typed nodes plus rows that could not be parsed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowSet {
    pub nodes: Vec<Node>,
    pub issues: Vec<RowIssue>,
}

impl RowSet {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            issues: Vec::new(),
        }
    }

    /// Root used when none is configured: the minimum `id` present.
    pub fn default_root(&self) -> Option<NodeId> {
        default_root(&self.nodes)
    }
}

pub fn default_root(nodes: &[Node]) -> Option<NodeId> {
    nodes.iter().map(|node| node.id).min()
}

/// Lookup index over a borrowed row slice.
///
/// The first row wins when ids are duplicated. Children keep row order, which
/// is the order options are offered in.
#[derive(Debug)]
pub struct Tree<'a> {
    nodes: &'a [Node],
    by_id: HashMap<NodeId, &'a Node>,
    children: HashMap<NodeId, Vec<&'a Node>>,
}

impl<'a> Tree<'a> {
    pub fn new(nodes: &'a [Node]) -> Self {
        let mut by_id = HashMap::with_capacity(nodes.len());
        let mut children: HashMap<NodeId, Vec<&'a Node>> = HashMap::new();
        for node in nodes {
            by_id.entry(node.id).or_insert(node);
            if let Some(parent_id) = node.parent_id {
                children.entry(parent_id).or_default().push(node);
            }
        }
        Self {
            nodes,
            by_id,
            children,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&'a Node> {
        self.by_id.get(&id).copied()
    }

    pub fn children(&self, id: NodeId) -> &[&'a Node] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> &'a [Node] {
        self.nodes
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.by_id.contains_key(&id)
    }
}

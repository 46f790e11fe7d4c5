//! Tree definition loading (CSV or JSON) and typed row parsing.

use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::core::types::RowIssue;
use crate::tree::{Attributes, Node, NodeId, NodeType, RowSet, Scalar};

pub const ID_COLUMN: &str = "id";
pub const PARENT_COLUMN: &str = "parentId";
pub const TYPE_COLUMN: &str = "type";
pub const TEXT_COLUMN: &str = "text";
pub const OPTION_COLUMN: &str = "option";

/// Columns without which no per-row check is meaningful.
pub const REQUIRED_COLUMNS: [&str; 4] = [ID_COLUMN, TYPE_COLUMN, TEXT_COLUMN, PARENT_COLUMN];

const STRUCTURAL_COLUMNS: [&str; 5] = [
    ID_COLUMN,
    PARENT_COLUMN,
    TYPE_COLUMN,
    TEXT_COLUMN,
    OPTION_COLUMN,
];

/// Untyped table: a header plus string cells aligned with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("tree table is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Load a tree file, choosing the reader by extension (`.csv` or `.json`).
pub fn load_rows(path: &Path, empty_markers: &[String]) -> Result<RowSet> {
    debug!(path = %path.display(), "loading tree rows");
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let table = match extension.as_deref() {
        Some("csv") => {
            let file =
                fs::File::open(path).with_context(|| format!("open tree {}", path.display()))?;
            read_csv(file).with_context(|| format!("read csv {}", path.display()))?
        }
        Some("json") => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("read tree {}", path.display()))?;
            read_json(&contents).with_context(|| format!("parse json {}", path.display()))?
        }
        _ => bail!(
            "unsupported tree file {} (expected .csv or .json)",
            path.display()
        ),
    };
    let rows = parse_table(&table, empty_markers)
        .with_context(|| format!("parse tree {}", path.display()))?;
    debug!(
        nodes = rows.nodes.len(),
        issues = rows.issues.len(),
        "tree rows parsed"
    );
    Ok(rows)
}

/// Read a CSV table with a header row. Short rows are padded with empty cells.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let columns: Vec<String> = reader
        .headers()
        .context("read csv header")?
        .iter()
        .map(|column| column.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("read csv record")?;
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(columns.len(), String::new());
        rows.push(cells);
    }
    Ok(RawTable { columns, rows })
}

/// Read a JSON array of row objects.
///
/// Columns are the union of all keys across rows; numbers and booleans
/// are stringified and `null` becomes an empty cell.
pub fn read_json(contents: &str) -> Result<RawTable> {
    let value: Value = serde_json::from_str(contents).context("parse json")?;
    let entries = value
        .as_array()
        .ok_or_else(|| anyhow!("expected a JSON array of row objects"))?;

    let mut columns: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let object = entry
            .as_object()
            .ok_or_else(|| anyhow!("row {} is not a JSON object", index + 1))?;
        for key in object.keys() {
            if !columns.iter().any(|column| column == key) {
                columns.push(key.clone());
            }
        }
        objects.push(object);
    }

    let rows = objects
        .iter()
        .map(|object| {
            columns
                .iter()
                .map(|column| object.get(column).map(json_cell).unwrap_or_default())
                .collect()
        })
        .collect();
    Ok(RawTable { columns, rows })
}

fn json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Turn an untyped table into typed nodes.
///
/// Fails only when a required column is absent. Rows whose `id` or `parentId`
/// cannot be read as integers are skipped and recorded as [`RowIssue`]s.
pub fn parse_table(table: &RawTable, empty_markers: &[String]) -> Result<RowSet, SchemaError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !table.columns.iter().any(|column| column == *required))
        .map(|required| required.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns(missing));
    }

    let structural: BTreeSet<&str> = STRUCTURAL_COLUMNS.into_iter().collect();
    let mut rows = RowSet::default();
    for (index, cells) in table.rows.iter().enumerate() {
        let row = index + 1;
        let view = RowView {
            columns: &table.columns,
            cells,
            empty_markers,
        };

        let id = match view.get(ID_COLUMN) {
            None => {
                rows.issues.push(issue(row, ID_COLUMN, String::new()));
                continue;
            }
            Some(raw) => match parse_id(raw) {
                Some(id) => id,
                None => {
                    rows.issues.push(issue(row, ID_COLUMN, raw.to_string()));
                    continue;
                }
            },
        };
        let parent_id = match view.get(PARENT_COLUMN) {
            None => None,
            Some(raw) => match parse_id(raw) {
                Some(parent_id) => Some(parent_id),
                None => {
                    rows.issues.push(issue(row, PARENT_COLUMN, raw.to_string()));
                    continue;
                }
            },
        };

        let mut attributes = Attributes::new();
        for (column, value) in table.columns.iter().zip(cells) {
            if structural.contains(column.as_str()) || is_empty_cell(value, empty_markers) {
                continue;
            }
            attributes.insert(column.clone(), Scalar::parse(value));
        }

        rows.nodes.push(Node {
            id,
            parent_id,
            node_type: NodeType::parse(view.get(TYPE_COLUMN).unwrap_or_default()),
            text: view.get(TEXT_COLUMN).unwrap_or_default().trim().to_string(),
            option: view.get(OPTION_COLUMN).map(|label| label.trim().to_string()),
            attributes,
        });
    }
    Ok(rows)
}

/// One data row addressed by column name.
struct RowView<'a> {
    columns: &'a [String],
    cells: &'a [String],
    empty_markers: &'a [String],
}

impl<'a> RowView<'a> {
    /// Non-empty cell under `name`.
    fn get(&self, name: &str) -> Option<&'a str> {
        let position = self.columns.iter().position(|column| column == name)?;
        self.cells
            .get(position)
            .map(String::as_str)
            .filter(|value| !is_empty_cell(value, self.empty_markers))
    }
}

/// True for blank cells and cells matching a configured empty marker.
pub fn is_empty_cell(value: &str, empty_markers: &[String]) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || empty_markers
            .iter()
            .any(|marker| marker.eq_ignore_ascii_case(trimmed))
}

/// Parse an id cell. Integral floats (`3.0`) are accepted, as spreadsheet
/// exports write them for columns holding blanks.
fn parse_id(raw: &str) -> Option<NodeId> {
    let trimmed = raw.trim();
    if let Ok(id) = trimmed.parse::<NodeId>() {
        return Some(id);
    }
    let value = trimmed.parse::<f64>().ok()?;
    let in_range = value.abs() < (NodeId::MAX as f64);
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as NodeId)
}

fn issue(row: usize, column: &str, value: String) -> RowIssue {
    RowIssue {
        row,
        column: column.to_string(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::default_empty_markers;
    use crate::test_support::{REFERENCE_CSV, Workspace, reference_rows};

    fn table(columns: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn reference_csv_parses_to_reference_rows() {
        let raw = read_csv(REFERENCE_CSV.as_bytes()).expect("read csv");
        let rows = parse_table(&raw, &default_empty_markers()).expect("parse");
        assert!(rows.issues.is_empty());
        assert_eq!(rows.nodes, reference_rows());
    }

    #[test]
    fn missing_required_columns_fail_fast() {
        let raw = table(&["id", "text"], &[&["0", "hi"]]);
        let err = parse_table(&raw, &[]).expect_err("schema error");
        assert_eq!(
            err,
            SchemaError::MissingColumns(vec!["type".to_string(), "parentId".to_string()])
        );
        assert_eq!(
            err.to_string(),
            "tree table is missing required column(s): type, parentId"
        );
    }

    #[test]
    fn malformed_ids_become_row_issues() {
        let raw = table(
            &["id", "parentId", "type", "text"],
            &[
                &["0", "", "Textarea", "why"],
                &["x", "0", "Leaf", "bad id"],
                &["2", "zero", "Leaf", "bad parent"],
                &["", "0", "Leaf", "no id"],
                &["3", "0.0", "Leaf", "float parent"],
            ],
        );
        let rows = parse_table(&raw, &[]).expect("parse");
        let ids: Vec<NodeId> = rows.nodes.iter().map(|node| node.id).collect();
        assert_eq!(ids, vec![0, 3]);
        assert_eq!(rows.nodes[1].parent_id, Some(0));
        assert_eq!(
            rows.issues,
            vec![
                issue(2, ID_COLUMN, "x".to_string()),
                issue(3, PARENT_COLUMN, "zero".to_string()),
                issue(4, ID_COLUMN, String::new()),
            ]
        );
    }

    #[test]
    fn empty_markers_drop_attributes() {
        let raw = table(
            &["id", "parentId", "type", "text", "owner", "note"],
            &[&["0", "nan", "leaf", "end", "NaN", " kept "]],
        );
        let rows = parse_table(&raw, &default_empty_markers()).expect("parse");
        let node = &rows.nodes[0];
        assert_eq!(node.parent_id, None);
        assert_eq!(node.node_type, NodeType::Leaf);
        assert_eq!(node.attributes.len(), 1);
        assert_eq!(node.attributes["note"], Scalar::from("kept"));
    }

    #[test]
    fn json_rows_are_stringified() {
        let raw = read_json(
            r#"[
                {"id": 0, "parentId": null, "type": "Selectbox", "text": "pick"},
                {"id": 1, "parentId": 0, "type": "Leaf", "text": "end", "option": "A", "score": 2.5}
            ]"#,
        )
        .expect("read json");
        assert_eq!(raw.columns.len(), 6);
        assert!(raw.columns.iter().any(|column| column == "score"));
        let rows = parse_table(&raw, &[]).expect("parse");
        assert_eq!(rows.nodes[1].option.as_deref(), Some("A"));
        assert_eq!(rows.nodes[1].attributes["score"], Scalar::Float(2.5));
        assert_eq!(rows.nodes[0].option, None);
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        assert!(read_json(r#"{"id": 0}"#).is_err());
        assert!(read_json("[1, 2]").is_err());
    }

    #[test]
    fn load_rows_dispatches_on_extension() {
        let workspace = Workspace::new().expect("workspace");
        let csv_path = workspace.write("tree.csv", REFERENCE_CSV).expect("write");
        let rows = load_rows(&csv_path, &default_empty_markers()).expect("load csv");
        assert_eq!(rows.nodes.len(), 7);

        let txt_path = workspace.write("tree.txt", REFERENCE_CSV).expect("write");
        let err = load_rows(&txt_path, &[]).expect_err("unsupported");
        assert!(err.to_string().contains("unsupported tree file"));
    }

    #[test]
    fn parse_id_accepts_integral_floats_only() {
        assert_eq!(parse_id("7"), Some(7));
        assert_eq!(parse_id("7.0"), Some(7));
        assert_eq!(parse_id("7.5"), None);
        assert_eq!(parse_id("nan"), None);
    }
}

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Id of the single row produced for a primitive root. Container roots never get a row, and
/// root expansion is tracked separately, so a top-level `"$"` key does not clash with it.
pub const ROOT_ID: &str = "$";

/// Separator between path segments inside a `NodeId`.
pub const ID_SEPARATOR: char = '.';

/// Deterministic key derived from a node's root-to-node path.
///
/// Ids are positional: inserting or removing a sibling before a node shifts the ids of every
/// later array element, so expansion/highlight state keyed by id follows the position, not the
/// value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
  pub fn root() -> Self {
    Self(ROOT_ID.to_string())
  }

  pub fn from_path(path: &[PathSegment]) -> Self {
    if path.is_empty() {
      return Self::root();
    }
    let mut s = String::new();
    for (i, seg) in path.iter().enumerate() {
      if i > 0 {
        s.push(ID_SEPARATOR);
      }
      match seg {
        PathSegment::Key(k) => s.push_str(k),
        PathSegment::Index(i) => s.push_str(&i.to_string()),
      }
    }
    Self(s)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for NodeId {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

impl From<String> for NodeId {
  fn from(s: String) -> Self {
    Self(s)
  }
}

/// One step of a root-to-node path.
///
/// Untagged so a host payload can be a plain array like `["users", 0, "name"]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum PathSegment {
  Key(String),
  Index(usize),
}

impl PathSegment {
  /// The key shown for this segment in the tree (indices rendered as decimal).
  pub fn label(&self) -> String {
    match self {
      PathSegment::Key(k) => k.clone(),
      PathSegment::Index(i) => i.to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
  Object,
  Array,
  Primitive,
}

impl RowKind {
  pub fn of(value: &Value) -> Self {
    match value {
      Value::Object(_) => RowKind::Object,
      Value::Array(_) => RowKind::Array,
      _ => RowKind::Primitive,
    }
  }

  pub fn is_container(self) -> bool {
    !matches!(self, RowKind::Primitive)
  }
}

/// One renderable line of the tree view.
///
/// Rows are rebuilt wholesale on every materialization pass; identity is `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Row {
  pub id: NodeId,
  pub depth: usize,
  pub key: String,
  /// The primitive value; `None` for objects and arrays (see `child_count`).
  pub value: Option<Value>,
  pub kind: RowKind,
  pub path: Vec<PathSegment>,
  pub child_count: usize,
  /// `Object {n}` / `Array [n]` for containers, JSON encoding for primitives.
  pub preview: String,
  pub expanded: bool,
  /// Candidate marker only: the preview is long enough that the view may need to cut it.
  pub is_truncated: bool,
  pub is_value_expanded: bool,
  pub is_highlighted: bool,
  pub is_current_match: bool,
}

/// Query plus the ordered ids of every matching node (full pre-order, ignoring expansion).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchState {
  pub query: String,
  pub matches: Vec<NodeId>,
  /// `None` means no current match.
  pub current_index: Option<usize>,
  #[serde(skip)]
  match_set: HashSet<NodeId>,
}

impl SearchState {
  pub fn new(query: impl Into<String>, matches: Vec<NodeId>) -> Self {
    let match_set = matches.iter().cloned().collect();
    let current_index = if matches.is_empty() { None } else { Some(0) };
    Self {
      query: query.into(),
      matches,
      current_index,
      match_set,
    }
  }

  pub fn is_active(&self) -> bool {
    !self.query.is_empty()
  }

  pub fn is_match(&self, id: &NodeId) -> bool {
    self.match_set.contains(id)
  }

  pub fn current(&self) -> Option<&NodeId> {
    self.current_index.and_then(|i| self.matches.get(i))
  }

  /// Advance to the next match, wrapping to the first. No-op without matches.
  pub fn next(&mut self) -> Option<&NodeId> {
    let n = self.matches.len();
    if n == 0 {
      return None;
    }
    self.current_index = Some(self.current_index.map_or(0, |i| (i + 1) % n));
    self.current()
  }

  /// Step back to the previous match, wrapping to the last. No-op without matches.
  pub fn previous(&mut self) -> Option<&NodeId> {
    let n = self.matches.len();
    if n == 0 {
      return None;
    }
    self.current_index = Some(match self.current_index {
      Some(0) | None => n - 1,
      Some(i) => i - 1,
    });
    self.current()
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
  pub document_text: String,
  pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
  pub message: String,
  pub line: Option<usize>,
  pub column: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseDirection {
  SnakeToCamel,
  CamelToSnake,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseDepth {
  /// Convert every nested key.
  Deep,
  /// Convert only top-level keys.
  Shallow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ChangeKind {
  Repair,
  CaseConversion {
    direction: CaseDirection,
    depth: CaseDepth,
  },
}

/// A staged whole-document replacement awaiting accept/reject (shown as a diff by the host).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingChange {
  pub kind: ChangeKind,
  pub original: String,
  pub proposed: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Align {
  Start,
  #[default]
  Center,
  End,
  /// Keep the offset if the row is already fully visible, else scroll the least distance.
  Auto,
}

/// Inclusive row index range, already widened by overscan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisibleRange {
  pub start: usize,
  pub end: usize,
}

impl VisibleRange {
  pub fn len(&self) -> usize {
    self.end - self.start + 1
  }

  pub fn contains(&self, index: usize) -> bool {
    index >= self.start && index <= self.end
  }
}

/// Placement of one row inside the scroll container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VirtualRow {
  pub index: usize,
  pub id: NodeId,
  pub start: u32,
  pub size: u32,
}

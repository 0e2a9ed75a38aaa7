use serde_json::Value;

use crate::{
  expansion::ExpansionStore,
  models::{NodeId, PathSegment, Row, RowKind, SearchState},
};

/// Minimum rendered length (chars) at which a primitive becomes a truncation candidate.
pub const DEFAULT_TRUNCATE_MIN_CHARS: usize = 100;

/// Which container nodes the materializer descends into.
#[derive(Debug, Clone, Copy)]
pub enum Expansion<'a> {
  /// Every container is expanded (the initial "show everything" view).
  All,
  /// Only ids the store reports as expanded.
  Store(&'a ExpansionStore),
}

impl Expansion<'_> {
  fn is_root_expanded(&self) -> bool {
    match self {
      Expansion::All => true,
      Expansion::Store(s) => s.is_root_expanded(),
    }
  }

  fn is_expanded(&self, id: &NodeId) -> bool {
    match self {
      Expansion::All => true,
      Expansion::Store(s) => s.is_expanded(id),
    }
  }

  fn is_value_expanded(&self, id: &NodeId) -> bool {
    match self {
      Expansion::All => false,
      Expansion::Store(s) => s.is_value_expanded(id),
    }
  }
}

/// Flatten `value` into the ordered rows a tree view renders.
///
/// An absent or `null` document yields no rows. Pre-order over the root's children; the root
/// itself is not a row unless it is a primitive. Collapsed subtrees are never descended into.
pub fn materialize(
  value: Option<&Value>,
  expansion: Expansion<'_>,
  search: Option<&SearchState>,
  truncate_min_chars: usize,
) -> Vec<Row> {
  let value = match value {
    None | Some(Value::Null) => return vec![],
    Some(v) => v,
  };

  let mut ctx = Walk {
    expansion,
    search,
    truncate_min_chars,
    rows: Vec::new(),
  };

  match value {
    Value::Object(_) | Value::Array(_) => {
      if expansion.is_root_expanded() {
        let mut path = Vec::new();
        ctx.children(value, &mut path, 0);
      }
    }
    _ => {
      let id = NodeId::root();
      let row = ctx.row(id, String::new(), value, Vec::new(), 0);
      ctx.rows.push(row);
    }
  }

  tracing::debug!(rows = ctx.rows.len(), "materialized tree rows");
  ctx.rows
}

struct Walk<'a> {
  expansion: Expansion<'a>,
  search: Option<&'a SearchState>,
  truncate_min_chars: usize,
  rows: Vec<Row>,
}

impl Walk<'_> {
  fn children(&mut self, value: &Value, path: &mut Vec<PathSegment>, depth: usize) {
    match value {
      Value::Object(map) => {
        for (k, v) in map.iter() {
          path.push(PathSegment::Key(k.clone()));
          self.visit(k.clone(), v, path, depth);
          path.pop();
        }
      }
      Value::Array(arr) => {
        for (i, v) in arr.iter().enumerate() {
          path.push(PathSegment::Index(i));
          self.visit(i.to_string(), v, path, depth);
          path.pop();
        }
      }
      _ => {}
    }
  }

  fn visit(&mut self, key: String, value: &Value, path: &mut Vec<PathSegment>, depth: usize) {
    let id = NodeId::from_path(path);
    let descend = RowKind::of(value).is_container() && self.expansion.is_expanded(&id);
    let row = self.row(id, key, value, path.clone(), depth);
    self.rows.push(row);
    if descend {
      self.children(value, path, depth + 1);
    }
  }

  fn row(&self, id: NodeId, key: String, value: &Value, path: Vec<PathSegment>, depth: usize) -> Row {
    let kind = RowKind::of(value);
    let preview = preview(value);
    let is_truncated = !kind.is_container() && preview.chars().count() > self.truncate_min_chars;
    let (is_highlighted, is_current_match) = match self.search {
      Some(s) => (s.is_match(&id), s.current() == Some(&id)),
      None => (false, false),
    };
    Row {
      expanded: kind.is_container() && self.expansion.is_expanded(&id),
      is_value_expanded: self.expansion.is_value_expanded(&id),
      child_count: child_count(value),
      value: if kind.is_container() { None } else { Some(value.clone()) },
      id,
      depth,
      key,
      kind,
      path,
      preview,
      is_truncated,
      is_highlighted,
      is_current_match,
    }
  }
}

fn child_count(value: &Value) -> usize {
  match value {
    Value::Object(m) => m.len(),
    Value::Array(a) => a.len(),
    _ => 0,
  }
}

/// Rendered one-line form of a node: `Object {n}`, `Array [n]`, or the JSON encoding.
pub fn preview(value: &Value) -> String {
  match value {
    Value::Object(m) => format!("Object {{{}}}", m.len()),
    Value::Array(a) => format!("Array [{}]", a.len()),
    // Encoding a primitive cannot fail.
    other => serde_json::to_string(other).unwrap_or_default(),
  }
}

/// The text a row should display given `max_chars` of room.
///
/// Value-expanded rows always show the full preview.
pub fn display_value(row: &Row, max_chars: usize) -> String {
  if row.is_value_expanded || row.preview.chars().count() <= max_chars {
    return row.preview.clone();
  }
  let cut: String = row.preview.chars().take(max_chars).collect();
  format!("{cut}…")
}

/// Render a path as a JSONPath expression: `$`, `$.user.name`, `$.items[2]`.
pub fn json_path(path: &[PathSegment]) -> String {
  let mut out = String::from("$");
  for seg in path {
    match seg {
      PathSegment::Key(k) => {
        out.push('.');
        out.push_str(k);
      }
      PathSegment::Index(i) => {
        out.push('[');
        out.push_str(&i.to_string());
        out.push(']');
      }
    }
  }
  out
}

/// Every node id of `value` in full pre-order, the root excluded unless it is a non-null
/// primitive.
pub fn all_node_ids(value: &Value) -> Vec<NodeId> {
  let mut out = Vec::new();
  if value.is_null() {
    return out;
  }
  if !RowKind::of(value).is_container() {
    out.push(NodeId::root());
    return out;
  }
  let mut path = Vec::new();
  collect_ids(value, &mut path, &mut out, false);
  out
}

/// Ids of every object/array node below the root.
pub fn container_ids(value: &Value) -> Vec<NodeId> {
  let mut out = Vec::new();
  if RowKind::of(value).is_container() {
    let mut path = Vec::new();
    collect_ids(value, &mut path, &mut out, true);
  }
  out
}

fn collect_ids(value: &Value, path: &mut Vec<PathSegment>, out: &mut Vec<NodeId>, containers_only: bool) {
  let step = |seg: PathSegment, child: &Value, path: &mut Vec<PathSegment>, out: &mut Vec<NodeId>| {
    path.push(seg);
    let is_container = RowKind::of(child).is_container();
    if !containers_only || is_container {
      out.push(NodeId::from_path(path));
    }
    if is_container {
      collect_ids(child, path, out, containers_only);
    }
    path.pop();
  };
  match value {
    Value::Object(map) => {
      for (k, v) in map.iter() {
        step(PathSegment::Key(k.clone()), v, path, out);
      }
    }
    Value::Array(arr) => {
      for (i, v) in arr.iter().enumerate() {
        step(PathSegment::Index(i), v, path, out);
      }
    }
    _ => {}
  }
}

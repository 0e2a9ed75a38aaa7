use serde_json::Value;

use crate::models::{NodeId, PathSegment, SearchState};

/// A lowercased query ready for case-insensitive substring tests.
#[derive(Debug, Clone)]
pub(crate) struct PreparedSearch {
  q: String,
}

impl PreparedSearch {
  /// `None` for an empty or whitespace-only query (which means "clear").
  pub(crate) fn new(query: &str) -> Option<Self> {
    if query.trim().is_empty() {
      return None;
    }
    Some(Self {
      q: query.to_lowercase(),
    })
  }

  pub(crate) fn matches(&self, text: &str) -> bool {
    text.to_lowercase().contains(&self.q)
  }
}

/// Ids of every node whose key, or (for primitives) whose value, contains `query`.
///
/// Ordered by full pre-order traversal of `value`, ignoring expansion. A node is listed at most
/// once. Containers only match by key. `null` never matches by value.
pub fn search(value: &Value, query: &str) -> Vec<NodeId> {
  let Some(prepared) = PreparedSearch::new(query) else {
    return vec![];
  };
  let mut out = Vec::new();
  let mut path = Vec::new();
  search_recursive(value, &mut path, &prepared, &mut out);
  tracing::debug!(query_len = query.len(), matches = out.len(), "search finished");
  out
}

/// Run `search` and wrap the result as a fresh `SearchState`; empty queries give a cleared state.
pub fn search_state(value: Option<&Value>, query: &str) -> SearchState {
  if query.trim().is_empty() {
    return SearchState::default();
  }
  let matches = value.map(|v| search(v, query)).unwrap_or_default();
  SearchState::new(query, matches)
}

fn search_recursive(
  value: &Value,
  path: &mut Vec<PathSegment>,
  prepared: &PreparedSearch,
  out: &mut Vec<NodeId>,
) {
  let key_hit = path.last().is_some_and(|seg| prepared.matches(&seg.label()));
  let value_hit = !key_hit
    && match value {
      Value::String(s) => prepared.matches(s),
      Value::Number(n) => prepared.matches(&n.to_string()),
      Value::Bool(b) => prepared.matches(if *b { "true" } else { "false" }),
      _ => false,
    };
  if key_hit || value_hit {
    out.push(NodeId::from_path(path));
  }

  match value {
    Value::Object(map) => {
      for (k, v) in map.iter() {
        path.push(PathSegment::Key(k.clone()));
        search_recursive(v, path, prepared, out);
        path.pop();
      }
    }
    Value::Array(arr) => {
      for (i, v) in arr.iter().enumerate() {
        path.push(PathSegment::Index(i));
        search_recursive(v, path, prepared, out);
        path.pop();
      }
    }
    _ => {}
  }
}

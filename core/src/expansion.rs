use std::collections::HashSet;

use crate::models::NodeId;

/// Per-node expand/collapse and "show full value" flags.
///
/// The root is tracked apart from row ids and is expanded unless the user explicitly
/// collapses it. Every mutation bumps `revision`, which callers use as a cheap cache key.
#[derive(Debug, Clone, Default)]
pub struct ExpansionStore {
  expanded: HashSet<NodeId>,
  value_expanded: HashSet<NodeId>,
  root_collapsed: bool,
  revision: u64,
}

impl ExpansionStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn revision(&self) -> u64 {
    self.revision
  }

  pub fn is_root_expanded(&self) -> bool {
    !self.root_collapsed
  }

  pub fn is_expanded(&self, id: &NodeId) -> bool {
    self.expanded.contains(id)
  }

  pub fn is_value_expanded(&self, id: &NodeId) -> bool {
    self.value_expanded.contains(id)
  }

  /// Flip expansion of `id`; returns the new state.
  pub fn toggle(&mut self, id: &NodeId) -> bool {
    self.revision += 1;
    flip(&mut self.expanded, id)
  }

  /// Flip expansion of the document root; returns the new state.
  pub fn toggle_root(&mut self) -> bool {
    self.revision += 1;
    self.root_collapsed = !self.root_collapsed;
    !self.root_collapsed
  }

  /// Flip "show full value" of `id`; returns the new state.
  pub fn toggle_value(&mut self, id: &NodeId) -> bool {
    self.revision += 1;
    flip(&mut self.value_expanded, id)
  }

  pub fn set_expanded(&mut self, id: &NodeId, expanded: bool) {
    if self.is_expanded(id) != expanded {
      self.toggle(id);
    }
  }

  pub fn expand_all(&mut self, ids: impl IntoIterator<Item = NodeId>) {
    self.revision += 1;
    self.root_collapsed = false;
    self.expanded.extend(ids);
  }

  /// Collapse everything below the root.
  pub fn collapse_all(&mut self) {
    self.revision += 1;
    self.root_collapsed = false;
    self.expanded.clear();
  }

  pub fn expanded_count(&self) -> usize {
    self.expanded.len()
  }
}

fn flip(set: &mut HashSet<NodeId>, id: &NodeId) -> bool {
  if set.remove(id) {
    false
  } else {
    set.insert(id.clone());
    true
  }
}

use std::{
  collections::VecDeque,
  time::{SystemTime, UNIX_EPOCH},
};

use crate::models::HistoryEntry;

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Bounded undo stack of whole-document snapshots.
///
/// Pushing past capacity evicts the oldest entry. There is no redo.
#[derive(Debug, Clone)]
pub struct MutationHistory {
  capacity: usize,
  entries: VecDeque<HistoryEntry>,
}

impl Default for MutationHistory {
  fn default() -> Self {
    Self::new(DEFAULT_HISTORY_CAPACITY)
  }
}

impl MutationHistory {
  pub fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      capacity,
      entries: VecDeque::with_capacity(capacity),
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn can_undo(&self) -> bool {
    !self.entries.is_empty()
  }

  /// Snapshot `current_text`. Call once per accepted mutation, not per keystroke.
  pub fn push(&mut self, current_text: impl Into<String>) {
    if self.entries.len() == self.capacity {
      self.entries.pop_front();
      tracing::debug!(capacity = self.capacity, "history full, evicted oldest entry");
    }
    self.entries.push_back(HistoryEntry {
      document_text: current_text.into(),
      timestamp_ms: now_ms(),
    });
  }

  /// Pop the most recent snapshot. `None` on an empty stack.
  pub fn undo(&mut self) -> Option<String> {
    self.entries.pop_back().map(|e| e.document_text)
  }

  pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
    self.entries.iter()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}

fn now_ms() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as i64
}

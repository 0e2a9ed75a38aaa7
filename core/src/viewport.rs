use std::collections::HashMap;

use crate::models::{Align, NodeId, Row, VirtualRow, VisibleRange};

pub const DEFAULT_ROW_HEIGHT_ESTIMATE: u32 = 32;
pub const DEFAULT_OVERSCAN: usize = 10;

/// Offset table over variable row heights, decoupled from any renderer.
///
/// `offsets[i]` is the top of row `i`; `offsets[len]` is the total height. Measured heights are
/// keyed by `NodeId` so they survive re-materialization. A height change marks the tail of the
/// table dirty and it is rebuilt before the next query reads it.
#[derive(Debug, Clone)]
pub struct Virtualizer {
  estimate: u32,
  overscan: usize,
  ids: Vec<NodeId>,
  index_of: HashMap<NodeId, usize>,
  measured: HashMap<NodeId, u32>,
  offsets: Vec<u32>,
  dirty_from: Option<usize>,
  scroll_offset: u32,
  viewport_height: u32,
}

impl Default for Virtualizer {
  fn default() -> Self {
    Self::new(DEFAULT_ROW_HEIGHT_ESTIMATE, DEFAULT_OVERSCAN)
  }
}

impl Virtualizer {
  pub fn new(estimate: u32, overscan: usize) -> Self {
    Self {
      estimate: estimate.max(1),
      overscan,
      ids: Vec::new(),
      index_of: HashMap::new(),
      measured: HashMap::new(),
      offsets: vec![0],
      dirty_from: None,
      scroll_offset: 0,
      viewport_height: 0,
    }
  }

  /// Replace the row sequence. Must be called after every materialization pass.
  pub fn sync_rows(&mut self, rows: &[Row]) {
    self.ids = rows.iter().map(|r| r.id.clone()).collect();
    self.index_of = self
      .ids
      .iter()
      .enumerate()
      .map(|(i, id)| (id.clone(), i))
      .collect();
    self.offsets = vec![0; self.ids.len() + 1];
    self.dirty_from = Some(0);
    self.clamp_scroll();
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }

  pub fn index_of(&self, id: &NodeId) -> Option<usize> {
    self.index_of.get(id).copied()
  }

  pub fn row_height(&self, index: usize) -> u32 {
    self
      .ids
      .get(index)
      .and_then(|id| self.measured.get(id))
      .copied()
      .unwrap_or(self.estimate)
  }

  /// Record a measured height. Returns true if the offset table changed.
  pub fn measure(&mut self, id: &NodeId, height: u32) -> bool {
    let height = height.max(1);
    if self.measured.get(id) == Some(&height) {
      return false;
    }
    self.measured.insert(id.clone(), height);
    if let Some(index) = self.index_of(id) {
      self.mark_dirty(index);
    }
    true
  }

  /// Drop a measurement so the estimate applies until the host measures again.
  pub fn forget_measurement(&mut self, id: &NodeId) {
    if self.measured.remove(id).is_some() {
      if let Some(index) = self.index_of(id) {
        self.mark_dirty(index);
      }
    }
  }

  /// Drop every measurement; all rows fall back to the estimate.
  pub fn reset_measurements(&mut self) {
    if !self.measured.is_empty() {
      self.measured.clear();
      self.dirty_from = Some(0);
    }
  }

  pub fn scroll_offset(&self) -> u32 {
    self.scroll_offset
  }

  pub fn viewport_height(&self) -> u32 {
    self.viewport_height
  }

  pub fn set_viewport_height(&mut self, height: u32) {
    self.viewport_height = height;
    self.clamp_scroll();
  }

  pub fn set_scroll_offset(&mut self, offset: u32) {
    self.scroll_offset = offset;
    self.clamp_scroll();
  }

  pub fn total_size(&mut self) -> u32 {
    self.ensure_offsets();
    self.offsets[self.ids.len()]
  }

  pub fn row_start(&mut self, index: usize) -> Option<u32> {
    if index >= self.ids.len() {
      return None;
    }
    self.ensure_offsets();
    Some(self.offsets[index])
  }

  /// Rows intersecting `[scroll_offset, scroll_offset + viewport_height)`, widened by overscan.
  pub fn visible_range_at(&mut self, scroll_offset: u32, viewport_height: u32) -> Option<VisibleRange> {
    let n = self.ids.len();
    if n == 0 {
      return None;
    }
    self.ensure_offsets();
    let first = self.index_at(scroll_offset);
    let bottom = scroll_offset.saturating_add(viewport_height.max(1) - 1);
    let last = self.index_at(bottom).max(first);
    Some(VisibleRange {
      start: first.saturating_sub(self.overscan),
      end: (last + self.overscan).min(n - 1),
    })
  }

  pub fn visible_range(&mut self) -> Option<VisibleRange> {
    self.visible_range_at(self.scroll_offset, self.viewport_height)
  }

  /// Placement of every row in the current overscanned range.
  pub fn virtual_rows(&mut self) -> Vec<VirtualRow> {
    let Some(range) = self.visible_range() else {
      return vec![];
    };
    (range.start..=range.end)
      .map(|index| VirtualRow {
        index,
        id: self.ids[index].clone(),
        start: self.offsets[index],
        size: self.offsets[index + 1] - self.offsets[index],
      })
      .collect()
  }

  /// Scroll so that row `id` is placed per `align`. Returns the new offset, or `None` (and
  /// leaves the scroll position untouched) when `id` is not in the current row sequence.
  pub fn scroll_to_row(&mut self, id: &NodeId, align: Align) -> Option<u32> {
    let index = self.index_of(id)?;
    self.ensure_offsets();
    let start = self.offsets[index];
    let size = self.offsets[index + 1] - start;
    let end = start.saturating_add(size);
    let view = self.viewport_height;

    let target = match align {
      Align::Start => start,
      Align::End => end.saturating_sub(view),
      Align::Center => start.saturating_add(size / 2).saturating_sub(view / 2),
      Align::Auto => {
        if start >= self.scroll_offset && end <= self.scroll_offset.saturating_add(view) {
          self.scroll_offset
        } else if start < self.scroll_offset {
          start
        } else {
          end.saturating_sub(view)
        }
      }
    };
    self.scroll_offset = target;
    self.clamp_scroll();
    Some(self.scroll_offset)
  }

  fn mark_dirty(&mut self, index: usize) {
    let from = index + 1;
    self.dirty_from = Some(self.dirty_from.map_or(from, |d| d.min(from)));
  }

  fn ensure_offsets(&mut self) {
    let Some(from) = self.dirty_from.take() else {
      return;
    };
    let n = self.ids.len();
    let from = from.clamp(1, n.max(1));
    for i in from..=n {
      let height = self.row_height(i - 1);
      self.offsets[i] = self.offsets[i - 1].saturating_add(height);
    }
  }

  /// Largest `i` with `offsets[i] <= offset`, clamped to the last row.
  fn index_at(&self, offset: u32) -> usize {
    let n = self.ids.len();
    let tops = &self.offsets[..n];
    let i = tops.partition_point(|&top| top <= offset);
    i.saturating_sub(1).min(n.saturating_sub(1))
  }

  fn clamp_scroll(&mut self) {
    let total = self.total_size();
    let max = total.saturating_sub(self.viewport_height);
    if self.scroll_offset > max {
      self.scroll_offset = max;
    }
  }
}

use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use thiserror::Error;

use crate::{
  case_convert,
  document::{Document, DocumentParser, JsonRepair, SerdeJsonParser},
  expansion::ExpansionStore,
  history::{MutationHistory, DEFAULT_HISTORY_CAPACITY},
  models::{
    Align, CaseDepth, CaseDirection, ChangeKind, NodeId, ParseError, PendingChange, Row,
    SearchState, VirtualRow, VisibleRange,
  },
  search_match,
  tasks::{SearchScheduler, SearchTask, SearchTicket, DEFAULT_SEARCH_DEBOUNCE},
  tree::{self, Expansion, DEFAULT_TRUNCATE_MIN_CHARS},
  viewport::{Virtualizer, DEFAULT_OVERSCAN, DEFAULT_ROW_HEIGHT_ESTIMATE},
};

#[derive(Debug, Error)]
pub enum CoreError {
  #[error("no document loaded")]
  NoDocument,
  #[error("parse error: {0}")]
  Parse(#[from] ParseError),
  #[error("value is not an object or array")]
  NotAContainer,
  #[error("repair failed: {0}")]
  RepairFailed(String),
  #[error("no pending change")]
  NoPendingChange,
  #[error("serialize error: {0}")]
  Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct CoreOptions {
  /// Rendered length (chars) above which a primitive is flagged as a truncation candidate.
  pub truncate_min_chars: usize,
  pub history_capacity: usize,
  pub search_debounce: Duration,
  pub row_height_estimate: u32,
  pub overscan: usize,
  /// Run debounced searches on a worker thread instead of inside `tick`.
  pub background_search: bool,
}

impl Default for CoreOptions {
  fn default() -> Self {
    Self {
      truncate_min_chars: DEFAULT_TRUNCATE_MIN_CHARS,
      history_capacity: DEFAULT_HISTORY_CAPACITY,
      search_debounce: DEFAULT_SEARCH_DEBOUNCE,
      row_height_estimate: DEFAULT_ROW_HEIGHT_ESTIMATE,
      overscan: DEFAULT_OVERSCAN,
      background_search: false,
    }
  }
}

type CacheKey = (u64, u64, u64);

struct RowCache {
  key: CacheKey,
  rows: Arc<Vec<Row>>,
}

/// Document, tree view and search state behind one single-writer API.
///
/// Rows are recomputed lazily and memoized on the revisions of the document, the expansion
/// store and the search state. Every viewport query re-syncs the virtualizer against the
/// current rows first, so offsets are never computed from a stale row sequence.
pub struct CoreEngine {
  options: CoreOptions,
  parser: Box<dyn DocumentParser>,
  document: Document,
  expansion: ExpansionStore,
  search: SearchState,
  search_revision: u64,
  scheduler: SearchScheduler,
  in_flight: Option<SearchTask>,
  history: MutationHistory,
  pending: Option<PendingChange>,
  virtualizer: Virtualizer,
  cache: Option<RowCache>,
}

impl Default for CoreEngine {
  fn default() -> Self {
    Self::new(CoreOptions::default())
  }
}

impl CoreEngine {
  pub fn new(options: CoreOptions) -> Self {
    Self::with_parser(options, SerdeJsonParser)
  }

  pub fn with_parser(options: CoreOptions, parser: impl DocumentParser + 'static) -> Self {
    Self {
      parser: Box::new(parser),
      document: Document::default(),
      expansion: ExpansionStore::new(),
      search: SearchState::default(),
      search_revision: 0,
      scheduler: SearchScheduler::new(options.search_debounce),
      in_flight: None,
      history: MutationHistory::new(options.history_capacity),
      pending: None,
      virtualizer: Virtualizer::new(options.row_height_estimate, options.overscan),
      cache: None,
      options,
    }
  }

  pub fn options(&self) -> &CoreOptions {
    &self.options
  }

  // --- Document ---

  /// Replace the buffer (free-form edit). Does not touch history.
  ///
  /// A staged change was computed from the old text, so it is dropped.
  pub fn set_text(&mut self, text: impl Into<String>) {
    if let Some(change) = self.pending.take() {
      tracing::debug!(kind = ?change.kind, "document replaced, dropping pending change");
    }
    self.document.replace(text.into(), self.parser.as_ref());
    self.rerun_search();
  }

  pub fn text(&self) -> &str {
    self.document.text()
  }

  pub fn value(&self) -> Option<&serde_json::Value> {
    self.document.value()
  }

  pub fn parse_error(&self) -> Option<&ParseError> {
    self.document.error()
  }

  pub fn document(&self) -> &Document {
    &self.document
  }

  /// Install `new_text` as a discrete mutation: snapshot the current text, then replace it.
  pub fn apply_mutation(&mut self, new_text: impl Into<String>) {
    self.history.push(self.document.text());
    self.set_text(new_text);
  }

  /// Restore the most recent snapshot. `None` (and no change) when there is nothing to undo.
  pub fn undo(&mut self) -> Option<String> {
    let text = self.history.undo()?;
    self.set_text(text.clone());
    Some(text)
  }

  pub fn can_undo(&self) -> bool {
    self.history.can_undo()
  }

  pub fn history(&self) -> &MutationHistory {
    &self.history
  }

  // --- Repair / case conversion ---

  /// Stage a repaired copy of the current text for preview. Failure leaves everything unchanged.
  pub fn start_repair(&mut self, repairer: &dyn JsonRepair) -> Result<&PendingChange, CoreError> {
    let original = self.document.text().to_string();
    let repaired = repairer.repair(&original).map_err(|e| {
      tracing::warn!(error = %e, "repair failed");
      CoreError::RepairFailed(e)
    })?;
    if let Err(e) = self.parser.parse(&repaired) {
      tracing::warn!(error = %e, "repair produced unparseable text");
      return Err(CoreError::RepairFailed(e.message));
    }
    Ok(self.pending.insert(PendingChange {
      kind: ChangeKind::Repair,
      original,
      proposed: repaired,
    }))
  }

  /// Stage a key-case conversion of the current value for preview.
  pub fn start_case_conversion(
    &mut self,
    direction: CaseDirection,
    depth: CaseDepth,
  ) -> Result<&PendingChange, CoreError> {
    let value = match (self.document.value(), self.document.error()) {
      (Some(v), _) => v,
      (None, Some(e)) => return Err(CoreError::Parse(e.clone())),
      (None, None) => return Err(CoreError::NoDocument),
    };
    let converted = case_convert::convert_case(value, direction, depth).map_err(|e| {
      tracing::warn!(error = %e, "case conversion failed");
      e
    })?;
    let proposed = serde_json::to_string_pretty(&converted)?;
    Ok(self.pending.insert(PendingChange {
      kind: ChangeKind::CaseConversion { direction, depth },
      original: self.document.text().to_string(),
      proposed,
    }))
  }

  pub fn pending(&self) -> Option<&PendingChange> {
    self.pending.as_ref()
  }

  /// Accept the staged change: push the current text to history and install the proposal.
  pub fn accept_pending(&mut self) -> Result<(), CoreError> {
    let change = self.pending.take().ok_or(CoreError::NoPendingChange)?;
    tracing::info!(kind = ?change.kind, "accepting pending change");
    self.apply_mutation(change.proposed);
    Ok(())
  }

  pub fn reject_pending(&mut self) -> Option<PendingChange> {
    self.pending.take()
  }

  // --- Tree ---

  /// The current rows, recomputed only if the document, expansion or search changed.
  pub fn rows(&mut self) -> Arc<Vec<Row>> {
    self.refresh()
  }

  pub fn expansion(&self) -> &ExpansionStore {
    &self.expansion
  }

  pub fn toggle_expanded(&mut self, id: &NodeId) -> bool {
    self.expansion.toggle(id)
  }

  /// Collapse or re-expand the whole document; returns the new state.
  pub fn toggle_root_expanded(&mut self) -> bool {
    self.expansion.toggle_root()
  }

  /// Toggle "show full value"; the row's old measurement is dropped since its height changes.
  pub fn toggle_value_expanded(&mut self, id: &NodeId) -> bool {
    self.virtualizer.forget_measurement(id);
    self.expansion.toggle_value(id)
  }

  pub fn expand_all(&mut self) {
    let ids = self.document.value().map(tree::container_ids).unwrap_or_default();
    self.expansion.expand_all(ids);
  }

  pub fn collapse_all(&mut self) {
    self.expansion.collapse_all();
  }

  /// JSONPath of a visible row (for "copy path").
  pub fn row_json_path(&mut self, id: &NodeId) -> Option<String> {
    let rows = self.refresh();
    rows.iter().find(|r| &r.id == id).map(|r| tree::json_path(&r.path))
  }

  // --- Search ---

  pub fn search_state(&self) -> &SearchState {
    &self.search
  }

  /// Feed the search box. The query runs once input has been quiet for the debounce delay.
  pub fn search_input(&mut self, query: impl Into<String>, now: Instant) {
    self.scheduler.submit(query, now);
  }

  /// Run the search for `query` right away, superseding anything pending or in flight.
  pub fn search_now(&mut self, query: impl Into<String>) {
    self.cancel_in_flight();
    let ticket = self.scheduler.immediate(query);
    let matches = self
      .document
      .value()
      .map(|v| search_match::search(v, &ticket.query))
      .unwrap_or_default();
    self.apply_search(&ticket, matches);
  }

  pub fn clear_search(&mut self) {
    self.cancel_in_flight();
    self.scheduler.cancel();
    self.install_search(SearchState::default());
  }

  /// Drive time-based work: start a due debounced search and collect worker results.
  ///
  /// Returns true if the search state changed.
  pub fn tick(&mut self, now: Instant) -> bool {
    let mut changed = false;

    if let Some(ticket) = self.scheduler.take_due(now) {
      changed |= self.start_search(ticket);
    }

    let finished = self.in_flight.as_ref().and_then(|task| task.try_take());
    if let Some(matches) = finished {
      if let Some(task) = self.in_flight.take() {
        changed |= self.apply_search(task.ticket(), matches);
      }
    }
    changed
  }

  pub fn search_in_flight(&self) -> bool {
    self.in_flight.is_some() || self.scheduler.has_pending()
  }

  /// Install results for `ticket` unless a newer query has been issued since.
  pub fn apply_search(&mut self, ticket: &SearchTicket, matches: Vec<NodeId>) -> bool {
    if !self.scheduler.is_current(ticket) {
      tracing::debug!(generation = ticket.generation, "discarding stale search result");
      return false;
    }
    let state = if ticket.query.trim().is_empty() {
      SearchState::default()
    } else {
      SearchState::new(ticket.query.clone(), matches)
    };
    self.install_search(state);
    true
  }

  /// Move to the next match (wrapping) and scroll it into view if it has a row.
  pub fn next_match(&mut self) -> Option<NodeId> {
    let id = self.search.next().cloned()?;
    self.search_revision += 1;
    self.scroll_to_row(&id, Align::Center);
    Some(id)
  }

  /// Move to the previous match (wrapping) and scroll it into view if it has a row.
  pub fn previous_match(&mut self) -> Option<NodeId> {
    let id = self.search.previous().cloned()?;
    self.search_revision += 1;
    self.scroll_to_row(&id, Align::Center);
    Some(id)
  }

  fn start_search(&mut self, ticket: SearchTicket) -> bool {
    self.cancel_in_flight();
    match self.document.shared_value() {
      Some(value) if self.options.background_search && !ticket.query.trim().is_empty() => {
        self.in_flight = Some(SearchTask::spawn(value, ticket));
        false
      }
      value => {
        let matches = value
          .map(|v| search_match::search(&v, &ticket.query))
          .unwrap_or_default();
        self.apply_search(&ticket, matches)
      }
    }
  }

  fn rerun_search(&mut self) {
    if let Some(task) = self.in_flight.take() {
      task.cancel();
      let ticket = task.ticket().clone();
      self.start_search(ticket);
    }
    if self.search.is_active() {
      let state = search_match::search_state(self.document.value(), &self.search.query);
      self.install_search(state);
    }
  }

  fn cancel_in_flight(&mut self) {
    if let Some(task) = self.in_flight.take() {
      task.cancel();
    }
  }

  fn install_search(&mut self, state: SearchState) {
    self.search = state;
    self.search_revision += 1;
  }

  // --- Viewport ---

  pub fn set_viewport_height(&mut self, height: u32) {
    self.refresh();
    self.virtualizer.set_viewport_height(height);
  }

  pub fn set_scroll_offset(&mut self, offset: u32) {
    self.refresh();
    self.virtualizer.set_scroll_offset(offset);
  }

  pub fn scroll_offset(&mut self) -> u32 {
    self.refresh();
    self.virtualizer.scroll_offset()
  }

  /// Report a rendered row height. Returns true if layout changed.
  pub fn measure_row(&mut self, id: &NodeId, height: u32) -> bool {
    self.refresh();
    self.virtualizer.measure(id, height)
  }

  pub fn visible_range(&mut self) -> Option<VisibleRange> {
    self.refresh();
    self.virtualizer.visible_range()
  }

  pub fn virtual_rows(&mut self) -> Vec<VirtualRow> {
    self.refresh();
    self.virtualizer.virtual_rows()
  }

  pub fn total_size(&mut self) -> u32 {
    self.refresh();
    self.virtualizer.total_size()
  }

  /// Scroll `id` into view. `None` (no-op) when the id has no row, e.g. under a collapsed parent.
  pub fn scroll_to_row(&mut self, id: &NodeId, align: Align) -> Option<u32> {
    self.refresh();
    self.virtualizer.scroll_to_row(id, align)
  }

  fn refresh(&mut self) -> Arc<Vec<Row>> {
    let key = (
      self.document.revision(),
      self.expansion.revision(),
      self.search_revision,
    );
    if let Some(cache) = &self.cache {
      if cache.key == key {
        return cache.rows.clone();
      }
    }
    // Ids are positional, so heights measured for an older document do not apply.
    if self.cache.as_ref().map(|c| c.key.0) != Some(key.0) {
      self.virtualizer.reset_measurements();
    }

    let rows = Arc::new(tree::materialize(
      self.document.value(),
      Expansion::Store(&self.expansion),
      Some(&self.search),
      self.options.truncate_min_chars,
    ));
    self.virtualizer.sync_rows(&rows);
    self.cache = Some(RowCache {
      key,
      rows: rows.clone(),
    });
    rows
  }
}

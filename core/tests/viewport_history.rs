use std::{
  sync::Arc,
  thread,
  time::{Duration, Instant},
};

use jview_core::{
  materialize, Align, Expansion, MutationHistory, NodeId, Row, SearchScheduler, SearchTask,
  VisibleRange, Virtualizer,
};
use serde_json::{json, Map, Value};

fn flat_rows(n: usize) -> Vec<Row> {
  let mut obj = Map::new();
  for i in 0..n {
    obj.insert(format!("r{i}"), json!(i));
  }
  materialize(Some(&Value::Object(obj)), Expansion::All, None, 100)
}

fn virtualizer(n: usize, viewport: u32) -> Virtualizer {
  let mut v = Virtualizer::new(32, 10);
  v.sync_rows(&flat_rows(n));
  v.set_viewport_height(viewport);
  v
}

fn id(i: usize) -> NodeId {
  NodeId::from(format!("r{i}"))
}

// ----------------------------
// Virtualizer
// ----------------------------

#[test]
fn estimated_layout_and_initial_range() {
  let mut v = virtualizer(100, 320);
  assert_eq!(v.len(), 100);
  assert_eq!(v.total_size(), 3200);
  assert_eq!(v.row_start(10), Some(320));
  assert_eq!(v.row_start(100), None);
  // Rows 0..=9 are on screen, plus ten rows of overscan below.
  assert_eq!(v.visible_range(), Some(VisibleRange { start: 0, end: 19 }));
  assert_eq!(v.visible_range().unwrap().len(), 20);
}

#[test]
fn scroll_offset_is_clamped_to_content() {
  let mut v = virtualizer(100, 320);
  v.set_scroll_offset(1_000_000);
  assert_eq!(v.scroll_offset(), 2880);
  assert_eq!(v.visible_range(), Some(VisibleRange { start: 80, end: 99 }));

  v.set_scroll_offset(1600);
  let range = v.visible_range().unwrap();
  assert_eq!((range.start, range.end), (40, 69));
}

#[test]
fn content_shorter_than_viewport_never_scrolls() {
  let mut v = virtualizer(3, 320);
  v.set_scroll_offset(50);
  assert_eq!(v.scroll_offset(), 0);
  assert_eq!(v.visible_range(), Some(VisibleRange { start: 0, end: 2 }));
}

#[test]
fn empty_sequence_has_no_range() {
  let mut v = virtualizer(0, 320);
  assert!(v.is_empty());
  assert_eq!(v.total_size(), 0);
  assert_eq!(v.visible_range(), None);
  assert!(v.virtual_rows().is_empty());
}

#[test]
fn measurements_shift_following_offsets() {
  let mut v = virtualizer(100, 320);
  assert!(v.measure(&id(0), 100));
  assert!(!v.measure(&id(0), 100));
  assert_eq!(v.total_size(), 3268);
  assert_eq!(v.row_start(1), Some(100));
  assert_eq!(v.row_height(0), 100);
  assert_eq!(v.row_height(1), 32);

  // 100 + 7 * 32 = 324 covers the 320px viewport.
  assert_eq!(v.visible_range(), Some(VisibleRange { start: 0, end: 17 }));

  v.forget_measurement(&id(0));
  assert_eq!(v.total_size(), 3200);
}

#[test]
fn measurements_survive_resync_by_id() {
  let mut v = virtualizer(10, 320);
  v.measure(&id(5), 64);
  assert_eq!(v.total_size(), 352);

  // Row 5 now sits at index 0 of a shorter sequence.
  let rows: Vec<_> = flat_rows(10).into_iter().skip(5).collect();
  v.sync_rows(&rows);
  assert_eq!(v.index_of(&id(5)), Some(0));
  assert_eq!(v.row_height(0), 64);
  assert_eq!(v.total_size(), 64 + 4 * 32);
}

#[test]
fn virtual_rows_carry_positions() {
  let mut v = virtualizer(100, 64);
  v.measure(&id(1), 50);
  v.set_scroll_offset(32);
  let placed = v.virtual_rows();
  assert_eq!(placed.first().map(|r| r.index), Some(0));
  let second = &placed[1];
  assert_eq!(second.id, id(1));
  assert_eq!(second.start, 32);
  assert_eq!(second.size, 50);
  assert_eq!(placed[2].start, 82);
  for pair in placed.windows(2) {
    assert_eq!(pair[0].start + pair[0].size, pair[1].start);
  }
}

#[test]
fn scroll_to_row_alignment_modes() {
  let mut v = virtualizer(100, 320);
  let target = id(50);

  assert_eq!(v.scroll_to_row(&target, Align::Center), Some(1456));
  assert_eq!(v.scroll_to_row(&target, Align::Start), Some(1600));
  assert_eq!(v.scroll_to_row(&target, Align::End), Some(1312));

  // Already fully visible: stays put.
  v.set_scroll_offset(1500);
  assert_eq!(v.scroll_to_row(&target, Align::Auto), Some(1500));
  // Above the viewport: aligns to start.
  v.set_scroll_offset(2000);
  assert_eq!(v.scroll_to_row(&target, Align::Auto), Some(1600));
  // Below the viewport: aligns to end.
  v.set_scroll_offset(0);
  assert_eq!(v.scroll_to_row(&target, Align::Auto), Some(1312));
}

#[test]
fn scroll_to_edges_is_clamped() {
  let mut v = virtualizer(100, 320);
  assert_eq!(v.scroll_to_row(&id(0), Align::Center), Some(0));
  assert_eq!(v.scroll_to_row(&id(99), Align::Start), Some(2880));
}

#[test]
fn huge_measurements_saturate_instead_of_overflowing() {
  let mut v = virtualizer(3, 320);
  v.measure(&id(0), u32::MAX);
  v.measure(&id(1), u32::MAX);
  assert_eq!(v.total_size(), u32::MAX);
  assert_eq!(v.row_start(2), Some(u32::MAX));
  assert!(v.scroll_to_row(&id(0), Align::Center).is_some());
  assert!(v.scroll_to_row(&id(2), Align::End).is_some());
  assert!(v.scroll_offset() <= u32::MAX - 320);

  v.reset_measurements();
  assert_eq!(v.total_size(), 96);
}

#[test]
fn scroll_to_unknown_row_changes_nothing() {
  let mut v = virtualizer(100, 320);
  v.set_scroll_offset(640);
  assert_eq!(v.scroll_to_row(&NodeId::from("nope"), Align::Center), None);
  assert_eq!(v.scroll_offset(), 640);
}

// ----------------------------
// Mutation history
// ----------------------------

#[test]
fn history_is_lifo() {
  let mut h = MutationHistory::new(20);
  assert!(!h.can_undo());
  h.push("a");
  h.push("b");
  assert_eq!(h.len(), 2);
  assert_eq!(h.undo().as_deref(), Some("b"));
  assert_eq!(h.undo().as_deref(), Some("a"));
  assert_eq!(h.undo(), None);
  assert!(h.is_empty());
}

#[test]
fn history_evicts_oldest_beyond_capacity() {
  let mut h = MutationHistory::new(3);
  for s in ["1", "2", "3", "4", "5"] {
    h.push(s);
  }
  assert_eq!(h.len(), 3);
  let kept: Vec<_> = h.entries().map(|e| e.document_text.as_str()).collect();
  assert_eq!(kept, vec!["3", "4", "5"]);
  assert!(h.entries().all(|e| e.timestamp_ms > 0));
}

#[test]
fn zero_capacity_still_keeps_one_entry() {
  let mut h = MutationHistory::new(0);
  assert_eq!(h.capacity(), 1);
  h.push("x");
  h.push("y");
  assert_eq!(h.undo().as_deref(), Some("y"));
  assert!(!h.can_undo());

  h.push("z");
  h.clear();
  assert!(h.is_empty());
}

// ----------------------------
// Search scheduling
// ----------------------------

#[test]
fn debounce_restarts_on_every_submit() {
  let mut s = SearchScheduler::new(Duration::from_millis(300));
  let t0 = Instant::now();
  s.submit("a", t0);
  s.submit("ab", t0 + Duration::from_millis(200));
  assert!(s.take_due(t0 + Duration::from_millis(400)).is_none());
  let ticket = s.take_due(t0 + Duration::from_millis(500)).unwrap();
  assert_eq!(ticket.query, "ab");
  assert!(s.is_current(&ticket));
  assert!(!s.has_pending());
  assert!(s.take_due(t0 + Duration::from_millis(900)).is_none());
}

#[test]
fn newer_query_makes_older_ticket_stale() {
  let mut s = SearchScheduler::default();
  assert_eq!(s.delay(), Duration::from_millis(300));
  let old = s.immediate("a");
  let new = s.immediate("b");
  assert!(!s.is_current(&old));
  assert!(s.is_current(&new));

  s.submit("c", Instant::now());
  assert!(!s.is_current(&new));
  s.cancel();
  assert!(!s.has_pending());
}

fn poll(task: &SearchTask) -> Option<Vec<NodeId>> {
  let started = Instant::now();
  while started.elapsed() < Duration::from_secs(5) {
    if let Some(matches) = task.try_take() {
      return Some(matches);
    }
    thread::sleep(Duration::from_millis(1));
  }
  None
}

#[test]
fn search_task_runs_on_worker_thread() {
  let mut s = SearchScheduler::default();
  let value = Arc::new(json!({"alpha": 1, "beta": {"alphabet": 2}}));
  let task = SearchTask::spawn(value, s.immediate("alpha"));
  let matches = poll(&task).unwrap();
  assert_eq!(matches, vec![NodeId::from("alpha"), NodeId::from("beta.alphabet")]);
  // The result is handed out once.
  assert!(task.try_take().is_none());
  assert!(s.is_current(task.ticket()));
}

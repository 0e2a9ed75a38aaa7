use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  thread,
  time::{Duration, Instant},
};

use parking_lot::Mutex;
use serde_json::Value;

use crate::{models::NodeId, search_match};

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// A search that is due to run. `generation` identifies which query it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
  pub generation: u64,
  pub query: String,
}

/// Debounces search input and decides which results are still wanted.
///
/// Every submitted query bumps the generation; only results for the latest generation may be
/// applied, so a superseded computation is dropped rather than shown.
#[derive(Debug, Clone)]
pub struct SearchScheduler {
  delay: Duration,
  generation: u64,
  pending: Option<(SearchTicket, Instant)>,
}

impl Default for SearchScheduler {
  fn default() -> Self {
    Self::new(DEFAULT_SEARCH_DEBOUNCE)
  }
}

impl SearchScheduler {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      generation: 0,
      pending: None,
    }
  }

  pub fn delay(&self) -> Duration {
    self.delay
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  /// Record a keystroke's worth of query. Restarts the debounce timer.
  pub fn submit(&mut self, query: impl Into<String>, now: Instant) -> u64 {
    self.generation += 1;
    let ticket = SearchTicket {
      generation: self.generation,
      query: query.into(),
    };
    self.pending = Some((ticket, now + self.delay));
    self.generation
  }

  /// Issue a ticket that skips the debounce (and supersedes anything pending).
  pub fn immediate(&mut self, query: impl Into<String>) -> SearchTicket {
    self.generation += 1;
    self.pending = None;
    SearchTicket {
      generation: self.generation,
      query: query.into(),
    }
  }

  /// Drop any pending query and invalidate in-flight results.
  pub fn cancel(&mut self) {
    self.generation += 1;
    self.pending = None;
  }

  pub fn has_pending(&self) -> bool {
    self.pending.is_some()
  }

  /// Take the pending ticket once its quiet period has elapsed.
  pub fn take_due(&mut self, now: Instant) -> Option<SearchTicket> {
    match &self.pending {
      Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(t, _)| t),
      _ => None,
    }
  }

  pub fn is_current(&self, ticket: &SearchTicket) -> bool {
    ticket.generation == self.generation
  }
}

/// A search running on a worker thread.
pub struct SearchTask {
  ticket: SearchTicket,
  cancelled: Arc<AtomicBool>,
  result: Arc<Mutex<Option<Vec<NodeId>>>>,
}

impl SearchTask {
  pub fn spawn(value: Arc<Value>, ticket: SearchTicket) -> Self {
    let cancelled = Arc::new(AtomicBool::new(false));
    let result = Arc::new(Mutex::new(None));

    let query = ticket.query.clone();
    let cancelled_flag = cancelled.clone();
    let slot = result.clone();
    thread::spawn(move || {
      let matches = search_match::search(&value, &query);
      if !cancelled_flag.load(Ordering::SeqCst) {
        *slot.lock() = Some(matches);
      }
    });

    Self {
      ticket,
      cancelled,
      result,
    }
  }

  pub fn ticket(&self) -> &SearchTicket {
    &self.ticket
  }

  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::SeqCst);
  }

  /// Take the matches if the worker has finished.
  pub fn try_take(&self) -> Option<Vec<NodeId>> {
    self.result.lock().take()
  }
}

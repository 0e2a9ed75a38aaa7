mod case_convert;
mod document;
mod engine;
mod expansion;
mod history;
mod models;
mod search_match;
mod tasks;
mod tree;
mod viewport;

pub use crate::case_convert::{camel_to_snake, convert_case, convert_key, snake_to_camel};
pub use crate::document::{Document, DocumentParser, JsonRepair, SerdeJsonParser};
pub use crate::engine::{CoreEngine, CoreOptions};
pub use crate::expansion::ExpansionStore;
pub use crate::history::{MutationHistory, DEFAULT_HISTORY_CAPACITY};
pub use crate::models::{
  Align, CaseDepth, CaseDirection, ChangeKind, HistoryEntry, NodeId, ParseError, PathSegment,
  PendingChange, Row, RowKind, SearchState, VirtualRow, VisibleRange, ID_SEPARATOR, ROOT_ID,
};
pub use crate::search_match::{search, search_state};
pub use crate::tasks::{SearchScheduler, SearchTask, SearchTicket, DEFAULT_SEARCH_DEBOUNCE};
pub use crate::tree::{
  all_node_ids, container_ids, display_value, json_path, materialize, preview, Expansion,
  DEFAULT_TRUNCATE_MIN_CHARS,
};
pub use crate::viewport::{Virtualizer, DEFAULT_OVERSCAN, DEFAULT_ROW_HEIGHT_ESTIMATE};

pub use crate::engine::CoreError;

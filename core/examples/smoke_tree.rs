use std::time::Instant;

use jview_core::{display_value, CoreEngine, CoreOptions};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), String> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let mut args = std::env::args().skip(1);
  let path = args
    .next()
    .ok_or_else(|| "usage: cargo run -p jview_core --example smoke_tree -- <file.json> [query]".to_string())?;
  let query = args.next();

  let text = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
  let mut eng = CoreEngine::new(CoreOptions::default());
  eng.set_text(text);
  if let Some(err) = eng.parse_error() {
    return Err(format!("parse error at {:?}:{:?}: {}", err.line, err.column, err.message));
  }

  eng.expand_all();
  eng.set_viewport_height(640);
  let rows = eng.rows();
  println!("rows={} total_height={}", rows.len(), eng.total_size());
  for row in rows.iter().take(20) {
    println!("{}{}: {}", "  ".repeat(row.depth), row.key, display_value(row, 60));
  }

  if let Some(q) = query {
    let started = Instant::now();
    eng.search_now(q);
    println!(
      "matches={} in {:?}",
      eng.search_state().matches.len(),
      started.elapsed()
    );
    if let Some(id) = eng.next_match() {
      println!("current={} scroll_offset={}", id, eng.scroll_offset());
      if let Some(path) = eng.row_json_path(&id) {
        println!("path={path}");
      }
    }
  }
  Ok(())
}

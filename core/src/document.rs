use std::sync::Arc;

use serde_json::Value;

use crate::models::ParseError;

/// Turns document text into a value. The engine never implements JSON grammar itself.
pub trait DocumentParser: Send + Sync {
  fn parse(&self, text: &str) -> Result<Value, ParseError>;
}

/// Strict JSON via `serde_json`, reporting 1-based line/column.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonParser;

impl DocumentParser for SerdeJsonParser {
  fn parse(&self, text: &str) -> Result<Value, ParseError> {
    serde_json::from_str(text).map_err(|e| {
      let (line, column) = if e.line() == 0 {
        (None, None)
      } else {
        (Some(e.line()), Some(e.column()))
      };
      ParseError {
        message: e.to_string(),
        line,
        column,
      }
    })
  }
}

/// Best-effort repair of malformed JSON text. `Err` carries a human-readable reason.
pub trait JsonRepair {
  fn repair(&self, text: &str) -> Result<String, String>;
}

impl<F> JsonRepair for F
where
  F: Fn(&str) -> Result<String, String>,
{
  fn repair(&self, text: &str) -> Result<String, String> {
    self(text)
  }
}

/// The text buffer plus its parse outcome.
///
/// Empty or whitespace-only text is "no document": no value and no error.
#[derive(Debug, Clone, Default)]
pub struct Document {
  text: String,
  value: Option<Arc<Value>>,
  error: Option<ParseError>,
  revision: u64,
}

impl Document {
  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn value(&self) -> Option<&Value> {
    self.value.as_deref()
  }

  pub fn shared_value(&self) -> Option<Arc<Value>> {
    self.value.clone()
  }

  pub fn error(&self) -> Option<&ParseError> {
    self.error.as_ref()
  }

  pub fn revision(&self) -> u64 {
    self.revision
  }

  pub(crate) fn replace(&mut self, text: String, parser: &dyn DocumentParser) {
    self.revision += 1;
    if text.trim().is_empty() {
      self.value = None;
      self.error = None;
    } else {
      match parser.parse(&text) {
        Ok(v) => {
          self.value = Some(Arc::new(v));
          self.error = None;
        }
        Err(e) => {
          self.value = None;
          self.error = Some(e);
        }
      }
    }
    tracing::debug!(
      bytes = text.len(),
      parsed = self.value.is_some(),
      failed = self.error.is_some(),
      "document replaced"
    );
    self.text = text;
  }
}

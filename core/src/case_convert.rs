use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::{
  engine::CoreError,
  models::{CaseDepth, CaseDirection},
};

fn snake_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"_([a-z])").expect("static regex"))
}

fn upper_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"[A-Z]").expect("static regex"))
}

/// `user_name` -> `userName`. Only an underscore followed by a lowercase ASCII letter folds.
pub fn snake_to_camel(s: &str) -> String {
  snake_re()
    .replace_all(s, |c: &Captures| c[1].to_ascii_uppercase())
    .into_owned()
}

/// `userName` -> `user_name`. Every uppercase ASCII letter becomes `_` plus its lowercase.
pub fn camel_to_snake(s: &str) -> String {
  upper_re()
    .replace_all(s, |c: &Captures| format!("_{}", c[0].to_ascii_lowercase()))
    .into_owned()
}

pub fn convert_key(key: &str, direction: CaseDirection) -> String {
  match direction {
    CaseDirection::SnakeToCamel => snake_to_camel(key),
    CaseDirection::CamelToSnake => camel_to_snake(key),
  }
}

/// Rename object keys throughout `value`.
///
/// `Shallow` converts only the top-level keys (keys of objects sitting directly in a top-level
/// array count as top-level) and leaves everything below untouched. Fails unless `value` is an
/// object or array.
pub fn convert_case(value: &Value, direction: CaseDirection, depth: CaseDepth) -> Result<Value, CoreError> {
  match value {
    Value::Object(_) | Value::Array(_) => Ok(convert_at(value, direction, depth, 0)),
    _ => Err(CoreError::NotAContainer),
  }
}

fn convert_at(value: &Value, direction: CaseDirection, depth: CaseDepth, level: usize) -> Value {
  let shallow = depth == CaseDepth::Shallow;
  match value {
    Value::Array(arr) => {
      if shallow && level > 0 {
        return value.clone();
      }
      Value::Array(arr.iter().map(|v| convert_at(v, direction, depth, level)).collect())
    }
    Value::Object(map) => {
      let mut out = Map::with_capacity(map.len());
      for (k, v) in map.iter() {
        let key = if level == 0 || !shallow {
          convert_key(k, direction)
        } else {
          k.clone()
        };
        let child = if shallow && level >= 1 {
          v.clone()
        } else {
          convert_at(v, direction, depth, level + 1)
        };
        out.insert(key, child);
      }
      Value::Object(out)
    }
    other => other.clone(),
  }
}

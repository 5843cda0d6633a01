//! transit+json writer (non-verbose, cached).
//!
//! Builds a `serde_json::Value` tree from a [`Value`] and serializes it.
//! Integers outside the range a JSON reader can hold exactly
//! (±(2^53 - 1)) are written as `"~i<n>"` strings so 64-bit row counts
//! and ids survive the trip unchanged.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value as Json};

use super::cache::{WriteCache, MAP_AS_ARRAY};
use super::Value;
use crate::error::{PodError, Result};

/// Largest integer written as a plain JSON number.
pub const MAX_JSON_INT: i64 = (1 << 53) - 1;

/// Serialize a value tree as transit+json.
pub fn to_string(value: &Value) -> Result<String> {
    let mut writer = Writer {
        cache: WriteCache::new(),
    };
    let json = if is_composite(value) {
        writer.emit(value, false)?
    } else {
        // Top-level scalars are quoted.
        json!(["~#'", writer.emit(value, false)?])
    };
    serde_json::to_string(&json).map_err(|e| PodError::ResultEncode(e.to_string()))
}

fn is_composite(value: &Value) -> bool {
    matches!(
        value,
        Value::Vector(_) | Value::List(_) | Value::Set(_) | Value::Map(_) | Value::Tagged(..)
    )
}

struct Writer {
    cache: WriteCache,
}

impl Writer {
    fn string(&mut self, s: String, as_map_key: bool) -> Json {
        Json::String(self.cache.cache_write(s, as_map_key))
    }

    fn tag(&mut self, tag: &str) -> Json {
        self.string(format!("~#{tag}"), false)
    }

    fn emit(&mut self, value: &Value, as_map_key: bool) -> Result<Json> {
        let json = match value {
            Value::Null if as_map_key => self.string("~_".into(), true),
            Value::Null => Json::Null,
            Value::Bool(b) if as_map_key => {
                self.string(if *b { "~?t" } else { "~?f" }.into(), true)
            }
            Value::Bool(b) => Json::Bool(*b),
            Value::Integer(n) if as_map_key || !(-MAX_JSON_INT..=MAX_JSON_INT).contains(n) => {
                self.string(format!("~i{n}"), as_map_key)
            }
            Value::Integer(n) => Json::from(*n),
            Value::BigInt(s) => self.string(format!("~n{s}"), as_map_key),
            Value::Float(f) if f.is_nan() => self.string("~zNaN".into(), as_map_key),
            Value::Float(f) if f.is_infinite() => {
                let s = if *f > 0.0 { "~zINF" } else { "~z-INF" };
                self.string(s.into(), as_map_key)
            }
            Value::Float(f) if as_map_key => self.string(format!("~d{f}"), true),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .ok_or_else(|| PodError::ResultEncode(format!("cannot encode float {f}")))?,
            Value::BigDecimal(s) => self.string(format!("~f{s}"), as_map_key),
            Value::String(s) => {
                let escaped = if s.starts_with(['~', '^', '`']) {
                    format!("~{s}")
                } else {
                    s.clone()
                };
                self.string(escaped, as_map_key)
            }
            Value::Keyword(k) => self.string(format!("~:{k}"), as_map_key),
            Value::Symbol(s) => self.string(format!("~${s}"), as_map_key),
            Value::Char(c) => self.string(format!("~c{c}"), as_map_key),
            Value::Bytes(b) => self.string(format!("~b{}", BASE64.encode(b)), as_map_key),
            Value::Timestamp(ms) => self.string(format!("~m{ms}"), as_map_key),
            Value::Instant(s) => self.string(format!("~t{s}"), as_map_key),
            Value::Uuid(s) => self.string(format!("~u{s}"), as_map_key),
            Value::Uri(s) => self.string(format!("~r{s}"), as_map_key),
            Value::Vector(items) => Json::Array(self.emit_all(items)?),
            Value::List(items) => {
                let tag = self.tag("list");
                Json::Array(vec![tag, Json::Array(self.emit_all(items)?)])
            }
            Value::Set(items) => {
                let tag = self.tag("set");
                Json::Array(vec![tag, Json::Array(self.emit_all(items)?)])
            }
            Value::Map(entries) => self.emit_map(entries)?,
            Value::Tagged(tag, inner) => {
                if tag.is_empty() {
                    return Err(PodError::ResultEncode(
                        "cannot encode a tagged value with an empty tag".into(),
                    ));
                }
                let tag = self.tag(tag);
                Json::Array(vec![tag, self.emit(inner, false)?])
            }
        };
        Ok(json)
    }

    fn emit_all(&mut self, items: &[Value]) -> Result<Vec<Json>> {
        items.iter().map(|item| self.emit(item, false)).collect()
    }

    /// Maps with only scalar keys use the `["^ ", k, v, ...]` form; any
    /// composite key switches the whole map to `~#cmap`.
    fn emit_map(&mut self, entries: &[(Value, Value)]) -> Result<Json> {
        let stringable = entries.iter().all(|(k, _)| !is_composite(k));
        let mut out = Vec::with_capacity(entries.len() * 2 + 1);

        if stringable {
            out.push(Json::String(MAP_AS_ARRAY.to_string()));
            for (key, value) in entries {
                out.push(self.emit(key, true)?);
                out.push(self.emit(value, false)?);
            }
            return Ok(Json::Array(out));
        }

        let tag = self.tag("cmap");
        for (key, value) in entries {
            out.push(self.emit(key, false)?);
            out.push(self.emit(value, false)?);
        }
        Ok(Json::Array(vec![tag, Json::Array(out)]))
    }
}

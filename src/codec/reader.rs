//! transit+json reader.
//!
//! Parses the JSON text with `serde_json`, then walks the JSON tree turning
//! transit encodings back into [`Value`]s:
//!
//! - `"~:name"`, `"~$name"`, `"~i42"`, ... scalar tags on strings
//! - `["^ ", k, v, ...]` maps, `{"k": v}` verbose maps
//! - `["~#list", [...]]`, `["~#set", [...]]`, `["~#cmap", [...]]` tagged values
//! - `"^0"`, `"^1"`, ... cache references

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value as Json;

use super::cache::{is_cache_code, Cached, ReadCache, MAP_AS_ARRAY};
use super::Value;
use crate::error::{PodError, Result};

/// Parse a transit+json document into a value tree.
pub fn from_str(text: &str) -> Result<Value> {
    let json: Json = serde_json::from_str(text)?;
    let mut reader = Reader {
        cache: ReadCache::new(),
    };
    reader.value(&json, false)
}

fn invalid(message: impl Into<String>) -> PodError {
    PodError::ArgDecode(format!("invalid transit payload: {}", message.into()))
}

struct Reader {
    cache: ReadCache,
}

impl Reader {
    fn value(&mut self, json: &Json, as_map_key: bool) -> Result<Value> {
        match self.parse(json, as_map_key)? {
            Cached::Value(value) => Ok(value),
            Cached::Tag(tag) => Err(invalid(format!("tag ~#{tag} without a value"))),
        }
    }

    fn parse(&mut self, json: &Json, as_map_key: bool) -> Result<Cached> {
        let value = match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => number(n)?,
            Json::String(s) => return self.parse_string(s, as_map_key),
            Json::Array(items) => self.parse_array(items)?,
            Json::Object(map) => self.parse_object(map)?,
        };
        Ok(Cached::Value(value))
    }

    fn parse_string(&mut self, s: &str, as_map_key: bool) -> Result<Cached> {
        if is_cache_code(s) {
            return self
                .cache
                .lookup(s)
                .cloned()
                .ok_or_else(|| invalid(format!("unknown cache reference {s:?}")));
        }
        let parsed = decode_string(s)?;
        self.cache.remember(s, as_map_key, &parsed);
        Ok(parsed)
    }

    fn parse_array(&mut self, items: &[Json]) -> Result<Value> {
        let head = match items.first() {
            Some(Json::String(first)) if first == MAP_AS_ARRAY => {
                return self.map_entries(&items[1..], true).map(Value::Map);
            }
            Some(Json::String(first)) => self.parse_string(first, false)?,
            Some(other) => self.parse(other, false)?,
            None => return Ok(Value::Vector(Vec::new())),
        };

        match head {
            Cached::Tag(tag) => {
                if items.len() != 2 {
                    return Err(invalid(format!(
                        "tag ~#{tag} must be followed by exactly one value"
                    )));
                }
                self.tagged(tag, &items[1])
            }
            Cached::Value(first) => {
                let mut out = Vec::with_capacity(items.len());
                out.push(first);
                for item in &items[1..] {
                    out.push(self.value(item, false)?);
                }
                Ok(Value::Vector(out))
            }
        }
    }

    fn parse_object(&mut self, map: &serde_json::Map<String, Json>) -> Result<Value> {
        if map.len() == 1 {
            if let Some((key, inner)) = map.iter().next() {
                if key.starts_with("~#") || is_cache_code(key) {
                    if let Cached::Tag(tag) = self.parse_string(key, true)? {
                        return self.tagged(tag, inner);
                    }
                }
            }
        }

        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            let key = match self.parse_string(key, true)? {
                Cached::Value(k) => k,
                Cached::Tag(tag) => return Err(invalid(format!("tag ~#{tag} used as a map key"))),
            };
            entries.push((key, self.value(value, false)?));
        }
        Ok(Value::Map(entries))
    }

    /// Read alternating keys and values.
    fn map_entries(&mut self, items: &[Json], keys_as_map_keys: bool) -> Result<Vec<(Value, Value)>> {
        if items.len() % 2 != 0 {
            return Err(invalid("map has an odd number of entries"));
        }
        items
            .chunks(2)
            .map(|pair| {
                let key = self.value(&pair[0], keys_as_map_keys)?;
                let value = self.value(&pair[1], false)?;
                Ok((key, value))
            })
            .collect()
    }

    fn tagged(&mut self, tag: String, inner: &Json) -> Result<Value> {
        match tag.as_str() {
            "'" => return self.value(inner, false),
            "list" => return self.elements(&tag, inner).map(Value::List),
            "set" => return self.elements(&tag, inner).map(Value::Set),
            "cmap" => {
                let items = inner
                    .as_array()
                    .ok_or_else(|| invalid("~#cmap expects an array"))?;
                return self.map_entries(items, false).map(Value::Map);
            }
            _ => {}
        }
        let value = self.value(inner, false)?;
        Ok(Value::Tagged(tag, Box::new(value)))
    }

    fn elements(&mut self, tag: &str, inner: &Json) -> Result<Vec<Value>> {
        inner
            .as_array()
            .ok_or_else(|| invalid(format!("~#{tag} expects an array")))?
            .iter()
            .map(|item| self.value(item, false))
            .collect()
    }
}

fn number(n: &serde_json::Number) -> Result<Value> {
    if let Some(i) = n.as_i64() {
        Ok(Value::Integer(i))
    } else if n.is_u64() {
        Ok(Value::BigInt(n.to_string()))
    } else {
        n.as_f64()
            .map(Value::Float)
            .ok_or_else(|| invalid(format!("unrepresentable number {n}")))
    }
}

fn is_integer_text(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Decode one JSON string into a value or a tag.
fn decode_string(s: &str) -> Result<Cached> {
    let Some(body) = s.strip_prefix('~') else {
        return Ok(Cached::Value(Value::String(s.to_string())));
    };
    let Some(marker) = body.chars().next() else {
        return Ok(Cached::Value(Value::String(s.to_string())));
    };
    let rest = &body[marker.len_utf8()..];

    let value = match marker {
        '~' | '^' | '`' => Value::String(body.to_string()),
        '#' => return Ok(Cached::Tag(rest.to_string())),
        ':' => Value::Keyword(rest.to_string()),
        '$' => Value::Symbol(rest.to_string()),
        '_' => Value::Null,
        '?' => match rest {
            "t" => Value::Bool(true),
            "f" => Value::Bool(false),
            _ => return Err(invalid(format!("bad boolean {s:?}"))),
        },
        'i' => match rest.parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) if is_integer_text(rest) => Value::BigInt(rest.to_string()),
            Err(_) => return Err(invalid(format!("bad integer {s:?}"))),
        },
        'n' if is_integer_text(rest) => Value::BigInt(rest.to_string()),
        'd' => rest
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid(format!("bad float {s:?}")))?,
        'f' => Value::BigDecimal(rest.to_string()),
        'z' => match rest {
            "NaN" => Value::Float(f64::NAN),
            "INF" => Value::Float(f64::INFINITY),
            "-INF" => Value::Float(f64::NEG_INFINITY),
            _ => return Err(invalid(format!("bad special number {s:?}"))),
        },
        'm' => rest
            .parse::<i64>()
            .map(Value::Timestamp)
            .map_err(|_| invalid(format!("bad timestamp {s:?}")))?,
        't' => Value::Instant(rest.to_string()),
        'u' => Value::Uuid(rest.to_string()),
        'r' => Value::Uri(rest.to_string()),
        'b' => BASE64
            .decode(rest)
            .map(Value::Bytes)
            .map_err(|e| invalid(format!("bad base64 in {s:?}: {e}")))?,
        'c' => {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => return Err(invalid(format!("bad char {s:?}"))),
            }
        }
        'n' => return Err(invalid(format!("bad bigint {s:?}"))),
        other => Value::Tagged(other.to_string(), Box::new(Value::String(rest.to_string()))),
    };
    Ok(Cached::Value(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(from_str("[\"~#'\",\"hi\"]").unwrap(), Value::from("hi"));
        assert_eq!(from_str("[\"~#'\",42]").unwrap(), Value::Integer(42));
        assert_eq!(from_str("[\"~#'\",null]").unwrap(), Value::Null);
        assert_eq!(from_str("[\"~#'\",1.5]").unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_vector_of_tagged_strings() {
        let value = from_str(r#"["~:kw","~$sym","~i9007199254740993","~n123","~~tilde","~^caret","~_","~?t"]"#)
            .unwrap();
        assert_eq!(
            value,
            Value::Vector(vec![
                Value::keyword("kw"),
                Value::Symbol("sym".into()),
                Value::Integer(9_007_199_254_740_993),
                Value::BigInt("123".into()),
                Value::from("~tilde"),
                Value::from("^caret"),
                Value::Null,
                Value::Bool(true),
            ])
        );
    }

    #[test]
    fn test_list_and_set() {
        assert_eq!(
            from_str(r#"["~#list",["SELECT 1"]]"#).unwrap(),
            Value::List(vec![Value::from("SELECT 1")])
        );
        assert_eq!(
            from_str(r#"["~#set",[1,2]]"#).unwrap(),
            Value::Set(vec![Value::Integer(1), Value::Integer(2)])
        );
    }

    #[test]
    fn test_map_as_array_and_verbose() {
        let expected = Value::Map(vec![(Value::keyword("a"), Value::Integer(1))]);
        assert_eq!(from_str(r#"["^ ","~:a",1]"#).unwrap(), expected);
        assert_eq!(from_str(r#"{"~:a":1}"#).unwrap(), expected);
    }

    #[test]
    fn test_cache_references() {
        let value = from_str(
            r#"[["^ ","~:name","x","~:rows",1],["^ ","^0","y","^1",2],["~#list",[]],["^2",[3]]]"#,
        )
        .unwrap();
        let rows = value.as_sequence().unwrap();
        assert_eq!(rows[1].get_keyword("name"), Some(&Value::from("y")));
        assert_eq!(rows[1].get_keyword("rows"), Some(&Value::Integer(2)));
        assert_eq!(rows[2], Value::List(vec![]));
        assert_eq!(rows[3], Value::List(vec![Value::Integer(3)]));
    }

    #[test]
    fn test_string_map_keys_are_cached() {
        let value = from_str(r#"[["^ ","column",1],["^ ","^0",2]]"#).unwrap();
        let rows = value.as_sequence().unwrap();
        assert_eq!(
            rows[1],
            Value::Map(vec![(Value::from("column"), Value::Integer(2))])
        );
    }

    #[test]
    fn test_cmap_and_unknown_tag() {
        assert_eq!(
            from_str(r#"["~#cmap",[[1,2],"v"]]"#).unwrap(),
            Value::Map(vec![(
                Value::Vector(vec![Value::Integer(1), Value::Integer(2)]),
                Value::from("v")
            )])
        );
        assert_eq!(
            from_str(r#"["~#point",[1,2]]"#).unwrap(),
            Value::Tagged(
                "point".into(),
                Box::new(Value::Vector(vec![Value::Integer(1), Value::Integer(2)]))
            )
        );
    }

    #[test]
    fn test_bytes_and_special_floats() {
        let value = from_str(r#"["~bAQID","~zINF","~m1000","~cx"]"#).unwrap();
        let items = value.as_sequence().unwrap();
        assert_eq!(items[0], Value::Bytes(vec![1, 2, 3]));
        assert_eq!(items[1], Value::Float(f64::INFINITY));
        assert_eq!(items[2], Value::Timestamp(1000));
        assert_eq!(items[3], Value::Char('x'));
    }

    #[test]
    fn test_errors() {
        assert!(from_str("not json").is_err());
        assert!(from_str(r#"["^9"]"#).is_err());
        assert!(from_str(r#"["^ ","~:a"]"#).is_err());
        assert!(from_str(r#"["~#list",1]"#).is_err());
        assert!(from_str(r#"["~#list"]"#).is_err());
        assert!(from_str(r#"["~?x"]"#).is_err());
    }
}

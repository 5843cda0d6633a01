//! Bencode encoding and decoding.
//!
//! Implements the four bencode types used by the envelope:
//! ```text
//! integer     i<decimal>e          i42e, i-7e
//! byte string <length>:<bytes>     4:spam
//! list        l<items>e            l4:spami42ee
//! dictionary  d<key><value>...e    d2:op8:describee
//! ```
//!
//! Dictionaries are kept in a `BTreeMap`, so encoding always emits keys in
//! sorted byte order.

use std::collections::BTreeMap;

/// Maximum nesting depth accepted by the decoder.
pub const MAX_DEPTH: usize = 64;

/// A decoded bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bencode {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<Bencode>),
    Dict(BTreeMap<Vec<u8>, Bencode>),
}

impl Bencode {
    /// Build a dictionary from string keys.
    pub fn dict<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Bencode)>,
    {
        Bencode::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (k.as_bytes().to_vec(), v))
                .collect(),
        )
    }

    /// Look up a key in a dictionary.
    pub fn get(&self, key: &str) -> Option<&Bencode> {
        match self {
            Bencode::Dict(map) => map.get(key.as_bytes()),
            _ => None,
        }
    }

    /// Borrow the contents of a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Bencode::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Borrow a byte string as UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Borrow the items of a list.
    pub fn as_list(&self) -> Option<&[Bencode]> {
        match self {
            Bencode::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Bencode::Int(_) => "integer",
            Bencode::Bytes(_) => "string",
            Bencode::List(_) => "list",
            Bencode::Dict(_) => "dictionary",
        }
    }

    /// Encode this value into a new byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    /// Append the encoding of this value to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Bencode::Int(n) => {
                out.push(b'i');
                out.extend_from_slice(n.to_string().as_bytes());
                out.push(b'e');
            }
            Bencode::Bytes(b) => encode_bytes(b, out),
            Bencode::List(items) => {
                out.push(b'l');
                for item in items {
                    item.encode_into(out);
                }
                out.push(b'e');
            }
            Bencode::Dict(map) => {
                out.push(b'd');
                for (key, value) in map {
                    encode_bytes(key, out);
                    value.encode_into(out);
                }
                out.push(b'e');
            }
        }
    }
}

impl From<&str> for Bencode {
    fn from(s: &str) -> Self {
        Bencode::Bytes(s.as_bytes().to_vec())
    }
}

impl From<String> for Bencode {
    fn from(s: String) -> Self {
        Bencode::Bytes(s.into_bytes())
    }
}

impl From<i64> for Bencode {
    fn from(n: i64) -> Self {
        Bencode::Int(n)
    }
}

fn encode_bytes(b: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(b.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(b);
}

/// Why a decode attempt did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended before the structure was complete.
    Incomplete,
    /// Input is malformed at byte offset `at`.
    Invalid { at: usize, reason: String },
}

impl DecodeError {
    fn invalid(at: usize, reason: impl Into<String>) -> Self {
        DecodeError::Invalid {
            at,
            reason: reason.into(),
        }
    }
}

/// Decode one value from the start of `buf`.
///
/// Returns the value and the number of bytes it occupied. Trailing bytes are
/// left untouched. `max_len` bounds any single byte string length.
pub fn decode(buf: &[u8], max_len: usize) -> Result<(Bencode, usize), DecodeError> {
    let mut decoder = Decoder {
        buf,
        pos: 0,
        max_len,
    };
    let value = decoder.value(0)?;
    Ok((value, decoder.pos))
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    max_len: usize,
}

impl Decoder<'_> {
    fn peek(&self) -> Result<u8, DecodeError> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::Incomplete)
    }

    fn value(&mut self, depth: usize) -> Result<Bencode, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::invalid(
                self.pos,
                format!("nesting deeper than {MAX_DEPTH}"),
            ));
        }
        match self.peek()? {
            b'i' => {
                self.pos += 1;
                let n = self.integer(b'e')?;
                Ok(Bencode::Int(n))
            }
            b'0'..=b'9' => self.byte_string().map(Bencode::Bytes),
            b'l' => {
                self.pos += 1;
                let mut items = Vec::new();
                while self.peek()? != b'e' {
                    items.push(self.value(depth + 1)?);
                }
                self.pos += 1;
                Ok(Bencode::List(items))
            }
            b'd' => {
                self.pos += 1;
                let mut map = BTreeMap::new();
                while self.peek()? != b'e' {
                    let key_at = self.pos;
                    if !self.peek()?.is_ascii_digit() {
                        return Err(DecodeError::invalid(
                            key_at,
                            "dictionary key must be a byte string",
                        ));
                    }
                    let key = self.byte_string()?;
                    let value = self.value(depth + 1)?;
                    if map.insert(key, value).is_some() {
                        return Err(DecodeError::invalid(key_at, "duplicate dictionary key"));
                    }
                }
                self.pos += 1;
                Ok(Bencode::Dict(map))
            }
            other => Err(DecodeError::invalid(
                self.pos,
                format!("unexpected byte 0x{other:02x}"),
            )),
        }
    }

    /// Parse a decimal integer terminated by `end`, consuming the terminator.
    fn integer(&mut self, end: u8) -> Result<i64, DecodeError> {
        let start = self.pos;
        loop {
            let b = self.peek()?;
            if b == end {
                break;
            }
            if !(b.is_ascii_digit() || (b == b'-' && self.pos == start)) {
                return Err(DecodeError::invalid(
                    self.pos,
                    format!("invalid byte 0x{b:02x} in integer"),
                ));
            }
            self.pos += 1;
        }
        let digits = &self.buf[start..self.pos];
        let canonical = match digits {
            [] | [b'-'] => false,
            [b'-', b'0', ..] => false,
            [b'0', _, ..] => false,
            _ => true,
        };
        if !canonical {
            return Err(DecodeError::invalid(start, "malformed integer"));
        }
        // Only ASCII digits and a leading '-' reach this point.
        let text = std::str::from_utf8(digits).unwrap_or_default();
        let n = text
            .parse::<i64>()
            .map_err(|_| DecodeError::invalid(start, "integer out of range"))?;
        self.pos += 1;
        Ok(n)
    }

    fn byte_string(&mut self) -> Result<Vec<u8>, DecodeError> {
        let start = self.pos;
        let len = self.integer(b':')?;
        if len < 0 {
            return Err(DecodeError::invalid(start, "negative string length"));
        }
        let len = len as usize;
        if len > self.max_len {
            return Err(DecodeError::invalid(
                start,
                format!("string length {len} exceeds maximum {}", self.max_len),
            ));
        }
        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| DecodeError::invalid(start, "string length overflow"))?;
        if end > self.buf.len() {
            return Err(DecodeError::Incomplete);
        }
        let bytes = self.buf[self.pos..end].to_vec();
        self.pos = end;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(buf: &[u8]) -> Bencode {
        let (value, used) = decode(buf, usize::MAX).unwrap();
        assert_eq!(used, buf.len());
        value
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode_all(b"i42e"), Bencode::Int(42));
        assert_eq!(decode_all(b"i-7e"), Bencode::Int(-7));
        assert_eq!(decode_all(b"i0e"), Bencode::Int(0));
        assert_eq!(decode_all(b"4:spam"), Bencode::from("spam"));
        assert_eq!(decode_all(b"0:"), Bencode::Bytes(Vec::new()));
    }

    #[test]
    fn test_decode_nested() {
        let value = decode_all(b"d2:op6:invoke4:varsl1:a1:bee");
        assert_eq!(value.get("op").and_then(Bencode::as_str), Some("invoke"));
        let vars = value.get("vars").and_then(Bencode::as_list).unwrap();
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn test_dict_keys_sorted_on_encode() {
        let dict = Bencode::dict([("value", "x".into()), ("id", "1".into())]);
        assert_eq!(dict.encode(), b"d2:id1:15:value1:xe");
    }

    #[test]
    fn test_incomplete_input() {
        for partial in [&b"d2:op"[..], b"d2:op8:desc", b"i12", b"l", b"5:ab"] {
            assert_eq!(decode(partial, usize::MAX), Err(DecodeError::Incomplete));
        }
    }

    #[test]
    fn test_trailing_bytes_not_consumed() {
        let (value, used) = decode(b"i1ei2e", usize::MAX).unwrap();
        assert_eq!(value, Bencode::Int(1));
        assert_eq!(used, 3);
    }

    #[test]
    fn test_invalid_integers() {
        for bad in [&b"ie"[..], b"i-e", b"i-0e", b"i03e", b"i1x2e"] {
            assert!(
                matches!(decode(bad, usize::MAX), Err(DecodeError::Invalid { .. })),
                "{:?} should be invalid",
                String::from_utf8_lossy(bad)
            );
        }
    }

    #[test]
    fn test_invalid_structure() {
        assert!(matches!(
            decode(b"x", usize::MAX),
            Err(DecodeError::Invalid { at: 0, .. })
        ));
        assert!(matches!(
            decode(b"di1e1:ae", usize::MAX),
            Err(DecodeError::Invalid { at: 1, .. })
        ));
        assert!(matches!(
            decode(b"d1:a1:b1:a1:ce", usize::MAX),
            Err(DecodeError::Invalid { .. })
        ));
    }

    #[test]
    fn test_string_length_limit() {
        let err = decode(b"100:", 10).unwrap_err();
        assert!(matches!(err, DecodeError::Invalid { at: 0, .. }));
    }

    #[test]
    fn test_depth_limit() {
        let mut deep = vec![b'l'; MAX_DEPTH + 2];
        deep.extend(vec![b'e'; MAX_DEPTH + 2]);
        assert!(matches!(
            decode(&deep, usize::MAX),
            Err(DecodeError::Invalid { .. })
        ));
    }

    #[test]
    fn test_encode_decode_envelope() {
        let response = Bencode::dict([
            ("id", "abc".into()),
            (
                "status",
                Bencode::List(vec!["done".into(), "error".into()]),
            ),
            ("ex-message", "boom".into()),
        ]);
        let bytes = response.encode();
        assert_eq!(decode_all(&bytes), response);
    }
}

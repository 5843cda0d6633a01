//! Transit string caches.
//!
//! In non-verbose transit+json, a cacheable string is written in full the
//! first time and replaced by a short `^` code on later occurrences. A
//! string is cacheable when it is longer than three characters and is
//! either a map key or a keyword, symbol or tag (`~:`, `~$`, `~#`).
//!
//! Codes index the cache in base 44 starting at `'0'`: `^0`..`^[` for the
//! first 44 entries, then two-digit codes. The cache resets once it holds
//! 44 * 44 entries.

use std::collections::HashMap;

use super::Value;

const CACHE_CODE_DIGITS: usize = 44;
const BASE_CHAR: u8 = b'0';
const MAX_ENTRIES: usize = CACHE_CODE_DIGITS * CACHE_CODE_DIGITS;
const MIN_SIZE_CACHEABLE: usize = 4;

/// Prefix of every cache reference.
pub const SUB: char = '^';

/// Map-as-array marker, never a cache reference.
pub const MAP_AS_ARRAY: &str = "^ ";

/// Whether `s` is eligible for caching.
pub fn is_cacheable(s: &str, as_map_key: bool) -> bool {
    s.len() >= MIN_SIZE_CACHEABLE
        && (as_map_key || s.starts_with("~#") || s.starts_with("~:") || s.starts_with("~$"))
}

/// Whether `s` is a cache reference rather than a literal.
pub fn is_cache_code(s: &str) -> bool {
    s.starts_with(SUB) && s != MAP_AS_ARRAY && s.len() > 1
}

fn index_to_code(index: usize) -> String {
    let hi = index / CACHE_CODE_DIGITS;
    let lo = index % CACHE_CODE_DIGITS;
    let mut code = String::with_capacity(3);
    code.push(SUB);
    if hi > 0 {
        code.push((hi as u8 + BASE_CHAR) as char);
    }
    code.push((lo as u8 + BASE_CHAR) as char);
    code
}

fn code_to_index(code: &str) -> Option<usize> {
    let digit = |b: u8| -> Option<usize> {
        let d = b.checked_sub(BASE_CHAR)? as usize;
        (d < CACHE_CODE_DIGITS).then_some(d)
    };
    match code.as_bytes() {
        [b'^', lo] => digit(*lo),
        [b'^', hi, lo] => Some(digit(*hi)? * CACHE_CODE_DIGITS + digit(*lo)?),
        _ => None,
    }
}

/// Cache used while writing.
#[derive(Debug, Default)]
pub struct WriteCache {
    entries: HashMap<String, String>,
}

impl WriteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the code for `s` if it was seen before, otherwise record it
    /// and return it unchanged.
    pub fn cache_write(&mut self, s: String, as_map_key: bool) -> String {
        if !is_cacheable(&s, as_map_key) {
            return s;
        }
        if let Some(code) = self.entries.get(&s) {
            return code.clone();
        }
        if self.entries.len() == MAX_ENTRIES {
            self.entries.clear();
        }
        let code = index_to_code(self.entries.len());
        self.entries.insert(s.clone(), code);
        s
    }
}

/// A parsed cache entry: either a tag or a finished value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cached {
    Tag(String),
    Value(Value),
}

/// Cache used while reading.
#[derive(Debug, Default)]
pub struct ReadCache {
    entries: Vec<Cached>,
}

impl ReadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a cache reference.
    pub fn lookup(&self, code: &str) -> Option<&Cached> {
        code_to_index(code).and_then(|i| self.entries.get(i))
    }

    /// Remember a parsed string if its raw form is cacheable.
    pub fn remember(&mut self, raw: &str, as_map_key: bool, parsed: &Cached) {
        if !is_cacheable(raw, as_map_key) {
            return;
        }
        if self.entries.len() == MAX_ENTRIES {
            self.entries.clear();
        }
        self.entries.push(parsed.clone());
    }
}

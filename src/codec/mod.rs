//! Codec module - the transit+json interchange format.
//!
//! Request `args` and response `value` strings carried inside the bencode
//! envelope are transit+json documents. This module provides:
//!
//! - [`Value`] - the closed value tree every payload decodes into
//! - [`reader::from_str`] - transit+json text to [`Value`]
//! - [`writer::to_string`] - [`Value`] to non-verbose transit+json text
//!
//! # Example
//!
//! ```
//! use sqlpod::codec::{self, Value};
//!
//! let value = codec::from_str(r#"["~#list",["SELECT ?",42]]"#).unwrap();
//! assert_eq!(
//!     value,
//!     Value::List(vec![Value::from("SELECT ?"), Value::Integer(42)])
//! );
//!
//! let text = codec::to_string(&Value::Map(vec![(Value::keyword("a"), Value::Integer(1))])).unwrap();
//! assert_eq!(text, r#"["^ ","~:a",1]"#);
//! ```

mod cache;
pub mod reader;
mod value;
pub mod writer;

pub use reader::from_str;
pub use value::{Value, ValueTag};
pub use writer::to_string;

/// Format name advertised in the describe response.
pub const FORMAT: &str = "transit+json";

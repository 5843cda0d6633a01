//! Payload decoding and encoding for invoke requests.
//!
//! The `args` of an invoke is a transit argument list:
//!
//! ```text
//! ArgList := [Query] | [Target, Query]
//! Query   := Statement | [Statement, Param*]
//! ```
//!
//! The outer list shape is checked before the inner query shape.
//!
//! Results go back as transit too: `{:rows-affected n :last-inserted-id n}`
//! for `execute!`, a vector of `{:column value}` maps for `query`.

use crate::codec::{self, Value};
use crate::error::{PodError, Result};

/// Error text when the two-element form has a non-string target.
pub const TARGET_NOT_STRING: &str = "the database connection target must be a string";

/// Error text when the query is neither a string nor a statement vector.
pub const UNEXPECTED_QUERY: &str = "unexpected query type, expected a string or a vector";

/// Normalized invoke arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryArgs {
    /// Database target; empty means the executor's default.
    pub target: String,
    pub statement: String,
    /// Positional bind parameters.
    pub params: Vec<Value>,
}

/// Decode the raw transit `args` string of an invoke.
pub fn decode_args(raw: &str) -> Result<QueryArgs> {
    let value = codec::from_str(raw)?;
    let items = value.as_sequence().ok_or_else(|| {
        PodError::ArgDecode(format!(
            "expected an argument list, got {}",
            value.tag()
        ))
    })?;

    let (target, query) = match items {
        [query] => (String::new(), query),
        [target, query] => match target {
            Value::String(target) => (target.clone(), query),
            _ => return Err(PodError::ArgDecode(TARGET_NOT_STRING.into())),
        },
        _ => {
            return Err(PodError::ArgDecode(format!(
                "expected 1 or 2 arguments, got {}",
                items.len()
            )))
        }
    };

    let (statement, params) = match query {
        Value::String(statement) => (statement.clone(), Vec::new()),
        Value::Vector(parts) | Value::List(parts) => match parts.split_first() {
            Some((Value::String(statement), params)) => (statement.clone(), params.to_vec()),
            _ => return Err(PodError::ArgDecode(UNEXPECTED_QUERY.into())),
        },
        _ => return Err(PodError::ArgDecode(UNEXPECTED_QUERY.into())),
    };

    Ok(QueryArgs {
        target,
        statement,
        params,
    })
}

/// Summary of a statement run through the exec path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: i64,
    pub last_inserted_id: i64,
}

impl ExecResult {
    pub fn to_value(&self) -> Value {
        Value::Map(vec![
            (
                Value::keyword("rows-affected"),
                Value::Integer(self.rows_affected),
            ),
            (
                Value::keyword("last-inserted-id"),
                Value::Integer(self.last_inserted_id),
            ),
        ])
    }
}

/// One result row: column names to values, in select-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column. A repeated name keeps its first position and takes the
    /// new value.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_value(&self) -> Value {
        Value::Map(
            self.columns
                .iter()
                .map(|(k, v)| (Value::keyword(k.as_str()), v.clone()))
                .collect(),
        )
    }
}

/// Re-associate one row's positional values with the column names.
///
/// A length mismatch means the executor produced a malformed row.
pub fn associate(columns: &[String], values: Vec<Value>) -> Result<Row> {
    if values.len() != columns.len() {
        return Err(PodError::Execution(format!(
            "row has {} values for {} columns",
            values.len(),
            columns.len()
        )));
    }
    let mut row = Row::new();
    for (column, value) in columns.iter().zip(values) {
        row.insert(column.as_str(), value);
    }
    Ok(row)
}

/// Encode an exec summary as a transit string.
pub fn encode_exec_result(result: &ExecResult) -> Result<String> {
    codec::to_string(&result.to_value())
}

/// Encode rows as a transit vector of maps.
pub fn encode_rows(rows: &[Row]) -> Result<String> {
    codec::to_string(&Value::Vector(rows.iter().map(Row::to_value).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg_error(raw: &str) -> String {
        match decode_args(raw) {
            Err(PodError::ArgDecode(msg)) => msg,
            other => panic!("expected ArgDecode for {raw}, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_statement() {
        let args = decode_args(r#"["~#list",["CREATE TABLE t(x INT)"]]"#).unwrap();
        assert_eq!(args.target, "");
        assert_eq!(args.statement, "CREATE TABLE t(x INT)");
        assert!(args.params.is_empty());
    }

    #[test]
    fn test_statement_vector_with_params() {
        let args = decode_args(r#"[["INSERT INTO t VALUES (?, ?)",42,"~:kw"]]"#).unwrap();
        assert_eq!(args.target, "");
        assert_eq!(args.statement, "INSERT INTO t VALUES (?, ?)");
        assert_eq!(args.params, vec![Value::Integer(42), Value::keyword("kw")]);
    }

    #[test]
    fn test_target_and_statement() {
        let args = decode_args(r#"["/tmp/db.duckdb","SELECT 1 AS a"]"#).unwrap();
        assert_eq!(args.target, "/tmp/db.duckdb");
        assert_eq!(args.statement, "SELECT 1 AS a");
        assert!(args.params.is_empty());
    }

    #[test]
    fn test_target_and_list_query() {
        let args = decode_args(r#"["~#list",["x.db",["~#list",["SELECT ?",1]]]]"#).unwrap();
        assert_eq!(args.target, "x.db");
        assert_eq!(args.params, vec![Value::Integer(1)]);
    }

    #[test]
    fn test_non_string_target() {
        assert_eq!(arg_error(r#"[1,"SELECT 1"]"#), TARGET_NOT_STRING);
    }

    #[test]
    fn test_outer_shape_checked_before_inner() {
        // Bad target and bad query: the target error wins.
        assert_eq!(arg_error(r#"[1,2]"#), TARGET_NOT_STRING);
    }

    #[test]
    fn test_unexpected_query_shapes() {
        for raw in [
            r#"[42]"#,
            r#"[[]]"#,
            r#"[[1,"SELECT 1"]]"#,
            r#"[["^ ","~:a",1]]"#,
            r#"["db",null]"#,
        ] {
            assert_eq!(arg_error(raw), UNEXPECTED_QUERY, "{raw}");
        }
    }

    #[test]
    fn test_bad_argument_counts() {
        assert!(arg_error("[]").contains("got 0"));
        assert!(arg_error(r#"["a","b","c"]"#).contains("got 3"));
    }

    #[test]
    fn test_non_sequence_top_level() {
        assert!(arg_error(r#"["~#'",42]"#).contains("argument list"));
        assert!(arg_error(r#"["^ ","~:a",1]"#).contains("argument list"));
    }

    #[test]
    fn test_invalid_json_is_arg_error() {
        let err = decode_args("{{").unwrap_err();
        assert_eq!(err.kind(), "arg-decode");
    }

    #[test]
    fn test_encode_exec_result() {
        let text = encode_exec_result(&ExecResult {
            rows_affected: 3,
            last_inserted_id: 7,
        })
        .unwrap();
        assert_eq!(text, r#"["^ ","~:rows-affected",3,"~:last-inserted-id",7]"#);

        let value = codec::from_str(&text).unwrap();
        assert_eq!(value.get_keyword("rows-affected"), Some(&Value::Integer(3)));
        assert_eq!(
            value.get_keyword("last-inserted-id"),
            Some(&Value::Integer(7))
        );
    }

    #[test]
    fn test_encode_rows_preserves_order() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let rows = vec![
            associate(&columns, vec![Value::Integer(2), "b".into()]).unwrap(),
            associate(&columns, vec![Value::Integer(1), "a".into()]).unwrap(),
        ];
        let text = encode_rows(&rows).unwrap();
        assert_eq!(
            text,
            r#"[["^ ","~:id",2,"~:name","b"],["^ ","^0",1,"^1","a"]]"#
        );

        let decoded = codec::from_str(&text).unwrap();
        let decoded = decoded.as_sequence().unwrap();
        assert_eq!(decoded[0].get_keyword("id"), Some(&Value::Integer(2)));
        assert_eq!(decoded[1].get_keyword("name"), Some(&Value::from("a")));
    }

    #[test]
    fn test_encode_no_rows() {
        assert_eq!(encode_rows(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_associate_length_mismatch() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let err = associate(&columns, vec![Value::Integer(1)]).unwrap_err();
        assert!(matches!(err, PodError::Execution(_)));
        assert!(associate(&columns, vec![Value::Null; 3]).is_err());
    }

    #[test]
    fn test_duplicate_column_names() {
        let columns = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let row = associate(&columns, vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)])
            .unwrap();
        assert_eq!(row.len(), 2);
        let names: Vec<_> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(row.get("a"), Some(&Value::Integer(3)));
    }
}

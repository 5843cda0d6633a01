//! SQLite executor using `rusqlite`.
//!
//! Every handle is a fresh `Connection`, closed when the handle is dropped,
//! so an in-memory database lives for exactly one request.
//!
//! `exec` steps every statement to completion and discards any rows, so
//! `RETURNING` clauses and row-producing statements are accepted. Without
//! parameters the text may hold several `;`-separated statements, run in
//! order; a failing statement leaves earlier ones applied.

use std::time::Duration;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::{params_from_iter, Batch, Connection, Statement};

use super::{ExecutorHandle, RowSet, StatementExecutor};
use crate::codec::Value;
use crate::error::{PodError, Result};
use crate::payload::ExecResult;

/// How long a statement waits on a locked database file.
pub const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Executor opening SQLite connections.
///
/// An empty target opens a private in-memory database; any other target is
/// a file path (or `:memory:`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteExecutor;

impl SqliteExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl StatementExecutor for SqliteExecutor {
    type Handle = SqliteHandle;

    fn open(&self, target: &str) -> Result<SqliteHandle> {
        let opened = if target.is_empty() {
            Connection::open_in_memory()
        } else {
            Connection::open(target)
        };
        let open_error = |e: rusqlite::Error| PodError::TargetOpen {
            target: target.to_string(),
            source: Box::new(e),
        };
        let conn = opened.map_err(open_error)?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
            .map_err(open_error)?;
        Ok(SqliteHandle { conn })
    }
}

/// One open SQLite connection.
pub struct SqliteHandle {
    conn: Connection,
}

fn exec_error(e: rusqlite::Error) -> PodError {
    PodError::Execution(e.to_string())
}

/// Convert a bind parameter to an SQLite value.
fn bind(value: &Value) -> Result<SqlValue> {
    let bound = match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(n) | Value::Timestamp(n) => SqlValue::Integer(*n),
        Value::BigInt(s) => match s.parse::<i64>() {
            Ok(n) => SqlValue::Integer(n),
            Err(_) => SqlValue::Text(s.clone()),
        },
        Value::Float(f) => SqlValue::Real(*f),
        Value::String(s)
        | Value::Keyword(s)
        | Value::Symbol(s)
        | Value::BigDecimal(s)
        | Value::Instant(s)
        | Value::Uuid(s)
        | Value::Uri(s) => SqlValue::Text(s.clone()),
        Value::Char(c) => SqlValue::Text(c.to_string()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Vector(_) | Value::List(_) | Value::Set(_) | Value::Map(_) | Value::Tagged(..) => {
            return Err(PodError::Execution(format!(
                "unsupported parameter type {}",
                value.tag()
            )))
        }
    };
    Ok(bound)
}

fn bind_all(params: &[Value]) -> Result<Vec<SqlValue>> {
    params.iter().map(bind).collect()
}

/// Step `stmt` until done and return the rows it changed directly.
fn run_to_end(conn: &Connection, stmt: &mut Statement<'_>, params: &[SqlValue]) -> Result<u64> {
    let before = conn.total_changes();
    {
        let mut rows = stmt.query(params_from_iter(params.iter())).map_err(exec_error)?;
        while rows.next().map_err(exec_error)?.is_some() {}
    }
    // DDL leaves `changes()` at the previous DML count.
    if conn.total_changes() == before {
        Ok(0)
    } else {
        Ok(conn.changes())
    }
}

/// Convert a column value read from SQLite.
fn column_value(value: ValueRef<'_>, column: &str) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => {
                return Err(PodError::ResultEncode(format!(
                    "column {column:?} holds text that is not valid UTF-8"
                )))
            }
        },
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    })
}

impl ExecutorHandle for SqliteHandle {
    fn exec(&mut self, statement: &str, params: &[Value]) -> Result<ExecResult> {
        let bound = bind_all(params)?;
        let affected = if bound.is_empty() {
            let mut total = 0u64;
            let mut batch = Batch::new(&self.conn, statement);
            while let Some(mut stmt) = batch.next().map_err(exec_error)? {
                total = total.saturating_add(run_to_end(&self.conn, &mut stmt, &bound)?);
            }
            total
        } else {
            let mut stmt = self.conn.prepare(statement).map_err(exec_error)?;
            run_to_end(&self.conn, &mut stmt, &bound)?
        };
        Ok(ExecResult {
            rows_affected: i64::try_from(affected).unwrap_or(i64::MAX),
            last_inserted_id: self.conn.last_insert_rowid(),
        })
    }

    fn query(&mut self, statement: &str, params: &[Value]) -> Result<RowSet> {
        let bound = bind_all(params)?;
        let mut stmt = self.conn.prepare(statement).map_err(exec_error)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(bound.iter()))
            .map_err(exec_error)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(exec_error)? {
            let count = row.as_ref().column_count();
            let mut values = Vec::with_capacity(count);
            for i in 0..count {
                let name = columns.get(i).map(String::as_str).unwrap_or_default();
                values.push(column_value(row.get_ref(i).map_err(exec_error)?, name)?);
            }
            out.push(values);
        }

        Ok(RowSet { columns, rows: out })
    }
}

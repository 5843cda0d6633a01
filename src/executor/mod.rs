//! Statement executor - the embedded engine behind the pod.
//!
//! The dispatcher only needs three capabilities: open a handle for a
//! target, run a statement for its side effects, and run a query for its
//! rows. [`StatementExecutor`] and [`ExecutorHandle`] describe them;
//! [`SqliteExecutor`] is the shipped implementation.
//!
//! Handles are scoped to a single request through [`Session`], which owns
//! the handle and releases it when dropped, whichever way the request ends.

mod sqlite;

pub use sqlite::{SqliteExecutor, SqliteHandle, BUSY_TIMEOUT_MS};

use crate::codec::Value;
use crate::error::Result;
use crate::payload::{associate, ExecResult, Row};

/// Opens handles against database targets.
pub trait StatementExecutor: Send + Sync + 'static {
    type Handle: ExecutorHandle;

    /// Open a fresh handle. An empty target means the executor's default.
    fn open(&self, target: &str) -> Result<Self::Handle>;
}

/// An open database handle.
pub trait ExecutorHandle {
    /// Run a statement, reporting affected rows and the last inserted id.
    fn exec(&mut self, statement: &str, params: &[Value]) -> Result<ExecResult>;

    /// Run a query, returning its column names and positional row values.
    fn query(&mut self, statement: &str, params: &[Value]) -> Result<RowSet>;
}

/// Raw query output: columns fetched once, values per row by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Re-associate every row with the column names, in result order.
    pub fn into_rows(self) -> Result<Vec<Row>> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| associate(&columns, values))
            .collect()
    }
}

/// A handle scoped to one request.
pub struct Session<H: ExecutorHandle> {
    handle: H,
    target: String,
}

impl<H: ExecutorHandle> Session<H> {
    /// Open a handle on `executor` for `target`.
    pub fn open<E>(executor: &E, target: &str) -> Result<Self>
    where
        E: StatementExecutor<Handle = H>,
    {
        let handle = executor.open(target)?;
        tracing::debug!(db = %target, "opened executor handle");
        Ok(Self {
            handle,
            target: target.to_string(),
        })
    }

    pub fn exec(&mut self, statement: &str, params: &[Value]) -> Result<ExecResult> {
        self.handle.exec(statement, params)
    }

    pub fn query(&mut self, statement: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.handle.query(statement, params)?.into_rows()
    }
}

impl<H: ExecutorHandle> Drop for Session<H> {
    fn drop(&mut self) {
        tracing::debug!(db = %self.target, "released executor handle");
    }
}

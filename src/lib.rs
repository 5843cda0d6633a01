//! # sqlpod
//!
//! A pod exposing an embedded SQL engine to a host process.
//!
//! The host talks to the pod over stdin/stdout with bencode envelopes.
//! Invoke arguments and results travel inside the envelopes as
//! transit+json strings.
//!
//! ## Architecture
//!
//! - **Envelope** (bencode): `describe` and `invoke` requests, one response each
//! - **Payload** (transit+json): `[Query]` or `[Target, Query]` in, rows or
//!   an exec summary out
//! - **Executor**: [`executor::StatementExecutor`], shipped with SQLite
//!
//! ## Example
//!
//! ```no_run
//! use sqlpod::executor::SqliteExecutor;
//! use sqlpod::PodBuilder;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> sqlpod::error::Result<()> {
//!     let pod = PodBuilder::new().build(SqliteExecutor)?;
//!     pod.serve(tokio::io::stdin(), tokio::io::stdout()).await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod control;
pub mod error;
pub mod executor;
pub mod handler;
pub mod payload;
pub mod protocol;

mod pod;

pub use config::PodConfig;
pub use error::PodError;
pub use pod::{Pod, PodBuilder, READ_CHUNK_SIZE};

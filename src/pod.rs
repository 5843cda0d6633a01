//! Pod builder and request loop.
//!
//! The [`PodBuilder`] provides a fluent API for configuring the pod. The
//! [`Pod`] serves requests from a reader to a writer:
//! 1. Read bytes into the envelope buffer
//! 2. Decode every complete envelope
//! 3. Dispatch it by `op` and write exactly one response
//! 4. Repeat until end of input
//!
//! Streams are passed in explicitly, so the same loop runs on stdin/stdout
//! in the binary and on in-memory buffers in tests.
//!
//! # Example
//!
//! ```no_run
//! use sqlpod::executor::SqliteExecutor;
//! use sqlpod::PodBuilder;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> sqlpod::error::Result<()> {
//!     let pod = PodBuilder::new()
//!         .namespace("pod.sqlpod")
//!         .default_target("app.db")
//!         .build(SqliteExecutor)?;
//!
//!     pod.serve(tokio::io::stdin(), tokio::io::stdout()).await
//! }
//! ```

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::PodConfig;
use crate::control::DescribeCache;
use crate::error::{PodError, Result};
use crate::executor::{Session, StatementExecutor};
use crate::handler::{RequestContext, VarRegistry, Verb};
use crate::payload::{decode_args, encode_exec_result, encode_rows, QueryArgs};
use crate::protocol::{write_response, EnvelopeBuffer, Message};

/// Bytes requested from the reader per read call.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

const OP_DESCRIBE: &str = "describe";
const OP_INVOKE: &str = "invoke";

/// Builder for configuring and creating a [`Pod`].
#[derive(Debug, Clone, Default)]
pub struct PodBuilder {
    config: PodConfig,
}

impl PodBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration.
    pub fn from_config(config: PodConfig) -> Self {
        Self { config }
    }

    /// Namespace the vars are advertised under.
    ///
    /// Default: `pod.sqlpod`
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Target used when a request names none.
    ///
    /// Default: empty, which the executor opens as an in-memory database.
    pub fn default_target(mut self, target: impl Into<String>) -> Self {
        self.config.default_target = target.into();
        self
    }

    /// Largest envelope accepted from the host.
    ///
    /// Default: 64 MiB
    pub fn max_envelope_size(mut self, size: usize) -> Self {
        self.config.max_envelope_size = size;
        self
    }

    /// Validate the configuration and build a pod around `executor`.
    pub fn build<E: StatementExecutor>(self, executor: E) -> Result<Pod<E>> {
        self.config.validate()?;
        let registry = VarRegistry::new(self.config.namespace.as_str());
        let describe = DescribeCache::new(&registry);
        Ok(Pod {
            executor: Arc::new(executor),
            registry,
            describe,
            config: self.config,
        })
    }
}

/// A configured pod, ready to serve.
pub struct Pod<E: StatementExecutor> {
    executor: Arc<E>,
    registry: VarRegistry,
    describe: DescribeCache,
    config: PodConfig,
}

impl<E: StatementExecutor> Pod<E> {
    pub fn config(&self) -> &PodConfig {
        &self.config
    }

    pub fn registry(&self) -> &VarRegistry {
        &self.registry
    }

    /// Serve requests until the reader is exhausted.
    ///
    /// Per-request failures become error responses. Only I/O errors on the
    /// streams end the loop with `Err`.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buffer = EnvelopeBuffer::with_max_size(self.config.max_envelope_size);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        tracing::info!(namespace = %self.registry.namespace(), "pod started");

        loop {
            loop {
                match buffer.try_next() {
                    Ok(Some(message)) => self.dispatch(message, &mut writer).await?,
                    Ok(None) => break,
                    Err(e) => {
                        let response = RequestContext::default().error(&e);
                        write_response(&mut writer, &response).await?;
                    }
                }
            }

            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                if !buffer.is_empty() {
                    let e = PodError::EnvelopeDecode(format!(
                        "input ended inside an envelope ({} bytes buffered)",
                        buffer.len()
                    ));
                    buffer.clear();
                    let response = RequestContext::default().error(&e);
                    write_response(&mut writer, &response).await?;
                }
                tracing::info!("input closed, pod shutting down");
                return Ok(());
            }
            buffer.extend(&chunk[..n]);
        }
    }

    /// Handle one decoded envelope and write its response.
    async fn dispatch<W>(&self, message: Message, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        tracing::debug!(op = %message.op, id = %message.id, var = %message.var, "request");
        let ctx = RequestContext::new(message.id.as_str());

        let response = match message.op.as_str() {
            OP_DESCRIBE => {
                writer.write_all(self.describe.bytes()).await?;
                writer.flush().await?;
                return Ok(());
            }
            OP_INVOKE => match self.invoke(&message).await {
                Ok(value) => ctx.respond(value),
                Err(e) => ctx.error(&e),
            },
            other => ctx.error(&PodError::UnknownOp(other.to_string())),
        };
        write_response(writer, &response).await
    }

    /// Decode, route and run an invoke, returning the encoded result.
    async fn invoke(&self, message: &Message) -> Result<String> {
        let mut args = decode_args(&message.args)?;
        let verb = self
            .registry
            .resolve(&message.var)
            .ok_or_else(|| PodError::UnknownVar(message.var.clone()))?;
        if args.target.is_empty() {
            args.target.clone_from(&self.config.default_target);
        }

        let executor = Arc::clone(&self.executor);
        tokio::task::spawn_blocking(move || run(executor.as_ref(), verb, &args))
            .await
            .map_err(|e| PodError::Execution(format!("executor task failed: {e}")))?
    }
}

/// Run one verb on a handle scoped to this call.
fn run<E: StatementExecutor>(executor: &E, verb: Verb, args: &QueryArgs) -> Result<String> {
    let mut session = Session::open(executor, &args.target)?;
    match verb {
        Verb::Execute => encode_exec_result(&session.exec(&args.statement, &args.params)?),
        Verb::Query => encode_rows(&session.query(&args.statement, &args.params)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::SqliteExecutor;
    use crate::protocol::bencode::{self, Bencode};

    fn invoke(id: &str, var: &str, args: &str) -> Vec<u8> {
        Message {
            op: "invoke".into(),
            id: id.into(),
            args: args.into(),
            var: var.into(),
        }
        .to_bencode()
        .encode()
    }

    async fn serve(pod: &Pod<SqliteExecutor>, input: &[u8]) -> Vec<Bencode> {
        let mut out = Vec::new();
        pod.serve(input, &mut out).await.unwrap();

        let mut responses = Vec::new();
        let mut rest = &out[..];
        while !rest.is_empty() {
            let (value, used) = bencode::decode(rest, usize::MAX).unwrap();
            responses.push(value);
            rest = &rest[used..];
        }
        responses
    }

    #[test]
    fn test_builder_rejects_bad_namespace() {
        assert!(PodBuilder::new().namespace("").build(SqliteExecutor).is_err());
    }

    #[test]
    fn test_builder_knobs() {
        let pod = PodBuilder::new()
            .namespace("x.y")
            .default_target("a.db")
            .max_envelope_size(10)
            .build(SqliteExecutor)
            .unwrap();
        assert_eq!(pod.config().default_target, "a.db");
        assert_eq!(pod.config().max_envelope_size, 10);
        assert_eq!(pod.registry().resolve("x.y/query"), Some(Verb::Query));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let pod = PodBuilder::new().build(SqliteExecutor).unwrap();
        assert!(serve(&pod, b"").await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_op() {
        let pod = PodBuilder::new().build(SqliteExecutor).unwrap();
        let responses = serve(&pod, b"d2:id1:52:op4:frobe").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].get("id").and_then(Bencode::as_str), Some("5"));
        assert_eq!(
            responses[0].get("ex-message").and_then(Bencode::as_str),
            Some("Unknown op frob")
        );
    }

    #[tokio::test]
    async fn test_truncated_input_reports_once() {
        let pod = PodBuilder::new().build(SqliteExecutor).unwrap();
        let responses = serve(&pod, b"d2:op8:desc").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].get("id").and_then(Bencode::as_str), Some(""));
        assert!(responses[0].get("ex-message").is_some());
    }

    #[tokio::test]
    async fn test_in_memory_state_is_per_request() {
        let pod = PodBuilder::new().build(SqliteExecutor).unwrap();
        let mut input = invoke("1", "pod.sqlpod/execute!", r#"["CREATE TABLE t(x INT)"]"#);
        input.extend(invoke("2", "pod.sqlpod/query", r#"["SELECT * FROM t"]"#));

        let responses = serve(&pod, &input).await;
        assert_eq!(responses.len(), 2);
        assert!(responses[0].get("value").is_some());
        let message = responses[1].get("ex-message").and_then(Bencode::as_str).unwrap();
        assert!(message.contains("no such table"));
    }

    #[tokio::test]
    async fn test_default_target_applies_to_empty_target() {
        let path = std::env::temp_dir().join(format!("sqlpod-pod-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let pod = PodBuilder::new()
            .default_target(path.to_string_lossy())
            .build(SqliteExecutor)
            .unwrap();

        let mut input = invoke("1", "pod.sqlpod/execute!", r#"["CREATE TABLE t(x INT)"]"#);
        input.extend(invoke("2", "pod.sqlpod/query", r#"["SELECT count(*) AS n FROM t"]"#));
        let responses = serve(&pod, &input).await;

        assert_eq!(
            responses[1].get("value").and_then(Bencode::as_str),
            Some(r#"[["^ ","~:n",0]]"#)
        );
        let _ = std::fs::remove_file(&path);
    }
}

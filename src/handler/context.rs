//! Request context for invoke handling.
//!
//! Carries the request id and turns outcomes into responses:
//! - `respond` - an invoke success with a transit value
//! - `error` - an error response with `ex-data` naming the error kind
//!
//! # Example
//!
//! ```
//! use sqlpod::error::PodError;
//! use sqlpod::handler::RequestContext;
//! use sqlpod::protocol::Response;
//!
//! let ctx = RequestContext::new("7");
//! let Response::Error(err) = ctx.error(&PodError::UnknownOp("frob".into())) else {
//!     unreachable!()
//! };
//! assert_eq!(err.id, "7");
//! assert_eq!(err.ex_message, "Unknown op frob");
//! assert_eq!(err.ex_data.as_deref(), Some(r#"["^ ","~:type","~:unknown-op"]"#));
//! ```

use crate::codec::{self, Value};
use crate::error::PodError;
use crate::protocol::{ErrorResponse, InvokeResponse, Response};

/// Context for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request id echoed in every response (empty if the envelope failed).
    id: String,
}

impl RequestContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Build a success response carrying an encoded transit value.
    pub fn respond(&self, value: String) -> Response {
        Response::Invoke(InvokeResponse::new(self.id.as_str(), value))
    }

    /// Build an error response for `err`.
    pub fn error(&self, err: &PodError) -> Response {
        tracing::warn!(id = %self.id, kind = err.kind(), "request failed: {}", err);
        Response::Error(ErrorResponse {
            id: self.id.clone(),
            ex_message: err.to_string(),
            ex_data: error_data(err),
        })
    }
}

/// Transit map `{:type :<kind>}` for an error.
fn error_data(err: &PodError) -> Option<String> {
    let data = Value::Map(vec![(Value::keyword("type"), Value::keyword(err.kind()))]);
    codec::to_string(&data).ok()
}

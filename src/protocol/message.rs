//! Envelope messages: the inbound request and the three response shapes.
//!
//! Requests are bencode dictionaries with string values under `op`, `id`,
//! `args` and `var`. Responses are written as bencode dictionaries:
//!
//! ```text
//! describe  {format, namespaces: [{name, vars: [{name, code?}]}]}
//! invoke    {id, status: ["done"], value}
//! error     {id, status: ["done", "error"], ex-message, ex-data?}
//! ```
//!
//! # Example
//!
//! ```
//! use sqlpod::protocol::{InvokeResponse, Response};
//!
//! let response = Response::Invoke(InvokeResponse::new("1", "[1]".to_string()));
//! assert_eq!(response.encode(), b"d2:id1:16:statusl4:donee5:value3:[1]e");
//! ```

use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::bencode::Bencode;
use crate::error::{PodError, Result};

/// Status token present on every response.
pub const STATUS_DONE: &str = "done";

/// Status token added to failed responses.
pub const STATUS_ERROR: &str = "error";

/// One inbound request envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Operation name (`describe`, `invoke`, ...).
    pub op: String,
    /// Opaque request identifier, echoed back.
    pub id: String,
    /// Transit-encoded argument list (invoke only).
    pub args: String,
    /// Fully-qualified var name (invoke only).
    pub var: String,
}

impl Message {
    /// Convert a decoded bencode value into a message.
    ///
    /// The value must be a dictionary. Missing keys become empty strings and
    /// unknown keys are ignored; a known key holding anything other than a
    /// UTF-8 byte string is an error.
    pub fn from_bencode(value: &Bencode) -> Result<Self> {
        if !matches!(value, Bencode::Dict(_)) {
            return Err(PodError::EnvelopeDecode(format!(
                "expected a dictionary envelope, got {}",
                value.type_name()
            )));
        }

        let field = |key: &str| -> Result<String> {
            match value.get(key) {
                None => Ok(String::new()),
                Some(Bencode::Bytes(bytes)) => String::from_utf8(bytes.clone()).map_err(|_| {
                    PodError::EnvelopeDecode(format!("envelope key {key:?} is not valid UTF-8"))
                }),
                Some(other) => Err(PodError::EnvelopeDecode(format!(
                    "envelope key {key:?} must be a string, got {}",
                    other.type_name()
                ))),
            }
        };

        Ok(Self {
            op: field("op")?,
            id: field("id")?,
            args: field("args")?,
            var: field("var")?,
        })
    }

    /// Convert this message back to a bencode dictionary, skipping empty fields.
    pub fn to_bencode(&self) -> Bencode {
        let fields = [
            ("op", &self.op),
            ("id", &self.id),
            ("args", &self.args),
            ("var", &self.var),
        ];
        Bencode::dict(
            fields
                .into_iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| (k, Bencode::from(v.as_str()))),
        )
    }
}

/// A var exposed in a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    pub name: String,
    /// Optional inline source evaluated by the host instead of invoking.
    pub code: Option<String>,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
        }
    }

    fn to_bencode(&self) -> Bencode {
        let mut entries = vec![("name", Bencode::from(self.name.as_str()))];
        if let Some(code) = &self.code {
            entries.push(("code", Bencode::from(code.as_str())));
        }
        Bencode::dict(entries)
    }
}

/// A namespace and the vars it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    pub vars: Vec<Var>,
}

impl Namespace {
    fn to_bencode(&self) -> Bencode {
        Bencode::dict([
            ("name", Bencode::from(self.name.as_str())),
            (
                "vars",
                Bencode::List(self.vars.iter().map(Var::to_bencode).collect()),
            ),
        ])
    }
}

/// Capability advertisement returned for `describe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeResponse {
    /// Payload format name, e.g. `transit+json`.
    pub format: String,
    pub namespaces: Vec<Namespace>,
}

/// Successful invoke result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResponse {
    pub id: String,
    /// Transit-encoded result.
    pub value: String,
}

impl InvokeResponse {
    pub fn new(id: impl Into<String>, value: String) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// Failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub id: String,
    /// Human-readable error text.
    pub ex_message: String,
    /// Optional transit-encoded error details.
    pub ex_data: Option<String>,
}

/// Any response the pod writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Describe(DescribeResponse),
    Invoke(InvokeResponse),
    Error(ErrorResponse),
}

impl Response {
    /// Status tokens carried by this response (empty for describe).
    pub fn status(&self) -> &'static [&'static str] {
        match self {
            Response::Describe(_) => &[],
            Response::Invoke(_) => &[STATUS_DONE],
            Response::Error(_) => &[STATUS_DONE, STATUS_ERROR],
        }
    }

    /// Convert to the bencode dictionary written on the wire.
    pub fn to_bencode(&self) -> Bencode {
        let status = || {
            Bencode::List(
                self.status()
                    .iter()
                    .map(|s| Bencode::from(*s))
                    .collect(),
            )
        };

        match self {
            Response::Describe(d) => Bencode::dict([
                ("format", Bencode::from(d.format.as_str())),
                (
                    "namespaces",
                    Bencode::List(d.namespaces.iter().map(Namespace::to_bencode).collect()),
                ),
            ]),
            Response::Invoke(r) => Bencode::dict([
                ("id", Bencode::from(r.id.as_str())),
                ("status", status()),
                ("value", Bencode::from(r.value.as_str())),
            ]),
            Response::Error(r) => {
                let mut entries = vec![
                    ("id", Bencode::from(r.id.as_str())),
                    ("status", status()),
                    ("ex-message", Bencode::from(r.ex_message.as_str())),
                ];
                if let Some(data) = &r.ex_data {
                    entries.push(("ex-data", Bencode::from(data.as_str())));
                }
                Bencode::dict(entries)
            }
        }
    }

    /// Fully encode the response.
    pub fn encode(&self) -> Vec<u8> {
        self.to_bencode().encode()
    }
}

/// Write one response: encode fully, write it in one piece, then flush.
pub async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = response.encode();
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

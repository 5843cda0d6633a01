//! Protocol module - bencode envelopes exchanged with the host.
//!
//! This module implements the outer wire protocol:
//! - bencode value encoding/decoding
//! - envelope buffer for accumulating partial reads
//! - request message and response shapes

pub mod bencode;
mod envelope_buffer;
mod message;

pub use bencode::Bencode;
pub use envelope_buffer::{EnvelopeBuffer, DEFAULT_MAX_ENVELOPE_SIZE};
pub use message::{
    write_response, DescribeResponse, ErrorResponse, InvokeResponse, Message, Namespace, Response,
    Var, STATUS_DONE, STATUS_ERROR,
};

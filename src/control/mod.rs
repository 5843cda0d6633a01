//! Control module - the `describe` handshake.
//!
//! The host sends `describe` before any invoke to learn the payload format
//! and the vars the pod exposes. The answer is fixed for the lifetime of
//! the process, so it is encoded once and replayed byte-for-byte.

mod describe;

pub use describe::{build_describe, DescribeCache};

//! `describe` response builder.
//!
//! The describe response tells the host:
//! - The payload format (`transit+json`)
//! - The namespace and the vars it exposes
//!
//! It is built from the var registry and never touches the executor.
//!
//! # Example
//!
//! ```
//! use sqlpod::control::build_describe;
//! use sqlpod::handler::VarRegistry;
//!
//! let describe = build_describe(&VarRegistry::default());
//! assert_eq!(describe.format, "transit+json");
//! assert_eq!(describe.namespaces[0].vars.len(), 2);
//! ```

use crate::codec;
use crate::handler::VarRegistry;
use crate::protocol::{DescribeResponse, Response};

/// Build the capability advertisement for `registry`.
pub fn build_describe(registry: &VarRegistry) -> DescribeResponse {
    DescribeResponse {
        format: codec::FORMAT.to_string(),
        namespaces: vec![registry.build_namespace()],
    }
}

/// Encoded describe envelope, computed once and written for every
/// `describe` request.
#[derive(Debug, Clone)]
pub struct DescribeCache {
    encoded: Vec<u8>,
}

impl DescribeCache {
    pub fn new(registry: &VarRegistry) -> Self {
        let response = Response::Describe(build_describe(registry));
        Self {
            encoded: response.encode(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.encoded
    }
}

//! Handler module - invoke routing and response building.
//!
//! Provides:
//! - [`VarRegistry`] - maps qualified var names to verbs
//! - [`RequestContext`] - builds success and error responses for a request

mod context;
mod registry;

pub use context::RequestContext;
pub use registry::{VarRegistry, Verb, DEFAULT_NAMESPACE};

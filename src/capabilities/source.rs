//! CapabilitySource trait: the contract for pluggable capability providers.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::resources::ResourceResolver;

/// Key/value facts reported by one source, in reporting order.
pub type Capabilities = Map<String, Value>;

/// A provider of one namespace's capabilities.
///
/// Sources are registered with a [`SourceRegistry`](super::SourceRegistry)
/// and invoked inline while a request is being served, so
/// [`capabilities`](Self::capabilities) must return promptly.
pub trait CapabilitySource: Send + Sync {
    /// Unique, non-empty namespace. Must not change while the source is registered.
    fn namespace(&self) -> &str;

    /// Compute the capabilities of this namespace.
    ///
    /// A returned error only affects this source's entry in the output.
    fn capabilities(&self, ctx: &SourceContext) -> Result<Capabilities, SourceError>;
}

impl fmt::Debug for dyn CapabilitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySource")
            .field("namespace", &self.namespace())
            .finish()
    }
}

/// Request-scoped context handed to every source.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// Resolver of the request being served.
    pub resolver: Arc<dyn ResourceResolver>,
    /// Path of the resource being served.
    pub resource_path: String,
}

impl SourceContext {
    pub fn new(resolver: Arc<dyn ResourceResolver>, resource_path: impl Into<String>) -> Self {
        Self {
            resolver,
            resource_path: resource_path.into(),
        }
    }
}

/// Failure of a single source.
///
/// Rendered into the output as `"<kind>:<message>"`. The kind is a stable
/// identifier chosen by the source, not a type name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}:{message}")]
pub struct SourceError {
    pub kind: String,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("InvalidArgument", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("Unavailable", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("Internal", message)
    }
}

/// Collapse a one-element array to its sole element.
///
/// Multi-valued properties with a single entry are reported as scalars;
/// empty and multi-element arrays are kept as arrays.
pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_single_element() {
        assert_eq!(normalize_value(json!([42])), json!(42));
        assert_eq!(normalize_value(json!(["GET"])), json!("GET"));
        assert_eq!(normalize_value(json!([{"a": 1}])), json!({"a": 1}));
    }

    #[test]
    fn test_normalize_keeps_other_lengths() {
        assert_eq!(normalize_value(json!([])), json!([]));
        assert_eq!(normalize_value(json!([1, 2])), json!([1, 2]));
        assert_eq!(normalize_value(json!("x")), json!("x"));
        assert_eq!(normalize_value(json!(null)), json!(null));
    }

    #[test]
    fn test_normalize_is_shallow() {
        assert_eq!(normalize_value(json!([[7]])), json!([7]));
    }

    #[test]
    fn test_source_error_display() {
        let e = SourceError::new("IllegalArgumentException", "Simulating a problem");
        assert_eq!(e.to_string(), "IllegalArgumentException:Simulating a problem");
        assert_eq!(SourceError::unavailable("down").to_string(), "Unavailable:down");
        assert_eq!(SourceError::invalid_argument("x").kind, "InvalidArgument");
        assert_eq!(SourceError::internal("y").kind, "Internal");
    }
}

//! Capability aggregation and the JSON document it produces.
//!
//! ```text
//! for source in snapshot (registration order):
//!     namespace rejected by filter  → skip, source not invoked
//!     namespace already seen        → DuplicateNamespace, no output
//!     capabilities() fails/panics   → { "_EXCEPTION_": "<kind>:<message>" }
//!     otherwise                     → normalized key/value pairs
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::source::{normalize_value, Capabilities, CapabilitySource, SourceContext, SourceError};
use crate::policy::PatternFilter;

/// Top-level key identifying this system in the output document.
pub const ROOT_KEY: &str = "org.apache.sling.capabilities";

/// Key holding the per-namespace data under [`ROOT_KEY`].
pub const DATA_KEY: &str = "data";

/// Key of the marker entry written for a failed source.
pub const EXCEPTION_KEY: &str = "_EXCEPTION_";

/// Errors that abort a whole aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// Two accepted sources reported the same namespace.
    #[error("Duplicate namespace: {0}")]
    DuplicateNamespace(String),
}

/// Namespace → capabilities, in the order sources were visited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationResult {
    namespaces: Map<String, Value>,
}

impl AggregationResult {
    pub fn get(&self, namespace: &str) -> Option<&Capabilities> {
        self.namespaces.get(namespace).and_then(Value::as_object)
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Wrap into the response envelope.
    pub fn into_document(self) -> CapabilityDocument {
        CapabilityDocument {
            capabilities: DocumentBody {
                data: self.namespaces,
            },
        }
    }
}

/// The serialized response:
/// `{ "org.apache.sling.capabilities": { "data": { <namespace>: {..} } } }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityDocument {
    #[serde(rename = "org.apache.sling.capabilities")]
    pub capabilities: DocumentBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentBody {
    pub data: Map<String, Value>,
}

impl CapabilityDocument {
    /// Data reported for one namespace.
    pub fn namespace(&self, namespace: &str) -> Option<&Capabilities> {
        self.capabilities.data.get(namespace).and_then(Value::as_object)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Stateless aggregation over a list of sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityAggregator;

impl CapabilityAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Collect capabilities from every source whose namespace passes the filter.
    pub fn aggregate(
        &self,
        sources: &[Arc<dyn CapabilitySource>],
        namespace_filter: &PatternFilter,
        ctx: &SourceContext,
    ) -> Result<AggregationResult, AggregationError> {
        let mut namespaces = Map::new();

        for source in sources {
            let namespace = source.namespace();
            if !namespace_filter.accept(namespace) {
                tracing::debug!(namespace, "namespace not accepted, skipping source");
                continue;
            }
            if namespaces.contains_key(namespace) {
                tracing::error!(namespace, "duplicate capabilities namespace");
                return Err(AggregationError::DuplicateNamespace(namespace.to_string()));
            }

            let values = match invoke(source.as_ref(), ctx) {
                Ok(caps) => caps
                    .into_iter()
                    .map(|(k, v)| (k, normalize_value(v)))
                    .collect(),
                Err(e) => {
                    tracing::warn!(namespace, error = %e, "capability source failed");
                    let mut marker = Map::new();
                    marker.insert(EXCEPTION_KEY.to_string(), Value::String(e.to_string()));
                    marker
                }
            };
            namespaces.insert(namespace.to_string(), Value::Object(values));
        }

        Ok(AggregationResult { namespaces })
    }
}

/// Call a source, turning a panic into a [`SourceError`].
fn invoke(source: &dyn CapabilitySource, ctx: &SourceContext) -> Result<Capabilities, SourceError> {
    panic::catch_unwind(AssertUnwindSafe(|| source.capabilities(ctx)))
        .unwrap_or_else(|payload| Err(SourceError::new("Panic", panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! # Capabilities
//!
//! Pluggable capability sources and their aggregation into one namespaced
//! document.
//!
//! ## Architecture
//!
//! Each [`CapabilitySource`] owns exactly one namespace and reports a flat
//! map of key/value facts. Sources are bound to a [`SourceRegistry`] as they
//! appear and unbound as they disappear. On every request the
//! [`CapabilityAggregator`] walks a registry snapshot:
//!
//! 1. Sources whose namespace is not allowed are skipped without being called
//! 2. A namespace seen twice aborts the aggregation (`DuplicateNamespace`)
//! 3. A failing source is reduced to `{"_EXCEPTION_": "<kind>:<message>"}`
//! 4. Everything else lands under its namespace in a [`CapabilityDocument`]
//!
//! Nothing is cached: every request recomputes from the live sources.

pub mod aggregator;
pub mod registry;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::{
    AggregationError, AggregationResult, CapabilityAggregator, CapabilityDocument, DocumentBody,
    DATA_KEY, EXCEPTION_KEY, ROOT_KEY,
};
pub use registry::{SourceRegistry, SourceSnapshot};
pub use source::{normalize_value, Capabilities, CapabilitySource, SourceContext, SourceError};

//! # Capability Gateway
//!
//! A capability-discovery endpoint for a content-management platform.
//!
//! Pluggable [`CapabilitySource`]s each contribute one namespace of
//! key/value facts. On request, the [`ResponseGateway`] checks the resource
//! path against an administrator allow-list, reads the namespaces the
//! resource is willing to expose, and aggregates the matching sources into
//! a single JSON document:
//!
//! ```text
//! { "org.apache.sling.capabilities": { "data": { "<namespace>": { "<key>": <value> } } } }
//! ```
//!
//! A failing source only degrades its own namespace; two sources sharing a
//! namespace fail the whole request.

pub mod capabilities;
pub mod config;
pub mod policy;
pub mod resources;
pub mod server;
pub mod sources;

pub use capabilities::{
    CapabilityAggregator, CapabilityDocument, CapabilitySource, SourceContext, SourceError,
    SourceRegistry,
};
pub use config::GatewayConfig;
pub use policy::PatternFilter;
pub use server::{app_router, AppState, ResponseGateway};

/// Crate version, reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

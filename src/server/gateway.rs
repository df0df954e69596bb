//! ResponseGateway: request-in / document-out core of the endpoint.
//!
//! Transport independent: [`routes`](super::routes) maps its outcomes to
//! HTTP responses.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::capabilities::{
    AggregationError, CapabilityAggregator, CapabilityDocument, SourceContext, SourceRegistry,
};
use crate::policy::{PatternError, PatternFilter};
use crate::resources::{normalize_path, ResourceResolver, CAPABILITIES_RESOURCE_TYPE};
use crate::sources::HandlerRegistration;

/// Resource property declaring which namespaces a resource exposes.
pub const NAMESPACES_PROP: &str = "namespace_patterns";

/// Why a capabilities request did not produce a document.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Path not allow-listed, or namespaces not declared. Expected, not a fault.
    #[error("{0}")]
    Forbidden(String),

    /// No capabilities resource at the requested path.
    #[error("No capabilities resource at {0}")]
    NotFound(String),

    /// A declared namespace pattern does not compile.
    #[error("Invalid namespace_patterns: {0}")]
    InvalidPattern(#[from] PatternError),

    /// Two sources share an accepted namespace.
    #[error("Duplicate namespace: {0}")]
    DuplicateNamespace(String),
}

impl From<AggregationError> for GatewayError {
    fn from(e: AggregationError) -> Self {
        match e {
            AggregationError::DuplicateNamespace(ns) => GatewayError::DuplicateNamespace(ns),
        }
    }
}

/// Serves capability documents for allow-listed resources.
pub struct ResponseGateway {
    path_filter: PatternFilter,
    registry: Arc<SourceRegistry>,
    resolver: Arc<dyn ResourceResolver>,
    aggregator: CapabilityAggregator,
}

impl ResponseGateway {
    /// `path_filter` is fixed for the lifetime of the gateway.
    pub fn new(
        path_filter: PatternFilter,
        registry: Arc<SourceRegistry>,
        resolver: Arc<dyn ResourceResolver>,
    ) -> Self {
        Self {
            path_filter,
            registry,
            resolver,
            aggregator: CapabilityAggregator::new(),
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn path_filter(&self) -> &PatternFilter {
        &self.path_filter
    }

    /// Compute the capabilities document for the resource at `resource_path`.
    ///
    /// 1. The path must match the configured path allow-list
    /// 2. The resource must exist and be a capabilities resource
    /// 3. The resource must declare `namespace_patterns`
    /// 4. Sources are aggregated under those patterns
    pub fn handle(&self, resource_path: &str) -> Result<CapabilityDocument, GatewayError> {
        let path = normalize_path(resource_path);

        if !self.path_filter.accept(&path) {
            tracing::debug!(path = %path, "resource path not allow-listed");
            return Err(GatewayError::Forbidden(format!(
                "Resource path {} is not allowed",
                path
            )));
        }

        let resource = self
            .resolver
            .resolve(&path)
            .filter(|r| r.resource_type == CAPABILITIES_RESOURCE_TYPE)
            .ok_or_else(|| GatewayError::NotFound(path.clone()))?;

        // Every serving resource must say what it exposes; there is no default.
        let patterns = match resource.string_list(NAMESPACES_PROP) {
            None => {
                tracing::debug!(path = %path, "resource does not declare namespaces");
                return Err(GatewayError::Forbidden(format!(
                    "Missing property {}",
                    NAMESPACES_PROP
                )));
            }
            Some(Err(err)) => return Err(GatewayError::Forbidden(err.to_string())),
            Some(Ok(patterns)) => patterns,
        };
        let namespace_filter = PatternFilter::new(&patterns)?;

        let sources = self.registry.snapshot();
        let ctx = SourceContext::new(self.resolver.clone(), path.clone());
        let result = self.aggregator.aggregate(&sources, &namespace_filter, &ctx)?;

        tracing::debug!(
            path = %path,
            namespaces = result.len(),
            sources = sources.len(),
            "capabilities aggregated"
        );
        Ok(result.into_document())
    }

    /// Routing properties of the gateway's own request handler.
    pub fn handler_registration() -> HandlerRegistration {
        HandlerRegistration::new("CapabilitiesGateway")
            .with_property("route.resourceTypes", CAPABILITIES_RESOURCE_TYPE)
            .with_property("route.methods", "GET")
            .with_property("route.extensions", "json")
    }
}

impl fmt::Display for ResponseGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ResponseGateway: {} CapabilitySource active",
            self.registry.len()
        )
    }
}

impl fmt::Debug for ResponseGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseGateway")
            .field("path_filter", &self.path_filter.patterns())
            .field("sources", &self.registry.namespaces())
            .field("resolver", &self.resolver.name())
            .finish()
    }
}

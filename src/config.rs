//! Gateway configuration.
//!
//! Loaded from a YAML file (see `CAPABILITIES_CONFIG` in the server binary):
//!
//! ```yaml
//! resource_path_patterns: ["/var/.*"]
//! resources:
//!   - path: /var/capabilities
//!     properties:
//!       namespace_patterns: ["org\\.example\\..*"]
//! handler_sources:
//!   - namespace: org.example.handlers
//!     selector: "(route.extensions=json)"
//! static_sources:
//!   - namespace: org.example.build
//!     capabilities: { version: "1.0" }
//! ```
//!
//! An empty `resource_path_patterns` list allows no path at all.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::capabilities::{CapabilitySource, SourceRegistry};
use crate::policy::{PatternError, PatternFilter};
use crate::resources::{Resource, ResourceTree};
use crate::server::ResponseGateway;
use crate::sources::{HandlerCatalog, HandlerSource, Selector, SelectorError, StaticSource};

/// Errors raised while loading or applying the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid resource path pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("Invalid handler selector: {0}")]
    Selector(#[from] SelectorError),

    #[error("Capability source with empty namespace")]
    EmptyNamespace,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Resource paths allowed to serve capabilities.
    #[serde(default)]
    pub resource_path_patterns: Vec<String>,

    /// Content tree served by the gateway.
    #[serde(default)]
    pub resources: Vec<Resource>,

    #[serde(default)]
    pub handler_sources: Vec<HandlerSourceConfig>,

    #[serde(default)]
    pub static_sources: Vec<StaticSourceConfig>,
}

/// A [`HandlerSource`] instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerSourceConfig {
    pub namespace: String,

    /// LDAP-style filter selecting handlers; empty selects all.
    #[serde(default)]
    pub selector: String,
}

/// A [`StaticSource`] instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticSourceConfig {
    pub namespace: String,

    #[serde(default)]
    pub capabilities: Map<String, Value>,
}

impl GatewayConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a config file. A missing file yields the (fail-closed) default.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "capabilities config not found, no resource path is allowed"
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn path_filter(&self) -> Result<PatternFilter, PatternError> {
        PatternFilter::new(&self.resource_path_patterns)
    }

    pub fn resource_tree(&self) -> ResourceTree {
        let tree = ResourceTree::new("config");
        for resource in &self.resources {
            tree.insert(resource.clone());
        }
        tree
    }

    /// Instantiate every configured source, in file order.
    pub fn sources(
        &self,
        catalog: &Arc<HandlerCatalog>,
    ) -> Result<Vec<Arc<dyn CapabilitySource>>, ConfigError> {
        let mut sources: Vec<Arc<dyn CapabilitySource>> = Vec::new();
        for cfg in &self.handler_sources {
            if cfg.namespace.is_empty() {
                return Err(ConfigError::EmptyNamespace);
            }
            let selector = Selector::parse(&cfg.selector)?;
            sources.push(Arc::new(HandlerSource::new(
                cfg.namespace.clone(),
                selector,
                catalog.clone(),
            )));
        }
        for cfg in &self.static_sources {
            if cfg.namespace.is_empty() {
                return Err(ConfigError::EmptyNamespace);
            }
            sources.push(Arc::new(StaticSource::new(
                cfg.namespace.clone(),
                cfg.capabilities.clone(),
            )));
        }
        Ok(sources)
    }

    /// Wire a gateway: bind the configured sources and register the
    /// gateway's own handler in `catalog`.
    pub fn build_gateway(&self, catalog: &Arc<HandlerCatalog>) -> Result<ResponseGateway, ConfigError> {
        let path_filter = self.path_filter()?;
        let registry = Arc::new(SourceRegistry::new());
        for source in self.sources(catalog)? {
            registry.bind(source);
        }
        catalog.register(ResponseGateway::handler_registration());

        Ok(ResponseGateway::new(
            path_filter,
            registry,
            Arc::new(self.resource_tree()),
        ))
    }
}

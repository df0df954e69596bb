//! Addressable resources.
//!
//! The capabilities endpoint is bound to resources in a content tree: each
//! resource has a path, a resource type and a property map. The gateway
//! only serves resources of type [`CAPABILITIES_RESOURCE_TYPE`], and reads
//! the namespaces they are willing to expose from their properties.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Resource type served by the capabilities gateway.
pub const CAPABILITIES_RESOURCE_TYPE: &str = "sling/capabilities";

fn default_resource_type() -> String {
    CAPABILITIES_RESOURCE_TYPE.to_string()
}

/// A property does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("property {key} is not a string list")]
    NotAList { key: String },

    #[error("non-string entry in property {key}")]
    NonStringEntry { key: String },
}

/// A node of the content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Absolute path, e.g. `/var/capabilities`.
    pub path: String,

    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Arbitrary resource properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Resource {
    /// A capabilities resource with no properties.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            resource_type: default_resource_type(),
            properties: Map::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Read a multi-valued string property.
    ///
    /// A single string is treated as a one-element list. Returns `None` when
    /// the property is absent, and `Some(Err(..))` when it is present but
    /// not a string or a list of strings.
    pub fn string_list(&self, key: &str) -> Option<Result<Vec<String>, PropertyError>> {
        let value = self.properties.get(key)?;
        let result = match value {
            Value::String(s) => Ok(vec![s.clone()]),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| PropertyError::NonStringEntry {
                            key: key.to_string(),
                        })
                })
                .collect(),
            _ => Err(PropertyError::NotAList {
                key: key.to_string(),
            }),
        };
        Some(result)
    }
}

/// Read access to the content tree.
///
/// A resolver is handed to capability sources as part of their request
/// context, so sources can look at content when computing capabilities.
pub trait ResourceResolver: Send + Sync + fmt::Debug {
    /// Look up a resource by absolute path.
    fn resolve(&self, path: &str) -> Option<Resource>;

    /// Short human-readable identification of this resolver.
    fn name(&self) -> &str;
}

/// In-memory content tree.
#[derive(Debug)]
pub struct ResourceTree {
    name: String,
    resources: RwLock<HashMap<String, Resource>>,
}

impl ResourceTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: RwLock::new(HashMap::new()),
        }
    }

    /// Add or replace a resource at its path.
    pub fn insert(&self, resource: Resource) {
        let path = normalize_path(&resource.path);
        self.resources.write().insert(path, resource);
    }

    pub fn remove(&self, path: &str) -> Option<Resource> {
        self.resources.write().remove(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }
}

impl Default for ResourceTree {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl ResourceResolver for ResourceTree {
    fn resolve(&self, path: &str) -> Option<Resource> {
        self.resources.read().get(&normalize_path(path)).cloned()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Ensure a single leading slash and no trailing slash (except for the root).
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("var/caps"), "/var/caps");
        assert_eq!(normalize_path("/var/caps/"), "/var/caps");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_tree_resolve() {
        let tree = ResourceTree::new("test");
        tree.insert(Resource::new("/var/caps").with_property("a", 1));

        let r = tree.resolve("var/caps").unwrap();
        assert_eq!(r.path, "/var/caps");
        assert_eq!(r.resource_type, CAPABILITIES_RESOURCE_TYPE);
        assert_eq!(r.property("a"), Some(&json!(1)));
        assert!(tree.resolve("/var/other").is_none());

        assert!(tree.remove("/var/caps").is_some());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_string_list() {
        let r = Resource::new("/x")
            .with_property("many", json!(["a", "b"]))
            .with_property("one", "c")
            .with_property("bad", json!([1, "b"]))
            .with_property("num", 3);

        assert_eq!(r.string_list("many").unwrap().unwrap(), vec!["a", "b"]);
        assert_eq!(r.string_list("one").unwrap().unwrap(), vec!["c"]);
        assert_eq!(
            r.string_list("bad").unwrap(),
            Err(PropertyError::NonStringEntry { key: "bad".into() })
        );
        assert_eq!(
            r.string_list("num").unwrap(),
            Err(PropertyError::NotAList { key: "num".into() })
        );
        assert_eq!(
            PropertyError::NotAList { key: "num".into() }.to_string(),
            "property num is not a string list"
        );
        assert!(r.string_list("missing").is_none());
    }

    #[test]
    fn test_resource_yaml_defaults() {
        let r: Resource = serde_yaml::from_str("path: /var/caps\n").unwrap();
        assert_eq!(r.resource_type, CAPABILITIES_RESOURCE_TYPE);
        assert!(r.properties.is_empty());
    }
}

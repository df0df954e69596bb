//! Source reporting a fixed set of values from configuration.

use crate::capabilities::{Capabilities, CapabilitySource, SourceContext, SourceError};

#[derive(Debug, Clone)]
pub struct StaticSource {
    namespace: String,
    values: Capabilities,
}

impl StaticSource {
    pub fn new(namespace: impl Into<String>, values: Capabilities) -> Self {
        Self {
            namespace: namespace.into(),
            values,
        }
    }
}

impl CapabilitySource for StaticSource {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn capabilities(&self, _ctx: &SourceContext) -> Result<Capabilities, SourceError> {
        Ok(self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{ResourceResolver, ResourceTree};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_reports_configured_values_in_order() {
        let values: Capabilities =
            serde_json::from_value(json!({"version": "1.0", "features": ["a", "b"], "beta": false}))
                .unwrap();
        let source = StaticSource::new("org.example.build", values);
        let resolver: Arc<dyn ResourceResolver> = Arc::new(ResourceTree::default());

        let caps = source.capabilities(&SourceContext::new(resolver, "/")).unwrap();
        assert_eq!(source.namespace(), "org.example.build");
        assert_eq!(caps.keys().collect::<Vec<_>>(), vec!["version", "features", "beta"]);
        assert_eq!(caps["features"], json!(["a", "b"]));
    }
}

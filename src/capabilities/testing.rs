//! Test doubles shared by the capabilities and server tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;

use super::source::{Capabilities, CapabilitySource, SourceContext, SourceError};

/// Reports `propsCount` synthetic pairs `KEY_<i>_<ns>` → `VALUE_<i>_<ns>`
/// plus the resolver name.
///
/// A namespace containing `EXCEPTION` fails, one containing `PANIC` panics.
pub struct MockSource {
    namespace: String,
    props_count: usize,
    extra: Vec<(String, Value)>,
    calls: Option<Arc<AtomicUsize>>,
}

impl MockSource {
    pub fn new(namespace: &str, props_count: usize) -> Self {
        Self {
            namespace: namespace.to_string(),
            props_count,
            extra: Vec::new(),
            calls: None,
        }
    }

    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.extra.push((key.to_string(), value));
        self
    }

    /// Count invocations into `calls`.
    pub fn counting(mut self, calls: Arc<AtomicUsize>) -> Self {
        self.calls = Some(calls);
        self
    }
}

impl CapabilitySource for MockSource {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn capabilities(&self, ctx: &SourceContext) -> Result<Capabilities, SourceError> {
        if let Some(calls) = &self.calls {
            calls.fetch_add(1, Ordering::SeqCst);
        }
        if self.namespace.contains("EXCEPTION") {
            return Err(SourceError::new("IllegalArgumentException", "Simulating a problem"));
        }
        if self.namespace.contains("PANIC") {
            panic!("source panicked");
        }

        let mut props = Capabilities::new();
        for i in 0..self.props_count {
            props.insert(
                format!("KEY_{}_{}", i, self.namespace),
                Value::String(format!("VALUE_{}_{}", i, self.namespace)),
            );
        }
        for (k, v) in &self.extra {
            props.insert(k.clone(), v.clone());
        }
        if self.props_count > 0 {
            props.insert("resolver".to_string(), Value::String(ctx.resolver.name().to_string()));
        }
        Ok(props)
    }
}

//! Source Registry: the live set of capability sources.
//!
//! Sources come and go while the server runs. The registry is copy-on-write:
//! every bind/unbind publishes a fresh list, and readers take an `Arc` to
//! whichever list is current. An in-flight aggregation keeps iterating its
//! own snapshot no matter what is bound or unbound meanwhile.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::source::CapabilitySource;

/// Immutable view of the registered sources, in registration order.
pub type SourceSnapshot = Arc<Vec<Arc<dyn CapabilitySource>>>;

/// Thread-safe, copy-on-write collection of active sources.
///
/// Writers are serialized by their own mutex and build the next list
/// outside the read/write lock, which is only taken to swap the `Arc`.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: RwLock<SourceSnapshot>,
    writer: Mutex<()>,
}

impl SourceRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source. Duplicate namespaces are accepted here and
    /// reported by the aggregator.
    pub fn bind(&self, source: Arc<dyn CapabilitySource>) {
        let _writing = self.writer.lock();
        let current = self.snapshot();
        tracing::debug!(namespace = source.namespace(), "binding capability source");
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(source);
        self.publish(next);
    }

    /// Remove a source by identity. Returns whether it was registered.
    pub fn unbind(&self, source: &Arc<dyn CapabilitySource>) -> bool {
        let _writing = self.writer.lock();
        let current = self.snapshot();
        let Some(index) = current.iter().position(|s| Arc::ptr_eq(s, source)) else {
            return false;
        };
        tracing::debug!(namespace = source.namespace(), "unbinding capability source");
        let mut next: Vec<_> = current.iter().cloned().collect();
        next.remove(index);
        self.publish(next);
        true
    }

    /// Swap in a new list. The previous one is released after the lock.
    fn publish(&self, next: Vec<Arc<dyn CapabilitySource>>) {
        let previous = std::mem::replace(&mut *self.sources.write(), Arc::new(next));
        drop(previous);
    }

    /// The current list of sources.
    ///
    /// The lock is only held to clone the `Arc`; iteration happens outside it.
    pub fn snapshot(&self) -> SourceSnapshot {
        self.sources.read().clone()
    }

    /// Get the number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.read().is_empty()
    }

    /// Namespaces of the registered sources, in registration order.
    pub fn namespaces(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|s| s.namespace().to_string())
            .collect()
    }
}

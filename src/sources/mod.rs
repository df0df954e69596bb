//! Built-in capability sources.
//!
//! - [`HandlerSource`]: routing properties of registered request handlers
//! - [`StaticSource`]: fixed values declared in the configuration file
//!
//! Anything else implementing [`CapabilitySource`](crate::capabilities::CapabilitySource)
//! can be bound to the registry alongside these.

pub mod fixed;
pub mod handlers;

pub use fixed::StaticSource;
pub use handlers::{
    HandlerCatalog, HandlerRegistration, HandlerSource, Selector, SelectorError,
    ROUTE_PROPERTY_PREFIX,
};

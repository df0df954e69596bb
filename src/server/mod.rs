//! HTTP server for the capabilities endpoint.
//!
//! # Endpoints
//!
//! - `GET /health`: Liveness check
//! - `GET /{*path}.json`: Capabilities of an allow-listed resource
//!
//! Status codes: 200 with the JSON document, 403 when the path is not
//! allow-listed or the resource declares no `namespace_patterns`, 404 for
//! unknown resources, 500 for configuration errors such as duplicate
//! namespaces.

pub mod gateway;
pub mod routes;

pub use gateway::{GatewayError, ResponseGateway, NAMESPACES_PROP};
pub use routes::{app_router, AppState};

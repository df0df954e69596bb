//! # Exposure Policy
//!
//! Administrator-controlled allow-lists deciding what the capabilities
//! endpoint may reveal. Two independent filters are applied per request:
//!
//! ```text
//! GET /var/capabilities.json
//!   → path filter        accept("/var/capabilities")        else 403
//!   → namespace filter   accept(source.namespace()) per source, else skipped
//! ```
//!
//! Both are [`PatternFilter`]s: full-match regular expressions, fail-closed
//! when no pattern is configured.

pub mod pattern_filter;

pub use pattern_filter::{PatternError, PatternFilter};

//! Registered request handlers as a capability source.
//!
//! Request handlers announce themselves in a [`HandlerCatalog`] together with
//! their routing properties (`route.methods`, `route.extensions`, ...). A
//! [`HandlerSource`] selects some of them with an LDAP-style filter and
//! reports their `route.*` properties, so clients can discover which
//! behaviors the server offers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::capabilities::{normalize_value, Capabilities, CapabilitySource, SourceContext, SourceError};

/// Only properties with this prefix are reported.
pub const ROUTE_PROPERTY_PREFIX: &str = "route.";

/// A request handler and its routing properties.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerRegistration {
    /// Short type-like name, used to build the reported key.
    pub name: String,
    pub properties: Map<String, Value>,
}

impl HandlerRegistration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Live set of registered request handlers.
#[derive(Debug, Default)]
pub struct HandlerCatalog {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(u64, HandlerRegistration)>>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, returning its id.
    pub fn register(&self, handler: HandlerRegistration) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(id, name = %handler.name, "registering request handler");
        self.handlers.write().push((id, handler));
        id
    }

    pub fn unregister(&self, id: u64) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    /// Copy of every handler matching `selector`.
    pub fn select(&self, selector: &Selector) -> Vec<(u64, HandlerRegistration)> {
        self.handlers
            .read()
            .iter()
            .filter(|(_, h)| selector.matches(&h.properties))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

/// Selector syntax error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector '{input}' at offset {offset}: {reason}")]
pub struct SelectorError {
    pub input: String,
    pub offset: usize,
    pub reason: String,
}

/// LDAP-style property filter.
///
/// Supports `(key=value)`, `(key=*)`, `(&..)`, `(|..)` and `(!..)`. The empty
/// string selects everything. A multi-valued property matches if any of its
/// values does.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    All,
    Equals(String, String),
    Present(String),
    And(Vec<Selector>),
    Or(Vec<Selector>),
    Not(Box<Selector>),
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Selector::All);
        }
        let mut parser = SelectorParser {
            input: trimmed,
            pos: 0,
        };
        let selector = parser.filter()?;
        if parser.pos != trimmed.len() {
            return Err(parser.error("trailing input"));
        }
        Ok(selector)
    }

    pub fn matches(&self, properties: &Map<String, Value>) -> bool {
        match self {
            Selector::All => true,
            Selector::Present(key) => properties.get(key).is_some_and(|v| !v.is_null()),
            Selector::Equals(key, expected) => properties
                .get(key)
                .is_some_and(|v| value_matches(v, expected)),
            Selector::And(items) => items.iter().all(|s| s.matches(properties)),
            Selector::Or(items) => items.iter().any(|s| s.matches(properties)),
            Selector::Not(inner) => !inner.matches(properties),
        }
    }
}

fn value_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        Value::Array(items) => items.iter().any(|v| value_matches(v, expected)),
        Value::Null | Value::Object(_) => false,
    }
}

struct SelectorParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn error(&self, reason: &str) -> SelectorError {
        SelectorError {
            input: self.input.to_string(),
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn expect(&mut self, c: char) -> Result<(), SelectorError> {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c)))
        }
    }

    fn filter(&mut self) -> Result<Selector, SelectorError> {
        self.expect('(')?;
        let selector = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Selector::And(self.filter_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Selector::Or(self.filter_list()?)
            }
            Some('!') => {
                self.pos += 1;
                Selector::Not(Box::new(self.filter()?))
            }
            _ => self.comparison()?,
        };
        self.expect(')')?;
        Ok(selector)
    }

    fn filter_list(&mut self) -> Result<Vec<Selector>, SelectorError> {
        let mut items = Vec::new();
        while self.peek() == Some('(') {
            items.push(self.filter()?);
        }
        if items.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(items)
    }

    fn comparison(&mut self) -> Result<Selector, SelectorError> {
        let rest = &self.input[self.pos..];
        let end = rest
            .find(')')
            .ok_or_else(|| self.error("unterminated comparison"))?;
        let (key, value) = rest[..end]
            .split_once('=')
            .ok_or_else(|| self.error("expected key=value"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(self.error("empty key"));
        }
        self.pos += end;
        Ok(if value == "*" {
            Selector::Present(key.to_string())
        } else {
            Selector::Equals(key.to_string(), value.to_string())
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => Ok(()),
            Selector::Equals(k, v) => write!(f, "({}={})", k, v),
            Selector::Present(k) => write!(f, "({}=*)", k),
            Selector::And(items) | Selector::Or(items) => {
                let op = if matches!(self, Selector::And(_)) { '&' } else { '|' };
                write!(f, "({}", op)?;
                for item in items {
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Selector::Not(inner) => write!(f, "(!{})", inner),
        }
    }
}

/// Reports the routing properties of the selected request handlers.
///
/// Keys are `<name>_<id as 8 hex digits>`; values are maps of the handler's
/// `route.*` properties with single-element lists collapsed.
#[derive(Debug)]
pub struct HandlerSource {
    namespace: String,
    selector: Selector,
    catalog: Arc<HandlerCatalog>,
}

impl HandlerSource {
    pub fn new(namespace: impl Into<String>, selector: Selector, catalog: Arc<HandlerCatalog>) -> Self {
        Self {
            namespace: namespace.into(),
            selector,
            catalog,
        }
    }

    fn handler_capabilities(handler: &HandlerRegistration) -> Map<String, Value> {
        handler
            .properties
            .iter()
            .filter(|(k, v)| k.starts_with(ROUTE_PROPERTY_PREFIX) && !v.is_null())
            .map(|(k, v)| (k.clone(), normalize_value(v.clone())))
            .collect()
    }
}

impl CapabilitySource for HandlerSource {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn capabilities(&self, _ctx: &SourceContext) -> Result<Capabilities, SourceError> {
        Ok(self
            .catalog
            .select(&self.selector)
            .iter()
            .map(|(id, handler)| {
                (
                    format!("{}_{:08x}", handler.name, id),
                    Value::Object(Self::handler_capabilities(handler)),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{ResourceResolver, ResourceTree};
    use regex::Regex;
    use serde_json::json;

    fn mock_handler(extension: &str, id: u64) -> HandlerRegistration {
        HandlerRegistration::new("MockHandler")
            .with_property("route.extensions", extension)
            .with_property("route.id", id)
            .with_property("some.other.property", id + 12)
    }

    fn ctx() -> SourceContext {
        let resolver: Arc<dyn ResourceResolver> = Arc::new(ResourceTree::default());
        SourceContext::new(resolver, "/")
    }

    #[test]
    fn test_handler_source() {
        let catalog = Arc::new(HandlerCatalog::new());
        for (ext, id) in [("json", 12), ("txt", 24), ("json", 41)] {
            catalog.register(mock_handler(ext, id));
        }
        let selector = Selector::parse("(route.extensions=json)").unwrap();
        let source = HandlerSource::new("org.example.handlers.TEST_NS", selector, catalog);

        assert_eq!(source.namespace(), "org.example.handlers.TEST_NS");
        let caps = source.capabilities(&ctx()).unwrap();
        assert_eq!(caps.len(), 2, "expecting capabilities for 2 json handlers");

        let key_pattern = Regex::new(r"^MockHandler_[0-9a-f]{8}$").unwrap();
        for key in caps.keys() {
            assert!(key_pattern.is_match(key), "unexpected key {}", key);
        }
        for value in caps.values() {
            let map = value.as_object().expect("expecting maps in values");
            assert_eq!(map.len(), 2, "expecting 2 properties per map");
            let id = map["route.id"].to_string();
            assert!(id == "12" || id == "41");
        }
    }

    #[test]
    fn test_unregistered_handlers_disappear() {
        let catalog = Arc::new(HandlerCatalog::new());
        let id = catalog.register(mock_handler("json", 1));
        let source = HandlerSource::new("ns", Selector::All, catalog.clone());
        assert_eq!(source.capabilities(&ctx()).unwrap().len(), 1);

        assert!(catalog.unregister(id));
        assert!(!catalog.unregister(id));
        assert!(source.capabilities(&ctx()).unwrap().is_empty());
    }

    #[test]
    fn test_single_element_lists_are_collapsed() {
        let catalog = Arc::new(HandlerCatalog::new());
        catalog.register(
            HandlerRegistration::new("Gateway")
                .with_property("route.methods", json!(["GET"]))
                .with_property("route.extensions", json!(["json", "txt"]))
                .with_property("route.none", Value::Null),
        );
        let caps = HandlerSource::new("ns", Selector::All, catalog)
            .capabilities(&ctx())
            .unwrap();
        let handler = caps["Gateway_00000001"].as_object().unwrap();
        assert_eq!(handler["route.methods"], json!("GET"));
        assert_eq!(handler["route.extensions"], json!(["json", "txt"]));
        assert!(!handler.contains_key("route.none"));
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!(Selector::parse("").unwrap(), Selector::All);
        assert_eq!(
            Selector::parse("(a=b)").unwrap(),
            Selector::Equals("a".into(), "b".into())
        );
        assert_eq!(Selector::parse("(a=*)").unwrap(), Selector::Present("a".into()));

        let complex = Selector::parse("(&(a=1)(|(b=x)(b=y))(!(c=*)))").unwrap();
        assert_eq!(complex.to_string(), "(&(a=1)(|(b=x)(b=y))(!(c=*)))");
    }

    #[test]
    fn test_selector_parse_errors() {
        assert!(Selector::parse("a=b").is_err());
        assert!(Selector::parse("(a=b").is_err());
        assert!(Selector::parse("(ab)").is_err());
        assert!(Selector::parse("(&)").is_err());
        assert!(Selector::parse("(a=b)x").is_err());
        assert!(Selector::parse("(=b)").is_err());
    }

    #[test]
    fn test_selector_matches() {
        let props: Map<String, Value> = serde_json::from_value(json!({
            "route.extensions": ["json", "txt"],
            "route.id": 12,
            "flag": true,
        }))
        .unwrap();

        assert!(Selector::parse("(route.extensions=txt)").unwrap().matches(&props));
        assert!(Selector::parse("(route.id=12)").unwrap().matches(&props));
        assert!(Selector::parse("(flag=true)").unwrap().matches(&props));
        assert!(Selector::parse("(&(route.id=12)(flag=*))").unwrap().matches(&props));
        assert!(Selector::parse("(|(route.id=1)(flag=true))").unwrap().matches(&props));
        assert!(Selector::parse("(!(missing=*))").unwrap().matches(&props));
        assert!(!Selector::parse("(route.extensions=html)").unwrap().matches(&props));
        assert!(!Selector::parse("(missing=*)").unwrap().matches(&props));
    }
}

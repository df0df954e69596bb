//! Regex allow-lists.
//!
//! A [`PatternFilter`] is the building block of both gates: the resource
//! path allow-list configured by the administrator, and the namespace
//! allow-list declared on each serving resource.

use regex::Regex;
use thiserror::Error;

/// A pattern failed to compile.
#[derive(Debug, Error)]
#[error("invalid pattern '{pattern}': {source}")]
pub struct PatternError {
    /// The pattern text as supplied.
    pub pattern: String,
    /// Underlying compile error.
    #[source]
    pub source: regex::Error,
}

/// Accepts a candidate iff it fully matches at least one pattern.
///
/// With no patterns the filter rejects everything.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    patterns: Vec<Regex>,
    sources: Vec<String>,
}

impl PatternFilter {
    /// Compile every pattern once. The first invalid pattern aborts construction.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        let mut sources = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let invalid = |source: regex::Error| PatternError {
                pattern: pattern.to_string(),
                source,
            };
            // Validate on its own first: an unbalanced `)` would otherwise
            // close the anchoring group and escape the full match.
            Regex::new(pattern).map_err(invalid)?;
            // Anchor the whole alternation so `a|b` cannot match a prefix.
            let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(invalid)?;
            compiled.push(regex);
            sources.push(pattern.to_string());
        }
        Ok(Self {
            patterns: compiled,
            sources,
        })
    }

    /// A filter that accepts nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn accept(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(candidate))
    }

    /// The patterns as written.
    pub fn patterns(&self) -> &[String] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

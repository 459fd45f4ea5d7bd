//! Public/protected path rules and the path → role map

use regex::Regex;
use std::collections::{BTreeSet, HashMap};

/// A single path pattern
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// Matches when the path equals or starts with the literal
    Prefix(String),
    /// Matches when the expression finds a match in the path
    Regex(Regex),
}

impl PathPattern {
    /// Literal prefix pattern
    pub fn prefix(literal: impl Into<String>) -> Self {
        PathPattern::Prefix(literal.into())
    }

    /// Compile a regular-expression pattern
    pub fn regex(expression: &str) -> Result<Self, regex::Error> {
        Regex::new(expression).map(PathPattern::Regex)
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Prefix(literal) => path.starts_with(literal.as_str()),
            PathPattern::Regex(re) => re.is_match(path),
        }
    }
}

/// Compiled path rule set
///
/// Public patterns always win over protected ones: a path that matches any
/// public pattern is never challenged.
#[derive(Debug, Clone, Default)]
pub struct PathRules {
    public: Vec<PathPattern>,
    protected: Vec<PathPattern>,
    roles: HashMap<String, BTreeSet<String>>,
}

impl PathRules {
    pub fn new(
        public: Vec<PathPattern>,
        protected: Vec<PathPattern>,
        roles: HashMap<String, BTreeSet<String>>,
    ) -> Self {
        Self {
            public,
            protected,
            roles,
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|p| p.matches(path))
    }

    /// An empty protected list means every non-public path is protected.
    pub fn is_protected(&self, path: &str) -> bool {
        if self.is_public(path) {
            return false;
        }
        self.protected.is_empty() || self.protected.iter().any(|p| p.matches(path))
    }

    /// Roles required for `path`, looked up by exact key
    pub fn required_roles(&self, path: &str) -> BTreeSet<String> {
        self.roles.get(path).cloned().unwrap_or_default()
    }
}

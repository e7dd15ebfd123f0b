//! Package ecosystem tags reported by the scanner

use serde::{Deserialize, Serialize};
use std::fmt;

/// Package-management platform a dependency belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Ecosystem {
    /// Node.js (npm registry)
    #[default]
    Node,
    /// Python (PyPI)
    Python,
    /// Ruby (RubyGems)
    Ruby,
    /// Go modules
    Go,
    /// Any other tag, passed through verbatim
    Other(String),
}

impl Ecosystem {
    /// Returns the machine tag for this ecosystem
    pub fn tag(&self) -> &str {
        match self {
            Ecosystem::Node => "nodejs",
            Ecosystem::Python => "python",
            Ecosystem::Ruby => "ruby",
            Ecosystem::Go => "go",
            Ecosystem::Other(tag) => tag,
        }
    }

    /// Returns the display label used in Story titles
    pub fn label(&self) -> &str {
        match self {
            Ecosystem::Node => "Node.js",
            Ecosystem::Python => "Python",
            Ecosystem::Ruby => "Ruby",
            Ecosystem::Go => "Go",
            Ecosystem::Other(tag) => tag,
        }
    }
}

impl From<String> for Ecosystem {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "nodejs" => Ecosystem::Node,
            "python" => Ecosystem::Python,
            "ruby" => Ecosystem::Ruby,
            "go" => Ecosystem::Go,
            _ => Ecosystem::Other(tag),
        }
    }
}

impl From<&str> for Ecosystem {
    fn from(tag: &str) -> Self {
        Ecosystem::from(tag.to_string())
    }
}

impl From<Ecosystem> for String {
    fn from(ecosystem: Ecosystem) -> Self {
        ecosystem.tag().to_string()
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

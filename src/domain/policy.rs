//! Update policy governing which detected updates are actioned

use super::ChangeType;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Allowed change types, denylist and exclusion patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePolicy {
    /// Allow patch updates (1.0.0 → 1.0.1)
    #[serde(default = "default_true")]
    pub allow_patch: bool,
    /// Allow minor updates (1.0.0 → 1.1.0)
    #[serde(default = "default_true")]
    pub allow_minor: bool,
    /// Allow major updates (1.0.0 → 2.0.0); configuration may never enable this
    #[serde(default)]
    pub allow_major: bool,
    /// Exact package names to exclude (case-sensitive)
    #[serde(default)]
    pub denylist: Vec<String>,
    /// Glob patterns matched against package names (legacy)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            allow_patch: true,
            allow_minor: true,
            allow_major: false,
            denylist: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl UpdatePolicy {
    /// Create the default policy (patch and minor allowed)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set packages to deny
    pub fn with_denylist(mut self, denylist: Vec<String>) -> Self {
        self.denylist = denylist;
        self
    }

    /// Set glob exclusion patterns
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Set whether patch updates are allowed
    pub fn with_allow_patch(mut self, allow: bool) -> Self {
        self.allow_patch = allow;
        self
    }

    /// Set whether minor updates are allowed
    pub fn with_allow_minor(mut self, allow: bool) -> Self {
        self.allow_minor = allow;
        self
    }

    /// Check if a change type is allowed; unknown types never are
    pub fn allows(&self, change_type: ChangeType) -> bool {
        match change_type {
            ChangeType::Patch => self.allow_patch,
            ChangeType::Minor => self.allow_minor,
            ChangeType::Major => self.allow_major,
            ChangeType::Unknown => false,
        }
    }

    /// Check if a package is denylisted (exact, case-sensitive)
    pub fn is_denylisted(&self, package: &str) -> bool {
        self.denylist.iter().any(|p| p == package)
    }
}

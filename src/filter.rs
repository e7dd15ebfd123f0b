//! Policy-based partition of detected updates
//!
//! Each dependency is checked in order: denylist, exclusion patterns, then
//! the allowed change types. The first rule that matches decides why it is
//! excluded; anything passing all three is recommended.

use crate::domain::{ChangeType, Dependency, DependencyReport, UpdatePolicy};
use crate::error::ConfigError;
use glob::{MatchOptions, Pattern};
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::info;

/// `*` and `?` never match `/`, so `@types/*` does not reach nested scopes
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Why an update was not recommended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// Package name is on the denylist
    Denylisted,
    /// Package name matched an exclusion pattern
    MatchesPattern(String),
    /// Change type is not allowed by the policy
    PolicyDisallows(ChangeType),
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Denylisted => write!(f, "Package is denylisted"),
            ExclusionReason::MatchesPattern(_) => write!(f, "Matches exclusion pattern"),
            ExclusionReason::PolicyDisallows(ChangeType::Unknown) => {
                write!(f, "Unknown change type not allowed by policy")
            }
            ExclusionReason::PolicyDisallows(change_type) => {
                write!(f, "{} updates not allowed by policy", change_type.title_label())
            }
        }
    }
}

impl Serialize for ExclusionReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A dependency held back by the policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedUpdate {
    #[serde(flatten)]
    pub dependency: Dependency,
    pub reason: ExclusionReason,
}

/// Recommended and excluded updates, each in report order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterResult {
    pub recommended: Vec<Dependency>,
    pub excluded: Vec<ExcludedUpdate>,
}

impl FilterResult {
    /// Total number of dependencies that were classified
    pub fn total(&self) -> usize {
        self.recommended.len() + self.excluded.len()
    }

    /// Human-readable summary of both partitions
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        if self.recommended.is_empty() {
            lines.push("No updates recommended.".to_string());
        } else {
            lines.push(format!("Recommended updates: {}", self.recommended.len()));
            for dep in &self.recommended {
                lines.push(format!(
                    "  - {}: {} ({})",
                    dep.package,
                    dep.version_change(),
                    dep.change_type
                ));
            }
        }

        if !self.excluded.is_empty() {
            lines.push(String::new());
            lines.push(format!("Excluded: {}", self.excluded.len()));
            for item in &self.excluded {
                lines.push(format!(
                    "  - {}: {} ({})",
                    item.dependency.package,
                    item.dependency.version_change(),
                    item.reason
                ));
            }
        }

        lines.join("\n")
    }
}

/// Applies an [`UpdatePolicy`] to scan reports
#[derive(Debug, Clone)]
pub struct UpdateFilter {
    policy: UpdatePolicy,
    patterns: Vec<Pattern>,
}

impl UpdateFilter {
    /// Build a filter, compiling the policy's exclusion patterns
    pub fn new(policy: UpdatePolicy) -> Result<Self, ConfigError> {
        let patterns = policy
            .exclude_patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| ConfigError::InvalidPattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { policy, patterns })
    }

    /// The policy this filter applies
    pub fn policy(&self) -> &UpdatePolicy {
        &self.policy
    }

    fn matching_pattern(&self, package: &str) -> Option<&Pattern> {
        self.patterns
            .iter()
            .find(|p| p.matches_with(package, MATCH_OPTIONS))
    }

    /// Decide whether a single dependency is excluded, and why
    pub fn classify(&self, dependency: &Dependency) -> Option<ExclusionReason> {
        if self.policy.is_denylisted(&dependency.package) {
            return Some(ExclusionReason::Denylisted);
        }
        if let Some(pattern) = self.matching_pattern(&dependency.package) {
            return Some(ExclusionReason::MatchesPattern(pattern.as_str().to_string()));
        }
        if !self.policy.allows(dependency.change_type) {
            return Some(ExclusionReason::PolicyDisallows(dependency.change_type));
        }
        None
    }

    /// Partition a report into recommended and excluded updates
    pub fn filter(&self, report: &DependencyReport) -> FilterResult {
        let mut result = FilterResult::default();

        for dep in &report.dependencies {
            match self.classify(dep) {
                Some(reason) => {
                    info!("Excluding {}: {}", dep.package, reason);
                    result.excluded.push(ExcludedUpdate {
                        dependency: dep.clone(),
                        reason,
                    });
                }
                None => result.recommended.push(dep.clone()),
            }
        }

        info!(
            "Filtered {} dependencies: {} recommended, {} excluded",
            result.total(),
            result.recommended.len(),
            result.excluded.len()
        );

        result
    }
}

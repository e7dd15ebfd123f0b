//! Scan report produced once per scanner invocation

use super::{Dependency, Ecosystem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outdated dependencies found in a target repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReport {
    /// When the scan ran
    pub scanned_at: DateTime<Utc>,
    /// Target repository in `owner/name` form
    pub repository: String,
    /// Ecosystem of the scanned manifest
    pub ecosystem: Ecosystem,
    /// Dependencies in the order the detection tool reported them
    pub dependencies: Vec<Dependency>,
}

impl DependencyReport {
    /// Creates a report stamped with the current time
    pub fn new(
        repository: impl Into<String>,
        ecosystem: Ecosystem,
        dependencies: Vec<Dependency>,
    ) -> Self {
        Self::with_time(repository, ecosystem, dependencies, Utc::now())
    }

    /// Creates a report with an explicit timestamp (for testing)
    pub fn with_time(
        repository: impl Into<String>,
        ecosystem: Ecosystem,
        dependencies: Vec<Dependency>,
        scanned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scanned_at,
            repository: repository.into(),
            ecosystem,
            dependencies,
        }
    }

    /// Returns true if nothing is outdated
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Number of outdated dependencies
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }
}

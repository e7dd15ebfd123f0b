//! Outdated dependency information structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic version change type between the installed and target versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Patch version change (fixes)
    Patch,
    /// Minor version change (features)
    Minor,
    /// Major version change (breaking)
    Major,
    /// Unrecognized change type (never produced by the scanner)
    #[serde(other)]
    Unknown,
}

impl ChangeType {
    /// Get the plain lowercase label
    pub fn label(&self) -> &'static str {
        match self {
            ChangeType::Patch => "patch",
            ChangeType::Minor => "minor",
            ChangeType::Major => "major",
            ChangeType::Unknown => "unknown",
        }
    }

    /// Get the capitalized label used in Story and PR bodies
    pub fn title_label(&self) -> &'static str {
        match self {
            ChangeType::Patch => "Patch",
            ChangeType::Minor => "Minor",
            ChangeType::Major => "Major",
            ChangeType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Where a dependency is declared in the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyLocation {
    /// Runtime dependency (`dependencies`)
    #[default]
    #[serde(alias = "dependencies")]
    Runtime,
    /// Development dependency (`devDependencies`)
    #[serde(alias = "devDependencies")]
    Development,
}

impl DependencyLocation {
    /// Map the `type` field reported by `npm outdated`
    pub fn from_npm_type(value: Option<&str>) -> Self {
        match value {
            Some("devDependencies") => DependencyLocation::Development,
            _ => DependencyLocation::Runtime,
        }
    }

    /// Returns the manifest section name holding this dependency
    pub fn manifest_section(&self) -> &'static str {
        match self {
            DependencyLocation::Runtime => "dependencies",
            DependencyLocation::Development => "devDependencies",
        }
    }
}

/// An outdated dependency detected in the target repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Package identifier (may carry a scope prefix, e.g. `@types/node`)
    pub package: String,
    /// Currently installed version
    pub current: String,
    /// Highest version satisfying the declared range
    pub wanted: String,
    /// Highest version available regardless of range
    pub latest: String,
    /// Change type between current and target
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Manifest section
    pub location: DependencyLocation,
}

impl Dependency {
    /// Creates a new runtime dependency
    pub fn new(
        package: impl Into<String>,
        current: impl Into<String>,
        wanted: impl Into<String>,
        latest: impl Into<String>,
        change_type: ChangeType,
    ) -> Self {
        Self {
            package: package.into(),
            current: current.into(),
            wanted: wanted.into(),
            latest: latest.into(),
            change_type,
            location: DependencyLocation::Runtime,
        }
    }

    /// Sets the manifest location (builder pattern)
    pub fn with_location(mut self, location: DependencyLocation) -> Self {
        self.location = location;
        self
    }

    /// The version an update moves to
    pub fn target(&self) -> &str {
        &self.wanted
    }

    /// Returns true if the recommended target lags behind the newest release
    pub fn target_differs_from_latest(&self) -> bool {
        self.wanted != self.latest
    }

    /// `current → target`, with the latest release noted when it differs
    pub fn version_change(&self) -> String {
        if self.target_differs_from_latest() {
            format!(
                "{} → {} (latest: {})",
                self.current, self.wanted, self.latest
            )
        } else {
            format!("{} → {}", self.current, self.latest)
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} → {} ({})",
            self.package, self.current, self.wanted, self.change_type
        )
    }
}

//! Pipeline configuration (`arm.config.json`)
//!
//! This module provides:
//! - Typed configuration sections (target, governance, policy)
//! - Loading from JSON or TOML files
//! - Fail-fast validation before any network action

mod validate;

pub use validate::validate_config;

use crate::domain::UpdatePolicy;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Default configuration file name
pub const DEFAULT_CONFIG_PATH: &str = "arm.config.json";

/// Default base branch for pull requests
pub const DEFAULT_BRANCH: &str = "main";

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

/// Target repository settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// Repository in `owner/name` form
    pub repository: String,
    /// Base branch for pull requests
    #[serde(default = "default_branch")]
    pub branch: String,
}

/// Governance repository settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceConfig {
    /// Repository holding Stories, in `owner/name` form
    pub repository: String,
    /// Epic every Story references
    pub epic_number: u64,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmConfig {
    pub target: TargetConfig,
    pub governance: GovernanceConfig,
    #[serde(default)]
    pub policy: UpdatePolicy,
}

impl ArmConfig {
    /// Parse and validate a configuration document
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        validate_config(&value)?;
        serde_json::from_value(value).map_err(|e| ConfigError::invalid("config", e.to_string()))
    }

    /// Load a configuration file (`.toml` by extension, JSON otherwise)
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
        let value: Value = if is_toml {
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        Self::from_value(value)
    }

    /// Replace the target repository (e.g. from `ARM_TARGET_REPO`)
    pub fn with_target_repository(mut self, repository: impl Into<String>) -> Self {
        self.target.repository = repository.into();
        self
    }

    /// Re-run validation on a typed configuration, e.g. after overrides
    pub fn validate(&self) -> Result<(), ConfigError> {
        let value =
            serde_json::to_value(self).map_err(|e| ConfigError::invalid("config", e.to_string()))?;
        validate_config(&value)
    }

    /// Log the validated policy
    pub fn log_summary(&self) {
        info!("Config validated successfully");
        info!("  target: {} ({})", self.target.repository, self.target.branch);
        info!(
            "  governance: {} (epic #{})",
            self.governance.repository, self.governance.epic_number
        );
        info!(
            "  policy: patch={}, minor={}, major={}",
            self.policy.allow_patch, self.policy.allow_minor, self.policy.allow_major
        );
        if self.policy.denylist.is_empty() {
            info!("  denylist: [] (no packages excluded)");
        } else {
            info!("  denylist: [{}]", self.policy.denylist.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> Value {
        json!({
            "target": { "repository": "owner/app" },
            "governance": { "repository": "owner/governance", "epicNumber": 13 },
            "policy": { "denylist": ["react"] }
        })
    }

    #[test]
    fn test_from_value_applies_defaults() {
        let config = ArmConfig::from_value(sample()).unwrap();
        assert_eq!(config.target.branch, "main");
        assert_eq!(config.governance.epic_number, 13);
        assert!(config.policy.allow_patch);
        assert!(config.policy.allow_minor);
        assert!(!config.policy.allow_major);
        assert_eq!(config.policy.denylist, vec!["react"]);
    }

    #[test]
    fn test_from_value_rejects_major() {
        let mut value = sample();
        value["policy"]["allowMajor"] = json!(true);
        assert!(matches!(
            ArmConfig::from_value(value),
            Err(ConfigError::MajorUpdatesForbidden)
        ));
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("arm.config.json");
        fs::write(&path, sample().to_string()).unwrap();

        let config = ArmConfig::load(&path).unwrap();
        assert_eq!(config.target.repository, "owner/app");
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("arm.config.toml");
        fs::write(
            &path,
            r#"
[target]
repository = "owner/app"
branch = "develop"

[governance]
repository = "owner/governance"
epicNumber = 7

[policy]
allowMinor = false
excludePatterns = ["eslint-*"]
"#,
        )
        .unwrap();

        let config = ArmConfig::load(&path).unwrap();
        assert_eq!(config.target.branch, "develop");
        assert_eq!(config.governance.epic_number, 7);
        assert!(!config.policy.allow_minor);
        assert_eq!(config.policy.exclude_patterns, vec!["eslint-*"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ArmConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("arm.config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ArmConfig::load(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_target_override_and_revalidate() {
        let config = ArmConfig::from_value(sample()).unwrap();
        let overridden = config.clone().with_target_repository("other/repo");
        assert_eq!(overridden.target.repository, "other/repo");
        assert!(overridden.validate().is_ok());

        let emptied = config.with_target_repository("");
        assert!(emptied.validate().is_err());
    }
}

//! Outdated dependency detection for a target repository
//!
//! This module provides:
//! - Working copy management (clone or fast-forward pull)
//! - Invocation of `npm outdated --json`
//! - Conversion of the tool report into a [`DependencyReport`]

mod command;
mod outdated;

pub use command::{command_line, CommandOutput, CommandRunner, SystemCommandRunner};
pub use outdated::{determine_change_type, parse_npm_outdated};

use crate::domain::{DependencyReport, Ecosystem};
use crate::error::ScanError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Manifest required at the root of the working copy
pub const MANIFEST_FILE: &str = "package.json";

/// Default base for clone URLs
pub const DEFAULT_CLONE_BASE_URL: &str = "https://github.com";

const AUDIT_TOOL: &str = "npm";

/// Default workspace directory under the system temp dir
pub fn default_workspace_dir() -> PathBuf {
    std::env::temp_dir().join("arm-workspace")
}

/// Scans a target repository for outdated dependencies
pub struct DependencyScanner {
    repository: String,
    workspace_dir: PathBuf,
    clone_base_url: String,
    runner: Arc<dyn CommandRunner>,
}

impl DependencyScanner {
    /// Create a scanner for `repository` (`owner/name`) using the system runner
    pub fn new(repository: impl Into<String>, workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
            workspace_dir: workspace_dir.into(),
            clone_base_url: DEFAULT_CLONE_BASE_URL.to_string(),
            runner: Arc::new(SystemCommandRunner::new()),
        }
    }

    /// Use a custom command runner
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Clone from a different host (e.g. a mirror or GitHub Enterprise)
    pub fn with_clone_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.clone_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Target repository in `owner/name` form
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Location of the working copy
    pub fn repo_path(&self) -> PathBuf {
        let name = self
            .repository
            .rsplit('/')
            .next()
            .unwrap_or(&self.repository);
        self.workspace_dir.join(name)
    }

    fn clone_url(&self) -> String {
        format!("{}/{}.git", self.clone_base_url, self.repository)
    }

    /// Clone the repository, or fast-forward an existing working copy
    fn ensure_repo(&self) -> Result<PathBuf, ScanError> {
        std::fs::create_dir_all(&self.workspace_dir).map_err(|source| ScanError::Workspace {
            path: self.workspace_dir.clone(),
            source,
        })?;

        let repo_path = self.repo_path();

        let output = if repo_path.exists() {
            info!("Updating working copy at {}", repo_path.display());
            self.runner.run("git", &["pull", "--ff-only"], &repo_path)
        } else {
            info!("Cloning {}", self.repository);
            let url = self.clone_url();
            let dest = repo_path.to_string_lossy().to_string();
            self.runner
                .run("git", &["clone", &url, &dest], &self.workspace_dir)
        };

        match output {
            Ok(out) if out.is_success() => Ok(repo_path),
            Ok(out) => Err(ScanError::repository_unavailable(
                &self.repository,
                out.failure_message(),
            )),
            Err(e) => Err(ScanError::repository_unavailable(
                &self.repository,
                e.to_string(),
            )),
        }
    }

    fn run_outdated(&self, repo_path: &Path) -> Result<String, ScanError> {
        let args = ["outdated", "--json"];
        debug!("Running {}", command_line(AUDIT_TOOL, &args));

        let out = self
            .runner
            .run(AUDIT_TOOL, &args, repo_path)
            .map_err(|e| ScanError::tool_failed(command_line(AUDIT_TOOL, &args), e.to_string()))?;

        // npm exits 1 when outdated packages exist
        if out.is_success() || !out.stdout.trim().is_empty() {
            Ok(out.stdout)
        } else {
            Err(ScanError::tool_failed(
                command_line(AUDIT_TOOL, &args),
                out.failure_message(),
            ))
        }
    }

    /// Scan the target repository
    pub fn scan(&self) -> Result<DependencyReport, ScanError> {
        info!("Scanning {} for outdated dependencies", self.repository);

        let repo_path = self.ensure_repo()?;

        if !repo_path.join(MANIFEST_FILE).exists() {
            return Err(ScanError::manifest_missing(&self.repository, MANIFEST_FILE));
        }

        let output = self.run_outdated(&repo_path)?;
        let dependencies = parse_npm_outdated(&output)?;

        info!("Found {} outdated dependencies", dependencies.len());
        Ok(DependencyReport::new(
            &self.repository,
            Ecosystem::Node,
            dependencies,
        ))
    }

    /// Discard the working copy and obtain a fresh one
    pub fn refresh(&self) -> Result<PathBuf, ScanError> {
        let repo_path = self.repo_path();
        if repo_path.exists() {
            std::fs::remove_dir_all(&repo_path).map_err(|source| ScanError::Workspace {
                path: repo_path.clone(),
                source,
            })?;
        }
        self.ensure_repo()
    }
}

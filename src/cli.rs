//! CLI argument parsing module for arm

use crate::config::DEFAULT_CONFIG_PATH;
use crate::forge::DEFAULT_API_URL;
use clap::Parser;
use std::path::PathBuf;

/// Automated dependency governance
#[derive(Parser, Debug, Clone)]
#[command(
    name = "arm",
    version,
    about = "Scan a repository for outdated dependencies and open tracked update PRs"
)]
pub struct CliArgs {
    /// Target repository in owner/name form (overrides target.repository)
    #[arg(long, env = "ARM_TARGET_REPO")]
    pub target: Option<String>,

    /// Scan and render Stories/PRs without creating anything remotely
    #[arg(short = 'n', long, env = "ARM_DRY_RUN")]
    pub dry_run: bool,

    /// Path to the configuration file (.json or .toml)
    #[arg(long, env = "ARM_CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// GitHub token (required unless --dry-run)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API endpoint
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Directory holding the target repository working copy
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Token to authenticate with, ignoring empty values
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// A token is required for any run that talks to the API
    pub fn requires_token(&self) -> bool {
        !self.dry_run && self.token().is_none()
    }

    /// Default `tracing` directive for the chosen verbosity
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

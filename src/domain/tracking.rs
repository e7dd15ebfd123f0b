//! Governance tracking records and change proposals
//!
//! A [`Story`] lives in the governance repository, a [`PullRequest`] in the
//! target repository. Both are found-or-created once per dependency per run
//! and never mutated afterwards.

use super::Dependency;
use serde::{Deserialize, Serialize};

/// Tracking record for one proposed dependency update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    /// Issue number (0 when not saved, e.g. dry-run)
    pub number: u64,
    /// Deterministic title; the idempotency key
    pub title: String,
    /// Rendered body
    pub body: String,
    /// Web URL (sentinel `dry-run://` URL in dry-run)
    pub url: String,
    /// The dependency this Story tracks
    pub dependency: Dependency,
}

impl Story {
    /// Returns true if this Story was never saved remotely
    pub fn is_dry_run(&self) -> bool {
        self.number == 0
    }
}

/// Change proposal opened against the target repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number (0 when not saved, e.g. dry-run)
    pub number: u64,
    /// Deterministic head branch; the idempotency key
    pub branch: String,
    /// Rendered title
    pub title: String,
    /// Rendered body
    pub body: String,
    /// Web URL (sentinel `dry-run://` URL in dry-run)
    pub url: String,
    /// Story this PR closes
    pub story_number: u64,
    /// The dependency this PR updates
    pub dependency: Dependency,
}

impl PullRequest {
    /// Returns true if this PR was never opened remotely
    pub fn is_dry_run(&self) -> bool {
        self.number == 0
    }
}

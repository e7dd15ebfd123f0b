//! Hosting platform adapters
//!
//! This module provides:
//! - The [`ForgeClient`] trait covering the issue, branch, file and pull
//!   request operations the pipeline needs
//! - A GitHub REST implementation
//! - An in-memory implementation for integration tests and embedders

mod client;
mod github;
mod memory;

pub use client::{HttpClient, DEFAULT_API_URL};
pub use github::GitHubClient;
pub use memory::{ForgeOp, InMemoryForge};

use crate::error::RemoteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An issue as returned by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(rename = "html_url")]
    pub url: String,
}

/// A pull request as returned by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(rename = "html_url")]
    pub url: String,
    /// open or closed
    pub state: String,
}

/// File contents with the blob SHA needed to update it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Base64 payload as delivered by the contents API
    pub content: String,
    pub sha: String,
}

/// Operations against a hosting platform
#[async_trait]
pub trait ForgeClient: Send + Sync {
    /// Issues in `repository` whose title contains `title`
    async fn search_issues(&self, repository: &str, title: &str)
        -> Result<Vec<IssueRef>, RemoteError>;

    /// Open a new issue
    async fn create_issue(
        &self,
        repository: &str,
        title: &str,
        body: &str,
    ) -> Result<IssueRef, RemoteError>;

    /// Pull request (any state) whose head is `branch`
    async fn find_pull_request(
        &self,
        repository: &str,
        branch: &str,
    ) -> Result<Option<PullRequestRef>, RemoteError>;

    /// Commit SHA at the tip of `branch`
    async fn branch_sha(&self, repository: &str, branch: &str) -> Result<String, RemoteError>;

    /// Create `branch` at `sha`; succeeds if the branch already exists
    async fn create_branch(
        &self,
        repository: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), RemoteError>;

    /// Read a file on `branch`
    async fn get_file(
        &self,
        repository: &str,
        path: &str,
        branch: &str,
    ) -> Result<RemoteFile, RemoteError>;

    /// Commit new file contents on `branch`
    async fn update_file(&self, repository: &str, update: FileUpdate<'_>)
        -> Result<(), RemoteError>;

    /// Open a pull request from `head` into `base`
    async fn create_pull_request(
        &self,
        repository: &str,
        pr: NewPullRequest<'_>,
    ) -> Result<PullRequestRef, RemoteError>;
}

/// A single-file commit
#[derive(Debug, Clone, Copy)]
pub struct FileUpdate<'a> {
    pub path: &'a str,
    pub branch: &'a str,
    /// Plain (not encoded) contents
    pub content: &'a str,
    /// Blob SHA being replaced
    pub sha: &'a str,
    pub message: &'a str,
}

/// Pull request creation parameters
#[derive(Debug, Clone, Copy)]
pub struct NewPullRequest<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub head: &'a str,
    pub base: &'a str,
}

/// Web URL of an issue
pub fn issue_url(repository: &str, number: u64) -> String {
    format!("https://github.com/{}/issues/{}", repository, number)
}

//! In-memory forge
//!
//! Keeps issues, branches, files and pull requests in process memory and
//! can be scripted to fail specific operations. File contents are stored
//! per repository and path, independent of branch.
//!
//! Public so the `tests/` suites, which link the crate as an external
//! dependency, and embedders can drive [`Pipeline`](crate::pipeline::Pipeline)
//! without network access. The `arm` binary never constructs it.

use crate::error::RemoteError;
use crate::forge::{
    issue_url, FileUpdate, ForgeClient, IssueRef, NewPullRequest, PullRequestRef, RemoteFile,
};
use crate::manifest::encode_content;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Operation names used for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForgeOp {
    SearchIssues,
    CreateIssue,
    FindPullRequest,
    BranchSha,
    CreateBranch,
    GetFile,
    UpdateFile,
    CreatePullRequest,
}

#[derive(Debug, Clone)]
struct StoredPull {
    head: String,
    base: String,
    pr: PullRequestRef,
}

#[derive(Debug, Clone)]
struct StoredFile {
    content: String,
    revision: u64,
}

#[derive(Default)]
struct State {
    issues: HashMap<String, Vec<IssueRef>>,
    pulls: HashMap<String, Vec<StoredPull>>,
    branches: HashMap<(String, String), String>,
    files: HashMap<(String, String), StoredFile>,
    commits: Vec<String>,
    failures: HashMap<ForgeOp, VecDeque<RemoteError>>,
    calls: HashMap<ForgeOp, usize>,
    next_number: u64,
}

/// [`ForgeClient`] backed by process memory
#[derive(Default)]
pub struct InMemoryForge {
    state: Mutex<State>,
}

impl InMemoryForge {
    /// Create an empty forge
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not poison later assertions
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a branch tip
    pub fn with_branch(self, repository: &str, branch: &str, sha: &str) -> Self {
        self.lock().branches.insert(
            (repository.to_string(), branch.to_string()),
            sha.to_string(),
        );
        self
    }

    /// Register a file
    pub fn with_file(self, repository: &str, path: &str, content: &str) -> Self {
        self.lock().files.insert(
            (repository.to_string(), path.to_string()),
            StoredFile {
                content: content.to_string(),
                revision: 0,
            },
        );
        self
    }

    /// Register an existing issue
    pub fn with_issue(self, repository: &str, number: u64, title: &str) -> Self {
        {
            let mut state = self.lock();
            state.next_number = state.next_number.max(number);
            state
                .issues
                .entry(repository.to_string())
                .or_default()
                .push(IssueRef {
                    number,
                    title: title.to_string(),
                    body: None,
                    url: issue_url(repository, number),
                });
        }
        self
    }

    /// Register an existing pull request from `head`
    pub fn with_pull_request(self, repository: &str, number: u64, head: &str, state: &str) -> Self {
        {
            let mut s = self.lock();
            s.next_number = s.next_number.max(number);
            s.pulls
                .entry(repository.to_string())
                .or_default()
                .push(StoredPull {
                    head: head.to_string(),
                    base: String::new(),
                    pr: PullRequestRef {
                        number,
                        title: String::new(),
                        body: None,
                        url: format!("https://github.com/{}/pull/{}", repository, number),
                        state: state.to_string(),
                    },
                });
        }
        self
    }

    /// Make the next call to `op` fail with `error`; queued failures are
    /// consumed in order
    pub fn fail_next(&self, op: ForgeOp, error: RemoteError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Number of times `op` was invoked (including failed calls)
    pub fn calls(&self, op: ForgeOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Issues in a repository
    pub fn issues(&self, repository: &str) -> Vec<IssueRef> {
        self.lock().issues.get(repository).cloned().unwrap_or_default()
    }

    /// Pull requests in a repository
    pub fn pull_requests(&self, repository: &str) -> Vec<PullRequestRef> {
        self.lock()
            .pulls
            .get(repository)
            .map(|v| v.iter().map(|p| p.pr.clone()).collect())
            .unwrap_or_default()
    }

    /// Base branch of the pull request opened from `head`
    pub fn pull_request_base(&self, repository: &str, head: &str) -> Option<String> {
        self.lock()
            .pulls
            .get(repository)
            .and_then(|v| v.iter().find(|p| p.head == head))
            .map(|p| p.base.clone())
    }

    /// Returns true if the branch exists
    pub fn has_branch(&self, repository: &str, branch: &str) -> bool {
        self.lock()
            .branches
            .contains_key(&(repository.to_string(), branch.to_string()))
    }

    /// Current contents of a file
    pub fn file(&self, repository: &str, path: &str) -> Option<String> {
        self.lock()
            .files
            .get(&(repository.to_string(), path.to_string()))
            .map(|f| f.content.clone())
    }

    /// Commit messages in the order they were made
    pub fn commits(&self) -> Vec<String> {
        self.lock().commits.clone()
    }

    fn enter(&self, op: ForgeOp) -> Result<MutexGuard<'_, State>, RemoteError> {
        let mut state = self.lock();
        *state.calls.entry(op).or_default() += 1;
        if let Some(err) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(state)
    }
}

fn not_found() -> RemoteError {
    RemoteError::status(404, "Not Found")
}

fn file_sha(path: &str, revision: u64) -> String {
    format!("{}@{}", path, revision)
}

#[async_trait]
impl ForgeClient for InMemoryForge {
    async fn search_issues(
        &self,
        repository: &str,
        title: &str,
    ) -> Result<Vec<IssueRef>, RemoteError> {
        let state = self.enter(ForgeOp::SearchIssues)?;
        Ok(state
            .issues
            .get(repository)
            .map(|v| v.iter().filter(|i| i.title.contains(title)).cloned().collect())
            .unwrap_or_default())
    }

    async fn create_issue(
        &self,
        repository: &str,
        title: &str,
        body: &str,
    ) -> Result<IssueRef, RemoteError> {
        let mut state = self.enter(ForgeOp::CreateIssue)?;
        state.next_number += 1;
        let number = state.next_number;
        let issue = IssueRef {
            number,
            title: title.to_string(),
            body: Some(body.to_string()),
            url: issue_url(repository, number),
        };
        state
            .issues
            .entry(repository.to_string())
            .or_default()
            .push(issue.clone());
        Ok(issue)
    }

    async fn find_pull_request(
        &self,
        repository: &str,
        branch: &str,
    ) -> Result<Option<PullRequestRef>, RemoteError> {
        let state = self.enter(ForgeOp::FindPullRequest)?;
        Ok(state
            .pulls
            .get(repository)
            .and_then(|v| v.iter().find(|p| p.head == branch))
            .map(|p| p.pr.clone()))
    }

    async fn branch_sha(&self, repository: &str, branch: &str) -> Result<String, RemoteError> {
        let state = self.enter(ForgeOp::BranchSha)?;
        state
            .branches
            .get(&(repository.to_string(), branch.to_string()))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create_branch(
        &self,
        repository: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter(ForgeOp::CreateBranch)?;
        state
            .branches
            .entry((repository.to_string(), branch.to_string()))
            .or_insert_with(|| sha.to_string());
        Ok(())
    }

    async fn get_file(
        &self,
        repository: &str,
        path: &str,
        branch: &str,
    ) -> Result<RemoteFile, RemoteError> {
        let state = self.enter(ForgeOp::GetFile)?;
        if !state
            .branches
            .contains_key(&(repository.to_string(), branch.to_string()))
        {
            return Err(not_found());
        }
        state
            .files
            .get(&(repository.to_string(), path.to_string()))
            .map(|f| RemoteFile {
                content: encode_content(&f.content),
                sha: file_sha(path, f.revision),
            })
            .ok_or_else(not_found)
    }

    async fn update_file(
        &self,
        repository: &str,
        update: FileUpdate<'_>,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter(ForgeOp::UpdateFile)?;
        let key = (repository.to_string(), update.path.to_string());
        let file = state.files.get_mut(&key).ok_or_else(not_found)?;
        if file_sha(update.path, file.revision) != update.sha {
            return Err(RemoteError::status(
                409,
                format!("{} does not match {}", update.path, update.sha),
            ));
        }
        file.content = update.content.to_string();
        file.revision += 1;
        state.commits.push(update.message.to_string());
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repository: &str,
        pr: NewPullRequest<'_>,
    ) -> Result<PullRequestRef, RemoteError> {
        let mut state = self.enter(ForgeOp::CreatePullRequest)?;
        if !state
            .branches
            .contains_key(&(repository.to_string(), pr.head.to_string()))
        {
            return Err(RemoteError::status(422, "Validation Failed: head branch missing"));
        }
        state.next_number += 1;
        let number = state.next_number;
        let created = PullRequestRef {
            number,
            title: pr.title.to_string(),
            body: Some(pr.body.to_string()),
            url: format!("https://github.com/{}/pull/{}", repository, number),
            state: "open".to_string(),
        };
        state
            .pulls
            .entry(repository.to_string())
            .or_default()
            .push(StoredPull {
                head: pr.head.to_string(),
                base: pr.base.to_string(),
                pr: created.clone(),
            });
        Ok(created)
    }
}

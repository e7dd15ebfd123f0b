//! Pull request generation
//!
//! For each Story, a branch named after the package and target version is
//! created in the target repository, the manifest is rewritten on it, and a
//! pull request closing the Story is opened. The branch name doubles as the
//! idempotency key.

use crate::domain::{Dependency, PullRequest, Story};
use crate::error::{AppError, ConfigError, ManifestError, RemoteError};
use crate::forge::{issue_url, FileUpdate, ForgeClient, NewPullRequest};
use crate::manifest::{decode_content, update_dependency_version, PACKAGE_JSON};
use crate::resilience::{retry_with_backoff, RetryPolicy};
use std::sync::Arc;
use tracing::{debug, info};

/// Settings for [`PrGenerator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrConfig {
    /// Repository the PR is opened against (`owner/name`)
    pub target_repository: String,
    /// Branch the PR merges into
    pub base_branch: String,
    /// Epic referenced from the PR body
    pub epic_number: u64,
}

impl PrConfig {
    /// Config with the default base branch
    pub fn new(target_repository: impl Into<String>, epic_number: u64) -> Self {
        Self {
            target_repository: target_repository.into(),
            base_branch: crate::config::DEFAULT_BRANCH.to_string(),
            epic_number,
        }
    }

    pub fn with_base_branch(mut self, branch: impl Into<String>) -> Self {
        self.base_branch = branch.into();
        self
    }
}

/// Lowercase, with every character outside `[a-z0-9]` replaced by `-`
fn slug(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Builds branches, commits and pull requests for recommended updates
pub struct PrGenerator {
    config: PrConfig,
    client: Arc<dyn ForgeClient>,
    retry: RetryPolicy,
}

impl PrGenerator {
    /// Create a generator; the target repository is required
    pub fn new(mut config: PrConfig, client: Arc<dyn ForgeClient>) -> Result<Self, ConfigError> {
        if config.target_repository.trim().is_empty() {
            return Err(ConfigError::missing("target.repository"));
        }
        if config.base_branch.trim().is_empty() {
            config.base_branch = crate::config::DEFAULT_BRANCH.to_string();
        }

        Ok(Self {
            config,
            client,
            retry: RetryPolicy::default(),
        })
    }

    /// Use a custom retry policy for remote calls
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &PrConfig {
        &self.config
    }

    /// `arm/update-<package>-<version>`, slugged
    pub fn generate_branch_name(&self, dep: &Dependency) -> String {
        format!("arm/update-{}-{}", slug(&dep.package), slug(dep.target()))
    }

    pub fn generate_commit_message(&self, dep: &Dependency) -> String {
        format!(
            "Update {} from {} to {}",
            dep.package,
            dep.current,
            dep.target()
        )
    }

    pub fn generate_pr_title(&self, dep: &Dependency, story_number: u64) -> String {
        format!(
            "[Story #{}] {}",
            story_number,
            self.generate_commit_message(dep)
        )
    }

    /// Render the PR body
    pub fn generate_pr_body(
        &self,
        dep: &Dependency,
        story_number: u64,
        governance_repository: &str,
    ) -> String {
        let target = dep.target();
        let mut body = String::new();

        body.push_str("### Story\n");
        body.push_str(&format!(
            "Closes {}#{}\n\n",
            governance_repository, story_number
        ));
        body.push_str(&format!(
            "Story: {}\n\n",
            issue_url(governance_repository, story_number)
        ));

        body.push_str("### Change Summary\n");
        body.push_str(&format!(
            "Updates `{}` from {} to {} ({} update).\n\n",
            dep.package, dep.current, target, dep.change_type
        ));

        body.push_str("### Changes\n");
        body.push_str(&format!("- **Package:** {}\n", dep.package));
        body.push_str(&format!("- **Current:** {}\n", dep.current));
        body.push_str(&format!("- **Target:** {}\n", target));
        body.push_str(&format!("- **Latest:** {}\n", dep.latest));
        body.push_str(&format!(
            "- **Change type:** {}\n",
            dep.change_type.title_label()
        ));
        if dep.target_differs_from_latest() {
            body.push_str(&format!(
                "\n> Latest version is {}, but {} is recommended (highest version within the declared range).\n",
                dep.latest, target
            ));
        }
        body.push('\n');

        body.push_str("### Testing\n");
        body.push_str("- [x] package-lock.json regenerated\n");
        body.push_str(&format!(
            "- [x] No breaking changes expected ({} update)\n",
            dep.change_type
        ));
        body.push_str("- [ ] Manual review recommended\n\n");

        body.push_str("### Governance\n");
        body.push_str(&format!(
            "Epic: [#{}]({})\n\n",
            self.config.epic_number,
            issue_url(governance_repository, self.config.epic_number)
        ));
        body.push_str("_Automated PR generated by ARM v1._\n");

        body
    }

    fn pull_request(
        &self,
        dep: &Dependency,
        story_number: u64,
        governance_repository: &str,
        number: u64,
        url: String,
    ) -> PullRequest {
        PullRequest {
            number,
            branch: self.generate_branch_name(dep),
            title: self.generate_pr_title(dep, story_number),
            body: self.generate_pr_body(dep, story_number, governance_repository),
            url,
            story_number,
            dependency: dep.clone(),
        }
    }

    /// Look up a pull request (open or closed) already opened for this update
    pub async fn find_existing_pr(
        &self,
        dep: &Dependency,
        story_number: u64,
        governance_repository: &str,
    ) -> Result<Option<PullRequest>, RemoteError> {
        let branch = self.generate_branch_name(dep);
        let repository = &self.config.target_repository;

        let found = retry_with_backoff(&self.retry, || {
            self.client.find_pull_request(repository, &branch)
        })
        .await?;

        Ok(found.map(|pr| {
            debug!("Found PR #{} ({}) for {}", pr.number, pr.state, branch);
            let mut existing =
                self.pull_request(dep, story_number, governance_repository, pr.number, pr.url);
            if !pr.title.is_empty() {
                existing.title = pr.title;
            }
            if let Some(body) = pr.body {
                existing.body = body;
            }
            existing
        }))
    }

    /// Create the branch, commit the manifest change and open the PR, or
    /// render the PR without side effects in dry-run mode
    /// A branch with no commits over base cannot be opened as a PR
    async fn ensure_base_differs(&self, dep: &Dependency) -> Result<(), AppError> {
        let repository = &self.config.target_repository;
        let base = &self.config.base_branch;
        let file = retry_with_backoff(&self.retry, || {
            self.client.get_file(repository, PACKAGE_JSON, base)
        })
        .await?;
        let content = decode_content(PACKAGE_JSON, &file.content)?;
        if update_dependency_version(&content, &dep.package, dep.target())? == content {
            return Err(ManifestError::AlreadyUpToDate {
                package: dep.package.clone(),
                version: dep.target().to_string(),
                branch: base.clone(),
            }
            .into());
        }
        Ok(())
    }

    pub async fn create_pr(
        &self,
        dep: &Dependency,
        story: &Story,
        governance_repository: &str,
        dry_run: bool,
    ) -> Result<PullRequest, AppError> {
        let repository = &self.config.target_repository;
        let base = &self.config.base_branch;
        let branch = self.generate_branch_name(dep);

        if dry_run {
            info!("[dry-run] Would create PR from {} into {}", branch, base);
            return Ok(self.pull_request(
                dep,
                story.number,
                governance_repository,
                0,
                format!("dry-run://{}/pull/new/{}", repository, branch),
            ));
        }

        let base_sha =
            retry_with_backoff(&self.retry, || self.client.branch_sha(repository, base)).await?;

        retry_with_backoff(&self.retry, || {
            self.client.create_branch(repository, &branch, &base_sha)
        })
        .await?;
        debug!("Branch {} ready at {}", branch, base_sha);

        let file = retry_with_backoff(&self.retry, || {
            self.client.get_file(repository, PACKAGE_JSON, &branch)
        })
        .await?;
        let content = decode_content(PACKAGE_JSON, &file.content)?;
        let updated = update_dependency_version(&content, &dep.package, dep.target())?;

        if updated == content {
            self.ensure_base_differs(dep).await?;
            debug!("{} already at {} on {}", dep.package, dep.target(), branch);
        } else {
            let message = self.generate_commit_message(dep);
            let update = FileUpdate {
                path: PACKAGE_JSON,
                branch: &branch,
                content: &updated,
                sha: &file.sha,
                message: &message,
            };
            retry_with_backoff(&self.retry, || self.client.update_file(repository, update))
                .await?;
        }

        let title = self.generate_pr_title(dep, story.number);
        let body = self.generate_pr_body(dep, story.number, governance_repository);
        let new_pr = NewPullRequest {
            title: &title,
            body: &body,
            head: &branch,
            base: base.as_str(),
        };
        let created = retry_with_backoff(&self.retry, || {
            self.client.create_pull_request(repository, new_pr)
        })
        .await?;

        info!("Created PR #{}: {}", created.number, created.url);
        Ok(PullRequest {
            number: created.number,
            branch,
            title,
            body,
            url: created.url,
            story_number: story.number,
            dependency: dep.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChangeType;
    use crate::forge::{ForgeOp, InMemoryForge};
    use std::time::Duration;

    const TARGET: &str = "acme/webapp";
    const GOV: &str = "owner/governance";

    const MANIFEST: &str = "{\n  \"dependencies\": {\n    \"express\": \"^4.17.1\"\n  }\n}\n";

    fn express() -> Dependency {
        Dependency::new("express", "4.17.1", "4.22.1", "5.2.1", ChangeType::Minor)
    }

    fn story(number: u64) -> Story {
        Story {
            number,
            title: "Update express (Node.js) from 4.17.1 to 4.22.1".to_string(),
            body: String::new(),
            url: issue_url(GOV, number),
            dependency: express(),
        }
    }

    fn forge() -> Arc<InMemoryForge> {
        Arc::new(
            InMemoryForge::new()
                .with_branch(TARGET, "main", "base-sha")
                .with_file(TARGET, PACKAGE_JSON, MANIFEST),
        )
    }

    fn generator_with(forge: Arc<InMemoryForge>) -> PrGenerator {
        PrGenerator::new(PrConfig::new(TARGET, 13), forge)
            .unwrap()
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)))
    }

    fn generator() -> PrGenerator {
        generator_with(forge())
    }

    #[test]
    fn test_requires_target() {
        let client: Arc<dyn ForgeClient> = Arc::new(InMemoryForge::new());
        let err = PrGenerator::new(PrConfig::new("", 13), client).err().unwrap();
        assert_eq!(err.to_string(), "target.repository is required");
    }

    #[test]
    fn test_base_branch() {
        assert_eq!(generator().config().base_branch, "main");

        let client: Arc<dyn ForgeClient> = Arc::new(InMemoryForge::new());
        let g = PrGenerator::new(PrConfig::new(TARGET, 13).with_base_branch("develop"), client)
            .unwrap();
        assert_eq!(g.config().base_branch, "develop");
    }

    #[test]
    fn test_branch_names() {
        let g = generator();
        assert_eq!(g.generate_branch_name(&express()), "arm/update-express-4-22-1");

        let scoped = Dependency::new("@types/node", "18.0.0", "20.0.0", "20.0.0", ChangeType::Major);
        assert_eq!(g.generate_branch_name(&scoped), "arm/update--types-node-20-0-0");

        let slashed = Dependency::new("babel/core", "6.0.0", "7.0.0", "7.0.0", ChangeType::Major);
        assert_eq!(g.generate_branch_name(&slashed), "arm/update-babel-core-7-0-0");

        let mut upper = express();
        upper.package = "Express".to_string();
        assert_eq!(g.generate_branch_name(&upper), "arm/update-express-4-22-1");
    }

    #[test]
    fn test_commit_message_and_title() {
        let g = generator();
        assert_eq!(
            g.generate_commit_message(&express()),
            "Update express from 4.17.1 to 4.22.1"
        );
        assert_eq!(
            g.generate_pr_title(&express(), 123),
            "[Story #123] Update express from 4.17.1 to 4.22.1"
        );
    }

    #[test]
    fn test_body_sections_and_links() {
        let body = generator().generate_pr_body(&express(), 123, GOV);
        for section in ["### Story", "### Change Summary", "### Changes", "### Testing", "### Governance"] {
            assert!(body.contains(section), "missing {}", section);
        }
        assert!(body.contains("Closes owner/governance#123"));
        assert!(body.contains("https://github.com/owner/governance/issues/123"));
        assert!(body.contains("https://github.com/owner/governance/issues/13"));
        assert!(body.contains("Epic: [#13]"));
        assert!(body.contains("ARM v1"));
        assert!(body.contains("Automated PR"));
    }

    #[test]
    fn test_body_details() {
        let body = generator().generate_pr_body(&express(), 123, GOV);
        assert!(body.contains("Package:** express"));
        assert!(body.contains("Current:** 4.17.1"));
        assert!(body.contains("Target:** 4.22.1"));
        assert!(body.contains("Latest:** 5.2.1"));
        assert!(body.contains("Change type:** Minor"));
        assert!(body.contains("Latest version is 5.2.1"));
        assert!(body.contains("but 4.22.1 is recommended"));
        assert!(body.contains("- [x] package-lock.json regenerated"));
        assert!(body.contains("- [x] No breaking changes"));
        assert!(body.contains("- [ ] Manual review recommended"));
    }

    #[test]
    fn test_body_without_caveat() {
        let dep = Dependency::new("express", "4.17.1", "5.2.1", "5.2.1", ChangeType::Major);
        let body = generator().generate_pr_body(&dep, 123, GOV);
        assert!(!body.contains("but"));
        assert!(!body.contains("is recommended"));
    }

    #[tokio::test]
    async fn test_create_pr_dry_run() {
        let forge = forge();
        let g = generator_with(forge.clone());
        let pr = g.create_pr(&express(), &story(123), GOV, true).await.unwrap();

        assert_eq!(pr.number, 0);
        assert_eq!(pr.branch, "arm/update-express-4-22-1");
        assert_eq!(pr.story_number, 123);
        assert_eq!(pr.dependency, express());
        assert_eq!(
            pr.url,
            "dry-run://acme/webapp/pull/new/arm/update-express-4-22-1"
        );
        assert!(pr.body.contains("Closes owner/governance#123"));
        assert!(!forge.has_branch(TARGET, "arm/update-express-4-22-1"));
        assert_eq!(forge.calls(ForgeOp::BranchSha), 0);
    }

    #[tokio::test]
    async fn test_create_pr_full_flow() {
        let forge = forge();
        let g = generator_with(forge.clone());
        let pr = g.create_pr(&express(), &story(123), GOV, false).await.unwrap();

        assert_eq!(pr.number, 1);
        assert_eq!(pr.url, "https://github.com/acme/webapp/pull/1");
        assert!(forge.has_branch(TARGET, "arm/update-express-4-22-1"));
        assert_eq!(
            forge.pull_request_base(TARGET, "arm/update-express-4-22-1").as_deref(),
            Some("main")
        );
        assert!(forge
            .file(TARGET, PACKAGE_JSON)
            .unwrap()
            .contains("\"express\": \"^4.22.1\""));
        assert_eq!(forge.commits(), vec!["Update express from 4.17.1 to 4.22.1"]);
    }

    #[tokio::test]
    async fn test_create_pr_refuses_when_base_already_updated() {
        let forge = Arc::new(
            InMemoryForge::new()
                .with_branch(TARGET, "main", "base-sha")
                .with_file(TARGET, PACKAGE_JSON, &MANIFEST.replace("4.17.1", "4.22.1")),
        );
        let g = generator_with(forge.clone());
        let err = g.create_pr(&express(), &story(123), GOV, false).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Manifest(ManifestError::AlreadyUpToDate { .. })
        ));
        assert!(err.to_string().contains("already declares 4.22.1 on main"));
        assert!(forge.commits().is_empty());
        assert!(forge.pull_requests(TARGET).is_empty());
        assert_eq!(forge.calls(ForgeOp::CreatePullRequest), 0);
    }

    #[tokio::test]
    async fn test_create_pr_missing_package() {
        let forge = Arc::new(
            InMemoryForge::new()
                .with_branch(TARGET, "main", "base-sha")
                .with_file(TARGET, PACKAGE_JSON, "{\"dependencies\": {}}"),
        );
        let g = generator_with(forge.clone());
        let err = g.create_pr(&express(), &story(123), GOV, false).await.unwrap_err();
        assert!(matches!(err, AppError::Manifest(_)));
        assert!(forge.pull_requests(TARGET).is_empty());
    }

    #[tokio::test]
    async fn test_create_pr_missing_base_branch() {
        let forge = Arc::new(InMemoryForge::new());
        let g = generator_with(forge.clone());
        let err = g.create_pr(&express(), &story(123), GOV, false).await.unwrap_err();
        match err {
            AppError::Remote(e) => assert_eq!(e.status, Some(404)),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(forge.calls(ForgeOp::BranchSha), 1);
    }

    #[tokio::test]
    async fn test_create_pr_retries_rate_limit() {
        let forge = forge();
        forge.fail_next(
            ForgeOp::CreatePullRequest,
            RemoteError::status(403, "API rate limit exceeded"),
        );
        let g = generator_with(forge.clone());
        let pr = g.create_pr(&express(), &story(123), GOV, false).await.unwrap();
        assert_eq!(pr.number, 1);
        assert_eq!(forge.calls(ForgeOp::CreatePullRequest), 2);
    }

    #[tokio::test]
    async fn test_find_existing_pr() {
        let forge = Arc::new(InMemoryForge::new().with_pull_request(
            TARGET,
            77,
            "arm/update-express-4-22-1",
            "closed",
        ));
        let g = generator_with(forge);
        let pr = g
            .find_existing_pr(&express(), 123, GOV)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pr.number, 77);
        assert_eq!(pr.branch, "arm/update-express-4-22-1");

        let other = Dependency::new("lodash", "4.17.19", "4.17.21", "4.17.21", ChangeType::Patch);
        assert!(g.find_existing_pr(&other, 124, GOV).await.unwrap().is_none());
    }
}

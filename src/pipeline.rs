//! Pipeline driver coordinating the governance workflow
//!
//! This module provides:
//! - Workflow coordination: scan → filter → Story → PR
//! - Find-before-create idempotency for Stories and PRs
//! - Dry-run mode (no remote calls at all)
//! - Per-dependency failure isolation

use crate::config::ArmConfig;
use crate::domain::{Dependency, DependencyReport, Ecosystem, PullRequest, Story};
use crate::error::{AppError, ConfigError};
use crate::filter::{FilterResult, UpdateFilter};
use crate::forge::ForgeClient;
use crate::pr::{PrConfig, PrGenerator};
use crate::progress::Progress;
use crate::resilience::{Categorize, ErrorInfo, RetryPolicy};
use crate::scanner::DependencyScanner;
use crate::story::{StoryConfig, StoryCreator};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How a Story or PR came to be part of the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Newly created in this run
    Created,
    /// Found from a previous run
    Existing,
    /// Rendered only
    DryRun,
}

impl Disposition {
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Created => "created",
            Disposition::Existing => "existing",
            Disposition::DryRun => "dry-run",
        }
    }
}

/// A Story or PR together with its disposition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tracked<T> {
    #[serde(flatten)]
    pub item: T,
    pub disposition: Disposition,
}

impl<T> Tracked<T> {
    fn new(item: T, disposition: Disposition) -> Self {
        Self { item, disposition }
    }
}

/// Result of processing one recommended update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyOutcome {
    pub dependency: Dependency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story: Option<Tracked<Story>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<Tracked<PullRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl DependencyOutcome {
    fn new(dependency: Dependency) -> Self {
        Self {
            dependency,
            story: None,
            pull_request: None,
            error: None,
        }
    }

    fn fail(mut self, err: &impl Categorize) -> Self {
        self.error = Some(err.categorize());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything a pipeline run produced
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub dry_run: bool,
    pub report: DependencyReport,
    pub filter: FilterResult,
    pub outcomes: Vec<DependencyOutcome>,
}

impl PipelineResult {
    /// Number of dependencies whose Story or PR step failed
    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Number of outcomes whose PR has the given disposition
    pub fn pull_requests_with(&self, disposition: Disposition) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.pull_request.as_ref())
            .filter(|pr| pr.disposition == disposition)
            .count()
    }
}

/// Sequential driver over scanner, filter, Story creator and PR generator
pub struct Pipeline {
    config: ArmConfig,
    scanner: DependencyScanner,
    filter: UpdateFilter,
    stories: StoryCreator,
    prs: PrGenerator,
    dry_run: bool,
}

impl Pipeline {
    /// Wire up all components from a validated configuration
    pub fn new(
        config: ArmConfig,
        scanner: DependencyScanner,
        client: Arc<dyn ForgeClient>,
        dry_run: bool,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let filter = UpdateFilter::new(config.policy.clone())?;
        let stories = StoryCreator::new(
            StoryConfig {
                governance_repository: config.governance.repository.clone(),
                epic_number: config.governance.epic_number,
                target_repository: config.target.repository.clone(),
            },
            client.clone(),
        )?;
        let prs = PrGenerator::new(
            PrConfig::new(&config.target.repository, config.governance.epic_number)
                .with_base_branch(&config.target.branch),
            client,
        )?;

        Ok(Self {
            config,
            scanner,
            filter,
            stories,
            prs,
            dry_run,
        })
    }

    /// Use a custom retry policy for every remote call
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.stories = self.stories.with_retry(retry);
        self.prs = self.prs.with_retry(retry);
        self
    }

    /// Run the workflow
    ///
    /// Scan failures abort the run. Failures while handling one dependency
    /// are recorded on its outcome and the run continues with the next.
    pub async fn run(&self, progress: &mut Progress) -> Result<PipelineResult, AppError> {
        progress.spinner(&format!("Scanning {}...", self.config.target.repository));
        let scanned = self.scanner.scan();
        progress.finish_and_clear();
        let report = scanned?;

        let filtered = self.filter.filter(&report);
        for line in filtered.summary().lines() {
            info!("{}", line);
        }

        let mut outcomes = Vec::with_capacity(filtered.recommended.len());
        if !filtered.recommended.is_empty() {
            if self.dry_run {
                info!("Dry-run: no remote calls will be made");
            }
            progress.start(filtered.recommended.len() as u64, "Processing updates");
            for dep in &filtered.recommended {
                progress.set_message(&format!("Processing {}", dep.package));
                let outcome = self.process(dep, &report.ecosystem).await;
                if let Some(err) = &outcome.error {
                    error!("{} failed: {} ({})", dep.package, err.message, err.category);
                    warn!("Suggested fix: {}", err.fix);
                }
                outcomes.push(outcome);
                progress.inc();
            }
            progress.finish_and_clear();
        }

        Ok(PipelineResult {
            dry_run: self.dry_run,
            report,
            filter: filtered,
            outcomes,
        })
    }

    async fn process(&self, dep: &Dependency, ecosystem: &Ecosystem) -> DependencyOutcome {
        let mut outcome = DependencyOutcome::new(dep.clone());
        let governance = &self.config.governance.repository;

        if self.dry_run {
            let story = match self.stories.create_story(dep, ecosystem, true).await {
                Ok(story) => story,
                Err(e) => return outcome.fail(&e),
            };
            let pr = match self.prs.create_pr(dep, &story, governance, true).await {
                Ok(pr) => pr,
                Err(e) => {
                    outcome.story = Some(Tracked::new(story, Disposition::DryRun));
                    return outcome.fail(&e);
                }
            };
            outcome.story = Some(Tracked::new(story, Disposition::DryRun));
            outcome.pull_request = Some(Tracked::new(pr, Disposition::DryRun));
            return outcome;
        }

        let story = match self.stories.find_existing_story(dep, ecosystem).await {
            Ok(Some(story)) => {
                info!("Story #{} already exists for {}", story.number, dep.package);
                Tracked::new(story, Disposition::Existing)
            }
            Ok(None) => match self.stories.create_story(dep, ecosystem, false).await {
                Ok(story) => Tracked::new(story, Disposition::Created),
                Err(e) => return outcome.fail(&e),
            },
            Err(e) => return outcome.fail(&e),
        };

        let story_number = story.item.number;
        let existing = self
            .prs
            .find_existing_pr(dep, story_number, governance)
            .await;
        let pr = match existing {
            Ok(Some(pr)) => {
                info!("PR #{} already exists for {}", pr.number, dep.package);
                Ok(Tracked::new(pr, Disposition::Existing))
            }
            Ok(None) => self
                .prs
                .create_pr(dep, &story.item, governance, false)
                .await
                .map(|pr| Tracked::new(pr, Disposition::Created)),
            Err(e) => Err(AppError::from(e)),
        };

        outcome.story = Some(story);
        match pr {
            Ok(pr) => {
                outcome.pull_request = Some(pr);
                outcome
            }
            Err(e) => outcome.fail(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GovernanceConfig, TargetConfig};
    use crate::domain::UpdatePolicy;
    use crate::error::RemoteError;
    use crate::forge::{ForgeOp, InMemoryForge};
    use crate::resilience::ErrorCategory;
    use crate::scanner::{CommandOutput, CommandRunner};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    const TARGET: &str = "owner/app";
    const GOV: &str = "owner/governance";

    const MANIFEST: &str = r#"{
  "dependencies": {
    "express": "^4.17.1",
    "lodash": "^4.17.19",
    "react": "^18.2.0"
  }
}
"#;

    const OUTDATED: &str = r#"{
  "express": {"current": "4.17.1", "wanted": "4.22.1", "latest": "5.2.1", "type": "dependencies"},
  "lodash": {"current": "4.17.19", "wanted": "4.17.21", "latest": "4.17.21", "type": "dependencies"},
  "react": {"current": "18.2.0", "wanted": "18.3.1", "latest": "19.0.0", "type": "dependencies"}
}"#;

    struct FakeTools;

    impl CommandRunner for FakeTools {
        fn run(&self, program: &str, args: &[&str], _dir: &Path) -> std::io::Result<CommandOutput> {
            if program == "git" && args[0] == "clone" {
                let dest = Path::new(args[2]);
                std::fs::create_dir_all(dest)?;
                std::fs::write(dest.join("package.json"), MANIFEST)?;
            }
            if program == "npm" {
                return Ok(CommandOutput::exited(1, OUTDATED, ""));
            }
            Ok(CommandOutput::success(""))
        }
    }

    fn config() -> ArmConfig {
        ArmConfig {
            target: TargetConfig {
                repository: TARGET.to_string(),
                branch: "main".to_string(),
            },
            governance: GovernanceConfig {
                repository: GOV.to_string(),
                epic_number: 13,
            },
            policy: UpdatePolicy::default().with_denylist(vec!["react".to_string()]),
        }
    }

    fn forge() -> Arc<InMemoryForge> {
        Arc::new(
            InMemoryForge::new()
                .with_branch(TARGET, "main", "sha0")
                .with_file(TARGET, "package.json", MANIFEST),
        )
    }

    fn pipeline(dir: &TempDir, forge: Arc<InMemoryForge>, dry_run: bool) -> Pipeline {
        let scanner = DependencyScanner::new(TARGET, dir.path()).with_runner(Arc::new(FakeTools));
        Pipeline::new(config(), scanner, forge, dry_run)
            .unwrap()
            .with_retry(RetryPolicy::new(1, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_remote_calls() {
        let dir = TempDir::new().unwrap();
        let forge = forge();
        let result = pipeline(&dir, forge.clone(), true)
            .run(&mut Progress::disabled())
            .await
            .unwrap();

        assert_eq!(result.report.len(), 3);
        assert_eq!(result.filter.recommended.len(), 2);
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.pull_requests_with(Disposition::DryRun), 2);
        assert!(!result.has_failures());
        assert_eq!(forge.calls(ForgeOp::SearchIssues), 0);
        assert_eq!(forge.calls(ForgeOp::CreateIssue), 0);
        assert!(forge.issues(GOV).is_empty());
    }

    #[tokio::test]
    async fn test_creates_story_and_pr_per_update() {
        let dir = TempDir::new().unwrap();
        let forge = forge();
        let result = pipeline(&dir, forge.clone(), false)
            .run(&mut Progress::disabled())
            .await
            .unwrap();

        assert_eq!(result.pull_requests_with(Disposition::Created), 2);
        assert_eq!(forge.issues(GOV).len(), 2);
        assert_eq!(forge.pull_requests(TARGET).len(), 2);

        let express = &result.outcomes[0];
        let story = express.story.as_ref().unwrap();
        let pr = express.pull_request.as_ref().unwrap();
        assert_eq!(story.disposition, Disposition::Created);
        assert_eq!(pr.item.story_number, story.item.number);
        assert!(pr.item.body.contains(&format!("Closes {}#{}", GOV, story.item.number)));
    }

    #[tokio::test]
    async fn test_second_run_reuses_existing() {
        let dir = TempDir::new().unwrap();
        let forge = forge();
        let p = pipeline(&dir, forge.clone(), false);
        p.run(&mut Progress::disabled()).await.unwrap();
        let second = p.run(&mut Progress::disabled()).await.unwrap();

        assert_eq!(second.pull_requests_with(Disposition::Existing), 2);
        assert!(second
            .outcomes
            .iter()
            .all(|o| o.story.as_ref().unwrap().disposition == Disposition::Existing));
        assert_eq!(forge.issues(GOV).len(), 2);
        assert_eq!(forge.pull_requests(TARGET).len(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_dependency() {
        let dir = TempDir::new().unwrap();
        let forge = forge();
        forge.fail_next(ForgeOp::CreateIssue, RemoteError::status(401, "Bad credentials"));

        let result = pipeline(&dir, forge.clone(), false)
            .run(&mut Progress::disabled())
            .await
            .unwrap();

        assert_eq!(result.failure_count(), 1);
        let failed = &result.outcomes[0];
        let info = failed.error.as_ref().unwrap();
        assert_eq!(info.category, ErrorCategory::Auth);
        assert!(failed.story.is_none());

        let ok = &result.outcomes[1];
        assert!(!ok.is_failed());
        assert_eq!(ok.dependency.package, "lodash");
        assert_eq!(forge.pull_requests(TARGET).len(), 1);
    }

    #[tokio::test]
    async fn test_pr_failure_keeps_story() {
        let dir = TempDir::new().unwrap();
        let forge = forge();
        forge.fail_next(ForgeOp::BranchSha, RemoteError::status(404, "Not Found"));

        let result = pipeline(&dir, forge, false)
            .run(&mut Progress::disabled())
            .await
            .unwrap();

        let failed = &result.outcomes[0];
        assert!(failed.story.is_some());
        assert!(failed.pull_request.is_none());
        assert_eq!(
            failed.error.as_ref().unwrap().category,
            ErrorCategory::NotFound
        );
    }

    #[test]
    fn test_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut bad = config();
        bad.policy.allow_major = true;
        let scanner = DependencyScanner::new(TARGET, dir.path());
        let forge: Arc<dyn ForgeClient> = Arc::new(InMemoryForge::new());
        assert!(matches!(
            Pipeline::new(bad, scanner, forge, true),
            Err(ConfigError::MajorUpdatesForbidden)
        ));
    }
}

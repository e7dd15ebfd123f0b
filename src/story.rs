//! Governance Story creation
//!
//! One Story per recommended update, filed in the governance repository and
//! linked to the configured Epic. The title is deterministic so a re-run
//! finds the Story it created before instead of filing a duplicate.

use crate::domain::{Dependency, Ecosystem, Story};
use crate::error::{ConfigError, RemoteError};
use crate::forge::ForgeClient;
use crate::resilience::{retry_with_backoff, RetryPolicy};
use std::sync::Arc;
use tracing::info;

/// Settings for [`StoryCreator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryConfig {
    /// Repository holding Stories (`owner/name`)
    pub governance_repository: String,
    /// Epic every Story references
    pub epic_number: u64,
    /// Repository whose dependencies are updated (`owner/name`)
    pub target_repository: String,
}

/// Builds and files governance Stories
pub struct StoryCreator {
    config: StoryConfig,
    client: Arc<dyn ForgeClient>,
    retry: RetryPolicy,
}

impl StoryCreator {
    /// Create a Story creator; all settings are required
    pub fn new(config: StoryConfig, client: Arc<dyn ForgeClient>) -> Result<Self, ConfigError> {
        if config.governance_repository.trim().is_empty() {
            return Err(ConfigError::missing("governance.repository"));
        }
        if config.epic_number == 0 {
            return Err(ConfigError::missing("governance.epicNumber"));
        }
        if config.target_repository.trim().is_empty() {
            return Err(ConfigError::missing("target.repository"));
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

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    /// `Update <pkg> (<Ecosystem>) from <current> to <target>`
    pub fn generate_title(&self, dep: &Dependency, ecosystem: &Ecosystem) -> String {
        format!(
            "Update {} ({}) from {} to {}",
            dep.package,
            ecosystem.label(),
            dep.current,
            dep.target()
        )
    }

    /// Render the Story body
    pub fn generate_body(&self, dep: &Dependency, ecosystem: &Ecosystem) -> String {
        let target = dep.target();
        let mut body = String::new();

        body.push_str("### Epic\n");
        body.push_str(&format!(
            "#{} - ARM v1: Automated dependency updates\n\n",
            self.config.epic_number
        ));

        body.push_str("### Objective\n");
        body.push_str(&format!(
            "Update `{}` in {} from {} to {}.\n\n",
            dep.package, self.config.target_repository, dep.current, target
        ));

        body.push_str("### Target Repository\n");
        body.push_str(&format!("{}\n\n", self.config.target_repository));

        body.push_str("### Change Details\n");
        body.push_str(&format!("- **Package:** {}\n", dep.package));
        body.push_str(&format!("- **Ecosystem:** {}\n", ecosystem.label()));
        body.push_str(&format!("- **Current version:** {}\n", dep.current));
        body.push_str(&format!("- **Target version:** {}\n", target));
        body.push_str(&format!("- **Latest version:** {}\n", dep.latest));
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

        body.push_str("### Goals\n");
        body.push_str(&format!(
            "- Keep `{}` current within its declared version range\n",
            dep.package
        ));
        body.push_str("- Apply the update through a reviewable pull request\n\n");

        body.push_str("### Non-Goals\n");
        body.push_str("- Major version upgrades\n");
        body.push_str("- Application code changes\n");
        body.push_str("- Updating any other dependency\n\n");

        body.push_str("### Acceptance Criteria\n");
        for item in [
            "Package manifest updated",
            "Lock file regenerated",
            "No breaking changes",
            "PR created and linked",
            "PR passes validation",
            "Human review completed",
        ] {
            body.push_str(&format!("- [ ] {}\n", item));
        }
        body.push('\n');

        body.push_str("### Tasks\n");
        for item in [
            "Update package manifest",
            "Regenerate lock file",
            "Run basic smoke tests",
            "Create PR with Story reference",
            "Link PR to this Story",
        ] {
            body.push_str(&format!("- [ ] {}\n", item));
        }
        body.push('\n');

        body.push_str("### Implementation Notes\n");
        body.push_str(&format!(
            "Detected by an automated {} dependency scan. The change is limited to the \
             version of `{}` in the manifest and the regenerated lock file.\n\n",
            ecosystem.label(),
            dep.package
        ));

        body.push_str("### PR Link\n");
        body.push_str("_Pending. The pull request will reference this Story when opened._\n");

        body
    }

    /// Look up a Story previously filed for this dependency (exact title)
    pub async fn find_existing_story(
        &self,
        dep: &Dependency,
        ecosystem: &Ecosystem,
    ) -> Result<Option<Story>, RemoteError> {
        let title = self.generate_title(dep, ecosystem);
        let repository = &self.config.governance_repository;

        let issues = retry_with_backoff(&self.retry, || {
            self.client.search_issues(repository, &title)
        })
        .await?;

        Ok(issues.into_iter().find(|i| i.title == title).map(|issue| {
            let body = issue
                .body
                .unwrap_or_else(|| self.generate_body(dep, ecosystem));
            Story {
                number: issue.number,
                title: issue.title,
                body,
                url: issue.url,
                dependency: dep.clone(),
            }
        }))
    }

    /// File a new Story, or render it without saving in dry-run mode
    pub async fn create_story(
        &self,
        dep: &Dependency,
        ecosystem: &Ecosystem,
        dry_run: bool,
    ) -> Result<Story, RemoteError> {
        let title = self.generate_title(dep, ecosystem);
        let body = self.generate_body(dep, ecosystem);
        let repository = &self.config.governance_repository;

        if dry_run {
            info!("[dry-run] Would create Story: {}", title);
            return Ok(Story {
                number: 0,
                url: format!("dry-run://{}/issues/new", repository),
                title,
                body,
                dependency: dep.clone(),
            });
        }

        let issue = retry_with_backoff(&self.retry, || {
            self.client.create_issue(repository, &title, &body)
        })
        .await?;

        info!("Created Story #{}: {}", issue.number, issue.url);
        Ok(Story {
            number: issue.number,
            title,
            body,
            url: issue.url,
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

    const GOV: &str = "acme/governance";

    fn express() -> Dependency {
        Dependency::new("express", "4.17.1", "4.22.1", "5.2.1", ChangeType::Minor)
    }

    fn config() -> StoryConfig {
        StoryConfig {
            governance_repository: GOV.to_string(),
            epic_number: 13,
            target_repository: "acme/webapp".to_string(),
        }
    }

    fn creator_with(forge: Arc<InMemoryForge>) -> StoryCreator {
        StoryCreator::new(config(), forge)
            .unwrap()
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)))
    }

    fn creator() -> StoryCreator {
        creator_with(Arc::new(InMemoryForge::new()))
    }

    #[test]
    fn test_requires_settings() {
        let forge: Arc<dyn ForgeClient> = Arc::new(InMemoryForge::new());

        let mut c = config();
        c.governance_repository = String::new();
        let err = StoryCreator::new(c, forge.clone()).err().unwrap();
        assert_eq!(err.to_string(), "governance.repository is required");

        let mut c = config();
        c.epic_number = 0;
        assert!(StoryCreator::new(c, forge.clone()).is_err());

        let mut c = config();
        c.target_repository = " ".to_string();
        assert!(StoryCreator::new(c, forge.clone()).is_err());

        assert!(StoryCreator::new(config(), forge).is_ok());
    }

    #[test]
    fn test_title() {
        let c = creator();
        assert_eq!(
            c.generate_title(&express(), &Ecosystem::Node),
            "Update express (Node.js) from 4.17.1 to 4.22.1"
        );

        let mut requests = express();
        requests.package = "requests".to_string();
        assert_eq!(
            c.generate_title(&requests, &Ecosystem::Python),
            "Update requests (Python) from 4.17.1 to 4.22.1"
        );
        assert!(c
            .generate_title(&express(), &Ecosystem::from("rust"))
            .contains("(rust)"));
    }

    #[test]
    fn test_body_sections() {
        let body = creator().generate_body(&express(), &Ecosystem::Node);
        for section in [
            "### Epic",
            "### Objective",
            "### Target Repository",
            "### Change Details",
            "### Goals",
            "### Non-Goals",
            "### Acceptance Criteria",
            "### Tasks",
            "### Implementation Notes",
            "### PR Link",
        ] {
            assert!(body.contains(section), "missing {}", section);
        }
        assert!(body.contains("#13 - ARM v1"));
        assert!(body.contains("acme/webapp"));
    }

    #[test]
    fn test_body_details() {
        let body = creator().generate_body(&express(), &Ecosystem::Node);
        assert!(body.contains("**Package:** express"));
        assert!(body.contains("**Current version:** 4.17.1"));
        assert!(body.contains("**Target version:** 4.22.1"));
        assert!(body.contains("**Latest version:** 5.2.1"));
        assert!(body.contains("**Change type:** Minor"));
        assert!(body.contains("Latest version is 5.2.1"));
        assert!(body.contains("but 4.22.1 is recommended"));
    }

    #[test]
    fn test_body_without_caveat() {
        let dep = Dependency::new("express", "4.17.1", "5.2.1", "5.2.1", ChangeType::Major);
        let body = creator().generate_body(&dep, &Ecosystem::Node);
        assert!(!body.contains("but"));
        assert!(!body.contains("is recommended"));
        assert!(body.contains("**Change type:** Major"));
    }

    #[test]
    fn test_body_change_type_labels() {
        let c = creator();
        let mut dep = express();
        dep.change_type = ChangeType::Patch;
        assert!(c.generate_body(&dep, &Ecosystem::Node).contains("**Change type:** Patch"));
    }

    #[test]
    fn test_body_checkboxes() {
        let body = creator().generate_body(&express(), &Ecosystem::Node);
        for item in [
            "- [ ] Package manifest updated",
            "- [ ] Lock file regenerated",
            "- [ ] No breaking changes",
            "- [ ] PR created and linked",
            "- [ ] PR passes validation",
            "- [ ] Human review completed",
            "- [ ] Update package manifest",
            "- [ ] Regenerate lock file",
            "- [ ] Run basic smoke tests",
            "- [ ] Create PR with Story reference",
            "- [ ] Link PR to this Story",
        ] {
            assert!(body.contains(item), "missing {}", item);
        }
    }

    #[test]
    fn test_body_has_no_dates() {
        let body = creator().generate_body(&express(), &Ecosystem::Node);
        let date = regex::Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
        let due = regex::Regex::new(r"(?i)due.*:").unwrap();
        assert!(!date.is_match(&body));
        assert!(!due.is_match(&body));
        assert!(!body.to_lowercase().contains("deadline"));
    }

    #[test]
    fn test_epic_reference_on_one_line() {
        let body = creator().generate_body(&express(), &Ecosystem::Node);
        let re = regex::Regex::new(r"#13.*ARM v1").unwrap();
        assert!(re.is_match(&body));
    }

    #[tokio::test]
    async fn test_create_story_dry_run() {
        let forge = Arc::new(InMemoryForge::new());
        let c = creator_with(forge.clone());
        let story = c.create_story(&express(), &Ecosystem::Node, true).await.unwrap();

        assert_eq!(story.number, 0);
        assert!(story.is_dry_run());
        assert_eq!(story.title, "Update express (Node.js) from 4.17.1 to 4.22.1");
        assert_eq!(story.url, format!("dry-run://{}/issues/new", GOV));
        assert_eq!(story.dependency, express());
        assert!(story.body.contains("### Epic"));
        assert_eq!(forge.calls(ForgeOp::CreateIssue), 0);
    }

    #[tokio::test]
    async fn test_create_story_files_issue() {
        let forge = Arc::new(InMemoryForge::new());
        let c = creator_with(forge.clone());
        let story = c.create_story(&express(), &Ecosystem::Node, false).await.unwrap();

        assert_eq!(story.number, 1);
        assert_eq!(story.url, format!("https://github.com/{}/issues/1", GOV));
        assert_eq!(forge.issues(GOV).len(), 1);
    }

    #[tokio::test]
    async fn test_find_existing_story_exact_title() {
        let forge = Arc::new(
            InMemoryForge::new()
                .with_issue(GOV, 20, "Update express (Node.js) from 4.17.1 to 4.22.1 (old)")
                .with_issue(GOV, 21, "Update express (Node.js) from 4.17.1 to 4.22.1"),
        );
        let c = creator_with(forge);
        let story = c
            .find_existing_story(&express(), &Ecosystem::Node)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(story.number, 21);
    }

    #[tokio::test]
    async fn test_find_existing_story_none() {
        let c = creator();
        assert!(c
            .find_existing_story(&express(), &Ecosystem::Node)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let forge = Arc::new(InMemoryForge::new());
        forge.fail_next(ForgeOp::CreateIssue, RemoteError::status(503, "Service Unavailable"));
        let c = creator_with(forge.clone());

        let story = c.create_story(&express(), &Ecosystem::Node, false).await.unwrap();
        assert_eq!(story.number, 1);
        assert_eq!(forge.calls(ForgeOp::CreateIssue), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let forge = Arc::new(InMemoryForge::new());
        forge.fail_next(ForgeOp::CreateIssue, RemoteError::status(401, "Bad credentials"));
        let c = creator_with(forge.clone());

        let err = c
            .create_story(&express(), &Ecosystem::Node, false)
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(401));
        assert_eq!(forge.calls(ForgeOp::CreateIssue), 1);
    }
}

//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of pipeline results
//! - Per-dependency Story/PR records with dispositions and error guidance

use crate::domain::{Dependency, PullRequest, Story};
use crate::filter::ExcludedUpdate;
use crate::output::{OutputFormatter, Verbosity};
use crate::pipeline::{DependencyOutcome, Disposition, PipelineResult, Tracked};
use crate::resilience::ErrorInfo;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the full result
#[derive(Serialize)]
struct JsonOutput<'a> {
    dry_run: bool,
    repository: &'a str,
    ecosystem: &'a str,
    scanned_at: DateTime<Utc>,
    summary: JsonSummary,
    /// Omitted in quiet mode
    #[serde(skip_serializing_if = "Option::is_none")]
    recommended: Option<&'a [Dependency]>,
    /// Omitted in quiet mode
    #[serde(skip_serializing_if = "Option::is_none")]
    excluded: Option<&'a [ExcludedUpdate]>,
    outcomes: Vec<JsonOutcome<'a>>,
}

/// JSON representation of summary statistics
#[derive(Serialize)]
struct JsonSummary {
    outdated: usize,
    recommended: usize,
    excluded: usize,
    created: usize,
    existing: usize,
    failed: usize,
}

/// JSON representation of one processed dependency
#[derive(Serialize)]
struct JsonOutcome<'a> {
    package: &'a str,
    current: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    story: Option<JsonRecord<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pull_request: Option<JsonRecord<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorInfo>,
}

/// JSON representation of a Story or PR
#[derive(Serialize)]
struct JsonRecord<'a> {
    /// Absent for dry-run records
    #[serde(skip_serializing_if = "Option::is_none")]
    number: Option<u64>,
    title: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
    disposition: Disposition,
    /// Only in verbose mode
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

impl JsonFormatter {
    fn verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    fn story_to_json<'a>(&self, story: &'a Tracked<Story>) -> JsonRecord<'a> {
        JsonRecord {
            number: (!story.item.is_dry_run()).then_some(story.item.number),
            title: &story.item.title,
            url: &story.item.url,
            branch: None,
            disposition: story.disposition,
            body: self.verbose().then_some(story.item.body.as_str()),
        }
    }

    fn pr_to_json<'a>(&self, pr: &'a Tracked<PullRequest>) -> JsonRecord<'a> {
        JsonRecord {
            number: (!pr.item.is_dry_run()).then_some(pr.item.number),
            title: &pr.item.title,
            url: &pr.item.url,
            branch: Some(&pr.item.branch),
            disposition: pr.disposition,
            body: self.verbose().then_some(pr.item.body.as_str()),
        }
    }

    fn outcome_to_json<'a>(&self, outcome: &'a DependencyOutcome) -> JsonOutcome<'a> {
        JsonOutcome {
            package: &outcome.dependency.package,
            current: &outcome.dependency.current,
            target: outcome.dependency.target(),
            story: outcome.story.as_ref().map(|s| self.story_to_json(s)),
            pull_request: outcome.pull_request.as_ref().map(|p| self.pr_to_json(p)),
            error: outcome.error.as_ref(),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &PipelineResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let quiet = self.verbosity == Verbosity::Quiet;
        let created = if result.dry_run {
            result.pull_requests_with(Disposition::DryRun)
        } else {
            result.pull_requests_with(Disposition::Created)
        };

        let output = JsonOutput {
            dry_run: result.dry_run,
            repository: &result.report.repository,
            ecosystem: result.report.ecosystem.tag(),
            scanned_at: result.report.scanned_at,
            summary: JsonSummary {
                outdated: result.report.len(),
                recommended: result.filter.recommended.len(),
                excluded: result.filter.excluded.len(),
                created,
                existing: result.pull_requests_with(Disposition::Existing),
                failed: result.failure_count(),
            },
            recommended: (!quiet).then_some(result.filter.recommended.as_slice()),
            excluded: (!quiet).then_some(result.filter.excluded.as_slice()),
            outcomes: result
                .outcomes
                .iter()
                .filter(|o| !quiet || o.is_failed())
                .map(|o| self.outcome_to_json(o))
                .collect(),
        };

        let json = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;

        writeln!(writer, "{}", json)?;

        Ok(())
    }
}

//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Scan header with target repository and timestamp
//! - Recommended and excluded updates with change-type coloring
//! - Per-dependency Story/PR results and failure guidance
//! - One-line summary

use crate::domain::{ChangeType, Dependency};
use crate::output::{OutputFormatter, Verbosity};
use crate::pipeline::{DependencyOutcome, Disposition, PipelineResult, Tracked};
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self::with_color(verbosity, true)
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn change_label(&self, change_type: ChangeType) -> String {
        if !self.color {
            return change_type.label().to_string();
        }
        match change_type {
            ChangeType::Major => "major".red().bold().to_string(),
            ChangeType::Minor => "minor".yellow().to_string(),
            ChangeType::Patch => "patch".green().to_string(),
            ChangeType::Unknown => "unknown".dimmed().to_string(),
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn max_name_length<'a>(deps: impl Iterator<Item = &'a Dependency>) -> usize {
        deps.map(|d| d.package.len()).max().unwrap_or(0).max(20)
    }

    fn write_header(&self, result: &PipelineResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let report = &result.report;
        let mode = if result.dry_run { " (dry-run)" } else { "" };
        let title = format!("{}{}", report.repository, mode);
        let title = if self.color {
            title.bold().to_string()
        } else {
            title
        };
        writeln!(
            writer,
            "{} {} {}",
            title,
            self.dim(&format!("({})", report.ecosystem.label())),
            self.dim(&format!(
                "scanned {}",
                report.scanned_at.format("%Y/%m/%d %H:%M UTC")
            ))
        )?;
        writeln!(writer, "Outdated dependencies: {}", report.len())?;
        writeln!(writer)
    }

    fn write_recommended(
        &self,
        result: &PipelineResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let recommended = &result.filter.recommended;
        if recommended.is_empty() {
            writeln!(writer, "No updates recommended.")?;
            return writeln!(writer);
        }

        writeln!(writer, "Recommended updates: {}", recommended.len())?;
        let width = Self::max_name_length(recommended.iter());
        for dep in recommended {
            writeln!(
                writer,
                "  {:width$} {} [{}]",
                dep.package,
                dep.version_change(),
                self.change_label(dep.change_type),
                width = width
            )?;
        }
        writeln!(writer)
    }

    fn write_excluded(
        &self,
        result: &PipelineResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let excluded = &result.filter.excluded;
        if excluded.is_empty() {
            return Ok(());
        }

        if self.verbosity != Verbosity::Verbose {
            return writeln!(
                writer,
                "{}\n",
                self.dim(&format!("Excluded: {} (use --verbose to list)", excluded.len()))
            );
        }

        writeln!(writer, "{}", self.dim(&format!("Excluded: {}", excluded.len())))?;
        let width = Self::max_name_length(excluded.iter().map(|e| &e.dependency));
        for item in excluded {
            writeln!(
                writer,
                "  {}",
                self.dim(&format!(
                    "{:width$} {} ({})",
                    item.dependency.package,
                    item.dependency.version_change(),
                    item.reason,
                    width = width
                ))
            )?;
        }
        writeln!(writer)
    }

    fn tracked_label<T>(&self, kind: &str, number: u64, tracked: &Tracked<T>) -> String {
        match tracked.disposition {
            Disposition::DryRun => format!("{} (dry-run)", kind),
            d => format!("{} #{} ({})", kind, number, d.label()),
        }
    }

    fn write_outcome(
        &self,
        outcome: &DependencyOutcome,
        width: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let name = format!("{:width$}", outcome.dependency.package, width = width);

        if let Some(err) = &outcome.error {
            let mark = if self.color {
                "✗".red().to_string()
            } else {
                "x".to_string()
            };
            writeln!(writer, "  {} {} {}: {}", mark, name, err.category, err.message)?;
            return writeln!(writer, "    {}", self.dim(&format!("fix: {}", err.fix)));
        }

        if self.verbosity == Verbosity::Quiet {
            return Ok(());
        }

        let mark = if self.color {
            "✓".green().to_string()
        } else {
            "+".to_string()
        };
        let story = outcome
            .story
            .as_ref()
            .map(|s| self.tracked_label("Story", s.item.number, s))
            .unwrap_or_default();
        let pr = outcome
            .pull_request
            .as_ref()
            .map(|p| self.tracked_label("PR", p.item.number, p))
            .unwrap_or_default();
        writeln!(writer, "  {} {} {}  {}", mark, name, story, pr)?;

        if self.verbosity == Verbosity::Verbose {
            if let Some(s) = &outcome.story {
                writeln!(writer, "    {}", self.dim(&s.item.url))?;
            }
            if let Some(p) = &outcome.pull_request {
                writeln!(writer, "    {}", self.dim(&p.item.url))?;
            }
        }
        Ok(())
    }

    fn write_summary(&self, result: &PipelineResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let failed = result.failure_count();
        let line = if result.dry_run {
            format!(
                "{} planned, {} excluded",
                result.pull_requests_with(Disposition::DryRun),
                result.filter.excluded.len()
            )
        } else {
            format!(
                "{} created, {} existing, {} excluded, {} failed",
                result.pull_requests_with(Disposition::Created),
                result.pull_requests_with(Disposition::Existing),
                result.filter.excluded.len(),
                failed
            )
        };

        if !self.color {
            return writeln!(writer, "Summary: {}", line);
        }
        if failed > 0 {
            writeln!(writer, "{} {}", "Summary:".bold(), line.red())
        } else {
            writeln!(writer, "{} {}", "Summary:".bold(), line.green())
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &PipelineResult, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            self.write_header(result, writer)?;
            self.write_recommended(result, writer)?;
            self.write_excluded(result, writer)?;
        }

        if !result.outcomes.is_empty() {
            let width = Self::max_name_length(result.outcomes.iter().map(|o| &o.dependency));
            for outcome in &result.outcomes {
                self.write_outcome(outcome, width, writer)?;
            }
            if self.verbosity != Verbosity::Quiet || result.has_failures() {
                writeln!(writer)?;
            }
        }

        self.write_summary(result, writer)
    }
}

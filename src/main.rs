//! arm - Automated dependency governance CLI
//!
//! Scans a target repository for outdated dependencies, applies the update
//! policy, and opens a governance Story plus an update PR for each approved
//! dependency.

use anyhow::Context;
use arm::cli::CliArgs;
use arm::config::ArmConfig;
use arm::forge::{GitHubClient, HttpClient};
use arm::output::{create_formatter, OutputConfig};
use arm::pipeline::Pipeline;
use arm::progress::Progress;
use arm::scanner::{default_workspace_dir, DependencyScanner};
use clap::Parser;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(&args);

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the flag-derived level
fn init_tracing(args: &CliArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("arm={}", args.log_level())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    info!("arm v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ArmConfig::load(&args.config)
        .with_context(|| format!("invalid configuration in {}", args.config.display()))?;
    if let Some(target) = args.target.as_deref().filter(|t| !t.is_empty()) {
        config = config.with_target_repository(target);
        config.validate().context("invalid target repository override")?;
    }
    config.log_summary();

    if args.requires_token() {
        anyhow::bail!(
            "a GitHub token is required: set GITHUB_TOKEN or pass --token (or use --dry-run)"
        );
    }
    if args.dry_run {
        info!("Mode: dry-run");
    }

    let http = HttpClient::with_base_url(&args.api_url, args.token().map(str::to_string))?;
    let client = Arc::new(GitHubClient::new(http));

    let workspace = args.workspace.clone().unwrap_or_else(default_workspace_dir);
    let scanner = DependencyScanner::new(&config.target.repository, workspace);

    let pipeline = Pipeline::new(config, scanner, client, args.dry_run)?;
    let mut progress = Progress::new(!args.quiet && !args.json);
    let result = pipeline.run(&mut progress).await?;

    let output_config = OutputConfig::from_cli(args.json, args.verbose, args.quiet)
        .with_color(io::stdout().is_terminal());
    let formatter = create_formatter(output_config);

    let mut stdout = io::stdout().lock();
    formatter.format(&result, &mut stdout)?;
    stdout.flush()?;

    if result.has_failures() {
        // Partial success - some dependencies failed
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

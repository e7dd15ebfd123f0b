//! Subprocess execution for repository sync and dependency audits
//!
//! Commands run synchronously and block the calling thread until the child
//! exits. The [`CommandRunner`] trait lets tests script tool behavior.

use std::path::Path;
use std::process::Command;

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (None if terminated by a signal)
    pub code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Create a successful output
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create an output with an explicit exit code
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command exited with status 0
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Best available failure description
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.code {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Trait for running external commands
pub trait CommandRunner: Send + Sync {
    /// Run `program args...` in `working_dir`, capturing output
    fn run(&self, program: &str, args: &[&str], working_dir: &Path) -> std::io::Result<CommandOutput>;
}

/// Default runner that executes real processes
#[derive(Debug, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    /// Create a new system command runner
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str], working_dir: &Path) -> std::io::Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .output()?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Render a command line for diagnostics
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_success() {
        let out = CommandOutput::success("{}");
        assert!(out.is_success());
        assert_eq!(out.stdout, "{}");
    }

    #[test]
    fn test_failure_message_prefers_stderr() {
        let out = CommandOutput::exited(128, "", "fatal: repository not found\n");
        assert!(!out.is_success());
        assert_eq!(out.failure_message(), "fatal: repository not found");
    }

    #[test]
    fn test_failure_message_falls_back_to_status() {
        let out = CommandOutput::exited(2, "", "");
        assert_eq!(out.failure_message(), "exited with status 2");
    }

    #[test]
    fn test_command_line() {
        assert_eq!(command_line("npm", &["outdated", "--json"]), "npm outdated --json");
    }

    #[test]
    fn test_system_runner_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemCommandRunner::new();
        let result = runner.run("arm-definitely-not-a-real-binary", &[], dir.path());
        assert!(result.is_err());
    }
}

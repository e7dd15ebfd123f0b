//! Error categorization with retry guidance
//!
//! Classifies failures as transient (worth retrying) or permanent, with a
//! human message and a suggested fix for each category.

use crate::error::{AppError, RemoteError};
use serde::Serialize;
use std::fmt;

/// Whether an error is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    /// Expected to self-resolve
    Transient,
    /// Needs human or configuration intervention
    Permanent,
}

/// Specific error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    RateLimit,
    Network,
    ServiceUnavailable,
    Auth,
    NotFound,
    Config,
    Unknown,
}

impl ErrorCategory {
    /// Returns the snake_case tag
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Network => "network",
            ErrorCategory::ServiceUnavailable => "service_unavailable",
            ErrorCategory::Auth => "auth",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Config => "config",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Structured error information derived from a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    /// Retry guidance
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    /// Specific category
    pub category: ErrorCategory,
    /// Human-readable description
    pub message: String,
    /// Suggested fix
    pub fix: String,
}

impl ErrorInfo {
    fn new(
        error_type: ErrorType,
        category: ErrorCategory,
        message: impl Into<String>,
        fix: impl Into<String>,
    ) -> Self {
        Self {
            error_type,
            category,
            message: message.into(),
            fix: fix.into(),
        }
    }

    fn rate_limit() -> Self {
        Self::new(
            ErrorType::Transient,
            ErrorCategory::RateLimit,
            "GitHub API rate limit exceeded",
            "Wait and retry automatically",
        )
    }

    fn network(code: &str) -> Self {
        Self::new(
            ErrorType::Transient,
            ErrorCategory::Network,
            format!("Network error: {}", code),
            "Retry automatically after brief delay",
        )
    }

    fn service_unavailable(status: u16) -> Self {
        Self::new(
            ErrorType::Transient,
            ErrorCategory::ServiceUnavailable,
            format!("GitHub service temporarily unavailable (HTTP {})", status),
            "Retry automatically - service should recover",
        )
    }

    fn auth() -> Self {
        Self::new(
            ErrorType::Permanent,
            ErrorCategory::Auth,
            "Authentication failed",
            "Check ARM_TOKEN secret in repository settings",
        )
    }

    fn not_found() -> Self {
        Self::new(
            ErrorType::Permanent,
            ErrorCategory::NotFound,
            "Repository or resource not found",
            "Verify repository names in arm.config.json",
        )
    }

    /// Permanent configuration error
    pub fn config() -> Self {
        Self::new(
            ErrorType::Permanent,
            ErrorCategory::Config,
            "Invalid configuration",
            "Check arm.config.json for required fields and valid values",
        )
    }

    /// Permanent unclassified error carrying the original message
    pub fn unknown(message: &str) -> Self {
        let message = if message.is_empty() {
            "Unknown error occurred"
        } else {
            message
        };
        Self::new(
            ErrorType::Permanent,
            ErrorCategory::Unknown,
            message,
            "Check logs for details and verify configuration",
        )
    }

    /// Returns true if the error should be retried
    pub fn is_transient(&self) -> bool {
        self.error_type == ErrorType::Transient
    }
}

/// Errors that can describe their own retry guidance
pub trait Categorize {
    /// Classify this error
    fn categorize(&self) -> ErrorInfo;
}

impl Categorize for RemoteError {
    fn categorize(&self) -> ErrorInfo {
        categorize_error(self)
    }
}

impl Categorize for AppError {
    fn categorize(&self) -> ErrorInfo {
        match self {
            AppError::Remote(e) => categorize_error(e),
            AppError::Config(_) => ErrorInfo::config(),
            AppError::Scan(e) => ErrorInfo::unknown(&e.to_string()),
            AppError::Manifest(e) => ErrorInfo::unknown(&e.to_string()),
        }
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    message.to_lowercase().replace('-', " ").contains("rate limit")
}

/// Categorize a remote failure
///
/// Priority: rate-limit signal, then HTTP status, then transport fault, then
/// message wording. Anything unrecognized is permanent.
pub fn categorize_error(error: &RemoteError) -> ErrorInfo {
    if mentions_rate_limit(&error.message) || error.status == Some(429) {
        return ErrorInfo::rate_limit();
    }

    match error.status {
        Some(401) | Some(403) => return ErrorInfo::auth(),
        Some(404) => return ErrorInfo::not_found(),
        Some(status @ (502 | 503)) => return ErrorInfo::service_unavailable(status),
        _ => {}
    }

    if let Some(fault) = error.fault {
        return ErrorInfo::network(fault.code());
    }

    let message = error.message.as_str();
    if message.contains("Bad credentials")
        || message.contains("Unauthorized")
        || message.contains("authentication")
        || message.contains("credential")
        || message.contains("authorization")
        || message.contains("Authorization")
    {
        return ErrorInfo::auth();
    }

    if message.contains("Not Found") || message.contains("not found") {
        return ErrorInfo::not_found();
    }

    if message.contains("config") || message.contains("invalid") || message.contains("Invalid")
    {
        return ErrorInfo::config();
    }

    ErrorInfo::unknown(message)
}

/// Check if a remote failure is transient (should be retried)
pub fn is_transient_error(error: &RemoteError) -> bool {
    categorize_error(error).is_transient()
}

//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ConfigError: Issues with pipeline configuration
//! - ScanError: Issues obtaining or auditing the target repository
//! - ManifestError: Issues rewriting the package manifest
//! - RemoteError: Failures reported by the hosting platform API

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Repository scan related errors
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Manifest rewrite related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Hosting platform related errors
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read configuration file
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON/TOML
    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// A required section or field is absent or empty
    #[error("{field} is required")]
    MissingField { field: String },

    /// A field has the wrong type or an invalid value
    #[error("{field} is invalid: {message}")]
    InvalidField { field: String, message: String },

    /// `policy.allowMajor` was set to true
    #[error(
        "allowMajor must be false (safe default enforced). \
         Major version updates require human review and are blocked automatically."
    )]
    MajorUpdatesForbidden,

    /// An exclusion pattern is not a valid glob
    #[error("invalid exclusion pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Errors related to scanning the target repository
#[derive(Error, Debug)]
pub enum ScanError {
    /// Working copy could not be cloned or updated
    #[error("repository {repository} unavailable: {message}")]
    RepositoryUnavailable { repository: String, message: String },

    /// No package manifest at the repository root
    #[error("no {manifest} found in {repository}")]
    ManifestMissing {
        repository: String,
        manifest: String,
    },

    /// The dependency audit tool could not be invoked
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// The audit tool produced unparseable output
    #[error("failed to parse outdated report: {message}")]
    ParseFailed { message: String },

    /// Workspace directory could not be prepared
    #[error("workspace error at {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to rewriting the package manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest content is not valid JSON
    #[error("failed to parse JSON in {path}: {message}")]
    JsonParseError { path: String, message: String },

    /// The package is not declared in the manifest
    #[error("package '{package}' not declared in {path}")]
    DependencyNotFound { package: String, path: String },

    /// The declared version spec is not a plain semver range
    #[error("cannot rewrite version spec '{spec}' for '{package}'")]
    UnsupportedSpec { package: String, spec: String },

    /// The base branch already declares the target version
    #[error("'{package}' already declares {version} on {branch}; no update to propose")]
    AlreadyUpToDate {
        package: String,
        version: String,
        branch: String,
    },

    /// Remote file content could not be decoded
    #[error("failed to decode {path}: {message}")]
    DecodeError { path: String, message: String },
}

/// Low-level network fault observed before any HTTP status was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFault {
    /// Request timed out
    TimedOut,
    /// Connection reset or dropped
    ConnectionReset,
    /// Host name could not be resolved
    HostNotFound,
}

impl NetworkFault {
    /// Conventional error code for this fault
    pub fn code(&self) -> &'static str {
        match self {
            NetworkFault::TimedOut => "ETIMEDOUT",
            NetworkFault::ConnectionReset => "ECONNRESET",
            NetworkFault::HostNotFound => "ENOTFOUND",
        }
    }
}

impl fmt::Display for NetworkFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A failure reported by the hosting platform, captured where it is observed
///
/// Carries the HTTP status (if a response arrived), the network fault (if the
/// transport failed) and the message. The categorizer inspects these fields
/// in a fixed priority order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    /// HTTP status code, if any
    pub status: Option<u16>,
    /// Transport-level fault, if any
    pub fault: Option<NetworkFault>,
    /// Human-readable message
    pub message: String,
}

impl RemoteError {
    /// Creates an error with a message only
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            fault: None,
            message: message.into(),
        }
    }

    /// Creates an error from an HTTP status
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            fault: None,
            message: message.into(),
        }
    }

    /// Creates an error from a transport fault
    pub fn network(fault: NetworkFault, message: impl Into<String>) -> Self {
        Self {
            status: None,
            fault: Some(fault),
            message: message.into(),
        }
    }

    /// Attaches a transport fault (builder pattern)
    pub fn with_fault(mut self, fault: NetworkFault) -> Self {
        self.fault = Some(fault);
        self
    }
}

impl ConfigError {
    /// Creates a new MissingField error
    pub fn missing(field: impl Into<String>) -> Self {
        ConfigError::MissingField {
            field: field.into(),
        }
    }

    /// Creates a new InvalidField error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScanError {
    /// Creates a new RepositoryUnavailable error
    pub fn repository_unavailable(
        repository: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ScanError::RepositoryUnavailable {
            repository: repository.into(),
            message: message.into(),
        }
    }

    /// Creates a new ManifestMissing error
    pub fn manifest_missing(repository: impl Into<String>, manifest: impl Into<String>) -> Self {
        ScanError::ManifestMissing {
            repository: repository.into(),
            manifest: manifest.into(),
        }
    }

    /// Creates a new ToolFailed error
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ScanError::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

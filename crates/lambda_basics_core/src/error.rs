//! Error taxonomy shared by provider adapters and the orchestrator.

use std::path::PathBuf;

use thiserror::Error;

/// Error codes providers use for "the resource does not exist".
pub const NOT_FOUND_CODES: &[&str] = &["NoSuchEntity", "ResourceNotFoundException"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// The target resource does not exist (yet).
    NotFound,
    /// The provider answered and refused the request.
    Rejected,
    /// The request never got a provider answer (dispatch, timeout, I/O).
    Unavailable,
}

/// A failure reported by a provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub code: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classifies a provider error code, treating known not-found codes as `NotFound`.
    pub fn from_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let kind = if NOT_FOUND_CODES.contains(&code.as_str()) {
            ServiceErrorKind::NotFound
        } else {
            ServiceErrorKind::Rejected
        };
        Self::new(kind, code, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ServiceErrorKind::NotFound
    }
}

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("deployment source '{}' does not exist", .path.display())]
    MissingSource { path: PathBuf },

    #[error("failed to {action} '{}': {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {key}")]
    InvalidOverride { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Coarse outcome classes callers use to pick a retry or rollback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Rejected,
    /// Transient: the provider could not be reached. Safe to retry.
    Unavailable,
    TimedOut,
    Cancelled,
    Local,
}

/// Failure of an orchestrator operation.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("invalid role action '{0}': must be 'create' or 'destroy'")]
    InvalidAction(String),

    #[error("{operation} was rejected for '{resource}': {source}")]
    Rejected {
        operation: &'static str,
        resource: String,
        #[source]
        source: ServiceError,
    },

    #[error("{operation} found no resource named '{resource}': {source}")]
    NotFound {
        operation: &'static str,
        resource: String,
        #[source]
        source: ServiceError,
    },

    #[error("{operation} could not reach the provider for '{resource}': {source}")]
    Unavailable {
        operation: &'static str,
        resource: String,
        #[source]
        source: ServiceError,
    },

    #[error("timed out waiting on '{resource}' during {operation} after {attempts} attempts (last observed: {last_observed})")]
    TimedOut {
        operation: &'static str,
        resource: String,
        attempts: u32,
        last_observed: String,
    },

    #[error("'{resource}' entered terminal state {state} during {operation}: {reason}")]
    TerminalState {
        operation: &'static str,
        resource: String,
        state: String,
        reason: String,
    },

    #[error("{operation} was cancelled while waiting on '{resource}'")]
    Cancelled {
        operation: &'static str,
        resource: String,
    },

    #[error("provider response for {operation} is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error("failed to encode JSON document: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ProvisionError {
    /// Wraps a provider error, keeping not-found and unreachable distinct from other rejections.
    pub fn from_service(
        operation: &'static str,
        resource: impl Into<String>,
        source: ServiceError,
    ) -> Self {
        let resource = resource.into();
        match source.kind {
            ServiceErrorKind::NotFound => Self::NotFound {
                operation,
                resource,
                source,
            },
            ServiceErrorKind::Rejected => Self::Rejected {
                operation,
                resource,
                source,
            },
            ServiceErrorKind::Unavailable => Self::Unavailable {
                operation,
                resource,
                source,
            },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidAction(_) => FailureKind::Validation,
            Self::Rejected { .. } | Self::NotFound { .. } | Self::TerminalState { .. } => {
                FailureKind::Rejected
            }
            Self::Unavailable { .. } => FailureKind::Unavailable,
            Self::TimedOut { .. } => FailureKind::TimedOut,
            Self::Cancelled { .. } => FailureKind::Cancelled,
            Self::MissingField { .. } | Self::Package(_) | Self::Payload(_) => FailureKind::Local,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

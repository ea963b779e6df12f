//! Error types shared by the store, the workflow engine and the HTTP layer

use crate::core::Status;
use thiserror::Error;

/// Result alias used throughout fixhub
pub type Result<T> = std::result::Result<T, FixhubError>;

/// Coarse classification of a [`FixhubError`]
///
/// Callers branch on the kind rather than on individual variants: it decides
/// the HTTP status code and whether an immediate retry makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    IllegalTransition,
    Unavailable,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable name, used in HTTP error bodies
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::IllegalTransition => "illegal_transition",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for fixhub
#[derive(Debug, Error)]
pub enum FixhubError {
    /// Malformed or missing required input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No caller identity could be resolved from the request
    #[error("Missing or unknown credentials")]
    Unauthenticated,

    /// Caller lacks the role or ownership the operation needs
    #[error("Actor '{actor}' is not allowed to {action}: {reason}")]
    Forbidden {
        actor: String,
        action: String,
        reason: String,
    },

    /// Operation is not valid for the ticket's current status
    #[error("Cannot {operation} ticket {id} while it is {status}")]
    IllegalTransition {
        id: String,
        operation: String,
        status: Status,
    },

    /// Optimistic concurrency check failed
    #[error("Ticket {id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Ticket {id} already exists")]
    DuplicateTicket { id: String },

    #[error("Ticket not found: {id}")]
    TicketNotFound { id: String },

    /// Store or another dependency cannot serve the request right now
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A write would have broken a data-model invariant
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FixhubError {
    /// Shorthand for [`FixhubError::InvalidInput`]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Shorthand for [`FixhubError::Forbidden`]
    pub fn forbidden(
        actor: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Forbidden {
            actor: actor.into(),
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`FixhubError::TicketNotFound`]
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        Self::TicketNotFound { id: id.to_string() }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::Json(_) => ErrorKind::InvalidInput,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            Self::Conflict { .. } | Self::DuplicateTicket { .. } => ErrorKind::Conflict,
            Self::TicketNotFound { .. } => ErrorKind::NotFound,
            Self::Unavailable(_) | Self::Io(_) | Self::Yaml(_) => ErrorKind::Unavailable,
            Self::InvariantViolation(_) | Self::Config(_) => ErrorKind::Internal,
        }
    }

    /// Whether repeating the same call with a fresh read can succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether the caller can recover without operator intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal | ErrorKind::Unavailable)
    }

    /// Whether the error comes from configuration loading
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Message safe to show to an API client or terminal user
    ///
    /// Infrastructure details are withheld; they only go to the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Unavailable => "The ticket service is temporarily unavailable".to_string(),
            ErrorKind::Internal if !self.is_config_error() => {
                "The ticket service hit an internal error".to_string()
            },
            _ => self.to_string(),
        }
    }

    /// Hints for resolving the error
    #[must_use]
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Conflict { .. } => vec![
                "Reload the ticket and repeat the operation".to_string(),
            ],
            Self::IllegalTransition { .. } => vec![
                "Refresh the ticket; its status changed since it was displayed".to_string(),
            ],
            Self::Unauthenticated => vec![
                "Send an 'Authorization: Bearer <token>' header".to_string(),
            ],
            Self::Config(_) => vec![
                "Check the configuration file and FIXHUB__* environment variables".to_string(),
                "Run 'fixhub config show' to print the effective configuration".to_string(),
            ],
            _ => Vec::new(),
        }
    }
}

//! Error types module
//!
//! All client-side failures are unified under [`DamError`]: validation of
//! selected files, transport failures (network, timeout), non-2xx HTTP
//! responses, malformed bodies, and upload state-machine guards.
//!
//! Every async operation of the client resolves to either a value or one of
//! these variants; the state machines record the failure instead of
//! propagating a panic to the caller.

use std::io;

pub type DamResult<T> = Result<T, DamError>;

/// A rejected file (or selection) detected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File {name} is too large (max {max_mb}MB)")]
    FileTooLarge { name: String, size: u64, max_mb: u64 },

    #[error("File {name} has unsupported type: {mime_type}")]
    UnsupportedType { name: String, mime_type: String },

    #[error(
        "You can only select a maximum of {max} files at once. You selected {selected} files."
    )]
    SelectionTooLarge { selected: usize, max: usize },
}

impl ValidationError {
    /// Name of the offending file, if the violation concerns a single file.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            ValidationError::FileTooLarge { name, .. }
            | ValidationError::UnsupportedType { name, .. } => Some(name),
            ValidationError::SelectionTooLarge { .. } => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DamError {
    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<ValidationError>),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout - the server took too long to respond")]
    Timeout,

    /// `message` is the body's `error`/`message` field, or
    /// `HTTP {status}: {reason}` when the body carries none.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("An upload is already in progress")]
    UploadInProgress,

    #[error("No files selected for upload")]
    NothingToUpload,

    #[error("Upload cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

fn join_violations(violations: &[ValidationError]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ValidationError> for DamError {
    fn from(err: ValidationError) -> Self {
        DamError::Validation(vec![err])
    }
}

impl From<io::Error> for DamError {
    fn from(err: io::Error) -> Self {
        DamError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DamError {
    fn from(err: serde_json::Error) -> Self {
        DamError::Parse(err.to_string())
    }
}

impl DamError {
    /// Machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            DamError::Validation(_) => "VALIDATION_ERROR",
            DamError::Network(_) => "NETWORK_ERROR",
            DamError::Timeout => "TIMEOUT_ERROR",
            DamError::Http { .. } => "HTTP_ERROR",
            DamError::Parse(_) => "PARSE_ERROR",
            DamError::UploadInProgress => "UPLOAD_IN_PROGRESS",
            DamError::NothingToUpload => "NOTHING_TO_UPLOAD",
            DamError::Cancelled => "CANCELLED",
            DamError::Config(_) => "CONFIG_ERROR",
            DamError::Io(_) => "IO_ERROR",
        }
    }

    /// Transport failures that an idempotent request may be retried on.
    /// HTTP status errors are never retryable here.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DamError::Network(_) | DamError::Timeout)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DamError::Timeout)
    }

    /// HTTP status code, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            DamError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for an inline banner.
    pub fn user_message(&self) -> String {
        match self {
            DamError::Http { message, .. } => message.clone(),
            DamError::Validation(violations) if violations.len() == 1 => violations[0].to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_only_for_transport_failures() {
        assert!(DamError::Timeout.is_retryable());
        assert!(DamError::Network("connection refused".to_string()).is_retryable());
        assert!(!DamError::Http {
            status: 503,
            message: "Service Unavailable".to_string()
        }
        .is_retryable());
        assert!(!DamError::Parse("expected value".to_string()).is_retryable());
        assert!(!DamError::Validation(vec![]).is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(DamError::Timeout.error_code(), "TIMEOUT_ERROR");
        assert_eq!(
            DamError::Http {
                status: 404,
                message: "Asset not found".to_string()
            }
            .error_code(),
            "HTTP_ERROR"
        );
        assert_eq!(DamError::UploadInProgress.error_code(), "UPLOAD_IN_PROGRESS");
    }

    #[test]
    fn test_timeout_message_mentions_timeout() {
        assert!(DamError::Timeout.to_string().contains("timeout"));
    }

    #[test]
    fn test_validation_message_lists_every_violation() {
        let err = DamError::Validation(vec![
            ValidationError::FileTooLarge {
                name: "movie.mp4".to_string(),
                size: 150 * 1024 * 1024,
                max_mb: 100,
            },
            ValidationError::UnsupportedType {
                name: "setup.exe".to_string(),
                mime_type: "application/x-msdownload".to_string(),
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("File movie.mp4 is too large (max 100MB)"));
        assert!(message.contains("File setup.exe has unsupported type: application/x-msdownload"));
    }

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = DamError::Http {
            status: 500,
            message: "Storage bucket unavailable".to_string(),
        };
        assert_eq!(err.user_message(), "Storage bucket unavailable");
        assert_eq!(err.status(), Some(500));
    }
}

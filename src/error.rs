//! Error types for the storage bridge

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification reported to callers of the bridge.
///
/// Every [`Error`] maps onto exactly one code; RPC front-ends translate the
/// code into their own status space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed or unsupported request shape
    InvalidArgument,
    /// The referenced resource does not exist
    NotFound,
    /// Engine transport failure or engine refused the operation
    Internal,
    /// Invalid configuration detected while constructing a component
    FatalConfiguration,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::InvalidArgument => write!(f, "InvalidArgument"),
            ErrorCode::NotFound => write!(f, "NotFound"),
            ErrorCode::Internal => write!(f, "Internal"),
            ErrorCode::FatalConfiguration => write!(f, "FatalConfiguration"),
        }
    }
}

/// Errors that can occur in the storage bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Request failed validation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced resource is not registered
    #[error("unable to find key {0}")]
    NotFound(String),

    /// The engine could not be reached or answered with an RPC error
    #[error("failed engine call {method} for {resource}: {reason}")]
    EngineCallFailed {
        method: String,
        resource: String,
        reason: String,
    },

    /// The engine answered but did not apply the operation
    #[error("unexpected engine call result from {method} for {resource}")]
    UnexpectedEngineResult { method: String, resource: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML manifest parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Classify this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Error::NotFound(_) => ErrorCode::NotFound,
            Error::EngineCallFailed { .. }
            | Error::UnexpectedEngineResult { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::Internal(_) => ErrorCode::Internal,
            Error::Config(_) | Error::Yaml(_) => ErrorCode::FatalConfiguration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::invalid("qos_volume_id cannot be empty").code(),
            ErrorCode::InvalidArgument
        );
        assert_eq!(Error::NotFound("qos-1".into()).code(), ErrorCode::NotFound);
        assert_eq!(
            Error::UnexpectedEngineResult {
                method: "bdev_set_qos_limit".into(),
                resource: "vol-1".into(),
            }
            .code(),
            ErrorCode::Internal
        );
        assert_eq!(
            Error::Config("ctrlr_dir cannot be empty".into()).code(),
            ErrorCode::FatalConfiguration
        );
    }

    #[test]
    fn test_messages_carry_resource() {
        let err = Error::EngineCallFailed {
            method: "bdev_set_qos_limit".into(),
            resource: "vol-7".into(),
            reason: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("failed engine call"));
        assert!(msg.contains("vol-7"));

        let err = Error::NotFound("qos-9".into());
        assert_eq!(err.to_string(), "unable to find key qos-9");
    }
}

use std::time::Duration;

use mongodb::error::{ErrorKind, RETRYABLE_WRITE_ERROR};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Failures of the store-then-sync sequence.
///
/// A rejected POST (any status other than 201) is not an error; it is
/// reported through `PostOutcome::Rejected` and the run continues.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot connect to store: {message}")]
    Connect { message: String, retryable: bool },

    #[error("store {op} failed: {message}")]
    Store {
        op: &'static str,
        message: String,
        retryable: bool,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{op} timed out after {after:?}")]
    Timeout { op: String, after: Duration },

    #[error("{0} cancelled")]
    Cancelled(String),

    #[error("cannot close store connection: {0}")]
    Close(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    pub(crate) fn connect(err: mongodb::error::Error) -> Self {
        Self::Connect {
            retryable: is_transient(&err),
            message: err.to_string(),
        }
    }

    pub(crate) fn store(op: &'static str, err: mongodb::error::Error) -> Self {
        Self::Store {
            op,
            retryable: is_transient(&err),
            message: err.to_string(),
        }
    }

    /// Whether running the same operation again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connect { retryable, .. } | Self::Store { retryable, .. } => *retryable,
            Self::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            Self::BodyRead { source, .. } => source.is_timeout(),
            Self::Timeout { .. } => true,
            Self::Serialize { .. } | Self::Cancelled(_) | Self::Close(_) | Self::Config(_) => false,
        }
    }
}

fn is_transient(err: &mongodb::error::Error) -> bool {
    err.contains_label(RETRYABLE_WRITE_ERROR)
        || matches!(
            *err.kind,
            ErrorKind::Io(_)
                | ErrorKind::ServerSelection { .. }
                | ErrorKind::ConnectionPoolCleared { .. }
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_retryable() {
        let err = SyncError::Timeout {
            op: "insert_one".to_string(),
            after: Duration::from_secs(30),
        };
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "insert_one timed out after 30s");
    }

    #[test]
    fn cancel_and_close_are_fatal() {
        assert!(!SyncError::Cancelled("insert_one".to_string()).is_retryable());
        assert!(!SyncError::Close("shutdown stalled".to_string()).is_retryable());
        assert!(!SyncError::Config("bad seed".to_string()).is_retryable());
    }

    #[test]
    fn store_error_keeps_classification() {
        let err = SyncError::Store {
            op: "insert_many",
            message: "duplicate key".to_string(),
            retryable: false,
        };
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "store insert_many failed: duplicate key");
    }
}

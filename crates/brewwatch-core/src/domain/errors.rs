//! Errors and their operational classification.

use thiserror::Error;

/// ErrorKind classifies a failure by what the caller should do about it.
///
/// - Transient: connection-level hiccup, the same call may simply be retried.
/// - Permanent: the hub understood and refused (fault, bad request, auth).
/// - Infrastructure: we could not make sense of what came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// Errors raised by a `BuildHub` call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HubError {
    /// Connection reset, aborted, refused...
    #[error("connection error: {0}")]
    Connection(String),

    /// Application-level fault reported by the hub.
    #[error("hub fault {code}: {message}")]
    Fault { code: i32, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("malformed hub response: {0}")]
    Decode(String),

    #[error("unsupported hub call: {0}")]
    Unsupported(String),
}

impl HubError {
    pub fn fault(code: i32, message: impl Into<String>) -> Self {
        HubError::Fault {
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HubError::Connection(_) => ErrorKind::Transient,
            HubError::Fault { .. } | HubError::Auth(_) | HubError::Unsupported(_) => {
                ErrorKind::Permanent
            }
            HubError::Decode(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::Decode(err.to_string())
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

//! Typed errors surfaced by the core
//!
//! Validation and transport failures are distinct kinds of [`ExecutionError`].
//! Non-success HTTP statuses are never errors; they come back as a normal
//! [`crate::models::Response`].

use std::fmt;
use std::path::PathBuf;

/// Failure while turning a request into a wire call or performing it
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{kind}: {message}")]
    Transport { kind: TransportKind, message: String },
}

impl ExecutionError {
    /// True for failures reported before any network I/O
    pub fn is_validation(&self) -> bool {
        !self.is_transport()
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ExecutionError::Transport { .. })
    }

    /// Transport kind, if this is a transport failure
    pub fn transport_kind(&self) -> Option<TransportKind> {
        match self {
            ExecutionError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Classify a reqwest error raised while sending or reading the body
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return ExecutionError::InvalidRequest(err.to_string());
        }

        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else if err.is_redirect() {
            TransportKind::Redirect
        } else if err.is_body() || err.is_decode() {
            TransportKind::Body
        } else {
            TransportKind::Other
        };

        ExecutionError::Transport {
            kind,
            message: error_chain(&err),
        }
    }
}

/// Coarse transport failure classification for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The configured timeout elapsed
    Timeout,
    /// DNS, TCP connect or TLS handshake failed
    Connect,
    /// Redirect policy rejected the response
    Redirect,
    /// Connection dropped while reading the response body
    Body,
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransportKind::Timeout => "request timed out",
            TransportKind::Connect => "connection failed",
            TransportKind::Redirect => "redirect failed",
            TransportKind::Body => "failed reading response body",
            TransportKind::Other => "request failed",
        };
        f.write_str(text)
    }
}

/// The shared HTTP client could not be built. Fatal at start-up.
#[derive(Debug, thiserror::Error)]
#[error("failed to build HTTP client: {0}")]
pub struct ClientInitError(#[from] reqwest::Error);

/// Structural operation on a collection failed; the collection is unchanged
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("request not found: {0}")]
    RequestNotFound(String),

    #[error("request id already present: {0}")]
    DuplicateRequest(String),

    #[error("folder id already present: {0}")]
    DuplicateFolder(String),

    #[error("tree references request {0} but the lookup table has no entry")]
    DanglingReference(String),

    #[error("lookup table entry {0} is not referenced by the tree")]
    OrphanedRequest(String),

    #[error("lookup key {key} holds request with id {id}")]
    KeyMismatch { key: String, id: String },
}

/// Persistence failure for a single unit (collection file or environment)
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize {unit}: {source}")]
    Serialize {
        unit: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid unit id `{0}`")]
    InvalidId(String),

    #[error("{path} holds collection `{id}`; the file name must match the id")]
    IdMismatch { path: PathBuf, id: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Flatten an error and its sources into one line ("connection refused" is
/// usually buried a few levels down in hyper's chain)
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_includes_kind() {
        let err = ExecutionError::Transport {
            kind: TransportKind::Timeout,
            message: "operation timed out".to_string(),
        };
        assert_eq!(err.to_string(), "request timed out: operation timed out");
        assert!(err.is_transport());
        assert!(!err.is_validation());
        assert_eq!(err.transport_kind(), Some(TransportKind::Timeout));
    }

    #[test]
    fn test_validation_errors_are_not_transport() {
        let err = ExecutionError::InvalidUrl {
            url: "nope".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert!(err.is_validation());
        assert_eq!(err.transport_kind(), None);
    }
}

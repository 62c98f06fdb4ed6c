//! Error type definitions.
//!
//! This module defines the error taxonomy used throughout the orchestration
//! core, plus the typed error carried by every fallible operation.

use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Categories of errors that can occur during an execution.
///
/// The taxonomy drives two decisions: whether a failed operation is worth
/// retrying, and which statistics counter records the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorKind {
    /// Transport-level failure reaching a remote API (timeout, DNS, TCP).
    Network,
    /// The browser automation tool reported a session-level failure.
    Browser,
    /// A remote endpoint was reachable but the connection was refused or
    /// dropped (list/status endpoints report this class).
    Connection,
    /// The remote API throttled the caller (HTTP 429).
    RateLimit,
    /// Credentials were rejected (HTTP 401/403).
    Auth,
    /// The request itself was malformed (other 4xx).
    Client,
    /// The remote service failed (5xx).
    Server,
    /// A local precondition failed; never sent over the wire.
    Validation,
}

impl ErrorKind {
    /// Whether operations failing with this kind are worth retrying.
    ///
    /// Transient classes (network, server, browser, connection, rate-limit)
    /// may succeed on a later attempt. Auth and client errors are permanent:
    /// retrying them wastes quota and can trip remote abuse detection.
    /// Validation failures are local and retrying cannot change the input.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Network
                | ErrorKind::Browser
                | ErrorKind::Connection
                | ErrorKind::RateLimit
                | ErrorKind::Server
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network error",
            ErrorKind::Browser => "browser error",
            ErrorKind::Connection => "connection error",
            ErrorKind::RateLimit => "rate limit error",
            ErrorKind::Auth => "auth error",
            ErrorKind::Client => "client error",
            ErrorKind::Server => "server error",
            ErrorKind::Validation => "validation error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type produced by every component of the orchestration core.
///
/// Each variant corresponds to one [`ErrorKind`]; the payload is a
/// human-readable message. Raw exception detail never crosses the API
/// boundary beyond this message string.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("network error: {0}")]
    Network(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("rate limit error: {0}")]
    RateLimit(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("client error: {0}")]
    Client(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl CoreError {
    /// Builds an error of the given kind with the given message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Network => CoreError::Network(message),
            ErrorKind::Browser => CoreError::Browser(message),
            ErrorKind::Connection => CoreError::Connection(message),
            ErrorKind::RateLimit => CoreError::RateLimit(message),
            ErrorKind::Auth => CoreError::Auth(message),
            ErrorKind::Client => CoreError::Client(message),
            ErrorKind::Server => CoreError::Server(message),
            ErrorKind::Validation => CoreError::Validation(message),
        }
    }

    /// The taxonomy category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Network(_) => ErrorKind::Network,
            CoreError::Browser(_) => ErrorKind::Browser,
            CoreError::Connection(_) => ErrorKind::Connection,
            CoreError::RateLimit(_) => ErrorKind::RateLimit,
            CoreError::Auth(_) => ErrorKind::Auth,
            CoreError::Client(_) => ErrorKind::Client,
            CoreError::Server(_) => ErrorKind::Server,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Whether this error is worth retrying. See [`ErrorKind::is_retriable`].
    pub fn is_retriable(&self) -> bool {
        self.kind().is_retriable()
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            CoreError::Network(m)
            | CoreError::Browser(m)
            | CoreError::Connection(m)
            | CoreError::RateLimit(m)
            | CoreError::Auth(m)
            | CoreError::Client(m)
            | CoreError::Server(m)
            | CoreError::Validation(m) => m,
        }
    }

    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }
}

/// Result alias used throughout the core.
pub type CoreResult<T> = Result<T, CoreError>;

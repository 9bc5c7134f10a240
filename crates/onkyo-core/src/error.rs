//! Error types for onkyo.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Every error can be classified into a
//! [`FailureKind`], which decides whether receiver setup may proceed in
//! degraded mode or must be aborted.

use std::fmt;

/// The error type for all onkyo operations.
///
/// Variants cover the failure modes of a long-lived eISCP session: an
/// unreachable or sleeping receiver, a refused control port, transient
/// network failures, malformed responses, and local input validation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Timed out waiting for the receiver.
    ///
    /// This usually means the receiver is asleep with network standby
    /// disabled, or the host address is wrong.
    #[error("timeout waiting for receiver")]
    Timeout,

    /// The host is reachable but refused the eISCP control port.
    #[error("connection refused")]
    ConnectionRefused,

    /// A transient network failure reported by the transport.
    #[error("network error: {0}")]
    Network(String),

    /// A protocol-level error (unexpected response shape, empty probe).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An invalid parameter was passed to a receiver operation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No session to the receiver is open.
    #[error("not connected")]
    NotConnected,

    /// No transport implementation is available to open a session.
    #[error("transport library missing: {0}")]
    LibraryMissing(String),

    /// Anything the transport reports that fits no other category.
    #[error("unknown error: {0}")]
    Unknown(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error for setup and reporting purposes.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Timeout => FailureKind::Timeout,
            Error::ConnectionRefused => FailureKind::ConnectionRefused,
            Error::Network(_) | Error::NotConnected => FailureKind::Network,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::TimedOut => FailureKind::Timeout,
                std::io::ErrorKind::ConnectionRefused => FailureKind::ConnectionRefused,
                _ => FailureKind::Network,
            },
            Error::LibraryMissing(_) => FailureKind::LibraryMissing,
            Error::Protocol(_) | Error::InvalidParameter(_) | Error::Unknown(_) => {
                FailureKind::Unknown
            }
        }
    }
}

/// Coarse classification of a failure.
///
/// Recoverable kinds let setup continue with a disconnected session so an
/// offline receiver can still be configured; fatal kinds abort setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Receiver unreachable or asleep.
    Timeout,
    /// Host reachable, control service down.
    ConnectionRefused,
    /// Transient network or OS-level failure.
    Network,
    /// No transport collaborator available.
    LibraryMissing,
    /// Anything else.
    Unknown,
}

impl FailureKind {
    /// Whether setup may proceed in degraded mode after this failure.
    pub fn allows_setup(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::ConnectionRefused | FailureKind::Network
        )
    }

    /// Stable machine-readable identifier, as surfaced to configuration UIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::ConnectionRefused => "connection_refused",
            FailureKind::Network => "network_error",
            FailureKind::LibraryMissing => "library_missing",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

//! Shared error type for the client and server halves of file-relay.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Destination string does not match `namespace:path.suffix`
    #[error("invalid locator {0:?}: expected namespace:path.(crt|key|yml|json)")]
    InvalidLocator(String),

    /// No content-type rule matches the remote path
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// PEM or ASN.1 structure of a certificate or key is broken
    #[error("{path}: invalid certificate material: {reason}")]
    InvalidCertificate { path: PathBuf, reason: String },

    #[error("cannot read source file {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// SetFile received no payload
    #[error("empty file")]
    EmptyFile,

    #[error("{listener} listener failed to bind {address}: {source}")]
    BindFailure {
        listener: &'static str,
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("transport encryption setup failed: {0}")]
    Tls(String),

    #[error("{listener} listener exited unexpectedly: {reason}")]
    ListenerExited {
        listener: &'static str,
        reason: String,
    },

    /// One or more teardown steps failed; all of them still ran
    #[error("shutdown failed: {}", .0.join("; "))]
    ShutdownFailure(Vec<String>),

    #[error("server is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: crate::server::ServerState,
        actual: crate::server::ServerState,
    },

    #[error("cannot connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("remote call failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<RelayError> for tonic::Status {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::EmptyFile
            | RelayError::InvalidLocator(_)
            | RelayError::UnsupportedFileType(_)
            | RelayError::InvalidCertificate { .. } => {
                tonic::Status::invalid_argument(err.to_string())
            }
            RelayError::SourceUnreadable { .. } => tonic::Status::not_found(err.to_string()),
            RelayError::Rpc(status) => status,
            other => tonic::Status::internal(other.to_string()),
        }
    }
}

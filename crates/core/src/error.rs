//! Error types for snap-core
//!
//! One error enum for the whole blob store. Callers can tell "does not exist"
//! apart from "transient/exhausted" and from "data corruption", and the CLI
//! maps every kind onto an exit code.

use thiserror::Error;

/// Result type alias for snap-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for snap-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Alias not found
    #[error("Alias not found: {0}")]
    AliasNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication or permission failure
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Blob absent. Never retried.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The bucket bound to a store does not exist
    #[error("Bucket [{0}] does not exist")]
    BucketNotFound(String),

    /// Network fault or rate limiting (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// A resumable upload session was terminated by the service (HTTP 410)
    #[error("Upload session expired: {0}")]
    SessionExpired(String),

    /// A retryable call failed on every attempt
    #[error("Gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The remote service returned a response missing required fields
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// One or more members of a batched delete failed
    #[error("Failed to delete all [{total}] blobs: {failed} deletion(s) failed")]
    PartialBatch { failed: usize, total: usize },

    /// Two listed objects projected onto the same blob name
    #[error("Duplicate blob name in listing: {0}")]
    DuplicateBlob(String),

    /// Store-level failure wrapping the underlying cause
    #[error("{message}: {source}")]
    Store {
        message: String,
        #[source]
        source: Box<Error>,
    },

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Wrap an error into a store-level failure with context
    pub fn store(message: impl Into<String>, source: Error) -> Self {
        Error::Store {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Whether the error, or the error it wraps, means the target is absent
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) | Error::BucketNotFound(_) => true,
            Error::Store { source, .. } | Error::Exhausted { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // UsageError
            Error::InvalidPath(_) | Error::Config(_) => 2,
            // NetworkError
            Error::Network(_) | Error::SessionExpired(_) => 3,
            // AuthError
            Error::Auth(_) => 4,
            // NotFound
            Error::NotFound(_) | Error::BucketNotFound(_) | Error::AliasNotFound(_) => 5,
            // Conflict
            Error::DuplicateBlob(_) => 6,
            Error::Exhausted { source, .. } | Error::Store { source, .. } => source.exit_code(),
            // GeneralError
            _ => 1,
        }
    }
}

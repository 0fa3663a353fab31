//! Error types for the charset checks.
//!
//! Every variant here is fatal: the runner stops at the first error and the
//! binary exits non-zero. Non-conforming schema objects are *findings*, not
//! errors, and never show up in this module.
//!
//! Passwords are never part of an error message. Connection errors carry the
//! `host:port[/database]` target only.

use thiserror::Error;

/// Main error type for mb4check operations.
#[derive(Debug, Error)]
pub enum Mb4CheckError {
    /// Could not establish the database connection
    #[error("Database connection failed: {context}")]
    Connection {
        /// Credential-free `host:port[/database]` target
        context: String,
        /// Underlying driver or transport error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The server rejected a query or the transport failed mid-query
    #[error("Query failed: {context}")]
    Query {
        /// Which query failed
        context: String,
        /// Underlying driver or transport error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A result row did not have the expected shape
    #[error("Failed to decode {field} from {context}")]
    Decode {
        /// Column that could not be read
        field: String,
        /// Which query the row came from
        context: String,
        /// Underlying decoding error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The version string could not be split into major.minor.patch
    #[error("Malformed server version '{version}': {reason}")]
    MalformedVersion {
        /// Raw string returned by `SELECT VERSION()`
        version: String,
        /// What was wrong with it
        reason: String,
    },

    /// The server is too old to store utf8mb4
    #[error("MySQL server version must be {minimum} or higher to support utf8mb4 (found {found}).")]
    UnsupportedVersion {
        /// Version the server reported
        found: String,
        /// Oldest accepted version
        minimum: String,
    },

    /// Invalid command-line or configuration value
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the invalid value
        message: String,
    },

    /// Writing findings to the output stream failed
    #[error("Failed to write report: {context}")]
    Io {
        /// What was being written
        context: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results with Mb4CheckError
pub type Result<T> = std::result::Result<T, Mb4CheckError>;

impl Mb4CheckError {
    /// Creates a connection error for the given (credential-free) target
    pub fn connection_failed<E>(target: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: target.into(),
            source: Box::new(error),
        }
    }

    /// Creates a query error with context
    pub fn query_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Query {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a decoding error for a column of a result row
    ///
    /// # Arguments
    /// * `field` - Name of the column being read
    /// * `context` - Which query the row came from
    /// * `error` - The underlying decoding error
    pub fn decode_failed<E>(field: &str, context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Decode {
            field: field.to_string(),
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a malformed version error
    pub fn malformed_version(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedVersion {
            version: version.into(),
            reason: reason.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an output error
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

//! Error types for the setip agent
//!
//! Every failure inside a delivery iteration is recoverable; the loop logs it
//! and carries on. Only [`Error::Config`] stops the program, and only at startup.

use thiserror::Error;

use crate::traits::IpVersion;

/// Result type alias for setip operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the setip agent
#[derive(Error, Debug)]
pub enum Error {
    /// DNS lookup of the collector hostname failed
    #[error("DNS resolution via {server} failed: {message}")]
    Resolution {
        /// Server that was queried ("localhost" or a literal address)
        server: String,
        /// Error message
        message: String,
    },

    /// The candidate store has never been populated for this family
    #[error("IP type does not exist: {0}")]
    UnknownFamily(IpVersion),

    /// The candidate store holds an entry of the wrong family
    #[error("IP list format is incorrect for {family}: {entry}")]
    MalformedEntry {
        /// Bucket that was read
        family: IpVersion,
        /// Offending entry
        entry: String,
    },

    /// Connecting to or talking with the collector failed
    #[error("Connect error ({ip}): {message}")]
    Connect {
        /// Candidate IP that was dialed
        ip: String,
        /// Error message
        message: String,
    },

    /// Request could not be built from its inputs
    #[error("Request error: {0}")]
    Request(String),

    /// Report payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local interface enumeration failed
    #[error("Address source error: {0}")]
    AddressSource(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a connect error
    pub fn connect(ip: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            ip: ip.into(),
            message: message.into(),
        }
    }

    /// Create a request error
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Create an address source error
    pub fn address_source(msg: impl Into<String>) -> Self {
        Self::AddressSource(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

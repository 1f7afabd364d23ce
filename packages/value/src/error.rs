//! Error types for value conversion and path writes.

use thiserror::Error;

/// Errors raised while moving values across the script boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A script value has no `Value` counterpart (function, userdata, a
    /// table keyed by something other than a string or number).
    #[error("conversion error: {message}")]
    Conversion { message: String },

    /// A path write used an unusable key or walked through a non-table.
    #[error("bad key: {message}")]
    BadKey { message: String },
}

impl Error {
    pub fn conversion(message: impl Into<String>) -> Self {
        Error::Conversion {
            message: message.into(),
        }
    }

    pub fn bad_key(message: impl Into<String>) -> Self {
        Error::BadKey {
            message: message.into(),
        }
    }
}

/// Result type alias for value operations.
pub type Result<T> = std::result::Result<T, Error>;

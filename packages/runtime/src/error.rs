//! Error types for the arscene runtime.

use thiserror::Error;

use crate::registry::InstanceId;

/// Errors that can occur while loading, running or registering instances.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Program or library source failed to parse or run at load time.
    #[error("failed to load \"{program}\": {source}")]
    Load {
        program: String,
        #[source]
        source: mlua::Error,
    },

    /// The init hook raised an error.
    ///
    /// `instance` is set when the failing instance already holds a registry
    /// slot.
    #[error("init hook of \"{program}\" failed: {source}")]
    Init {
        program: String,
        instance: Option<InstanceId>,
        #[source]
        source: mlua::Error,
    },

    /// The render hook raised an error.
    #[error("render hook of \"{program}\" failed: {source}")]
    Render {
        program: String,
        #[source]
        source: mlua::Error,
    },

    /// A value could not cross the script boundary.
    #[error(transparent)]
    Value(#[from] arscene_value::Error),

    /// No program is registered under this name.
    #[error("unknown program: {0}")]
    UnknownProgram(String),

    /// No instance has this id.
    #[error("unknown instance: {0}")]
    UnknownInstance(InstanceId),

    /// Instance state must always be a table.
    #[error("instance state must be a table, got {0}")]
    InvalidState(&'static str),

    /// The registry is full.
    #[error("maximum instances reached ({0})")]
    LimitReached(usize),

    /// An I/O error occurred while reading program sources.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn load_error_display_and_source() {
        let e = RuntimeError::Load {
            program: "calculator".to_string(),
            source: mlua::Error::RuntimeError("unexpected symbol".to_string()),
        };
        let display = format!("{}", e);
        assert!(display.contains("calculator"));
        assert!(display.contains("unexpected symbol"));
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn value_error_is_transparent() {
        let e: RuntimeError = arscene_value::Error::bad_key("boolean key").into();
        assert_eq!(format!("{}", e), "bad key: boolean key");
    }

    #[test]
    fn unknown_instance_display() {
        let e = RuntimeError::UnknownInstance(7);
        assert_eq!(format!("{}", e), "unknown instance: 7");
    }
}

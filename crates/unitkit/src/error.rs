//! Error types for unit resolution and execution.
//!
//! Every variant here is an *engine-level* failure: the requested action was
//! never run, or its outcome could not be obtained. An action that runs and
//! reports failure through its exit status is not an error; it is an
//! [`ExecutionOutcome`](crate::ExecutionOutcome) with a non-zero status.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Exit status reserved for engine-level failures.
///
/// Follows the `env`/`timeout` convention of using 125 for failures of the
/// tool itself, keeping them apart from whatever status an action reports.
pub const ENGINE_FAILURE_EXIT_CODE: u8 = 125;

/// Categories of engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request itself was malformed (bad argument token, bad target URI)
    Usage,
    /// The unit, action or a required parameter could not be found
    Resolution,
    /// The action could not be dispatched or its outcome not collected
    Transport,
    /// The registry could not be built at startup
    Startup,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Usage => "Invalid invocation",
            Self::Resolution => "Unit resolution failed",
            Self::Transport => "Transport failed",
            Self::Startup => "Unit discovery failed",
        }
    }
}

/// Errors that can occur while resolving and dispatching a unit action.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument token has no `=` or an empty name
    #[error("malformed argument `{token}`: expected name=value")]
    MalformedArgument {
        /// The offending raw token
        token: String,
    },

    /// No unit is registered under this name
    #[error("unit not found: {name}")]
    UnitNotFound {
        /// Requested unit name
        name: String,
    },

    /// The unit exists but has no such action
    #[error("unit `{unit}` has no action `{action}`")]
    ActionNotFound {
        /// Resolved unit name
        unit: String,
        /// Requested action name
        action: String,
    },

    /// A parameter the action declares as required was not supplied
    #[error("{unit}|{action} requires argument `{name}`")]
    MissingArgument {
        /// Resolved unit name
        unit: String,
        /// Resolved action name
        action: String,
        /// Name of the missing parameter
        name: String,
    },

    /// The target URI could not be understood
    #[error("invalid target `{uri}`: {reason}")]
    InvalidTarget {
        /// Raw target URI
        uri: String,
        /// Why it was rejected
        reason: String,
    },

    /// The transport could not run the action or collect its outcome
    #[error("transport error on {target}: {message}")]
    Transport {
        /// Display form of the target
        target: String,
        /// What went wrong
        message: String,
    },

    /// The action did not complete within the configured timeout
    #[error("timed out on {target} after {}s", after.as_secs())]
    Timeout {
        /// Display form of the target
        target: String,
        /// The timeout that was exceeded
        after: Duration,
    },

    /// The remote sysunit rejected the invocation before running the action
    #[error("remote sysunit on {target} failed: {message}")]
    Remote {
        /// Display form of the target
        target: String,
        /// Diagnostic reported by the remote process
        message: String,
    },

    /// Two units were registered under the same name
    #[error("duplicate unit: {name}")]
    DuplicateUnit {
        /// Conflicting unit name
        name: String,
    },

    /// A unit defines the same action twice
    #[error("unit `{unit}` defines action `{action}` twice")]
    DuplicateAction {
        /// Unit being built
        unit: String,
        /// Conflicting action name
        action: String,
    },

    /// A unit found on the search path is malformed
    #[error("invalid unit at {}: {reason}", path.display())]
    InvalidUnit {
        /// Location of the unit
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a transport error for the given target.
    pub fn transport(target: impl ToString, message: impl Into<String>) -> Self {
        Self::Transport {
            target: target.to_string(),
            message: message.into(),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedArgument { .. } | Self::InvalidTarget { .. } => ErrorCategory::Usage,
            Self::UnitNotFound { .. }
            | Self::ActionNotFound { .. }
            | Self::MissingArgument { .. } => ErrorCategory::Resolution,
            Self::Transport { .. } | Self::Timeout { .. } | Self::Remote { .. } => {
                ErrorCategory::Transport
            }
            Self::DuplicateUnit { .. }
            | Self::DuplicateAction { .. }
            | Self::InvalidUnit { .. }
            | Self::Io(_) => ErrorCategory::Startup,
        }
    }

    /// Process exit status for this error. Always the reserved engine code.
    pub fn exit_code(&self) -> u8 {
        ENGINE_FAILURE_EXIT_CODE
    }
}

/// Result type for unitkit operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = Error::MalformedArgument {
            token: "foo".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Usage);

        let err = Error::UnitNotFound { name: "x".into() };
        assert_eq!(err.category(), ErrorCategory::Resolution);

        let err = Error::transport("ssh://root@box", "connection refused");
        assert_eq!(err.category(), ErrorCategory::Transport);

        let err = Error::Timeout {
            target: "local".into(),
            after: Duration::from_secs(3),
        };
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert_eq!(err.to_string(), "timed out on local after 3s");
    }

    #[test]
    fn test_every_error_uses_reserved_exit_code() {
        let errors = [
            Error::UnitNotFound { name: "x".into() },
            Error::transport("local", "boom"),
            Error::DuplicateUnit { name: "hi".into() },
        ];
        for err in errors {
            assert_eq!(err.exit_code(), ENGINE_FAILURE_EXIT_CODE);
        }
    }

    #[test]
    fn test_display_messages() {
        let err = Error::ActionNotFound {
            unit: "hi".into(),
            action: "rollback".into(),
        };
        assert_eq!(err.to_string(), "unit `hi` has no action `rollback`");

        let err = Error::MalformedArgument {
            token: "foo".into(),
        };
        assert!(err.to_string().contains("`foo`"));
    }
}

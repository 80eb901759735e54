//! Error types for rendering and registration.

use std::fmt;
use std::time::Duration;

/// Error returned by a render call.
///
/// Every variant flows unchanged from the strategy that raised it through
/// [`Engine::render`](crate::Engine::render) to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No renderer is registered for the identifier.
    #[error("no renderer registered for '{identifier}'")]
    UnsupportedFormat { identifier: String },

    /// The external executable could not be resolved on the search path.
    #[error("command '{program}' not found")]
    CommandNotFound { program: String },

    /// The external executable ran but exited unsuccessfully.
    #[error("command '{program}' {}: {}", describe_exit(.code), .stderr.trim_end())]
    NonZeroExit {
        program: String,
        /// Exit code, or `None` when the process was terminated by a signal.
        code: Option<i32>,
        /// Captured standard error, verbatim.
        stderr: String,
    },

    /// The external executable exceeded its time bound and was killed.
    #[error("command '{program}' timed out after {}ms", .timeout.as_millis())]
    Timeout { program: String, timeout: Duration },

    /// The in-process library backing the renderer is unavailable.
    #[error("dependency '{dependency}' is not available")]
    DependencyMissing { dependency: String },

    /// Any other conversion failure.
    #[error("{message}")]
    Rendering { message: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_owned(),
    }
}

impl RenderError {
    /// Create a generic rendering error from any message.
    pub fn rendering(message: impl Into<String>) -> Self {
        Self::Rendering {
            message: message.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::CommandNotFound { .. } => ErrorKind::CommandNotFound,
            Self::NonZeroExit { .. } => ErrorKind::NonZeroExit,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::DependencyMissing { .. } => ErrorKind::DependencyMissing,
            Self::Rendering { .. } => ErrorKind::RenderingError,
        }
    }
}

/// Error category, independent of payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedFormat,
    CommandNotFound,
    NonZeroExit,
    Timeout,
    DependencyMissing,
    RenderingError,
}

impl ErrorKind {
    /// Name of the kind as shown to users.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::CommandNotFound => "CommandNotFound",
            Self::NonZeroExit => "NonZeroExit",
            Self::Timeout => "Timeout",
            Self::DependencyMissing => "DependencyMissing",
            Self::RenderingError => "RenderingError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned while building a [`Registry`](crate::Registry).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The identifier is already taken and the policy rejects duplicates.
    #[error("identifier '{identifier}' is already registered to {existing}")]
    Duplicate { identifier: String, existing: String },

    /// Registration was attempted after the registry was frozen.
    #[error("cannot register '{identifier}': registry is frozen")]
    Frozen { identifier: String },

    /// The descriptor cannot be used as given.
    #[error("invalid renderer '{name}': {message}")]
    InvalidDescriptor { name: String, message: String },
}

//! CLI error types.

use markup_config::ConfigError;
use markup_engine::RenderError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{}: {}", .0.kind(), .0)]
    Render(#[from] RenderError),

    #[error("{path}: {}: {source}", .source.kind())]
    RenderFile {
        path: String,
        #[source]
        source: RenderError,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Validation(String),
}

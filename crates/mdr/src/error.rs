//! CLI error types.

use mdr_config::ConfigError;
use mdr_renderer::RenderError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("invalid token stream: {0}")]
    Tokens(#[source] serde_json::Error),

    #[error("invalid manpage URL table {path}: {source}")]
    ManpageUrls {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

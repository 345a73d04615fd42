//! CLI error type.

use thiserror::Error;

use blockpress::config::ConfigError;
use blockpress::container::ContainerError;
use blockpress::TextureError;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid command-line usage or configuration value.
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error("Failed to render JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_error_is_transparent() {
        let err: CliError = TextureError::UnsupportedFormat("etc2".to_string()).into();
        assert_eq!(err.to_string(), "Unsupported format: etc2");
        assert_eq!(err.exit_code(), 1);
    }
}

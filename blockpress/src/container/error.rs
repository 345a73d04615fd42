//! Error types for the container module.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::error::TextureError;

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors that can occur while reading or writing image files.
#[derive(Debug)]
pub enum ContainerError {
    /// Reading or writing the file failed.
    Io { path: PathBuf, source: io::Error },

    /// File contents do not form a valid container header.
    InvalidHeader(String),

    /// File type is not recognised, or recognised but not loadable.
    UnsupportedFileFormat(String),

    /// The `image` crate failed to decode or encode a picture.
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    /// The contained texture is invalid.
    Texture(TextureError),
}

impl ContainerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ContainerError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ContainerError::InvalidHeader(msg) => write!(f, "invalid header: {}", msg),
            ContainerError::UnsupportedFileFormat(msg) => {
                write!(f, "unsupported file format: {}", msg)
            }
            ContainerError::Image { path, source } => {
                write!(f, "image error on {}: {}", path.display(), source)
            }
            ContainerError::Texture(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContainerError::Io { source, .. } => Some(source),
            ContainerError::Image { source, .. } => Some(source),
            ContainerError::Texture(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TextureError> for ContainerError {
    fn from(err: TextureError) -> Self {
        ContainerError::Texture(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_io_display() {
        let err = ContainerError::io(
            "/tmp/missing.ktx",
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.ktx"));
        assert!(msg.contains("not found"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_invalid_header_display() {
        let err = ContainerError::InvalidHeader("bad identifier".to_string());
        assert_eq!(err.to_string(), "invalid header: bad identifier");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_texture_error_passthrough() {
        let err: ContainerError = TextureError::UnsupportedFormat("glInternalFormat 0x1234".into()).into();
        assert_eq!(err.to_string(), "Unsupported format: glInternalFormat 0x1234");
        assert!(err.source().is_some());
    }
}

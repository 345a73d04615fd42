//! Error types for compressed image operations.

use thiserror::Error;

use crate::scheduler::SchedulerError;

/// Errors that can occur while building, compressing or decompressing a
/// [`CompressedImage`](crate::CompressedImage).
#[derive(Debug, Error)]
pub enum TextureError {
    /// Uncompressed size is not a multiple of 8 bytes.
    #[error("Invalid uncompressed size {size}: must be a multiple of 8 bytes")]
    InvalidSize { size: usize },

    /// Image dimensions cannot be encoded in the requested format.
    #[error("Invalid dimensions {width}×{height}: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    /// Caller supplied fewer compressed bytes than the format requires.
    #[error("Insufficient compressed data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// Output buffer does not match the uncompressed image size.
    #[error("Output buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Format tag is not one of the supported compression formats.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The block-parallel compression run failed.
    #[error("Compression failed: {0}")]
    Compression(#[from] SchedulerError),
}

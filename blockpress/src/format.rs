//! Compression format tags and the format-to-size arithmetic.
//!
//! Every format handled by blockpress encodes fixed 4×4 pixel blocks of
//! RGBA8 input (64 bytes per block). The compressed size is a fixed ratio of
//! the uncompressed size:
//!
//! | Format  | Bytes per block | Ratio |
//! |---------|-----------------|-------|
//! | DXT1    | 8               | 1/8   |
//! | PVRTC   | 8               | 1/8   |
//! | DXT5    | 16              | 1/4   |
//! | BPTC    | 16              | 1/4   |

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::TextureError;
use crate::layout::BlockOrder;

/// Width and height of one compression block in pixels.
pub const BLOCK_DIM: usize = 4;

/// Uncompressed bytes in one 4×4 RGBA8 block.
pub const UNCOMPRESSED_BLOCK_BYTES: usize = BLOCK_DIM * BLOCK_DIM * 4;

// KTX / OpenGL internal format identifiers.
pub const GL_COMPRESSED_RGBA_S3TC_DXT1_EXT: u32 = 0x83F1;
pub const GL_COMPRESSED_RGBA_S3TC_DXT5_EXT: u32 = 0x83F3;
pub const GL_COMPRESSED_RGBA_BPTC_UNORM: u32 = 0x8E8C;
pub const GL_COMPRESSED_RGBA_PVRTC_4BPPV1_IMG: u32 = 0x8C02;

/// Block compression format of a [`CompressedImage`](crate::CompressedImage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionFormat {
    /// DXT1/BC1 (8 bytes per block, 1-bit alpha)
    Dxt1,
    /// DXT5/BC3 (16 bytes per block, interpolated alpha)
    Dxt5,
    /// BPTC/BC7 (16 bytes per block)
    Bptc,
    /// PVRTC 4bpp (8 bytes per block, Morton block order)
    Pvrtc,
}

impl CompressionFormat {
    /// All supported formats.
    pub const ALL: [CompressionFormat; 4] = [
        CompressionFormat::Dxt1,
        CompressionFormat::Dxt5,
        CompressionFormat::Bptc,
        CompressionFormat::Pvrtc,
    ];

    /// Compressed bytes produced for one 4×4 block.
    pub fn block_bytes(self) -> usize {
        match self {
            CompressionFormat::Dxt1 | CompressionFormat::Pvrtc => 8,
            CompressionFormat::Dxt5 | CompressionFormat::Bptc => 16,
        }
    }

    /// Order in which blocks are stored in the compressed buffer.
    pub fn block_order(self) -> BlockOrder {
        match self {
            CompressionFormat::Dxt1 | CompressionFormat::Dxt5 | CompressionFormat::Bptc => {
                BlockOrder::RowMajor
            }
            CompressionFormat::Pvrtc => BlockOrder::Morton,
        }
    }

    /// Short lowercase name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            CompressionFormat::Dxt1 => "dxt1",
            CompressionFormat::Dxt5 => "dxt5",
            CompressionFormat::Bptc => "bptc",
            CompressionFormat::Pvrtc => "pvrtc",
        }
    }

    /// OpenGL internal format used when writing KTX containers.
    pub fn gl_internal_format(self) -> u32 {
        match self {
            CompressionFormat::Dxt1 => GL_COMPRESSED_RGBA_S3TC_DXT1_EXT,
            CompressionFormat::Dxt5 => GL_COMPRESSED_RGBA_S3TC_DXT5_EXT,
            CompressionFormat::Bptc => GL_COMPRESSED_RGBA_BPTC_UNORM,
            CompressionFormat::Pvrtc => GL_COMPRESSED_RGBA_PVRTC_4BPPV1_IMG,
        }
    }

    /// Maps an OpenGL internal format back to a compression format.
    ///
    /// Returns [`TextureError::UnsupportedFormat`] for anything this crate
    /// has no codec for.
    pub fn from_gl_internal_format(value: u32) -> Result<Self, TextureError> {
        match value {
            GL_COMPRESSED_RGBA_S3TC_DXT1_EXT => Ok(CompressionFormat::Dxt1),
            GL_COMPRESSED_RGBA_S3TC_DXT5_EXT => Ok(CompressionFormat::Dxt5),
            GL_COMPRESSED_RGBA_BPTC_UNORM => Ok(CompressionFormat::Bptc),
            GL_COMPRESSED_RGBA_PVRTC_4BPPV1_IMG => Ok(CompressionFormat::Pvrtc),
            other => Err(TextureError::UnsupportedFormat(format!(
                "glInternalFormat 0x{:04X}",
                other
            ))),
        }
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionFormat::Dxt1 => write!(f, "DXT1"),
            CompressionFormat::Dxt5 => write!(f, "DXT5"),
            CompressionFormat::Bptc => write!(f, "BPTC"),
            CompressionFormat::Pvrtc => write!(f, "PVRTC"),
        }
    }
}

impl FromStr for CompressionFormat {
    type Err = TextureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dxt1" | "bc1" => Ok(CompressionFormat::Dxt1),
            "dxt5" | "bc3" => Ok(CompressionFormat::Dxt5),
            "bptc" | "bc7" => Ok(CompressionFormat::Bptc),
            "pvrtc" | "pvrtc4" => Ok(CompressionFormat::Pvrtc),
            _ => Err(TextureError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Exact compressed size for `uncompressed_size` bytes of RGBA8 data.
///
/// `{DXT1, PVRTC}` compress to one eighth, `{DXT5, BPTC}` to one quarter.
///
/// # Errors
///
/// Returns [`TextureError::InvalidSize`] if `uncompressed_size` is not a
/// multiple of 8. The size is never truncated.
pub fn compressed_size(
    uncompressed_size: usize,
    format: CompressionFormat,
) -> Result<usize, TextureError> {
    if uncompressed_size % 8 != 0 {
        return Err(TextureError::InvalidSize {
            size: uncompressed_size,
        });
    }

    Ok(match format {
        CompressionFormat::Dxt1 | CompressionFormat::Pvrtc => uncompressed_size / 8,
        CompressionFormat::Dxt5 | CompressionFormat::Bptc => uncompressed_size / 4,
    })
}

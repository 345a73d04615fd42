//! Block codecs.
//!
//! Every format is exposed through the same two seams:
//!
//! - [`BlockEncoder`]: compresses a contiguous run of block-linear RGBA8
//!   blocks (64 bytes each) into the same number of compressed blocks.
//!   This is the unit of work the [`Scheduler`](crate::scheduler::Scheduler)
//!   hands to its workers.
//! - [`decode`]: expands a whole compressed image back into row-major RGBA8.
//!
//! DXT1, DXT5 and BPTC are encoded with the ISPC kernels from `intel_tex_2`
//! and decoded with `block_compression`. PVRTC is handled by the [`pvrtc`]
//! module.
//!
//! # Example
//!
//! ```
//! use blockpress::codec::{encoder_for, EncodeOptions};
//! use blockpress::CompressionFormat;
//!
//! let encoder = encoder_for(CompressionFormat::Dxt1, &EncodeOptions::default());
//! let block = [255u8; 64];
//! let mut out = [0u8; 8];
//! encoder.encode_blocks(&block, &mut out);
//!
//! assert_eq!(encoder.block_bytes(), 8);
//! assert_eq!(encoder.name(), "DXT1");
//! ```

mod bc;
pub mod pvrtc;

pub use bc::{Bc7Encoder, Dxt1Encoder, Dxt5Encoder};
pub use pvrtc::PvrtcEncoder;

use std::fmt;
use std::str::FromStr;

use block_compression::decode::{decode_block_bc1, decode_block_bc3, decode_block_bc7};
use serde::Serialize;

use crate::error::TextureError;
use crate::format::{compressed_size, CompressionFormat};
use crate::layout::{rgba_len, validate_dimensions};

/// Compresses block-linear RGBA8 data.
///
/// `src` holds `n` uncompressed 4×4 blocks of 64 bytes each, pixels in
/// row-major order within the block. `dst` holds exactly
/// `n * block_bytes()` bytes. Implementations must write every byte of
/// `dst` and must not depend on where the run sits in the image, so that
/// any partition of the blocks produces the same output.
pub trait BlockEncoder: Send + Sync {
    /// Compressed bytes produced per 4×4 block.
    fn block_bytes(&self) -> usize;

    /// Encode every block of `src` into `dst`.
    fn encode_blocks(&self, src: &[u8], dst: &mut [u8]);

    /// Human-readable encoder name, used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// BC7 encoder speed/quality trade-off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bc7Quality {
    UltraFast,
    VeryFast,
    Fast,
    #[default]
    Basic,
    Slow,
}

impl Bc7Quality {
    /// Config/CLI spelling.
    pub fn name(&self) -> &'static str {
        match self {
            Bc7Quality::UltraFast => "ultrafast",
            Bc7Quality::VeryFast => "veryfast",
            Bc7Quality::Fast => "fast",
            Bc7Quality::Basic => "basic",
            Bc7Quality::Slow => "slow",
        }
    }
}

impl fmt::Display for Bc7Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Bc7Quality {
    type Err = TextureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "ultrafast" => Ok(Bc7Quality::UltraFast),
            "veryfast" => Ok(Bc7Quality::VeryFast),
            "fast" => Ok(Bc7Quality::Fast),
            "basic" => Ok(Bc7Quality::Basic),
            "slow" => Ok(Bc7Quality::Slow),
            _ => Err(TextureError::UnsupportedFormat(format!(
                "BC7 quality '{}'",
                s
            ))),
        }
    }
}

/// Encoder tuning shared by all formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Settings preset for BPTC.
    pub bc7_quality: Bc7Quality,
}

impl EncodeOptions {
    /// Set the BPTC quality preset.
    pub fn with_bc7_quality(mut self, quality: Bc7Quality) -> Self {
        self.bc7_quality = quality;
        self
    }
}

/// Built-in encoder for `format`.
pub fn encoder_for(format: CompressionFormat, options: &EncodeOptions) -> Box<dyn BlockEncoder> {
    match format {
        CompressionFormat::Dxt1 => Box::new(Dxt1Encoder),
        CompressionFormat::Dxt5 => Box::new(Dxt5Encoder),
        CompressionFormat::Bptc => Box::new(Bc7Encoder::new(options.bc7_quality)),
        CompressionFormat::Pvrtc => Box::new(PvrtcEncoder),
    }
}

/// Decode a whole `width`×`height` image of `format` blocks into row-major
/// RGBA8.
///
/// `data` must hold one compressed block per 4×4 tile, in the format's
/// block order; trailing bytes are ignored. `out` must be exactly
/// `width * height * 4` bytes.
pub fn decode(
    format: CompressionFormat,
    data: &[u8],
    width: u32,
    height: u32,
    out: &mut [u8],
) -> Result<(), TextureError> {
    validate_dimensions(width, height, format.block_order())?;

    let pixels = rgba_len(width, height)?;
    let expected = compressed_size(pixels, format)?;
    if data.len() < expected {
        return Err(TextureError::InsufficientData {
            expected,
            actual: data.len(),
        });
    }

    if out.len() != pixels {
        return Err(TextureError::BufferSizeMismatch {
            expected: pixels,
            actual: out.len(),
        });
    }

    let data = &data[..expected];
    let decode_block: bc::BlockDecodeFn = match format {
        CompressionFormat::Dxt1 => decode_block_bc1,
        CompressionFormat::Dxt5 => decode_block_bc3,
        CompressionFormat::Bptc => decode_block_bc7,
        CompressionFormat::Pvrtc => {
            pvrtc::decode_image(data, width, height, out);
            return Ok(());
        }
    };
    bc::decode_image(decode_block, format.block_bytes(), data, width, height, out);

    Ok(())
}

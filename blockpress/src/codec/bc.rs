//! DXT1/DXT5/BPTC codecs.
//!
//! Encoding goes through the ISPC texture compressor (`intel_tex_2`).
//! A run of `n` block-linear blocks is presented to it as a 4 × 4n surface:
//! each 64-byte block is four 16-byte rows, so stacking blocks vertically
//! yields exactly the row layout ISPC expects, and the blocks come back out
//! in the same order.
//!
//! Decoding drives the per-block CPU decoders from `block_compression`
//! one block row at a time.

use intel_tex_2::{bc1, bc3, bc7, RgbaSurface};
use rayon::prelude::*;

use super::{Bc7Quality, BlockEncoder};
use crate::format::{CompressionFormat, BLOCK_DIM, UNCOMPRESSED_BLOCK_BYTES};

/// Stride of a one-block-wide surface.
const STRIP_STRIDE: u32 = (BLOCK_DIM * 4) as u32;

/// Views `src` as a one-block-wide, `n` blocks tall surface.
fn strip_surface(src: &[u8]) -> RgbaSurface<'_> {
    let blocks = src.len() / UNCOMPRESSED_BLOCK_BYTES;
    RgbaSurface {
        data: &src[..blocks * UNCOMPRESSED_BLOCK_BYTES],
        width: BLOCK_DIM as u32,
        height: (blocks * BLOCK_DIM) as u32,
        stride: STRIP_STRIDE,
    }
}

/// DXT1 (BC1) encoder. 8 bytes per block.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dxt1Encoder;

impl BlockEncoder for Dxt1Encoder {
    fn block_bytes(&self) -> usize {
        CompressionFormat::Dxt1.block_bytes()
    }

    fn encode_blocks(&self, src: &[u8], dst: &mut [u8]) {
        if src.is_empty() {
            return;
        }
        bc1::compress_blocks_into(&strip_surface(src), dst);
    }

    fn name(&self) -> &str {
        "DXT1"
    }
}

/// DXT5 (BC3) encoder. 16 bytes per block.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dxt5Encoder;

impl BlockEncoder for Dxt5Encoder {
    fn block_bytes(&self) -> usize {
        CompressionFormat::Dxt5.block_bytes()
    }

    fn encode_blocks(&self, src: &[u8], dst: &mut [u8]) {
        if src.is_empty() {
            return;
        }
        bc3::compress_blocks_into(&strip_surface(src), dst);
    }

    fn name(&self) -> &str {
        "DXT5"
    }
}

/// BPTC (BC7) encoder. 16 bytes per block.
///
/// Always uses the alpha-aware presets so translucent blocks survive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bc7Encoder {
    quality: Bc7Quality,
}

impl Bc7Encoder {
    /// Create an encoder using the given quality preset.
    pub fn new(quality: Bc7Quality) -> Self {
        Self { quality }
    }

    /// Quality preset in use.
    pub fn quality(&self) -> Bc7Quality {
        self.quality
    }

    fn settings(&self) -> bc7::EncodeSettings {
        match self.quality {
            Bc7Quality::UltraFast => bc7::alpha_ultra_fast_settings(),
            Bc7Quality::VeryFast => bc7::alpha_very_fast_settings(),
            Bc7Quality::Fast => bc7::alpha_fast_settings(),
            Bc7Quality::Basic => bc7::alpha_basic_settings(),
            Bc7Quality::Slow => bc7::alpha_slow_settings(),
        }
    }
}

impl BlockEncoder for Bc7Encoder {
    fn block_bytes(&self) -> usize {
        CompressionFormat::Bptc.block_bytes()
    }

    fn encode_blocks(&self, src: &[u8], dst: &mut [u8]) {
        if src.is_empty() {
            return;
        }
        bc7::compress_blocks_into(&self.settings(), &strip_surface(src), dst);
    }

    fn name(&self) -> &str {
        "BPTC"
    }
}

/// Decodes a single block into RGBA8 rows `pitch` bytes apart.
pub(super) type BlockDecodeFn = fn(&[u8], &mut [u8], usize);

/// Decodes row-major blocks of `block_bytes` each into row-major RGBA8.
///
/// Block rows are decoded in parallel. Sizes are checked by the caller.
pub(super) fn decode_image(
    decode_block: BlockDecodeFn,
    block_bytes: usize,
    data: &[u8],
    width: u32,
    height: u32,
    out: &mut [u8],
) {
    let blocks_wide = width as usize / BLOCK_DIM;
    let pitch = width as usize * 4;
    if blocks_wide == 0 || height == 0 {
        return;
    }

    out.par_chunks_mut(pitch * BLOCK_DIM)
        .zip(data.par_chunks(blocks_wide * block_bytes))
        .for_each(|(pixel_rows, block_row)| {
            for (bx, block) in block_row.chunks_exact(block_bytes).enumerate() {
                decode_block(block, &mut pixel_rows[bx * BLOCK_DIM * 4..], pitch);
            }
        });
}

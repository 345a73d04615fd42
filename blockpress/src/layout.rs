//! Conversion between row-major RGBA images and block-linear buffers.
//!
//! The scheduler hands each worker a contiguous strip of blocks, so its input
//! has to be *block-linear*: every 64-byte chunk is one 4×4 block whose 16
//! pixels are stored row by row.
//!
//! ```text
//! row-major 8×4 image             block-linear buffer
//! ┌────┬────┐
//! │ b0 │ b1 │            ──►      [ b0: 64 bytes ][ b1: 64 bytes ]
//! └────┴────┘
//! ```
//!
//! The order of the blocks follows the storage order of the target format:
//! row-major for DXT/BPTC, Morton ("twiddled") for PVRTC.

use rayon::prelude::*;

use crate::error::TextureError;
use crate::format::{BLOCK_DIM, UNCOMPRESSED_BLOCK_BYTES};

/// Bytes in one row of a block (4 RGBA8 pixels).
const BLOCK_ROW_BYTES: usize = BLOCK_DIM * 4;

/// Storage order of blocks in a compressed (or block-linear) buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOrder {
    /// Left to right, top to bottom.
    RowMajor,
    /// Bit-interleaved block coordinates. Requires power-of-two block grids.
    Morton,
}

impl BlockOrder {
    /// Index of block `(x, y)` in a grid of `blocks_wide × blocks_high`.
    pub fn block_index(self, x: usize, y: usize, blocks_wide: usize, blocks_high: usize) -> usize {
        match self {
            BlockOrder::RowMajor => y * blocks_wide + x,
            BlockOrder::Morton => morton_index(x, y, blocks_wide, blocks_high),
        }
    }

    /// Block coordinates of the block stored at `index`.
    pub fn block_position(
        self,
        index: usize,
        blocks_wide: usize,
        blocks_high: usize,
    ) -> (usize, usize) {
        match self {
            BlockOrder::RowMajor => (index % blocks_wide, index / blocks_wide),
            BlockOrder::Morton => morton_position(index, blocks_wide, blocks_high),
        }
    }
}

/// Morton index of block `(x, y)`.
///
/// The low bits interleave `y` (even positions) and `x` (odd positions) up
/// to the smaller grid dimension; the remaining high bits of the larger
/// dimension are appended above them. Both dimensions must be powers of two.
pub fn morton_index(x: usize, y: usize, blocks_wide: usize, blocks_high: usize) -> usize {
    let min_dim = blocks_wide.min(blocks_high);

    let mut index = 0;
    let mut shift = 0;
    let mut bit = 1;
    while bit < min_dim {
        if y & bit != 0 {
            index |= 1 << shift;
        }
        shift += 1;
        if x & bit != 0 {
            index |= 1 << shift;
        }
        shift += 1;
        bit <<= 1;
    }

    let rest = if blocks_wide > blocks_high { x } else { y };
    index | ((rest >> (shift / 2)) << shift)
}

/// Inverse of [`morton_index`].
pub fn morton_position(index: usize, blocks_wide: usize, blocks_high: usize) -> (usize, usize) {
    let min_dim = blocks_wide.min(blocks_high);

    let (mut x, mut y) = (0, 0);
    let mut shift = 0;
    let mut bit = 1;
    while bit < min_dim {
        if index & (1 << shift) != 0 {
            y |= bit;
        }
        shift += 1;
        if index & (1 << shift) != 0 {
            x |= bit;
        }
        shift += 1;
        bit <<= 1;
    }

    let rest = (index >> shift) << (shift / 2);
    if blocks_wide > blocks_high {
        x |= rest;
    } else {
        y |= rest;
    }
    (x, y)
}

/// Rearranges a row-major RGBA8 image into a block-linear buffer.
///
/// # Arguments
///
/// * `pixels` - `width * height * 4` bytes of row-major RGBA8
/// * `width`, `height` - Image dimensions, both multiples of 4
/// * `order` - Block order of the produced buffer
///
/// # Errors
///
/// [`TextureError::InvalidDimensions`] if the dimensions are not block
/// aligned (or not powers of two for [`BlockOrder::Morton`]), and
/// [`TextureError::BufferSizeMismatch`] if `pixels` has the wrong length.
pub fn to_blocks(
    pixels: &[u8],
    width: u32,
    height: u32,
    order: BlockOrder,
) -> Result<Vec<u8>, TextureError> {
    validate_dimensions(width, height, order)?;

    let expected = rgba_len(width, height)?;
    if pixels.len() != expected {
        return Err(TextureError::BufferSizeMismatch {
            expected,
            actual: pixels.len(),
        });
    }

    let blocks_wide = width as usize / BLOCK_DIM;
    let blocks_high = height as usize / BLOCK_DIM;
    let row_pitch = width as usize * 4;

    let mut blocks = vec![0u8; expected];
    blocks
        .par_chunks_mut(UNCOMPRESSED_BLOCK_BYTES)
        .enumerate()
        .for_each(|(index, block)| {
            let (bx, by) = order.block_position(index, blocks_wide, blocks_high);
            for row in 0..BLOCK_DIM {
                let src = (by * BLOCK_DIM + row) * row_pitch + bx * BLOCK_ROW_BYTES;
                block[row * BLOCK_ROW_BYTES..(row + 1) * BLOCK_ROW_BYTES]
                    .copy_from_slice(&pixels[src..src + BLOCK_ROW_BYTES]);
            }
        });

    Ok(blocks)
}

/// Bytes of a row-major RGBA8 image of `width × height` pixels.
///
/// # Errors
///
/// [`TextureError::InvalidDimensions`] if the size does not fit in `usize`.
pub fn rgba_len(width: u32, height: u32) -> Result<usize, TextureError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| TextureError::InvalidDimensions {
            width,
            height,
            reason: "too large".to_string(),
        })
}

/// Checks that `width × height` can be split into blocks stored in `order`.
pub fn validate_dimensions(width: u32, height: u32, order: BlockOrder) -> Result<(), TextureError> {
    if width as usize % BLOCK_DIM != 0 || height as usize % BLOCK_DIM != 0 {
        return Err(TextureError::InvalidDimensions {
            width,
            height,
            reason: "must be multiples of 4".to_string(),
        });
    }

    if order == BlockOrder::Morton
        && width > 0
        && height > 0
        && !(width.is_power_of_two() && height.is_power_of_two())
    {
        return Err(TextureError::InvalidDimensions {
            width,
            height,
            reason: "must be powers of 2 for Morton block order".to_string(),
        });
    }

    Ok(())
}

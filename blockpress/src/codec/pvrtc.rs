//! PVRTC 4bpp codec.
//!
//! Each 4×4 block is one little-endian `u64`:
//!
//! ```text
//!  63                  48 47                  32 31                      0
//! ┌──────────────────────┬──────────────────────┬─────────────────────────┐
//! │  color B (16 bits)   │ color A (15) | mode  │ modulation, 2 bits/pixel│
//! └──────────────────────┴──────────────────────┴─────────────────────────┘
//! ```
//!
//! Color A (bits 33..47) and color B (bits 48..63) each carry an opaque flag
//! in their top bit:
//!
//! | Color | Opaque          | Translucent          |
//! |-------|-----------------|----------------------|
//! | A     | R5 G5 B4        | A3 R4 G4 B3          |
//! | B     | R5 G5 B5        | A3 R4 G4 B4          |
//!
//! A pixel is not decoded from its own block alone: the A and B colors of
//! the four nearest blocks are bilinearly interpolated (wrapping at the
//! image edges), then blended by the pixel's 2-bit modulation value. In mode
//! 0 the blend weights are `{0, 3, 5, 8} / 8`; in mode 1 they are
//! `{0, 4, 4, 8} / 8` and index 2 is fully transparent.
//!
//! Blocks are stored in Morton order, so both dimensions must be powers of
//! two.

use rayon::prelude::*;

use super::BlockEncoder;
use crate::format::{CompressionFormat, BLOCK_DIM, UNCOMPRESSED_BLOCK_BYTES};
use crate::layout::morton_index;

/// Mode 0 blend weights, in eighths.
const MODULATION_WEIGHTS: [u32; 4] = [0, 3, 5, 8];

/// Mode 1 blend weights, in eighths. Index 2 also forces alpha to 0.
const PUNCH_THROUGH_WEIGHTS: [u32; 4] = [0, 4, 4, 8];

const OPAQUE_FLAG: u32 = 0x8000;

/// Expands a `bits`-wide channel to 8 bits by bit replication.
fn expand(value: u32, bits: u32) -> u8 {
    let bits = bits as i32;
    let mut out = 0u32;
    let mut shift = 8 - bits;
    while shift > -bits {
        out |= if shift >= 0 {
            value << shift
        } else {
            value >> -shift
        };
        shift -= bits;
    }
    out as u8
}

/// Quantizes an 8-bit channel to `bits` bits.
fn quantize(value: u8, bits: u32) -> u32 {
    let max = (1u32 << bits) - 1;
    (value as u32 * max + 127) / 255
}

/// RGBA of color A from the low half of the color word.
fn decode_color_a(word: u32) -> [u8; 4] {
    if word & OPAQUE_FLAG != 0 {
        [
            expand((word >> 10) & 0x1F, 5),
            expand((word >> 5) & 0x1F, 5),
            expand((word >> 1) & 0xF, 4),
            255,
        ]
    } else {
        [
            expand((word >> 8) & 0xF, 4),
            expand((word >> 4) & 0xF, 4),
            expand((word >> 1) & 0x7, 3),
            expand((word >> 12) & 0x7, 3),
        ]
    }
}

/// RGBA of color B from the high half of the color word.
fn decode_color_b(word: u32) -> [u8; 4] {
    if word & OPAQUE_FLAG != 0 {
        [
            expand((word >> 10) & 0x1F, 5),
            expand((word >> 5) & 0x1F, 5),
            expand(word & 0x1F, 5),
            255,
        ]
    } else {
        [
            expand((word >> 8) & 0xF, 4),
            expand((word >> 4) & 0xF, 4),
            expand(word & 0xF, 4),
            expand((word >> 12) & 0x7, 3),
        ]
    }
}

fn encode_color_a(rgba: [u8; 4], opaque: bool) -> u32 {
    if opaque {
        OPAQUE_FLAG
            | quantize(rgba[0], 5) << 10
            | quantize(rgba[1], 5) << 5
            | quantize(rgba[2], 4) << 1
    } else {
        quantize(rgba[3], 3) << 12
            | quantize(rgba[0], 4) << 8
            | quantize(rgba[1], 4) << 4
            | quantize(rgba[2], 3) << 1
    }
}

fn encode_color_b(rgba: [u8; 4], opaque: bool) -> u32 {
    if opaque {
        OPAQUE_FLAG | quantize(rgba[0], 5) << 10 | quantize(rgba[1], 5) << 5 | quantize(rgba[2], 5)
    } else {
        quantize(rgba[3], 3) << 12
            | quantize(rgba[0], 4) << 8
            | quantize(rgba[1], 4) << 4
            | quantize(rgba[2], 4)
    }
}

/// Blends `a` towards `b` by `weight` eighths.
fn blend(a: [u8; 4], b: [u8; 4], weight: u32) -> [u8; 4] {
    let mut out = [0u8; 4];
    for c in 0..4 {
        out[c] = ((a[c] as u32 * (8 - weight) + b[c] as u32 * weight + 4) / 8) as u8;
    }
    out
}

fn luma(p: &[u8]) -> u32 {
    p[0] as u32 * 77 + p[1] as u32 * 150 + p[2] as u32 * 29
}

fn distance(a: [u8; 4], p: &[u8]) -> u32 {
    (0..4)
        .map(|c| {
            let d = a[c] as i32 - p[c] as i32;
            (d * d) as u32
        })
        .sum()
}

/// Encodes one 64-byte block.
///
/// The darkest and brightest pixels become colors A and B; each pixel then
/// takes the mode 0 modulation value whose blend of the two quantized
/// endpoints lies closest to it. Only the block's own pixels are consulted.
pub fn encode_block(pixels: &[u8]) -> u64 {
    let texels = || pixels.chunks_exact(4);

    let opaque = texels().all(|p| p[3] == 255);
    let (mut lo, mut hi) = ([0u8; 4], [0u8; 4]);
    let (mut lo_luma, mut hi_luma) = (u32::MAX, 0);
    for p in texels() {
        let l = luma(p);
        if l < lo_luma {
            lo_luma = l;
            lo.copy_from_slice(p);
        }
        if l >= hi_luma {
            hi_luma = l;
            hi.copy_from_slice(p);
        }
    }
    if !opaque {
        // Alpha range still has to be representable by the endpoints
        lo[3] = texels().map(|p| p[3]).min().unwrap_or(0);
        hi[3] = texels().map(|p| p[3]).max().unwrap_or(0);
    }

    let color_a = encode_color_a(lo, opaque);
    let color_b = encode_color_b(hi, opaque);
    let (a, b) = (decode_color_a(color_a), decode_color_b(color_b));
    let candidates = MODULATION_WEIGHTS.map(|w| blend(a, b, w));

    let mut modulation = 0u32;
    for (i, p) in texels().enumerate() {
        let index = (0..4u32)
            .min_by_key(|&m| distance(candidates[m as usize], p))
            .unwrap_or(0);
        modulation |= index << (i * 2);
    }

    let color = color_a | color_b << 16;
    (color as u64) << 32 | modulation as u64
}

/// PVRTC 4bpp encoder. Expects blocks in Morton order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PvrtcEncoder;

impl BlockEncoder for PvrtcEncoder {
    fn block_bytes(&self) -> usize {
        CompressionFormat::Pvrtc.block_bytes()
    }

    fn encode_blocks(&self, src: &[u8], dst: &mut [u8]) {
        for (block, out) in src
            .chunks_exact(UNCOMPRESSED_BLOCK_BYTES)
            .zip(dst.chunks_exact_mut(8))
        {
            out.copy_from_slice(&encode_block(block).to_le_bytes());
        }
    }

    fn name(&self) -> &str {
        "PVRTC"
    }
}

/// Unpacked block.
#[derive(Debug, Clone, Copy)]
struct DecodedBlock {
    a: [u8; 4],
    b: [u8; 4],
    modulation: u32,
    punch_through: bool,
}

impl DecodedBlock {
    fn unpack(word: u64) -> Self {
        let color = (word >> 32) as u32;
        Self {
            a: decode_color_a(color & 0xFFFF),
            b: decode_color_b(color >> 16),
            modulation: word as u32,
            punch_through: color & 1 != 0,
        }
    }
}

/// Decodes Morton-ordered PVRTC blocks into row-major RGBA8.
///
/// Sizes and power-of-two dimensions are checked by the caller.
pub(super) fn decode_image(data: &[u8], width: u32, height: u32, out: &mut [u8]) {
    let blocks_wide = width as usize / BLOCK_DIM;
    let blocks_high = height as usize / BLOCK_DIM;
    if blocks_wide == 0 || blocks_high == 0 {
        return;
    }

    // Unpack once into a row-major grid
    let grid: Vec<DecodedBlock> = (0..blocks_wide * blocks_high)
        .into_par_iter()
        .map(|i| {
            let (bx, by) = (i % blocks_wide, i / blocks_wide);
            let offset = morton_index(bx, by, blocks_wide, blocks_high) * 8;
            let mut word = [0u8; 8];
            word.copy_from_slice(&data[offset..offset + 8]);
            DecodedBlock::unpack(u64::from_le_bytes(word))
        })
        .collect();
    let block_at = |bx: isize, by: isize| {
        let x = bx.rem_euclid(blocks_wide as isize) as usize;
        let y = by.rem_euclid(blocks_high as isize) as usize;
        &grid[y * blocks_wide + x]
    };

    let pitch = width as usize * 4;
    out.par_chunks_mut(pitch)
        .enumerate()
        .for_each(|(py, row)| {
            // Block colors sit at the block centers, 2 pixels in
            let sy = py as isize - 2;
            let (by0, fy) = (sy.div_euclid(4), sy.rem_euclid(4) as u32);

            for (px, pixel) in row.chunks_exact_mut(4).enumerate() {
                let sx = px as isize - 2;
                let (bx0, fx) = (sx.div_euclid(4), sx.rem_euclid(4) as u32);

                let corners = [
                    (block_at(bx0, by0), (4 - fx) * (4 - fy)),
                    (block_at(bx0 + 1, by0), fx * (4 - fy)),
                    (block_at(bx0, by0 + 1), (4 - fx) * fy),
                    (block_at(bx0 + 1, by0 + 1), fx * fy),
                ];
                let mut a = [0u8; 4];
                let mut b = [0u8; 4];
                for c in 0..4 {
                    let (sa, sb) = corners.iter().fold((8u32, 8u32), |(sa, sb), (blk, w)| {
                        (sa + blk.a[c] as u32 * w, sb + blk.b[c] as u32 * w)
                    });
                    a[c] = (sa / 16) as u8;
                    b[c] = (sb / 16) as u8;
                }

                let own = block_at((px / BLOCK_DIM) as isize, (py / BLOCK_DIM) as isize);
                let shift = ((py % BLOCK_DIM) * BLOCK_DIM + px % BLOCK_DIM) * 2;
                let index = ((own.modulation >> shift) & 0x3) as usize;

                let rgba = if own.punch_through {
                    let mut rgba = blend(a, b, PUNCH_THROUGH_WEIGHTS[index]);
                    if index == 2 {
                        rgba[3] = 0;
                    }
                    rgba
                } else {
                    blend(a, b, MODULATION_WEIGHTS[index])
                };
                pixel.copy_from_slice(&rgba);
            }
        });
}

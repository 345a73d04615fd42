//! KTX 1.1 reading and writing.
//!
//! Only what a single compressed texture needs is supported: one mipmap
//! level, one face, no array layers, little-endian files.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ identifier (12 bytes)        │  «KTX 11»\r\n\x1A\n
//! │ 13 × u32 header fields       │  endianness .. bytesOfKeyValueData
//! ├──────────────────────────────┤
//! │ key/value data (skipped)     │
//! ├──────────────────────────────┤
//! │ imageSize: u32               │
//! │ compressed blocks            │
//! └──────────────────────────────┘
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use super::error::{ContainerError, ContainerResult};
use crate::compressed::CompressedImage;
use crate::format::CompressionFormat;

/// File identifier of every KTX 1.x file.
pub const KTX_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

/// Endianness marker as written by a little-endian producer.
const ENDIANNESS_LE: u32 = 0x0403_0201;

/// Size of the identifier plus the 13 header words.
pub const KTX_HEADER_SIZE: usize = 64;

/// `GL_RGBA`, the base internal format of every supported format.
const GL_RGBA: u32 = 0x1908;

/// Parsed KTX header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KtxHeader {
    pub gl_type: u32,
    pub gl_type_size: u32,
    pub gl_format: u32,
    pub gl_internal_format: u32,
    pub gl_base_internal_format: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub pixel_depth: u32,
    pub array_elements: u32,
    pub faces: u32,
    pub mipmap_levels: u32,
    pub key_value_bytes: u32,
}

impl KtxHeader {
    /// Header for a single-level compressed image.
    pub fn for_image(image: &CompressedImage) -> Self {
        Self {
            gl_type: 0,
            gl_type_size: 1,
            gl_format: 0,
            gl_internal_format: image.format().gl_internal_format(),
            gl_base_internal_format: GL_RGBA,
            pixel_width: image.width(),
            pixel_height: image.height(),
            pixel_depth: 0,
            array_elements: 0,
            faces: 1,
            mipmap_levels: 1,
            key_value_bytes: 0,
        }
    }

    /// Parse and validate the fixed-size header.
    pub fn parse(bytes: &[u8]) -> ContainerResult<Self> {
        if bytes.len() < KTX_HEADER_SIZE {
            return Err(ContainerError::InvalidHeader(format!(
                "KTX header needs {} bytes, got {}",
                KTX_HEADER_SIZE,
                bytes.len()
            )));
        }
        if bytes[..12] != KTX_IDENTIFIER {
            return Err(ContainerError::InvalidHeader(
                "missing KTX 1.1 identifier".to_string(),
            ));
        }

        let word = |i: usize| read_u32(bytes, 12 + i * 4);
        match word(0) {
            Some(ENDIANNESS_LE) => {}
            Some(0x0102_0304) => {
                return Err(ContainerError::InvalidHeader(
                    "big-endian KTX files are not supported".to_string(),
                ))
            }
            other => {
                return Err(ContainerError::InvalidHeader(format!(
                    "bad endianness marker {:?}",
                    other
                )))
            }
        }

        let field = |i: usize| word(i).unwrap_or(0);
        let header = Self {
            gl_type: field(1),
            gl_type_size: field(2),
            gl_format: field(3),
            gl_internal_format: field(4),
            gl_base_internal_format: field(5),
            pixel_width: field(6),
            pixel_height: field(7),
            pixel_depth: field(8),
            array_elements: field(9),
            faces: field(10),
            mipmap_levels: field(11),
            key_value_bytes: field(12),
        };

        if header.gl_type != 0 || header.gl_format != 0 {
            return Err(ContainerError::UnsupportedFileFormat(
                "uncompressed KTX textures are not supported".to_string(),
            ));
        }
        if header.pixel_depth > 1 || header.array_elements > 0 || header.faces > 1 {
            return Err(ContainerError::UnsupportedFileFormat(
                "only single-face 2D KTX textures are supported".to_string(),
            ));
        }

        Ok(header)
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&KTX_IDENTIFIER)?;
        for value in [
            ENDIANNESS_LE,
            self.gl_type,
            self.gl_type_size,
            self.gl_format,
            self.gl_internal_format,
            self.gl_base_internal_format,
            self.pixel_width,
            self.pixel_height,
            self.pixel_depth,
            self.array_elements,
            self.faces,
            self.mipmap_levels,
            self.key_value_bytes,
        ] {
            writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    let mut word = [0u8; 4];
    word.copy_from_slice(slice);
    Some(u32::from_le_bytes(word))
}

/// Serialize `image` as a KTX file.
pub fn write_ktx<W: Write>(writer: &mut W, image: &CompressedImage) -> std::io::Result<()> {
    KtxHeader::for_image(image).write_to(writer)?;

    let data = image.compressed_data();
    writer.write_all(&(data.len() as u32).to_le_bytes())?;
    writer.write_all(data)?;

    // Mip levels are 4-byte aligned
    let padding = (4 - data.len() % 4) % 4;
    writer.write_all(&[0u8; 3][..padding])?;
    Ok(())
}

/// Parse a KTX file held in memory.
///
/// Only the first mipmap level is read.
///
/// # Errors
///
/// - [`ContainerError::InvalidHeader`] for a malformed or truncated file
/// - [`ContainerError::UnsupportedFileFormat`] for uncompressed, cube-map or
///   array textures
/// - [`ContainerError::Texture`] for an unknown `glInternalFormat` or data
///   that does not fit the declared dimensions
pub fn read_ktx(bytes: &[u8]) -> ContainerResult<CompressedImage> {
    let header = KtxHeader::parse(bytes)?;
    let format = CompressionFormat::from_gl_internal_format(header.gl_internal_format)?;

    if header.mipmap_levels > 1 {
        debug!(
            levels = header.mipmap_levels,
            "KTX file has extra mipmap levels; reading the first only"
        );
    }

    let image_size_offset = KTX_HEADER_SIZE
        .checked_add(header.key_value_bytes as usize)
        .ok_or_else(|| ContainerError::InvalidHeader("key/value data overflows".to_string()))?;
    let image_size = read_u32(bytes, image_size_offset).ok_or_else(|| {
        ContainerError::InvalidHeader("file ends before the first mipmap level".to_string())
    })? as usize;

    let data_start = image_size_offset + 4;
    let data = bytes
        .get(data_start..data_start.saturating_add(image_size))
        .ok_or_else(|| {
            ContainerError::InvalidHeader(format!(
                "mipmap level declares {} bytes but the file is {} bytes long",
                image_size,
                bytes.len()
            ))
        })?;

    Ok(CompressedImage::from_compressed(
        header.pixel_width,
        header.pixel_height,
        format,
        data,
    )?)
}

/// Write `image` to a KTX file at `path`.
pub fn save_ktx(path: &Path, image: &CompressedImage) -> ContainerResult<()> {
    let mut bytes = Vec::with_capacity(KTX_HEADER_SIZE + 4 + image.compressed_data().len() + 3);
    write_ktx(&mut bytes, image).map_err(|e| ContainerError::io(path, e))?;
    fs::write(path, bytes).map_err(|e| ContainerError::io(path, e))
}

/// Read a KTX file from `path`.
pub fn load_ktx(path: &Path) -> ContainerResult<CompressedImage> {
    let bytes = fs::read(path).map_err(|e| ContainerError::io(path, e))?;
    read_ktx(&bytes)
}

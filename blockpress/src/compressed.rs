//! Owned compressed texture.
//!
//! A [`CompressedImage`] is created either from bytes that are already
//! compressed (for example read from a KTX file) or by running the
//! block-parallel [`Scheduler`] over an RGBA image:
//!
//! ```text
//! RgbaImage ──to_blocks──► block-linear buffer ──Scheduler──► CompressedImage
//!                                                                  │
//! RgbaImage ◄──────────────── codec::decode ◄──────── decompress ──┘
//! ```
//!
//! # Example
//!
//! ```
//! use blockpress::{CompressOptions, CompressedImage, CompressionFormat};
//! use image::{Rgba, RgbaImage};
//!
//! let source = RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 255]));
//! let image = CompressedImage::compress(&source, CompressionFormat::Dxt1, &CompressOptions::default())
//!     .unwrap();
//!
//! assert_eq!(image.compressed_data().len(), 16 * 16 * 4 / 8);
//!
//! let pixels = image.compute_pixels().unwrap();
//! assert_eq!(pixels.dimensions(), (16, 16));
//! ```

use std::fmt;

use image::RgbaImage;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::codec::{self, EncodeOptions};
use crate::error::TextureError;
use crate::format::{compressed_size, CompressionFormat, UNCOMPRESSED_BLOCK_BYTES};
use crate::layout::{rgba_len, to_blocks, validate_dimensions};
use crate::scheduler::{RunReport, Scheduler, SchedulerConfig};

/// Settings for [`CompressedImage::compress`].
#[derive(Debug, Clone, Default)]
pub struct CompressOptions {
    /// Worker pool settings.
    pub scheduler: SchedulerConfig,
    /// Encoder tuning.
    pub encode: EncodeOptions,
    /// Optional token to abort the run between pulls.
    pub cancel: Option<CancellationToken>,
}

impl CompressOptions {
    /// Use the given scheduler settings.
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Use the given encoder settings.
    pub fn with_encode(mut self, encode: EncodeOptions) -> Self {
        self.encode = encode;
        self
    }

    /// Abort compression when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// A compressed texture that owns its block data.
///
/// The data buffer is allocated once, holds exactly
/// [`compressed_size`]`(width * height * 4, format)` bytes, and is never
/// resized. Cloning copies the buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct CompressedImage {
    width: u32,
    height: u32,
    format: CompressionFormat,
    data: Box<[u8]>,
}

impl CompressedImage {
    /// Wrap already-compressed block data.
    ///
    /// Copies exactly the number of bytes the format requires; any extra
    /// bytes in `data` are ignored.
    ///
    /// # Errors
    ///
    /// - [`TextureError::InvalidDimensions`] if the dimensions are not block
    ///   aligned for `format` or the image is too large to address
    /// - [`TextureError::InsufficientData`] if `data` is too short
    pub fn from_compressed(
        width: u32,
        height: u32,
        format: CompressionFormat,
        data: &[u8],
    ) -> Result<Self, TextureError> {
        validate_dimensions(width, height, format.block_order())?;
        let expected = compressed_size(rgba_len(width, height)?, format)?;

        if data.len() < expected {
            return Err(TextureError::InsufficientData {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            format,
            data: data[..expected].into(),
        })
    }

    /// Compress an RGBA image with the built-in encoder for `format`.
    ///
    /// # Errors
    ///
    /// [`TextureError::InvalidDimensions`] if the image cannot be split into
    /// blocks for `format`, or [`TextureError::Compression`] if the scheduler
    /// run fails.
    pub fn compress(
        image: &RgbaImage,
        format: CompressionFormat,
        options: &CompressOptions,
    ) -> Result<Self, TextureError> {
        Self::compress_with_report(image, format, options).map(|(image, _)| image)
    }

    /// Same as [`compress`](Self::compress), also returning the scheduler's
    /// run report.
    pub fn compress_with_report(
        image: &RgbaImage,
        format: CompressionFormat,
        options: &CompressOptions,
    ) -> Result<(Self, RunReport), TextureError> {
        let (width, height) = image.dimensions();
        let blocks = to_blocks(image.as_raw(), width, height, format.block_order())?;
        let size = compressed_size(blocks.len(), format)?;

        let encoder = codec::encoder_for(format, &options.encode);
        let mut data = vec![0u8; size].into_boxed_slice();

        let mut builder = Scheduler::builder(options.scheduler.clone())
            .input(&blocks)
            .encoder(&*encoder)
            .output(&mut data);
        if let Some(token) = &options.cancel {
            builder = builder.cancellation(token.clone());
        }
        let report = builder.build()?.run()?;

        debug!(
            width,
            height,
            format = %format,
            compressed_bytes = size,
            "Image compressed"
        );

        Ok((
            Self {
                width,
                height,
                format,
                data,
            },
            report,
        ))
    }

    /// Decode into `out` as row-major RGBA8.
    ///
    /// # Errors
    ///
    /// [`TextureError::BufferSizeMismatch`] if `out` is not exactly
    /// [`uncompressed_size`](Self::uncompressed_size) bytes; `out` is left
    /// untouched in that case.
    pub fn decompress(&self, out: &mut [u8]) -> Result<(), TextureError> {
        let expected = self.uncompressed_size();
        if out.len() != expected {
            return Err(TextureError::BufferSizeMismatch {
                expected,
                actual: out.len(),
            });
        }

        codec::decode(self.format, &self.data, self.width, self.height, out)
    }

    /// Decode into a freshly allocated image.
    pub fn compute_pixels(&self) -> Result<RgbaImage, TextureError> {
        let mut pixels = vec![0u8; self.uncompressed_size()];
        self.decompress(&mut pixels)?;

        let actual = pixels.len();
        RgbaImage::from_raw(self.width, self.height, pixels).ok_or(
            TextureError::BufferSizeMismatch {
                expected: self.uncompressed_size(),
                actual,
            },
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> CompressionFormat {
        self.format
    }

    /// Compressed blocks in the format's storage order.
    pub fn compressed_data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of the decoded RGBA8 image.
    pub fn uncompressed_size(&self) -> usize {
        // data holds exactly one block per 4×4 tile
        self.data.len() / self.format.block_bytes() * UNCOMPRESSED_BLOCK_BYTES
    }
}

impl fmt::Debug for CompressedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("data_len", &self.data.len())
            .finish()
    }
}

//! blockpress - block-parallel GPU texture compression
//!
//! This library compresses RGBA images into the fixed-rate block formats
//! GPUs sample directly (DXT1, DXT5, BPTC and PVRTC 4bpp) and decodes them
//! back. Compression runs on a bounded pool of worker threads that pull
//! contiguous block ranges from a shared cursor.
//!
//! # Modules
//!
//! - [`scheduler`]: the block-parallel work scheduler
//! - [`compressed`]: the owned [`CompressedImage`] value
//! - [`codec`]: per-format block encoders and decoders
//! - [`layout`]: row-major ⇄ block-linear conversion and Morton order
//! - [`container`]: PNG/TGA input, PNG output, KTX files
//! - [`config`]: INI configuration file
//! - [`logging`]: tracing subscriber setup
//!
//! # Example
//!
//! ```
//! use blockpress::{CompressOptions, CompressedImage, CompressionFormat};
//! use blockpress::scheduler::SchedulerConfig;
//! use image::{Rgba, RgbaImage};
//!
//! let source = RgbaImage::from_pixel(64, 64, Rgba([40, 80, 120, 255]));
//! let options = CompressOptions::default()
//!     .with_scheduler(SchedulerConfig::new(4).with_job_size(8));
//!
//! let image = CompressedImage::compress(&source, CompressionFormat::Bptc, &options).unwrap();
//! assert_eq!(image.compressed_data().len(), 64 * 64 * 4 / 4);
//! ```

pub mod codec;
pub mod compressed;
pub mod config;
pub mod container;
pub mod error;
pub mod format;
pub mod layout;
pub mod logging;
pub mod scheduler;

pub use compressed::{CompressOptions, CompressedImage};
pub use error::TextureError;
pub use format::{compressed_size, CompressionFormat};

//! Common types and utilities shared across CLI commands.

use std::path::Path;

use blockpress::codec::{Bc7Quality, EncodeOptions};
use blockpress::config::ConfigFile;
use blockpress::container::ImageFileFormat;
use blockpress::scheduler::SchedulerConfig;
use blockpress::CompressionFormat;
use clap::ValueEnum;

use crate::error::CliError;

/// Compression format selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FormatArg {
    /// DXT1/BC1 (8 bytes per block, best for opaque textures)
    Dxt1,
    /// DXT5/BC3 (16 bytes per block, with full alpha channel)
    Dxt5,
    /// BPTC/BC7 (16 bytes per block, highest quality)
    Bptc,
    /// PVRTC 4bpp (8 bytes per block, power-of-two square images)
    Pvrtc,
}

impl From<FormatArg> for CompressionFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Dxt1 => CompressionFormat::Dxt1,
            FormatArg::Dxt5 => CompressionFormat::Dxt5,
            FormatArg::Bptc => CompressionFormat::Bptc,
            FormatArg::Pvrtc => CompressionFormat::Pvrtc,
        }
    }
}

/// BPTC encoder preset for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum QualityArg {
    Ultrafast,
    Veryfast,
    Fast,
    Basic,
    Slow,
}

impl From<QualityArg> for Bc7Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Ultrafast => Bc7Quality::UltraFast,
            QualityArg::Veryfast => Bc7Quality::VeryFast,
            QualityArg::Fast => Bc7Quality::Fast,
            QualityArg::Basic => Bc7Quality::Basic,
            QualityArg::Slow => Bc7Quality::Slow,
        }
    }
}

/// Resolve the compression format: CLI first, then config.
pub fn resolve_format(cli_format: Option<FormatArg>, config: &ConfigFile) -> CompressionFormat {
    cli_format
        .map(CompressionFormat::from)
        .unwrap_or(config.compression.format)
}

/// Resolve scheduler settings: CLI values override the config file.
pub fn resolve_scheduler(
    cli_threads: Option<usize>,
    cli_job_size: Option<usize>,
    config: &ConfigFile,
) -> Result<SchedulerConfig, CliError> {
    let mut scheduler = config.scheduler_config();
    if let Some(threads) = cli_threads {
        if threads == 0 {
            return Err(CliError::Config("--threads must be at least 1".to_string()));
        }
        scheduler.threads = threads;
    }
    if let Some(job_size) = cli_job_size {
        if job_size == 0 {
            return Err(CliError::Config("--job-size must be at least 1".to_string()));
        }
        scheduler.job_size = job_size;
    }
    Ok(scheduler)
}

/// Resolve encoder settings: CLI values override the config file.
pub fn resolve_encode(cli_quality: Option<QualityArg>, config: &ConfigFile) -> EncodeOptions {
    let options = config.encode_options();
    match cli_quality {
        Some(quality) => options.with_bc7_quality(quality.into()),
        None => options,
    }
}

/// Fail unless `path` has the expected extension.
pub fn require_file_format(path: &Path, expected: ImageFileFormat) -> Result<(), CliError> {
    let actual = ImageFileFormat::from_path(path)?;
    if actual != expected {
        return Err(CliError::Config(format!(
            "{} must be a .{} file",
            path.display(),
            expected.extension()
        )));
    }
    Ok(())
}

/// Format a byte count as a human-readable size.
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

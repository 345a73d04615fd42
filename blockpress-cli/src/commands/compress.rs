//! `compress` command: PNG/TGA to KTX.

use std::path::PathBuf;

use blockpress::config::ConfigFile;
use blockpress::container::{self, ImageFileFormat};
use blockpress::scheduler::RunReport;
use blockpress::{CompressOptions, CompressedImage};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::common::{
    format_size, require_file_format, resolve_encode, resolve_format, resolve_scheduler,
    FormatArg, QualityArg,
};
use crate::error::CliError;

/// Arguments for the compress command.
#[derive(Debug)]
pub struct CompressArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: Option<FormatArg>,
    pub threads: Option<usize>,
    pub job_size: Option<usize>,
    pub bc7_quality: Option<QualityArg>,
    pub json: bool,
}

/// Run the compress command.
pub fn run(args: CompressArgs) -> Result<(), CliError> {
    let config = ConfigFile::load()?;

    // Ctrl-C stops handing out blocks; workers finish their current job.
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, stopping workers...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let (image, report) = compress_file(&args, &config, Some(cancel))?;

    if args.json {
        let summary = json!({
            "input": args.input.display().to_string(),
            "output": args.output.display().to_string(),
            "width": image.width(),
            "height": image.height(),
            "format": image.format(),
            "compressed_bytes": image.compressed_data().len(),
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&args, &image, &report);
    }

    Ok(())
}

/// Compress `args.input` into `args.output` using `config` for unset options.
fn compress_file(
    args: &CompressArgs,
    config: &ConfigFile,
    cancel: Option<CancellationToken>,
) -> Result<(CompressedImage, RunReport), CliError> {
    require_file_format(&args.output, ImageFileFormat::Ktx)?;

    let format = resolve_format(args.format, config);
    let mut options = CompressOptions::default()
        .with_scheduler(resolve_scheduler(args.threads, args.job_size, config)?)
        .with_encode(resolve_encode(args.bc7_quality, config));
    if let Some(token) = cancel {
        options = options.with_cancellation(token);
    }

    let source = container::load_rgba(&args.input)?;
    let (image, report) = CompressedImage::compress_with_report(&source, format, &options)?;
    container::save_ktx(&args.output, &image)?;

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        format = %format,
        "Wrote compressed texture"
    );
    Ok((image, report))
}

fn print_summary(args: &CompressArgs, image: &CompressedImage, report: &RunReport) {
    let compressed = image.compressed_data().len();
    let uncompressed = image.uncompressed_size();

    println!("Compressed {}", args.input.display());
    println!();
    println!("  Output:      {}", args.output.display());
    println!("  Format:      {}", image.format());
    println!("  Dimensions:  {}x{}", image.width(), image.height());
    println!(
        "  Size:        {} (from {}, {:.1}:1)",
        format_size(compressed),
        format_size(uncompressed),
        uncompressed as f64 / compressed.max(1) as f64
    );
    println!(
        "  Workers:     {} (job size {} blocks)",
        report.workers_spawned, report.config.job_size
    );
    println!(
        "  Blocks:      {} in {} pulls, {:.2?} ({:.0} blocks/s)",
        report.total_blocks,
        report.pull_count(),
        report.elapsed,
        report.blocks_per_second()
    );
    if report.config.threads_clamped() {
        println!(
            "  Note:        {} threads requested, clamped to {}",
            report.config.requested_threads, report.config.threads
        );
    }
}

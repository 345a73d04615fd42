//! `decompress` command: KTX to PNG.

use std::path::Path;

use blockpress::container::{self, ImageFileFormat};
use tracing::info;

use super::common::require_file_format;
use crate::error::CliError;

/// Decode `input` and write the pixels to `output`.
pub fn run(input: &Path, output: &Path) -> Result<(), CliError> {
    require_file_format(output, ImageFileFormat::Png)?;

    let image = container::load_ktx(input)?;
    let pixels = image.compute_pixels()?;
    container::save_png(output, &pixels)?;

    info!(input = %input.display(), output = %output.display(), "Wrote decoded image");
    println!(
        "Decoded {} ({} {}x{}) to {}",
        input.display(),
        image.format(),
        image.width(),
        image.height(),
        output.display()
    );
    Ok(())
}

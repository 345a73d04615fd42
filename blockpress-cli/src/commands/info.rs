//! `info` command: describe a KTX texture.

use std::path::Path;

use blockpress::container;
use blockpress::CompressedImage;
use serde_json::json;

use super::common::format_size;
use crate::error::CliError;

/// Print the header details of `input`.
pub fn run(input: &Path, json: bool) -> Result<(), CliError> {
    let image = container::load_ktx(input)?;

    if json {
        let summary = json!({
            "path": input.display().to_string(),
            "format": image.format(),
            "width": image.width(),
            "height": image.height(),
            "block_bytes": image.format().block_bytes(),
            "compressed_bytes": image.compressed_data().len(),
            "uncompressed_bytes": image.uncompressed_size(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_info(input, &image);
    }
    Ok(())
}

fn print_info(input: &Path, image: &CompressedImage) {
    let format = image.format();
    let blocks = image.compressed_data().len() / format.block_bytes();

    println!("{}", input.display());
    println!();
    println!(
        "  Format:        {} (glInternalFormat 0x{:04X})",
        format,
        format.gl_internal_format()
    );
    println!("  Dimensions:    {}x{}", image.width(), image.height());
    println!("  Blocks:        {} x {} bytes", blocks, format.block_bytes());
    println!("  Data size:     {}", format_size(image.compressed_data().len()));
    println!("  Decoded size:  {}", format_size(image.uncompressed_size()));
}

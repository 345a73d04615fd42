//! Integration tests for `CompressedImage` and the KTX/PNG containers.
//!
//! Run with: `cargo test --test compressed_image_integration`

use image::{Rgba, RgbaImage};

use blockpress::container::{load_ktx, load_rgba, save_ktx, save_png};
use blockpress::scheduler::SchedulerConfig;
use blockpress::{CompressOptions, CompressedImage, CompressionFormat, TextureError};

// ============================================================================
// Helper Functions
// ============================================================================

fn options() -> CompressOptions {
    CompressOptions::default().with_scheduler(SchedulerConfig::new(4).with_job_size(3))
}

/// Largest per-channel difference between two images.
fn max_error(a: &RgbaImage, b: &RgbaImage) -> u8 {
    a.pixels()
        .zip(b.pixels())
        .flat_map(|(p, q)| p.0.into_iter().zip(q.0).map(|(x, y)| x.abs_diff(y)))
        .max()
        .unwrap_or(0)
}

/// Quantization tolerance for a solid color.
fn tolerance(format: CompressionFormat) -> u8 {
    match format {
        CompressionFormat::Dxt1 | CompressionFormat::Dxt5 => 8,
        CompressionFormat::Bptc => 4,
        CompressionFormat::Pvrtc => 12,
    }
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_solid_color_roundtrip_every_format() {
    let color = [96u8, 160, 48, 255];
    let source = RgbaImage::from_pixel(32, 32, Rgba(color));

    for format in CompressionFormat::ALL {
        let image = CompressedImage::compress(&source, format, &options()).unwrap();
        let decoded = image.compute_pixels().unwrap();

        let error = max_error(&source, &decoded);
        assert!(
            error <= tolerance(format),
            "{} error {} exceeds {}",
            format,
            error,
            tolerance(format)
        );
    }
}

#[test]
fn test_two_tone_image_keeps_regions() {
    // Left half dark, right half bright; block aligned so DXT keeps them apart
    let source = RgbaImage::from_fn(16, 8, |x, _| {
        if x < 8 {
            Rgba([20, 20, 20, 255])
        } else {
            Rgba([230, 230, 230, 255])
        }
    });

    for format in [CompressionFormat::Dxt1, CompressionFormat::Dxt5, CompressionFormat::Bptc] {
        let decoded = CompressedImage::compress(&source, format, &options())
            .unwrap()
            .compute_pixels()
            .unwrap();
        assert!(decoded.get_pixel(1, 1).0[0] < 40, "{}", format);
        assert!(decoded.get_pixel(14, 6).0[0] > 210, "{}", format);
    }
}

#[test]
fn test_from_compressed_matches_compress() {
    let source = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 4]));
    let compressed = CompressedImage::compress(&source, CompressionFormat::Dxt5, &options()).unwrap();

    let rebuilt = CompressedImage::from_compressed(
        8,
        8,
        CompressionFormat::Dxt5,
        compressed.compressed_data(),
    )
    .unwrap();
    assert_eq!(rebuilt, compressed);
}

#[test]
fn test_unknown_format_name_rejected() {
    let err = "etc2".parse::<CompressionFormat>().unwrap_err();
    assert!(matches!(err, TextureError::UnsupportedFormat(_)));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_png_to_ktx_to_png() {
    let dir = tempfile::tempdir().unwrap();
    let png_in = dir.path().join("source.png");
    let ktx = dir.path().join("texture.ktx");
    let png_out = dir.path().join("decoded.png");

    let source = RgbaImage::from_pixel(16, 16, Rgba([200, 40, 90, 255]));
    save_png(&png_in, &source).unwrap();

    let loaded = load_rgba(&png_in).unwrap();
    let image = CompressedImage::compress(&loaded, CompressionFormat::Bptc, &options()).unwrap();
    save_ktx(&ktx, &image).unwrap();

    let reloaded = load_ktx(&ktx).unwrap();
    assert_eq!(reloaded, image);

    save_png(&png_out, &reloaded.compute_pixels().unwrap()).unwrap();
    let decoded = load_rgba(&png_out).unwrap();
    assert!(max_error(&source, &decoded) <= tolerance(CompressionFormat::Bptc));
}

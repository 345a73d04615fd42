//! Image file containers.
//!
//! Source pictures (PNG, TGA) are read through the `image` crate; compressed
//! textures are stored in KTX 1.1 files. PVR and ASTC files are recognised
//! by extension so callers get a precise error instead of a decode failure.
//!
//! | Extension | Read            | Write           |
//! |-----------|-----------------|-----------------|
//! | `.png`    | [`load_rgba`]   | [`save_png`]    |
//! | `.tga`    | [`load_rgba`]   | -               |
//! | `.ktx`    | [`load_ktx`]    | [`save_ktx`]    |
//! | `.pvr`    | -               | -               |
//! | `.astc`   | -               | -               |

mod error;
pub mod ktx;

pub use error::{ContainerError, ContainerResult};
pub use ktx::{load_ktx, read_ktx, save_ktx, write_ktx, KtxHeader};

use std::fmt;
use std::path::Path;

use image::RgbaImage;
use tracing::debug;

/// File types known by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFileFormat {
    Png,
    Tga,
    Ktx,
    Pvr,
    Astc,
}

impl ImageFileFormat {
    /// Detect the file type from the extension of `path`, ignoring case.
    ///
    /// # Example
    ///
    /// ```
    /// use blockpress::container::ImageFileFormat;
    /// use std::path::Path;
    ///
    /// assert_eq!(
    ///     ImageFileFormat::from_path(Path::new("grass.PNG")).unwrap(),
    ///     ImageFileFormat::Png
    /// );
    /// assert!(ImageFileFormat::from_path(Path::new("notes.txt")).is_err());
    /// ```
    pub fn from_path(path: &Path) -> ContainerResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| {
                ContainerError::UnsupportedFileFormat(format!(
                    "{} has no file extension",
                    path.display()
                ))
            })?;

        match ext.as_str() {
            "png" => Ok(ImageFileFormat::Png),
            "tga" => Ok(ImageFileFormat::Tga),
            "ktx" => Ok(ImageFileFormat::Ktx),
            "pvr" => Ok(ImageFileFormat::Pvr),
            "astc" => Ok(ImageFileFormat::Astc),
            other => Err(ContainerError::UnsupportedFileFormat(format!(
                "unknown extension '.{}'",
                other
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFileFormat::Png => "png",
            ImageFileFormat::Tga => "tga",
            ImageFileFormat::Ktx => "ktx",
            ImageFileFormat::Pvr => "pvr",
            ImageFileFormat::Astc => "astc",
        }
    }

    /// Whether files of this type hold uncompressed pictures.
    pub fn is_uncompressed(&self) -> bool {
        matches!(self, ImageFileFormat::Png | ImageFileFormat::Tga)
    }
}

impl fmt::Display for ImageFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension().to_ascii_uppercase())
    }
}

/// Load a PNG or TGA file as RGBA8.
pub fn load_rgba(path: &Path) -> ContainerResult<RgbaImage> {
    let format = ImageFileFormat::from_path(path)?;
    if !format.is_uncompressed() {
        return Err(ContainerError::UnsupportedFileFormat(format!(
            "{} files cannot be loaded as pixel images",
            format
        )));
    }

    let image = image::open(path).map_err(|source| match source {
        image::ImageError::IoError(e) => ContainerError::io(path, e),
        source => ContainerError::Image {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let rgba = image.to_rgba8();

    debug!(
        path = %path.display(),
        width = rgba.width(),
        height = rgba.height(),
        "Loaded source image"
    );
    Ok(rgba)
}

/// Save RGBA8 pixels as a PNG file.
pub fn save_png(path: &Path, image: &RgbaImage) -> ContainerResult<()> {
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| match source {
            image::ImageError::IoError(e) => ContainerError::io(path, e),
            source => ContainerError::Image {
                path: path.to_path_buf(),
                source,
            },
        })
}

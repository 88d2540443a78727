//! Image optimization for the build directory.
//!
//! PNG files are re-encoded with the best compression, JPEG files at the
//! configured quality. Whichever of the re-encoded and original bytes is
//! smaller is written. GIF and SVG files are copied as they are.

use glob::{glob_with, MatchOptions, Pattern};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageEncoder;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::BuildContext;

/// Extensions picked up from the image directory (case-insensitive).
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "svg"];

/// Error while optimizing images
#[derive(Debug, Error)]
pub enum ImageError {
    /// The search pattern built from the image directory is invalid
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        /// Pattern
        pattern: String,
        /// Underlying error
        source: glob::PatternError,
    },
    /// Reading or writing an image failed
    #[error("{}: {source}", .path.display())]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// One image written to the build directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifiedImage {
    /// Source file
    pub source: PathBuf,
    /// Destination file
    pub output: PathBuf,
    /// Size of the source in bytes
    pub original_size: usize,
    /// Size written in bytes
    pub written_size: usize,
}

/// Whether `path` has an image extension.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Find every image file under `img_dir`, sorted.
pub fn discover_images(img_dir: &Path) -> Result<Vec<PathBuf>, ImageError> {
    let options = MatchOptions { case_sensitive: false, ..MatchOptions::default() };
    let base = Pattern::escape(&img_dir.to_string_lossy());

    let mut files = Vec::new();
    for ext in IMAGE_EXTENSIONS {
        let pattern = format!("{}/**/*.{}", base, ext);
        let paths = glob_with(&pattern, options)
            .map_err(|source| ImageError::Pattern { pattern: pattern.clone(), source })?;
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!("error reading path: {}", e),
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Re-encode `bytes` according to the file extension, if it can be shrunk.
///
/// Returns `None` for formats that are copied or when decoding fails.
pub fn optimize(bytes: &[u8], ext: &str, jpeg_quality: u8) -> Option<Vec<u8>> {
    let ext = ext.to_ascii_lowercase();
    if !matches!(ext.as_str(), "png" | "jpg" | "jpeg") {
        return None;
    }

    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            tracing::warn!(error = %e, "cannot decode image, copying original");
            return None;
        }
    };

    let mut out = Vec::new();
    let encoded = if ext == "png" {
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive).write_image(
            img.as_bytes(),
            img.width(),
            img.height(),
            img.color(),
        )
    } else {
        JpegEncoder::new_with_quality(&mut out, jpeg_quality).encode_image(&img.to_rgb8())
    };

    match encoded {
        Ok(()) => Some(out),
        Err(e) => {
            tracing::warn!(error = %e, "cannot re-encode image, copying original");
            None
        }
    }
}

/// Pick the bytes to write: the re-encoded image only when it is smaller.
fn smaller<'a>(original: &'a [u8], optimized: Option<&'a [u8]>) -> &'a [u8] {
    match optimized {
        Some(candidate) if candidate.len() < original.len() => candidate,
        _ => original,
    }
}

/// Optimize every image under the image directory into `<build>/img/`.
///
/// Images are processed in parallel. A missing image directory yields an
/// empty result.
pub fn minify_images(ctx: &BuildContext) -> Result<Vec<MinifiedImage>, ImageError> {
    let img_dir = ctx.img_dir();
    if !img_dir.is_dir() {
        return Ok(Vec::new());
    }
    let out_root = ctx.build_dir().join("img");
    let quality = ctx.config().images.jpeg_quality;

    discover_images(&img_dir)?
        .into_par_iter()
        .map(|source| {
            let rel = source.strip_prefix(&img_dir).unwrap_or(&source);
            let output = out_root.join(rel);

            let original = fs::read(&source)
                .map_err(|e| ImageError::Io { path: source.clone(), source: e })?;
            let ext = source.extension().and_then(|e| e.to_str()).unwrap_or_default();
            let optimized = optimize(&original, ext, quality);
            let bytes = smaller(&original, optimized.as_deref());

            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| ImageError::Io { path: parent.to_path_buf(), source: e })?;
            }
            fs::write(&output, bytes).map_err(|e| ImageError::Io { path: output.clone(), source: e })?;

            Ok(MinifiedImage {
                original_size: original.len(),
                written_size: bytes.len(),
                source,
                output,
            })
        })
        .collect()
}

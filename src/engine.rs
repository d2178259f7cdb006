// src/engine.rs
//
// The core of bytefit: a one-shot pipeline that decodes a source image,
// rasterizes it at the requested dimensions, and encodes it - either once,
// or under the target-size quality search for lossy outputs with a byte
// ceiling. This file is a facade over the decomposed modules in engine/.

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
/// This is the same limit used by libvips/sharp.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA. Beyond this is likely malicious.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod common;
mod decoder;
mod encoder;
mod io;
mod pipeline;
mod rasterize;
mod search;

// Re-export commonly used types and functions
pub use decoder::{
    check_dimensions, decode_source, detect_exif_orientation, detect_format,
    ensure_dimensions_safe, DecodedImage,
};
pub use encoder::{encode_frame, encode_jpeg, encode_png, encode_webp, QualitySettings};
pub use io::Source;
pub use rasterize::{apply_orientation, calc_fit_dimensions, rasterize};
pub use search::{fit_to_size, FALLBACK_QUALITY, MIN_SEARCH_QUALITY, SEARCH_STEPS};

use crate::error::Result;
use crate::settings::{EncodeMetrics, EncodedResult, ResizeSettings};

/// Encode source bytes per the given settings. The sole core entry point:
/// decode, orient, rasterize to exactly the requested dimensions, then encode
/// once - or under the quality search when a lossy format carries a positive
/// size target.
pub fn encode(bytes: &[u8], settings: &ResizeSettings) -> Result<EncodedResult> {
    pipeline::run(bytes, settings)
}

/// Like [`encode`], additionally returning stage timings, byte counts and
/// the encoder invocation count.
pub fn encode_with_metrics(
    bytes: &[u8],
    settings: &ResizeSettings,
) -> Result<(EncodedResult, EncodeMetrics)> {
    pipeline::run_with_metrics(bytes, settings)
}

/// Encode straight from a file, memory-mapping it to avoid a copy.
pub fn encode_file(
    path: impl AsRef<std::path::Path>,
    settings: &ResizeSettings,
) -> Result<EncodedResult> {
    let source = Source::open(path)?;
    match source.as_bytes() {
        Some(bytes) => pipeline::run(bytes, settings),
        None => {
            let data = source.load()?;
            pipeline::run(&data, settings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::OutputFormat;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_source(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_encode_entry_point() {
        let source = png_source(80, 40);
        let settings = ResizeSettings::new(20, 10).with_format(OutputFormat::WebP);
        let result = encode(&source, &settings).unwrap();
        assert_eq!((result.width, result.height), (20, 10));
        assert_eq!(&result.bytes[0..4], b"RIFF");
    }

    #[test]
    fn test_encode_file_entry_point() {
        let source = png_source(60, 60);
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), &source).unwrap();

        let settings = ResizeSettings::new(30, 30).with_format(OutputFormat::Png);
        let result = encode_file(tmp.path(), &settings).unwrap();
        assert_eq!((result.width, result.height), (30, 30));
        assert_eq!(&result.bytes[1..4], b"PNG");
    }

    #[test]
    fn test_encode_file_missing_path() {
        let settings = ResizeSettings::new(10, 10);
        assert!(encode_file("/no/such/file.png", &settings).is_err());
    }
}

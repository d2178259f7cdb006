// lib.rs
//
// bytefit: local image resize/convert engine with a target-file-size
// quality search
//
// Design goals:
// - Everything runs on the local device; image data never leaves it
// - One-shot pipeline: decode -> orient -> rasterize -> encode
// - Best-effort size fitting: highest quality whose output stays under a
//   byte ceiling, found by bounded bisection over the quality parameter
// - No shared state between invocations; concurrent calls are safe

pub mod debounce;
pub mod engine;
pub mod error;
pub mod settings;

use image::ImageReader;
use std::io::{BufRead, BufReader, Cursor, Seek};

pub use engine::{
    calc_fit_dimensions, encode, encode_file, encode_with_metrics, fit_to_size, Source,
};
pub use error::{BytefitError, ErrorCategory, Result};
pub use settings::{
    download_file_name, format_file_size, EncodeMetrics, EncodedResult, OutputFormat,
    ResizeSettings, DEFAULT_QUALITY,
};

/// Image metadata returned by the inspect helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<String>,
}

fn read_inspect_metadata<R: BufRead + Seek>(reader: R) -> Result<InspectMetadata> {
    let reader = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(|e| BytefitError::decode_failed(format!("failed to read image header: {e}")))?;

    let format = reader.format().map(|f| format!("{f:?}").to_lowercase());
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| BytefitError::decode_failed(format!("failed to read dimensions: {e}")))?;

    Ok(InspectMetadata {
        width,
        height,
        format,
    })
}

/// Inspect image metadata WITHOUT decoding pixels.
/// This reads only the header bytes - extremely fast (<1ms).
///
/// Use this to show a source's native dimensions before processing, or to
/// reject oversized images without wasting CPU on a full decode.
pub fn inspect_header_from_bytes(data: &[u8]) -> Result<InspectMetadata> {
    read_inspect_metadata(Cursor::new(data))
}

/// Inspect image metadata from a file path without loading the whole file.
pub fn inspect_header_from_path(path: &str) -> Result<InspectMetadata> {
    use std::fs::File;

    let file = File::open(path).map_err(|e| BytefitError::file_read_failed(path.to_string(), e))?;
    read_inspect_metadata(BufReader::new(file))
}

/// Get library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Supported input formats (decode side; anything the fallback decoder
/// understands also works, these are the fast paths)
pub fn supported_input_formats() -> Vec<String> {
    vec![
        "jpeg".to_string(),
        "jpg".to_string(),
        "png".to_string(),
        "webp".to_string(),
    ]
}

/// Supported output formats
pub fn supported_output_formats() -> Vec<String> {
    vec![
        "jpeg".to_string(),
        "jpg".to_string(),
        "png".to_string(),
        "webp".to_string(),
    ]
}

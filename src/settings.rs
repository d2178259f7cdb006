// src/settings.rs
//
// Export settings and result types.
// These are cheap to create and copy - the expensive work happens in the engine.

use crate::error::{BytefitError, Result};
use std::path::Path;

/// Output format for encoding.
///
/// JPEG and WebP are lossy and honor the quality setting; PNG is lossless
/// and ignores it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn from_str(format: &str) -> Result<Self> {
        match format.to_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Ok(Self::Jpeg),
            "png" | "image/png" => Ok(Self::Png),
            "webp" | "image/webp" => Ok(Self::WebP),
            other => Err(BytefitError::unsupported_format(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// File extension used when deriving output file names
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    /// Whether the encoder for this format has a variable-quality lossy mode.
    /// Only lossy formats participate in the target-size quality search.
    pub fn is_lossy(&self) -> bool {
        match self {
            Self::Jpeg | Self::WebP => true,
            Self::Png => false,
        }
    }
}

/// One export request: target dimensions, format, quality, optional size cap.
///
/// `width`/`height` are the final raster dimensions; the engine does not
/// second-guess them. `maintain_aspect_ratio` exists for the caller's
/// form logic (see [`calc_fit_dimensions`](crate::engine::calc_fit_dimensions))
/// and is not consulted by the engine itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ResizeSettings {
    pub width: u32,
    pub height: u32,
    pub maintain_aspect_ratio: bool,
    pub format: OutputFormat,
    /// Encoding quality in [0, 1]. Ignored for PNG.
    pub quality: f32,
    /// Optional output size cap in KB. `None` or `Some(0)` disables the
    /// quality search; lossless formats never search regardless.
    pub target_file_size_kb: Option<u32>,
}

/// Default quality matching the original tool's export default.
pub const DEFAULT_QUALITY: f32 = 0.9;

impl ResizeSettings {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            maintain_aspect_ratio: true,
            format: OutputFormat::Jpeg,
            quality: DEFAULT_QUALITY,
            target_file_size_kb: None,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_target_file_size_kb(mut self, kb: Option<u32>) -> Self {
        self.target_file_size_kb = kb;
        self
    }

    /// Validate the request before any decoding work starts.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BytefitError::invalid_output_dimensions(
                self.width,
                self.height,
            ));
        }
        if !self.quality.is_finite() || !(0.0..=1.0).contains(&self.quality) {
            return Err(BytefitError::invalid_argument(
                "quality",
                format!("{}", self.quality),
                "must be a finite value within 0..=1",
            ));
        }
        Ok(())
    }

    /// Byte ceiling for the quality search, when one applies to this request.
    ///
    /// Returns `None` for lossless formats and for absent/zero targets, which
    /// is exactly the set of cases that take the single-encode path.
    pub fn target_bytes(&self) -> Option<u64> {
        if !self.format.is_lossy() {
            return None;
        }
        match self.target_file_size_kb {
            Some(kb) if kb > 0 => Some(kb as u64 * 1024),
            _ => None,
        }
    }
}

/// Terminal value handed back to the caller: encoded bytes plus the
/// dimensions that were actually rasterized (always the requested ones).
#[derive(Clone, Debug)]
pub struct EncodedResult {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedResult {
    /// Length of the encoded payload in bytes.
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the encoded bytes to disk (the library-side counterpart of the
    /// original tool's download step).
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.bytes).map_err(|e| {
            BytefitError::file_write_failed(path.to_string_lossy().to_string(), e)
        })
    }
}

/// Per-invocation stage timings and byte counts.
///
/// `encoder_calls` counts invocations of the single-quality encoder: 1 on the
/// direct path, 7 when the quality search ran, 8 when its fallback fired.
#[derive(Clone, Debug, Default)]
pub struct EncodeMetrics {
    /// Decode stage duration in milliseconds
    pub decode_ms: f64,
    /// Rasterize (orient + resize) stage duration in milliseconds
    pub resize_ms: f64,
    /// Encode stage duration in milliseconds (all encoder calls combined)
    pub encode_ms: f64,
    /// Total wall-clock duration in milliseconds
    pub total_ms: f64,
    /// Input payload size in bytes
    pub bytes_in: u64,
    /// Output payload size in bytes
    pub bytes_out: u64,
    /// bytes_out / bytes_in (0.0 when input size is unknown/zero)
    pub compression_ratio: f64,
    /// Number of single-quality encoder invocations
    pub encoder_calls: u32,
    /// Output format tag (jpeg, png, webp)
    pub format_out: String,
}

/// Human-readable byte count, e.g. `153.42 KB`. Trailing zeros are trimmed
/// the way the original tool displayed sizes.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exponent = (((bytes as f64).ln() / 1024f64.ln()) as usize).min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let mut rendered = format!("{value:.2}");
    if rendered.contains('.') {
        while rendered.ends_with('0') {
            rendered.pop();
        }
        if rendered.ends_with('.') {
            rendered.pop();
        }
    }
    format!("{rendered} {}", UNITS[exponent])
}

/// Derive an output file name from the source name: `photo.png` exported as
/// JPEG becomes `photo_resized.jpg`.
pub fn download_file_name(source_name: &str, format: OutputFormat) -> String {
    let stem = match source_name.rfind('.') {
        Some(idx) if idx > 0 => &source_name[..idx],
        _ => source_name,
    };
    format!("{stem}_resized.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod format_tests {
        use super::*;

        #[test]
        fn test_from_str_accepts_names_and_mime_types() {
            assert_eq!(OutputFormat::from_str("jpeg").unwrap(), OutputFormat::Jpeg);
            assert_eq!(OutputFormat::from_str("JPG").unwrap(), OutputFormat::Jpeg);
            assert_eq!(
                OutputFormat::from_str("image/webp").unwrap(),
                OutputFormat::WebP
            );
            assert_eq!(
                OutputFormat::from_str("image/png").unwrap(),
                OutputFormat::Png
            );
            assert!(OutputFormat::from_str("gif").is_err());
        }

        #[test]
        fn test_lossy_classification() {
            assert!(OutputFormat::Jpeg.is_lossy());
            assert!(OutputFormat::WebP.is_lossy());
            assert!(!OutputFormat::Png.is_lossy());
        }

        #[test]
        fn test_mime_and_extension() {
            assert_eq!(OutputFormat::Jpeg.mime_type(), "image/jpeg");
            assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
            assert_eq!(OutputFormat::WebP.mime_type(), "image/webp");
            assert_eq!(OutputFormat::Png.extension(), "png");
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_defaults_match_original_tool() {
            let settings = ResizeSettings::new(800, 600);
            assert!(settings.maintain_aspect_ratio);
            assert_eq!(settings.format, OutputFormat::Jpeg);
            assert!((settings.quality - 0.9).abs() < f32::EPSILON);
            assert_eq!(settings.target_file_size_kb, None);
        }

        #[test]
        fn test_validate_rejects_zero_dimensions() {
            assert!(ResizeSettings::new(0, 100).validate().is_err());
            assert!(ResizeSettings::new(100, 0).validate().is_err());
            assert!(ResizeSettings::new(100, 100).validate().is_ok());
        }

        #[test]
        fn test_validate_rejects_out_of_range_quality() {
            assert!(ResizeSettings::new(10, 10)
                .with_quality(1.5)
                .validate()
                .is_err());
            assert!(ResizeSettings::new(10, 10)
                .with_quality(-0.1)
                .validate()
                .is_err());
            assert!(ResizeSettings::new(10, 10)
                .with_quality(f32::NAN)
                .validate()
                .is_err());
            assert!(ResizeSettings::new(10, 10)
                .with_quality(0.0)
                .validate()
                .is_ok());
            assert!(ResizeSettings::new(10, 10)
                .with_quality(1.0)
                .validate()
                .is_ok());
        }

        #[test]
        fn test_target_bytes_requires_lossy_and_positive() {
            let base = ResizeSettings::new(10, 10);
            assert_eq!(
                base.clone()
                    .with_target_file_size_kb(Some(50))
                    .target_bytes(),
                Some(50 * 1024)
            );
            assert_eq!(
                base.clone().with_target_file_size_kb(Some(0)).target_bytes(),
                None
            );
            assert_eq!(base.clone().with_target_file_size_kb(None).target_bytes(), None);
            assert_eq!(
                base.with_format(OutputFormat::Png)
                    .with_target_file_size_kb(Some(50))
                    .target_bytes(),
                None
            );
        }
    }

    mod result_tests {
        use super::*;

        #[test]
        fn test_size_bytes_is_payload_length() {
            let result = EncodedResult {
                bytes: vec![1, 2, 3, 4, 5],
                width: 2,
                height: 2,
            };
            assert_eq!(result.size_bytes(), 5);
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn test_format_file_size() {
            assert_eq!(format_file_size(0), "0 Bytes");
            assert_eq!(format_file_size(512), "512 Bytes");
            assert_eq!(format_file_size(1024), "1 KB");
            assert_eq!(format_file_size(1536), "1.5 KB");
            assert_eq!(format_file_size(157_286), "153.6 KB");
            assert_eq!(format_file_size(1024 * 1024), "1 MB");
        }

        #[test]
        fn test_download_file_name() {
            assert_eq!(
                download_file_name("photo.png", OutputFormat::Jpeg),
                "photo_resized.jpg"
            );
            assert_eq!(
                download_file_name("archive.tar.gz", OutputFormat::WebP),
                "archive.tar_resized.webp"
            );
            assert_eq!(
                download_file_name("noextension", OutputFormat::Png),
                "noextension_resized.png"
            );
            assert_eq!(
                download_file_name(".hidden", OutputFormat::Jpeg),
                ".hidden_resized.jpg"
            );
        }
    }
}

// src/engine/encoder.rs
//
// Encoder operations: JPEG (mozjpeg), PNG (image + oxipng), WebP with
// quality settings

use crate::engine::common::run_with_panic_policy;
use crate::engine::MAX_DIMENSION;
use crate::error::{BytefitError, Result};
use crate::settings::OutputFormat;
use image::{DynamicImage, ImageFormat};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use std::io::Cursor;

/// Derives per-format encoder settings from a quality value in [0, 1].
///
/// Quality bands (WebP filter_strength keeps its own 0.80/0.60 thresholds):
/// - High (>= 0.85): visual quality first
/// - Balanced (0.70-0.84): quality/speed balance
/// - Fast (0.50-0.69): speed leaning
/// - Fastest (< 0.50): speed first
#[derive(Debug, Clone, Copy)]
pub struct QualitySettings {
    quality: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualityBand {
    High,
    Balanced,
    Fast,
    Fastest,
}

impl QualitySettings {
    pub fn new(quality: f32) -> Self {
        Self {
            quality: quality.clamp(0.0, 1.0),
        }
    }

    /// Quality on the 0-100 scale both mozjpeg and libwebp expect.
    pub fn codec_quality(&self) -> f32 {
        self.quality * 100.0
    }

    fn band(&self) -> QualityBand {
        if self.quality >= 0.85 {
            QualityBand::High
        } else if self.quality >= 0.70 {
            QualityBand::Balanced
        } else if self.quality >= 0.50 {
            QualityBand::Fast
        } else {
            QualityBand::Fastest
        }
    }

    // WebP settings: method 4 / single pass / no preprocessing is the
    // balanced profile; multi-pass buys little at 3-5x the encode time.
    pub fn webp_method(&self) -> i32 {
        4
    }

    pub fn webp_pass(&self) -> i32 {
        1
    }

    pub fn webp_preprocessing(&self) -> i32 {
        0
    }

    pub fn webp_sns_strength(&self) -> i32 {
        match self.band() {
            QualityBand::High => 50,
            QualityBand::Balanced => 70,
            QualityBand::Fast | QualityBand::Fastest => 80,
        }
    }

    pub fn webp_filter_strength(&self) -> i32 {
        if self.quality >= 0.80 {
            20
        } else if self.quality >= 0.60 {
            30
        } else {
            40
        }
    }

    pub fn webp_filter_sharpness(&self) -> i32 {
        match self.band() {
            QualityBand::High => 2,
            QualityBand::Balanced | QualityBand::Fast | QualityBand::Fastest => 0,
        }
    }

    /// JPEG smoothing factor; low qualities trade detail for fewer artifacts.
    pub fn jpeg_smoothing(&self) -> u8 {
        if self.quality >= 0.90 {
            0
        } else if self.quality >= 0.70 {
            5
        } else if self.quality >= 0.60 {
            10
        } else {
            18
        }
    }
}

/// Encode one frame in the requested format. `quality` is in [0, 1] and is
/// ignored for PNG.
pub fn encode_frame(img: &DynamicImage, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(img, quality),
        OutputFormat::Png => encode_png(img),
        OutputFormat::WebP => encode_webp(img, quality),
    }
}

/// Encode to JPEG using mozjpeg with web-optimized settings: progressive
/// scans, 4:2:0 chroma, optimized coding tables.
pub fn encode_jpeg(img: &DynamicImage, quality: f32) -> Result<Vec<u8>> {
    run_with_panic_policy("encode:jpeg", || {
        use std::borrow::Cow;

        // Zero-copy when the frame is already RGB8
        let rgb: Cow<'_, image::RgbImage> = match img {
            DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
            _ => Cow::Owned(img.to_rgb8()),
        };
        let (w, h) = rgb.dimensions();
        let pixels: &[u8] = rgb.as_raw();

        // Pre-validate everything that would make mozjpeg abort
        if w == 0 || h == 0 {
            return Err(BytefitError::internal_panic(
                "encode reached with zero-sized frame",
            ));
        }
        if w > MAX_DIMENSION || h > MAX_DIMENSION {
            return Err(BytefitError::dimension_exceeds_limit(w.max(h), MAX_DIMENSION));
        }
        let expected_len = (w as usize) * (h as usize) * 3;
        if pixels.len() != expected_len {
            return Err(BytefitError::corrupted_image());
        }

        let settings = QualitySettings::new(quality);

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(w as usize, h as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(settings.codec_quality());
        comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);
        comp.set_optimize_scans(true);
        comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);
        comp.set_smoothing_factor(settings.jpeg_smoothing());

        let estimated_size = (w as usize * h as usize * 3 / 10).max(4096);
        let mut output = Vec::with_capacity(estimated_size);

        let mut writer = comp.start_compress(&mut output).map_err(|e| {
            BytefitError::encode_failed("jpeg", format!("mozjpeg: failed to start compress: {e:?}"))
        })?;

        let stride = w as usize * 3;
        for row in pixels.chunks(stride) {
            writer.write_scanlines(row).map_err(|e| {
                BytefitError::encode_failed(
                    "jpeg",
                    format!("mozjpeg: failed to write scanlines: {e:?}"),
                )
            })?;
        }

        writer.finish().map_err(|e| {
            BytefitError::encode_failed("jpeg", format!("mozjpeg: failed to finish: {e:?}"))
        })?;

        Ok(output)
    })
}

/// Encode to PNG using the image crate, then recompress with oxipng
/// (lossless, quality parameter does not apply).
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| BytefitError::encode_failed("png", format!("PNG encode failed: {e}")))?;

        let options = oxipng::Options::from_preset(2);
        oxipng::optimize_from_memory(&buf, &options).map_err(|e| {
            BytefitError::encode_failed("png", format!("oxipng optimization failed: {e}"))
        })
    })
}

/// Encode to WebP (lossy) with band-derived settings.
pub fn encode_webp(img: &DynamicImage, quality: f32) -> Result<Vec<u8>> {
    run_with_panic_policy("encode:webp", || {
        use std::borrow::Cow;

        let settings = QualitySettings::new(quality);

        let mut config = webp::WebPConfig::new()
            .map_err(|_| BytefitError::internal_panic("failed to create WebPConfig"))?;
        config.quality = settings.codec_quality();
        config.method = settings.webp_method();
        config.pass = settings.webp_pass();
        config.preprocessing = settings.webp_preprocessing();
        config.sns_strength = settings.webp_sns_strength();
        config.autofilter = 1;
        config.filter_strength = settings.webp_filter_strength();
        config.filter_sharpness = settings.webp_filter_sharpness();

        // Keep the alpha channel only when the frame actually has one; an
        // opaque RGBA buffer costs bytes for nothing.
        let encoded = if img.color().has_alpha() {
            let rgba: Cow<'_, image::RgbaImage> = match img {
                DynamicImage::ImageRgba8(rgba_img) => Cow::Borrowed(rgba_img),
                _ => Cow::Owned(img.to_rgba8()),
            };
            let (w, h) = rgba.dimensions();
            webp::Encoder::from_rgba(rgba.as_raw(), w, h).encode_advanced(&config)
        } else {
            let rgb: Cow<'_, image::RgbImage> = match img {
                DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
                _ => Cow::Owned(img.to_rgb8()),
            };
            let (w, h) = rgb.dimensions();
            webp::Encoder::from_rgb(rgb.as_raw(), w, h).encode_advanced(&config)
        };

        let mem = encoded.map_err(|e| {
            BytefitError::encode_failed("webp", format!("WebP encode failed: {e:?}"))
        })?;

        Ok(mem.to_vec())
    })
}

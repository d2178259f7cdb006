// src/engine/rasterize.rs
//
// Rasterization: EXIF orientation fixup and single-pass scaling to the
// exact output dimensions.

use crate::engine::decoder::check_dimensions;
use crate::error::{BytefitError, Result};
use fast_image_resize::{self as fir, MulDiv, PixelType, ResizeOptions};
use image::{imageops::FilterType, DynamicImage, RgbImage, RgbaImage};
use tracing::trace;

/// Scale a frame to exactly `width` x `height` in one pass.
///
/// The aspect ratio is NOT preserved here; dimension co-computation is the
/// caller's job (see [`calc_fit_dimensions`]). Scaling is a single Lanczos3
/// convolution regardless of ratio - for extreme downscales a stepped chain
/// would ring less, but one pass matches the tool's scope and keeps output
/// identical across invocations.
pub fn rasterize(img: DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
    if width == 0 || height == 0 {
        return Err(BytefitError::invalid_output_dimensions(width, height));
    }
    check_dimensions(width, height)?;

    let src_dims = (img.width(), img.height());
    if src_dims == (width, height) {
        return Ok(img);
    }

    trace!(
        target: "bytefit::rasterize",
        src_width = src_dims.0,
        src_height = src_dims.1,
        dst_width = width,
        dst_height = height,
        "scaling frame"
    );

    // Pick a pixel layout without forcing RGBA when the source has no alpha.
    // into_raw() transfers ownership of the buffer instead of copying.
    let (pixel_type, src_pixels): (PixelType, Vec<u8>) = match img {
        DynamicImage::ImageRgb8(rgb) => (PixelType::U8x3, rgb.into_raw()),
        DynamicImage::ImageRgba8(rgba) => (PixelType::U8x4, rgba.into_raw()),
        other => (PixelType::U8x4, other.to_rgba8().into_raw()),
    };

    match resize_with_fir(src_dims, &src_pixels, pixel_type, width, height) {
        Ok(resized) => Ok(resized),
        Err(fir_err) => {
            // fir rejects some buffers (alignment, layout); the image crate
            // resampler is slower but accepts anything we can hand it.
            resize_with_image_crate(src_dims, &src_pixels, pixel_type, width, height).map_err(
                |fallback_err| {
                    BytefitError::resize_failed(
                        src_dims,
                        (width, height),
                        format!("{fir_err}; image crate fallback failed: {fallback_err}"),
                    )
                },
            )
        }
    }
}

fn resize_with_fir(
    src_dims: (u32, u32),
    src_pixels: &[u8],
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let mut src_image =
        fir::images::Image::from_vec_u8(src_dims.0, src_dims.1, src_pixels.to_vec(), pixel_type)
            .map_err(|e| format!("fir source image error: {e:?}"))?;
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, pixel_type);

    // RGBA must be resampled premultiplied, or edge pixels bleed the color
    // of fully transparent neighbors.
    let has_alpha = pixel_type == PixelType::U8x4;
    let mul_div = MulDiv::default();
    if has_alpha {
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
    }

    let options = ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(
        fir::FilterType::Lanczos3,
    ));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    if has_alpha {
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    }

    let dst_pixels = dst_image.into_vec();
    match pixel_type {
        PixelType::U8x3 => RgbImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| "failed to rebuild rgb image after resize".to_string()),
        PixelType::U8x4 => RgbaImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| "failed to rebuild rgba image after resize".to_string()),
        _ => Err("unsupported pixel type after resize".to_string()),
    }
}

fn resize_with_image_crate(
    src_dims: (u32, u32),
    src_pixels: &[u8],
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let filter = FilterType::Lanczos3;
    match pixel_type {
        PixelType::U8x3 => {
            let rgb = RgbImage::from_raw(src_dims.0, src_dims.1, src_pixels.to_vec())
                .ok_or_else(|| "failed to build rgb image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageRgb8(image::imageops::resize(
                &rgb, dst_width, dst_height, filter,
            )))
        }
        PixelType::U8x4 => {
            let rgba = RgbaImage::from_raw(src_dims.0, src_dims.1, src_pixels.to_vec())
                .ok_or_else(|| "failed to build rgba image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageRgba8(image::imageops::resize(
                &rgba, dst_width, dst_height, filter,
            )))
        }
        _ => Err("fallback resize supports only U8x3/U8x4 pixel types".to_string()),
    }
}

/// Apply an EXIF Orientation value (1-8) the way browsers do before drawing.
/// Invalid values are ignored silently.
pub fn apply_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(), // transpose
        6 => img.rotate90(),
        7 => img.rotate270().fliph(), // transverse
        8 => img.rotate270(),
        _ => img,
    }
}

/// Calculate output dimensions that fit inside a target box while keeping
/// the source aspect ratio.
///
/// This is the helper behind a UI's "maintain aspect ratio" toggle: the
/// engine itself takes width/height as already resolved, so form logic calls
/// this to co-compute the other dimension when one changes.
pub fn calc_fit_dimensions(
    orig_w: u32,
    orig_h: u32,
    target_w: Option<u32>,
    target_h: Option<u32>,
) -> (u32, u32) {
    match (target_w, target_h) {
        (Some(w), Some(h)) => {
            let orig_ratio = orig_w as f64 / orig_h as f64;
            let target_ratio = w as f64 / h as f64;
            if orig_ratio > target_ratio {
                // Source is wider than the box: fit to width
                let ratio = w as f64 / orig_w as f64;
                (w, (orig_h as f64 * ratio).round() as u32)
            } else {
                // Source is taller: fit to height
                let ratio = h as f64 / orig_h as f64;
                ((orig_w as f64 * ratio).round() as u32, h)
            }
        }
        (Some(w), None) => {
            let ratio = w as f64 / orig_w as f64;
            (w, (orig_h as f64 * ratio).round() as u32)
        }
        (None, Some(h)) => {
            let ratio = h as f64 / orig_h as f64;
            ((orig_w as f64 * ratio).round() as u32, h)
        }
        (None, None) => (orig_w, orig_h),
    }
}

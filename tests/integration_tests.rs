// tests/integration_tests.rs
//
// Integration tests for the public API: full decode -> rasterize -> encode
// runs through real codecs, including the target-size quality search.

use bytefit::{
    encode, encode_file, encode_with_metrics, inspect_header_from_bytes, EncodedResult,
    OutputFormat, ResizeSettings,
};
use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};
use std::io::Cursor;

/// Gradient-ish source with enough detail that JPEG sizes respond to quality.
fn png_source(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            ((x * 255) / width.max(1)) as u8,
            ((y * 255) / height.max(1)) as u8,
            ((x * 7 + y * 13) % 256) as u8,
        ])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn decode_output(result: &EncodedResult) -> DynamicImage {
    image::load_from_memory(&result.bytes).unwrap()
}

#[test]
fn test_resize_to_half_without_target() {
    // 2000x1000 source, 500x250 JPEG at quality 0.9, no size target:
    // exactly one encoder call and the requested dimensions.
    let source = png_source(2000, 1000);
    let settings = ResizeSettings::new(500, 250).with_quality(0.9);
    let (result, metrics) = encode_with_metrics(&source, &settings).unwrap();

    assert_eq!(metrics.encoder_calls, 1);
    assert_eq!((result.width, result.height), (500, 250));
    assert_eq!(result.size_bytes(), result.bytes.len());
    assert_eq!(decode_output(&result).dimensions(), (500, 250));
}

#[test]
fn test_target_size_search_stays_under_ceiling() {
    let source = png_source(2000, 1000);

    // Measure the floor: the smallest practical JPEG for this frame. Any
    // target of at least twice that must be met without the fallback.
    let frame = bytefit::engine::rasterize(
        image::load_from_memory(&source).unwrap(),
        500,
        250,
    )
    .unwrap();
    let floor = bytefit::engine::encode_jpeg(&frame, 0.05).unwrap().len();
    let target_kb = ((floor * 2) / 1024 + 1) as u32;

    let settings = ResizeSettings::new(500, 250)
        .with_quality(0.9)
        .with_target_file_size_kb(Some(target_kb));
    let (result, metrics) = encode_with_metrics(&source, &settings).unwrap();

    assert!(result.size_bytes() as u64 <= target_kb as u64 * 1024);
    assert_eq!(metrics.encoder_calls, 7);
    assert_eq!((result.width, result.height), (500, 250));
}

#[test]
fn test_unreachable_target_returns_fallback_not_error() {
    // 1 KB for a large noisy JPEG is unreachable even at the fallback
    // quality; the result must still come back, oversize and all.
    let img = RgbImage::from_fn(1200, 900, |x, y| {
        let seed = x.wrapping_mul(31).wrapping_add(y.wrapping_mul(57)) ^ x.wrapping_mul(y | 1);
        image::Rgb([seed as u8, (seed >> 8) as u8, (seed >> 16) as u8])
    });
    let mut source = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut source), ImageFormat::Png)
        .unwrap();

    let settings = ResizeSettings::new(800, 600)
        .with_quality(0.9)
        .with_target_file_size_kb(Some(1));
    let (result, metrics) = encode_with_metrics(&source, &settings).unwrap();

    assert!(result.size_bytes() as u64 > 1024, "noise should not fit 1 KB");
    assert_eq!(&result.bytes[0..2], &[0xFF, 0xD8]);
    // 1 probe + 6 bisections + 1 fallback
    assert_eq!(metrics.encoder_calls, 8);
}

#[test]
fn test_png_with_target_never_searches() {
    let source = png_source(400, 400);
    let settings = ResizeSettings::new(100, 100)
        .with_format(OutputFormat::Png)
        .with_target_file_size_kb(Some(1));
    let (result, metrics) = encode_with_metrics(&source, &settings).unwrap();

    assert_eq!(metrics.encoder_calls, 1);
    assert_eq!(&result.bytes[1..4], b"PNG");
    assert_eq!(decode_output(&result).dimensions(), (100, 100));
}

#[test]
fn test_webp_target_size_search() {
    let source = png_source(800, 600);
    let settings = ResizeSettings::new(200, 150)
        .with_format(OutputFormat::WebP)
        .with_quality(0.9)
        .with_target_file_size_kb(Some(20));
    let (result, metrics) = encode_with_metrics(&source, &settings).unwrap();

    assert_eq!(&result.bytes[0..4], b"RIFF");
    assert_eq!(&result.bytes[8..12], b"WEBP");
    assert!(metrics.encoder_calls == 7 || metrics.encoder_calls == 8);
}

#[test]
fn test_dimension_fidelity_ignores_source_aspect() {
    // Output dimensions echo the settings even when they mangle the aspect
    let source = png_source(64, 64);
    let settings = ResizeSettings::new(123, 77).with_format(OutputFormat::Png);
    let result = encode(&source, &settings).unwrap();

    assert_eq!((result.width, result.height), (123, 77));
    assert_eq!(decode_output(&result).dimensions(), (123, 77));
}

#[test]
fn test_upscale_is_allowed() {
    let source = png_source(10, 10);
    let settings = ResizeSettings::new(40, 40).with_format(OutputFormat::Png);
    let result = encode(&source, &settings).unwrap();
    assert_eq!(decode_output(&result).dimensions(), (40, 40));
}

#[test]
fn test_quality_moves_jpeg_size() {
    let source = png_source(600, 400);
    let high = encode(&source, &ResizeSettings::new(300, 200).with_quality(0.95)).unwrap();
    let low = encode(&source, &ResizeSettings::new(300, 200).with_quality(0.2)).unwrap();
    assert!(
        high.size_bytes() > low.size_bytes(),
        "expected q=0.95 ({}) to outweigh q=0.2 ({})",
        high.size_bytes(),
        low.size_bytes()
    );
}

#[test]
fn test_garbage_input_is_a_decode_error() {
    let settings = ResizeSettings::new(10, 10);
    let err = encode(b"this is not an image", &settings).unwrap_err();
    assert_eq!(err.category(), bytefit::ErrorCategory::CodecError);
}

#[test]
fn test_zero_width_is_a_user_error() {
    let source = png_source(10, 10);
    let err = encode(&source, &ResizeSettings::new(0, 10)).unwrap_err();
    assert_eq!(err.category(), bytefit::ErrorCategory::UserError);
}

#[test]
fn test_encode_file_and_write_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("source.png");
    std::fs::write(&input, png_source(80, 80)).unwrap();

    let settings = ResizeSettings::new(40, 40).with_format(OutputFormat::WebP);
    let result = encode_file(&input, &settings).unwrap();

    let output = dir.path().join("source_resized.webp");
    result.write_to_file(&output).unwrap();
    let written = std::fs::read(&output).unwrap();
    assert_eq!(written, result.bytes);
    assert_eq!(image::load_from_memory(&written).unwrap().dimensions(), (40, 40));
}

#[test]
fn test_inspect_matches_source() {
    let source = png_source(321, 123);
    let metadata = inspect_header_from_bytes(&source).unwrap();
    assert_eq!((metadata.width, metadata.height), (321, 123));
    assert_eq!(metadata.format.as_deref(), Some("png"));
}

#[test]
fn test_jpeg_source_roundtrip() {
    // JPEG in, JPEG out at different dimensions
    let mut jpeg = Vec::new();
    let img = RgbImage::from_fn(300, 200, |x, y| image::Rgb([(x % 200) as u8, (y % 200) as u8, 90]));
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .unwrap();

    let result = encode(&jpeg, &ResizeSettings::new(150, 100)).unwrap();
    assert_eq!(decode_output(&result).dimensions(), (150, 100));
}

#[test]
fn test_concurrent_invocations_are_independent() {
    let source = std::sync::Arc::new(png_source(300, 300));
    let mut handles = Vec::new();
    for size in [50u32, 75, 100, 125] {
        let source = source.clone();
        handles.push(std::thread::spawn(move || {
            let settings = ResizeSettings::new(size, size).with_target_file_size_kb(Some(500));
            encode(&source, &settings).map(|r| (r.width, r.height))
        }));
    }
    let mut dims: Vec<(u32, u32)> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    dims.sort_unstable();
    assert_eq!(dims, vec![(50, 50), (75, 75), (100, 100), (125, 125)]);
}

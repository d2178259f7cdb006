// src/engine/pipeline.rs
//
// Pipeline orchestration: decode -> orient -> rasterize -> encode (with
// optional target-size quality search).

use crate::engine::decoder::decode_source;
use crate::engine::encoder::encode_frame;
use crate::engine::rasterize::{apply_orientation, rasterize};
use crate::engine::search::fit_to_size;
use crate::error::Result;
use crate::settings::{EncodeMetrics, EncodedResult, ResizeSettings};
use std::time::Instant;
use tracing::debug;

/// Run the full pipeline over source bytes.
pub fn run(bytes: &[u8], settings: &ResizeSettings) -> Result<EncodedResult> {
    process(bytes, settings, None)
}

/// Run the full pipeline and record stage timings and encoder call counts.
pub fn run_with_metrics(
    bytes: &[u8],
    settings: &ResizeSettings,
) -> Result<(EncodedResult, EncodeMetrics)> {
    let mut metrics = EncodeMetrics::default();
    let result = process(bytes, settings, Some(&mut metrics))?;
    Ok((result, metrics))
}

fn process(
    bytes: &[u8],
    settings: &ResizeSettings,
    mut metrics: Option<&mut EncodeMetrics>,
) -> Result<EncodedResult> {
    settings.validate()?;

    let start_total = Instant::now();
    let mut stage_start = start_total;
    let mut mark_stage = move || {
        let elapsed = stage_start.elapsed().as_secs_f64() * 1000.0;
        stage_start = Instant::now();
        elapsed
    };

    let decoded = decode_source(bytes)?;
    if let Some(m) = metrics.as_deref_mut() {
        m.decode_ms = mark_stage();
    }

    // Orientation first so the scale pass sees the upright frame.
    let oriented = match decoded.orientation {
        Some(orientation) => apply_orientation(decoded.image, orientation),
        None => decoded.image,
    };
    let frame = rasterize(oriented, settings.width, settings.height)?;
    if let Some(m) = metrics.as_deref_mut() {
        m.resize_ms = mark_stage();
    }

    // Encoding path selection. Lossless formats and absent/zero targets take
    // the single-encode path; target_bytes() already folds those rules in.
    let mut encoder_calls = 0u32;
    let output = match settings.target_bytes() {
        Some(target) => {
            debug!(
                target: "bytefit::pipeline",
                target_bytes = target,
                format = settings.format.as_str(),
                "running quality search"
            );
            fit_to_size(
                |quality| {
                    encoder_calls += 1;
                    encode_frame(&frame, settings.format, quality)
                },
                target,
                settings.quality,
            )?
        }
        None => {
            encoder_calls = 1;
            encode_frame(&frame, settings.format, settings.quality)?
        }
    };

    if let Some(m) = metrics.as_deref_mut() {
        m.encode_ms = mark_stage();
        m.total_ms = start_total.elapsed().as_secs_f64() * 1000.0;
        m.bytes_in = bytes.len() as u64;
        m.bytes_out = output.len() as u64;
        m.compression_ratio = if bytes.is_empty() {
            0.0
        } else {
            output.len() as f64 / bytes.len() as f64
        };
        m.encoder_calls = encoder_calls;
        m.format_out = settings.format.as_str().to_string();
    }

    debug!(
        target: "bytefit::pipeline",
        width = settings.width,
        height = settings.height,
        bytes_out = output.len(),
        encoder_calls,
        "pipeline finished"
    );

    Ok(EncodedResult {
        bytes: output,
        width: settings.width,
        height: settings.height,
    })
}

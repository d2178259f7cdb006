// src/engine/search.rs
//
// Target-size quality search: bounded binary search over a lossy encoder's
// quality parameter, driven only by encoded byte count vs. a target.

use crate::error::Result;
use tracing::debug;

/// Floor of the search bracket. Kept just above zero so a bracket collapse
/// never asks the codec for a degenerate zero-quality encode.
pub const MIN_SEARCH_QUALITY: f32 = 0.01;

/// Quality of the last-resort encode when no probed quality fit the target.
pub const FALLBACK_QUALITY: f32 = 0.05;

/// Number of bisection steps after the initial probe. Six steps narrow the
/// bracket to ~1/64 (about 1.6% of the quality range), which is below the
/// granularity of the codecs' own quality parameters. The count never adapts
/// to the bracket width.
///
/// All three constants are tuning values, not structural invariants; they are
/// kept at these exact values for output compatibility with earlier releases.
pub const SEARCH_STEPS: u32 = 6;

/// Find the largest encode not exceeding `target_bytes`.
///
/// `encode_at` runs the underlying single-quality encoder over an already
/// rasterized frame; it is probed once at `initial_quality` and then exactly
/// [`SEARCH_STEPS`] more times, strictly sequentially (each step's bracket
/// depends on the previous result). Encoder failures propagate immediately;
/// the search never retries a failed encode.
///
/// When no probed quality fits, the smallest practical encode (at
/// [`FALLBACK_QUALITY`]) is returned even though it exceeds the target.
/// An unreachable target is a data outcome here, not an error: size-fitting
/// is advisory.
///
/// The bracketing assumes encoded size is non-decreasing in quality. Real
/// codecs can wobble at extreme settings; the search keeps the optimistic
/// assumption and simply keeps the best fitting candidate it saw.
pub fn fit_to_size<F>(mut encode_at: F, target_bytes: u64, initial_quality: f32) -> Result<Vec<u8>>
where
    F: FnMut(f32) -> Result<Vec<u8>>,
{
    let probe = encode_at(initial_quality)?;
    debug!(
        target: "bytefit::search",
        quality = initial_quality,
        size = probe.len(),
        target = target_bytes,
        "initial probe"
    );

    // Bracket setup: a fitting probe searches upward for a higher quality
    // that still fits; an oversized probe searches downward from it.
    let (mut lo, mut hi, mut best_fit) = if probe.len() as u64 <= target_bytes {
        (initial_quality, 1.0_f32, Some(probe))
    } else {
        (MIN_SEARCH_QUALITY, initial_quality, None)
    };

    for step in 0..SEARCH_STEPS {
        let mid = (lo + hi) / 2.0;
        let candidate = encode_at(mid)?;
        let fits = candidate.len() as u64 <= target_bytes;
        debug!(
            target: "bytefit::search",
            step,
            quality = mid,
            size = candidate.len(),
            fits,
            "bisection probe"
        );
        if fits {
            // Every later fit is at a quality >= this one, so replacing
            // best_fit unconditionally keeps the highest-quality fit.
            lo = mid;
            best_fit = Some(candidate);
        } else {
            hi = mid;
        }
    }

    match best_fit {
        Some(bytes) => Ok(bytes),
        None => {
            debug!(
                target: "bytefit::search",
                quality = FALLBACK_QUALITY,
                "no probe fit the target; taking fallback encode"
            );
            encode_at(FALLBACK_QUALITY)
        }
    }
}

//! Audio mathematics helpers shared by the stream implementations.
//!
//! Amplitude/dB conversions, time/sample conversions, and the guarded
//! arithmetic used wherever an ill-conditioned parameter could otherwise push
//! `NaN` through an entire mix.
//!
//! # Examples
//!
//! ```rust
//! use analytic_streams::utils::audio_math::{amplitude_to_db, db_to_amplitude, seconds_to_samples};
//!
//! let amp = db_to_amplitude(-20.0);
//! assert!((amp - 0.1).abs() < 1e-12);
//! assert!((amplitude_to_db(amp) + 20.0).abs() < 1e-9);
//! assert_eq!(seconds_to_samples(0.5, 44100.0), 22050);
//! ```

use tracing::warn;

// =============================================================================
// AMPLITUDE CONVERSIONS
// =============================================================================

/// Converts linear amplitude to decibels.
///
/// Uses the formula `dB = 20 * log10(amplitude)`.
/// Returns -120 dB for zero or negative amplitude to avoid infinite values.
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        20.0 * amplitude.log10()
    } else {
        -120.0
    }
}

/// Converts decibels to linear amplitude.
///
/// Uses the formula `amplitude = 10^(dB / 20)`.
pub fn db_to_amplitude(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

// =============================================================================
// TIME/SAMPLE CONVERSIONS
// =============================================================================

/// Converts time in seconds to a sample count, rounding to the nearest sample.
///
/// Negative or non-finite inputs yield 0.
///
/// # Arguments
/// * `seconds` - Duration in seconds
/// * `sampling_rate` - Sampling rate in Hz
pub fn seconds_to_samples(seconds: f64, sampling_rate: f64) -> usize {
    let samples = (seconds * sampling_rate).round();
    if samples.is_finite() && samples > 0.0 {
        samples as usize
    } else {
        0
    }
}

/// Converts a sample count to time in seconds.
pub fn samples_to_seconds(samples: usize, sampling_rate: f64) -> f64 {
    samples as f64 / sampling_rate
}

// =============================================================================
// GUARDED ARITHMETIC
// =============================================================================

/// Returns `value` when it is finite, otherwise logs a warning naming
/// `quantity` and returns `fallback`.
///
/// # Examples
///
/// ```rust
/// use analytic_streams::utils::audio_math::finite_or_fallback;
///
/// assert_eq!(finite_or_fallback(2.0, 1.0, "ratio"), 2.0);
/// assert_eq!(finite_or_fallback(f64::NAN, 1.0, "ratio"), 1.0);
/// assert_eq!(finite_or_fallback(f64::INFINITY, 1.0, "ratio"), 1.0);
/// ```
pub fn finite_or_fallback(value: f64, fallback: f64, quantity: &str) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!(quantity, value, fallback, "non-finite value replaced by fallback");
        fallback
    }
}

/// Ratio of `numerator` to `denominator` that never returns `NaN` or an
/// infinity. Ill-conditioned ratios default to `1.0` with a logged warning.
pub fn safe_ratio(numerator: f64, denominator: f64, quantity: &str) -> f64 {
    finite_or_fallback(numerator / denominator, 1.0, quantity)
}

/// Rounds `period` (in samples) to an integer table length, capping it at
/// `max_length` and never returning less than one sample.
pub(crate) fn period_length(period: f64, max_length: usize) -> usize {
    if !period.is_finite() || period >= max_length as f64 {
        return max_length.max(1);
    }
    (period.round() as usize).clamp(1, max_length.max(1))
}

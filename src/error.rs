//! Error types and result utilities for building analytic stream graphs.
//!
//! Errors only surface while a graph is being *constructed*. Once a stream
//! exists, running out of data is reported through a short `read`, and
//! numerical trouble is absorbed by logged fallbacks, so none of the per-sample
//! paths return a `Result`.

use thiserror::Error;

/// Convenience type alias for results that may contain an [`AnalyticError`].
pub type AnalyticResult<T> = Result<T, AnalyticError>;

/// Error types that can occur while configuring analytic streams.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticError {
    /// A parameter was outside the range the stream can work with.
    ///
    /// This includes cases like negative durations, non-positive rates, or a
    /// window ramp that does not fit inside the window.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Human readable explanation.
        reason: String,
    },

    /// Two streams that must be combined run at different sampling rates.
    #[error("Sampling rate mismatch: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch {
        /// Sampling rate of the first stream.
        expected: f64,
        /// Sampling rate of the stream that disagreed.
        actual: f64,
    },

    /// The operation needs a finite stream but was handed an unbounded one.
    #[error("Unbounded stream: {0}")]
    UnboundedStream(String),

    /// A combinator was constructed without any input.
    #[error("Empty input: {0}")]
    EmptyInput(String),
}

impl AnalyticError {
    /// Create an [`AnalyticError::InvalidParameter`].
    pub fn invalid_parameter(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }

    /// Create an [`AnalyticError::SampleRateMismatch`].
    pub const fn sample_rate_mismatch(expected: f64, actual: f64) -> Self {
        Self::SampleRateMismatch { expected, actual }
    }
}

/// Fail with [`AnalyticError::InvalidParameter`] unless `value` is finite and
/// strictly positive.
pub(crate) fn require_positive(parameter: &'static str, value: f64) -> AnalyticResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AnalyticError::invalid_parameter(
            parameter,
            format!("must be finite and > 0, got {value}"),
        ))
    }
}

/// Fail with [`AnalyticError::InvalidParameter`] unless `value` is finite and
/// not negative.
pub(crate) fn require_non_negative(parameter: &'static str, value: f64) -> AnalyticResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AnalyticError::invalid_parameter(
            parameter,
            format!("must be finite and >= 0, got {value}"),
        ))
    }
}

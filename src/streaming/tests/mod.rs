//! Cross-component tests for stream graphs.
//!
//! Unit tests live next to each stream; these check the properties every
//! stream has to share (restartability, exact seeking, fork transparency,
//! long-run phase accuracy) on whole graphs.

use super::rms::{read_all, read_samples};
use super::traits::{AnalyticSample, AnalyticStream};

mod fork_tests;
mod init_tests;

/// Sampling rate used by the graph tests.
pub(crate) const FS: f64 = 44100.0;

/// Reads `count` samples from the start, then again after a reset, and
/// checks both runs agree exactly.
pub(crate) fn assert_restartable<S: AnalyticStream + ?Sized>(stream: &mut S, count: usize) {
    stream.reset();
    let first = read_prefix(stream, count);
    stream.reset();
    let second = read_prefix(stream, count);
    assert_eq!(first.len(), second.len(), "restart changed the stream length");
    assert_eq!(first, second, "restart changed the stream contents");
}

/// Seeks to every position in `positions` and compares one sample with a
/// straight read from the start.
pub(crate) fn assert_seek_matches<S: AnalyticStream + ?Sized>(
    stream: &mut S,
    positions: &[usize],
    tolerance: f64,
) {
    let furthest = positions.iter().copied().max().unwrap_or(0) + 1;
    stream.reset();
    let straight = read_prefix(stream, furthest);
    for &position in positions {
        stream.seek(position);
        let sample = read_samples(stream, 1);
        match straight.get(position) {
            Some(expected) => {
                assert_eq!(sample.len(), 1, "no sample at position {position}");
                let error = (sample[0] - expected).norm();
                assert!(
                    error <= tolerance,
                    "position {position}: got {}, expected {expected} (error {error})",
                    sample[0]
                );
            }
            None => assert!(sample.is_empty(), "sample past the end at {position}"),
        }
    }
}

/// Up to `count` samples from the current position; bounded streams stop at
/// their end.
pub(crate) fn read_prefix<S: AnalyticStream + ?Sized>(stream: &mut S, count: usize) -> Vec<AnalyticSample> {
    match stream.samples() {
        Some(total) if total <= count => read_all(stream).unwrap_or_default(),
        _ => read_samples(stream, count),
    }
}

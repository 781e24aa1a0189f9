//! RMS calculation and memoisation for streams.
//!
//! Computing the RMS of most filters means traversing the whole stream, so
//! streams keep the result in an [`RmsCache`] and only ever walk themselves
//! once. An unbounded stream without a closed-form RMS reports `NaN`, which is
//! what level-calibration code branches on.

use num_traits::Zero;

use super::traits::{AnalyticSample, AnalyticStream, RealStream};

/// Number of samples pulled per `read` while traversing a stream.
pub const TRAVERSAL_CHUNK: usize = 4096;

/// Memoised RMS value; `NaN` means "not yet computed".
#[derive(Debug, Clone, Copy)]
pub struct RmsCache(f64);

impl RmsCache {
    /// An empty cache.
    pub const fn new() -> Self {
        Self(f64::NAN)
    }

    /// The cached value, if one has been computed.
    pub fn get(&self) -> Option<f64> {
        if self.0.is_nan() { None } else { Some(self.0) }
    }

    /// Stores `rms` and hands it back.
    pub fn store(&mut self, rms: f64) -> f64 {
        self.0 = rms;
        rms
    }

    /// Forget the cached value.
    pub fn invalidate(&mut self) {
        self.0 = f64::NAN;
    }
}

impl Default for RmsCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the RMS of the real part of `stream` by traversing it.
///
/// The stream is rewound before and after the traversal, so computing the
/// RMS leaves it at position 0. Unbounded and empty streams yield `NaN`.
pub fn calculate_rms<S: AnalyticStream + ?Sized>(stream: &mut S) -> f64 {
    if stream.samples().is_none() {
        return f64::NAN;
    }

    stream.reset();
    let mut buffer = vec![AnalyticSample::zero(); TRAVERSAL_CHUNK];
    let mut sum_squares = 0.0;
    let mut count = 0usize;
    loop {
        let read = stream.read(&mut buffer);
        if read == 0 {
            break;
        }
        sum_squares += buffer[..read].iter().map(|s| s.re * s.re).sum::<f64>();
        count += read;
    }
    stream.reset();

    if count == 0 {
        f64::NAN
    } else {
        (sum_squares / count as f64).sqrt()
    }
}

/// Computes the RMS of a real stream by traversing it.
///
/// Same rewinding and `NaN` rules as [`calculate_rms`].
pub fn calculate_real_rms<S: RealStream + ?Sized>(stream: &mut S) -> f64 {
    if stream.samples().is_none() {
        return f64::NAN;
    }

    stream.reset();
    let mut buffer = vec![0.0; TRAVERSAL_CHUNK];
    let mut sum_squares = 0.0;
    let mut count = 0usize;
    loop {
        let read = stream.read(&mut buffer);
        if read == 0 {
            break;
        }
        sum_squares += buffer[..read].iter().map(|s| s * s).sum::<f64>();
        count += read;
    }
    stream.reset();

    if count == 0 {
        f64::NAN
    } else {
        (sum_squares / count as f64).sqrt()
    }
}

/// RMS of the real part of an in-memory block of samples (`NaN` when empty).
pub fn block_rms(samples: &[AnalyticSample]) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    let sum_squares: f64 = samples.iter().map(|s| s.re * s.re).sum();
    (sum_squares / samples.len() as f64).sqrt()
}

/// Reads a bounded stream from its current position to the end.
///
/// Returns `None` for unbounded streams, which would never finish.
pub fn read_all<S: AnalyticStream + ?Sized>(stream: &mut S) -> Option<Vec<AnalyticSample>> {
    let expected = stream.samples()?;
    let mut out = Vec::with_capacity(expected);
    let mut buffer = vec![AnalyticSample::zero(); TRAVERSAL_CHUNK];
    loop {
        let read = stream.read(&mut buffer);
        if read == 0 {
            break;
        }
        out.extend_from_slice(&buffer[..read]);
    }
    Some(out)
}

/// Reads exactly `count` samples (or fewer at the end of the stream).
///
/// Works for unbounded streams too.
pub fn read_samples<S: AnalyticStream + ?Sized>(stream: &mut S, count: usize) -> Vec<AnalyticSample> {
    let mut out = vec![AnalyticSample::zero(); count];
    let mut filled = 0;
    while filled < count {
        let read = stream.read(&mut out[filled..]);
        if read == 0 {
            break;
        }
        filled += read;
    }
    out.truncate(filled);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::sources::buffer::AnalyticSampleBuffer;
    use crate::streaming::sources::wave::WaveGenerator;

    #[test]
    fn test_rms_cache_sentinel() {
        let mut cache = RmsCache::new();
        assert!(cache.get().is_none());
        assert_eq!(cache.store(0.5), 0.5);
        assert_eq!(cache.get(), Some(0.5));
        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_calculate_rms_of_constant_buffer() {
        let samples = vec![AnalyticSample::new(0.5, 0.0); 10_000];
        let mut stream = AnalyticSampleBuffer::new(samples, 1000.0);
        let rms = calculate_rms(&mut stream);
        assert!((rms - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_rms_rewinds_stream() {
        let samples: Vec<_> = (0..100).map(|i| AnalyticSample::new(i as f64, 0.0)).collect();
        let mut stream = AnalyticSampleBuffer::new(samples, 1000.0);
        let _ = read_samples(&mut stream, 40);
        let _ = calculate_rms(&mut stream);
        let first = read_samples(&mut stream, 1);
        assert_eq!(first[0], AnalyticSample::new(0.0, 0.0));
    }

    #[test]
    fn test_unbounded_rms_is_nan() {
        let mut wave = WaveGenerator::new(1.0, 100.0, 0.0, 1000.0).unwrap();
        assert!(calculate_rms(&mut wave).is_nan());
        assert!(read_all(&mut wave).is_none());
    }

    #[test]
    fn test_empty_stream_rms_is_nan() {
        let mut stream = AnalyticSampleBuffer::new(Vec::new(), 1000.0);
        assert!(calculate_rms(&mut stream).is_nan());
        assert!(block_rms(&[]).is_nan());
    }

    #[test]
    fn test_read_samples_stops_at_end() {
        let samples = vec![AnalyticSample::new(1.0, 0.0); 10];
        let mut stream = AnalyticSampleBuffer::new(samples, 1000.0);
        assert_eq!(read_samples(&mut stream, 25).len(), 10);
        assert_eq!(read_samples(&mut stream, 5).len(), 0);
    }
}

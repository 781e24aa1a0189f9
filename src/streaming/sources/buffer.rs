//! In-memory finite streams.

use crate::streaming::rms::{RmsCache, block_rms};
use crate::streaming::traits::{AnalyticSample, AnalyticStream, RealStream};

/// A finite analytic stream backed by a `Vec` of samples.
#[derive(Debug, Clone)]
pub struct AnalyticSampleBuffer {
    samples: Vec<AnalyticSample>,
    sampling_rate: f64,
    position: usize,
    rms: RmsCache,
}

impl AnalyticSampleBuffer {
    /// Wrap `samples` recorded at `sampling_rate`.
    pub const fn new(samples: Vec<AnalyticSample>, sampling_rate: f64) -> Self {
        Self {
            samples,
            sampling_rate,
            position: 0,
            rms: RmsCache::new(),
        }
    }

    /// The backing samples.
    pub fn as_slice(&self) -> &[AnalyticSample] {
        &self.samples
    }
}

impl AnalyticStream for AnalyticSampleBuffer {
    fn samples(&self) -> Option<usize> {
        Some(self.samples.len())
    }

    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        let start = self.position.min(self.samples.len());
        let count = buffer.len().min(self.samples.len() - start);
        buffer[..count].copy_from_slice(&self.samples[start..start + count]);
        self.position = start + count;
        count
    }

    fn reset(&mut self) {
        self.position = 0;
    }

    fn seek(&mut self, position: usize) {
        self.position = position;
    }

    fn rms(&mut self) -> f64 {
        if let Some(rms) = self.rms.get() {
            return rms;
        }
        let rms = block_rms(&self.samples);
        self.rms.store(rms)
    }

    fn initialize(&mut self) {}
}

/// A finite real stream backed by a `Vec` of samples.
#[derive(Debug, Clone)]
pub struct RealSampleBuffer {
    samples: Vec<f64>,
    sampling_rate: f64,
    position: usize,
}

impl RealSampleBuffer {
    /// Wrap `samples` recorded at `sampling_rate`.
    pub const fn new(samples: Vec<f64>, sampling_rate: f64) -> Self {
        Self {
            samples,
            sampling_rate,
            position: 0,
        }
    }
}

impl RealStream for RealSampleBuffer {
    fn samples(&self) -> Option<usize> {
        Some(self.samples.len())
    }

    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn read(&mut self, buffer: &mut [f64]) -> usize {
        let start = self.position.min(self.samples.len());
        let count = buffer.len().min(self.samples.len() - start);
        buffer[..count].copy_from_slice(&self.samples[start..start + count]);
        self.position = start + count;
        count
    }

    fn reset(&mut self) {
        self.position = 0;
    }

    fn seek(&mut self, position: usize) {
        self.position = position;
    }

    fn rms(&mut self) -> f64 {
        if self.samples.is_empty() {
            return f64::NAN;
        }
        let sum_squares: f64 = self.samples.iter().map(|s| s * s).sum();
        (sum_squares / self.samples.len() as f64).sqrt()
    }

    fn initialize(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_read_seek_reset() {
        let samples: Vec<_> = (0..10).map(|i| AnalyticSample::new(i as f64, -(i as f64))).collect();
        let mut stream = AnalyticSampleBuffer::new(samples, 100.0);

        let mut out = [AnalyticSample::new(0.0, 0.0); 4];
        assert_eq!(stream.read(&mut out), 4);
        assert_eq!(out[3], AnalyticSample::new(3.0, -3.0));

        stream.seek(8);
        assert_eq!(stream.read(&mut out), 2);
        assert_eq!(out[0], AnalyticSample::new(8.0, -8.0));
        assert_eq!(stream.read(&mut out), 0);

        stream.seek(50);
        assert_eq!(stream.read(&mut out), 0);

        stream.reset();
        assert_eq!(stream.read(&mut out), 4);
        assert_eq!(out[0], AnalyticSample::new(0.0, 0.0));
    }

    #[test]
    fn test_real_buffer_rms() {
        let mut stream = RealSampleBuffer::new(vec![1.0, -1.0, 1.0, -1.0], 100.0);
        assert!((stream.rms() - 1.0).abs() < 1e-12);
        assert!(RealSampleBuffer::new(Vec::new(), 100.0).rms().is_nan());
    }
}

//! Sample-wise sum of several streams.

use num_traits::Zero;
use tracing::debug;

use crate::error::{AnalyticError, AnalyticResult};
use crate::streaming::rms::RmsCache;
use crate::streaming::traits::{AnalyticSample, AnalyticStream};

/// Scratch buffer size for pulling from each upstream.
const ADDER_CHUNK: usize = 1024;

/// Sums any number of streams running at the same sampling rate.
///
/// Each upstream is rendered into a scratch buffer and accumulated into the
/// zeroed output. Streams that run out early contribute silence, so the sum
/// lasts as long as the longest input.
///
/// The reported RMS assumes the inputs are uncorrelated: it is the quadrature
/// sum of the upstream RMS values.
///
/// # Examples
///
/// ```rust
/// use analytic_streams::streaming::{Adder, AnalyticStream, WaveGenerator};
///
/// let low = WaveGenerator::new(0.3, 220.0, 0.0, 44100.0).unwrap().boxed();
/// let high = WaveGenerator::new(0.4, 330.0, 0.0, 44100.0).unwrap().boxed();
/// let mut chord = Adder::new(vec![low, high]).unwrap();
/// assert!((chord.rms() - 0.5 / 2.0_f64.sqrt()).abs() < 1e-12);
/// ```
pub struct Adder {
    streams: Vec<Box<dyn AnalyticStream>>,
    sampling_rate: f64,
    scratch: Vec<AnalyticSample>,
    rms: RmsCache,
    initialized: bool,
}

impl Adder {
    /// Sum `streams`.
    ///
    /// # Errors
    /// - [`AnalyticError::EmptyInput`] if `streams` is empty
    /// - [`AnalyticError::SampleRateMismatch`] if the sampling rates differ
    pub fn new(streams: Vec<Box<dyn AnalyticStream>>) -> AnalyticResult<Self> {
        let first = streams
            .first()
            .ok_or_else(|| AnalyticError::EmptyInput("an adder needs at least one stream".to_string()))?;
        let sampling_rate = first.sampling_rate();
        if let Some(other) = streams
            .iter()
            .map(|stream| stream.sampling_rate())
            .find(|&rate| rate != sampling_rate)
        {
            return Err(AnalyticError::sample_rate_mismatch(sampling_rate, other));
        }

        debug!(inputs = streams.len(), sampling_rate, "adder constructed");
        Ok(Self {
            streams,
            sampling_rate,
            scratch: vec![AnalyticSample::zero(); ADDER_CHUNK],
            rms: RmsCache::new(),
            initialized: false,
        })
    }

    /// Number of summed streams.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Always `false`; an adder cannot be built empty.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl AnalyticStream for Adder {
    fn samples(&self) -> Option<usize> {
        self.streams
            .iter()
            .map(|stream| stream.samples())
            .try_fold(0, |longest, samples| samples.map(|n| n.max(longest)))
    }

    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        buffer.fill(AnalyticSample::zero());

        let mut produced = 0;
        for stream in &mut self.streams {
            let mut offset = 0;
            while offset < buffer.len() {
                let chunk = (buffer.len() - offset).min(self.scratch.len());
                let read = stream.read(&mut self.scratch[..chunk]);
                for (out, sample) in buffer[offset..offset + read]
                    .iter_mut()
                    .zip(&self.scratch[..read])
                {
                    *out += *sample;
                }
                offset += read;
                if read < chunk {
                    break;
                }
            }
            produced = produced.max(offset);
        }
        produced
    }

    fn reset(&mut self) {
        for stream in &mut self.streams {
            stream.reset();
        }
    }

    fn seek(&mut self, position: usize) {
        for stream in &mut self.streams {
            stream.seek(position);
        }
    }

    fn rms(&mut self) -> f64 {
        if let Some(rms) = self.rms.get() {
            return rms;
        }
        let sum_squares: f64 = self
            .streams
            .iter_mut()
            .map(|stream| {
                let rms = stream.rms();
                rms * rms
            })
            .sum();
        if self.streams.iter().any(|stream| stream.samples().is_some()) {
            self.reset();
        }
        self.rms.store(sum_squares.sqrt())
    }

    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        for stream in &mut self.streams {
            stream.initialize();
        }
    }
}

//! Conversions between real and analytic streams.
//!
//! [`RealToAnalyticConverter`] builds the analytic signal of a real stream
//! with a pair of linear-phase FIR filters: an in-phase band-pass and its
//! quadrature (Hilbert) counterpart, both windowed with a Blackman window.
//! For a tap offset `t` from the filter centre and band edges `ω1`, `ω2`:
//!
//! ```text
//!   h_I(t) = (sin(ω2 t) - sin(ω1 t)) / (π t)      h_I(0) = (ω2 - ω1) / π
//!   h_Q(t) = (cos(ω1 t) - cos(ω2 t)) / (π t)      h_Q(0) = 0
//! ```
//!
//! The filters are odd-length, so their group delay is a whole number of
//! samples; the converter reads that many samples ahead and its output is
//! aligned with its input.
//!
//! [`AnalyticToEnvelopeConverter`] goes the other way and emits the magnitude
//! of each analytic sample.

use std::f64::consts::PI;

use num_complex::Complex64;
use num_traits::Zero;
use tracing::debug;

use crate::error::{AnalyticError, AnalyticResult};
use crate::streaming::rms::{RmsCache, TRAVERSAL_CHUNK, calculate_real_rms, calculate_rms};
use crate::streaming::traits::{AnalyticSample, AnalyticStream, RealStream};
use crate::utils::window::WindowShape;

/// Default number of FIR taps.
pub const DEFAULT_FILTER_TAPS: usize = 127;

/// Lower band edge as a fraction of the Nyquist frequency.
pub const LOWER_BAND_EDGE: f64 = 0.02;

/// Upper band edge as a fraction of the Nyquist frequency.
pub const UPPER_BAND_EDGE: f64 = 0.98;

/// Windowed band-pass/Hilbert coefficient pair, packed as complex taps
/// (`re` in-phase, `im` quadrature) in *reversed* order, so that the oldest
/// sample of the history window multiplies the first entry.
fn analytic_filter(taps: usize) -> Vec<Complex64> {
    let centre = (taps / 2) as f64;
    let low = LOWER_BAND_EDGE * PI;
    let high = UPPER_BAND_EDGE * PI;
    let window = WindowShape::Blackman.full_window(taps);

    let mut filter: Vec<Complex64> = (0..taps)
        .map(|k| {
            let t = k as f64 - centre;
            let (in_phase, quadrature) = if t == 0.0 {
                ((high - low) / PI, 0.0)
            } else {
                (
                    ((high * t).sin() - (low * t).sin()) / (PI * t),
                    ((low * t).cos() - (high * t).cos()) / (PI * t),
                )
            };
            Complex64::new(in_phase, quadrature) * window[k]
        })
        .collect();
    filter.reverse();
    filter
}

/// Turns a real stream into an analytic one.
///
/// # Examples
///
/// ```rust
/// use analytic_streams::streaming::{AnalyticStream, RealSampleBuffer, RealToAnalyticConverter};
///
/// let tone: Vec<f64> = (0..4410)
///     .map(|n| (2.0 * std::f64::consts::PI * 3000.0 * n as f64 / 44100.0).cos())
///     .collect();
/// let real = RealSampleBuffer::new(tone, 44100.0);
/// let mut analytic = RealToAnalyticConverter::new(Box::new(real));
/// assert_eq!(analytic.samples(), Some(4410));
/// ```
pub struct RealToAnalyticConverter {
    upstream: Box<dyn RealStream>,
    filter: Vec<Complex64>,
    delay: usize,

    /// Twice the filter length; every input is written at `head` and
    /// `head + taps` so the current window is always one contiguous slice.
    history: Vec<f64>,
    head: usize,

    pending: Vec<f64>,
    pending_start: usize,
    pending_len: usize,

    next_input: usize,
    input_end: Option<usize>,
    position: usize,
    rms: RmsCache,
    initialized: bool,
}

impl RealToAnalyticConverter {
    /// Convert `upstream` with the default filter length.
    pub fn new(upstream: Box<dyn RealStream>) -> Self {
        Self::build(upstream, DEFAULT_FILTER_TAPS)
    }

    /// Convert `upstream` with a filter of `taps` coefficients.
    ///
    /// # Errors
    /// Returns an error unless `taps` is odd and at least 3.
    pub fn with_taps(upstream: Box<dyn RealStream>, taps: usize) -> AnalyticResult<Self> {
        if taps < 3 || taps % 2 == 0 {
            return Err(AnalyticError::invalid_parameter(
                "taps",
                format!("filter length must be odd and at least 3, got {taps}"),
            ));
        }
        Ok(Self::build(upstream, taps))
    }

    fn build(upstream: Box<dyn RealStream>, taps: usize) -> Self {
        let filter = analytic_filter(taps);
        debug!(taps, "real to analytic filter designed");
        let mut converter = Self {
            input_end: upstream.samples(),
            upstream,
            filter,
            delay: taps / 2,
            history: vec![0.0; 2 * taps],
            head: 0,
            pending: vec![0.0; TRAVERSAL_CHUNK],
            pending_start: 0,
            pending_len: 0,
            next_input: 0,
            position: 0,
            rms: RmsCache::new(),
            initialized: false,
        };
        converter.prime(0);
        converter
    }

    /// Number of filter taps.
    pub fn taps(&self) -> usize {
        self.filter.len()
    }

    /// Next real input sample, or silence past the end of the upstream.
    fn pull(&mut self) -> f64 {
        let index = self.next_input;
        self.next_input += 1;
        if self.input_end.is_some_and(|end| index >= end) {
            return 0.0;
        }
        if self.pending_start == self.pending_len {
            self.pending_start = 0;
            self.pending_len = self.upstream.read(&mut self.pending);
            if self.pending_len == 0 {
                self.input_end = Some(index);
                return 0.0;
            }
        }
        let value = self.pending[self.pending_start];
        self.pending_start += 1;
        value
    }

    fn push(&mut self, value: f64) {
        let taps = self.filter.len();
        self.head = (self.head + 1) % taps;
        self.history[self.head] = value;
        self.history[self.head + taps] = value;
    }

    fn convolve(&self) -> AnalyticSample {
        let taps = self.filter.len();
        let window = &self.history[self.head + 1..self.head + 1 + taps];
        window
            .iter()
            .zip(&self.filter)
            .fold(AnalyticSample::zero(), |acc, (x, h)| acc + *h * *x)
    }

    /// Refill the history so the next output is sample `position`.
    fn prime(&mut self, position: usize) {
        let taps = self.filter.len();
        let newest = position + self.delay;
        let oldest = (newest + 1).saturating_sub(taps);

        if oldest == 0 {
            self.upstream.reset();
        } else {
            self.upstream.seek(oldest);
        }
        self.history.fill(0.0);
        self.head = 0;
        self.pending_start = 0;
        self.pending_len = 0;
        self.next_input = oldest;
        self.input_end = self.upstream.samples();
        self.position = position;

        // Everything up to, but not including, the sample for `position`.
        while self.next_input < newest {
            let value = self.pull();
            self.push(value);
        }
    }
}

impl AnalyticStream for RealToAnalyticConverter {
    fn samples(&self) -> Option<usize> {
        self.upstream.samples()
    }

    fn sampling_rate(&self) -> f64 {
        self.upstream.sampling_rate()
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        let mut written = 0;
        while written < buffer.len() {
            if self.input_end.is_some_and(|end| self.position >= end) {
                break;
            }
            let value = self.pull();
            self.push(value);
            if self.input_end.is_some_and(|end| self.position >= end) {
                break;
            }
            buffer[written] = self.convolve();
            self.position += 1;
            written += 1;
        }
        written
    }

    fn reset(&mut self) {
        self.prime(0);
    }

    fn seek(&mut self, position: usize) {
        self.prime(position);
    }

    fn rms(&mut self) -> f64 {
        if let Some(rms) = self.rms.get() {
            return rms;
        }
        let rms = if self.samples().is_some() {
            calculate_rms(self)
        } else {
            self.upstream.rms()
        };
        self.rms.store(rms)
    }

    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.upstream.initialize();
    }
}

/// Emits the magnitude of every sample of an analytic stream.
pub struct AnalyticToEnvelopeConverter {
    upstream: Box<dyn AnalyticStream>,
    scratch: Vec<AnalyticSample>,
    rms: RmsCache,
    initialized: bool,
}

impl AnalyticToEnvelopeConverter {
    /// Track the envelope of `upstream`.
    pub fn new(upstream: Box<dyn AnalyticStream>) -> Self {
        Self {
            upstream,
            scratch: vec![AnalyticSample::zero(); TRAVERSAL_CHUNK],
            rms: RmsCache::new(),
            initialized: false,
        }
    }
}

impl RealStream for AnalyticToEnvelopeConverter {
    fn samples(&self) -> Option<usize> {
        self.upstream.samples()
    }

    fn sampling_rate(&self) -> f64 {
        self.upstream.sampling_rate()
    }

    fn read(&mut self, buffer: &mut [f64]) -> usize {
        let mut written = 0;
        while written < buffer.len() {
            let chunk = (buffer.len() - written).min(self.scratch.len());
            let read = self.upstream.read(&mut self.scratch[..chunk]);
            for (out, sample) in buffer[written..written + read].iter_mut().zip(&self.scratch) {
                *out = sample.norm();
            }
            written += read;
            if read < chunk {
                break;
            }
        }
        written
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn seek(&mut self, position: usize) {
        self.upstream.seek(position);
    }

    fn rms(&mut self) -> f64 {
        if let Some(rms) = self.rms.get() {
            return rms;
        }
        if self.samples().is_none() {
            return f64::NAN;
        }
        let rms = calculate_real_rms(self);
        self.rms.store(rms)
    }

    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.upstream.initialize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::rms::{read_all, read_samples};
    use crate::streaming::sources::buffer::{AnalyticSampleBuffer, RealSampleBuffer};
    use crate::streaming::sources::wave::WaveGenerator;
    use std::cell::Cell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    const FS: f64 = 44100.0;

    /// Real buffer that counts how often it is rewound or seeked.
    struct RepositionCounter {
        inner: RealSampleBuffer,
        repositions: Rc<Cell<usize>>,
    }

    impl RealStream for RepositionCounter {
        fn samples(&self) -> Option<usize> {
            self.inner.samples()
        }

        fn sampling_rate(&self) -> f64 {
            self.inner.sampling_rate()
        }

        fn read(&mut self, buffer: &mut [f64]) -> usize {
            self.inner.read(buffer)
        }

        fn reset(&mut self) {
            self.repositions.set(self.repositions.get() + 1);
            self.inner.reset();
        }

        fn seek(&mut self, position: usize) {
            self.repositions.set(self.repositions.get() + 1);
            self.inner.seek(position);
        }

        fn rms(&mut self) -> f64 {
            self.inner.rms()
        }

        fn initialize(&mut self) {
            self.inner.initialize();
        }
    }

    fn cosine(frequency: f64, len: usize) -> Box<dyn RealStream> {
        let samples = (0..len)
            .map(|n| (TAU * frequency * n as f64 / FS).cos())
            .collect();
        RealSampleBuffer::new(samples, FS).boxed()
    }

    #[test]
    fn test_filter_symmetry() {
        let filter = analytic_filter(DEFAULT_FILTER_TAPS);
        let n = filter.len();
        for k in 0..n {
            assert!((filter[k].re - filter[n - 1 - k].re).abs() < 1e-15);
            assert!((filter[k].im + filter[n - 1 - k].im).abs() < 1e-15);
        }
        assert_eq!(filter[n / 2].im, 0.0);
    }

    #[test]
    fn test_cosine_becomes_rotating_phasor() {
        let mut analytic = RealToAnalyticConverter::new(cosine(5000.0, 2000));
        let out = read_all(&mut analytic).unwrap();
        assert_eq!(out.len(), 2000);
        for (n, sample) in out.iter().enumerate().take(1800).skip(200) {
            let expected = Complex64::from_polar(1.0, TAU * 5000.0 * n as f64 / FS);
            assert!((sample - expected).norm() < 1e-2, "sample {n}: {sample}");
        }
    }

    #[test]
    fn test_seek_reprimes_history() {
        let mut analytic = RealToAnalyticConverter::new(cosine(2500.0, 1000));
        let straight = read_all(&mut analytic).unwrap();
        for &position in &[0usize, 10, 63, 64, 500, 990, 999] {
            analytic.seek(position);
            let sample = read_samples(&mut analytic, 1)[0];
            assert!((sample - straight[position]).norm() < 1e-12, "position {position}");
        }
        analytic.seek(1000);
        assert!(read_samples(&mut analytic, 1).is_empty());
        analytic.reset();
        assert_eq!(read_all(&mut analytic).unwrap(), straight);
    }

    #[test]
    fn test_custom_taps() {
        assert!(RealToAnalyticConverter::with_taps(cosine(1000.0, 10), 64).is_err());
        assert!(RealToAnalyticConverter::with_taps(cosine(1000.0, 10), 1).is_err());
        let mut short = RealToAnalyticConverter::with_taps(cosine(1000.0, 10), 31).unwrap();
        assert_eq!(short.taps(), 31);
        assert_eq!(read_all(&mut short).unwrap().len(), 10);
    }

    #[test]
    fn test_custom_taps_primes_upstream_once() {
        let repositions = Rc::new(Cell::new(0));
        let upstream = RepositionCounter {
            inner: RealSampleBuffer::new(vec![0.5; 1000], FS),
            repositions: Rc::clone(&repositions),
        };
        let mut converter = RealToAnalyticConverter::with_taps(upstream.boxed(), 31).unwrap();
        assert_eq!(converter.taps(), 31);
        assert_eq!(repositions.get(), 1);

        converter.seek(400);
        assert_eq!(repositions.get(), 2);
    }

    #[test]
    fn test_envelope_of_tone_is_flat() {
        let wave = WaveGenerator::new(0.25, 440.0, 0.0, FS).unwrap().boxed();
        let mut envelope = AnalyticToEnvelopeConverter::new(wave);
        let mut buffer = vec![0.0; 10_000];
        assert_eq!(envelope.read(&mut buffer), 10_000);
        assert!(buffer.iter().all(|m| (m - 0.25).abs() < 1e-12));
        assert!(envelope.rms().is_nan());
    }

    #[test]
    fn test_envelope_of_buffer() {
        let samples = vec![
            AnalyticSample::new(3.0, 4.0),
            AnalyticSample::new(0.0, -2.0),
            AnalyticSample::new(-1.0, 0.0),
        ];
        let mut envelope = AnalyticToEnvelopeConverter::new(AnalyticSampleBuffer::new(samples, FS).boxed());
        let mut buffer = [0.0; 8];
        assert_eq!(envelope.read(&mut buffer), 3);
        assert_eq!(&buffer[..3], &[5.0, 2.0, 1.0]);
        envelope.seek(1);
        assert_eq!(envelope.read(&mut buffer), 2);
        assert_eq!(buffer[0], 2.0);
        assert!((envelope.rms() - (30.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }
}

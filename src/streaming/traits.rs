//! Core traits for pull-based analytic and real sample streams.

use num_complex::Complex64;

/// One analytic-signal sample.
///
/// The real part is the audible signal, the imaginary part its Hilbert
/// transform. All stream arithmetic (sums, gains, phasor rotation, magnitude,
/// polar construction) is plain complex arithmetic on this type.
pub type AnalyticSample = Complex64;

/// A lazily evaluated, seekable sequence of analytic samples.
///
/// Streams form a decorator chain: every filter owns its upstream stream(s)
/// and pulls from them synchronously inside [`read`](AnalyticStream::read).
/// Dropping a filter drops everything upstream of it.
///
/// # Contract
///
/// - `read` fills at most `buffer.len()` samples and returns the count. It
///   returns fewer only at the end of the stream; `0` means exhausted.
/// - After `reset`, the next `read` behaves as if nothing had been consumed.
/// - After `seek(p)`, the next `read` starts with the sample at logical
///   position `p`. Unbounded streams accept any position.
/// - `initialize` is idempotent and initialises upstream streams before the
///   stream's own one-time setup.
/// - `rms` is memoised and returns `NaN` when the RMS is undefined. The
///   first call on a bounded stream may traverse it, which leaves the stream
///   rewound to position 0.
pub trait AnalyticStream {
    /// Total number of samples, or `None` for an unbounded stream.
    fn samples(&self) -> Option<usize>;

    /// Sampling rate in Hz.
    fn sampling_rate(&self) -> f64;

    /// Read up to `buffer.len()` samples into `buffer`, returning the number
    /// written.
    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize;

    /// Rewind to the first sample.
    fn reset(&mut self);

    /// Move to logical sample `position`.
    fn seek(&mut self, position: usize);

    /// RMS of the real part of the stream, or `NaN` if undefined.
    fn rms(&mut self) -> f64;

    /// Run one-time setup for this stream and everything upstream of it.
    fn initialize(&mut self);

    /// Box this stream for use as a filter's upstream.
    fn boxed(self) -> Box<dyn AnalyticStream>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

impl<S: AnalyticStream + ?Sized> AnalyticStream for Box<S> {
    fn samples(&self) -> Option<usize> {
        (**self).samples()
    }

    fn sampling_rate(&self) -> f64 {
        (**self).sampling_rate()
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        (**self).read(buffer)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn seek(&mut self, position: usize) {
        (**self).seek(position)
    }

    fn rms(&mut self) -> f64 {
        (**self).rms()
    }

    fn initialize(&mut self) {
        (**self).initialize()
    }
}

/// A lazily evaluated, seekable sequence of real samples.
///
/// Same contract as [`AnalyticStream`]; used on the real side of the
/// real/analytic converters.
pub trait RealStream {
    /// Total number of samples, or `None` for an unbounded stream.
    fn samples(&self) -> Option<usize>;

    /// Sampling rate in Hz.
    fn sampling_rate(&self) -> f64;

    /// Read up to `buffer.len()` samples into `buffer`, returning the number
    /// written.
    fn read(&mut self, buffer: &mut [f64]) -> usize;

    /// Rewind to the first sample.
    fn reset(&mut self);

    /// Move to logical sample `position`.
    fn seek(&mut self, position: usize);

    /// RMS of the stream, or `NaN` if undefined.
    fn rms(&mut self) -> f64;

    /// Run one-time setup for this stream and everything upstream of it.
    fn initialize(&mut self);

    /// Box this stream for use as a converter's upstream.
    fn boxed(self) -> Box<dyn RealStream>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

impl<S: RealStream + ?Sized> RealStream for Box<S> {
    fn samples(&self) -> Option<usize> {
        (**self).samples()
    }

    fn sampling_rate(&self) -> f64 {
        (**self).sampling_rate()
    }

    fn read(&mut self, buffer: &mut [f64]) -> usize {
        (**self).read(buffer)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn seek(&mut self, position: usize) {
        (**self).seek(position)
    }

    fn rms(&mut self) -> f64 {
        (**self).rms()
    }

    fn initialize(&mut self) {
        (**self).initialize()
    }
}

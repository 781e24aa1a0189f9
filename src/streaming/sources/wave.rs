//! Periodic complex tone generator.

use std::f64::consts::SQRT_2;

use tracing::debug;

use crate::error::{AnalyticError, AnalyticResult, require_positive};
use crate::streaming::phasor::PhasorTable;
use crate::streaming::traits::{AnalyticSample, AnalyticStream};

/// An unbounded analytic tone `amplitude * e^{i(phase + 2π f n / fs)}`.
///
/// One period is precomputed; the per-cycle residual phase is corrected at
/// every wrap, so the tone never drifts away from the exact frequency.
///
/// # Examples
///
/// ```rust
/// use analytic_streams::streaming::{AnalyticStream, WaveGenerator};
/// use num_complex::Complex64;
///
/// let mut wave = WaveGenerator::new(1.0, 440.0, 0.0, 44100.0).unwrap();
/// let mut buffer = vec![Complex64::new(0.0, 0.0); 64];
/// assert_eq!(wave.read(&mut buffer), 64);
/// assert!((wave.rms() - 1.0 / 2.0_f64.sqrt()).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct WaveGenerator {
    amplitude: f64,
    frequency: f64,
    phase: f64,
    sampling_rate: f64,
    phasor: PhasorTable,
}

impl WaveGenerator {
    /// Create a tone generator.
    ///
    /// # Arguments
    /// * `amplitude` - Peak magnitude of the complex tone
    /// * `frequency` - Frequency in Hz; negative frequencies rotate clockwise
    /// * `phase` - Starting phase in radians
    /// * `sampling_rate` - Sampling rate in Hz
    ///
    /// # Errors
    /// Returns an error if the sampling rate is not positive or any parameter
    /// is not finite.
    pub fn new(
        amplitude: f64,
        frequency: f64,
        phase: f64,
        sampling_rate: f64,
    ) -> AnalyticResult<Self> {
        let sampling_rate = require_positive("sampling_rate", sampling_rate)?;
        for (parameter, value) in [
            ("amplitude", amplitude),
            ("frequency", frequency),
            ("phase", phase),
        ] {
            if !value.is_finite() {
                return Err(AnalyticError::invalid_parameter(
                    parameter,
                    format!("must be finite, got {value}"),
                ));
            }
        }

        let phasor = PhasorTable::new(amplitude, frequency, phase, sampling_rate);
        debug!(
            frequency,
            period = phasor.period(),
            cycle_partial = phasor.cycle_partial(),
            "wave generator table built"
        );

        Ok(Self {
            amplitude,
            frequency,
            phase,
            sampling_rate,
            phasor,
        })
    }

    /// Peak magnitude.
    pub const fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Frequency in Hz.
    pub const fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Starting phase in radians.
    pub const fn phase(&self) -> f64 {
        self.phase
    }

    /// Length of the precomputed period in samples.
    pub fn period_samples(&self) -> usize {
        self.phasor.period()
    }
}

impl AnalyticStream for WaveGenerator {
    fn samples(&self) -> Option<usize> {
        None
    }

    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        self.phasor.fill(buffer);
        buffer.len()
    }

    fn reset(&mut self) {
        self.phasor.reset();
    }

    fn seek(&mut self, position: usize) {
        self.phasor.seek(position);
    }

    fn rms(&mut self) -> f64 {
        self.amplitude.abs() / SQRT_2
    }

    fn initialize(&mut self) {}
}

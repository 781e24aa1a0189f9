//! Coloured noise synthesised in the frequency domain.
//!
//! Noise is built from a dense set of carrier tones, log-spaced between a
//! lower and an upper frequency. Each tone gets a Rayleigh-distributed
//! magnitude and a uniformly distributed phase (a circular complex Gaussian),
//! tilted by the requested colour. The tones are dropped into the positive
//! half of a power-of-two spectrum and inverse-transformed once, which yields
//! an analytic signal directly. The result is rescaled to the requested RMS
//! and then played back as a repeating buffer.
//!
//! Log-spaced tones have a density proportional to `1/f` per Hz, so the tilt
//! exponents carry an extra `+0.5` relative to the textbook spectral slopes:
//!
//! | colour | power density | amplitude tilt |
//! |--------|---------------|----------------|
//! | Violet | `f^2`         | `f^1.5`        |
//! | Blue   | `f`           | `f^1`          |
//! | White  | flat          | `f^0.5`        |
//! | Pink   | `1/f`         | `f^0`          |
//! | Brown  | `1/f^2`       | `f^-0.5`       |

use num_traits::Zero;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rustfft::FftPlanner;
#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AnalyticError, AnalyticResult, require_positive};
use crate::streaming::rms::block_rms;
use crate::streaming::traits::{AnalyticSample, AnalyticStream};

/// Minimum number of periods of the lowest frequency the buffer must span.
pub const MIN_PERIODS_IN_BUFFER: f64 = 10.0;

/// Upper bound on the synthesis buffer length.
pub const MAX_BUFFER_LENGTH: usize = 1 << 22;

/// Spectral colour of the generated noise.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseColor {
    /// Power rising 6 dB per octave.
    Violet,
    /// Power rising 3 dB per octave.
    Blue,
    /// Flat power density.
    White,
    /// Power falling 3 dB per octave.
    #[default]
    Pink,
    /// Power falling 6 dB per octave.
    Brown,
}

impl NoiseColor {
    /// Exponent applied to each log-spaced carrier's frequency.
    pub const fn amplitude_exponent(self) -> f64 {
        match self {
            Self::Violet => 1.5,
            Self::Blue => 1.0,
            Self::White => 0.5,
            Self::Pink => 0.0,
            Self::Brown => -0.5,
        }
    }
}

/// One frequency-domain component of the noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarrierTone {
    /// Frequency in Hz.
    pub frequency: f64,
    /// Complex amplitude (magnitude and phase) of the component.
    pub amplitude: AnalyticSample,
}

/// Configuration for a [`NoiseGenerator`].
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseConfig {
    /// Lowest carrier frequency in Hz.
    pub lower_frequency: f64,
    /// Highest carrier frequency in Hz.
    pub upper_frequency: f64,
    /// Spectral colour.
    pub color: NoiseColor,
    /// Target RMS of the real part.
    pub rms: f64,
    /// Seed for reproducible noise; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            lower_frequency: 20.0,
            upper_frequency: 20_000.0,
            color: NoiseColor::Pink,
            rms: 0.1,
            seed: None,
        }
    }
}

impl NoiseConfig {
    /// Set the frequency band.
    pub fn with_band(mut self, lower_frequency: f64, upper_frequency: f64) -> Self {
        self.lower_frequency = lower_frequency;
        self.upper_frequency = upper_frequency;
        self
    }

    /// Set the colour.
    pub fn with_color(mut self, color: NoiseColor) -> Self {
        self.color = color;
        self
    }

    /// Set the target RMS.
    pub fn with_rms(mut self, rms: f64) -> Self {
        self.rms = rms;
        self
    }

    /// Fix the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Repeating buffer of frequency-domain synthesised noise.
///
/// Synthesis happens in [`initialize`](AnalyticStream::initialize); reading
/// an uninitialised generator initialises it first.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    config: NoiseConfig,
    sampling_rate: f64,
    buffer_length: usize,
    buffer: Vec<AnalyticSample>,
    position: usize,
    rms: f64,
    initialized: bool,
}

impl NoiseGenerator {
    /// Create a noise generator.
    ///
    /// # Errors
    /// Returns an error if the sampling rate or RMS is not positive, or the
    /// band is empty, non-positive, or reaches above Nyquist.
    pub fn new(config: NoiseConfig, sampling_rate: f64) -> AnalyticResult<Self> {
        let sampling_rate = require_positive("sampling_rate", sampling_rate)?;
        require_positive("rms", config.rms)?;
        require_positive("lower_frequency", config.lower_frequency)?;
        require_positive("upper_frequency", config.upper_frequency)?;
        if config.lower_frequency >= config.upper_frequency {
            return Err(AnalyticError::invalid_parameter(
                "lower_frequency",
                format!(
                    "must be below upper_frequency ({} >= {})",
                    config.lower_frequency, config.upper_frequency
                ),
            ));
        }
        if config.upper_frequency > sampling_rate / 2.0 {
            return Err(AnalyticError::invalid_parameter(
                "upper_frequency",
                format!(
                    "must not exceed Nyquist ({} > {})",
                    config.upper_frequency,
                    sampling_rate / 2.0
                ),
            ));
        }

        let required = (MIN_PERIODS_IN_BUFFER * sampling_rate / config.lower_frequency).ceil();
        let buffer_length = if required >= MAX_BUFFER_LENGTH as f64 {
            warn!(
                lower_frequency = config.lower_frequency,
                buffer_length = MAX_BUFFER_LENGTH,
                "noise buffer capped; lowest frequency spans fewer than 10 periods"
            );
            MAX_BUFFER_LENGTH
        } else {
            (required as usize).next_power_of_two()
        };

        Ok(Self {
            config,
            sampling_rate,
            buffer_length,
            buffer: Vec::new(),
            position: 0,
            rms: f64::NAN,
            initialized: false,
        })
    }

    /// The generator configuration.
    pub const fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// Length of the repeating buffer in samples.
    pub const fn buffer_length(&self) -> usize {
        self.buffer_length
    }

    /// Frequency resolution of the synthesis spectrum in Hz.
    pub fn bin_width(&self) -> f64 {
        self.sampling_rate / self.buffer_length as f64
    }

    /// Draws the log-spaced carrier tones for this configuration.
    ///
    /// Consecutive tones are one frequency bin apart at the upper band edge,
    /// so every bin of the top octave is covered.
    pub fn carrier_tones<R: Rng>(&self, rng: &mut R) -> Vec<CarrierTone> {
        let lower = self.config.lower_frequency;
        let upper = self.config.upper_frequency;
        let span = (upper / lower).ln();
        let step = (1.0 + self.bin_width() / upper).ln();
        let count = ((span / step).ceil() as usize + 1).max(2);
        let exponent = self.config.color.amplitude_exponent();

        (0..count)
            .map(|k| {
                let frequency = lower * (span * k as f64 / (count - 1) as f64).exp();
                let re: f64 = rng.sample(StandardNormal);
                let im: f64 = rng.sample(StandardNormal);
                CarrierTone {
                    frequency,
                    amplitude: AnalyticSample::new(re, im) * frequency.powf(exponent),
                }
            })
            .collect()
    }

    fn synthesize(&mut self) {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let tones = self.carrier_tones(&mut rng);

        let length = self.buffer_length;
        let bin_width = self.bin_width();
        let mut spectrum = vec![AnalyticSample::zero(); length];
        for tone in &tones {
            let bin = ((tone.frequency / bin_width).round() as usize).clamp(1, length / 2);
            spectrum[bin] += tone.amplitude;
        }

        let mut planner = FftPlanner::new();
        let ifft = planner.plan_fft_inverse(length);
        ifft.process(&mut spectrum);

        let measured = block_rms(&spectrum);
        let scale = if measured.is_finite() && measured > 0.0 {
            self.config.rms / measured
        } else {
            warn!(measured, "noise synthesis produced no energy, scaling factor defaults to 1.0");
            1.0
        };
        for sample in spectrum.iter_mut() {
            *sample *= scale;
        }

        self.rms = block_rms(&spectrum);
        self.buffer = spectrum;
        debug!(
            tones = tones.len(),
            buffer_length = length,
            rms = self.rms,
            "noise buffer synthesised"
        );
    }
}

impl AnalyticStream for NoiseGenerator {
    fn samples(&self) -> Option<usize> {
        None
    }

    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        self.initialize();
        let length = self.buffer.len();
        let mut written = 0;
        while written < buffer.len() {
            let chunk = (buffer.len() - written).min(length - self.position);
            buffer[written..written + chunk]
                .copy_from_slice(&self.buffer[self.position..self.position + chunk]);
            written += chunk;
            self.position = (self.position + chunk) % length;
        }
        written
    }

    fn reset(&mut self) {
        self.position = 0;
    }

    fn seek(&mut self, position: usize) {
        self.position = position % self.buffer_length;
    }

    fn rms(&mut self) -> f64 {
        self.initialize();
        self.rms
    }

    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.synthesize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::rms::read_samples;
    use approx_eq::assert_approx_eq;

    fn generator(color: NoiseColor, seed: u64) -> NoiseGenerator {
        let config = NoiseConfig::default()
            .with_band(100.0, 4000.0)
            .with_color(color)
            .with_rms(0.25)
            .with_seed(seed);
        NoiseGenerator::new(config, 16000.0).unwrap()
    }

    #[test]
    fn test_buffer_spans_ten_periods() {
        let noise = generator(NoiseColor::White, 1);
        assert!(noise.buffer_length().is_power_of_two());
        assert!(noise.buffer_length() as f64 >= 10.0 * 16000.0 / 100.0);
    }

    #[test]
    fn test_rms_matches_target_after_initialize() {
        for color in [
            NoiseColor::Violet,
            NoiseColor::Blue,
            NoiseColor::White,
            NoiseColor::Pink,
            NoiseColor::Brown,
        ] {
            let mut noise = generator(color, 7);
            noise.initialize();
            let length = noise.buffer_length();
            let samples = read_samples(&mut noise, length);
            assert_approx_eq!(block_rms(&samples), 0.25, 1e-9);
            assert_approx_eq!(noise.rms(), 0.25, 1e-9);
        }
    }

    #[test]
    fn test_buffer_repeats_and_seeks_modularly() {
        let mut noise = generator(NoiseColor::Pink, 3);
        let length = noise.buffer_length();
        let first = read_samples(&mut noise, 8);
        let _ = read_samples(&mut noise, length - 8);
        let wrapped = read_samples(&mut noise, 8);
        assert_eq!(first, wrapped);

        noise.seek(3 * length + 5);
        let seeked = read_samples(&mut noise, 3);
        assert_eq!(seeked, first[5..8].to_vec());
    }

    #[test]
    fn test_seed_is_reproducible() {
        let mut a = generator(NoiseColor::Brown, 42);
        let mut b = generator(NoiseColor::Brown, 42);
        assert_eq!(read_samples(&mut a, 256), read_samples(&mut b, 256));
    }

    #[test]
    fn test_carrier_tones_are_log_spaced() {
        let noise = generator(NoiseColor::Pink, 9);
        let mut rng = StdRng::seed_from_u64(9);
        let tones = noise.carrier_tones(&mut rng);
        assert!((tones[0].frequency - 100.0).abs() < 1e-9);
        assert!((tones[tones.len() - 1].frequency - 4000.0).abs() < 1e-6);
        let ratio = tones[1].frequency / tones[0].frequency;
        let last_ratio = tones[tones.len() - 1].frequency / tones[tones.len() - 2].frequency;
        assert!((ratio - last_ratio).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_band() {
        let inverted = NoiseConfig::default().with_band(1000.0, 100.0);
        assert!(NoiseGenerator::new(inverted, 44100.0).is_err());
        let above_nyquist = NoiseConfig::default().with_band(100.0, 30_000.0);
        assert!(NoiseGenerator::new(above_nyquist, 44100.0).is_err());
        let silent = NoiseConfig::default().with_rms(0.0);
        assert!(NoiseGenerator::new(silent, 44100.0).is_err());
    }
}

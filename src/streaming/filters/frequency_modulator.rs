//! Sinusoidal frequency modulation of an analytic stream.

use std::f64::consts::TAU;

use num_complex::Complex64;
use tracing::{debug, warn};

use crate::error::{AnalyticError, AnalyticResult, require_positive};
use crate::streaming::rms::{RmsCache, calculate_rms};
use crate::streaming::traits::{AnalyticSample, AnalyticStream};

/// Longest modulation period, in samples, the modulator will tabulate.
pub const MAX_MODULATION_PERIOD: usize = 1 << 22;

/// Relative rate change above which snapping is reported as a warning.
const SNAP_WARNING_THRESHOLD: f64 = 1e-3;

/// Warps the instantaneous frequency of its upstream by
/// `depth * cos(2π rate t)` Hz.
///
/// The phase offset that produces this is
/// `θ(t) = (depth / rate) * sin(2π rate t)`, which is periodic in the
/// modulation rate. One period is precomputed; the rate is snapped so that
/// period is a whole number of samples, which makes the table exact and
/// seeking a plain modulo.
pub struct FrequencyModulator {
    upstream: Box<dyn AnalyticStream>,
    depth: f64,
    rate: f64,
    table: Vec<AnalyticSample>,
    index: usize,
    rms: RmsCache,
    initialized: bool,
}

impl FrequencyModulator {
    /// Modulate `upstream` with peak deviation `depth` Hz at `rate` Hz.
    ///
    /// # Errors
    /// Returns an error if `depth` is not finite, if `rate` is not positive,
    /// above half the sampling rate, or so low that one period would exceed
    /// [`MAX_MODULATION_PERIOD`] samples.
    pub fn new(upstream: Box<dyn AnalyticStream>, depth: f64, rate: f64) -> AnalyticResult<Self> {
        let rate = require_positive("rate", rate)?;
        if !depth.is_finite() {
            return Err(AnalyticError::invalid_parameter(
                "depth",
                format!("must be finite, got {depth}"),
            ));
        }

        let sampling_rate = upstream.sampling_rate();
        let nyquist = sampling_rate / 2.0;
        if rate > nyquist {
            return Err(AnalyticError::invalid_parameter(
                "rate",
                format!("must not exceed Nyquist ({rate} > {nyquist})"),
            ));
        }
        let exact_period = (sampling_rate / rate).round();
        if exact_period > MAX_MODULATION_PERIOD as f64 {
            return Err(AnalyticError::invalid_parameter(
                "rate",
                format!(
                    "period of {exact_period} samples exceeds the {MAX_MODULATION_PERIOD} sample limit"
                ),
            ));
        }

        let period = exact_period as usize;
        let snapped_rate = sampling_rate / period as f64;
        let index_of_modulation = depth / snapped_rate;
        if ((snapped_rate - rate) / rate).abs() > SNAP_WARNING_THRESHOLD {
            warn!(rate, snapped_rate, period, "modulation rate snapped to a whole-sample period");
        }

        let table = (0..period)
            .map(|k| {
                let angle = index_of_modulation * (TAU * k as f64 / period as f64).sin();
                Complex64::from_polar(1.0, angle)
            })
            .collect();

        debug!(depth, rate, snapped_rate, period, "frequency modulator table built");

        Ok(Self {
            upstream,
            depth,
            rate: snapped_rate,
            table,
            index: 0,
            rms: RmsCache::new(),
            initialized: false,
        })
    }

    /// Peak frequency deviation in Hz.
    pub const fn depth(&self) -> f64 {
        self.depth
    }

    /// Modulation rate in Hz after snapping to a whole-sample period.
    pub const fn rate(&self) -> f64 {
        self.rate
    }

    /// Length of one modulation period in samples.
    pub fn period_samples(&self) -> usize {
        self.table.len()
    }
}

impl AnalyticStream for FrequencyModulator {
    fn samples(&self) -> Option<usize> {
        self.upstream.samples()
    }

    fn sampling_rate(&self) -> f64 {
        self.upstream.sampling_rate()
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        let read = self.upstream.read(buffer);
        let period = self.table.len();
        for sample in buffer[..read].iter_mut() {
            *sample *= self.table[self.index];
            self.index += 1;
            if self.index == period {
                self.index = 0;
            }
        }
        read
    }

    fn reset(&mut self) {
        self.upstream.reset();
        self.index = 0;
    }

    fn seek(&mut self, position: usize) {
        self.upstream.seek(position);
        self.index = position % self.table.len();
    }

    fn rms(&mut self) -> f64 {
        if let Some(rms) = self.rms.get() {
            return rms;
        }
        // Unbounded upstreams are taken to be analytic, where rotation keeps
        // the real-part RMS unchanged.
        let rms = if self.upstream.samples().is_some() {
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

//! Single-sideband frequency shifting.

use tracing::debug;

use crate::error::{AnalyticError, AnalyticResult};
use crate::streaming::phasor::PhasorTable;
use crate::streaming::rms::{RmsCache, calculate_rms};
use crate::streaming::traits::{AnalyticSample, AnalyticStream};

/// Shifts every frequency component of its upstream by a fixed offset.
///
/// Multiplying an analytic signal by `e^{i 2π Δf n / fs}` moves its whole
/// (one-sided) spectrum by `Δf`. The phasor comes from a precomputed table
/// with per-cycle phase correction, so long streams do not drift.
///
/// The shift is a unit-magnitude rotation. For an analytic upstream it keeps
/// the RMS of the real part, so unbounded streams report the upstream's RMS;
/// bounded streams are measured, which also covers inputs whose imaginary
/// part is not the Hilbert transform of the real part.
pub struct FrequencyShifter {
    upstream: Box<dyn AnalyticStream>,
    shift: f64,
    phasor: PhasorTable,
    rms: RmsCache,
    initialized: bool,
}

impl FrequencyShifter {
    /// Shift `upstream` by `shift` Hz (negative values shift down).
    ///
    /// # Errors
    /// Returns an error if `shift` is not finite.
    pub fn new(upstream: Box<dyn AnalyticStream>, shift: f64) -> AnalyticResult<Self> {
        if !shift.is_finite() {
            return Err(AnalyticError::invalid_parameter(
                "shift",
                format!("must be finite, got {shift}"),
            ));
        }
        let phasor = PhasorTable::new(1.0, shift, 0.0, upstream.sampling_rate());
        debug!(shift, period = phasor.period(), "frequency shifter table built");
        Ok(Self {
            upstream,
            shift,
            phasor,
            rms: RmsCache::new(),
            initialized: false,
        })
    }

    /// Shift in Hz.
    pub const fn shift(&self) -> f64 {
        self.shift
    }
}

impl AnalyticStream for FrequencyShifter {
    fn samples(&self) -> Option<usize> {
        self.upstream.samples()
    }

    fn sampling_rate(&self) -> f64 {
        self.upstream.sampling_rate()
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        let read = self.upstream.read(buffer);
        self.phasor.rotate(&mut buffer[..read]);
        read
    }

    fn reset(&mut self) {
        self.upstream.reset();
        self.phasor.reset();
    }

    fn seek(&mut self, position: usize) {
        self.upstream.seek(position);
        self.phasor.seek(position);
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

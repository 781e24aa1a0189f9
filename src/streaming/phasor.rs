//! Cyclic phasor table with drift-free phase correction.
//!
//! A tone of frequency `f` repeats every `fs / f` samples, which is rarely an
//! integer. The table stores one period rounded to a whole number of samples
//! and keeps track of the residual phase that rounding throws away
//! (`cycle_partial`). Every time the table wraps, the output is rotated by
//! `cycles * cycle_partial`, so sample `n` always carries exactly the phase
//! `phase + 2π f n / fs` no matter how long the stream has been running.
//!
//! ```text
//!   n = cycle * L + index
//!   x[n] = table[index] * e^{i * cycle * cycle_partial}
//! ```

use std::f64::consts::TAU;

use num_complex::Complex64;

use crate::utils::audio_math::{period_length, safe_ratio};

use super::traits::AnalyticSample;

/// One period of a rotating phasor plus the cursor that walks it.
#[derive(Debug, Clone)]
pub(crate) struct PhasorTable {
    table: Vec<AnalyticSample>,
    cycle_partial: f64,
    index: usize,
    cycle: u64,
    correction: AnalyticSample,
}

impl PhasorTable {
    /// Builds the table for `amplitude * e^{i(phase + 2π frequency n / sampling_rate)}`.
    ///
    /// The period is capped at one second of samples; the residual phase
    /// correction keeps very low frequencies exact regardless.
    pub(crate) fn new(amplitude: f64, frequency: f64, phase: f64, sampling_rate: f64) -> Self {
        let max_length = sampling_rate.ceil().max(1.0) as usize;
        let length = if frequency == 0.0 {
            1
        } else {
            let period = safe_ratio(sampling_rate, frequency.abs(), "tone period");
            period_length(period, max_length)
        };

        let step = TAU * frequency / sampling_rate;
        let table = (0..length)
            .map(|k| Complex64::from_polar(amplitude, phase + step * k as f64))
            .collect();

        let period_phase = step * length as f64;
        let cycle_partial = period_phase - TAU * (period_phase / TAU).round();

        Self {
            table,
            cycle_partial,
            index: 0,
            cycle: 0,
            correction: Complex64::new(1.0, 0.0),
        }
    }

    /// Number of samples in one table period.
    pub(crate) fn period(&self) -> usize {
        self.table.len()
    }

    /// Residual phase added per completed table period.
    pub(crate) const fn cycle_partial(&self) -> f64 {
        self.cycle_partial
    }

    /// Next phasor value.
    #[inline]
    pub(crate) fn next_value(&mut self) -> AnalyticSample {
        let value = self.table[self.index] * self.correction;
        self.index += 1;
        if self.index == self.table.len() {
            self.index = 0;
            self.cycle += 1;
            self.correction = self.correction_for(self.cycle);
        }
        value
    }

    /// Overwrite `buffer` with consecutive phasor values.
    pub(crate) fn fill(&mut self, buffer: &mut [AnalyticSample]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_value();
        }
    }

    /// Multiply `buffer` in place by consecutive phasor values.
    pub(crate) fn rotate(&mut self, buffer: &mut [AnalyticSample]) {
        for sample in buffer.iter_mut() {
            *sample *= self.next_value();
        }
    }

    /// Position the cursor at absolute sample `position`.
    pub(crate) fn seek(&mut self, position: usize) {
        let period = self.table.len();
        self.cycle = (position / period) as u64;
        self.index = position % period;
        self.correction = self.correction_for(self.cycle);
    }

    pub(crate) fn reset(&mut self) {
        self.seek(0);
    }

    fn correction_for(&self, cycle: u64) -> AnalyticSample {
        if self.cycle_partial == 0.0 {
            return Complex64::new(1.0, 0.0);
        }
        let angle = (cycle as f64 * self.cycle_partial).rem_euclid(TAU);
        Complex64::from_polar(1.0, angle)
    }
}

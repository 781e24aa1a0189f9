//! Window shapes used to taper the edges of bounded streams.
//!
//! A full window of length `2 * R` is split in half: the rising half fades a
//! stream in over `R` samples, the falling half fades it out.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Shape of the half-window ramp applied by the windower.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowShape {
    /// No tapering, the ramp is flat at unity gain.
    Rectangular,
    /// Straight line from 0 to 1.
    Linear,
    /// Raised cosine reaching exactly zero at the edge.
    Hanning,
    /// Raised cosine on a 0.08 pedestal.
    #[default]
    Hamming,
    /// Three-term cosine sum with very low leakage.
    Blackman,
}

impl WindowShape {
    /// Gain of the rising half-window at normalised position `x` in `[0, 1]`.
    ///
    /// `x = 0` is the outer edge of the window, `x = 1` the point where the
    /// ramp reaches unity gain.
    pub fn ramp_gain(self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        match self {
            Self::Rectangular => 1.0,
            Self::Linear => x,
            Self::Hanning => 0.5 * (1.0 - (PI * x).cos()),
            Self::Hamming => 0.54 - 0.46 * (PI * x).cos(),
            Self::Blackman => 0.42 - 0.5 * (PI * x).cos() + 0.08 * (2.0 * PI * x).cos(),
        }
    }

    /// Precomputes the rising half-window for a ramp of `ramp_samples`.
    ///
    /// Entry `k` is the gain of sample `k` counted from the outer edge; the
    /// falling ramp reads the same table backwards.
    pub fn ramp(self, ramp_samples: usize) -> Vec<f64> {
        (0..ramp_samples)
            .map(|k| self.ramp_gain(k as f64 / ramp_samples as f64))
            .collect()
    }

    /// Full symmetric window of `size` samples.
    pub fn full_window(self, size: usize) -> Vec<f64> {
        if size <= 1 {
            return vec![1.0; size];
        }
        let half = (size - 1) as f64 / 2.0;
        (0..size)
            .map(|i| self.ramp_gain(1.0 - ((i as f64 - half) / half).abs()))
            .collect()
    }
}

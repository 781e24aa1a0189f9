//! Pull-based analytic signal streams.
//!
//! A stream graph is a tree of [`AnalyticStream`]s. Leaf generators produce
//! samples; filters and combinators own their upstreams and transform what
//! they pull from them. Nothing runs until the root is read:
//!
//! ```text
//!   WaveGenerator ──► FrequencyShifter ──┐
//!                                        ├──► Adder ──► AdsrEnvelope ──► read()
//!   NoiseGenerator ──► Windower ─────────┘
//! ```
//!
//! Every stream can be reset and seeked to any sample, bounded streams report
//! their exact length, and unbounded ones report `None`.
//!
//! # Example
//!
//! ```rust
//! use analytic_streams::streaming::{
//!     AdsrConfig, AdsrEnvelope, AnalyticStream, FrequencyShifter, WaveGenerator,
//! };
//! use analytic_streams::streaming::rms::read_all;
//!
//! let tone = WaveGenerator::new(0.5, 440.0, 0.0, 44100.0).unwrap();
//! let shifted = FrequencyShifter::new(tone.boxed(), 15.0).unwrap();
//! let config = AdsrConfig::scheduled(0.01, 0.02, 0.6, 0.2, 0.1);
//! let mut note = AdsrEnvelope::new(shifted.boxed(), config).unwrap();
//!
//! let samples = read_all(&mut note).unwrap();
//! assert_eq!(Some(samples.len()), note.samples());
//! ```

pub mod combinators;
pub mod converters;
pub mod filters;
pub(crate) mod phasor;
pub mod rms;
pub mod sources;
pub mod traits;

#[cfg(test)]
mod tests;

pub use combinators::{Adder, Fork, ForkCursor};
pub use converters::{AnalyticToEnvelopeConverter, RealToAnalyticConverter};
pub use filters::{
    AdsrConfig, AdsrEnvelope, CenterPadding, Centerer, EnvelopeState, FrequencyModulator,
    FrequencyShifter, WindowConfig, Windower,
};
pub use rms::{RmsCache, calculate_real_rms, calculate_rms};
pub use sources::{
    AnalyticSampleBuffer, CarrierTone, NoiseColor, NoiseConfig, NoiseGenerator, RealSampleBuffer,
    WaveGenerator,
};
pub use traits::{AnalyticSample, AnalyticStream, RealStream};

// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::box_collection)] // Warns on boxed `Vec`, `String`, etc.
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::identity_op)] // e.g., `x + 0`, `x * 1`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_safety_doc)] // Docs for `unsafe` functions
#![deny(missing_docs)] // Documentation is a must for release

//! # AnalyticStreams
//!
//! Composable, pull-based streams of analytic (complex, single-sideband)
//! audio samples.
//!
//! An analytic signal carries a real audio signal in its real part and the
//! Hilbert transform of that signal in its imaginary part, so its spectrum
//! has no negative frequencies. That makes effects which are awkward on real
//! signals into one complex multiply per sample:
//!
//! - **Frequency shifting**: multiply by `e^{i 2π Δf t}` and every component
//!   moves by `Δf`, with no mirror image.
//! - **Frequency modulation**: multiply by `e^{i θ(t)}` for any phase
//!   trajectory `θ`.
//! - **Envelopes and windows**: multiply by a real gain.
//!
//! ## Overview
//!
//! Streams are built into a tree. Sources ([`WaveGenerator`],
//! [`NoiseGenerator`], in-memory buffers) sit at the leaves; filters
//! ([`AdsrEnvelope`], [`FrequencyShifter`], [`FrequencyModulator`],
//! [`Windower`], [`Centerer`]) wrap one upstream; combinators ([`Adder`],
//! [`Fork`]) join or split streams. Reading the root pulls samples through
//! the whole tree synchronously.
//!
//! Every stream supports:
//!
//! - `read` into a caller-provided buffer, returning fewer samples only at
//!   the end of the stream
//! - `reset` and `seek` to any sample position, with exact results
//! - `rms`, memoised, `NaN` when undefined
//!
//! ## Quick Start
//!
//! ```rust
//! use analytic_streams::streaming::{
//!     Adder, AnalyticStream, NoiseColor, NoiseConfig, NoiseGenerator, WaveGenerator,
//! };
//! use analytic_streams::streaming::rms::read_samples;
//!
//! let tone = WaveGenerator::new(0.3, 1000.0, 0.0, 44100.0).unwrap();
//! let noise_config = NoiseConfig::default()
//!     .with_color(NoiseColor::Pink)
//!     .with_rms(0.05)
//!     .with_seed(7);
//! let noise = NoiseGenerator::new(noise_config, 44100.0).unwrap();
//!
//! let mut mix = Adder::new(vec![tone.boxed(), noise.boxed()]).unwrap();
//! mix.initialize();
//! let block = read_samples(&mut mix, 512);
//! assert_eq!(block.len(), 512);
//! ```
//!
//! ## Error Handling
//!
//! Only constructors fail. They return [`AnalyticResult`] with an
//! [`AnalyticError`] describing the rejected parameter. Running out of data
//! is a short read, and numerical corner cases fall back to safe values with
//! a `tracing` warning.
//!
//! ## Logging
//!
//! The crate emits `tracing` events (`debug` for derived constants, `warn`
//! for fallbacks and under-reads, `trace` for fork bookkeeping). Install any
//! `tracing` subscriber to see them.
//!
//! ## Features
//!
//! - `serialization`: `serde` support for configuration types

mod error;
pub mod streaming;
pub mod utils;

pub use crate::error::{AnalyticError, AnalyticResult};
pub use crate::streaming::{
    Adder, AdsrConfig, AdsrEnvelope, AnalyticSample, AnalyticSampleBuffer, AnalyticStream,
    AnalyticToEnvelopeConverter, CenterPadding, Centerer, EnvelopeState, Fork, ForkCursor,
    FrequencyModulator, FrequencyShifter, NoiseColor, NoiseConfig, NoiseGenerator,
    RealSampleBuffer, RealStream, RealToAnalyticConverter, WaveGenerator, WindowConfig, Windower,
};
pub use crate::utils::{
    WindowShape,
    audio_math::{amplitude_to_db, db_to_amplitude, samples_to_seconds, seconds_to_samples},
};

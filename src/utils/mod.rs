//! Utility functions shared by the stream implementations.
//!
//! # Modules
//!
//! - [`audio_math`] - Amplitude/time conversions and guarded arithmetic
//! - [`window`] - Half-window ramp shapes

pub mod audio_math;
pub mod window;

pub use audio_math::*;
pub use window::WindowShape;

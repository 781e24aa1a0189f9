//! Leaf streams with no upstream dependency.

pub mod buffer;
pub mod noise;
pub mod wave;

pub use buffer::{AnalyticSampleBuffer, RealSampleBuffer};
pub use noise::{CarrierTone, NoiseColor, NoiseConfig, NoiseGenerator};
pub use wave::WaveGenerator;

//! Single-upstream filters.
//!
//! Every filter owns its upstream as a `Box<dyn AnalyticStream>`, pulls from
//! it inside `read` and forwards `reset`/`seek`/`initialize` to it.

pub mod centerer;
pub mod envelope;
pub mod frequency_modulator;
pub mod frequency_shifter;
pub mod windower;

pub use centerer::{CenterPadding, Centerer};
pub use envelope::{
    ATTACK_FLOOR, AdsrConfig, AdsrEnvelope, ENVELOPE_CUTOFF, EnvelopeState,
    IMMEDIATE_RELEASE_SECONDS, PEAK_AMPLITUDE,
};
pub use frequency_modulator::FrequencyModulator;
pub use frequency_shifter::FrequencyShifter;
pub use windower::{WindowConfig, Windower};

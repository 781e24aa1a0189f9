//! Exponential ADSR envelope.
//!
//! The envelope multiplies its upstream by a running gain that moves through
//! five states:
//!
//! ```text
//!   gain
//!   1.0 ┤      ╭╮
//!       │     ╱  ╲___________________
//!   S   │    ╱                       ╲
//!       │   ╱                          ╲
//!  1e-6 ┼──╯─────────────────────────────╲──→ samples
//!        AttackUp AttackDown  Sustain   Released
//! ```
//!
//! Every state owns a multiplicative per-sample rate, chosen so the gain lands
//! exactly on the state's target (peak, sustain amplitude, or the exhaustion
//! cutoff) after the state's sample count. Because each segment is a pure
//! power law, the gain at any position has a closed form, and seeking never
//! replays samples.
//!
//! A release triggered from outside the sample loop is recorded on the
//! envelope's timeline together with the position and gain at which it
//! happened. Seeking or resetting rebuilds the gain from that record, so the
//! stream stays restartable after a release.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AnalyticError, AnalyticResult, require_non_negative};
use crate::streaming::rms::{RmsCache, calculate_rms};
use crate::streaming::traits::{AnalyticSample, AnalyticStream};
use crate::utils::audio_math::seconds_to_samples;

/// Gain below which a releasing envelope counts as silent.
pub const ENVELOPE_CUTOFF: f64 = 1e-6;

/// Gain the attack starts from.
pub const ATTACK_FLOOR: f64 = 1e-3;

/// Gain reached at the end of the attack.
pub const PEAK_AMPLITUDE: f64 = 1.0;

/// Duration of an immediate release in seconds.
pub const IMMEDIATE_RELEASE_SECONDS: f64 = 0.010;

/// State of an [`AdsrEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Rising from [`ATTACK_FLOOR`] to [`PEAK_AMPLITUDE`].
    AttackUp,
    /// Falling from the peak to the sustain amplitude.
    AttackDown,
    /// Holding the sustain amplitude.
    Sustain,
    /// Decaying to [`ENVELOPE_CUTOFF`] over the release time.
    Released,
    /// Decaying to [`ENVELOPE_CUTOFF`] over [`IMMEDIATE_RELEASE_SECONDS`].
    ImmediateRelease,
}

impl EnvelopeState {
    /// Whether the envelope is on its way out.
    pub const fn is_releasing(self) -> bool {
        matches!(self, Self::Released | Self::ImmediateRelease)
    }
}

/// Timing and level parameters of an [`AdsrEnvelope`], in seconds.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AdsrConfig {
    /// Time to rise to the peak.
    pub attack_up: f64,
    /// Time to fall from the peak to the sustain amplitude.
    pub attack_down: f64,
    /// Gain held during sustain, in `(ENVELOPE_CUTOFF, PEAK_AMPLITUDE]`.
    pub sustain_amplitude: f64,
    /// Sustain duration; `None` sustains until [`AdsrEnvelope::trigger_release`].
    pub sustain: Option<f64>,
    /// Time to decay from the sustain amplitude to the cutoff.
    pub release: f64,
}

impl Default for AdsrConfig {
    fn default() -> Self {
        Self {
            attack_up: 0.01,
            attack_down: 0.05,
            sustain_amplitude: 0.7,
            sustain: None,
            release: 0.2,
        }
    }
}

impl AdsrConfig {
    /// Fully scheduled envelope with a fixed sustain duration.
    pub fn scheduled(
        attack_up: f64,
        attack_down: f64,
        sustain_amplitude: f64,
        sustain: f64,
        release: f64,
    ) -> Self {
        Self {
            attack_up,
            attack_down,
            sustain_amplitude,
            sustain: Some(sustain),
            release,
        }
    }

    /// Sustain for `seconds` before releasing.
    pub fn with_sustain(mut self, seconds: f64) -> Self {
        self.sustain = Some(seconds);
        self
    }

    /// Set the release time.
    pub fn with_release(mut self, seconds: f64) -> Self {
        self.release = seconds;
        self
    }
}

/// A release recorded on the envelope timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReleaseTrigger {
    position: usize,
    start_value: f64,
    rate: f64,
    length: usize,
    state: EnvelopeState,
}

/// Closed-form description of the segment containing a position.
#[derive(Debug, Clone, Copy)]
struct Segment {
    state: EnvelopeState,
    value: f64,
    rate: f64,
    end: Option<usize>,
}

/// Multiplies an upstream stream by an exponential ADSR envelope.
pub struct AdsrEnvelope {
    upstream: Box<dyn AnalyticStream>,
    sampling_rate: f64,
    sustain_amplitude: f64,

    attack_up_samples: usize,
    attack_down_end: usize,
    sustain_end: Option<usize>,
    release_samples: usize,

    rate_up: f64,
    rate_down: f64,
    rate_release: f64,

    triggers: Vec<ReleaseTrigger>,

    position: usize,
    state: EnvelopeState,
    value: f64,
    rate: f64,
    state_end: Option<usize>,

    rms: RmsCache,

    initialized: bool,
}

impl AdsrEnvelope {
    /// Wrap `upstream` in an envelope.
    ///
    /// # Errors
    /// Returns an error if a duration is negative or not finite, or the
    /// sustain amplitude lies outside `(ENVELOPE_CUTOFF, PEAK_AMPLITUDE]`.
    pub fn new(upstream: Box<dyn AnalyticStream>, config: AdsrConfig) -> AnalyticResult<Self> {
        require_non_negative("attack_up", config.attack_up)?;
        require_non_negative("attack_down", config.attack_down)?;
        require_non_negative("release", config.release)?;
        if let Some(sustain) = config.sustain {
            require_non_negative("sustain", sustain)?;
        }
        let sustain_amplitude = config.sustain_amplitude;
        if !(sustain_amplitude > ENVELOPE_CUTOFF && sustain_amplitude <= PEAK_AMPLITUDE) {
            return Err(AnalyticError::invalid_parameter(
                "sustain_amplitude",
                format!(
                    "must lie in ({ENVELOPE_CUTOFF}, {PEAK_AMPLITUDE}], got {sustain_amplitude}"
                ),
            ));
        }

        let sampling_rate = upstream.sampling_rate();
        let attack_up_samples = seconds_to_samples(config.attack_up, sampling_rate);
        let attack_down_samples = seconds_to_samples(config.attack_down, sampling_rate);
        let attack_down_end = attack_up_samples + attack_down_samples;
        let sustain_end = config
            .sustain
            .map(|sustain| attack_down_end + seconds_to_samples(sustain, sampling_rate));
        let release_samples = seconds_to_samples(config.release, sampling_rate);

        let rate_up = segment_rate(ATTACK_FLOOR, PEAK_AMPLITUDE, attack_up_samples);
        let rate_down = segment_rate(PEAK_AMPLITUDE, sustain_amplitude, attack_down_samples);
        let rate_release = segment_rate(sustain_amplitude, ENVELOPE_CUTOFF, release_samples);

        debug!(
            attack_up_samples,
            attack_down_end,
            ?sustain_end,
            release_samples,
            "adsr envelope segments"
        );

        let mut envelope = Self {
            upstream,
            sampling_rate,
            sustain_amplitude,
            attack_up_samples,
            attack_down_end,
            sustain_end,
            release_samples,
            rate_up,
            rate_down,
            rate_release,
            triggers: Vec::new(),
            position: 0,
            state: EnvelopeState::AttackUp,
            value: ATTACK_FLOOR,
            rate: rate_up,
            state_end: None,
            rms: RmsCache::new(),
            initialized: false,
        };
        envelope.sync_to(0);
        Ok(envelope)
    }

    /// Current state.
    pub const fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Gain that will be applied to the next sample.
    pub const fn envelope_value(&self) -> f64 {
        self.value
    }

    /// Logical position of the next sample.
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Closed-form state and gain at `position`.
    pub fn envelope_at(&self, position: usize) -> (EnvelopeState, f64) {
        let segment = self.segment_at(position);
        (segment.state, segment.value)
    }

    /// Start releasing from the current gain.
    ///
    /// With `immediate` the decay takes [`IMMEDIATE_RELEASE_SECONDS`] instead
    /// of the configured release time. Has no effect during an immediate
    /// release, when a normal release is requested while already releasing,
    /// or once the envelope is exhausted. The stream position is unchanged.
    pub fn trigger_release(&mut self, immediate: bool) {
        match self.state {
            EnvelopeState::ImmediateRelease => return,
            EnvelopeState::Released if !immediate => return,
            _ => {}
        }
        if self.is_exhausted() {
            return;
        }

        let (state, length) = if immediate {
            (
                EnvelopeState::ImmediateRelease,
                seconds_to_samples(IMMEDIATE_RELEASE_SECONDS, self.sampling_rate).max(1),
            )
        } else {
            (EnvelopeState::Released, self.release_samples)
        };
        let start_value = self.value;
        let rate = segment_rate(start_value, ENVELOPE_CUTOFF, length);

        let position = self.position;
        self.triggers.retain(|trigger| trigger.position < position);
        self.triggers.push(ReleaseTrigger {
            position,
            start_value,
            rate,
            length,
            state,
        });
        debug!(position, start_value, length, ?state, "release triggered");

        self.rms.invalidate();
        self.sync_to(position);
    }

    /// Position one past the last sample the envelope lets through.
    fn end_position(&self) -> Option<usize> {
        match self.triggers.last() {
            Some(trigger) => Some(trigger.position + trigger.length),
            None => self.sustain_end.map(|end| end + self.release_samples),
        }
    }

    fn is_exhausted(&self) -> bool {
        if let Some(end) = self.end_position() {
            if self.position >= end {
                return true;
            }
        }
        self.state.is_releasing() && self.value < ENVELOPE_CUTOFF
    }

    fn segment_at(&self, position: usize) -> Segment {
        let active = self
            .triggers
            .iter()
            .rev()
            .find(|trigger| trigger.position <= position);
        if let Some(trigger) = active {
            let elapsed = (position - trigger.position) as f64;
            return Segment {
                state: trigger.state,
                value: trigger.start_value * trigger.rate.powf(elapsed),
                rate: trigger.rate,
                end: Some(trigger.position + trigger.length),
            };
        }

        let mut segment = self.scheduled_segment_at(position);
        if let Some(next) = self.triggers.iter().find(|trigger| trigger.position > position) {
            segment.end = Some(segment.end.map_or(next.position, |end| end.min(next.position)));
        }
        segment
    }

    fn scheduled_segment_at(&self, position: usize) -> Segment {
        if position < self.attack_up_samples {
            return Segment {
                state: EnvelopeState::AttackUp,
                value: ATTACK_FLOOR * self.rate_up.powf(position as f64),
                rate: self.rate_up,
                end: Some(self.attack_up_samples),
            };
        }
        if position < self.attack_down_end {
            let elapsed = (position - self.attack_up_samples) as f64;
            return Segment {
                state: EnvelopeState::AttackDown,
                value: PEAK_AMPLITUDE * self.rate_down.powf(elapsed),
                rate: self.rate_down,
                end: Some(self.attack_down_end),
            };
        }
        match self.sustain_end {
            Some(sustain_end) if position >= sustain_end => {
                let elapsed = (position - sustain_end) as f64;
                Segment {
                    state: EnvelopeState::Released,
                    value: self.sustain_amplitude * self.rate_release.powf(elapsed),
                    rate: self.rate_release,
                    end: Some(sustain_end + self.release_samples),
                }
            }
            sustain_end => Segment {
                state: EnvelopeState::Sustain,
                value: self.sustain_amplitude,
                rate: 1.0,
                end: sustain_end,
            },
        }
    }

    fn sync_to(&mut self, position: usize) {
        let segment = self.segment_at(position);
        self.position = position;
        self.state = segment.state;
        self.value = segment.value;
        self.rate = segment.rate;
        self.state_end = segment.end;
    }

    #[inline]
    fn advance(&mut self) {
        self.position += 1;
        if self.state_end == Some(self.position) {
            self.sync_to(self.position);
        } else {
            self.value *= self.rate;
        }
    }
}

impl AnalyticStream for AdsrEnvelope {
    fn samples(&self) -> Option<usize> {
        match (self.upstream.samples(), self.end_position()) {
            (Some(upstream), Some(end)) => Some(upstream.min(end)),
            (upstream, end) => upstream.or(end),
        }
    }

    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        if self.is_exhausted() {
            return 0;
        }
        let wanted = match self.end_position() {
            Some(end) => buffer.len().min(end - self.position),
            None => buffer.len(),
        };

        let read = self.upstream.read(&mut buffer[..wanted]);
        for sample in buffer[..read].iter_mut() {
            *sample *= self.value;
            self.advance();
        }
        read
    }

    fn reset(&mut self) {
        self.upstream.reset();
        self.sync_to(0);
    }

    fn seek(&mut self, position: usize) {
        self.upstream.seek(position);
        self.sync_to(position);
    }

    fn rms(&mut self) -> f64 {
        if let Some(rms) = self.rms.get() {
            return rms;
        }
        if self.samples().is_none() {
            return f64::NAN;
        }
        let rms = calculate_rms(self);
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

/// Per-sample multiplier taking `from` to `to` in exactly `samples` steps.
fn segment_rate(from: f64, to: f64, samples: usize) -> f64 {
    if samples == 0 || from <= 0.0 {
        return 1.0;
    }
    let rate = (to / from).powf(1.0 / samples as f64);
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        warn!(from, to, samples, "ill-conditioned envelope rate, holding gain");
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::rms::{read_all, read_samples};
    use crate::streaming::sources::buffer::AnalyticSampleBuffer;
    use crate::streaming::sources::wave::WaveGenerator;

    const FS: f64 = 1000.0;

    fn ones(len: usize) -> Box<dyn AnalyticStream> {
        AnalyticSampleBuffer::new(vec![AnalyticSample::new(1.0, 0.0); len], FS).boxed()
    }

    fn dc() -> Box<dyn AnalyticStream> {
        WaveGenerator::new(1.0, 0.0, 0.0, FS).unwrap().boxed()
    }

    fn scheduled() -> AdsrEnvelope {
        // 20 samples up, 30 down, 50 sustain, 40 release
        let config = AdsrConfig::scheduled(0.020, 0.030, 0.5, 0.050, 0.040);
        AdsrEnvelope::new(ones(1000), config).unwrap()
    }

    #[test]
    fn test_segment_shape() {
        let mut env = scheduled();
        assert_eq!(env.samples(), Some(140));
        let gains: Vec<f64> = read_all(&mut env).unwrap().iter().map(|s| s.re).collect();
        assert_eq!(gains.len(), 140);

        for pair in gains[..20].windows(2) {
            assert!(pair[1] > pair[0], "attack must rise");
        }
        assert!((gains[20] - PEAK_AMPLITUDE).abs() < 1e-9);
        for pair in gains[20..50].windows(2) {
            assert!(pair[1] < pair[0], "attack down must fall");
        }
        for &gain in &gains[50..100] {
            assert!((gain - 0.5).abs() < 1e-12);
            assert!(gain >= ENVELOPE_CUTOFF);
        }
        for pair in gains[100..].windows(2) {
            assert!(pair[1] < pair[0], "release must fall");
        }
        assert!(gains[139] < 1e-5);
        assert!(gains[139] > ENVELOPE_CUTOFF);
    }

    #[test]
    fn test_seek_matches_closed_form_and_read() {
        let mut env = scheduled();
        let straight = read_all(&mut env).unwrap();
        for &position in &[0usize, 1, 19, 20, 21, 49, 50, 51, 99, 100, 101, 139] {
            env.seek(position);
            let (_, expected) = env.envelope_at(position);
            assert!((env.envelope_value() - expected).abs() < 1e-12);
            let sample = read_samples(&mut env, 1);
            let diff = (sample[0] - straight[position]).norm();
            assert!(diff <= 1e-9 * straight[position].norm().max(1e-6), "position {position}");
        }
        env.seek(140);
        assert!(read_samples(&mut env, 1).is_empty());
    }

    #[test]
    fn test_states_at_boundaries() {
        let env = scheduled();
        assert_eq!(env.envelope_at(0).0, EnvelopeState::AttackUp);
        assert_eq!(env.envelope_at(20).0, EnvelopeState::AttackDown);
        assert_eq!(env.envelope_at(50).0, EnvelopeState::Sustain);
        assert_eq!(env.envelope_at(100).0, EnvelopeState::Released);
        assert!((env.envelope_at(0).1 - ATTACK_FLOOR).abs() < 1e-15);
    }

    #[test]
    fn test_unbounded_sustain_until_trigger() {
        let config = AdsrConfig::default();
        let mut env = AdsrEnvelope::new(dc(), config).unwrap();
        assert!(env.samples().is_none());
        assert!(env.rms().is_nan());

        let _ = read_samples(&mut env, 500);
        assert_eq!(env.state(), EnvelopeState::Sustain);

        env.trigger_release(false);
        assert_eq!(env.state(), EnvelopeState::Released);
        assert_eq!(env.position(), 500);
        assert_eq!(env.samples(), Some(500 + 200));

        let tail = read_samples(&mut env, 1000);
        assert_eq!(tail.len(), 200);
        assert!(read_samples(&mut env, 10).is_empty());
    }

    #[test]
    fn test_immediate_release_overrides_release() {
        let mut env = AdsrEnvelope::new(dc(), AdsrConfig::default()).unwrap();
        let _ = read_samples(&mut env, 100);
        env.trigger_release(false);
        let _ = read_samples(&mut env, 10);
        env.trigger_release(true);
        assert_eq!(env.state(), EnvelopeState::ImmediateRelease);

        // a further trigger is ignored
        env.trigger_release(false);
        assert_eq!(env.state(), EnvelopeState::ImmediateRelease);

        let tail = read_samples(&mut env, 1000);
        assert_eq!(tail.len(), 10);
    }

    #[test]
    fn test_trigger_survives_reset_and_seek() {
        let mut env = AdsrEnvelope::new(dc(), AdsrConfig::default()).unwrap();
        let _ = read_samples(&mut env, 300);
        env.trigger_release(false);

        env.reset();
        let first = read_all(&mut env).unwrap();
        env.reset();
        let second = read_all(&mut env).unwrap();
        assert_eq!(first.len(), 500);
        assert_eq!(first, second);

        env.seek(350);
        assert_eq!(env.state(), EnvelopeState::Released);
        let sample = read_samples(&mut env, 1)[0];
        assert!((sample - first[350]).norm() < 1e-12);

        env.seek(250);
        assert_eq!(env.state(), EnvelopeState::Sustain);
    }

    #[test]
    fn test_release_during_attack_starts_from_current_gain() {
        let config = AdsrConfig::scheduled(0.100, 0.050, 0.5, 1.0, 0.100);
        let mut env = AdsrEnvelope::new(dc(), config).unwrap();
        let _ = read_samples(&mut env, 10);
        let gain = env.envelope_value();
        env.trigger_release(false);
        assert!((env.envelope_value() - gain).abs() < 1e-15);
        assert_eq!(env.samples(), Some(110));
    }

    #[test]
    fn test_upstream_shorter_than_envelope() {
        let config = AdsrConfig::scheduled(0.010, 0.010, 0.5, 1.0, 0.100);
        let mut env = AdsrEnvelope::new(ones(30), config).unwrap();
        assert_eq!(env.samples(), Some(30));
        assert_eq!(read_all(&mut env).unwrap().len(), 30);
    }

    #[test]
    fn test_rejects_bad_config() {
        let bad_sustain = AdsrConfig {
            sustain_amplitude: 1.5,
            ..AdsrConfig::default()
        };
        assert!(AdsrEnvelope::new(dc(), bad_sustain).is_err());
        let negative = AdsrConfig {
            attack_up: -1.0,
            ..AdsrConfig::default()
        };
        assert!(AdsrEnvelope::new(dc(), negative).is_err());
    }

    #[test]
    fn test_zero_length_attack_starts_at_peak() {
        let config = AdsrConfig::scheduled(0.0, 0.0, 0.25, 0.010, 0.010);
        let mut env = AdsrEnvelope::new(ones(100), config).unwrap();
        assert_eq!(env.state(), EnvelopeState::Sustain);
        let gains = read_all(&mut env).unwrap();
        assert_eq!(gains.len(), 20);
        assert!((gains[0].re - 0.25).abs() < 1e-12);
    }
}

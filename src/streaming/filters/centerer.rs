//! Silence padding around a bounded stream.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};
use num_traits::Zero;
use tracing::{debug, warn};

use crate::error::{AnalyticError, AnalyticResult, require_non_negative};
use crate::streaming::rms::RmsCache;
use crate::streaming::traits::{AnalyticSample, AnalyticStream};
use crate::utils::audio_math::seconds_to_samples;

/// How much silence a [`Centerer`] adds, in seconds.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CenterPadding {
    /// Fixed silence before and after the payload.
    Explicit {
        /// Silence before the payload.
        pre: f64,
        /// Silence after the payload.
        post: f64,
    },
    /// Pad to a total duration, splitting the silence evenly.
    TargetDuration(f64),
}

impl CenterPadding {
    /// Fixed `pre` and `post` silence.
    pub const fn explicit(pre: f64, post: f64) -> Self {
        Self::Explicit { pre, post }
    }

    /// Pad to `duration` seconds.
    pub const fn target(duration: f64) -> Self {
        Self::TargetDuration(duration)
    }
}

/// Emits silence, then its upstream, then more silence.
pub struct Centerer {
    upstream: Box<dyn AnalyticStream>,
    pre: usize,
    payload_end: usize,
    total: usize,
    position: usize,
    underrun: bool,
    rms: RmsCache,
    initialized: bool,
}

impl Centerer {
    /// Pad `upstream` as described by `padding`.
    ///
    /// # Errors
    /// - [`AnalyticError::UnboundedStream`] if `upstream` is unbounded
    /// - [`AnalyticError::InvalidParameter`] for negative durations or a target
    ///   duration shorter than the upstream
    pub fn new(upstream: Box<dyn AnalyticStream>, padding: CenterPadding) -> AnalyticResult<Self> {
        let payload = upstream.samples().ok_or_else(|| {
            AnalyticError::UnboundedStream("only bounded streams can be centred".to_string())
        })?;
        let sampling_rate = upstream.sampling_rate();

        let (pre, post) = match padding {
            CenterPadding::Explicit { pre, post } => (
                seconds_to_samples(require_non_negative("pre", pre)?, sampling_rate),
                seconds_to_samples(require_non_negative("post", post)?, sampling_rate),
            ),
            CenterPadding::TargetDuration(duration) => {
                let total = seconds_to_samples(require_non_negative("duration", duration)?, sampling_rate);
                if total < payload {
                    return Err(AnalyticError::invalid_parameter(
                        "duration",
                        format!("target of {total} samples is shorter than the {payload}-sample stream"),
                    ));
                }
                let silence = total - payload;
                (silence / 2, silence - silence / 2)
            }
        };

        debug!(pre, payload, post, "centerer padding");
        Ok(Self {
            upstream,
            pre,
            payload_end: pre + payload,
            total: pre + payload + post,
            position: 0,
            underrun: false,
            rms: RmsCache::new(),
            initialized: false,
        })
    }

    /// Samples of silence before the payload.
    pub const fn pre_samples(&self) -> usize {
        self.pre
    }

    /// Samples of silence after the payload.
    pub const fn post_samples(&self) -> usize {
        self.total - self.payload_end
    }
}

impl AnalyticStream for Centerer {
    fn samples(&self) -> Option<usize> {
        Some(self.total)
    }

    fn sampling_rate(&self) -> f64 {
        self.upstream.sampling_rate()
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        let mut written = 0;
        while written < buffer.len() && self.position < self.total {
            let out = &mut buffer[written..];
            let count = if self.position < self.pre {
                let count = out.len().min(self.pre - self.position);
                out[..count].fill(AnalyticSample::zero());
                count
            } else if self.position < self.payload_end {
                let count = out.len().min(self.payload_end - self.position);
                let read = if self.underrun {
                    0
                } else {
                    self.upstream.read(&mut out[..count])
                };
                if read < count {
                    if !self.underrun {
                        warn!(
                            position = self.position + read,
                            payload_end = self.payload_end,
                            "upstream ended early, padding payload with silence"
                        );
                        self.underrun = true;
                    }
                    out[read..count].fill(AnalyticSample::zero());
                }
                count
            } else {
                let count = out.len().min(self.total - self.position);
                out[..count].fill(AnalyticSample::zero());
                count
            };
            written += count;
            self.position += count;
        }
        written
    }

    fn reset(&mut self) {
        self.position = 0;
        self.underrun = false;
        self.upstream.reset();
    }

    fn seek(&mut self, position: usize) {
        let position = position.min(self.total);
        self.position = position;
        self.underrun = false;
        if position <= self.pre {
            self.upstream.reset();
        } else {
            self.upstream.seek(position.min(self.payload_end) - self.pre);
        }
    }

    fn rms(&mut self) -> f64 {
        if let Some(rms) = self.rms.get() {
            return rms;
        }
        if self.total == 0 {
            return f64::NAN;
        }
        let payload = (self.payload_end - self.pre) as f64;
        let rms = self.upstream.rms() * (payload / self.total as f64).sqrt();
        self.reset();
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

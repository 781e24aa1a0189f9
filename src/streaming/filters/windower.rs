//! Tapered, truncated views of a stream.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AnalyticError, AnalyticResult};
use crate::streaming::rms::{RmsCache, calculate_rms};
use crate::streaming::traits::{AnalyticSample, AnalyticStream};
use crate::utils::window::WindowShape;

/// Where the window sits in the upstream and how its edges are tapered.
/// All quantities are in samples.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowConfig {
    /// First upstream sample included in the window.
    pub offset: usize,
    /// Window length; `None` runs to the end of a bounded upstream.
    pub length: Option<usize>,
    /// Length of each of the fade-in and fade-out ramps.
    pub ramp_samples: usize,
    /// Shape of the ramps.
    pub shape: WindowShape,
}

impl WindowConfig {
    /// A window of `length` samples with `ramp_samples` ramps.
    pub fn new(length: usize, ramp_samples: usize) -> Self {
        Self {
            length: Some(length),
            ramp_samples,
            ..Self::default()
        }
    }

    /// Start the window `offset` samples into the upstream.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Use `shape` for both ramps.
    pub fn with_shape(mut self, shape: WindowShape) -> Self {
        self.shape = shape;
        self
    }

    /// Set the ramp length.
    pub fn with_ramp(mut self, ramp_samples: usize) -> Self {
        self.ramp_samples = ramp_samples;
        self
    }
}

/// Emits `length` samples of the upstream starting at `offset`, faded in over
/// the first `ramp_samples` and faded out over the last `ramp_samples`.
///
/// ```text
///   gain
///   1 ┤    ╭──────────────╮
///     │   ╱                ╲
///   0 ┼──╯──────────────────╰──
///      |ramp|    middle    |ramp|
///      0                  length
/// ```
pub struct Windower {
    upstream: Box<dyn AnalyticStream>,
    offset: usize,
    length: usize,
    ramp: Vec<f64>,
    position: usize,
    rms: RmsCache,
    initialized: bool,
}

impl Windower {
    /// Build a window over `upstream`.
    ///
    /// # Errors
    /// - [`AnalyticError::UnboundedStream`] if no length is given and the
    ///   upstream is unbounded
    /// - [`AnalyticError::InvalidParameter`] if the offset lies past the end of
    ///   the upstream, the window is empty, or the two ramps do not fit
    ///   inside it
    pub fn new(mut upstream: Box<dyn AnalyticStream>, config: WindowConfig) -> AnalyticResult<Self> {
        let WindowConfig {
            offset,
            length,
            ramp_samples,
            shape,
        } = config;

        let available = match upstream.samples() {
            Some(total) if offset >= total => {
                return Err(AnalyticError::invalid_parameter(
                    "offset",
                    format!("offset {offset} is past the end of a {total}-sample stream"),
                ));
            }
            Some(total) => Some(total - offset),
            None => None,
        };

        let length = match (length, available) {
            (Some(length), Some(available)) if length > available => {
                warn!(requested = length, available, "window truncated to the end of its upstream");
                available
            }
            (Some(length), _) => length,
            (None, Some(available)) => available,
            (None, None) => {
                return Err(AnalyticError::UnboundedStream(
                    "a window over an unbounded stream needs an explicit length".to_string(),
                ));
            }
        };

        if length == 0 {
            return Err(AnalyticError::invalid_parameter("length", "window must not be empty"));
        }
        if ramp_samples.saturating_mul(2) > length {
            return Err(AnalyticError::invalid_parameter(
                "ramp_samples",
                format!("two ramps of {ramp_samples} samples do not fit in a {length}-sample window"),
            ));
        }

        if offset > 0 {
            upstream.seek(offset);
        }
        debug!(offset, length, ramp_samples, ?shape, "windower configured");

        Ok(Self {
            upstream,
            offset,
            length,
            ramp: shape.ramp(ramp_samples),
            position: 0,
            rms: RmsCache::new(),
            initialized: false,
        })
    }

    /// Gain applied at window position `position`.
    pub fn gain_at(&self, position: usize) -> f64 {
        let ramp = self.ramp.len();
        if position >= self.length {
            0.0
        } else if position < ramp {
            self.ramp[position]
        } else if position >= self.length - ramp {
            self.ramp[self.length - 1 - position]
        } else {
            1.0
        }
    }
}

impl AnalyticStream for Windower {
    fn samples(&self) -> Option<usize> {
        Some(self.length)
    }

    fn sampling_rate(&self) -> f64 {
        self.upstream.sampling_rate()
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        let wanted = buffer.len().min(self.length - self.position);
        if wanted == 0 {
            return 0;
        }
        let read = self.upstream.read(&mut buffer[..wanted]);

        let ramp = self.ramp.len();
        let fade_out = self.length - ramp;
        for (i, sample) in buffer[..read].iter_mut().enumerate() {
            let position = self.position + i;
            if position < ramp {
                *sample *= self.ramp[position];
            } else if position >= fade_out {
                *sample *= self.ramp[self.length - 1 - position];
            }
        }
        self.position += read;
        read
    }

    fn reset(&mut self) {
        self.position = 0;
        if self.offset == 0 {
            self.upstream.reset();
        } else {
            self.upstream.seek(self.offset);
        }
    }

    fn seek(&mut self, position: usize) {
        let position = position.min(self.length);
        self.position = position;
        self.upstream.seek(self.offset + position);
    }

    fn rms(&mut self) -> f64 {
        if let Some(rms) = self.rms.get() {
            return rms;
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

//! Two independent cursors over one upstream.
//!
//! [`Fork::split`] consumes a stream and hands back two ends that can be read,
//! seeked and reset independently while the upstream is pulled only once.
//! The [`Fork`] owns the upstream; the [`ForkCursor`] holds a weak reference
//! to it. Dropping the cursor lets the fork stop buffering, and dropping the
//! fork leaves the cursor permanently exhausted.

mod sync;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::streaming::rms::RmsCache;
use crate::streaming::traits::{AnalyticSample, AnalyticStream};

use sync::{ForkSide, ForkSync};

struct ForkState {
    upstream: Box<dyn AnalyticStream>,
    sync: ForkSync,
    rms: RmsCache,
    initialized: bool,
}

impl ForkState {
    fn read(&mut self, side: ForkSide, buffer: &mut [AnalyticSample]) -> usize {
        self.sync.read(side, self.upstream.as_mut(), buffer)
    }

    fn reset(&mut self, side: ForkSide) {
        self.sync.request_reset(side, self.upstream.as_mut());
    }

    fn seek(&mut self, side: ForkSide, position: usize) {
        self.sync.request_seek(side, position, self.upstream.as_mut());
    }

    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.upstream.initialize();
    }

    fn rms(&mut self) -> f64 {
        if let Some(rms) = self.rms.get() {
            return rms;
        }
        let rms = self.upstream.rms();
        if self.upstream.samples().is_some() {
            self.sync.restore_upstream(self.upstream.as_mut());
        }
        self.rms.store(rms)
    }
}

/// Primary end of a fork. Owns the shared upstream.
pub struct Fork {
    state: Rc<RefCell<ForkState>>,
    sampling_rate: f64,
}

/// Secondary end of a fork.
pub struct ForkCursor {
    state: Weak<RefCell<ForkState>>,
    sampling_rate: f64,
    orphaned: bool,
}

impl Fork {
    /// Split `upstream` into a primary and a secondary cursor, both starting
    /// at position 0.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use analytic_streams::streaming::{AnalyticStream, Fork, WaveGenerator};
    /// use analytic_streams::streaming::rms::read_samples;
    ///
    /// let wave = WaveGenerator::new(1.0, 440.0, 0.0, 44100.0).unwrap();
    /// let (mut dry, mut wet) = Fork::split(wave.boxed());
    /// let a = read_samples(&mut dry, 32);
    /// let b = read_samples(&mut wet, 32);
    /// assert_eq!(a, b);
    /// ```
    pub fn split(upstream: Box<dyn AnalyticStream>) -> (Fork, ForkCursor) {
        let sampling_rate = upstream.sampling_rate();
        let state = Rc::new(RefCell::new(ForkState {
            upstream,
            sync: ForkSync::new(),
            rms: RmsCache::new(),
            initialized: false,
        }));
        let cursor = ForkCursor {
            state: Rc::downgrade(&state),
            sampling_rate,
            orphaned: false,
        };
        debug!(sampling_rate, "stream forked");
        (Fork { state, sampling_rate }, cursor)
    }

    /// Logical position of this end, ignoring a pending seek.
    pub fn position(&self) -> usize {
        self.state.borrow().sync.position(ForkSide::Primary)
    }

    /// Whether a seek or reset on this end is waiting for the next read.
    pub fn is_seek_pending(&self) -> bool {
        self.state.borrow().sync.is_impending(ForkSide::Primary)
    }

    /// Samples buffered for whichever end is behind.
    pub fn queued(&self) -> usize {
        self.state.borrow().sync.queued()
    }
}

impl AnalyticStream for Fork {
    fn samples(&self) -> Option<usize> {
        self.state.borrow().upstream.samples()
    }

    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        self.state.borrow_mut().read(ForkSide::Primary, buffer)
    }

    fn reset(&mut self) {
        self.state.borrow_mut().reset(ForkSide::Primary);
    }

    fn seek(&mut self, position: usize) {
        self.state.borrow_mut().seek(ForkSide::Primary, position);
    }

    fn rms(&mut self) -> f64 {
        self.state.borrow_mut().rms()
    }

    fn initialize(&mut self) {
        self.state.borrow_mut().initialize();
    }
}

impl ForkCursor {
    /// Logical position of this end, or `None` once the fork is gone.
    pub fn position(&self) -> Option<usize> {
        let state = self.state.upgrade()?;
        let position = state.borrow().sync.position(ForkSide::Secondary);
        Some(position)
    }

    /// Whether a seek or reset on this end is waiting for the next read.
    pub fn is_seek_pending(&self) -> bool {
        self.state
            .upgrade()
            .is_some_and(|state| state.borrow().sync.is_impending(ForkSide::Secondary))
    }

    fn with_state<R>(&mut self, fallback: R, f: impl FnOnce(&mut ForkState) -> R) -> R {
        match self.state.upgrade() {
            Some(shared) => {
                let mut state = shared.borrow_mut();
                f(&mut *state)
            }
            None => {
                if !self.orphaned {
                    warn!("fork primary dropped, secondary cursor is exhausted");
                    self.orphaned = true;
                }
                fallback
            }
        }
    }
}

impl AnalyticStream for ForkCursor {
    fn samples(&self) -> Option<usize> {
        self.state
            .upgrade()
            .map_or(Some(0), |state| state.borrow().upstream.samples())
    }

    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        self.with_state(0, |state| state.read(ForkSide::Secondary, buffer))
    }

    fn reset(&mut self) {
        self.with_state((), |state| state.reset(ForkSide::Secondary));
    }

    fn seek(&mut self, position: usize) {
        self.with_state((), |state| state.seek(ForkSide::Secondary, position));
    }

    fn rms(&mut self) -> f64 {
        self.with_state(f64::NAN, ForkState::rms)
    }

    fn initialize(&mut self) {
        self.with_state((), ForkState::initialize);
    }
}

impl Drop for ForkCursor {
    fn drop(&mut self) {
        if let Some(shared) = self.state.upgrade() {
            if let Ok(mut state) = shared.try_borrow_mut() {
                state.sync.detach(ForkSide::Secondary);
            }
        }
    }
}

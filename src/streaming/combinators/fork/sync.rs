//! Cursor bookkeeping shared by the two ends of a fork.
//!
//! The upstream is physically positioned at the *leading* cursor. Samples the
//! leader has read but the trailing cursor has not are kept in a FIFO queue:
//!
//! ```text
//!   upstream:  ... | t | t+1 | ... | l-1 | l ...
//!                    ^-- trailing      ^-- leading (physical position)
//!   queue:           [ t, t+1, ..., l-1 ]
//! ```
//!
//! so `queue.len() == |primary - secondary|` holds after every operation.
//!
//! Seeks and resets are recorded as impending requests and applied lazily:
//! on the requesting cursor's next read, or as soon as both cursors have a
//! request outstanding, in which case the upstream is repositioned once for
//! both of them.

use std::collections::VecDeque;

use num_traits::Zero;
use tracing::trace;

use crate::streaming::traits::{AnalyticSample, AnalyticStream};

const FILL_CHUNK: usize = 1024;

/// One of the two ends of a fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ForkSide {
    Primary,
    Secondary,
}

impl ForkSide {
    const fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }

    const fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }
}

/// A repositioning request not yet applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Impending {
    Reset,
    Seek(usize),
}

impl Impending {
    const fn target(self) -> usize {
        match self {
            Self::Reset => 0,
            Self::Seek(position) => position,
        }
    }
}

/// Queue and cursor state of a fork, independent of who owns the upstream.
#[derive(Debug)]
pub(crate) struct ForkSync {
    queue: VecDeque<AnalyticSample>,
    positions: [usize; 2],
    impending: [Option<Impending>; 2],
    attached: [bool; 2],
    scratch: Vec<AnalyticSample>,
}

impl ForkSync {
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            positions: [0; 2],
            impending: [None; 2],
            attached: [true; 2],
            scratch: vec![AnalyticSample::zero(); FILL_CHUNK],
        }
    }

    /// Logical position of `side`, ignoring any impending request.
    pub(crate) const fn position(&self, side: ForkSide) -> usize {
        self.positions[side.index()]
    }

    /// Number of buffered samples.
    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Whether `side` has a seek or reset waiting to be applied.
    pub(crate) const fn is_impending(&self, side: ForkSide) -> bool {
        self.impending[side.index()].is_some()
    }

    /// Physical position of the upstream.
    pub(crate) fn leader_position(&self) -> usize {
        self.positions[0].max(self.positions[1])
    }

    /// Stop buffering for `side`; it will never read again.
    pub(crate) fn detach(&mut self, side: ForkSide) {
        let me = side.index();
        let other = side.other().index();
        self.attached[me] = false;
        self.impending[me] = None;
        if self.positions[me] < self.positions[other] {
            self.queue.clear();
            self.positions[me] = self.positions[other];
        }
        trace!(?side, "fork cursor detached");
    }

    pub(crate) fn request_reset(&mut self, side: ForkSide, upstream: &mut dyn AnalyticStream) {
        self.request(side, Impending::Reset, upstream);
    }

    pub(crate) fn request_seek(
        &mut self,
        side: ForkSide,
        position: usize,
        upstream: &mut dyn AnalyticStream,
    ) {
        self.request(side, Impending::Seek(position), upstream);
    }

    /// Read up to `buffer.len()` samples for `side`.
    pub(crate) fn read(
        &mut self,
        side: ForkSide,
        upstream: &mut dyn AnalyticStream,
        buffer: &mut [AnalyticSample],
    ) -> usize {
        if let Some(request) = self.impending[side.index()].take() {
            self.resolve(side, request, upstream);
        }

        let me = side.index();
        let other = side.other().index();

        // Samples the other cursor already pulled through.
        let mut filled = 0;
        if self.positions[me] < self.positions[other] {
            let count = buffer.len().min(self.queue.len());
            for (slot, sample) in buffer[..count].iter_mut().zip(self.queue.drain(..count)) {
                *slot = sample;
            }
            self.positions[me] += count;
            filled = count;
        }
        if filled == buffer.len() {
            return filled;
        }

        let read = upstream.read(&mut buffer[filled..]);
        if self.attached[other] {
            self.queue.extend(buffer[filled..filled + read].iter().copied());
        } else {
            self.positions[other] = self.positions[me] + read;
        }
        self.positions[me] += read;
        filled + read
    }

    /// Move the upstream back to the leader after something rewound it.
    pub(crate) fn restore_upstream(&self, upstream: &mut dyn AnalyticStream) {
        let leader = self.leader_position();
        if leader == 0 {
            upstream.reset();
        } else {
            upstream.seek(leader);
        }
    }

    fn request(&mut self, side: ForkSide, request: Impending, upstream: &mut dyn AnalyticStream) {
        self.impending[side.index()] = Some(request);
        let other = side.other();
        if let Some(other_request) = self.impending[other.index()] {
            self.impending = [None; 2];
            let (primary, secondary) = match side {
                ForkSide::Primary => (request, other_request),
                ForkSide::Secondary => (other_request, request),
            };
            self.reconcile(primary, secondary, upstream);
        }
    }

    /// Apply one request per cursor with a single physical reposition.
    fn reconcile(&mut self, primary: Impending, secondary: Impending, upstream: &mut dyn AnalyticStream) {
        let (earlier, later_target, trailing) = if primary.target() <= secondary.target() {
            (primary, secondary.target(), ForkSide::Primary)
        } else {
            (secondary, primary.target(), ForkSide::Secondary)
        };
        let start = earlier.target();

        reposition(upstream, earlier);
        self.queue.clear();
        let filled = self.fill_queue(upstream, later_target - start);

        self.positions[trailing.index()] = start;
        self.positions[trailing.other().index()] = start + filled;
        trace!(
            primary = self.positions[0],
            secondary = self.positions[1],
            queued = self.queue.len(),
            "fork cursors reconciled"
        );
    }

    /// Apply a single cursor's request against the current state.
    fn resolve(&mut self, side: ForkSide, request: Impending, upstream: &mut dyn AnalyticStream) {
        let me = side.index();
        let other = side.other().index();
        let target = request.target();
        let current = self.positions[me];
        let other_position = self.positions[other];

        if target < current {
            // Backward: the other cursor follows to the same position.
            reposition(upstream, request);
            self.queue.clear();
            self.positions = [target; 2];
            trace!(?side, target, "fork backward seek, both cursors moved");
            return;
        }
        if target == current {
            return;
        }

        if !self.attached[other] {
            if current < other_position {
                let skip = (target - current).min(self.queue.len());
                self.queue.drain(..skip);
            }
            if target >= other_position {
                self.queue.clear();
                upstream.seek(target);
                self.positions = [target; 2];
            } else {
                self.positions[me] = target;
            }
            return;
        }

        if current < other_position {
            if target <= other_position {
                self.queue.drain(..target - current);
                self.positions[me] = target;
            } else {
                self.queue.clear();
                let filled = self.fill_queue(upstream, target - other_position);
                self.positions[me] = other_position + filled;
            }
        } else {
            let filled = self.fill_queue(upstream, target - current);
            self.positions[me] = current + filled;
        }
        trace!(
            ?side,
            target,
            position = self.positions[me],
            queued = self.queue.len(),
            "fork forward seek resolved"
        );
    }

    /// Pull `count` samples from the upstream into the queue, returning how
    /// many it produced.
    fn fill_queue(&mut self, upstream: &mut dyn AnalyticStream, count: usize) -> usize {
        let mut filled = 0;
        while filled < count {
            let chunk = (count - filled).min(self.scratch.len());
            let read = upstream.read(&mut self.scratch[..chunk]);
            self.queue.extend(self.scratch[..read].iter().copied());
            filled += read;
            if read < chunk {
                break;
            }
        }
        filled
    }
}

fn reposition(upstream: &mut dyn AnalyticStream, request: Impending) {
    match request {
        Impending::Reset => upstream.reset(),
        Impending::Seek(position) => upstream.seek(position),
    }
}

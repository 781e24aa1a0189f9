//! Any interleaving of reads, seeks and resets on the two ends of a fork
//! yields the same samples as reading the upstream directly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::streaming::combinators::{Fork, ForkCursor};
use crate::streaming::filters::FrequencyShifter;
use crate::streaming::sources::{AnalyticSampleBuffer, WaveGenerator};

const LENGTH: usize = 3000;

/// Upstream whose sample at position `p` has real part `p`.
fn counting() -> Box<dyn AnalyticStream> {
    let samples = (0..LENGTH).map(|i| AnalyticSample::new(i as f64, 0.0)).collect();
    AnalyticSampleBuffer::new(samples, FS).boxed()
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Read(usize),
    Seek(usize),
    Reset,
}

fn random_op(rng: &mut StdRng) -> Op {
    match rng.random_range(0..10) {
        0..=5 => Op::Read(rng.random_range(1..400)),
        6..=8 => Op::Seek(rng.random_range(0..LENGTH + 100)),
        _ => Op::Reset,
    }
}

fn position_of(primary: &Fork, secondary: &ForkCursor, side: usize) -> usize {
    if side == 0 {
        primary.position()
    } else {
        secondary.position().unwrap_or(0)
    }
}

#[test]
fn test_random_interleavings_match_upstream() {
    for seed in 0..40u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (mut primary, mut secondary) = Fork::split(counting());
        let mut targets: [Option<usize>; 2] = [None; 2];

        for step in 0..200 {
            let side = rng.random_range(0..2usize);
            let op = random_op(&mut rng);
            match op {
                Op::Read(count) => {
                    let expected_start = targets[side]
                        .take()
                        .unwrap_or_else(|| position_of(&primary, &secondary, side));
                    let samples = if side == 0 {
                        read_samples(&mut primary, count)
                    } else {
                        read_samples(&mut secondary, count)
                    };
                    let expected_len = count.min(LENGTH.saturating_sub(expected_start));
                    assert_eq!(samples.len(), expected_len, "seed {seed} step {step} {op:?}");
                    for (offset, sample) in samples.iter().enumerate() {
                        assert_eq!(
                            sample.re,
                            (expected_start + offset) as f64,
                            "seed {seed} step {step} side {side}"
                        );
                    }
                }
                Op::Seek(position) => {
                    if side == 0 {
                        primary.seek(position);
                    } else {
                        secondary.seek(position);
                    }
                    targets[side] = Some(position);
                }
                Op::Reset => {
                    if side == 0 {
                        primary.reset();
                    } else {
                        secondary.reset();
                    }
                    targets[side] = Some(0);
                }
            }

            // Requests on both ends are applied together and immediately.
            if !primary.is_seek_pending() && !secondary.is_seek_pending() {
                targets = [None; 2];
            }
            let gap = primary
                .position()
                .abs_diff(secondary.position().unwrap_or(0));
            assert_eq!(primary.queued(), gap, "seed {seed} step {step}");
        }
    }
}

#[test]
fn test_forked_branches_feed_independent_filters() {
    let wave = WaveGenerator::new(1.0, 440.0, 0.0, FS).unwrap().boxed();
    let (primary, secondary) = Fork::split(wave);
    let mut up = FrequencyShifter::new(primary.boxed(), 100.0).unwrap();
    let mut down = FrequencyShifter::new(secondary.boxed(), -100.0).unwrap();

    let a = read_samples(&mut up, 5000);
    let b = read_samples(&mut down, 5000);

    let mut reference_up = FrequencyShifter::new(
        WaveGenerator::new(1.0, 440.0, 0.0, FS).unwrap().boxed(),
        100.0,
    )
    .unwrap();
    let mut reference_down = FrequencyShifter::new(
        WaveGenerator::new(1.0, 440.0, 0.0, FS).unwrap().boxed(),
        -100.0,
    )
    .unwrap();
    assert_eq!(a, read_samples(&mut reference_up, 5000));
    assert_eq!(b, read_samples(&mut reference_down, 5000));
}

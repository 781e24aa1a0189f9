//! `initialize` reaches every stream in a graph exactly once.

use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::streaming::combinators::{Adder, Fork};
use crate::streaming::filters::{
    AdsrConfig, AdsrEnvelope, CenterPadding, Centerer, FrequencyModulator, FrequencyShifter,
    WindowConfig, Windower,
};
use crate::streaming::sources::{AnalyticSampleBuffer, NoiseColor, NoiseConfig, NoiseGenerator};

type InitLog = Rc<RefCell<Vec<&'static str>>>;

/// Passes everything through to `inner` and logs `label` each time its
/// setup runs.
struct Logged {
    label: &'static str,
    inner: Box<dyn AnalyticStream>,
    log: InitLog,
}

impl Logged {
    fn wrap(label: &'static str, inner: Box<dyn AnalyticStream>, log: &InitLog) -> Box<dyn AnalyticStream> {
        Self {
            label,
            inner,
            log: Rc::clone(log),
        }
        .boxed()
    }
}

impl AnalyticStream for Logged {
    fn samples(&self) -> Option<usize> {
        self.inner.samples()
    }

    fn sampling_rate(&self) -> f64 {
        self.inner.sampling_rate()
    }

    fn read(&mut self, buffer: &mut [AnalyticSample]) -> usize {
        self.inner.read(buffer)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn seek(&mut self, position: usize) {
        self.inner.seek(position);
    }

    fn rms(&mut self) -> f64 {
        self.inner.rms()
    }

    fn initialize(&mut self) {
        self.inner.initialize();
        self.log.borrow_mut().push(self.label);
    }
}

fn noise(seed: u64) -> Box<dyn AnalyticStream> {
    let config = NoiseConfig::default()
        .with_band(200.0, 6000.0)
        .with_color(NoiseColor::Pink)
        .with_rms(0.1)
        .with_seed(seed);
    NoiseGenerator::new(config, FS).unwrap().boxed()
}

fn ones(len: usize) -> Box<dyn AnalyticStream> {
    AnalyticSampleBuffer::new(vec![AnalyticSample::new(1.0, 0.0); len], FS).boxed()
}

#[test]
fn test_repeated_initialize_reaches_leaves_once() {
    let log = InitLog::default();
    let burst = Windower::new(Logged::wrap("noise", noise(1), &log), WindowConfig::new(4096, 256)).unwrap();
    let mut mix = Adder::new(vec![burst.boxed()]).unwrap();

    mix.initialize();
    mix.initialize();
    let _ = read_samples(&mut mix, 1024);
    mix.initialize();

    assert_eq!(*log.borrow(), vec!["noise"]);
}

#[test]
fn test_fork_initializes_upstream_once_through_both_ends() {
    let log = InitLog::default();
    let (dry, wet) = Fork::split(Logged::wrap("shared", noise(2), &log));
    let wet = FrequencyShifter::new(wet.boxed(), 30.0).unwrap();
    let mut mix = Adder::new(vec![dry.boxed(), wet.boxed()]).unwrap();

    mix.initialize();
    assert_eq!(*log.borrow(), vec!["shared"]);
}

#[test]
fn test_fork_ends_initialized_directly() {
    let log = InitLog::default();
    let (mut primary, mut secondary) = Fork::split(Logged::wrap("shared", noise(3), &log));
    secondary.initialize();
    primary.initialize();
    secondary.initialize();
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_initialize_visits_upstreams_in_order() {
    let log = InitLog::default();
    let note = AdsrEnvelope::new(
        Logged::wrap("tone", ones(2000), &log),
        AdsrConfig::scheduled(0.001, 0.001, 0.5, 0.01, 0.01),
    )
    .unwrap();
    let vibrato = FrequencyModulator::new(Logged::wrap("vibrato", ones(3000), &log), 5.0, 4.0).unwrap();
    let padded = Centerer::new(
        Logged::wrap("padded", ones(1000), &log),
        CenterPadding::explicit(0.01, 0.01),
    )
    .unwrap();

    let inputs = vec![
        Logged::wrap("note", note.boxed(), &log),
        vibrato.boxed(),
        padded.boxed(),
    ];
    let mut mix = Logged::wrap("mix", Adder::new(inputs).unwrap().boxed(), &log);
    mix.initialize();

    // Each stream finishes its own setup only after its upstreams have.
    assert_eq!(
        *log.borrow(),
        vec!["tone", "note", "vibrato", "padded", "mix"]
    );
}

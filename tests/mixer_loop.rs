//! End-to-end tests of the mixer over a scripted in-memory sink.
//!
//! These drive the real playback worker - spawn, mix, write, recover, stop -
//! with the hardware swapped out behind the `PcmSink` seam, so error policy
//! and shutdown sequencing are observable deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bitemix::device::{GainControl, PcmSink, SinkError};
use bitemix::{Clip, Mixer, MixerConfig};

const PERIOD: usize = 64;

enum WriteOutcome {
    Deliver,
    Short(usize),
    Fail(SinkError),
}

#[derive(Default)]
struct SinkState {
    delivered: Mutex<Vec<i16>>,
    script: Mutex<VecDeque<WriteOutcome>>,
    recover_calls: AtomicUsize,
    drained: AtomicBool,
    gain_raw: AtomicI64,
}

impl GainControl for SinkState {
    fn range(&self) -> (i64, i64) {
        (0, 256)
    }

    fn set(&self, raw: i64) {
        self.gain_raw.store(raw, Ordering::Relaxed);
    }
}

struct TestSink {
    state: Arc<SinkState>,
    underrun_recoverable: bool,
}

impl PcmSink for TestSink {
    fn period_frames(&self) -> usize {
        PERIOD
    }

    fn write(&mut self, frames: &[i16]) -> Result<usize, SinkError> {
        // Pace the loop a little so tests do not spin flat out.
        thread::sleep(Duration::from_micros(200));
        let outcome = self
            .state
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(WriteOutcome::Deliver);
        match outcome {
            WriteOutcome::Deliver => {
                self.state
                    .delivered
                    .lock()
                    .unwrap()
                    .extend_from_slice(frames);
                Ok(frames.len())
            }
            WriteOutcome::Short(n) => {
                self.state
                    .delivered
                    .lock()
                    .unwrap()
                    .extend_from_slice(&frames[..n]);
                Ok(n)
            }
            WriteOutcome::Fail(err) => Err(err),
        }
    }

    fn recover(&mut self, err: &SinkError) -> Result<(), SinkError> {
        self.state.recover_calls.fetch_add(1, Ordering::SeqCst);
        match err {
            SinkError::Underrun if self.underrun_recoverable => Ok(()),
            other => Err(other.clone()),
        }
    }

    fn drain(&mut self) {
        self.state.drained.store(true, Ordering::SeqCst);
    }

    fn gain(&self) -> Arc<dyn GainControl> {
        self.state.clone()
    }
}

fn start(script: Vec<WriteOutcome>, underrun_recoverable: bool) -> (Mixer, Arc<SinkState>) {
    let state = Arc::new(SinkState::default());
    state.script.lock().unwrap().extend(script);

    let sink_state = Arc::clone(&state);
    let mixer = Mixer::with_sink(
        move || {
            Ok(Box::new(TestSink {
                state: sink_state,
                underrun_recoverable,
            }) as Box<dyn PcmSink>)
        },
        &MixerConfig::default(),
    )
    .unwrap();
    (mixer, state)
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn volume_is_applied_at_open_and_on_change() {
    let (mixer, state) = start(Vec::new(), true);

    // MixerConfig::default() asks for 80%, mapped onto the native (0, 256).
    assert_eq!(mixer.volume(), 80);
    assert_eq!(state.gain_raw.load(Ordering::Relaxed), 204);

    mixer.set_volume(50).unwrap();
    assert_eq!(state.gain_raw.load(Ordering::Relaxed), 128);

    assert!(mixer.set_volume(101).is_err());
    assert!(mixer.set_volume(-1).is_err());
    assert_eq!(mixer.volume(), 50);
    assert_eq!(state.gain_raw.load(Ordering::Relaxed), 128);

    mixer.shutdown().unwrap();
}

#[test]
fn a_triggered_clip_reaches_the_device_intact() {
    let samples: Vec<i16> = (0..150).map(|i| (i * 17 % 3000 - 1500) as i16).collect();
    let (mixer, state) = start(Vec::new(), true);

    mixer.enqueue(&Clip::from_samples(samples.clone())).unwrap();
    wait_until("clip to finish", || mixer.active_clips() == 0);
    mixer.shutdown().unwrap();

    // The clip starts on a period boundary; find it among the silent
    // periods written before the trigger.
    let delivered = state.delivered.lock().unwrap();
    let at = delivered
        .chunks(PERIOD)
        .position(|chunk| chunk[0] == samples[0])
        .expect("clip never reached the sink")
        * PERIOD;
    assert_eq!(&delivered[at..at + samples.len()], samples.as_slice());

    // Nothing after it but silence: consumed exactly once, no replay.
    assert!(delivered[at + samples.len()..].iter().all(|&s| s == 0));
}

#[test]
fn short_writes_are_soft() {
    let (mixer, state) = start(vec![WriteOutcome::Short(3)], true);

    let samples = vec![400i16; 40];
    mixer.enqueue(&Clip::from_samples(samples)).unwrap();
    wait_until("clip to finish", || mixer.active_clips() == 0);

    // The loop shrugged off the short write: no recovery, clean stop.
    mixer.shutdown().unwrap();
    assert_eq!(state.recover_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn an_underrun_is_recovered_exactly_once() {
    let (mixer, state) = start(vec![WriteOutcome::Fail(SinkError::Underrun)], true);

    mixer.enqueue(&Clip::from_samples(vec![250i16; 100])).unwrap();
    wait_until("clip to finish", || mixer.active_clips() == 0);
    mixer.shutdown().unwrap();

    assert_eq!(state.recover_calls.load(Ordering::SeqCst), 1);
    assert!(state.drained.load(Ordering::SeqCst));
}

#[test]
fn a_dead_device_surfaces_at_shutdown() {
    let script = vec![WriteOutcome::Fail(SinkError::Stream(
        "device unplugged".to_string(),
    ))];
    let (mixer, state) = start(script, true);

    wait_until("the worker to die", || !mixer.is_healthy());

    // The pool still accepts clips; only the loop is gone.
    assert!(mixer.enqueue(&Clip::from_samples(vec![1])).is_ok());

    match mixer.shutdown() {
        Err(SinkError::Stream(message)) => assert!(message.contains("device unplugged")),
        other => panic!("expected the stream error, got {other:?}"),
    }
    assert_eq!(state.recover_calls.load(Ordering::SeqCst), 1);
    assert!(!state.drained.load(Ordering::SeqCst));
}

#[test]
fn shutdown_is_prompt_and_stops_all_writes() {
    let (mixer, state) = start(Vec::new(), true);

    let begun = Instant::now();
    mixer.shutdown().unwrap();
    assert!(begun.elapsed() < Duration::from_secs(1));
    assert!(state.drained.load(Ordering::SeqCst));

    // Device teardown is sequenced after the worker exits; nothing writes
    // afterwards.
    let written = state.delivered.lock().unwrap().len();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(state.delivered.lock().unwrap().len(), written);
}

#[test]
fn the_thirty_first_clip_is_rejected() {
    let (mixer, _state) = start(Vec::new(), true);

    // ~1 s of audio, so every voice stays active for the whole test.
    let long = Clip::from_samples(vec![50i16; 44_100]);
    for _ in 0..30 {
        mixer.enqueue(&long).unwrap();
    }
    assert!(mixer.enqueue(&long).is_err());
    assert_eq!(mixer.active_clips(), 30);

    mixer.shutdown().unwrap();
}

#[test]
fn open_failure_is_fatal_at_init() {
    let result = Mixer::with_sink(
        || -> Result<Box<dyn PcmSink>, SinkError> { Err(SinkError::NoOutputDevice) },
        &MixerConfig::default(),
    );
    assert!(matches!(result, Err(SinkError::NoOutputDevice)));
}

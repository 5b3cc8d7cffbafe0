//! The playback worker.
//!
//! One dedicated thread owns the output sink and the period buffer. Per
//! iteration it mixes every active voice into the buffer and writes it to
//! the device; everything else (enqueueing, volume) happens on other
//! threads.
//!
//! Sinks are built *on* the worker thread (stream handles are generally not
//! `Send`), so the spawner hands over a factory and waits on a one-shot
//! channel for either the sink's gain handle or the open error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use crate::device::{GainControl, PcmSink, SinkError};
use crate::pool::VoicePool;

pub(crate) type SinkFactory = Box<dyn FnOnce() -> Result<Box<dyn PcmSink>, SinkError> + Send>;

pub(crate) struct Worker {
    pub join: JoinHandle<Result<(), SinkError>>,
    pub gain: Arc<dyn GainControl>,
}

/// Start the worker, opening the sink on its own thread.
///
/// Returns once the sink is open (or failed to open). The join handle
/// carries the loop's exit status: `Ok` after a cooperative stop, `Err` when
/// the device died and recovery failed.
pub(crate) fn spawn(
    make_sink: SinkFactory,
    pool: Arc<VoicePool>,
    stop: Arc<AtomicBool>,
) -> Result<Worker, SinkError> {
    let (tx, rx) = mpsc::channel();
    let join = thread::Builder::new()
        .name("bitemix-playback".to_string())
        .spawn(move || {
            let mut sink = match make_sink() {
                Ok(sink) => {
                    if tx.send(Ok(sink.gain())).is_err() {
                        return Ok(());
                    }
                    sink
                }
                Err(err) => {
                    let _ = tx.send(Err(err));
                    return Ok(());
                }
            };
            run(sink.as_mut(), &pool, &stop)
        })
        .map_err(|err| SinkError::Worker(err.to_string()))?;

    match rx.recv() {
        Ok(Ok(gain)) => Ok(Worker { join, gain }),
        Ok(Err(err)) => {
            let _ = join.join();
            Err(err)
        }
        Err(_) => {
            let _ = join.join();
            Err(SinkError::Worker(
                "playback worker exited before opening the device".to_string(),
            ))
        }
    }
}

fn run(sink: &mut dyn PcmSink, pool: &VoicePool, stop: &AtomicBool) -> Result<(), SinkError> {
    let period = sink.period_frames();
    let mut buffer = vec![0i16; period];

    // The stop flag is checked once per iteration, never mid-write, so
    // shutdown latency is bounded by one period.
    while !stop.load(Ordering::Acquire) {
        pool.mix_into(&mut buffer);
        match sink.write(&buffer) {
            Ok(n) if n < buffer.len() => {
                // Soft: the undelivered remainder of this period is dropped,
                // not retried.
                log::warn!("short write: device accepted {n} of {} frames", buffer.len());
            }
            Ok(_) => {}
            Err(err) => {
                log::warn!("device write failed ({err}), attempting recovery");
                if let Err(fatal) = sink.recover(&err) {
                    log::error!("device recovery failed: {fatal}");
                    return Err(fatal);
                }
            }
        }
    }

    // Stop observed: no further writes. Let buffered audio reach the device,
    // then close it by dropping the sink.
    sink.drain();
    Ok(())
}

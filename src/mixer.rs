//! The mixer context object.
//!
//! One [`Mixer`] owns one output device, one voice pool, and one playback
//! worker. It is an explicit value - created by [`Mixer::open`], destroyed
//! by [`Mixer::shutdown`] (or `Drop`) - not an ambient global; a process
//! normally holds exactly one because a device handle backs it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::clip::Clip;
use crate::config::{MixerConfig, DEFAULT_VOLUME};
use crate::device::{CpalSink, PcmSink, SinkError};
use crate::playback;
use crate::pool::{PoolFull, VoicePool};
use crate::volume::{InvalidVolume, VolumeControl};

/// A running mixer: device open, playback worker live.
pub struct Mixer {
    pool: Arc<VoicePool>,
    volume: VolumeControl,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<(), SinkError>>>,
}

impl Mixer {
    /// Open the configured output device and start mixing.
    ///
    /// Fatal on failure: a mixer without a device is useless, so the error
    /// propagates instead of degrading.
    pub fn open(config: MixerConfig) -> Result<Self, SinkError> {
        let sink_config = config.clone();
        Self::with_sink(
            move || CpalSink::open(&sink_config).map(|sink| Box::new(sink) as Box<dyn PcmSink>),
            &config,
        )
    }

    /// Start mixing over a caller-supplied sink.
    ///
    /// The factory runs on the playback thread (sinks are usually not
    /// `Send`). This is the seam for alternate backends and for driving the
    /// real playback loop against an in-memory sink in tests.
    pub fn with_sink<F>(make_sink: F, config: &MixerConfig) -> Result<Self, SinkError>
    where
        F: FnOnce() -> Result<Box<dyn PcmSink>, SinkError> + Send + 'static,
    {
        let pool = Arc::new(VoicePool::new());
        let stop = Arc::new(AtomicBool::new(false));
        let worker = playback::spawn(Box::new(make_sink), Arc::clone(&pool), Arc::clone(&stop))?;

        let volume = VolumeControl::new(worker.gain);
        if volume.set(config.initial_volume).is_err() {
            // set() already warned about the configured value.
            volume.set(DEFAULT_VOLUME).ok();
        }

        Ok(Self {
            pool,
            volume,
            stop,
            worker: Some(worker.join),
        })
    }

    /// Start playing a clip from its beginning.
    ///
    /// Admission is immediate accept-or-reject: when all
    /// [`MAX_VOICES`](crate::pool::MAX_VOICES) slots are busy the clip is
    /// not queued for later, and the caller chooses whether dropping it is
    /// worth logging.
    pub fn enqueue(&self, clip: &Clip) -> Result<(), PoolFull> {
        self.pool.enqueue(clip)
    }

    /// Apply an output volume percentage in `[0, 100]`.
    pub fn set_volume(&self, percent: i32) -> Result<(), InvalidVolume> {
        self.volume.set(percent)
    }

    /// Last successfully applied volume percentage.
    pub fn volume(&self) -> i32 {
        self.volume.get()
    }

    /// Number of clips currently playing.
    pub fn active_clips(&self) -> usize {
        self.pool.active()
    }

    /// Whether the playback worker is still running.
    ///
    /// Flips to `false` after an unrecoverable device error; the error
    /// itself is retrieved by [`shutdown`](Mixer::shutdown). The owning
    /// application decides what happens next; the library never terminates
    /// the process.
    pub fn is_healthy(&self) -> bool {
        self.worker
            .as_ref()
            .map(|worker| !worker.is_finished())
            .unwrap_or(false)
    }

    /// Stop playback and release the device.
    ///
    /// Signals the worker, which finishes its current period, drains the
    /// device, and closes it; then joins the thread. Shutdown latency is
    /// bounded by one period plus the drain. Returns the worker's fatal
    /// device error if it died on one instead of stopping cooperatively.
    pub fn shutdown(mut self) -> Result<(), SinkError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.stop.store(true, Ordering::Release);
        let result = match self.worker.take() {
            Some(worker) => match worker.join() {
                Ok(result) => result,
                Err(_) => Err(SinkError::Worker("playback worker panicked".to_string())),
            },
            None => Ok(()),
        };
        self.pool.clear();
        result
    }
}

impl Drop for Mixer {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.finish() {
                log::error!("output device failed during shutdown: {err}");
            }
        }
    }
}

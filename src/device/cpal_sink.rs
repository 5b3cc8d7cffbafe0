//! cpal-backed output sink.
//!
//! The playback worker pushes 16-bit mono periods into an SPSC ring buffer;
//! the cpal stream callback drains it, applies the Q8.8 output gain, and
//! fans the mono signal out to however many channels the device runs.
//! `write` blocks while the ring is full, which paces the worker to
//! realtime.
//!
//! Underruns are detected on the consumer side: a callback that finds the
//! ring empty plays silence and raises a flag, which the next `write`
//! reports as [`SinkError::Underrun`]. Recovery clears the flag and
//! re-primes one period of silence - the period that hit the error is lost,
//! the stream itself keeps running.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};

use crate::config::MixerConfig;
use crate::device::{GainControl, PcmSink, SinkError};
use crate::dsp::mix::{scale_q8, GAIN_UNITY};
use crate::SAMPLE_RATE;

/// How long a full ring may stall before `write` gives up with a short
/// count, in periods.
const STALL_LIMIT_PERIODS: u32 = 4;

/// Sleep granularity while waiting for ring space.
const POLL: Duration = Duration::from_millis(1);

/// State shared between the writer, the stream callback, and gain holders.
struct SinkShared {
    /// Q8.8 output gain, 256 = unity. Written by [`GainControl::set`], read
    /// by the callback. Never involved in a lock.
    gain_q8: AtomicI32,
    /// Set by the callback when it had to substitute silence.
    underrun: AtomicBool,
    /// Set by the stream error callback; terminal.
    faulted: AtomicBool,
    fault: Mutex<Option<String>>,
}

impl SinkShared {
    fn record_fault(&self, message: String) {
        *self.fault.lock().unwrap() = Some(message);
        self.faulted.store(true, Ordering::Release);
    }

    fn fault_error(&self) -> SinkError {
        let message = self
            .fault
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "stream stopped".to_string());
        SinkError::Stream(message)
    }
}

impl GainControl for SinkShared {
    fn range(&self) -> (i64, i64) {
        (0, GAIN_UNITY as i64)
    }

    fn set(&self, raw: i64) {
        let clamped = raw.clamp(0, GAIN_UNITY as i64) as i32;
        self.gain_q8.store(clamped, Ordering::Relaxed);
    }
}

/// An opened cpal output stream taking mono 44 100 Hz 16-bit periods.
pub struct CpalSink {
    producer: rtrb::Producer<i16>,
    shared: Arc<SinkShared>,
    period_frames: usize,
    ring_capacity: usize,
    // Held for its lifetime; dropping it closes the stream.
    _stream: cpal::Stream,
}

impl CpalSink {
    /// Open and start the configured output device.
    ///
    /// Mono content is fanned out to the device's own channel count; the
    /// sample rate is fixed at 44 100 Hz. The period size is derived from
    /// `config.period_ms` and the ring holds two periods, so end-to-end
    /// latency sits around one to two periods plus the device's own buffer.
    pub fn open(config: &MixerConfig) -> Result<Self, SinkError> {
        let host = cpal::default_host();
        let device = match &config.device {
            Some(name) => find_output_device(&host, name)?,
            None => host
                .default_output_device()
                .ok_or(SinkError::NoOutputDevice)?,
        };
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = device
            .default_output_config()
            .map_err(|err| SinkError::UnsupportedConfig(err.to_string()))?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(SinkError::UnsupportedConfig(format!(
                "device speaks {:?}, expected f32 output",
                supported.sample_format()
            )));
        }
        let channels = supported.channels() as usize;

        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: SampleRate(SAMPLE_RATE),
            buffer_size: BufferSize::Default,
        };

        let period_frames =
            (SAMPLE_RATE as u64 * u64::from(config.period_ms.max(1)) / 1000) as usize;
        let ring_capacity = period_frames * 2;
        let (mut producer, mut consumer) = rtrb::RingBuffer::<i16>::new(ring_capacity);

        let shared = Arc::new(SinkShared {
            gain_q8: AtomicI32::new(GAIN_UNITY),
            underrun: AtomicBool::new(false),
            faulted: AtomicBool::new(false),
            fault: Mutex::new(None),
        });

        let cb_shared = Arc::clone(&shared);
        let err_shared = Arc::clone(&shared);
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let gain = cb_shared.gain_q8.load(Ordering::Relaxed);
                    let mut starved = false;
                    for frame in data.chunks_mut(channels) {
                        let sample = match consumer.pop() {
                            Ok(s) => scale_q8(s, gain) as f32 / 32768.0,
                            Err(_) => {
                                starved = true;
                                0.0
                            }
                        };
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                    if starved {
                        cb_shared.underrun.store(true, Ordering::Release);
                    }
                },
                move |err| {
                    log::error!("audio stream error: {err}");
                    err_shared.record_fault(err.to_string());
                },
                None,
            )
            .map_err(|err| SinkError::StreamBuild(err.to_string()))?;

        // Prime one period of silence so the stream has something to chew
        // on before the first mix pass lands.
        for _ in 0..period_frames {
            if producer.push(0).is_err() {
                break;
            }
        }

        stream
            .play()
            .map_err(|err| SinkError::StreamPlay(err.to_string()))?;

        log::info!(
            "opened output device \"{device_name}\": {channels} ch, {SAMPLE_RATE} Hz, \
             {period_frames} frames/period (~{} ms)",
            config.period_ms.max(1)
        );

        Ok(Self {
            producer,
            shared,
            period_frames,
            ring_capacity,
            _stream: stream,
        })
    }

    fn stall_limit(&self) -> u32 {
        // Periods worth of 1 ms polls before a full ring counts as stalled.
        STALL_LIMIT_PERIODS * self.period_frames as u32 * 1000 / SAMPLE_RATE
    }
}

impl PcmSink for CpalSink {
    fn period_frames(&self) -> usize {
        self.period_frames
    }

    fn write(&mut self, frames: &[i16]) -> Result<usize, SinkError> {
        if self.shared.faulted.load(Ordering::Acquire) {
            return Err(self.shared.fault_error());
        }
        if self.shared.underrun.load(Ordering::Acquire) {
            return Err(SinkError::Underrun);
        }

        let mut written = 0;
        let mut stalled_polls = 0;
        while written < frames.len() {
            if self.shared.faulted.load(Ordering::Acquire) {
                return Err(self.shared.fault_error());
            }
            let free = self.producer.slots();
            if free == 0 {
                if stalled_polls >= self.stall_limit() {
                    // Device stopped consuming without reporting an error;
                    // hand back a short count and let the caller decide.
                    return Ok(written);
                }
                stalled_polls += 1;
                thread::sleep(POLL);
                continue;
            }
            stalled_polls = 0;
            let n = free.min(frames.len() - written);
            for &sample in &frames[written..written + n] {
                if self.producer.push(sample).is_err() {
                    break;
                }
            }
            written += n;
        }
        Ok(written)
    }

    fn recover(&mut self, err: &SinkError) -> Result<(), SinkError> {
        match err {
            SinkError::Underrun => {
                self.shared.underrun.store(false, Ordering::Release);
                // Re-prime silence so the callback is fed while the next
                // period is being mixed.
                let n = self.producer.slots().min(self.period_frames);
                for _ in 0..n {
                    if self.producer.push(0).is_err() {
                        break;
                    }
                }
                Ok(())
            }
            other => Err(other.clone()),
        }
    }

    fn drain(&mut self) {
        let mut waited = Duration::ZERO;
        let deadline = Duration::from_millis(
            u64::from(STALL_LIMIT_PERIODS) * 1000 * self.period_frames as u64
                / u64::from(SAMPLE_RATE),
        );
        while self.producer.slots() < self.ring_capacity
            && !self.shared.faulted.load(Ordering::Acquire)
            && waited < deadline
        {
            thread::sleep(POLL);
            waited += POLL;
        }
    }

    fn gain(&self) -> Arc<dyn GainControl> {
        Arc::clone(&self.shared) as Arc<dyn GainControl>
    }
}

fn find_output_device(host: &cpal::Host, name: &str) -> Result<cpal::Device, SinkError> {
    let devices = host
        .output_devices()
        .map_err(|err| SinkError::DeviceNotFound(format!("{name}: {err}")))?;
    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(SinkError::DeviceNotFound(name.to_string()))
}

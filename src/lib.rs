pub mod clip;
pub mod config;
pub mod device; // Output sink trait and the cpal backend
pub mod dsp;
pub mod io;
pub mod mixer; // Top-level context object: open, enqueue, shutdown
pub mod pool; // Bounded voice pool and the per-period mix pass
pub mod volume;

mod playback;

pub use clip::Clip;
pub use config::MixerConfig;
pub use device::SinkError;
pub use mixer::Mixer;
pub use pool::PoolFull;
pub use volume::InvalidVolume;

/// Everything in the mixer runs at this rate, mono, 16-bit.
pub const SAMPLE_RATE: u32 = 44_100;

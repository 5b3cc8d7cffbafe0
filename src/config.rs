//! Mixer configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Volume applied at open time when the config does not say otherwise.
pub const DEFAULT_VOLUME: i32 = 80;

/// Everything negotiable about a mixer instance.
///
/// The sample format is not here on purpose: the mixer is mono 16-bit
/// 44 100 Hz throughout ([`crate::SAMPLE_RATE`]), and clips are validated
/// against that contract by the loader.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct MixerConfig {
    /// Output device name as reported by the host, or `None` for the
    /// system default.
    pub device: Option<String>,
    /// Target period length in milliseconds. One period is mixed and
    /// written per playback iteration, so this bounds both output latency
    /// and shutdown latency.
    pub period_ms: u32,
    /// Volume percentage applied before playback starts.
    pub initial_volume: i32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            device: None,
            period_ms: 50,
            initial_volume: DEFAULT_VOLUME,
        }
    }
}

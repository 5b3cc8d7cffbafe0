//! Decoded PCM clips shared between the loader and the mixer.

use std::sync::Arc;
use std::time::Duration;

use crate::SAMPLE_RATE;

/// An immutable, decoded sound: mono 16-bit samples at 44 100 Hz.
///
/// Clips are reference counted, so any number of concurrently playing voices
/// can read the same data without copying it. Cloning a `Clip` is cheap; the
/// samples are freed when the last reference drops.
///
/// Decoding is a collaborator concern (see [`crate::io::wave`]). The mixer
/// trusts that a `Clip` it is handed is correctly decoded - the one contract
/// it enforces itself is non-emptiness.
#[derive(Debug, Clone)]
pub struct Clip {
    data: Arc<[i16]>,
}

impl Clip {
    /// Wrap decoded samples in a shareable clip.
    ///
    /// # Panics
    ///
    /// Panics if `samples` is empty. An empty clip violates the provisioning
    /// contract and would otherwise occupy a pool slot forever.
    pub fn from_samples(samples: Vec<i16>) -> Self {
        assert!(!samples.is_empty(), "a clip must contain at least one sample");
        Self {
            data: samples.into(),
        }
    }

    /// The clip's samples.
    pub fn samples(&self) -> &[i16] {
        &self.data
    }

    /// Number of samples (equals frames: clips are mono).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Never true for a constructed clip; present for slice-like completeness.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Playback duration at the fixed mixer rate.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.data.len() as f64 / SAMPLE_RATE as f64)
    }
}

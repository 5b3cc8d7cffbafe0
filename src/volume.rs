//! Output volume control.
//!
//! Volume is a percentage in `[0, 100]`, mapped linearly onto the device's
//! native gain range and applied through the sink's lock-free
//! [`GainControl`] handle. The last successfully applied percentage lives in
//! an atomic, so status reporting from any thread never synchronizes with
//! the playback loop.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::device::GainControl;

/// Returned when a requested volume lies outside `[0, 100]`.
///
/// The previous volume stays applied; nothing reaches the device.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("volume must be between 0 and 100, got {0}")]
pub struct InvalidVolume(pub i32);

/// Percentage volume over a device gain handle.
pub struct VolumeControl {
    gain: Arc<dyn GainControl>,
    percent: AtomicI32,
}

impl VolumeControl {
    /// Wrap a device gain handle. No gain is applied until [`set`] is
    /// called; [`get`] reports 0 until then.
    ///
    /// [`set`]: VolumeControl::set
    /// [`get`]: VolumeControl::get
    pub fn new(gain: Arc<dyn GainControl>) -> Self {
        Self {
            gain,
            percent: AtomicI32::new(0),
        }
    }

    /// Apply a volume percentage.
    ///
    /// Rejects values outside `[0, 100]` without touching the device.
    /// Accepted values are mapped linearly onto the device's native gain
    /// range, applied, and then recorded.
    pub fn set(&self, percent: i32) -> Result<(), InvalidVolume> {
        if !(0..=100).contains(&percent) {
            log::warn!("rejecting out-of-range volume {percent}%");
            return Err(InvalidVolume(percent));
        }
        let (min, max) = self.gain.range();
        self.gain.set(min + (max - min) * i64::from(percent) / 100);
        self.percent.store(percent, Ordering::Relaxed);
        Ok(())
    }

    /// Last successfully applied percentage.
    pub fn get(&self) -> i32 {
        self.percent.load(Ordering::Relaxed)
    }
}

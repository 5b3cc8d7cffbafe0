//! Bounded voice pool and the per-period mix pass.
//!
//! The pool is the one shared, mutable piece of mixer state: a fixed table
//! of slots, each either vacant or holding a voice (a clip plus its read
//! cursor), behind a single blocking mutex. Producers enqueue clips from any
//! thread; the playback worker sums every active voice into its period
//! buffer once per ~50 ms.
//!
//! The mutex is held for the whole mix pass, not just the bookkeeping. At 30
//! slots that critical section is a few microseconds of integer adds per
//! period; producers blocking for at most one pass is the accepted cost of
//! keeping the pass a single linear walk.

use std::sync::Mutex;

use thiserror::Error;

use crate::clip::Clip;
use crate::dsp::mix;

/// Maximum number of concurrently playing clips.
///
/// The first-free-slot scan below is linear; fine at this size. A free list
/// or occupancy bitmap only starts paying for itself well above it.
pub const MAX_VOICES: usize = 30;

/// Returned by [`VoicePool::enqueue`] when all slots are occupied.
///
/// Not fatal: the clip is simply not admitted, and the caller decides
/// whether to drop it quietly or log it. There is no queueing or backoff.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("clip pool is full ({MAX_VOICES} clips already playing)")]
pub struct PoolFull;

/// A playing clip: shared samples plus a cursor into them.
///
/// `0 <= cursor <= clip.len()` always holds; the voice is removed from its
/// slot the moment the cursor reaches the end.
struct Voice {
    clip: Clip,
    cursor: usize,
}

/// Fixed-capacity table of playing voices behind one lock.
pub struct VoicePool {
    slots: Mutex<[Option<Voice>; MAX_VOICES]>,
}

impl VoicePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(std::array::from_fn(|_| None)),
        }
    }

    /// Start playing `clip` from its beginning.
    ///
    /// Scans for the first vacant slot under the pool lock and installs a
    /// voice there, so concurrent callers never receive the same slot. Fails
    /// immediately with [`PoolFull`] when all slots are taken.
    pub fn enqueue(&self, clip: &Clip) -> Result<(), PoolFull> {
        let mut slots = self.slots.lock().unwrap();
        match slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(Voice {
                    clip: clip.clone(),
                    cursor: 0,
                });
                Ok(())
            }
            None => Err(PoolFull),
        }
    }

    /// Sum one period of audio from every active voice into `out`.
    ///
    /// The buffer is zeroed first, so with no voices playing the result is
    /// silence. Each voice contributes `min(remaining, out.len())` samples
    /// through a saturating add (hard clipping at the 16-bit rails - the
    /// documented policy, not a soft limiter), and its cursor advances by
    /// exactly that amount. Voices whose cursor reaches the end are retired
    /// here; there is no replay or wraparound.
    ///
    /// Slot order is mix order. All voices contribute equally.
    pub fn mix_into(&self, out: &mut [i16]) {
        out.fill(0);
        let mut slots = self.slots.lock().unwrap();
        for slot in slots.iter_mut() {
            if let Some(voice) = slot {
                let data = voice.clip.samples();
                let n = (data.len() - voice.cursor).min(out.len());
                mix::sum_into(&mut out[..n], &data[voice.cursor..voice.cursor + n]);
                voice.cursor += n;
                if voice.cursor == data.len() {
                    *slot = None;
                }
            }
        }
    }

    /// Number of currently occupied slots.
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Retire every voice, releasing their clip references.
    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap();
        for slot in slots.iter_mut() {
            *slot = None;
        }
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}

//! Saturating integer summation primitives.

/*
Integer Summing
===============

Mixing combines sounds by ADDING their samples. With floating point the sum
can simply exceed the nominal range and get fixed up later; with 16-bit
integer PCM there is nowhere to overflow into, so the add itself must decide
what happens at the rails.

Vocabulary
----------

  summing       Adding signals at equal levels, no weighting. Every active
                clip contributes its samples one-for-one.

  headroom      Distance between a signal's peak and the representable
                maximum. Two clips that each peak near full scale have no
                combined headroom - their sum will not fit.

  wraparound    What two's-complement addition does on overflow:
                32000 + 2000 becomes -31536. Audibly catastrophic - a loud
                positive peak turns into a loud negative one (a click).

  saturation    Clamping the mathematical sum to the representable range:
                32000 + 2000 becomes 32767. This is "hard clipping" - the
                waveform's peaks are flattened, which distorts, but the
                signal stays continuous.


The Rails
---------

    i16 range: [-32768, +32767]

     32767 ┤············──── ← sums clamp here
           │      ╱╲
         0 ┼─────╱──╲─────
           │          ╲╱
    -32768 ┤············──── ← and here

Hard clipping adds harmonic distortion when it engages, but for short
percussive clips triggered a handful at a time it engages rarely and
briefly. A soft limiter would trade that for constant processing cost on
every sample. We clamp.


Gain in Q8.8
------------

The output stage scales samples by a gain factor. Doing that in floating
point would mean an int-float-int round trip per sample, so the gain is a
Q8.8 fixed-point integer instead: 256 is unity, 128 is half amplitude.

    scaled = (sample * gain) >> 8

The i32 intermediate cannot overflow: |sample| <= 32768 and gain <= 256
keeps the product within 2^23.
*/

/// Unity gain in Q8.8 fixed point.
pub const GAIN_UNITY: i32 = 256;

/// Clamp the mathematical sum of two samples to the 16-bit range.
///
/// 20000 + 20000 = 32767, not 40000. -20000 + -20000 = -32768.
#[inline]
pub fn saturating_add(a: i16, b: i16) -> i16 {
    a.saturating_add(b)
}

/// Accumulate `src` into `out` with saturation, sample by sample.
///
/// This is the inner loop of the mix pass: each active clip is summed into
/// the period buffer through this function.
#[inline]
pub fn sum_into(out: &mut [i16], src: &[i16]) {
    debug_assert_eq!(out.len(), src.len());

    for (o, &s) in out.iter_mut().zip(src.iter()) {
        *o = saturating_add(*o, s);
    }
}

/// Scale a sample by a Q8.8 gain factor (256 = unity).
///
/// `gain` is expected in `[0, 256]`; values outside distort the result but
/// cannot overflow the intermediate.
#[inline]
pub fn scale_q8(sample: i16, gain: i32) -> i16 {
    ((sample as i32 * gain) >> 8) as i16
}

/// Apply a Q8.8 gain factor to a buffer in place.
#[inline]
pub fn apply_gain_q8(buf: &mut [i16], gain: i32) {
    if gain == GAIN_UNITY {
        return;
    }
    for s in buf.iter_mut() {
        *s = scale_q8(*s, gain);
    }
}

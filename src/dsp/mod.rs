//! Low-level DSP primitives used by the mixer and the output sink.
//!
//! These functions are allocation-free and realtime-safe: plain integer
//! arithmetic over sample slices, nothing else. The pool and the sink layer
//! orchestration on top.

/// Saturating summation and fixed-point gain over 16-bit PCM.
pub mod mix;

//! Output device error types.

use thiserror::Error;

/// Errors raised while opening or feeding the output device.
///
/// Everything except `Underrun` is terminal for the sink that raised it.
/// `Underrun` is the one condition [`recover`](super::PcmSink::recover) can
/// clear.
#[derive(Error, Debug, Clone)]
pub enum SinkError {
    /// No output device available on the host.
    #[error("no audio output devices found")]
    NoOutputDevice,

    /// A device was requested by name and is not present.
    #[error("audio output device not found: {0}")]
    DeviceNotFound(String),

    /// The device cannot run mono-compatible 16-bit content at 44 100 Hz.
    #[error("output device rejected the requested format: {0}")]
    UnsupportedConfig(String),

    /// Stream construction failed.
    #[error("failed to build audio stream: {0}")]
    StreamBuild(String),

    /// The stream was built but refused to start.
    #[error("failed to start audio stream: {0}")]
    StreamPlay(String),

    /// The running stream reported a fault.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// The device consumed all buffered audio before the next period
    /// arrived.
    #[error("output underrun: the device ran out of audio")]
    Underrun,

    /// The playback worker thread could not be started or died abnormally.
    #[error("playback worker failure: {0}")]
    Worker(String),
}

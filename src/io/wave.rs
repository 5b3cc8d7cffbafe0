//! WAV file loading.
//!
//! The provisioning contract for clips is strict: RIFF/WAVE container,
//! little-endian 16-bit integer samples, mono, 44 100 Hz. The mixer itself
//! trusts any [`Clip`] it receives, so this loader is where the contract is
//! actually checked - a file in the wrong format is an error here, never a
//! mangled sound later.

use std::path::Path;

use thiserror::Error;

use crate::clip::Clip;
use crate::SAMPLE_RATE;

/// Why a WAV file could not become a [`Clip`].
#[derive(Error, Debug)]
pub enum WaveError {
    /// The file could not be read or parsed as a WAV container.
    #[error("failed to read wave file: {0}")]
    Read(#[from] hound::Error),

    /// The file parsed but is not mono 16-bit integer PCM at 44 100 Hz.
    #[error(
        "unsupported wave format: expected mono 16-bit 44100 Hz, \
         got {channels} channel(s), {bits}-bit, {rate} Hz"
    )]
    UnsupportedFormat { channels: u16, bits: u16, rate: u32 },

    /// The file has a valid header and zero samples.
    #[error("wave file contains no samples")]
    Empty,
}

/// Read a WAV file into memory as a shareable clip.
pub fn load(path: impl AsRef<Path>) -> Result<Clip, WaveError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.channels != 1
        || spec.sample_rate != SAMPLE_RATE
        || spec.bits_per_sample != 16
        || spec.sample_format != hound::SampleFormat::Int
    {
        return Err(WaveError::UnsupportedFormat {
            channels: spec.channels,
            bits: spec.bits_per_sample,
            rate: spec.sample_rate,
        });
    }

    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, hound::Error>>()?;
    if samples.is_empty() {
        return Err(WaveError::Empty);
    }
    Ok(Clip::from_samples(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(channels: u16, sample_rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    fn write_wav(path: &Path, spec: hound::WavSpec, samples: &[i16]) {
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_a_conforming_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hit.wav");
        write_wav(&path, spec(1, SAMPLE_RATE), &[100, -200, 32767, -32768]);

        let clip = load(&path).unwrap();
        assert_eq!(clip.samples(), &[100, -200, 32767, -32768]);
    }

    #[test]
    fn rejects_wrong_sample_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hit48k.wav");
        write_wav(&path, spec(1, 48_000), &[1, 2, 3]);

        match load(&path) {
            Err(WaveError::UnsupportedFormat { rate: 48_000, .. }) => {}
            other => panic!("expected format rejection, got {other:?}"),
        }
    }

    #[test]
    fn rejects_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, spec(2, SAMPLE_RATE), &[1, 1, 2, 2]);

        match load(&path) {
            Err(WaveError::UnsupportedFormat { channels: 2, .. }) => {}
            other => panic!("expected format rejection, got {other:?}"),
        }
    }

    #[test]
    fn rejects_an_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, spec(1, SAMPLE_RATE), &[]);

        assert!(matches!(load(&path), Err(WaveError::Empty)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            load("/no/such/file.wav"),
            Err(WaveError::Read(_))
        ));
    }
}

//! WAV encoding and decoding via hound.

use super::{AudioError, Result, Waveform};
use std::io::{Seek, Write};
use std::path::Path;

/// Bit depth of exported audio.
const EXPORT_BITS: u16 = 16;

/// Load a WAV file, normalizing samples to [-1, 1].
pub fn read_wav(path: &Path) -> Result<Waveform> {
    let read_error = |source| AudioError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = hound::WavReader::open(path).map_err(read_error)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()
                .map_err(read_error)?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(read_error)?,
    };

    Ok(Waveform::new(spec.sample_rate, spec.channels, samples))
}

/// Encode a waveform as 16-bit PCM WAV into `writer`.
pub fn write_wav<W: Write + Seek>(waveform: &Waveform, writer: W) -> Result<()> {
    if !waveform.has_format() {
        return Err(AudioError::Empty);
    }

    let spec = hound::WavSpec {
        channels: waveform.channels(),
        sample_rate: waveform.sample_rate(),
        bits_per_sample: EXPORT_BITS,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::new(writer, spec)?;
    for &sample in waveform.samples() {
        let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(scaled)?;
    }
    writer.finalize()?;
    Ok(())
}

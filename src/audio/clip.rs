use super::format::AudioFormat;
use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// One fixed-duration capture, interleaved f32 samples
///
/// Owned by the cycle that recorded it and dropped once identification is done.
#[derive(Debug, Clone)]
pub struct AudioClip {
    format: AudioFormat,
    samples: Vec<f32>,
}

impl AudioClip {
    pub fn new(format: AudioFormat, samples: Vec<f32>) -> Self {
        Self { format, samples }
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.format.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn duration_seconds(&self) -> f32 {
        let frames = self.samples.len() / self.format.channels.max(1) as usize;
        frames as f32 / self.format.sample_rate.max(1) as f32
    }

    /// Encode the clip as an in-memory 16-bit PCM WAV file
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: self.format.channels,
            sample_rate: self.format.sample_rate,
            bits_per_sample: AudioFormat::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut writer =
            WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;

        for sample in &self.samples {
            // Convert f32 (-1.0 to 1.0) to i16
            let amplitude = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(amplitude)
                .context("Failed to write sample")?;
        }

        writer.finalize().context("Failed to finalize WAV")?;
        Ok(cursor.into_inner())
    }
}

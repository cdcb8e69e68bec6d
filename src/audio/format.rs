// Capture always uses f32 samples from the device and is encoded as 16-bit
// signed PCM when the clip leaves the process.

/// The most channels a capture will ever request, even on multi-channel interfaces.
pub const MAX_CAPTURE_CHANNELS: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;

    /// Build the capture format for a device, never going above stereo
    pub fn for_device(sample_rate: u32, max_input_channels: u16) -> Self {
        Self {
            sample_rate,
            channels: max_input_channels.min(MAX_CAPTURE_CHANNELS),
        }
    }

    /// Calculate number of interleaved samples for a given duration in seconds
    pub fn samples_for_duration(&self, seconds: f32) -> usize {
        (self.sample_rate as f32 * seconds) as usize * self.channels as usize
    }
}

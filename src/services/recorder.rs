use crate::audio::{AudioCapture, AudioClip, AudioFormat, CaptureError, DeviceId};
use std::time::Duration;

/// Acquires one fixed-duration clip from an input device
///
/// Implementations block the calling thread for the whole capture window, so
/// the polling loop runs them on the blocking pool.
pub trait Recorder: Send + Sync {
    fn capture(
        &self,
        device: Option<DeviceId>,
        duration: Duration,
        sample_rate: u32,
    ) -> Result<AudioClip, CaptureError>;
}

/// Records from real hardware through cpal
pub struct CpalRecorder;

impl Recorder for CpalRecorder {
    fn capture(
        &self,
        device: Option<DeviceId>,
        duration: Duration,
        sample_rate: u32,
    ) -> Result<AudioClip, CaptureError> {
        let id = device.ok_or(CaptureError::NoDevice)?;
        let capture = AudioCapture::open(id)?;

        if capture.max_input_channels() == 0 {
            return Err(CaptureError::UnsupportedChannels);
        }

        let format = AudioFormat::for_device(sample_rate, capture.max_input_channels());
        tracing::info!("Recording from device {} with {} channel(s)", id, format.channels);

        let samples = capture
            .record(format, duration)
            .map_err(|e| CaptureError::CaptureFailure(format!("{:#}", e)))?;

        tracing::info!("Recording complete: {} samples", samples.len());
        Ok(AudioClip::new(format, samples))
    }
}

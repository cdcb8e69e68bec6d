use super::devices::{DeviceId, max_input_channels};
use super::error::CaptureError;
use super::format::AudioFormat;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use ringbuf::{HeapRb, traits::*};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An opened cpal input device
pub struct AudioCapture {
    device: cpal::Device,
    max_input_channels: u16,
}

impl AudioCapture {
    /// Look the device up again by its enumeration index
    pub fn open(id: DeviceId) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .input_devices()
            .map_err(|e| CaptureError::CaptureFailure(e.to_string()))?
            .nth(id.0)
            .ok_or(CaptureError::NoDevice)?;

        let max_input_channels = max_input_channels(&device);
        Ok(Self {
            device,
            max_input_channels,
        })
    }

    pub fn max_input_channels(&self) -> u16 {
        self.max_input_channels
    }

    /// Record for the full duration, blocking the calling thread
    ///
    /// Returns every interleaved sample captured, or an error if the stream
    /// reported a failure at any point during the window.
    pub fn record(&self, format: AudioFormat, duration: Duration) -> Result<Vec<f32>> {
        // One spare second so a late callback never overflows the buffer
        let ring = HeapRb::<f32>::new(format.samples_for_duration(duration.as_secs_f32() + 1.0));
        let (mut producer, mut consumer) = ring.split();

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let failure = Arc::new(Mutex::new(None::<String>));
        let failure_callback = failure.clone();

        let stream = self
            .device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    producer.push_slice(data);
                },
                move |err| {
                    tracing::warn!("Audio stream error: {}", err);
                    if let Ok(mut slot) = failure_callback.lock() {
                        slot.get_or_insert_with(|| err.to_string());
                    }
                },
                None,
            )
            .context("Failed to build input stream")?;

        stream.play().context("Failed to start audio stream")?;
        tracing::debug!(
            "Capturing {:.1}s at {} Hz, {} channel(s)",
            duration.as_secs_f32(),
            format.sample_rate,
            format.channels
        );

        std::thread::sleep(duration);
        drop(stream);

        if let Some(err) = failure.lock().ok().and_then(|mut slot| slot.take()) {
            anyhow::bail!("Audio stream failed during capture: {}", err);
        }

        let mut samples = vec![0.0f32; consumer.occupied_len()];
        let n = consumer.pop_slice(&mut samples);
        samples.truncate(n);

        if samples.is_empty() {
            anyhow::bail!("No audio was captured");
        }

        Ok(samples)
    }
}

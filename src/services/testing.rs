//! Fakes for exercising the polling loop and controller without hardware or network

use super::poller::LoopSettings;
use super::recorder::Recorder;
use crate::audio::{
    AudioClip, AudioFormat, CaptureError, DeviceCatalog, DeviceError, DeviceId, InputDevice,
};
use crate::fingerprint::{IdentificationResult, Identifier};
use crate::playback::{DispatchOutcome, Dispatcher};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub fn usb_mic() -> InputDevice {
    InputDevice {
        id: DeviceId(1),
        name: "USB Mic".to_string(),
        max_input_channels: 2,
    }
}

pub fn fast_settings() -> LoopSettings {
    LoopSettings {
        capture_duration: Duration::from_millis(1),
        sample_rate: 8000,
        interval: Duration::from_millis(5),
        identify_timeout: Duration::from_millis(200),
        dispatch_timeout: Duration::from_millis(200),
    }
}

pub fn song_a() -> IdentificationResult {
    IdentificationResult::matched("Song A", "Artist X")
}

pub fn song_b() -> IdentificationResult {
    IdentificationResult::matched("Song B", "Artist Y")
}

pub fn pair(title: &str, artist: &str) -> (String, String) {
    (title.to_string(), artist.to_string())
}

/// Poll a condition until it holds, failing the test after two seconds
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

#[derive(Default)]
pub struct FakeRecorder {
    fail: bool,
}

impl FakeRecorder {
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Recorder for FakeRecorder {
    fn capture(
        &self,
        device: Option<DeviceId>,
        _duration: Duration,
        sample_rate: u32,
    ) -> Result<AudioClip, CaptureError> {
        device.ok_or(CaptureError::NoDevice)?;
        if self.fail {
            return Err(CaptureError::CaptureFailure("device unplugged".to_string()));
        }
        Ok(AudioClip::new(
            AudioFormat::for_device(sample_rate, 1),
            vec![0.0; 8],
        ))
    }
}

/// Plays back a fixed list of results, then a fallback result forever
pub struct ScriptedIdentifier {
    script: Mutex<VecDeque<IdentificationResult>>,
    fallback: IdentificationResult,
    calls: AtomicUsize,
    hang: bool,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedIdentifier {
    pub fn new(script: Vec<IdentificationResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: IdentificationResult::NoMatch,
            calls: AtomicUsize::new(0),
            hang: false,
            gate: None,
        }
    }

    pub fn repeating(result: IdentificationResult) -> Self {
        Self {
            fallback: result,
            ..Self::new(vec![])
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(vec![])
        }
    }

    /// The first call notifies `entered` and then waits for `release`
    pub fn gated(
        script: Vec<IdentificationResult>,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    ) -> Self {
        Self {
            gate: Some((entered, release)),
            ..Self::new(script)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Identifier for ScriptedIdentifier {
    async fn identify(&self, _clip: AudioClip) -> IdentificationResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if self.hang {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }

        if let (0, Some((entered, release))) = (call, &self.gate) {
            entered.notify_one();
            release.notified().await;
        }

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub struct RecordingDispatcher {
    outcome: DispatchOutcome,
    calls: Mutex<Vec<(String, String)>>,
    hang: bool,
}

impl Default for RecordingDispatcher {
    fn default() -> Self {
        Self::with_outcome(DispatchOutcome::Started)
    }
}

impl RecordingDispatcher {
    pub fn with_outcome(outcome: DispatchOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
            hang: false,
        }
    }

    /// Records the call, then never answers
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(&self, title: &str, artist: &str) -> DispatchOutcome {
        self.calls.lock().unwrap().push(pair(title, artist));
        if self.hang {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        self.outcome.clone()
    }
}

pub struct FixedCatalog(pub Vec<InputDevice>);

impl DeviceCatalog for FixedCatalog {
    fn list_input_devices(&self) -> Result<Vec<InputDevice>, DeviceError> {
        Ok(self.0.clone())
    }
}

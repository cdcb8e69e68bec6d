use super::recorder::Recorder;
use crate::audio::InputDevice;
use crate::compare::is_same_track;
use crate::fingerprint::{IdentificationResult, Identifier};
use crate::playback::{DispatchOutcome, Dispatcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Timing policy for an armed session
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub capture_duration: Duration,
    pub sample_rate: u32,
    pub interval: Duration,
    pub identify_timeout: Duration,
    pub dispatch_timeout: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            capture_duration: Duration::from_secs(7),
            sample_rate: 44100,
            interval: Duration::from_secs(5),
            identify_timeout: Duration::from_secs(30),
            dispatch_timeout: Duration::from_secs(30),
        }
    }
}

/// The collaborators one identification cycle needs
#[derive(Clone)]
pub struct Services {
    pub recorder: Arc<dyn Recorder>,
    pub identifier: Arc<dyn Identifier>,
    pub dispatcher: Arc<dyn Dispatcher>,
}

/// How a single capture, identify, compare, dispatch cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Dispatched {
        title: String,
        artist: String,
        outcome: DispatchOutcome,
    },
    SameTrack,
    NoMatch,
    ServiceError(String),
    CaptureFailed(String),
}

/// One armed session: remembers the last dispatched track and runs cycles
/// back to back until told to stop
///
/// Only this loop ever touches `last_track`, and cycles never overlap, so no
/// locking is involved.
pub struct PollingLoop {
    device: InputDevice,
    services: Services,
    settings: LoopSettings,
    last_track: Option<IdentificationResult>,
    cycles: u64,
}

impl PollingLoop {
    pub fn new(device: InputDevice, services: Services, settings: LoopSettings) -> Self {
        Self {
            device,
            services,
            settings,
            last_track: None,
            cycles: 0,
        }
    }

    #[cfg(test)]
    pub fn last_track(&self) -> Option<&IdentificationResult> {
        self.last_track.as_ref()
    }

    /// Run cycles while `running` stays true
    ///
    /// The flag is checked between cycles only; a cycle that has started
    /// always completes, including its dispatch.
    pub async fn run(mut self, mut running: watch::Receiver<bool>) {
        tracing::info!(
            device = %self.device.name,
            "Polling loop armed, capturing {}s every {}s",
            self.settings.capture_duration.as_secs_f32(),
            self.settings.interval.as_secs_f32()
        );

        while *running.borrow() {
            let outcome = self.run_cycle().await;
            log_outcome(self.cycles, &outcome);

            if !*running.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                // Stopped, or the controller went away
                _ = running.wait_for(|running| !*running) => break,
            }
        }

        tracing::info!(
            device = %self.device.name,
            "Polling loop stopped after {} cycle(s)",
            self.cycles
        );
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.cycles += 1;

        let recorder = self.services.recorder.clone();
        let device = self.device.id;
        let duration = self.settings.capture_duration;
        let sample_rate = self.settings.sample_rate;

        let captured = tokio::task::spawn_blocking(move || {
            recorder.capture(Some(device), duration, sample_rate)
        })
        .await;

        let clip = match captured {
            Ok(Ok(clip)) => clip,
            Ok(Err(e)) => return CycleOutcome::CaptureFailed(e.to_string()),
            Err(e) => return CycleOutcome::CaptureFailed(format!("Capture task failed: {}", e)),
        };

        let result = tokio::time::timeout(
            self.settings.identify_timeout,
            self.services.identifier.identify(clip),
        )
        .await
        .unwrap_or_else(|_| IdentificationResult::service_error("Identification timed out"));

        let (title, artist) = match &result {
            IdentificationResult::Matched { title, artist, .. } => (title.clone(), artist.clone()),
            IdentificationResult::NoMatch => return CycleOutcome::NoMatch,
            IdentificationResult::ServiceError { cause } => {
                return CycleOutcome::ServiceError(cause.clone());
            }
        };

        if self
            .last_track
            .as_ref()
            .is_some_and(|last| is_same_track(&result, last))
        {
            return CycleOutcome::SameTrack;
        }

        let outcome = tokio::time::timeout(
            self.settings.dispatch_timeout,
            self.services.dispatcher.dispatch(&title, &artist),
        )
        .await
        .unwrap_or_else(|_| DispatchOutcome::DispatchError("Dispatch timed out".to_string()));

        // Remember the identity whatever the provider said, so a repeat of
        // this track never triggers a second dispatch in a row
        self.last_track = Some(result);

        CycleOutcome::Dispatched {
            title,
            artist,
            outcome,
        }
    }
}

fn log_outcome(cycle: u64, outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Dispatched {
            title,
            artist,
            outcome: DispatchOutcome::Started,
        } => tracing::info!(cycle, %title, %artist, "Playing identified track"),
        CycleOutcome::Dispatched {
            title,
            artist,
            outcome: DispatchOutcome::NotFound,
        } => tracing::warn!(cycle, %title, %artist, "Identified track not found on streaming service"),
        CycleOutcome::Dispatched {
            title,
            artist,
            outcome: DispatchOutcome::DispatchError(cause),
        } => tracing::error!(cycle, %title, %artist, %cause, "Failed to start playback"),
        CycleOutcome::SameTrack => tracing::debug!(cycle, "Same track already playing, skipping"),
        CycleOutcome::NoMatch => tracing::info!(cycle, "No match for captured clip"),
        CycleOutcome::ServiceError(cause) => {
            tracing::warn!(cycle, %cause, "Identification failed")
        }
        CycleOutcome::CaptureFailed(cause) => tracing::warn!(cycle, %cause, "Capture failed"),
    }
}

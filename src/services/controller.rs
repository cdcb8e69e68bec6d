use super::poller::{LoopSettings, PollingLoop, Services};
use crate::audio::{DeviceCatalog, DeviceError, InputDevice};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(InputDevice),
    AlreadyRunning,
}

/// Start/stop control over a single polling loop
///
/// Owns the running flag the loop watches. Each session gets its own flag, so
/// a stopped loop can never be re-armed by a later start. At most one loop
/// runs cycles at a time: starting while armed is ignored, and a restart
/// spawns a task that first waits for the previous loop's last cycle.
pub struct Controller {
    catalog: Arc<dyn DeviceCatalog>,
    services: Services,
    settings: LoopSettings,
    running: watch::Sender<bool>,
    selected: Option<InputDevice>,
    task: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new(catalog: Arc<dyn DeviceCatalog>, services: Services, settings: LoopSettings) -> Self {
        let (running, _) = watch::channel(false);
        Self {
            catalog,
            services,
            settings,
            running,
            selected: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    pub fn selected_device(&self) -> Option<&InputDevice> {
        self.selected.as_ref()
    }

    /// Enumerate input devices on the blocking pool
    pub async fn refresh_devices(&self) -> Result<Vec<InputDevice>, DeviceError> {
        let catalog = self.catalog.clone();
        tokio::task::spawn_blocking(move || catalog.list_input_devices())
            .await
            .map_err(|e| DeviceError::Enumeration(format!("Enumeration task failed: {}", e)))?
    }

    async fn resolve(&self, name: &str) -> Result<InputDevice, DeviceError> {
        let catalog = self.catalog.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || catalog.resolve(&name))
            .await
            .map_err(|e| DeviceError::Enumeration(format!("Enumeration task failed: {}", e)))?
    }

    /// Resolve the named device and arm a new polling loop on it
    pub async fn start(&mut self, device_name: Option<&str>) -> Result<StartOutcome, DeviceError> {
        if self.is_running() {
            tracing::debug!("Already running, ignoring start");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let name = device_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(DeviceError::NotSelected)?;
        let device = self.resolve(name).await?;

        tracing::info!(device = %device.name, id = %device.id, "Starting identification");
        self.selected = Some(device.clone());

        // Replacing the sender closes the previous session's flag for good
        let (running, running_rx) = watch::channel(true);
        self.running = running;

        let poller = PollingLoop::new(device.clone(), self.services.clone(), self.settings.clone());
        let previous = self.task.take();
        self.task = Some(tokio::spawn(async move {
            // A stopped loop may still be finishing its last cycle
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    tracing::error!("Polling loop task failed: {}", e);
                }
            }
            poller.run(running_rx).await;
        }));

        Ok(StartOutcome::Started(device))
    }

    /// Ask the loop to stop at its next cycle boundary
    ///
    /// Returns false if nothing was running.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }

        self.running.send_replace(false);
        tracing::info!("Stopping identification after the current cycle");
        true
    }

    /// Wait for the loop task, if any, to exit
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Polling loop task failed: {}", e);
            }
        }
    }

    pub async fn shutdown(&mut self) {
        self.stop();
        self.join().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::DispatchOutcome;
    use crate::services::testing::*;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn controller(
        identifier: Arc<ScriptedIdentifier>,
        dispatcher: Arc<RecordingDispatcher>,
    ) -> Controller {
        Controller::new(
            Arc::new(FixedCatalog(vec![usb_mic()])),
            Services {
                recorder: Arc::new(FakeRecorder::default()),
                identifier,
                dispatcher,
            },
            fast_settings(),
        )
    }

    #[tokio::test]
    async fn test_start_without_device_stays_idle() {
        let identifier = Arc::new(ScriptedIdentifier::new(vec![song_a()]));
        let mut controller = controller(identifier.clone(), Arc::new(RecordingDispatcher::default()));

        assert!(matches!(
            controller.start(None).await,
            Err(DeviceError::NotSelected)
        ));
        assert!(matches!(
            controller.start(Some("  ")).await,
            Err(DeviceError::NotSelected)
        ));
        assert!(matches!(
            controller.start(Some("Webcam")).await,
            Err(DeviceError::NotFound(_))
        ));

        assert!(!controller.is_running());
        assert!(controller.selected_device().is_none());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(identifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop() {
        let mut controller = controller(
            Arc::new(ScriptedIdentifier::new(vec![])),
            Arc::new(RecordingDispatcher::default()),
        );

        assert!(!controller.stop());
        assert!(!controller.stop());
        controller.join().await;
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn test_start_while_armed_is_ignored() {
        let mut controller = controller(
            Arc::new(ScriptedIdentifier::new(vec![])),
            Arc::new(RecordingDispatcher::default()),
        );

        assert_eq!(
            controller.start(Some("USB Mic")).await.unwrap(),
            StartOutcome::Started(usb_mic())
        );
        assert_eq!(
            controller.start(Some("Webcam")).await.unwrap(),
            StartOutcome::AlreadyRunning
        );
        assert_eq!(controller.selected_device(), Some(&usb_mic()));

        controller.shutdown().await;
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn test_stop_mid_cycle_finishes_that_cycle() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let identifier = Arc::new(ScriptedIdentifier::gated(
            vec![song_a()],
            entered.clone(),
            release.clone(),
        ));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let mut controller = controller(identifier.clone(), dispatcher.clone());

        controller.start(Some("USB Mic")).await.unwrap();
        entered.notified().await;

        assert!(controller.stop());
        release.notify_one();
        tokio::time::timeout(Duration::from_secs(2), controller.join())
            .await
            .unwrap();

        assert_eq!(dispatcher.calls(), vec![pair("Song A", "Artist X")]);
        assert_eq!(identifier.calls(), 1);
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn test_restart_during_final_cycle_returns_immediately() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let identifier = Arc::new(ScriptedIdentifier::gated(
            vec![song_a(), song_a()],
            entered.clone(),
            release.clone(),
        ));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let mut controller = controller(identifier.clone(), dispatcher.clone());

        controller.start(Some("USB Mic")).await.unwrap();
        entered.notified().await;
        assert!(controller.stop());

        let restarted = tokio::time::timeout(Duration::from_millis(500), controller.start(Some("USB Mic")))
            .await
            .expect("start must not wait for the previous cycle");
        assert_eq!(restarted.unwrap(), StartOutcome::Started(usb_mic()));
        assert!(controller.is_running());

        // The new loop has not begun a cycle while the old one is still in flight
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(identifier.calls(), 1);
        assert!(dispatcher.calls().is_empty());

        release.notify_one();
        wait_until(|| dispatcher.calls().len() >= 2).await;
        controller.shutdown().await;

        // Old session dispatched once and ended; the new one started from an empty last track
        assert_eq!(
            dispatcher.calls(),
            vec![pair("Song A", "Artist X"), pair("Song A", "Artist X")]
        );
    }

    #[tokio::test]
    async fn test_stop_before_previous_loop_exits_runs_no_cycle() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let identifier = Arc::new(ScriptedIdentifier::gated(
            vec![song_a()],
            entered.clone(),
            release.clone(),
        ));
        let mut controller = controller(identifier.clone(), Arc::new(RecordingDispatcher::default()));

        controller.start(Some("USB Mic")).await.unwrap();
        entered.notified().await;
        controller.stop();
        controller.start(Some("USB Mic")).await.unwrap();
        assert!(controller.stop());

        release.notify_one();
        tokio::time::timeout(Duration::from_secs(2), controller.join())
            .await
            .unwrap();
        assert_eq!(identifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_devices_lists_catalog() {
        let controller = controller(
            Arc::new(ScriptedIdentifier::new(vec![])),
            Arc::new(RecordingDispatcher::default()),
        );
        assert_eq!(controller.refresh_devices().await.unwrap(), vec![usb_mic()]);
    }

    #[tokio::test]
    async fn test_restart_begins_with_empty_last_track() {
        let identifier = Arc::new(ScriptedIdentifier::repeating(song_a()));
        let dispatcher = Arc::new(RecordingDispatcher::with_outcome(DispatchOutcome::Started));
        let mut controller = controller(identifier, dispatcher.clone());

        controller.start(Some("USB Mic")).await.unwrap();
        wait_until(|| !dispatcher.calls().is_empty()).await;
        controller.shutdown().await;

        controller.start(Some("USB Mic")).await.unwrap();
        wait_until(|| dispatcher.calls().len() >= 2).await;
        controller.shutdown().await;

        assert_eq!(
            dispatcher.calls(),
            vec![pair("Song A", "Artist X"), pair("Song A", "Artist X")]
        );
    }
}
